//! Runtime configuration.
//!
//! Values come from the process environment (a `.env` file is loaded
//! first if present). Anything missing or unparseable falls back to the
//! built-in default with a warning.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

use crate::host::Storage;

/// Storage key of the persisted environment flag.
pub const ENVIRONMENT_KEY: &str = "environment";

pub const DEFAULT_JPEG_QUALITY: u8 = 92;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    #[default]
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Production => "production",
        }
    }

    /// Default `log` filter for this environment.
    pub fn default_log_level(&self) -> &'static str {
        match self {
            Environment::Development => "debug",
            Environment::Production => "info",
        }
    }
}

impl FromStr for Environment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(ConfigError::InvalidValue {
                key: "PIXEL_CAPTURE_ENV",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct ExtensionConfig {
    pub environment: Environment,
    /// JPEG quality (1-100).
    pub jpeg_quality: u8,
    /// Pause between hiding the overlay and requesting the bitmap.
    pub settle_delay: Duration,
    /// Pause before the post-injection diagnostic probe; also its timeout.
    pub status_check_delay: Duration,
    /// Refuse to start a capture while logged out.
    pub require_login_for_capture: bool,
    /// Page opened by the "capture in a new tab" flow.
    pub new_tab_url: String,
    /// Ask the host to show a "save as" dialog.
    pub save_as: bool,
}

impl Default for ExtensionConfig {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            jpeg_quality: DEFAULT_JPEG_QUALITY,
            settle_delay: Duration::from_millis(100),
            status_check_delay: Duration::from_secs(1),
            require_login_for_capture: false,
            new_tab_url: "https://www.example.com".to_string(),
            save_as: true,
        }
    }
}

impl ExtensionConfig {
    /// Build a config from `PIXEL_CAPTURE_*` environment variables.
    pub fn from_env() -> Self {
        // Missing .env is the normal case
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup("PIXEL_CAPTURE_ENV") {
            match raw.parse() {
                Ok(env) => config.environment = env,
                Err(e) => log::warn!("[CONFIG] {}", e),
            }
        }

        if let Some(q) = parse_var::<u8>(&lookup, "PIXEL_CAPTURE_JPEG_QUALITY") {
            if (1..=100).contains(&q) {
                config.jpeg_quality = q;
            } else {
                log::warn!("[CONFIG] JPEG quality {} outside 1-100, keeping default", q);
            }
        }

        if let Some(ms) = parse_var::<u64>(&lookup, "PIXEL_CAPTURE_SETTLE_MS") {
            config.settle_delay = Duration::from_millis(ms);
        }

        if let Some(ms) = parse_var::<u64>(&lookup, "PIXEL_CAPTURE_STATUS_CHECK_MS") {
            config.status_check_delay = Duration::from_millis(ms);
        }

        if let Some(flag) = parse_var::<bool>(&lookup, "PIXEL_CAPTURE_REQUIRE_LOGIN") {
            config.require_login_for_capture = flag;
        }

        if let Some(url) = lookup("PIXEL_CAPTURE_NEW_TAB_URL") {
            if !url.trim().is_empty() {
                config.new_tab_url = url.trim().to_string();
            }
        }

        if let Some(flag) = parse_var::<bool>(&lookup, "PIXEL_CAPTURE_SAVE_AS") {
            config.save_as = flag;
        }

        config
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &'static str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            log::warn!("[CONFIG] Ignoring invalid {}={:?}", key, raw);
            None
        }
    }
}

/// Read the persisted environment flag, defaulting to production.
pub async fn stored_environment<S: Storage>(storage: &S) -> Environment {
    match storage.get(ENVIRONMENT_KEY).await {
        Ok(Some(value)) => serde_json::from_value(value).unwrap_or_else(|e| {
            log::warn!("[CONFIG] Malformed stored environment: {}", e);
            Environment::default()
        }),
        Ok(None) => Environment::default(),
        Err(e) => {
            log::warn!("[CONFIG] Could not read stored environment: {}", e);
            Environment::default()
        }
    }
}
