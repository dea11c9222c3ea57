//! Access gate: Pro/Trial entitlement checks.
//!
//! The hosting website pushes login and plan flags into local storage.
//! PDF export needs Pro or an active trial; raster formats are never gated.

use serde::{Deserialize, Serialize};

use crate::capture::ExportFormat;
use crate::host::{HostError, Storage};

/// Storage key of the persisted user status.
pub const USER_STATUS_KEY: &str = "userStatus";

pub const UPGRADE_URL: &str = "https://pixelcapture.app/pricing";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct UserStatus {
    pub is_logged_in: bool,
    pub is_pro: bool,
    pub is_in_trial: bool,
}

impl UserStatus {
    /// Pro or trial, regardless of login state.
    pub fn effective_permission(&self) -> bool {
        self.is_pro || self.is_in_trial
    }

    pub fn access_level(&self) -> AccessLevel {
        if self.is_logged_in && self.effective_permission() {
            AccessLevel::Full
        } else {
            AccessLevel::BasicOnly
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessLevel {
    BasicOnly,
    Full,
}

/// Policy switches for the gate.
#[derive(Debug, Clone, Copy, Default)]
pub struct AccessPolicy {
    /// Refuse captures entirely while logged out.
    pub require_login_for_capture: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AccessDenied {
    #[error("Sign in to PixelCapture to use {0}")]
    LoginRequired(String),

    #[error("{0} export requires PixelCapture Pro or an active trial; upgrade at {url}", url = UPGRADE_URL)]
    UpgradeRequired(String),
}

/// Is `format` allowed for this user?
pub fn check_export(status: &UserStatus, format: ExportFormat) -> Result<(), AccessDenied> {
    if !format.requires_elevated_access() {
        return Ok(());
    }

    match status.access_level() {
        AccessLevel::Full => Ok(()),
        AccessLevel::BasicOnly if !status.is_logged_in => {
            log::info!("[ACCESS] {} blocked: not logged in", format);
            Err(AccessDenied::LoginRequired(format!("{} export", format.to_string().to_uppercase())))
        }
        AccessLevel::BasicOnly => {
            log::info!("[ACCESS] {} blocked: no Pro or trial", format);
            Err(AccessDenied::UpgradeRequired(format.to_string().to_uppercase()))
        }
    }
}

/// May a capture start at all?
pub fn check_capture(status: &UserStatus, policy: &AccessPolicy) -> Result<(), AccessDenied> {
    if policy.require_login_for_capture && !status.is_logged_in {
        log::info!("[ACCESS] Capture blocked: not logged in");
        return Err(AccessDenied::LoginRequired("screenshots".to_string()));
    }
    Ok(())
}

/// Read the persisted status. Missing or malformed entries count as logged out.
pub async fn load_user_status<S: Storage>(storage: &S) -> UserStatus {
    match storage.get(USER_STATUS_KEY).await {
        Ok(Some(value)) => serde_json::from_value(value).unwrap_or_else(|e| {
            log::warn!("[ACCESS] Malformed stored user status: {}", e);
            UserStatus::default()
        }),
        Ok(None) => UserStatus::default(),
        Err(e) => {
            log::warn!("[ACCESS] Could not read user status: {}", e);
            UserStatus::default()
        }
    }
}

pub async fn save_user_status<S: Storage>(storage: &S, status: &UserStatus) -> Result<(), HostError> {
    let value = serde_json::to_value(status)
        .map_err(|e| HostError::Unavailable(format!("status serialization failed: {}", e)))?;
    storage.set(USER_STATUS_KEY, value).await?;
    log::info!(
        "[ACCESS] Stored user status (logged_in={}, pro={}, trial={})",
        status.is_logged_in,
        status.is_pro,
        status.is_in_trial
    );
    Ok(())
}
