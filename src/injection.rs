//! Capture tool launcher: one routine for every entry point.
//!
//! The popup button, the "new tab" flow and the keyboard shortcut all
//! start the selection tool through `launch_capture_tool`. The injected
//! routine reports back through its return value; a delayed probe reads
//! its progress afterwards for diagnostics only.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::access::AccessDenied;
use crate::capture::ExportFormat;
use crate::config::ExtensionConfig;
use crate::host::{HostError, TabInfo, Tabs};

/// Browser-internal pages where scripts cannot be injected.
static RESTRICTED_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(chrome|edge|chrome-extension|devtools)://|^about:").unwrap()
});

pub fn is_restricted_url(url: &str) -> bool {
    RESTRICTED_URL.is_match(url.trim_start())
}

/// Parameters passed into the injected routine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolLaunch {
    pub format: ExportFormat,
}

/// Value returned by the injected routine.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InjectionResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl InjectionResult {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
        }
    }
}

/// Progress markers read back by the diagnostic probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct InjectionStatus {
    pub started: bool,
    pub running: bool,
    pub completed: bool,
}

#[derive(Debug)]
pub struct LaunchReport {
    pub tab: TabInfo,
    /// `None` when the probe failed or timed out.
    pub status: Option<InjectionStatus>,
}

#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error("Cannot capture browser-internal pages ({0})")]
    RestrictedPage(String),

    #[error("No active tab found")]
    NoActiveTab,

    #[error(transparent)]
    Access(#[from] AccessDenied),

    #[error("Capture tool injection failed: {0}")]
    Injection(String),

    #[error("Capture tool injection failed: {0}")]
    Host(#[from] HostError),
}

/// Start the selection tool in `tab` for `format`.
pub async fn launch_capture_tool<T: Tabs>(
    tabs: &T,
    tab: &TabInfo,
    format: ExportFormat,
    config: &ExtensionConfig,
) -> Result<LaunchReport, LaunchError> {
    if is_restricted_url(&tab.url) {
        log::warn!("[INJECT] Refusing restricted page: {}", tab.url);
        return Err(LaunchError::RestrictedPage(tab.url.clone()));
    }

    log::info!("[INJECT] Injecting capture tool into tab {} ({})", tab.id, format);

    let result = tabs
        .inject_capture_tool(tab.id, &ToolLaunch { format })
        .await?;

    if !result.success {
        let reason = result.error.unwrap_or_else(|| "unknown error".to_string());
        log::error!("[INJECT] Tool reported failure in tab {}: {}", tab.id, reason);
        return Err(LaunchError::Injection(reason));
    }

    log::info!("[INJECT] Capture tool running in tab {}", tab.id);

    let status = probe_after_delay(tabs, tab, config).await;

    Ok(LaunchReport {
        tab: tab.clone(),
        status,
    })
}

async fn probe_after_delay<T: Tabs>(
    tabs: &T,
    tab: &TabInfo,
    config: &ExtensionConfig,
) -> Option<InjectionStatus> {
    tokio::time::sleep(config.status_check_delay).await;

    match tokio::time::timeout(config.status_check_delay, tabs.probe_capture_tool(tab.id)).await {
        Ok(Ok(status)) => {
            log::debug!("[INJECT] Status check for tab {}: {:?}", tab.id, status);
            Some(status)
        }
        Ok(Err(e)) => {
            log::warn!("[INJECT] Status check failed for tab {}: {}", tab.id, e);
            None
        }
        Err(_) => {
            log::warn!("[INJECT] Status check timed out for tab {}", tab.id);
            None
        }
    }
}
