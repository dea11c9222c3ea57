//! Background coordinator: the privileged context.
//!
//! Relays capture requests to the host, saves finished screenshots,
//! persists status pushed by the website and reacts to the keyboard
//! shortcut. Per-tab readiness lives in a registry owned here and is
//! cleared when the tab closes.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::access::{self, AccessPolicy};
use crate::capture::{ExportFormat, ImagePdfWriter, PdfWriter};
use crate::config::ExtensionConfig;
use crate::export::{ExportDispatcher, ExportOutcome, ExportRequest};
use crate::host::{DownloadDelta, Host, Notice, TabId, TabInfo};
use crate::injection::{self, LaunchError};
use crate::messages::{Command, RuntimeMessage, RuntimeResponse};

/// Content-script readiness per tab.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    ready: HashMap<TabId, bool>,
}

impl SessionRegistry {
    pub fn mark_ready(&mut self, tab: TabId) {
        self.ready.insert(tab, true);
    }

    pub fn is_ready(&self, tab: TabId) -> bool {
        self.ready.get(&tab).copied().unwrap_or(false)
    }

    pub fn remove(&mut self, tab: TabId) -> bool {
        self.ready.remove(&tab).is_some()
    }

    pub fn len(&self) -> usize {
        self.ready.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ready.is_empty()
    }
}

/// How the selection tool was brought up in a tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// The resident content script was told to open the frame.
    Toggled,
    /// The tool routine was injected into the page.
    Injected,
}

pub struct Background<H: Host, W: PdfWriter = ImagePdfWriter> {
    host: H,
    config: ExtensionConfig,
    sessions: Mutex<SessionRegistry>,
    exports: ExportDispatcher<W>,
}

impl<H: Host> Background<H> {
    pub fn new(host: H, config: ExtensionConfig) -> Self {
        let exports = ExportDispatcher::new(ImagePdfWriter::default(), config.save_as);
        Self::with_dispatcher(host, config, exports)
    }
}

impl<H: Host, W: PdfWriter> Background<H, W> {
    pub fn with_dispatcher(host: H, config: ExtensionConfig, exports: ExportDispatcher<W>) -> Self {
        log::info!("[BACKGROUND] Initialized ({})", config.environment.as_str());
        Self {
            host,
            config,
            sessions: Mutex::new(SessionRegistry::default()),
            exports,
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn config(&self) -> &ExtensionConfig {
        &self.config
    }

    pub fn exports(&self) -> &ExportDispatcher<W> {
        &self.exports
    }

    pub fn is_tab_ready(&self, tab: TabId) -> bool {
        self.sessions().is_ready(tab)
    }

    /// Handle one runtime message. `sender` is the tab that sent it, if any.
    pub async fn handle_message(&self, message: RuntimeMessage, sender: Option<TabId>) -> RuntimeResponse {
        log::debug!("[BACKGROUND] Received {} from {:?}", message.kind(), sender);

        match message {
            RuntimeMessage::ContentScriptReady { from } => {
                if let Some(tab) = sender {
                    self.sessions().mark_ready(tab);
                    log::info!(
                        "[BACKGROUND] Content script ready in tab {} ({})",
                        tab,
                        from.as_deref().unwrap_or("content")
                    );
                }
                RuntimeResponse::ack()
            }

            RuntimeMessage::CaptureVisibleTab => match self.host.capture_visible_tab().await {
                Ok(url) => RuntimeResponse::DataUrl(Some(url)),
                Err(e) => {
                    log::error!("[BACKGROUND] Error capturing tab: {}", e);
                    self.host.notify(&Notice::new("Screenshot failed", e.to_string()));
                    RuntimeResponse::DataUrl(None)
                }
            },

            RuntimeMessage::SaveScreenshot {
                image_data,
                format,
                width,
                height,
            } => {
                let request = ExportRequest {
                    image_data,
                    format,
                    width,
                    height,
                };
                match self.save_screenshot(request).await {
                    Some(_) => RuntimeResponse::ack(),
                    None => RuntimeResponse::failed(),
                }
            }

            RuntimeMessage::CheckContentScriptStatus => RuntimeResponse::Status {
                initialized: sender.map(|tab| self.is_tab_ready(tab)).unwrap_or(false),
            },

            RuntimeMessage::UserStatusUpdate { status, .. } => {
                match access::save_user_status(&self.host, &status).await {
                    Ok(()) => RuntimeResponse::ack(),
                    Err(e) => {
                        log::error!("[BACKGROUND] Failed to store user status: {}", e);
                        RuntimeResponse::failed()
                    }
                }
            }

            RuntimeMessage::Ping => RuntimeResponse::Pong { pong: true },

            RuntimeMessage::ToggleScreenshotMode => {
                log::warn!("[BACKGROUND] toggleScreenshotMode is addressed to content scripts");
                RuntimeResponse::failed()
            }
        }
    }

    /// Save an encoded crop, enforcing the access gate for elevated formats.
    pub async fn save_screenshot(&self, request: ExportRequest) -> Option<ExportOutcome> {
        if request.format.requires_elevated_access() {
            let status = access::load_user_status(&self.host).await;
            if let Err(denied) = access::check_export(&status, request.format) {
                self.host.notify(&Notice::new("Upgrade required", denied.to_string()));
                return None;
            }
        }

        match self.exports.dispatch(&self.host, request).await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                log::error!("[BACKGROUND] Failed to save screenshot: {}", e);
                self.host.notify(&Notice::new("Screenshot not saved", e.to_string()));
                None
            }
        }
    }

    /// Keyboard shortcut entry point.
    pub async fn handle_command(&self, name: &str) -> Option<Activation> {
        match Command::from_name(name) {
            Some(Command::DirectScreenshot) => self.capture_active_tab(ExportFormat::default()).await,
            None => {
                log::debug!("[BACKGROUND] Ignoring unknown command {:?}", name);
                None
            }
        }
    }

    /// Open the selection tool on the active tab, reporting failures as notices.
    pub async fn capture_active_tab(&self, format: ExportFormat) -> Option<Activation> {
        let status = access::load_user_status(&self.host).await;
        let policy = AccessPolicy {
            require_login_for_capture: self.config.require_login_for_capture,
        };
        if let Err(denied) = access::check_capture(&status, &policy) {
            self.host.notify(&Notice::new("Sign in required", denied.to_string()));
            return None;
        }

        let tab = match self.host.query_active_tab().await {
            Ok(Some(tab)) => tab,
            Ok(None) => {
                self.notify_launch_failure(&LaunchError::NoActiveTab);
                return None;
            }
            Err(e) => {
                self.notify_launch_failure(&e.into());
                return None;
            }
        };

        match self.activate_tool(&tab, format).await {
            Ok(activation) => Some(activation),
            Err(e) => {
                self.notify_launch_failure(&e);
                None
            }
        }
    }

    /// Toggle the resident content script if it is ready, otherwise inject the tool.
    pub async fn activate_tool(&self, tab: &TabInfo, format: ExportFormat) -> Result<Activation, LaunchError> {
        if injection::is_restricted_url(&tab.url) {
            return Err(LaunchError::RestrictedPage(tab.url.clone()));
        }

        if self.is_tab_ready(tab.id) {
            match self
                .host
                .send_to_tab(tab.id, &RuntimeMessage::ToggleScreenshotMode)
                .await
            {
                Ok(RuntimeResponse::Success { success: true }) => {
                    log::info!("[BACKGROUND] Screenshot mode toggled in tab {}", tab.id);
                    return Ok(Activation::Toggled);
                }
                Ok(other) => {
                    log::warn!("[BACKGROUND] Tab {} declined toggle: {:?}", tab.id, other);
                }
                Err(e) => {
                    // Stale registration; the page navigated or reloaded
                    log::warn!("[BACKGROUND] Tab {} did not answer toggle: {}", tab.id, e);
                    self.sessions().remove(tab.id);
                }
            }
        }

        injection::launch_capture_tool(&self.host, tab, format, &self.config).await?;
        Ok(Activation::Injected)
    }

    pub fn on_tab_removed(&self, tab: TabId) {
        if self.sessions().remove(tab) {
            log::debug!("[BACKGROUND] Cleared session for closed tab {}", tab);
        }
    }

    pub fn on_download_changed(&self, delta: DownloadDelta) -> bool {
        self.exports.on_download_changed(&self.host, delta)
    }

    fn notify_launch_failure(&self, error: &LaunchError) {
        log::error!("[BACKGROUND] Could not start capture: {}", error);
        self.host.notify(&Notice::new("Screenshot unavailable", error.to_string()));
    }

    fn sessions(&self) -> MutexGuard<'_, SessionRegistry> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registry_tracks_and_clears_tabs() {
        let mut registry = SessionRegistry::default();
        assert!(!registry.is_ready(TabId(1)));
        registry.mark_ready(TabId(1));
        registry.mark_ready(TabId(2));
        assert!(registry.is_ready(TabId(1)));
        assert_eq!(registry.len(), 2);
        assert!(registry.remove(TabId(1)));
        assert!(!registry.remove(TabId(1)));
        assert!(!registry.is_ready(TabId(1)));
        assert!(registry.is_ready(TabId(2)));
    }
}
