//! Content controller: the page-side half of a capture.
//!
//! Owns at most one capture session (the selection frame plus the chosen
//! format). Confirming a session runs capture → crop → encode and hands
//! the result to the background for saving.

use serde_json::Value;

use crate::bridge;
use crate::capture::{
    self, capture_without_overlay, CaptureError, ExportFormat, ProcessError, SelectionFrame,
};
use crate::config::ExtensionConfig;
use crate::host::{HostError, RuntimeChannel};
use crate::messages::{RuntimeMessage, RuntimeResponse};

/// One open selection frame.
#[derive(Debug, Clone)]
pub struct CaptureSession {
    pub frame: SelectionFrame,
    pub format: ExportFormat,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SavedCapture {
    pub format: ExportFormat,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("No capture session is open")]
    NoSession,

    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error("Could not process screenshot: {0}")]
    Process(#[from] ProcessError),

    #[error("Could not reach the extension: {0}")]
    Channel(#[from] HostError),

    #[error("The extension could not save the screenshot")]
    SaveRejected,
}

pub struct ContentApp<C: RuntimeChannel> {
    channel: C,
    config: ExtensionConfig,
    viewport: (i32, i32),
    format: ExportFormat,
    session: Option<CaptureSession>,
}

impl<C: RuntimeChannel> ContentApp<C> {
    pub fn new(channel: C, config: ExtensionConfig, viewport_width: i32, viewport_height: i32) -> Self {
        Self {
            channel,
            config,
            viewport: (viewport_width, viewport_height),
            format: ExportFormat::default(),
            session: None,
        }
    }

    /// Announce readiness to the background.
    pub async fn mount(&self) -> Result<(), HostError> {
        self.channel
            .send(RuntimeMessage::ContentScriptReady {
                from: Some("content-ui".to_string()),
            })
            .await?;
        log::debug!("[CAPTURE] Sent contentScriptReady");
        Ok(())
    }

    /// Message to post to the page once the content script has loaded.
    pub fn page_announcement(&self) -> Value {
        bridge::ready_announcement().to_value()
    }

    pub fn set_viewport(&mut self, width: i32, height: i32) {
        self.viewport = (width, height);
    }

    /// Format used by the next activation.
    pub fn set_format(&mut self, format: ExportFormat) {
        self.format = format;
        if let Some(session) = self.session.as_mut() {
            session.format = format;
        }
    }

    pub fn session(&self) -> Option<&CaptureSession> {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut CaptureSession> {
        self.session.as_mut()
    }

    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// Open a centered selection frame. A second activation keeps the open frame.
    pub fn activate(&mut self) {
        if self.session.is_some() {
            return;
        }
        log::info!("[CAPTURE] Screenshot mode activated ({})", self.format);
        self.session = Some(CaptureSession {
            frame: SelectionFrame::centered(self.viewport.0, self.viewport.1),
            format: self.format,
        });
    }

    /// Close the tool without saving anything.
    pub fn cancel(&mut self) {
        if self.session.take().is_some() {
            log::info!("[CAPTURE] Screenshot mode closed");
        }
    }

    /// Runtime messages addressed to this tab.
    pub fn handle_message(&mut self, message: &RuntimeMessage) -> Option<RuntimeResponse> {
        match message {
            RuntimeMessage::Ping => Some(RuntimeResponse::Pong { pong: true }),
            RuntimeMessage::ToggleScreenshotMode => {
                self.activate();
                Some(RuntimeResponse::ack())
            }
            _ => None,
        }
    }

    /// `activate-screenshot` DOM event from the page.
    pub fn handle_custom_event(&mut self, action: &str) -> bool {
        if action == "start" {
            self.activate();
            true
        } else {
            false
        }
    }

    /// Page `message` event. Forwards status updates and returns the reply to post.
    pub async fn handle_page_message(&self, same_window: bool, data: &Value) -> Option<Value> {
        let outcome = bridge::handle_page_message(same_window, data);

        if let Some(forward) = outcome.forward {
            if let Err(e) = self.channel.send(forward).await {
                log::warn!("[BRIDGE] Failed to forward page message: {}", e);
            }
        }

        outcome.reply.map(|reply| reply.to_value())
    }

    /// Capture the selection and send it to the background for saving.
    ///
    /// A refused capture leaves the session open with the frame restored.
    /// Any later failure ends the session.
    pub async fn confirm(&mut self) -> Result<SavedCapture, ContentError> {
        let session = self.session.as_mut().ok_or(ContentError::NoSession)?;

        let viewport =
            capture_without_overlay(&self.channel, &mut session.frame, self.config.settle_delay).await?;

        let rect = session.frame.rect();
        let format = session.format;
        self.session = None;

        let encoded = capture::crop_and_encode(&viewport, &rect, format, self.config.jpeg_quality)
            .inspect_err(|e| log::error!("[CAPTURE] {}", e))?;

        let saved = SavedCapture {
            format,
            width: encoded.width,
            height: encoded.height,
        };

        let response = self
            .channel
            .send(RuntimeMessage::SaveScreenshot {
                image_data: encoded.to_data_url(),
                format,
                width: encoded.width,
                height: encoded.height,
            })
            .await?;

        match response {
            RuntimeResponse::Success { success: false } => Err(ContentError::SaveRejected),
            _ => {
                log::info!("[CAPTURE] Screenshot captured ({}x{} {})", saved.width, saved.height, format);
                Ok(saved)
            }
        }
    }
}
