//! Cross-context message schema.
//!
//! Popup, background and content scripts exchange JSON envelopes tagged
//! by `type`. These types are the single source of truth for their shape.

use serde::{Deserialize, Serialize};

use crate::access::UserStatus;
use crate::capture::ExportFormat;

/// Messages sent over the runtime channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RuntimeMessage {
    /// Content script finished mounting in its tab.
    #[serde(rename = "contentScriptReady")]
    ContentScriptReady {
        #[serde(default)]
        from: Option<String>,
    },

    /// Ask the background for a bitmap of the visible tab.
    #[serde(rename = "captureVisibleTab")]
    CaptureVisibleTab,

    /// Hand an encoded crop to the background for download.
    #[serde(rename = "saveScreenshot", rename_all = "camelCase")]
    SaveScreenshot {
        image_data: String,
        #[serde(default)]
        format: ExportFormat,
        #[serde(default)]
        width: u32,
        #[serde(default)]
        height: u32,
    },

    /// Open the selection frame in a tab whose content script is ready.
    #[serde(rename = "toggleScreenshotMode")]
    ToggleScreenshotMode,

    #[serde(rename = "checkContentScriptStatus")]
    CheckContentScriptStatus,

    /// Login/plan status relayed from the hosting website.
    #[serde(rename = "USER_STATUS_UPDATE")]
    UserStatusUpdate {
        status: UserStatus,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<i64>,
    },

    #[serde(rename = "ping")]
    Ping,
}

impl RuntimeMessage {
    pub fn kind(&self) -> &'static str {
        match self {
            RuntimeMessage::ContentScriptReady { .. } => "contentScriptReady",
            RuntimeMessage::CaptureVisibleTab => "captureVisibleTab",
            RuntimeMessage::SaveScreenshot { .. } => "saveScreenshot",
            RuntimeMessage::ToggleScreenshotMode => "toggleScreenshotMode",
            RuntimeMessage::CheckContentScriptStatus => "checkContentScriptStatus",
            RuntimeMessage::UserStatusUpdate { .. } => "USER_STATUS_UPDATE",
            RuntimeMessage::Ping => "ping",
        }
    }
}

/// Replies to runtime messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuntimeResponse {
    Status { initialized: bool },
    Success { success: bool },
    Pong { pong: bool },
    /// Data URL for `captureVisibleTab`; `null` when the host refused.
    DataUrl(Option<String>),
}

impl RuntimeResponse {
    pub fn ack() -> Self {
        RuntimeResponse::Success { success: true }
    }

    pub fn failed() -> Self {
        RuntimeResponse::Success { success: false }
    }
}

/// Keyboard shortcuts declared by the extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    DirectScreenshot,
}

impl Command {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "direct-screenshot" => Some(Command::DirectScreenshot),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::DirectScreenshot => "direct-screenshot",
        }
    }
}
