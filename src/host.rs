//! Host capabilities: everything the browser provides.
//!
//! Each trait maps to one browser API surface (tab capture, tabs,
//! downloads, notifications, local storage, runtime messaging).
//! Controllers are generic over these traits so they never touch the
//! browser directly.

#![allow(async_fn_in_trait)]

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::injection::{InjectionResult, InjectionStatus, ToolLaunch};
use crate::messages::{RuntimeMessage, RuntimeResponse};

/// Browser tab identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TabId(pub i64);

impl std::fmt::Display for TabId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabInfo {
    pub id: TabId,
    pub url: String,
}

/// Download identifier assigned by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DownloadId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadState {
    InProgress,
    Interrupted,
    Complete,
}

/// A state change reported by the host's download tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadDelta {
    pub id: DownloadId,
    pub state: DownloadState,
    /// Whether an interrupted download can still be resumed.
    pub can_resume: bool,
}

impl DownloadDelta {
    pub fn new(id: DownloadId, state: DownloadState) -> Self {
        Self {
            id,
            state,
            can_resume: false,
        }
    }

    /// True once the download can no longer read its URL.
    pub fn is_final(&self) -> bool {
        match self.state {
            DownloadState::Complete => true,
            DownloadState::Interrupted => !self.can_resume,
            DownloadState::InProgress => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    /// Data URL or object URL holding the payload.
    pub url: String,
    pub filename: String,
    pub save_as: bool,
}

/// User-visible notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub message: String,
}

impl Notice {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HostError {
    #[error("Host denied the request: {0}")]
    Denied(String),

    #[error("Host capability unavailable: {0}")]
    Unavailable(String),

    #[error("Receiving end does not exist")]
    Disconnected,
}

/// Snapshot of the active tab's visible viewport.
pub trait TabCapture {
    /// Returns the viewport as a PNG data URL.
    async fn capture_visible_tab(&self) -> Result<String, HostError>;
}

pub trait Tabs {
    async fn query_active_tab(&self) -> Result<Option<TabInfo>, HostError>;

    async fn create_tab(&self, url: &str) -> Result<TabInfo, HostError>;

    /// Resolves once the tab reports the `complete` loading status.
    async fn wait_for_tab_complete(&self, tab: TabId) -> Result<(), HostError>;

    async fn send_to_tab(
        &self,
        tab: TabId,
        message: &RuntimeMessage,
    ) -> Result<RuntimeResponse, HostError>;

    /// Runs the capture tool routine inside the page and returns its result value.
    async fn inject_capture_tool(
        &self,
        tab: TabId,
        launch: &ToolLaunch,
    ) -> Result<InjectionResult, HostError>;

    async fn probe_capture_tool(&self, tab: TabId) -> Result<InjectionStatus, HostError>;
}

pub trait Downloads {
    /// Wraps a binary payload in a temporary object URL.
    fn create_object_url(&self, bytes: Vec<u8>, mime: &str) -> String;

    fn revoke_object_url(&self, url: &str);

    async fn download(&self, request: DownloadRequest) -> Result<DownloadId, HostError>;
}

pub trait Notifications {
    fn notify(&self, notice: &Notice);
}

/// Extension-local key-value storage.
pub trait Storage {
    async fn get(&self, key: &str) -> Result<Option<Value>, HostError>;

    async fn set(&self, key: &str, value: Value) -> Result<(), HostError>;
}

/// Point-to-point channel from a page context to the background.
pub trait RuntimeChannel {
    async fn send(&self, message: RuntimeMessage) -> Result<RuntimeResponse, HostError>;
}

/// Everything the background context needs from the browser.
pub trait Host: TabCapture + Tabs + Downloads + Notifications + Storage {}

impl<T> Host for T where T: TabCapture + Tabs + Downloads + Notifications + Storage {}
