//! In-memory browser used by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use image::{ImageEncoder, Rgba, RgbaImage};
use serde_json::Value;

use pixel_capture_lib::background::Background;
use pixel_capture_lib::capture::{data_url, PdfWriter};
use pixel_capture_lib::host::{
    DownloadId, DownloadRequest, Downloads, HostError, Notice, Notifications, RuntimeChannel,
    Storage, TabCapture, TabId, TabInfo, Tabs,
};
use pixel_capture_lib::injection::{InjectionResult, InjectionStatus, ToolLaunch};
use pixel_capture_lib::messages::{RuntimeMessage, RuntimeResponse};

pub const VIEWPORT_WIDTH: u32 = 800;
pub const VIEWPORT_HEIGHT: u32 = 600;

/// Viewport bitmap with a distinct color per pixel.
pub fn viewport_image() -> RgbaImage {
    RgbaImage::from_fn(VIEWPORT_WIDTH, VIEWPORT_HEIGHT, |x, y| {
        Rgba([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8, 255])
    })
}

pub fn png_data_url(img: &RgbaImage) -> String {
    let mut bytes = Vec::new();
    image::codecs::png::PngEncoder::new(&mut bytes)
        .write_image(
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgba8,
        )
        .unwrap();
    data_url::encode("image/png", &bytes)
}

fn locked<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap()
}

pub struct FakeHost {
    pub viewport: Mutex<Option<String>>,
    pub active_tab: Mutex<Option<TabInfo>>,
    pub storage: Mutex<HashMap<String, Value>>,
    pub downloads: Mutex<Vec<DownloadRequest>>,
    pub download_fails: Mutex<bool>,
    pub notices: Mutex<Vec<Notice>>,
    pub object_urls: Mutex<Vec<(String, usize)>>,
    pub revoked: Mutex<Vec<String>>,
    pub sent_to_tabs: Mutex<Vec<(TabId, RuntimeMessage)>>,
    /// Reply of a tab's content script; `None` means nobody is listening.
    pub tab_reply: Mutex<Option<RuntimeResponse>>,
    pub created_tabs: Mutex<Vec<String>>,
    pub injected: Mutex<Vec<(TabId, ToolLaunch)>>,
    pub inject_result: Mutex<InjectionResult>,
    pub probe_hangs: Mutex<bool>,
    pub probes: Mutex<usize>,
}

impl Default for FakeHost {
    fn default() -> Self {
        Self {
            viewport: Mutex::new(Some(png_data_url(&viewport_image()))),
            active_tab: Mutex::new(Some(TabInfo {
                id: TabId(1),
                url: "https://example.org/article".to_string(),
            })),
            storage: Mutex::new(HashMap::new()),
            downloads: Mutex::new(Vec::new()),
            download_fails: Mutex::new(false),
            notices: Mutex::new(Vec::new()),
            object_urls: Mutex::new(Vec::new()),
            revoked: Mutex::new(Vec::new()),
            sent_to_tabs: Mutex::new(Vec::new()),
            tab_reply: Mutex::new(None),
            created_tabs: Mutex::new(Vec::new()),
            injected: Mutex::new(Vec::new()),
            inject_result: Mutex::new(InjectionResult::ok()),
            probe_hangs: Mutex::new(false),
            probes: Mutex::new(0),
        }
    }
}

impl FakeHost {
    pub fn with_status(status: Value) -> Self {
        let host = Self::default();
        locked(&host.storage).insert("userStatus".to_string(), status);
        host
    }

    pub fn set_active_url(&self, url: &str) {
        let mut tab = locked(&self.active_tab);
        let id = tab.as_ref().map(|t| t.id).unwrap_or(TabId(1));
        *tab = Some(TabInfo {
            id,
            url: url.to_string(),
        });
    }

    pub fn downloads(&self) -> Vec<DownloadRequest> {
        locked(&self.downloads).clone()
    }

    pub fn notices(&self) -> Vec<Notice> {
        locked(&self.notices).clone()
    }

    pub fn revoked(&self) -> Vec<String> {
        locked(&self.revoked).clone()
    }

    pub fn injected(&self) -> Vec<(TabId, ToolLaunch)> {
        locked(&self.injected).clone()
    }

    pub fn sent_to_tabs(&self) -> Vec<(TabId, RuntimeMessage)> {
        locked(&self.sent_to_tabs).clone()
    }

    pub fn stored(&self, key: &str) -> Option<Value> {
        locked(&self.storage).get(key).cloned()
    }
}

impl TabCapture for FakeHost {
    async fn capture_visible_tab(&self) -> Result<String, HostError> {
        locked(&self.viewport)
            .clone()
            .ok_or_else(|| HostError::Denied("activeTab permission missing".to_string()))
    }
}

impl Tabs for FakeHost {
    async fn query_active_tab(&self) -> Result<Option<TabInfo>, HostError> {
        Ok(locked(&self.active_tab).clone())
    }

    async fn create_tab(&self, url: &str) -> Result<TabInfo, HostError> {
        let mut created = locked(&self.created_tabs);
        created.push(url.to_string());
        Ok(TabInfo {
            id: TabId(100 + created.len() as i64),
            url: url.to_string(),
        })
    }

    async fn wait_for_tab_complete(&self, _tab: TabId) -> Result<(), HostError> {
        Ok(())
    }

    async fn send_to_tab(
        &self,
        tab: TabId,
        message: &RuntimeMessage,
    ) -> Result<RuntimeResponse, HostError> {
        locked(&self.sent_to_tabs).push((tab, message.clone()));
        locked(&self.tab_reply).clone().ok_or(HostError::Disconnected)
    }

    async fn inject_capture_tool(
        &self,
        tab: TabId,
        launch: &ToolLaunch,
    ) -> Result<InjectionResult, HostError> {
        locked(&self.injected).push((tab, *launch));
        Ok(locked(&self.inject_result).clone())
    }

    async fn probe_capture_tool(&self, _tab: TabId) -> Result<InjectionStatus, HostError> {
        *locked(&self.probes) += 1;
        if *locked(&self.probe_hangs) {
            std::future::pending::<()>().await;
        }
        Ok(InjectionStatus {
            started: true,
            running: true,
            completed: false,
        })
    }
}

impl Downloads for FakeHost {
    fn create_object_url(&self, bytes: Vec<u8>, _mime: &str) -> String {
        let mut urls = locked(&self.object_urls);
        let url = format!("blob:pixel-capture/{}", urls.len() + 1);
        urls.push((url.clone(), bytes.len()));
        url
    }

    fn revoke_object_url(&self, url: &str) {
        locked(&self.revoked).push(url.to_string());
    }

    async fn download(&self, request: DownloadRequest) -> Result<DownloadId, HostError> {
        if *locked(&self.download_fails) {
            return Err(HostError::Unavailable("downloads disabled".to_string()));
        }
        let mut downloads = locked(&self.downloads);
        downloads.push(request);
        Ok(DownloadId(downloads.len() as u64))
    }
}

impl Notifications for FakeHost {
    fn notify(&self, notice: &Notice) {
        locked(&self.notices).push(notice.clone());
    }
}

impl Storage for FakeHost {
    async fn get(&self, key: &str) -> Result<Option<Value>, HostError> {
        Ok(locked(&self.storage).get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<(), HostError> {
        locked(&self.storage).insert(key.to_string(), value);
        Ok(())
    }
}

/// Content-side channel that delivers straight into a background.
pub struct Loopback<'a, W: PdfWriter> {
    pub background: &'a Background<FakeHost, W>,
    pub tab: TabId,
}

impl<W: PdfWriter> RuntimeChannel for Loopback<'_, W> {
    async fn send(&self, message: RuntimeMessage) -> Result<RuntimeResponse, HostError> {
        Ok(self.background.handle_message(message, Some(self.tab)).await)
    }
}

pub fn pro_status() -> Value {
    serde_json::json!({ "isLoggedIn": true, "isPro": true, "isInTrial": false })
}

pub fn free_status() -> Value {
    serde_json::json!({ "isLoggedIn": true, "isPro": false, "isInTrial": false })
}
