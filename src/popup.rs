//! Popup controller: format picker and the two capture buttons.

use crate::access::{self, AccessDenied, AccessPolicy};
use crate::capture::ExportFormat;
use crate::config::ExtensionConfig;
use crate::host::{Storage, Tabs};
use crate::injection::{self, LaunchError, LaunchReport};

#[derive(Debug, Default)]
pub struct Popup {
    selected_format: ExportFormat,
    error_message: Option<String>,
    logs: Vec<String>,
    loading: bool,
}

impl Popup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected_format(&self) -> ExportFormat {
        self.selected_format
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    /// Activity log of the last action, oldest first.
    pub fn logs(&self) -> &[String] {
        &self.logs
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Pick an export format. Gated formats are refused for users without
    /// Pro or trial access and the previous choice stays selected.
    pub async fn select_format<S: Storage>(
        &mut self,
        storage: &S,
        format: ExportFormat,
    ) -> Result<(), AccessDenied> {
        if format.requires_elevated_access() {
            let status = access::load_user_status(storage).await;
            if let Err(denied) = access::check_export(&status, format) {
                self.error_message = Some(denied.to_string());
                self.log(format!("{} unavailable: {}", format, denied));
                return Err(denied);
            }
        }

        self.selected_format = format;
        self.error_message = None;
        Ok(())
    }

    /// Start the selection tool on the active tab.
    pub async fn start_capture<T: Tabs + Storage>(
        &mut self,
        tabs: &T,
        config: &ExtensionConfig,
    ) -> Result<LaunchReport, LaunchError> {
        self.begin("Starting screenshot...");
        let result = match check_capture_access(tabs, config).await {
            Ok(()) => self.launch_in_active_tab(tabs, config).await,
            Err(denied) => Err(denied.into()),
        };
        self.finish(result)
    }

    /// Open a regular web page and start the tool there once it has loaded.
    pub async fn open_new_tab_with_capture<T: Tabs + Storage>(
        &mut self,
        tabs: &T,
        config: &ExtensionConfig,
    ) -> Result<LaunchReport, LaunchError> {
        self.begin("Preparing screenshot in a new tab...");
        let result = match check_capture_access(tabs, config).await {
            Ok(()) => self.launch_in_new_tab(tabs, config).await,
            Err(denied) => Err(denied.into()),
        };
        self.finish(result)
    }

    async fn launch_in_active_tab<T: Tabs>(
        &mut self,
        tabs: &T,
        config: &ExtensionConfig,
    ) -> Result<LaunchReport, LaunchError> {
        let tab = tabs
            .query_active_tab()
            .await?
            .ok_or(LaunchError::NoActiveTab)?;
        self.log(format!("Current tab: {}", tab.url));

        injection::launch_capture_tool(tabs, &tab, self.selected_format, config).await
    }

    async fn launch_in_new_tab<T: Tabs>(
        &mut self,
        tabs: &T,
        config: &ExtensionConfig,
    ) -> Result<LaunchReport, LaunchError> {
        let tab = tabs.create_tab(&config.new_tab_url).await?;
        self.log(format!("New tab created, id {}", tab.id));

        tabs.wait_for_tab_complete(tab.id).await?;
        self.log("New tab finished loading".to_string());

        // Page scripts still run right after `complete`
        tokio::time::sleep(config.status_check_delay).await;

        injection::launch_capture_tool(tabs, &tab, self.selected_format, config).await
    }

    fn begin(&mut self, message: &str) {
        self.loading = true;
        self.error_message = None;
        self.logs.clear();
        self.log(message.to_string());
    }

    fn finish(
        &mut self,
        result: Result<LaunchReport, LaunchError>,
    ) -> Result<LaunchReport, LaunchError> {
        self.loading = false;
        match &result {
            Ok(report) => {
                self.log(format!("Capture tool injected into tab {}", report.tab.id));
            }
            Err(e) => {
                let hint = match e {
                    LaunchError::RestrictedPage(_) => " Try \"Capture in new tab\" instead.",
                    _ => "",
                };
                self.error_message = Some(format!("Screenshot failed: {}.{}", e, hint));
                self.log(format!("Screenshot failed: {}", e));
            }
        }
        result
    }

    fn log(&mut self, message: String) {
        log::debug!("[POPUP] {}", message);
        self.logs.push(message);
    }
}

async fn check_capture_access<S: Storage>(
    storage: &S,
    config: &ExtensionConfig,
) -> Result<(), AccessDenied> {
    let status = access::load_user_status(storage).await;
    let policy = AccessPolicy {
        require_login_for_capture: config.require_login_for_capture,
    };
    access::check_capture(&status, &policy)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{UserStatus, USER_STATUS_KEY};
    use crate::host::{HostError, TabId, TabInfo};
    use crate::injection::{InjectionResult, InjectionStatus, ToolLaunch};
    use crate::messages::{RuntimeMessage, RuntimeResponse};
    use serde_json::Value;
    use std::cell::RefCell;

    #[derive(Default)]
    struct FakeBrowser {
        active: Option<TabInfo>,
        stored: Option<Value>,
        created: RefCell<Vec<String>>,
        injected: RefCell<Vec<(TabId, ExportFormat)>>,
    }

    impl Storage for FakeBrowser {
        async fn get(&self, key: &str) -> Result<Option<Value>, HostError> {
            assert_eq!(key, USER_STATUS_KEY);
            Ok(self.stored.clone())
        }

        async fn set(&self, _key: &str, _value: Value) -> Result<(), HostError> {
            Ok(())
        }
    }

    impl Tabs for FakeBrowser {
        async fn query_active_tab(&self) -> Result<Option<TabInfo>, HostError> {
            Ok(self.active.clone())
        }

        async fn create_tab(&self, url: &str) -> Result<TabInfo, HostError> {
            self.created.borrow_mut().push(url.to_string());
            Ok(TabInfo {
                id: TabId(99),
                url: url.to_string(),
            })
        }

        async fn wait_for_tab_complete(&self, _tab: TabId) -> Result<(), HostError> {
            Ok(())
        }

        async fn send_to_tab(
            &self,
            _tab: TabId,
            _message: &RuntimeMessage,
        ) -> Result<RuntimeResponse, HostError> {
            Err(HostError::Disconnected)
        }

        async fn inject_capture_tool(
            &self,
            tab: TabId,
            launch: &ToolLaunch,
        ) -> Result<InjectionResult, HostError> {
            self.injected.borrow_mut().push((tab, launch.format));
            Ok(InjectionResult::ok())
        }

        async fn probe_capture_tool(&self, _tab: TabId) -> Result<InjectionStatus, HostError> {
            Ok(InjectionStatus {
                started: true,
                running: true,
                completed: false,
            })
        }
    }

    fn pro() -> Value {
        serde_json::to_value(UserStatus {
            is_logged_in: true,
            is_pro: true,
            is_in_trial: false,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn pdf_selection_refused_without_pro() {
        let browser = FakeBrowser::default();
        let mut popup = Popup::new();
        popup.select_format(&browser, ExportFormat::Jpeg).await.unwrap();

        let denied = popup.select_format(&browser, ExportFormat::Pdf).await;
        assert!(denied.is_err());
        assert_eq!(popup.selected_format(), ExportFormat::Jpeg);
        assert!(popup.error_message().is_some());
    }

    #[tokio::test]
    async fn pdf_selection_allowed_for_pro() {
        let browser = FakeBrowser {
            stored: Some(pro()),
            ..Default::default()
        };
        let mut popup = Popup::new();
        popup.select_format(&browser, ExportFormat::Pdf).await.unwrap();
        assert_eq!(popup.selected_format(), ExportFormat::Pdf);
        assert!(popup.error_message().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn start_capture_injects_selected_format() {
        let browser = FakeBrowser {
            active: Some(TabInfo {
                id: TabId(4),
                url: "https://example.org".to_string(),
            }),
            ..Default::default()
        };
        let mut popup = Popup::new();
        popup.select_format(&browser, ExportFormat::WebP).await.unwrap();

        let report = popup
            .start_capture(&browser, &ExtensionConfig::default())
            .await
            .unwrap();
        assert_eq!(report.tab.id, TabId(4));
        assert_eq!(*browser.injected.borrow(), vec![(TabId(4), ExportFormat::WebP)]);
        assert!(!popup.is_loading());
        assert!(popup.error_message().is_none());
    }

    #[tokio::test]
    async fn restricted_active_tab_suggests_new_tab() {
        let browser = FakeBrowser {
            active: Some(TabInfo {
                id: TabId(1),
                url: "chrome://settings".to_string(),
            }),
            ..Default::default()
        };
        let mut popup = Popup::new();

        let result = popup.start_capture(&browser, &ExtensionConfig::default()).await;
        assert!(matches!(result, Err(LaunchError::RestrictedPage(_))));
        assert!(popup.error_message().unwrap().contains("new tab"));
        assert!(browser.injected.borrow().is_empty());
    }

    #[tokio::test]
    async fn missing_active_tab_is_reported() {
        let browser = FakeBrowser::default();
        let mut popup = Popup::new();
        let result = popup.start_capture(&browser, &ExtensionConfig::default()).await;
        assert!(matches!(result, Err(LaunchError::NoActiveTab)));
        assert!(!popup.is_loading());
    }

    #[tokio::test(start_paused = true)]
    async fn new_tab_flow_opens_configured_page() {
        let browser = FakeBrowser::default();
        let config = ExtensionConfig::default();
        let mut popup = Popup::new();

        let report = popup
            .open_new_tab_with_capture(&browser, &config)
            .await
            .unwrap();
        assert_eq!(*browser.created.borrow(), vec![config.new_tab_url.clone()]);
        assert_eq!(report.tab.id, TabId(99));
        assert_eq!(browser.injected.borrow().len(), 1);
        assert!(popup.logs().len() >= 3);
    }

    fn login_required() -> ExtensionConfig {
        ExtensionConfig {
            require_login_for_capture: true,
            ..ExtensionConfig::default()
        }
    }

    #[tokio::test]
    async fn logged_out_user_cannot_start_capture_when_login_required() {
        let browser = FakeBrowser {
            active: Some(TabInfo {
                id: TabId(4),
                url: "https://example.org".to_string(),
            }),
            ..Default::default()
        };
        let mut popup = Popup::new();

        let result = popup.start_capture(&browser, &login_required()).await;
        assert!(matches!(
            result,
            Err(LaunchError::Access(AccessDenied::LoginRequired(_)))
        ));
        assert!(browser.injected.borrow().is_empty());
        assert!(popup.error_message().unwrap().contains("Sign in"));
        assert!(!popup.is_loading());

        let result = popup.open_new_tab_with_capture(&browser, &login_required()).await;
        assert!(matches!(result, Err(LaunchError::Access(_))));
        assert!(browser.created.borrow().is_empty());
        assert!(browser.injected.borrow().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn logged_in_user_passes_login_requirement() {
        let browser = FakeBrowser {
            active: Some(TabInfo {
                id: TabId(4),
                url: "https://example.org".to_string(),
            }),
            stored: Some(serde_json::json!({ "isLoggedIn": true })),
            ..Default::default()
        };
        let mut popup = Popup::new();

        popup.start_capture(&browser, &login_required()).await.unwrap();
        assert_eq!(browser.injected.borrow().len(), 1);
    }
}
