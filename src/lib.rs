//! PixelCapture: region screenshot core for the browser extension.
//!
//! The extension runs in three contexts, each with its own controller:
//! - Background coordinator (background.rs): capture relay, export, status
//! - Content controller (content.rs): selection frame and capture pipeline
//! - Popup controller (popup.rs): format picker and capture buttons
//!
//! Browser APIs are reached only through the traits in `host`.

pub mod access;
pub mod background;
pub mod bridge;
pub mod capture;
pub mod config;
pub mod content;
pub mod export;
pub mod host;
pub mod injection;
pub mod messages;
pub mod popup;

pub use background::{Activation, Background, SessionRegistry};
pub use capture::ExportFormat;
pub use config::{Environment, ExtensionConfig};
pub use content::ContentApp;
pub use export::{ExportDispatcher, ExportOutcome, ExportRequest};
pub use messages::{RuntimeMessage, RuntimeResponse};
pub use popup::Popup;

/// Install the global logger. Development builds log at debug level unless
/// `RUST_LOG` says otherwise. Safe to call more than once.
pub fn init_logging(environment: Environment) {
    let env = env_logger::Env::default().default_filter_or(environment.default_log_level());
    if env_logger::Builder::from_env(env).try_init().is_ok() {
        log::info!("PixelCapture starting up ({})", environment.as_str());
    }
}
