//! Page ↔ extension bridge.
//!
//! The PixelCapture website talks to the content script over
//! `window.postMessage`. Anything not posted by the same window with the
//! website's source tag is dropped, so other frames cannot spoof a
//! status update.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::access::UserStatus;
use crate::messages::RuntimeMessage;

pub const WEBSITE_SOURCE: &str = "pixel-capture-website";
pub const EXTENSION_SOURCE: &str = "pixel-capture-extension";

#[derive(Debug, Deserialize)]
struct InboundEnvelope {
    #[serde(default)]
    source: Option<String>,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    status: Option<UserStatus>,
    #[serde(default)]
    timestamp: Option<i64>,
}

/// Messages the extension posts back to the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum PageReply {
    #[serde(rename = "PIXEL_CAPTURE_STATUS_RECEIVED")]
    StatusReceived { success: bool },
    #[serde(rename = "PIXEL_CAPTURE_PONG")]
    Pong,
    #[serde(rename = "PIXEL_CAPTURE_EXTENSION_READY")]
    ExtensionReady,
}

#[derive(Serialize)]
struct OutboundEnvelope<'a> {
    #[serde(flatten)]
    reply: &'a PageReply,
    source: &'static str,
}

impl PageReply {
    /// Wire form, tagged with the extension's source.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(OutboundEnvelope {
            reply: self,
            source: EXTENSION_SOURCE,
        })
        .unwrap_or(Value::Null)
    }
}

/// What the content script should do with one page message.
#[derive(Debug, Default, PartialEq)]
pub struct BridgeOutcome {
    /// Message to relay to the background.
    pub forward: Option<RuntimeMessage>,
    /// Message to post back to the page.
    pub reply: Option<PageReply>,
}

/// Sent once when the content script loads.
pub fn ready_announcement() -> PageReply {
    PageReply::ExtensionReady
}

/// Handle a `message` event from the page.
///
/// `same_window` is whether the event's source is the content script's
/// own window.
pub fn handle_page_message(same_window: bool, data: &Value) -> BridgeOutcome {
    if !same_window {
        return BridgeOutcome::default();
    }

    let envelope: InboundEnvelope = match serde_json::from_value(data.clone()) {
        Ok(env) => env,
        Err(_) => return BridgeOutcome::default(),
    };

    if envelope.source.as_deref() != Some(WEBSITE_SOURCE) {
        return BridgeOutcome::default();
    }

    log::debug!("[BRIDGE] Page message: {}", envelope.kind);

    match envelope.kind.as_str() {
        "PIXEL_CAPTURE_USER_STATUS" => match envelope.status {
            Some(status) => BridgeOutcome {
                forward: Some(RuntimeMessage::UserStatusUpdate {
                    status,
                    timestamp: envelope.timestamp,
                }),
                reply: Some(PageReply::StatusReceived { success: true }),
            },
            None => {
                log::warn!("[BRIDGE] Status message without a status payload");
                BridgeOutcome::default()
            }
        },
        "PIXEL_CAPTURE_PING" => BridgeOutcome {
            forward: None,
            reply: Some(PageReply::Pong),
        },
        _ => BridgeOutcome::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn forwards_status_updates() {
        let outcome = handle_page_message(
            true,
            &json!({
                "source": WEBSITE_SOURCE,
                "type": "PIXEL_CAPTURE_USER_STATUS",
                "status": { "isLoggedIn": true, "isPro": true, "isInTrial": false },
                "timestamp": 42,
            }),
        );
        match outcome.forward {
            Some(RuntimeMessage::UserStatusUpdate { status, timestamp }) => {
                assert!(status.is_pro);
                assert_eq!(timestamp, Some(42));
            }
            other => panic!("unexpected forward {:?}", other),
        }
        assert_eq!(
            outcome.reply.unwrap().to_value(),
            json!({
                "type": "PIXEL_CAPTURE_STATUS_RECEIVED",
                "success": true,
                "source": EXTENSION_SOURCE,
            })
        );
    }

    #[test]
    fn answers_ping() {
        let outcome = handle_page_message(
            true,
            &json!({ "source": WEBSITE_SOURCE, "type": "PIXEL_CAPTURE_PING" }),
        );
        assert_eq!(outcome.forward, None);
        assert_eq!(
            outcome.reply.unwrap().to_value(),
            json!({ "type": "PIXEL_CAPTURE_PONG", "source": EXTENSION_SOURCE })
        );
    }

    #[test]
    fn drops_foreign_sources() {
        let spoofed = json!({
            "source": "evil-site",
            "type": "PIXEL_CAPTURE_USER_STATUS",
            "status": { "isLoggedIn": true, "isPro": true },
        });
        assert_eq!(handle_page_message(true, &spoofed), BridgeOutcome::default());
    }

    #[test]
    fn drops_other_windows() {
        let msg = json!({ "source": WEBSITE_SOURCE, "type": "PIXEL_CAPTURE_PING" });
        assert_eq!(handle_page_message(false, &msg), BridgeOutcome::default());
    }

    #[test]
    fn ignores_non_envelopes() {
        assert_eq!(handle_page_message(true, &json!("hello")), BridgeOutcome::default());
        assert_eq!(handle_page_message(true, &Value::Null), BridgeOutcome::default());
    }

    #[test]
    fn ready_announcement_is_tagged() {
        assert_eq!(
            ready_announcement().to_value(),
            json!({ "type": "PIXEL_CAPTURE_EXTENSION_READY", "source": EXTENSION_SOURCE })
        );
    }
}
