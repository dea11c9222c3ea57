//! Viewport capture requested from the privileged context.
//!
//! This is the infrastructure layer; it talks to the host. Content
//! frames cannot capture tabs themselves, so the request travels to
//! the background as a `captureVisibleTab` message.

use image::DynamicImage;
use std::time::Duration;

use super::data_url::{self, DataUrlError};
use super::selection::SelectionFrame;
use crate::host::RuntimeChannel;
use crate::messages::{RuntimeMessage, RuntimeResponse};

/// Hides the frame, lets one render pass go by, then asks for the
/// viewport bitmap.
///
/// The frame is shown again if the capture fails so the user can retry.
/// On success it stays hidden; the session is about to end anyway.
pub async fn capture_without_overlay<C: RuntimeChannel>(
    channel: &C,
    frame: &mut SelectionFrame,
    settle_delay: Duration,
) -> Result<DynamicImage, CaptureError> {
    frame.hide();
    tokio::time::sleep(settle_delay).await;

    let result = request_visible_tab(channel).await;
    if let Err(e) = &result {
        log::warn!("[CAPTURE] Capture failed, restoring frame: {}", e);
        frame.show();
    }
    result
}

/// Requests a bitmap of the visible viewport and decodes it.
pub async fn request_visible_tab<C: RuntimeChannel>(channel: &C) -> Result<DynamicImage, CaptureError> {
    let start = std::time::Instant::now();

    let response = channel
        .send(RuntimeMessage::CaptureVisibleTab)
        .await
        .map_err(|e| CaptureError::Denied(e.to_string()))?;

    let url = match response {
        RuntimeResponse::DataUrl(Some(url)) => url,
        RuntimeResponse::DataUrl(None) => {
            return Err(CaptureError::Denied("host returned no image".to_string()))
        }
        other => return Err(CaptureError::UnexpectedResponse(format!("{:?}", other))),
    };

    let decoded = data_url::decode(&url)?;
    let image = image::load_from_memory(&decoded.bytes)?;

    log::info!(
        "[CAPTURE] Viewport captured ({}x{}) in {}ms",
        image.width(),
        image.height(),
        start.elapsed().as_millis()
    );

    Ok(image)
}

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("Tab capture denied: {0}")]
    Denied(String),

    #[error("Unexpected capture response: {0}")]
    UnexpectedResponse(String),

    #[error("Capture payload is not a data URL: {0}")]
    DataUrl(#[from] DataUrlError),

    #[error("Capture payload could not be decoded: {0}")]
    Decode(#[from] image::ImageError),
}
