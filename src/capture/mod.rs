//! Screen capture domain: public API.
//!
//! This module owns the selection frame, viewport capture, cropping and
//! encoding. External code should only use the items exported here.

pub mod data_url;
mod encode;
mod pdf;
mod region;
mod screenshot;
mod selection;

pub use encode::{encode_for_export, EncodeError, EncodedImage, ExportFormat};
pub use pdf::{ImagePdfWriter, Orientation, PdfError, PdfOptions, PdfWriter};
pub use region::{clamp_to_bounds, crop_region, CropBounds, CropError};
pub use screenshot::{capture_without_overlay, request_visible_tab, CaptureError};
pub use selection::{
    FrameInputs, Handle, PointerTarget, SelectionFrame, SelectionRect, DEFAULT_HEIGHT,
    DEFAULT_WIDTH, HANDLE_SIZE, MIN_DIM,
};

use image::DynamicImage;

/// Crop the captured viewport and encode it for the chosen format.
///
/// PDF comes back as PNG; the export step wraps it into a page.
pub fn crop_and_encode(
    viewport: &DynamicImage,
    rect: &SelectionRect,
    format: ExportFormat,
    jpeg_quality: u8,
) -> Result<EncodedImage, ProcessError> {
    let start = std::time::Instant::now();
    let cropped = crop_region(viewport, rect)?;
    let encoded = encode_for_export(&cropped, format, jpeg_quality)?;

    log::info!(
        "[CAPTURE] Cropped region ({}x{} at {},{}) for {} in {}ms, {} bytes",
        encoded.width,
        encoded.height,
        rect.x,
        rect.y,
        format,
        start.elapsed().as_millis(),
        encoded.bytes.len()
    );

    Ok(encoded)
}

#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error(transparent)]
    Crop(#[from] CropError),

    #[error(transparent)]
    Encode(#[from] EncodeError),
}
