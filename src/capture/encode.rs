//! Export formats and raster encoding.

use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::PngEncoder;
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder, RgbaImage};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Target file format chosen in the popup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Png,
    #[serde(alias = "jpg")]
    Jpeg,
    WebP,
    Pdf,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 4] = [
        ExportFormat::Png,
        ExportFormat::Jpeg,
        ExportFormat::WebP,
        ExportFormat::Pdf,
    ];

    pub fn mime(&self) -> &'static str {
        match self {
            ExportFormat::Png => "image/png",
            ExportFormat::Jpeg => "image/jpeg",
            ExportFormat::WebP => "image/webp",
            ExportFormat::Pdf => "application/pdf",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Png => "png",
            ExportFormat::Jpeg => "jpg",
            ExportFormat::WebP => "webp",
            ExportFormat::Pdf => "pdf",
        }
    }

    /// Formats gated behind Pro/Trial access.
    pub fn requires_elevated_access(&self) -> bool {
        matches!(self, ExportFormat::Pdf)
    }

    /// Raster format carried between contexts before the final export step.
    pub fn transfer_format(&self) -> ExportFormat {
        match self {
            ExportFormat::Pdf => ExportFormat::Png,
            other => *other,
        }
    }
}

impl std::fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ExportFormat::Png => "png",
            ExportFormat::Jpeg => "jpeg",
            ExportFormat::WebP => "webp",
            ExportFormat::Pdf => "pdf",
        };
        f.write_str(name)
    }
}

impl FromStr for ExportFormat {
    type Err = EncodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "png" => Ok(ExportFormat::Png),
            "jpeg" | "jpg" => Ok(ExportFormat::Jpeg),
            "webp" => Ok(ExportFormat::WebP),
            "pdf" => Ok(ExportFormat::Pdf),
            other => Err(EncodeError::UnknownFormat(other.to_string())),
        }
    }
}

/// Encoded raster ready to cross into the background context.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub format: ExportFormat,
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl EncodedImage {
    pub fn mime(&self) -> &'static str {
        self.format.mime()
    }

    pub fn to_data_url(&self) -> String {
        super::data_url::encode(self.mime(), &self.bytes)
    }
}

/// Encode a cropped raster for export.
///
/// PNG, JPEG and WebP encode directly. PDF is encoded as PNG here; page
/// assembly happens at export time so a PDF failure can still save the PNG.
pub fn encode_for_export(
    image: &RgbaImage,
    format: ExportFormat,
    jpeg_quality: u8,
) -> Result<EncodedImage, EncodeError> {
    let (width, height) = image.dimensions();
    let target = format.transfer_format();
    let mut bytes: Vec<u8> = Vec::new();

    match format {
        ExportFormat::Png | ExportFormat::Pdf => PngEncoder::new(&mut bytes).write_image(
            image.as_raw(),
            width,
            height,
            ExtendedColorType::Rgba8,
        )?,
        ExportFormat::Jpeg => {
            // JPEG has no alpha channel
            let rgb = DynamicImage::ImageRgba8(image.clone()).to_rgb8();
            JpegEncoder::new_with_quality(&mut bytes, jpeg_quality.clamp(1, 100)).write_image(
                rgb.as_raw(),
                width,
                height,
                ExtendedColorType::Rgb8,
            )?
        }
        ExportFormat::WebP => WebPEncoder::new_lossless(&mut bytes).write_image(
            image.as_raw(),
            width,
            height,
            ExtendedColorType::Rgba8,
        )?,
    }

    log::debug!(
        "[CAPTURE] Encoded {}x{} as {} ({} bytes)",
        width,
        height,
        target,
        bytes.len()
    );

    Ok(EncodedImage {
        format: target,
        bytes,
        width,
        height,
    })
}

#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("Unknown export format: {0:?}")]
    UnknownFormat(String),

    #[error("Image encoding failed: {0}")]
    EncodingFailed(#[from] image::ImageError),
}
