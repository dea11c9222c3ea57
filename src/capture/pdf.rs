//! Single-page PDF assembly around a PNG capture.
//!
//! The page is sized to the capture in points (one point per pixel) and
//! the image fills it from the origin. The document is self-contained:
//! no external fonts, viewers or remote resources are referenced.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    Portrait,
    Landscape,
}

impl Orientation {
    pub fn for_size(width: u32, height: u32) -> Self {
        if width > height {
            Orientation::Landscape
        } else {
            Orientation::Portrait
        }
    }
}

/// Options handed to the PDF writer for every document it builds.
#[derive(Debug, Clone)]
pub struct PdfOptions {
    /// Flate-compress content and image streams.
    pub compress: bool,
    /// Value of the document's `/Producer` entry.
    pub producer: String,
}

impl Default for PdfOptions {
    fn default() -> Self {
        Self {
            compress: true,
            producer: "PixelCapture".to_string(),
        }
    }
}

/// Converts a PNG payload into a PDF document.
pub trait PdfWriter {
    fn write_pdf(&self, png: &[u8], width: u32, height: u32) -> Result<Vec<u8>, PdfError>;
}

/// Default writer: embeds the decoded PNG as an RGB image with an alpha soft mask.
#[derive(Debug, Clone, Default)]
pub struct ImagePdfWriter {
    options: PdfOptions,
}

impl ImagePdfWriter {
    pub fn new(options: PdfOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &PdfOptions {
        &self.options
    }
}

impl PdfWriter for ImagePdfWriter {
    fn write_pdf(&self, png: &[u8], width: u32, height: u32) -> Result<Vec<u8>, PdfError> {
        if width == 0 || height == 0 {
            return Err(PdfError::EmptyPage);
        }

        let decoded = image::load_from_memory_with_format(png, image::ImageFormat::Png)?;
        let rgba = decoded.to_rgba8();
        let (img_width, img_height) = rgba.dimensions();

        let mut rgb = Vec::with_capacity((img_width * img_height * 3) as usize);
        let mut alpha = Vec::with_capacity((img_width * img_height) as usize);
        for pixel in rgba.pixels() {
            rgb.extend_from_slice(&pixel.0[..3]);
            alpha.push(pixel.0[3]);
        }
        let has_alpha = alpha.iter().any(|a| *a != 255);

        let orientation = Orientation::for_size(width, height);
        log::debug!(
            "[EXPORT] Building {:?} PDF page {}x{} around {}x{} image",
            orientation,
            width,
            height,
            img_width,
            img_height
        );

        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();

        let mut image_dict = dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => i64::from(img_width),
            "Height" => i64::from(img_height),
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        };
        if has_alpha {
            let smask_id = doc.add_object(Stream::new(
                dictionary! {
                    "Type" => "XObject",
                    "Subtype" => "Image",
                    "Width" => i64::from(img_width),
                    "Height" => i64::from(img_height),
                    "ColorSpace" => "DeviceGray",
                    "BitsPerComponent" => 8,
                },
                alpha,
            ));
            image_dict.set("SMask", smask_id);
        }
        let image_id = doc.add_object(Stream::new(image_dict, rgb));

        // Scale the unit image square to the full page
        let content = Content {
            operations: vec![
                Operation::new("q", vec![]),
                Operation::new(
                    "cm",
                    vec![
                        i64::from(width).into(),
                        0.into(),
                        0.into(),
                        i64::from(height).into(),
                        0.into(),
                        0.into(),
                    ],
                ),
                Operation::new("Do", vec![Object::Name(b"Im0".to_vec())]),
                Operation::new("Q", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), i64::from(width).into(), i64::from(height).into()],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! {
                    "Im0" => image_id,
                },
            },
        });

        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => vec![page_id.into()],
                "Count" => 1,
            }),
        );

        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        let info_id = doc.add_object(dictionary! {
            "Producer" => Object::string_literal(self.options.producer.as_str()),
        });
        doc.trailer.set("Root", catalog_id);
        doc.trailer.set("Info", info_id);

        if self.options.compress {
            doc.compress();
        }

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes)?;
        Ok(bytes)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PdfError {
    #[error("PDF page would have zero width or height")]
    EmptyPage,

    #[error("PNG payload could not be decoded: {0}")]
    Image(#[from] image::ImageError),

    #[error("PDF serialization failed: {0}")]
    Serialize(#[from] lopdf::Error),

    #[error("PDF serialization failed: {0}")]
    Io(#[from] std::io::Error),
}
