//! Pure region cropping logic: functional core.
//!
//! This module has zero infrastructure dependencies.
//! It takes pixel data in, returns pixel data out.

use image::{DynamicImage, GenericImageView, RgbaImage};

use super::selection::SelectionRect;

/// Crops the captured viewport to the selection rectangle.
///
/// The rectangle is clamped to the bitmap bounds: a frame dragged partly
/// off-screen yields only its visible part. Inside the bounds this is a
/// direct copy with no scaling, so output pixel `(0,0)` is source pixel
/// `(x,y)`.
pub fn crop_region(image: &DynamicImage, rect: &SelectionRect) -> Result<RgbaImage, CropError> {
    if rect.width <= 0 || rect.height <= 0 {
        return Err(CropError::ZeroDimension);
    }

    let (img_width, img_height) = image.dimensions();
    let bounds = clamp_to_bounds(rect, img_width, img_height).ok_or(CropError::OutOfBounds {
        requested: (rect.x, rect.y, rect.width, rect.height),
        image_size: (img_width, img_height),
    })?;

    if bounds.width != rect.width as u32 || bounds.height != rect.height as u32 {
        log::debug!(
            "[CAPTURE] Selection {}x{} at {},{} clamped to {}x{} at {},{}",
            rect.width,
            rect.height,
            rect.x,
            rect.y,
            bounds.width,
            bounds.height,
            bounds.x,
            bounds.y
        );
    }

    Ok(image
        .crop_imm(bounds.x, bounds.y, bounds.width, bounds.height)
        .to_rgba8())
}

/// Pixel-space crop window, always inside the bitmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropBounds {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Intersect the selection with `[0, width) × [0, height)`.
pub fn clamp_to_bounds(rect: &SelectionRect, width: u32, height: u32) -> Option<CropBounds> {
    let left = i64::from(rect.x).max(0);
    let top = i64::from(rect.y).max(0);
    let right = (i64::from(rect.x) + i64::from(rect.width)).min(i64::from(width));
    let bottom = (i64::from(rect.y) + i64::from(rect.height)).min(i64::from(height));

    if right <= left || bottom <= top {
        return None;
    }

    Some(CropBounds {
        x: left as u32,
        y: top as u32,
        width: (right - left) as u32,
        height: (bottom - top) as u32,
    })
}

#[derive(Debug, thiserror::Error)]
pub enum CropError {
    #[error("Crop rectangle has zero width or height")]
    ZeroDimension,

    #[error(
        "Crop rectangle ({},{},{},{}) lies outside image bounds ({}x{})",
        requested.0, requested.1, requested.2, requested.3,
        image_size.0, image_size.1
    )]
    OutOfBounds {
        requested: (i32, i32, i32, i32),
        image_size: (u32, u32),
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn gradient(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_fn(width, height, |x, y| {
            Rgba([x as u8, y as u8, (x ^ y) as u8, 255])
        }))
    }

    fn rect(x: i32, y: i32, width: i32, height: i32) -> SelectionRect {
        SelectionRect { x, y, width, height }
    }

    #[test]
    fn crop_is_exact_size_and_origin() {
        let img = gradient(200, 120);
        let cropped = crop_region(&img, &rect(10, 10, 100, 50)).unwrap();
        assert_eq!(cropped.dimensions(), (100, 50));
        assert_eq!(cropped.get_pixel(0, 0), &img.get_pixel(10, 10));
        assert_eq!(cropped.get_pixel(99, 49), &img.get_pixel(109, 59));
    }

    #[test]
    fn crop_clamps_partially_offscreen_rect() {
        let img = gradient(100, 100);
        let cropped = crop_region(&img, &rect(-20, 60, 80, 80)).unwrap();
        assert_eq!(cropped.dimensions(), (60, 40));
        assert_eq!(cropped.get_pixel(0, 0), &img.get_pixel(0, 60));
    }

    #[test]
    fn crop_zero_dimension_fails() {
        let img = gradient(100, 100);
        let result = crop_region(&img, &rect(0, 0, 0, 50));
        assert!(matches!(result, Err(CropError::ZeroDimension)));
    }

    #[test]
    fn crop_fully_offscreen_fails() {
        let img = gradient(100, 100);
        let result = crop_region(&img, &rect(150, 150, 60, 60));
        assert!(matches!(result, Err(CropError::OutOfBounds { .. })));
    }

    #[test]
    fn clamp_handles_extreme_coordinates() {
        let bounds = clamp_to_bounds(&rect(i32::MIN, i32::MIN, i32::MAX, i32::MAX), 10, 10);
        assert_eq!(bounds, None);
        let bounds = clamp_to_bounds(&rect(5, 5, i32::MAX, i32::MAX), 10, 10).unwrap();
        assert_eq!((bounds.width, bounds.height), (5, 5));
    }
}
