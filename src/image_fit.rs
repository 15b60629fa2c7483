//! Image Fitter (C2): letterbox/pillarbox a source image into a mode's frame.

use image::{imageops::FilterType, Rgb, RgbImage};

/// Inclusive-exclusive crop box delimiting the non-letterbox pixels of a
/// fitted image: `[left, top, right, bottom)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropBox {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

/// Center `source` inside a `width`x`height` black canvas, preserving aspect
/// ratio, resampled with a high-quality (Lanczos3) filter. For a target
/// equal to the source dimensions (the Native-mode case) this is a no-op
/// copy and the crop box covers the full frame.
pub fn fit_image(source: &RgbImage, width: u32, height: u32) -> (RgbImage, CropBox) {
    if source.width() == width && source.height() == height {
        return (
            source.clone(),
            CropBox {
                left: 0,
                top: 0,
                right: width,
                bottom: height,
            },
        );
    }

    let scale = (width as f64 / source.width() as f64).min(height as f64 / source.height() as f64);
    let new_w = ((source.width() as f64 * scale).round() as u32).max(1).min(width);
    let new_h = ((source.height() as f64 * scale).round() as u32).max(1).min(height);

    let resized = image::imageops::resize(source, new_w, new_h, FilterType::Lanczos3);

    let mut canvas = RgbImage::from_pixel(width, height, Rgb([0, 0, 0]));
    let left = (width - new_w) / 2;
    let top = (height - new_h) / 2;
    image::imageops::overlay(&mut canvas, &resized, left as i64, top as i64);

    (
        canvas,
        CropBox {
            left,
            top,
            right: left + new_w,
            bottom: top + new_h,
        },
    )
}
