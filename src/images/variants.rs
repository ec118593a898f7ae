//! Dimension math and codec call sequences for rendered variants.
//!
//! Nothing here caches; `cache::image::ImageCache` decides when to call in.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::DynamicImage;

use crate::images::{Codec, ImageError, OutputFormat, Scale};

/// Width of the blurred placeholder in pixels.
pub const PLACEHOLDER_WIDTH: u32 = 10;

/// Size of an image when moved from `reference` density to `target` density.
///
/// Truncates toward zero, never rounds: `900x600 @3 -> @1` is exactly `300x200`
/// and `100x100 @3 -> @2` is `66x66`.
pub fn compute_dimensions(width: u32, height: u32, reference: Scale, target: Scale) -> (u32, u32) {
    let scale = |side: u32| (side as f64 * target.get() / reference.get()).floor() as u32;
    (scale(width), scale(height))
}

/// Largest variant the generator will allocate, in pixels.
pub const MAX_VARIANT_PIXELS: u64 = 8192 * 8192;

/// Resizes `image` and encodes it at the fixed per-format settings.
pub fn render_format(
    codec: &dyn Codec,
    image: &DynamicImage,
    width: u32,
    height: u32,
    format: OutputFormat,
) -> Result<Vec<u8>, ImageError> {
    if width as u64 * height as u64 > MAX_VARIANT_PIXELS {
        return Err(ImageError::Validation(format!(
            "target size {}x{} exceeds {} pixels",
            width, height, MAX_VARIANT_PIXELS
        )));
    }
    let resized = codec.resize(image, width, height)?;
    codec.encode(&resized, format)
}

/// Blurs, shrinks to `PLACEHOLDER_WIDTH` and returns a PNG data URL.
pub fn render_placeholder(codec: &dyn Codec, image: &DynamicImage) -> Result<String, ImageError> {
    let blurred = codec.blur(image);
    let (width, height) = placeholder_size(image.width(), image.height());
    let small = codec.resize(&blurred, width, height)?;
    let png = codec.encode(&small, OutputFormat::Png)?;

    Ok(format!("data:image/png;base64,{}", STANDARD.encode(png)))
}

fn placeholder_size(width: u32, height: u32) -> (u32, u32) {
    if width == 0 {
        return (PLACEHOLDER_WIDTH, 1);
    }
    let height = (height as f64 * PLACEHOLDER_WIDTH as f64 / width as f64).round() as u32;
    (PLACEHOLDER_WIDTH, height.max(1))
}
