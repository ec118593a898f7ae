use std::io::Cursor;

use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};
use image::imageops::FilterType;
use image::DynamicImage;

use crate::images::{ImageError, OutputFormat};

/// Lossy WebP quality, 0-100.
pub const WEBP_QUALITY: f32 = 60.0;

/// Gaussian sigma used for blur placeholders.
pub const BLUR_SIGMA: f32 = 1.5;

/// The image capability the cache engine drives.
///
/// Handles are plain `DynamicImage`s. Every operation returns a new image and
/// leaves its input untouched, so a decoded source can be shared between any
/// number of derived renders.
pub trait Codec: Send + Sync + 'static {
    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, ImageError>;

    fn resize(&self, image: &DynamicImage, width: u32, height: u32)
        -> Result<DynamicImage, ImageError>;

    fn encode(&self, image: &DynamicImage, format: OutputFormat) -> Result<Vec<u8>, ImageError>;

    fn blur(&self, image: &DynamicImage) -> DynamicImage;
}

/// `Codec` backed by the `image` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct RasterCodec;

impl Codec for RasterCodec {
    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, ImageError> {
        image::load_from_memory(bytes)
            .map_err(|e| ImageError::Decode(format!("Failed to load image: {}", e)))
    }

    fn resize(
        &self,
        image: &DynamicImage,
        width: u32,
        height: u32,
    ) -> Result<DynamicImage, ImageError> {
        if width == 0 || height == 0 {
            return Err(ImageError::render(
                "resize",
                format!("target size {}x{} is empty", width, height),
            ));
        }
        Ok(image.resize_exact(width, height, FilterType::Lanczos3))
    }

    fn encode(&self, image: &DynamicImage, format: OutputFormat) -> Result<Vec<u8>, ImageError> {
        let mut output = Vec::new();

        match format {
            OutputFormat::Png => {
                // zlib level 6
                let encoder = PngEncoder::new_with_quality(
                    Cursor::new(&mut output),
                    CompressionType::Default,
                    PngFilter::Adaptive,
                );
                image
                    .write_with_encoder(encoder)
                    .map_err(|e| ImageError::render("encode png", e))?;
            }
            OutputFormat::Webp => {
                let rgba = image.to_rgba8();
                let encoded = webp::Encoder::from_rgba(&rgba, rgba.width(), rgba.height())
                    .encode_simple(false, WEBP_QUALITY)
                    .map_err(|e| ImageError::render("encode webp", format!("{:?}", e)))?;
                output.extend_from_slice(&encoded);
            }
        }

        Ok(output)
    }

    fn blur(&self, image: &DynamicImage) -> DynamicImage {
        image.blur(BLUR_SIGMA)
    }
}
