use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::time::Instant;

use image::DynamicImage;

use crate::cache::flight::FlightMap;
use crate::images::variants::{compute_dimensions, render_format, render_placeholder};
use crate::images::{Codec, ImageError, OutputFormat, Scale};

pub type SourceKey = (PathBuf, Scale);
pub type VariantKey = (PathBuf, Scale, Scale, OutputFormat);

/// One decoded file, treated as native at `reference_scale`.
pub struct SourceImage {
    pub path: PathBuf,
    pub reference_scale: Scale,
    pub width: u32,
    pub height: u32,
    image: DynamicImage,
    placeholder: OnceLock<String>,
}

impl SourceImage {
    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    /// Blur data URL of the decoded source, attached by the first variant
    /// rendered from it.
    pub fn placeholder(&self) -> Option<&str> {
        self.placeholder.get().map(String::as_str)
    }
}

impl std::fmt::Debug for SourceImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SourceImage")
            .field("path", &self.path)
            .field("reference_scale", &self.reference_scale)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("placeholder", &self.placeholder.get().is_some())
            .finish()
    }
}

/// An encoded output of a `SourceImage`. Immutable once cached.
#[derive(Debug)]
pub struct RenderedVariant {
    pub path: PathBuf,
    pub reference_scale: Scale,
    pub target_scale: Scale,
    pub format: OutputFormat,
    pub width: u32,
    pub height: u32,
    pub bytes: Vec<u8>,
    /// Present only on the variant that produced the source's placeholder.
    pub blur_placeholder: Option<String>,
}

/// Process-wide memo of decoded sources and rendered variants.
///
/// Decodes are keyed by `(path, reference scale)` so every target scale and
/// format of one image shares a single read + decode. Renders are keyed by the
/// full `(path, reference, target, format)` tuple. Nothing is ever evicted.
pub struct ImageCache {
    codec: Arc<dyn Codec>,
    sources: FlightMap<SourceKey, SourceImage>,
    variants: FlightMap<VariantKey, RenderedVariant>,
}

impl ImageCache {
    pub fn new(codec: Arc<dyn Codec>) -> Self {
        Self {
            codec,
            sources: FlightMap::new(),
            variants: FlightMap::new(),
        }
    }

    pub async fn get_or_load_source(
        &self,
        path: &Path,
        reference_scale: Scale,
    ) -> Result<Arc<SourceImage>, ImageError> {
        let key = (path.to_path_buf(), reference_scale);
        if self.sources.contains_key(&key) {
            log::debug!("Source cache hit: {} @{}x", path.display(), reference_scale);
        }

        let codec = self.codec.clone();
        let path = path.to_path_buf();
        self.sources
            .get_or_try_insert_with(key, move || load_source(codec, path, reference_scale))
            .await
    }

    pub async fn get_or_render_variant(
        &self,
        path: &Path,
        reference_scale: Scale,
        target_scale: Scale,
        format: OutputFormat,
    ) -> Result<Arc<RenderedVariant>, ImageError> {
        let key = (path.to_path_buf(), reference_scale, target_scale, format);
        if self.variants.contains_key(&key) {
            log::debug!(
                "Variant cache hit: {} @{}x -> @{}x {}",
                path.display(),
                reference_scale,
                target_scale,
                format
            );
        }

        let source = self.get_or_load_source(path, reference_scale).await?;
        let codec = self.codec.clone();
        self.variants
            .get_or_try_insert_with(key, move || render_variant(codec, source, target_scale, format))
            .await
    }

    pub fn source_count(&self) -> usize {
        self.sources.len()
    }

    pub fn variant_count(&self) -> usize {
        self.variants.len()
    }
}

async fn load_source(
    codec: Arc<dyn Codec>,
    path: PathBuf,
    reference_scale: Scale,
) -> Result<SourceImage, ImageError> {
    let started = Instant::now();
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| ImageError::Io(format!("Failed to read {}: {}", path.display(), e)))?;

    let image = tokio::task::spawn_blocking(move || codec.decode(&bytes))
        .await
        .map_err(|e| ImageError::render("decode", e))??;

    log::info!(
        "Decoded {} ({}x{}) in {:?}",
        path.display(),
        image.width(),
        image.height(),
        started.elapsed()
    );

    Ok(SourceImage {
        width: image.width(),
        height: image.height(),
        path,
        reference_scale,
        image,
        placeholder: OnceLock::new(),
    })
}

async fn render_variant(
    codec: Arc<dyn Codec>,
    source: Arc<SourceImage>,
    target_scale: Scale,
    format: OutputFormat,
) -> Result<RenderedVariant, ImageError> {
    tokio::task::spawn_blocking(move || {
        let started = Instant::now();
        let (width, height) =
            compute_dimensions(source.width, source.height, source.reference_scale, target_scale);

        let bytes = render_format(codec.as_ref(), source.image(), width, height, format)?;

        let mut blur_placeholder = None;
        if source.placeholder.get().is_none() {
            // Derived from the source alone, so any first render yields the same URL.
            let placeholder = render_placeholder(codec.as_ref(), source.image())?;
            if source.placeholder.set(placeholder.clone()).is_ok() {
                blur_placeholder = Some(placeholder);
            }
        }

        log::info!(
            "Rendered {} @{}x as {} ({}x{}, {} bytes) in {:?}",
            source.path.display(),
            target_scale,
            format,
            width,
            height,
            bytes.len(),
            started.elapsed()
        );

        Ok(RenderedVariant {
            path: source.path.clone(),
            reference_scale: source.reference_scale,
            target_scale,
            format,
            width,
            height,
            bytes,
            blur_placeholder,
        })
    })
    .await
    .map_err(|e| ImageError::render("render", e))?
}
