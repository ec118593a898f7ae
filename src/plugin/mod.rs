pub mod emit;
pub mod params;

use std::path::{Component, Path};
use std::sync::Arc;
use std::time::Instant;

use futures::future::try_join_all;

use crate::cache::{ImageCache, RenderedVariant};
use crate::config::{AppConfig, Mode, PluginSettings};
use crate::images::{ImageError, OutputFormat, Scale};
use crate::models::image::{AssetRef, ProcessedImage, SourceSet};

pub use self::emit::{AssetEmitter, FsEmitter};
pub use self::params::{ImportRequest, VariantRequest};

/// Turns `*.png?process` style imports into image modules and serves the
/// variants those modules point at.
pub struct ImagePlugin {
    settings: PluginSettings,
    cache: Arc<ImageCache>,
    emitter: Arc<dyn AssetEmitter>,
}

impl ImagePlugin {
    pub fn new(config: &AppConfig, cache: Arc<ImageCache>) -> Result<Self, ImageError> {
        let settings = config.validate()?;
        let emitter = Arc::new(FsEmitter::new(
            settings.out_dir.clone(),
            settings.public_base.clone(),
        ));
        Ok(Self::with_emitter(settings, cache, emitter))
    }

    pub fn with_emitter(
        settings: PluginSettings,
        cache: Arc<ImageCache>,
        emitter: Arc<dyn AssetEmitter>,
    ) -> Self {
        Self {
            settings,
            cache,
            emitter,
        }
    }

    pub fn settings(&self) -> &PluginSettings {
        &self.settings
    }

    pub fn cache(&self) -> &ImageCache {
        &self.cache
    }

    /// Module source for `id`, or `None` when the id is not an image import.
    pub async fn load(&self, id: &str) -> Result<Option<String>, ImageError> {
        let Some(request) = ImportRequest::parse(id, &self.settings)? else {
            return Ok(None);
        };
        self.check_allowed(&request.path)?;

        let started = Instant::now();
        let image = self.process(&request).await?;
        let module = image
            .to_module()
            .map_err(|e| ImageError::render("serialize module", e))?;

        log::info!(
            "Processed {} ({} scales, {} formats) in {:?}",
            request.path.display(),
            request.scales.len(),
            request.formats.len(),
            started.elapsed()
        );

        Ok(Some(module))
    }

    pub async fn process(&self, request: &ImportRequest) -> Result<ProcessedImage, ImageError> {
        // The smallest variant goes first: its render attaches the placeholder.
        let anchor = self
            .cache
            .get_or_render_variant(
                &request.path,
                request.reference_scale,
                request.smallest_scale(),
                request.formats[0],
            )
            .await?;
        let source = self
            .cache
            .get_or_load_source(&request.path, request.reference_scale)
            .await?;
        let blur_data_url = source
            .placeholder()
            .ok_or_else(|| ImageError::render("placeholder", "source has no placeholder"))?
            .to_string();

        let mut sources = Vec::with_capacity(request.formats.len());
        for &format in &request.formats {
            let entries = match self.settings.mode {
                Mode::Dev => request
                    .scales
                    .iter()
                    .map(|&scale| (scale, AssetRef::Dev(self.dev_url(request, scale, format))))
                    .collect::<Vec<_>>(),
                Mode::Build => {
                    try_join_all(
                        request
                            .scales
                            .iter()
                            .map(|&scale| self.emit_variant(request, scale, format)),
                    )
                    .await?
                }
            };

            let default_scale = request.default_scale();
            let src = entries
                .iter()
                .find(|(scale, _)| *scale == default_scale)
                .or_else(|| entries.first())
                .map(|(_, asset)| asset.clone())
                .ok_or_else(|| ImageError::Validation("\"scales\" is empty".to_string()))?;

            sources.push((format, SourceSet { src, entries }));
        }

        Ok(ProcessedImage {
            width: anchor.width,
            height: anchor.height,
            blur_data_url,
            sources,
        })
    }

    /// Renders (or fetches from cache) the variant behind a dev endpoint URL.
    pub async fn serve(&self, request: &VariantRequest) -> Result<Arc<RenderedVariant>, ImageError> {
        self.check_allowed(&request.path)?;
        self.cache
            .get_or_render_variant(
                &request.path,
                request.reference_scale,
                request.scale,
                request.format,
            )
            .await
    }

    /// Rejects `..` segments and, when `fs_allow` is set, paths outside it.
    fn check_allowed(&self, path: &Path) -> Result<(), ImageError> {
        if path.components().any(|c| c == Component::ParentDir) {
            return Err(ImageError::Forbidden(format!(
                "'{}' contains '..'",
                path.display()
            )));
        }
        let allow = &self.settings.fs_allow;
        if !allow.is_empty() && !allow.iter().any(|root| path.starts_with(root)) {
            return Err(ImageError::Forbidden(format!(
                "'{}' is outside the allowed directories",
                path.display()
            )));
        }
        Ok(())
    }

    fn dev_url(&self, request: &ImportRequest, scale: Scale, format: OutputFormat) -> String {
        VariantRequest {
            path: request.path.clone(),
            reference_scale: request.reference_scale,
            scale,
            format,
        }
        .url(&self.settings.assets_base_url)
    }

    async fn emit_variant(
        &self,
        request: &ImportRequest,
        scale: Scale,
        format: OutputFormat,
    ) -> Result<(Scale, AssetRef), ImageError> {
        let variant = self
            .cache
            .get_or_render_variant(&request.path, request.reference_scale, scale, format)
            .await?;
        let asset = self.emitter.emit(&variant).await?;
        Ok((scale, AssetRef::Build(asset)))
    }
}
