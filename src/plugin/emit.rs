use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::cache::RenderedVariant;
use crate::images::ImageError;
use crate::models::image::EmittedAsset;

/// Receives rendered variants during a build and says where they will live.
#[async_trait]
pub trait AssetEmitter: Send + Sync {
    async fn emit(&self, variant: &RenderedVariant) -> Result<EmittedAsset, ImageError>;
}

/// Writes variants into a directory under content-addressed names.
///
/// `sad.png` at 2x as webp becomes `sad@2x-<first 8 hex of md5>.webp`. Emitting
/// the same bytes twice rewrites the same file, so repeated imports are harmless.
pub struct FsEmitter {
    out_dir: PathBuf,
    public_base: String,
}

impl FsEmitter {
    pub fn new(out_dir: impl Into<PathBuf>, public_base: impl Into<String>) -> Self {
        let mut public_base = public_base.into();
        if !public_base.ends_with('/') {
            public_base.push('/');
        }
        Self {
            out_dir: out_dir.into(),
            public_base,
        }
    }

    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }
}

pub fn asset_file_name(variant: &RenderedVariant) -> String {
    let stem = variant
        .path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    let hash = format!("{:x}", md5::compute(&variant.bytes));

    format!(
        "{}@{}x-{}.{}",
        stem,
        variant.target_scale,
        &hash[..8],
        variant.format.extension()
    )
}

#[async_trait]
impl AssetEmitter for FsEmitter {
    async fn emit(&self, variant: &RenderedVariant) -> Result<EmittedAsset, ImageError> {
        let file_name = asset_file_name(variant);
        let target = self.out_dir.join(&file_name);

        tokio::fs::create_dir_all(&self.out_dir).await.map_err(|e| {
            ImageError::Io(format!("Failed to create {}: {}", self.out_dir.display(), e))
        })?;
        tokio::fs::write(&target, &variant.bytes)
            .await
            .map_err(|e| ImageError::Io(format!("Failed to write {}: {}", target.display(), e)))?;

        log::debug!("Emitted {} ({} bytes)", target.display(), variant.bytes.len());

        Ok(EmittedAsset {
            url: format!("{}{}", self.public_base, file_name),
            file_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::images::{OutputFormat, Scale};

    fn variant(bytes: &[u8]) -> RenderedVariant {
        RenderedVariant {
            path: PathBuf::from("/img/sad.png"),
            reference_scale: Scale::new(3.0).unwrap(),
            target_scale: Scale::new(2.0).unwrap(),
            format: OutputFormat::Webp,
            width: 10,
            height: 10,
            bytes: bytes.to_vec(),
            blur_placeholder: None,
        }
    }

    #[test]
    fn names_are_content_addressed() {
        let a = asset_file_name(&variant(b"one"));
        let b = asset_file_name(&variant(b"two"));
        assert!(a.starts_with("sad@2x-"));
        assert!(a.ends_with(".webp"));
        assert_ne!(a, b);
        assert_eq!(a, asset_file_name(&variant(b"one")));
    }

    #[tokio::test]
    async fn writes_files_and_builds_urls() {
        let dir = tempfile::tempdir().unwrap();
        let emitter = FsEmitter::new(dir.path().join("assets"), "/static");

        let asset = emitter.emit(&variant(b"payload")).await.unwrap();
        assert_eq!(asset.url, format!("/static/{}", asset.file_name));

        let written = std::fs::read(emitter.out_dir().join(&asset.file_name)).unwrap();
        assert_eq!(written, b"payload");
    }
}
