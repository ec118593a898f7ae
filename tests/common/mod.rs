#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use image::{DynamicImage, Rgba, RgbaImage};
use pixel_variants::images::{Codec, ImageError, OutputFormat, RasterCodec};
use pixel_variants::{AppConfig, ImageCache, ImagePlugin};

/// `RasterCodec` that counts calls and slows decodes down so concurrent
/// requests overlap.
#[derive(Default)]
pub struct CountingCodec {
    inner: RasterCodec,
    pub decodes: AtomicUsize,
    pub resizes: AtomicUsize,
    pub encodes: AtomicUsize,
    pub blurs: AtomicUsize,
}

impl CountingCodec {
    pub fn decodes(&self) -> usize {
        self.decodes.load(Ordering::SeqCst)
    }

    pub fn encodes(&self) -> usize {
        self.encodes.load(Ordering::SeqCst)
    }

    pub fn blurs(&self) -> usize {
        self.blurs.load(Ordering::SeqCst)
    }
}

impl Codec for CountingCodec {
    fn decode(&self, bytes: &[u8]) -> Result<DynamicImage, ImageError> {
        self.decodes.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(25));
        self.inner.decode(bytes)
    }

    fn resize(
        &self,
        image: &DynamicImage,
        width: u32,
        height: u32,
    ) -> Result<DynamicImage, ImageError> {
        self.resizes.fetch_add(1, Ordering::SeqCst);
        self.inner.resize(image, width, height)
    }

    fn encode(&self, image: &DynamicImage, format: OutputFormat) -> Result<Vec<u8>, ImageError> {
        self.encodes.fetch_add(1, Ordering::SeqCst);
        self.inner.encode(image, format)
    }

    fn blur(&self, image: &DynamicImage) -> DynamicImage {
        self.blurs.fetch_add(1, Ordering::SeqCst);
        self.inner.blur(image)
    }
}

/// Writes a gradient PNG of the given size and returns its path.
pub fn write_png(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let img = RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8, 255])
    });
    let path = dir.join(name);
    DynamicImage::ImageRgba8(img).save(&path).unwrap();
    path
}

pub fn decode_size(bytes: &[u8]) -> (u32, u32) {
    let image = image::load_from_memory(bytes).unwrap();
    (image.width(), image.height())
}

pub fn counting_cache() -> (Arc<CountingCodec>, Arc<ImageCache>) {
    let codec = Arc::new(CountingCodec::default());
    let cache = Arc::new(ImageCache::new(codec.clone()));
    (codec, cache)
}

pub fn plugin(config: AppConfig) -> (Arc<CountingCodec>, ImagePlugin) {
    let (codec, cache) = counting_cache();
    let plugin = ImagePlugin::new(&config, cache).unwrap();
    (codec, plugin)
}

/// Parses the object literal out of `export default {...};`.
pub fn module_json(module: &str) -> serde_json::Value {
    let body = module
        .strip_prefix("export default ")
        .and_then(|rest| rest.strip_suffix(';'))
        .expect("module has the default-export shape");
    serde_json::from_str(body).unwrap()
}
