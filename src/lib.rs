#[macro_use]
extern crate rocket;

pub mod api;
pub mod cache;
pub mod config;
pub mod cors;
pub mod images;
pub mod models;
pub mod plugin;

pub use cache::ImageCache;
pub use config::{AppConfig, Mode};
pub use images::{ImageError, OutputFormat, RasterCodec, Scale};
pub use plugin::ImagePlugin;
