pub mod flight;
pub mod image;

pub use self::flight::FlightMap;
pub use self::image::{ImageCache, RenderedVariant, SourceImage};
