use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::images::{OutputFormat, Scale};

/// A file written to the build output.
#[derive(Debug, Clone, PartialEq)]
pub struct EmittedAsset {
    pub file_name: String,
    pub url: String,
}

/// Where the browser finds one rendered variant.
#[derive(Debug, Clone, PartialEq)]
pub enum AssetRef {
    /// Content-addressed file emitted during a build.
    Build(EmittedAsset),
    /// Dev endpoint URL; the variant is rendered when first fetched.
    Dev(String),
}

impl AssetRef {
    pub fn url(&self) -> &str {
        match self {
            AssetRef::Build(asset) => &asset.url,
            AssetRef::Dev(url) => url,
        }
    }
}

/// `src` / `srcSet` pair of one encoding.
#[derive(Debug, Clone)]
pub struct SourceSet {
    pub src: AssetRef,
    /// Ascending by scale.
    pub entries: Vec<(Scale, AssetRef)>,
}

impl SourceSet {
    pub fn src_set(&self) -> String {
        self.entries
            .iter()
            .map(|(scale, asset)| format!("{} {}x", asset.url(), scale))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl Serialize for SourceSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("src", self.src.url())?;
        map.serialize_entry("srcSet", &self.src_set())?;
        map.end()
    }
}

/// Default export of a processed image module.
///
/// Serializes as `{width, height, blurDataURL, png: {src, srcSet}, webp: {...}}`
/// with one key per requested encoding.
#[derive(Debug, Clone)]
pub struct ProcessedImage {
    pub width: u32,
    pub height: u32,
    pub blur_data_url: String,
    pub sources: Vec<(OutputFormat, SourceSet)>,
}

impl ProcessedImage {
    pub fn source(&self, format: OutputFormat) -> Option<&SourceSet> {
        self.sources
            .iter()
            .find(|(candidate, _)| *candidate == format)
            .map(|(_, set)| set)
    }

    pub fn to_module(&self) -> Result<String, serde_json::Error> {
        Ok(format!("export default {};", serde_json::to_string(self)?))
    }
}

impl Serialize for ProcessedImage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3 + self.sources.len()))?;
        map.serialize_entry("width", &self.width)?;
        map.serialize_entry("height", &self.height)?;
        map.serialize_entry("blurDataURL", &self.blur_data_url)?;
        for (format, set) in &self.sources {
            map.serialize_entry(format.extension(), set)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scale(value: f64) -> Scale {
        Scale::new(value).unwrap()
    }

    #[test]
    fn serializes_the_ui_shape() {
        let dev = |s: &str| AssetRef::Dev(format!("/process-image?scale={}", s));
        let image = ProcessedImage {
            width: 300,
            height: 200,
            blur_data_url: "data:image/png;base64,AAAA".to_string(),
            sources: vec![(
                OutputFormat::Png,
                SourceSet {
                    src: dev("1"),
                    entries: vec![(scale(1.0), dev("1")), (scale(2.0), dev("2"))],
                },
            )],
        };

        let module = image.to_module().unwrap();
        assert_eq!(
            module,
            "export default {\"width\":300,\"height\":200,\
             \"blurDataURL\":\"data:image/png;base64,AAAA\",\
             \"png\":{\"src\":\"/process-image?scale=1\",\
             \"srcSet\":\"/process-image?scale=1 1x, /process-image?scale=2 2x\"}};"
        );
    }

    #[test]
    fn build_refs_use_public_urls() {
        let asset = AssetRef::Build(EmittedAsset {
            file_name: "sad@2x-0123abcd.webp".to_string(),
            url: "/assets/sad@2x-0123abcd.webp".to_string(),
        });
        let set = SourceSet {
            src: asset.clone(),
            entries: vec![(scale(2.0), asset)],
        };
        assert_eq!(set.src_set(), "/assets/sad@2x-0123abcd.webp 2x");
    }
}
