use std::path::{Path, PathBuf};

use url::form_urlencoded;

use crate::config::PluginSettings;
use crate::images::{ImageError, InputFormat, OutputFormat, Scale};

/// Query key every handled import must carry.
pub const PROCESS_MARKER: &str = "process";

/// A validated `<path>?process&...` import.
#[derive(Debug, Clone, PartialEq)]
pub struct ImportRequest {
    pub path: PathBuf,
    pub reference_scale: Scale,
    /// Ascending, no duplicates, never empty.
    pub scales: Vec<Scale>,
    /// Requested encodings in request order, no duplicates, never empty.
    pub formats: Vec<OutputFormat>,
}

impl ImportRequest {
    /// `Ok(None)` when the id is not ours to handle.
    pub fn parse(id: &str, settings: &PluginSettings) -> Result<Option<Self>, ImageError> {
        let Some((path, query)) = id.split_once('?') else {
            return Ok(None);
        };
        if !Path::new(path).is_absolute() || InputFormat::from_path(path).is_none() {
            return Ok(None);
        }

        let mut marked = false;
        let mut initial_scale = None;
        let mut scales = None;
        let mut formats = None;
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                PROCESS_MARKER => marked = true,
                "initialScale" => initial_scale = Some(value.into_owned()),
                "scales" => scales = Some(value.into_owned()),
                "format" => formats = Some(value.into_owned()),
                _ => {}
            }
        }
        if !marked {
            return Ok(None);
        }

        let reference_scale = match initial_scale {
            Some(raw) => parse_scale("initialScale", &raw)?,
            None => settings.initial_scale,
        };
        let scales = match scales {
            Some(raw) => parse_scale_list(&raw)?,
            None => settings.scales.clone(),
        };
        let formats = match formats {
            Some(raw) => parse_format_list(&raw)?,
            None => settings.formats.clone(),
        };

        Ok(Some(Self {
            path: PathBuf::from(path),
            reference_scale,
            scales,
            formats,
        }))
    }

    pub fn smallest_scale(&self) -> Scale {
        self.scales[0]
    }

    /// The scale whose variant becomes `src`: `1x` when requested, else the smallest.
    pub fn default_scale(&self) -> Scale {
        self.scales
            .iter()
            .copied()
            .find(|scale| scale.get() == 1.0)
            .unwrap_or_else(|| self.smallest_scale())
    }
}

/// One variant addressed by the dev endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct VariantRequest {
    pub path: PathBuf,
    pub reference_scale: Scale,
    pub scale: Scale,
    pub format: OutputFormat,
}

impl VariantRequest {
    pub fn from_params(
        path: Option<&str>,
        initial_scale: Option<&str>,
        scale: Option<&str>,
        format: Option<&str>,
    ) -> Result<Self, ImageError> {
        let path = required("path", path)?;
        if !Path::new(path).is_absolute() {
            return Err(ImageError::Validation(format!(
                "\"path\" must be absolute, got '{}'",
                path
            )));
        }
        if InputFormat::from_path(path).is_none() {
            return Err(ImageError::Validation(format!(
                "\"path\" is not a supported image: '{}'",
                path
            )));
        }

        Ok(Self {
            path: PathBuf::from(path),
            reference_scale: parse_scale("initialScale", required("initialScale", initial_scale)?)?,
            scale: parse_scale("scale", required("scale", scale)?)?,
            format: required("format", format)?.parse()?,
        })
    }

    pub fn from_query(query: &str) -> Result<Self, ImageError> {
        let (mut path, mut initial_scale, mut scale, mut format) = (None, None, None, None);
        for (key, value) in form_urlencoded::parse(query.as_bytes()) {
            match key.as_ref() {
                "path" => path = Some(value.into_owned()),
                "initialScale" => initial_scale = Some(value.into_owned()),
                "scale" => scale = Some(value.into_owned()),
                "format" => format = Some(value.into_owned()),
                _ => {}
            }
        }
        Self::from_params(
            path.as_deref(),
            initial_scale.as_deref(),
            scale.as_deref(),
            format.as_deref(),
        )
    }

    /// Query string understood by `from_query`.
    pub fn to_query(&self) -> String {
        form_urlencoded::Serializer::new(String::new())
            .append_pair("path", &self.path.to_string_lossy())
            .append_pair("initialScale", &self.reference_scale.to_string())
            .append_pair("scale", &self.scale.to_string())
            .append_pair("format", self.format.extension())
            .finish()
    }

    pub fn url(&self, base: &str) -> String {
        format!("{}?{}", base, self.to_query())
    }
}

fn required<'a>(name: &str, value: Option<&'a str>) -> Result<&'a str, ImageError> {
    match value {
        Some(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ImageError::Validation(format!("\"{}\" is required", name))),
    }
}

fn parse_scale(name: &str, raw: &str) -> Result<Scale, ImageError> {
    raw.parse::<Scale>()
        .map_err(|_| ImageError::Validation(format!("\"{}\" must be a positive number, got '{}'", name, raw)))
}

/// Comma separated scales, sorted ascending and deduplicated.
pub fn parse_scale_list(raw: &str) -> Result<Vec<Scale>, ImageError> {
    let mut scales = raw
        .split(',')
        .filter(|part| !part.trim().is_empty())
        .map(|part| parse_scale("scales", part))
        .collect::<Result<Vec<_>, _>>()?;
    if scales.is_empty() {
        return Err(ImageError::Validation("\"scales\" is empty".to_string()));
    }
    scales.sort();
    scales.dedup();
    Ok(scales)
}

/// Comma separated formats, first occurrence wins.
pub fn parse_format_list(raw: &str) -> Result<Vec<OutputFormat>, ImageError> {
    let mut formats = Vec::new();
    for part in raw.split(',').filter(|part| !part.trim().is_empty()) {
        let format = part.parse::<OutputFormat>()?;
        if !formats.contains(&format) {
            formats.push(format);
        }
    }
    if formats.is_empty() {
        return Err(ImageError::Validation("\"format\" is empty".to_string()));
    }
    Ok(formats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn settings() -> PluginSettings {
        AppConfig::default().validate().unwrap()
    }

    fn values(scales: &[Scale]) -> Vec<f64> {
        scales.iter().map(|s| s.get()).collect()
    }

    #[test]
    fn declines_foreign_ids() {
        let settings = settings();
        for id in [
            "/img/sad.png",
            "img/sad.png?process",
            "/img/sad.svg?process",
            "/img/sad.png?raw",
            "/img/sad.png?url&inline",
        ] {
            assert_eq!(ImportRequest::parse(id, &settings).unwrap(), None, "{}", id);
        }
    }

    #[test]
    fn applies_defaults() {
        let request = ImportRequest::parse("/img/sad.png?process", &settings())
            .unwrap()
            .unwrap();
        assert_eq!(request.path, PathBuf::from("/img/sad.png"));
        assert_eq!(request.reference_scale.get(), 3.0);
        assert_eq!(values(&request.scales), vec![1.0, 2.0, 3.0]);
        assert_eq!(request.formats, vec![OutputFormat::Png, OutputFormat::Webp]);
    }

    #[test]
    fn reads_overrides() {
        let request = ImportRequest::parse(
            "/img/sad.png?process&initialScale=2&scales=3,1.5,3&format=webp",
            &settings(),
        )
        .unwrap()
        .unwrap();
        assert_eq!(request.reference_scale.get(), 2.0);
        assert_eq!(values(&request.scales), vec![1.5, 3.0]);
        assert_eq!(request.formats, vec![OutputFormat::Webp]);
        assert_eq!(request.smallest_scale().get(), 1.5);
        assert_eq!(request.default_scale().get(), 1.5);
    }

    #[test]
    fn default_scale_prefers_one_x() {
        let request = ImportRequest::parse("/a.png?process&scales=0.5,1,2", &settings())
            .unwrap()
            .unwrap();
        assert_eq!(request.smallest_scale().get(), 0.5);
        assert_eq!(request.default_scale().get(), 1.0);
    }

    #[test]
    fn validation_boundary() {
        let settings = settings();
        for id in [
            "/img/sad.png?process&initialScale=0",
            "/img/sad.png?process&initialScale=-1",
            "/img/sad.png?process&initialScale=abc",
            "/img/sad.png?process&scales=",
            "/img/sad.png?process&scales=0",
            "/img/sad.png?process&scales=-2,4",
            "/img/sad.png?process&format=gif",
            "/img/sad.png?process&format=",
        ] {
            assert!(
                matches!(ImportRequest::parse(id, &settings), Err(ImageError::Validation(_))),
                "{} should fail validation",
                id
            );
        }
    }

    #[test]
    fn variant_query_round_trips_through_url() {
        let request = VariantRequest::from_params(
            Some("/img/my sad.png"),
            Some("3"),
            Some("1.5"),
            Some("webp"),
        )
        .unwrap();

        let url = request.url("/process-image");
        assert!(url.starts_with("/process-image?path=%2Fimg%2Fmy+sad.png&initialScale=3&scale=1.5&format=webp"));

        let query = url.split_once('?').unwrap().1;
        assert_eq!(VariantRequest::from_query(query).unwrap(), request);
    }

    #[test]
    fn variant_request_requires_everything() {
        let missing = [
            (None, Some("3"), Some("1"), Some("png")),
            (Some("/a.png"), None, Some("1"), Some("png")),
            (Some("/a.png"), Some("3"), None, Some("png")),
            (Some("/a.png"), Some("3"), Some("1"), None),
            (Some("a.png"), Some("3"), Some("1"), Some("png")),
            (Some("/a.txt"), Some("3"), Some("1"), Some("png")),
            (Some("/a.png"), Some("0"), Some("1"), Some("png")),
            (Some("/a.png"), Some("3"), Some("-1"), Some("png")),
            (Some("/a.png"), Some("3"), Some("1"), Some("bmp")),
        ];
        for (path, initial, scale, format) in missing {
            assert!(matches!(
                VariantRequest::from_params(path, initial, scale, format),
                Err(ImageError::Validation(_))
            ));
        }
    }
}
