pub mod tools;
pub mod variants;

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use tools::{Codec, RasterCodec};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ImageError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Path not allowed: {0}")]
    Forbidden(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Render error in {operation}: {message}")]
    Render {
        operation: &'static str,
        message: String,
    },
}

impl ImageError {
    pub fn render(operation: &'static str, message: impl fmt::Display) -> Self {
        ImageError::Render {
            operation,
            message: message.to_string(),
        }
    }
}

/// A validated pixel-density multiplier: finite and strictly positive.
///
/// Scales are used as cache keys, so equality and hashing go through the
/// bit pattern of the float. Construction rejects NaN and zero, which keeps
/// that consistent with numeric equality.
#[derive(Debug, Clone, Copy)]
pub struct Scale(f64);

impl Scale {
    pub fn new(value: f64) -> Result<Self, ImageError> {
        if !value.is_finite() || value <= 0.0 {
            return Err(ImageError::Validation(format!(
                "scale must be a positive number, got {}",
                value
            )));
        }
        Ok(Scale(value))
    }

    pub fn get(self) -> f64 {
        self.0
    }
}

impl PartialEq for Scale {
    fn eq(&self, other: &Self) -> bool {
        self.0.to_bits() == other.0.to_bits()
    }
}

impl Eq for Scale {}

impl Hash for Scale {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.to_bits().hash(state);
    }
}

impl PartialOrd for Scale {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Scale {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl fmt::Display for Scale {
    // f64's Display already prints `1` for 1.0 and `1.5` for 1.5, which is
    // what srcSet descriptors and query strings expect.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Scale {
    type Err = ImageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s
            .trim()
            .parse::<f64>()
            .map_err(|_| ImageError::Validation(format!("'{}' is not a number", s)))?;
        Scale::new(value)
    }
}

/// Encodings a variant can be rendered to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Png,
    Webp,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Png => "png",
            OutputFormat::Webp => "webp",
        }
    }

    pub fn mime(&self) -> &'static str {
        match self {
            OutputFormat::Png => "image/png",
            OutputFormat::Webp => "image/webp",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for OutputFormat {
    type Err = ImageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "png" => Ok(OutputFormat::Png),
            "webp" => Ok(OutputFormat::Webp),
            other => Err(ImageError::Validation(format!(
                "Unsupported format: {}",
                other
            ))),
        }
    }
}

/// Source files the plugin is willing to pick up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Png,
    Jpeg,
    Webp,
}

impl InputFormat {
    pub fn from_path(path: &str) -> Option<Self> {
        let lower = path.to_ascii_lowercase();
        if lower.ends_with(".png") {
            Some(InputFormat::Png)
        } else if lower.ends_with(".jpg") || lower.ends_with(".jpeg") {
            Some(InputFormat::Jpeg)
        } else if lower.ends_with(".webp") {
            Some(InputFormat::Webp)
        } else {
            None
        }
    }
}
