use std::path::PathBuf;

use serde::Deserialize;

use crate::images::{ImageError, OutputFormat, Scale};

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Variants are rendered on demand by the dev endpoint.
    Dev,
    /// Variants are rendered up front and written to `out_dir`.
    Build,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_address")]
    pub address: String,
    #[serde(default = "default_initial_scale")]
    pub initial_scale: f64,
    #[serde(default = "default_scales")]
    pub scales: Vec<f64>,
    #[serde(default = "default_formats")]
    pub formats: Vec<OutputFormat>,
    #[serde(default = "default_assets_base_url")]
    pub assets_base_url: String,
    #[serde(default = "default_mode")]
    pub mode: Mode,
    #[serde(default = "default_out_dir")]
    pub out_dir: PathBuf,
    #[serde(default = "default_public_base")]
    pub public_base: String,
    /// Directories image paths must live under. Empty allows any path.
    #[serde(default)]
    pub fs_allow: Vec<PathBuf>,
}

fn default_port() -> u16 {
    8000
}

fn default_address() -> String {
    "127.0.0.1".to_string()
}

fn default_initial_scale() -> f64 {
    3.0
}

fn default_scales() -> Vec<f64> {
    vec![1.0, 2.0, 3.0]
}

fn default_formats() -> Vec<OutputFormat> {
    vec![OutputFormat::Png, OutputFormat::Webp]
}

fn default_assets_base_url() -> String {
    "/process-image".to_string()
}

fn default_mode() -> Mode {
    Mode::Dev
}

fn default_out_dir() -> PathBuf {
    PathBuf::from("dist/assets")
}

fn default_public_base() -> String {
    "/assets/".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            address: default_address(),
            initial_scale: default_initial_scale(),
            scales: default_scales(),
            formats: default_formats(),
            assets_base_url: default_assets_base_url(),
            mode: default_mode(),
            out_dir: default_out_dir(),
            public_base: default_public_base(),
            fs_allow: Vec::new(),
        }
    }
}

/// Plugin settings after validation. Scales are deduplicated and ascending.
#[derive(Debug, Clone)]
pub struct PluginSettings {
    pub initial_scale: Scale,
    pub scales: Vec<Scale>,
    pub formats: Vec<OutputFormat>,
    pub assets_base_url: String,
    pub mode: Mode,
    pub out_dir: PathBuf,
    pub public_base: String,
    pub fs_allow: Vec<PathBuf>,
}

impl AppConfig {
    pub fn validate(&self) -> Result<PluginSettings, ImageError> {
        let initial_scale = Scale::new(self.initial_scale).map_err(|_| {
            ImageError::Config(format!(
                "\"initial_scale\" must be positive, got {}",
                self.initial_scale
            ))
        })?;

        if self.scales.is_empty() {
            return Err(ImageError::Config("\"scales\" is empty".to_string()));
        }
        let mut scales = self
            .scales
            .iter()
            .map(|&value| {
                Scale::new(value).map_err(|_| {
                    ImageError::Config(format!("\"scales\" must be positive, got {}", value))
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        scales.sort();
        scales.dedup();

        if self.formats.is_empty() {
            return Err(ImageError::Config("\"formats\" is empty".to_string()));
        }
        let mut formats = Vec::with_capacity(self.formats.len());
        for format in &self.formats {
            if !formats.contains(format) {
                formats.push(*format);
            }
        }

        let base = &self.assets_base_url;
        if !base.starts_with('/')
            || base.contains(['?', '#'])
            || base.contains("//")
            || base.trim_end_matches('/').is_empty()
        {
            return Err(ImageError::Config(format!(
                "\"assets_base_url\" must be a non-root absolute path without query, got '{}'",
                base
            )));
        }

        if let Some(root) = self.fs_allow.iter().find(|root| !root.is_absolute()) {
            return Err(ImageError::Config(format!(
                "\"fs_allow\" entries must be absolute, got '{}'",
                root.display()
            )));
        }

        Ok(PluginSettings {
            initial_scale,
            scales,
            formats,
            assets_base_url: base.trim_end_matches('/').to_string(),
            mode: self.mode,
            out_dir: self.out_dir.clone(),
            public_base: self.public_base.clone(),
            fs_allow: self.fs_allow.clone(),
        })
    }
}
