use std::env;
use std::error::Error;
use std::sync::Arc;

use dotenv::dotenv;
use env_logger::Env;
use log::info;
use rocket::{
    figment::{
        providers::{Format, Toml},
        Figment, Profile,
    },
    Config,
};

use pixel_variants::api;
use pixel_variants::plugin::params::{parse_format_list, parse_scale_list};
use pixel_variants::{AppConfig, ImageCache, ImagePlugin, RasterCodec};

fn load_figment() -> Result<Figment, Box<dyn Error>> {
    let mut figment = Figment::from(Config::default()).merge(Toml::file("App.toml").nested());

    // Merge scales list
    if let Ok(scales) = env::var("IMAGE_SCALES") {
        let scales: Vec<f64> = parse_scale_list(&scales)?.iter().map(|s| s.get()).collect();
        figment = figment.merge(("scales", scales));
    }

    // Merge formats list
    if let Ok(formats) = env::var("IMAGE_FORMATS") {
        figment = figment.merge(("formats", parse_format_list(&formats)?));
    }

    if let Ok(initial_scale) = env::var("IMAGE_INITIAL_SCALE") {
        let initial_scale: f64 = initial_scale.trim().parse()?;
        figment = figment.merge(("initial_scale", initial_scale));
    }

    if let Ok(mode) = env::var("IMAGE_MODE") {
        figment = figment.merge(("mode", mode.trim().to_lowercase()));
    }

    if let Ok(out_dir) = env::var("IMAGE_OUT_DIR") {
        figment = figment.merge(("out_dir", out_dir));
    }

    if let Ok(fs_allow) = env::var("IMAGE_FS_ALLOW") {
        let roots: Vec<String> = fs_allow
            .split(',')
            .map(str::trim)
            .filter(|root| !root.is_empty())
            .map(String::from)
            .collect();
        figment = figment.merge(("fs_allow", roots));
    }

    Ok(figment.select(Profile::from_env_or("APP_PROFILE", "default")))
}

#[rocket::main]
async fn main() -> Result<(), Box<dyn Error>> {
    dotenv().ok();

    // Initialize logger
    env_logger::init_from_env(Env::default().default_filter_or("info"));

    let figment = load_figment()?;
    let config = figment.extract::<AppConfig>()?;
    info!("Configuration loaded successfully");

    // Cache lives as long as the server; entries are never evicted
    let cache = Arc::new(ImageCache::new(Arc::new(RasterCodec)));
    let plugin = ImagePlugin::new(&config, cache)?;

    let settings = plugin.settings();
    info!(
        "Image plugin in {:?} mode: initial scale {}, scales [{}], formats [{}]",
        settings.mode,
        settings.initial_scale,
        settings
            .scales
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(", "),
        settings
            .formats
            .iter()
            .map(|f| f.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    );
    info!("Dev images served from {}", settings.assets_base_url);

    info!(
        "Starting image server on {}:{}",
        config.address, config.port
    );

    api::build(figment, plugin).launch().await?;
    Ok(())
}
