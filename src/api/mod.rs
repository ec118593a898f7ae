pub mod error;
pub mod images;

use rocket::figment::Figment;
use rocket::{Build, Rocket};

use crate::cors::CORS;
use crate::plugin::ImagePlugin;

pub use self::error::ApiError;

/// Rocket instance serving the dev endpoint and the module hook.
pub fn build(figment: Figment, plugin: ImagePlugin) -> Rocket<Build> {
    let assets_base_url = plugin.settings().assets_base_url.clone();

    rocket::custom(figment)
        .attach(CORS)
        .manage(plugin)
        .mount(assets_base_url.as_str(), routes![images::process_image])
        .mount("/", routes![images::load_module])
}
