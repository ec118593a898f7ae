use std::io::Cursor;
use std::sync::Arc;

use rocket::http::{ContentType, Header, Status};
use rocket::response::content::RawJavaScript;
use rocket::response::{self, Responder, Response};
use rocket::{Request, State};

use crate::api::ApiError;
use crate::cache::RenderedVariant;
use crate::plugin::{ImagePlugin, VariantRequest};

// Responder for rendered variants
pub struct ImageResponse {
    pub variant: Arc<RenderedVariant>,
}

impl<'r> Responder<'r, 'static> for ImageResponse {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'static> {
        let content_type = ContentType::new("image", self.variant.format.extension());
        let etag = format!("\"{:x}\"", md5::compute(&self.variant.bytes));

        if let Some(if_none_match) = req.headers().get_one("If-None-Match") {
            if if_none_match == etag {
                return Response::build()
                    .status(Status::NotModified)
                    .header(Header::new("ETag", etag))
                    .header(Header::new("Cache-Control", "no-cache"))
                    .ok();
            }
        }

        let body = self.variant.bytes.clone();
        Response::build()
            .header(content_type)
            .header(Header::new("Cache-Control", "no-cache"))
            .header(Header::new("ETag", etag))
            .sized_body(body.len(), Cursor::new(body))
            .ok()
    }
}

#[derive(FromForm)]
pub struct ProcessImageQuery {
    pub path: Option<String>,
    #[field(name = "initialScale")]
    pub initial_scale: Option<String>,
    pub scale: Option<String>,
    pub format: Option<String>,
}

impl ProcessImageQuery {
    fn to_variant_request(&self) -> Result<VariantRequest, ApiError> {
        Ok(VariantRequest::from_params(
            self.path.as_deref(),
            self.initial_scale.as_deref(),
            self.scale.as_deref(),
            self.format.as_deref(),
        )?)
    }
}

#[get("/?<query..>")]
pub async fn process_image(
    query: ProcessImageQuery,
    plugin: &State<ImagePlugin>,
) -> Result<ImageResponse, ApiError> {
    let request = query.to_variant_request()?;
    log::debug!("Serving {:?}", request);

    let variant = plugin.serve(&request).await?;
    Ok(ImageResponse { variant })
}

#[get("/module?<id>")]
pub async fn load_module(
    id: String,
    plugin: &State<ImagePlugin>,
) -> Result<RawJavaScript<String>, ApiError> {
    match plugin.load(&id).await? {
        Some(module) => Ok(RawJavaScript(module)),
        None => Err(ApiError::NotAnImage(id)),
    }
}
