use rocket::http::Status;
use serde_json::json;

use crate::images::ImageError;

#[derive(Debug)]
pub enum ApiError {
    ImageError(ImageError),
    NotAnImage(String),
}

impl From<ImageError> for ApiError {
    fn from(error: ImageError) -> Self {
        ApiError::ImageError(error)
    }
}

impl ApiError {
    pub fn status(&self) -> Status {
        match self {
            ApiError::NotAnImage(_) => Status::NotFound,
            ApiError::ImageError(ImageError::Validation(_)) => Status::BadRequest,
            ApiError::ImageError(ImageError::Forbidden(_)) => Status::Forbidden,
            ApiError::ImageError(ImageError::Io(_)) => Status::NotFound,
            ApiError::ImageError(ImageError::Decode(_)) => Status::UnprocessableEntity,
            ApiError::ImageError(ImageError::Render { .. }) => Status::InternalServerError,
            ApiError::ImageError(ImageError::Config(_)) => Status::InternalServerError,
        }
    }

    fn label(&self) -> &'static str {
        match self {
            ApiError::NotAnImage(_) => "Not an image module",
            ApiError::ImageError(ImageError::Validation(_)) => "Invalid request",
            ApiError::ImageError(ImageError::Forbidden(_)) => "Path not allowed",
            ApiError::ImageError(ImageError::Io(_)) => "Image not readable",
            ApiError::ImageError(ImageError::Decode(_)) => "Image not decodable",
            ApiError::ImageError(ImageError::Render { .. }) => "Image processing error",
            ApiError::ImageError(ImageError::Config(_)) => "Configuration error",
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::NotAnImage(id) => format!("'{}' is not handled by the image plugin", id),
            ApiError::ImageError(error) => error.to_string(),
        }
    }
}

impl<'r> rocket::response::Responder<'r, 'static> for ApiError {
    fn respond_to(self, _: &'r rocket::Request<'_>) -> rocket::response::Result<'static> {
        let status = self.status();
        if status.code >= 500 {
            log::error!("Request failed: {}", self.message());
        } else {
            log::warn!("Request rejected: {}", self.message());
        }

        let body = json!({
            "error": self.label(),
            "message": self.message()
        })
        .to_string();

        rocket::Response::build()
            .status(status)
            .header(rocket::http::ContentType::JSON)
            .sized_body(body.len(), std::io::Cursor::new(body))
            .ok()
    }
}
