use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use apasnap_core::GalleryError;

#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    /// A failed gallery load, reported with its machine-readable kind.
    Load(GalleryError),
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    message: String,
}

impl From<GalleryError> for ApiError {
    fn from(e: GalleryError) -> Self {
        ApiError::Load(e)
    }
}

fn load_status(e: &GalleryError) -> StatusCode {
    match e {
        GalleryError::Validation(_) => StatusCode::BAD_REQUEST,
        GalleryError::NoMediaFound { .. } => StatusCode::NOT_FOUND,
        GalleryError::Fetch(_) => StatusCode::BAD_GATEWAY,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_kind, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, "conflict", msg),
            ApiError::Load(e) => (load_status(&e), e.kind(), e.user_message()),
        };

        let body = ErrorBody {
            error: error_kind.to_string(),
            message,
        };

        (status, axum::Json(body)).into_response()
    }
}
