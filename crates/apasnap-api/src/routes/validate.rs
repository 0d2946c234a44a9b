use axum::extract::Query;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use apasnap_core::{normalize_target, validate, ValidationResult};

use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ValidateQuery {
    pub url: String,
}

pub fn router() -> Router<AppState> {
    Router::new().route("/validate", get(validate_url))
}

/// GET /api/v1/validate?url=
async fn validate_url(Query(q): Query<ValidateQuery>) -> Json<ValidationResult> {
    Json(validate(&normalize_target(&q.url)))
}
