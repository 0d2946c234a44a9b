mod sessions;
mod validate;

use axum::Router;

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(sessions::router())
        .merge(validate::router())
}
