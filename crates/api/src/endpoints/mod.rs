//! Page endpoints.
//!
//! Each module registers its login-gated routes first and seals them with
//! [`require_login`](crate::middleware::require_login) through
//! `route_layer`, then adds its public routes.

mod following;
mod groups;
mod posts;
mod profiles;

use axum::{Router, http::Uri};
use yatube_common::AppError;

use crate::middleware::AppState;

/// Create the page router.
pub fn router(state: &AppState) -> Router<AppState> {
    Router::new()
        .merge(posts::router(state))
        .merge(groups::router())
        .merge(profiles::router())
        .merge(following::router(state))
        .fallback(not_found)
}

async fn not_found(uri: Uri) -> AppError {
    AppError::NotFound(uri.path().to_string())
}
