//! HTTP layer for yatube-rs.
//!
//! - **Endpoints**: feeds, post pages, forms and follow actions
//! - **Extractors**: identity and page parameters
//! - **Middleware**: bearer-token identity and the login guard
//! - **Response**: JSON view contexts and redirects
//!
//! Built on Axum 0.8 with Tower middleware stack.

pub mod endpoints;
pub mod extractors;
pub mod forms;
pub mod middleware;
pub mod response;

use axum::{Router, middleware::from_fn_with_state};

pub use endpoints::router;
pub use middleware::{AppSettings, AppState};

/// Routes with identity resolution applied, ready to serve.
pub fn app(state: AppState) -> Router {
    router(&state)
        .layer(from_fn_with_state(state.clone(), middleware::auth_middleware))
        .with_state(state)
}
