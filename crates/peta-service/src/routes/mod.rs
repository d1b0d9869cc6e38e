use crate::AppState;
use axum::{Router, routing::get};

pub mod admin;
pub mod api;

async fn health() -> &'static str {
    "OK"
}

pub fn create_router<S: AppState>() -> Router<S> {
    Router::new()
        .route("/health", get(health))
        .nest(
            &format!("/{}", crate::fetcher::REST_PREFIX),
            api::create_api_router(),
        )
        .nest("/admin", admin::create_admin_router())
}
