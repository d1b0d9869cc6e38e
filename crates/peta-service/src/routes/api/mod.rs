use crate::AppState;
use crate::fetcher::{REST_NAMESPACE, REST_VERSION};
use axum::Router;

pub mod v1;

pub fn create_api_router<S: AppState>() -> Router<S> {
    Router::new().nest(
        &format!("/{REST_NAMESPACE}/{REST_VERSION}"),
        v1::create_api_v1_router(),
    )
}
