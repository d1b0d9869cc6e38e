use axum::{
    Router,
    extract::{Path, State},
    http::{HeaderMap, header::AUTHORIZATION},
    response::Json as ResponseJson,
    routing::get,
};
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::{debug, info, instrument, warn};

use crate::errors::ApiError;
use crate::models::{Approval, RemotePost};
use crate::{AppState, approval, repositories::PostRepository};

/// Upper bound on `get_posts/{count}`.
pub const MAX_FEED_COUNT: u32 = 100;

#[instrument(skip_all, fields(count = count))]
async fn get_posts<S: AppState>(
    State(state): State<S>,
    Path(count): Path<u32>,
) -> Result<ResponseJson<Vec<RemotePost>>, ApiError> {
    debug!("Processing feed request");

    let limit = count.min(MAX_FEED_COUNT);
    let posts = state.post_repo().list_unapproved(limit).await?;

    let site_url = &state.config().site_url;
    let feed: Vec<RemotePost> = posts.iter().map(|post| post.to_remote(site_url)).collect();

    info!(returned_count = feed.len(), "Served feed");
    Ok(ResponseJson(feed))
}

type HmacSha256 = Hmac<Sha256>;

/// Constant-time token comparison: both sides are MACed under the expected
/// token and the tags compared with `verify_slice`.
fn tokens_match(expected: &str, presented: &str) -> bool {
    let (Ok(mut reference), Ok(mut candidate)) = (
        HmacSha256::new_from_slice(expected.as_bytes()),
        HmacSha256::new_from_slice(expected.as_bytes()),
    ) else {
        return false;
    };

    reference.update(expected.as_bytes());
    candidate.update(presented.as_bytes());

    candidate
        .verify_slice(&reference.finalize().into_bytes())
        .is_ok()
}

fn check_approval_token(expected: Option<&str>, headers: &HeaderMap) -> Result<(), ApiError> {
    let Some(expected) = expected else {
        return Ok(());
    };

    let presented = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));

    if presented.is_some_and(|presented| tokens_match(expected, presented)) {
        Ok(())
    } else {
        warn!("Rejected approval with missing or wrong token");
        Err(ApiError::Unauthorized)
    }
}

#[instrument(skip_all, fields(id = id, username = %username))]
async fn approve<S: AppState>(
    State(state): State<S>,
    headers: HeaderMap,
    Path((id, username)): Path<(u64, String)>,
) -> Result<ResponseJson<Approval>, ApiError> {
    debug!("Processing approval request");

    check_approval_token(state.config().approval_token.as_deref(), &headers)?;

    let approval = approval::approve_local(&state, id, &username, Utc::now().naive_utc()).await?;
    Ok(ResponseJson(approval))
}

pub fn create_api_v1_router<S: AppState>() -> Router<S> {
    Router::new()
        .route("/get_posts/{count}", get(get_posts::<S>))
        .route("/approve/{id}/{username}", get(approve::<S>))
}
