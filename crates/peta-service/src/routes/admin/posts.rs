use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::Json as ResponseJson,
};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::errors::ApiError;
use crate::models::{NewPost, PostStatus};
use crate::{AppState, repositories::PostRepository};

#[derive(Debug, Deserialize)]
pub(super) struct CreatePostRequest {
    title: String,
    #[serde(default)]
    status: PostStatus,
}

#[derive(Debug, Serialize)]
pub(super) struct PostResponse {
    #[serde(rename = "ID")]
    id: i32,
    post_title: String,
    permalink: String,
    status: String,
    created_at: NaiveDateTime,
}

#[instrument(skip_all, fields(status = %payload.status))]
pub(super) async fn create_post<S: AppState>(
    State(state): State<S>,
    Json(payload): Json<CreatePostRequest>,
) -> Result<(StatusCode, ResponseJson<PostResponse>), ApiError> {
    let new_post = NewPost::new(payload.title, payload.status)?;
    let post = state.post_repo().create(&new_post).await?;

    info!(id = post.id, "Created local post");

    let permalink = post.permalink(&state.config().site_url);
    Ok((
        StatusCode::CREATED,
        ResponseJson(PostResponse {
            id: post.id,
            post_title: post.title,
            permalink,
            status: post.status,
            created_at: post.created_at,
        }),
    ))
}
