//! Administrator surface: the dashboard widget, its two AJAX actions, the
//! site settings and local post publishing.

use axum::{
    Form, Router,
    extract::State,
    http::HeaderMap,
    response::{Html, Json as ResponseJson},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument};

use crate::aggregator::{SAMPLE_SIZE, collect_posts, sample_posts};
use crate::approval::{ApprovalTarget, record_approval};
use crate::errors::ApiError;
use crate::fetcher::POSTS_PER_SITE;
use crate::models::FeedPost;
use crate::presenter::{render_dashboard, render_post_list};
use crate::validation::{SiteUrl, sanitize_site_url, validate_username};
use crate::{AppState, repositories::SiteRepository};

mod posts;
mod settings;

/// Header a fronting proxy uses to name the authenticated administrator.
pub const REMOTE_USER_HEADER: &str = "x-remote-user";

const AJAX_BASE: &str = "/admin/ajax";

#[derive(Debug, Deserialize)]
struct FilterWebsitesRequest {
    #[serde(default)]
    website: String,
}

#[derive(Debug, Serialize)]
struct FilterWebsitesResponse {
    has_posts: bool,
    posts: String,
}

#[derive(Debug, Deserialize)]
struct ApproveWebsiteRequest {
    post_id: u64,
    website: String,
}

#[derive(Debug, Serialize)]
struct ApproveWebsiteResponse {
    success: bool,
}

fn acting_username(headers: &HeaderMap, fallback: &str) -> Result<String, ApiError> {
    let username = headers
        .get(REMOTE_USER_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(fallback);

    Ok(validate_username(username)?.to_string())
}

/// Fan-out over `sites`, then shuffle and keep a bounded sample.
async fn sampled_posts<'a, S, I>(state: &S, sites: I) -> Vec<FeedPost>
where
    S: AppState,
    I: IntoIterator<Item = &'a SiteUrl>,
{
    let posts = collect_posts(state.site_client(), sites, POSTS_PER_SITE).await;
    sample_posts(posts, SAMPLE_SIZE, &mut rand::thread_rng())
}

fn render_error(err: askama::Error) -> ApiError {
    error!(error = %err, "Template rendering failed");
    ApiError::InternalError
}

#[instrument(skip_all)]
async fn dashboard<S: AppState>(State(state): State<S>) -> Result<Html<String>, ApiError> {
    debug!("Rendering dashboard widget");

    let registry = state.site_repo().load().await?;
    let posts = sampled_posts(&state, &registry).await;

    info!(
        sites = registry.len(),
        shown = posts.len(),
        "Rendered dashboard widget"
    );

    let html = render_dashboard(&registry, &posts, AJAX_BASE).map_err(render_error)?;
    Ok(Html(html))
}

#[instrument(skip_all, fields(website = %payload.website))]
async fn filter_websites<S: AppState>(
    State(state): State<S>,
    Form(payload): Form<FilterWebsitesRequest>,
) -> Result<ResponseJson<FilterWebsitesResponse>, ApiError> {
    debug!("Processing site filter");

    let registry = state.site_repo().load().await?;

    let posts = if payload.website.trim().is_empty() {
        sampled_posts(&state, &registry).await
    } else {
        let site = registry
            .find(&payload.website)
            .ok_or_else(|| ApiError::BadRequest("Site is not configured".to_string()))?;
        sampled_posts(&state, std::iter::once(site)).await
    };

    let html = render_post_list(&posts).map_err(render_error)?;

    Ok(ResponseJson(FilterWebsitesResponse {
        has_posts: !posts.is_empty(),
        posts: html,
    }))
}

#[instrument(skip_all, fields(post_id = payload.post_id, website = %payload.website))]
async fn approve_website<S: AppState>(
    State(state): State<S>,
    headers: HeaderMap,
    Form(payload): Form<ApproveWebsiteRequest>,
) -> Result<ResponseJson<ApproveWebsiteResponse>, ApiError> {
    debug!("Processing approve action");

    let config = state.config();
    let username = acting_username(&headers, &config.admin_username)?;
    let origin = sanitize_site_url(&payload.website)?;

    let target = ApprovalTarget::resolve(origin, &config.site_url);
    if let ApprovalTarget::Remote(site) = &target {
        let registry = state.site_repo().load().await?;
        if !registry.iter().any(|configured| configured == site) {
            return Err(ApiError::BadRequest("Site is not configured".to_string()));
        }
    }

    record_approval(&state, &target, payload.post_id, &username).await?;

    Ok(ResponseJson(ApproveWebsiteResponse { success: true }))
}

pub fn create_admin_router<S: AppState>() -> Router<S> {
    Router::new()
        .route("/dashboard", get(dashboard::<S>))
        .route("/ajax/peta_filter_websites", post(filter_websites::<S>))
        .route("/ajax/peta_approve_website", post(approve_website::<S>))
        .route(
            "/settings",
            get(settings::get_settings::<S>).put(settings::update_settings::<S>),
        )
        .route("/posts", post(posts::create_post::<S>))
}
