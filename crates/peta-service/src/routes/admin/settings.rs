use axum::{
    extract::{Json, State},
    response::Json as ResponseJson,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::errors::ApiError;
use crate::registry::{RejectedSite, SiteRegistry};
use crate::{AppState, repositories::SiteRepository};

#[derive(Debug, Deserialize)]
pub(super) struct UpdateSettingsRequest {
    sites: Vec<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct SettingsResponse {
    sites: SiteRegistry,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    rejected: Vec<RejectedSite>,
}

#[instrument(skip_all)]
pub(super) async fn get_settings<S: AppState>(
    State(state): State<S>,
) -> Result<ResponseJson<SettingsResponse>, ApiError> {
    let sites = state.site_repo().load().await?;
    debug!(count = sites.len(), "Loaded site settings");

    Ok(ResponseJson(SettingsResponse {
        sites,
        rejected: Vec::new(),
    }))
}

#[instrument(skip_all, fields(inputs = payload.sites.len()))]
pub(super) async fn update_settings<S: AppState>(
    State(state): State<S>,
    Json(payload): Json<UpdateSettingsRequest>,
) -> Result<ResponseJson<SettingsResponse>, ApiError> {
    let (sites, rejected) = SiteRegistry::from_inputs(&payload.sites)?;

    for entry in &rejected {
        warn!(input = %entry.input, reason = %entry.reason, "Cleared invalid site URL");
    }

    state.site_repo().replace(&sites).await?;
    info!(saved = sites.len(), cleared = rejected.len(), "Saved site settings");

    Ok(ResponseJson(SettingsResponse { sites, rejected }))
}
