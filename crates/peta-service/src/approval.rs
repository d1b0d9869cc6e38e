use chrono::{NaiveDateTime, Utc};
use tracing::{info, instrument};

use crate::AppState;
use crate::errors::ApiError;
use crate::fetcher::SiteClient;
use crate::models::{Approval, NewApproval};
use crate::repositories::{ApprovalRepository, PostRepository};
use crate::validation::SiteUrl;

/// Where an approval is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApprovalTarget {
    /// This instance's own post store.
    Local,
    /// Another site, reached through its approval endpoint.
    Remote(SiteUrl),
}

impl ApprovalTarget {
    pub fn resolve(origin: SiteUrl, own_site: &SiteUrl) -> Self {
        if &origin == own_site {
            ApprovalTarget::Local
        } else {
            ApprovalTarget::Remote(origin)
        }
    }
}

/// Writes the approval record for a local post. Repeat approvals overwrite
/// the username and timestamp.
pub async fn approve_local<S: AppState>(
    state: &S,
    post_id: u64,
    username: &str,
    approved_at: NaiveDateTime,
) -> Result<Approval, ApiError> {
    let post_id = i32::try_from(post_id).map_err(|_| ApiError::NotFound)?;
    let new_approval = NewApproval::new(post_id, username, approved_at)?;

    if state.post_repo().find_by_id(post_id).await?.is_none() {
        return Err(ApiError::NotFound);
    }

    let approval = state.approval_repo().upsert(&new_approval).await?;
    info!(post_id, username = %approval.username, "Post approved");
    Ok(approval)
}

#[instrument(skip(state, target), fields(target = ?target))]
pub async fn record_approval<S: AppState>(
    state: &S,
    target: &ApprovalTarget,
    post_id: u64,
    username: &str,
) -> Result<(), ApiError> {
    match target {
        ApprovalTarget::Local => {
            approve_local(state, post_id, username, Utc::now().naive_utc()).await?;
        }
        ApprovalTarget::Remote(site) => {
            state.site_client().approve(site, post_id, username).await?;
            info!(site = %site, post_id, "Approval forwarded to origin site");
        }
    }
    Ok(())
}
