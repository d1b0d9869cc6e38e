use crate::errors::ApiError;
use crate::models::{Approval, NewApproval, NewPost, Post};
use crate::registry::SiteRegistry;
use async_trait::async_trait;

/// Persisted list of sites to poll.
#[async_trait]
pub trait SiteRepository: Clone + Send + Sync + 'static {
    async fn load(&self) -> Result<SiteRegistry, ApiError>;
    /// Replaces the whole list in one transaction.
    async fn replace(&self, registry: &SiteRegistry) -> Result<(), ApiError>;
}

#[async_trait]
pub trait PostRepository: Clone + Send + Sync + 'static {
    async fn create(&self, post: &NewPost) -> Result<Post, ApiError>;
    async fn find_by_id(&self, id: i32) -> Result<Option<Post>, ApiError>;
    /// Newest published posts that have no approval record.
    async fn list_unapproved(&self, limit: u32) -> Result<Vec<Post>, ApiError>;
}

#[async_trait]
pub trait ApprovalRepository: Clone + Send + Sync + 'static {
    /// Inserts, or overwrites the username and timestamp of, the post's approval.
    async fn upsert(&self, approval: &NewApproval) -> Result<Approval, ApiError>;
    async fn find_by_post_id(&self, post_id: i32) -> Result<Option<Approval>, ApiError>;
}
