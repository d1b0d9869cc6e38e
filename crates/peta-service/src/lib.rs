use axum::Router;
use std::sync::Arc;

pub mod aggregator;
pub mod approval;
pub mod config;
pub mod database;
pub mod errors;
pub mod fetcher;
pub mod models;
pub mod presenter;
pub mod registry;
pub mod repositories;
pub mod routes;
pub mod schema;
pub mod shutdown;
pub mod validation;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

use config::ServiceConfig;
use fetcher::{HttpSiteClient, SiteClient};
use repositories::{
    ApprovalRepository, PostRepository, SharedConnection, SiteRepository,
    SqliteApprovalRepository, SqlitePostRepository, SqliteSiteRepository,
};

/// Everything a handler needs: repositories, the outbound site client and
/// the service configuration.
pub trait AppState: Clone + Send + Sync + 'static {
    type Sites: SiteRepository;
    type Posts: PostRepository;
    type Approvals: ApprovalRepository;
    type Client: SiteClient;

    fn site_repo(&self) -> Self::Sites;
    fn post_repo(&self) -> Self::Posts;
    fn approval_repo(&self) -> Self::Approvals;
    fn site_client(&self) -> &Self::Client;
    fn config(&self) -> &ServiceConfig;
}

#[derive(Clone)]
pub struct DefaultAppState<C = HttpSiteClient> {
    db: SharedConnection,
    client: C,
    config: Arc<ServiceConfig>,
}

impl<C: SiteClient> DefaultAppState<C> {
    pub fn new(db: SharedConnection, client: C, config: ServiceConfig) -> Self {
        Self {
            db,
            client,
            config: Arc::new(config),
        }
    }
}

impl<C: SiteClient> AppState for DefaultAppState<C> {
    type Sites = SqliteSiteRepository;
    type Posts = SqlitePostRepository;
    type Approvals = SqliteApprovalRepository;
    type Client = C;

    fn site_repo(&self) -> Self::Sites {
        SqliteSiteRepository::new(self.db.clone())
    }

    fn post_repo(&self) -> Self::Posts {
        SqlitePostRepository::new(self.db.clone())
    }

    fn approval_repo(&self) -> Self::Approvals {
        SqliteApprovalRepository::new(self.db.clone())
    }

    fn site_client(&self) -> &Self::Client {
        &self.client
    }

    fn config(&self) -> &ServiceConfig {
        &self.config
    }
}

pub fn create_app<S: AppState>(state: S) -> Router {
    routes::create_router().with_state(state)
}
