use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::models::RemotePost;
use crate::validation::{SiteUrl, ValidationError};

/// REST prefix the feed and approval routes are mounted under.
pub const REST_PREFIX: &str = "wp-json";
pub const REST_NAMESPACE: &str = "peta";
pub const REST_VERSION: &str = "v1";

/// Posts requested from each site per render.
pub const POSTS_PER_SITE: u32 = 10;

/// Default outbound timeout, matching the host platform's HTTP API.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Invalid site URL: {0}")]
    InvalidUrl(#[from] ValidationError),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Malformed feed from {url}: {message}")]
    MalformedFeed { url: String, message: String },
}

/// Outbound calls to other sites' `peta/v1` endpoints.
#[async_trait]
pub trait SiteClient: Clone + Send + Sync + 'static {
    async fn fetch_posts(&self, site: &SiteUrl, count: u32) -> Result<Vec<RemotePost>, FetchError>;

    async fn approve(&self, site: &SiteUrl, post_id: u64, username: &str) -> Result<(), FetchError>;
}

#[derive(Clone)]
pub struct HttpSiteClient {
    http: Client,
    allow_local: bool,
    approval_token: Option<String>,
}

impl HttpSiteClient {
    pub fn new(
        timeout: Duration,
        allow_local: bool,
        approval_token: Option<String>,
    ) -> Result<Self, FetchError> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("peta/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            allow_local,
            approval_token,
        })
    }

    fn route(&self, site: &SiteUrl, tail: &[&str]) -> Result<String, FetchError> {
        site.check_fetchable(self.allow_local)?;
        let segments = [REST_PREFIX, REST_NAMESPACE, REST_VERSION]
            .into_iter()
            .chain(tail.iter().copied());
        Ok(site.endpoint(segments)?.to_string())
    }
}

#[async_trait]
impl SiteClient for HttpSiteClient {
    #[instrument(skip(self, site), fields(site = %site))]
    async fn fetch_posts(&self, site: &SiteUrl, count: u32) -> Result<Vec<RemotePost>, FetchError> {
        let count = count.to_string();
        let url = self.route(site, &["get_posts", count.as_str()])?;
        debug!(url = %url, "Requesting feed");

        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        parse_feed(&body).map_err(|message| FetchError::MalformedFeed { url, message })
    }

    #[instrument(skip(self, site), fields(site = %site))]
    async fn approve(&self, site: &SiteUrl, post_id: u64, username: &str) -> Result<(), FetchError> {
        let id = post_id.to_string();
        let url = self.route(site, &["approve", id.as_str(), username])?;
        debug!(url = %url, "Sending approval");

        let mut request = self.http.get(&url);
        if let Some(token) = &self.approval_token {
            request = request.bearer_auth(token);
        }

        let status = request.send().await?.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url,
                status: status.as_u16(),
            });
        }
        Ok(())
    }
}

/// Decodes a `get_posts` body. The body must be a JSON array; elements
/// without a numeric `ID` are dropped.
pub fn parse_feed(body: &str) -> Result<Vec<RemotePost>, String> {
    let value: Value = serde_json::from_str(body).map_err(|err| err.to_string())?;

    let Value::Array(items) = value else {
        return Err("expected a JSON array".to_string());
    };

    let total = items.len();
    let posts: Vec<RemotePost> = items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect();

    if posts.len() < total {
        debug!(dropped = total - posts.len(), "Dropped feed entries without an ID");
    }

    Ok(posts)
}
