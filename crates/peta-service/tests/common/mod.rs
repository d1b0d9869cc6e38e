#![allow(dead_code)]

use diesel::{Connection, sqlite::SqliteConnection};
use diesel_migrations::MigrationHarness;
use peta_service::database::MIGRATIONS;

pub const OWN_SITE: &str = "https://me.example";

pub fn establish_test_connection() -> SqliteConnection {
    let mut connection =
        SqliteConnection::establish(":memory:").expect("Failed to create in-memory database");

    connection
        .run_pending_migrations(MIGRATIONS)
        .expect("Failed to run migrations");

    connection
}

pub mod mock_client {
    use async_trait::async_trait;
    use peta_service::fetcher::{FetchError, SiteClient};
    use peta_service::models::RemotePost;
    use peta_service::validation::SiteUrl;
    use std::collections::HashMap;
    use std::sync::{Arc, RwLock};

    #[derive(Debug, Clone, PartialEq)]
    pub struct ForwardedApproval {
        pub site: String,
        pub post_id: u64,
        pub username: String,
    }

    /// In-memory stand-in for remote sites, keyed by normalized base URL.
    #[derive(Clone, Default)]
    pub struct MockSiteClient {
        feeds: Arc<RwLock<HashMap<String, Vec<RemotePost>>>>,
        failing: Arc<RwLock<Vec<String>>>,
        requests: Arc<RwLock<Vec<String>>>,
        approvals: Arc<RwLock<Vec<ForwardedApproval>>>,
    }

    pub fn posts(site: &str, ids: std::ops::Range<u64>) -> Vec<RemotePost> {
        ids.map(|id| RemotePost {
            id,
            post_title: format!("{} post {id}", site.trim_start_matches("https://")),
            permalink: format!("{site}/?p={id}"),
        })
        .collect()
    }

    impl MockSiteClient {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_feed(self, site: &str, feed: Vec<RemotePost>) -> Self {
            self.feeds.write().unwrap().insert(site.to_string(), feed);
            self
        }

        pub fn with_failing_site(self, site: &str) -> Self {
            self.failing.write().unwrap().push(site.to_string());
            self
        }

        /// Sites whose feed was requested, in order.
        pub fn requests(&self) -> Vec<String> {
            self.requests.read().unwrap().clone()
        }

        pub fn approvals(&self) -> Vec<ForwardedApproval> {
            self.approvals.read().unwrap().clone()
        }

        fn failure(site: &SiteUrl) -> FetchError {
            FetchError::Status {
                url: site.to_string(),
                status: 500,
            }
        }
    }

    #[async_trait]
    impl SiteClient for MockSiteClient {
        async fn fetch_posts(
            &self,
            site: &SiteUrl,
            count: u32,
        ) -> Result<Vec<RemotePost>, FetchError> {
            let key = site.to_string();
            self.requests.write().unwrap().push(key.clone());

            if self.failing.read().unwrap().contains(&key) {
                return Err(Self::failure(site));
            }

            match self.feeds.read().unwrap().get(&key) {
                Some(feed) => Ok(feed.iter().take(count as usize).cloned().collect()),
                None => Err(FetchError::Status {
                    url: key,
                    status: 404,
                }),
            }
        }

        async fn approve(
            &self,
            site: &SiteUrl,
            post_id: u64,
            username: &str,
        ) -> Result<(), FetchError> {
            let key = site.to_string();
            if self.failing.read().unwrap().contains(&key) {
                return Err(Self::failure(site));
            }

            self.approvals.write().unwrap().push(ForwardedApproval {
                site: key,
                post_id,
                username: username.to_string(),
            });
            Ok(())
        }
    }
}

pub mod server_utils {
    use super::*;
    use axum_test::TestServer;
    use peta_service::config::ServiceConfig;
    use peta_service::fetcher::SiteClient;
    use peta_service::repositories::SharedConnection;
    use peta_service::validation::validate_site_url;
    use peta_service::{DefaultAppState, create_app};
    use std::sync::{Arc, Mutex};

    use super::mock_client::MockSiteClient;

    pub fn test_config() -> ServiceConfig {
        ServiceConfig::new(":memory:", validate_site_url(OWN_SITE).unwrap())
    }

    pub fn create_test_server_with<C: SiteClient>(
        client: C,
        config: ServiceConfig,
    ) -> (TestServer, SharedConnection) {
        let db = Arc::new(Mutex::new(establish_test_connection()));

        let state = DefaultAppState::new(db.clone(), client, config);
        let app = create_app(state);

        let server = TestServer::new(app).unwrap();
        (server, db)
    }

    pub fn create_test_server(client: MockSiteClient) -> (TestServer, SharedConnection) {
        create_test_server_with(client, test_config())
    }
}

pub mod test_utils {
    use diesel::prelude::*;
    use diesel::sqlite::SqliteConnection;
    use peta_service::schema::{approvals, posts};

    pub fn count_approvals(conn: &mut SqliteConnection) -> i64 {
        approvals::table
            .count()
            .get_result(conn)
            .expect("Failed to count approvals")
    }

    pub fn count_posts(conn: &mut SqliteConnection) -> i64 {
        posts::table
            .count()
            .get_result(conn)
            .expect("Failed to count posts")
    }

    pub fn approval_username(conn: &mut SqliteConnection, post_id: i32) -> Option<String> {
        approvals::table
            .find(post_id)
            .select(approvals::username)
            .first::<String>(conn)
            .optional()
            .expect("Failed to query approval")
    }
}
