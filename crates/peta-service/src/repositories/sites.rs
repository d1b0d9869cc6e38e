use super::traits::SiteRepository;
use super::{SharedConnection, lock};
use crate::errors::ApiError;
use crate::models::SiteEntry;
use crate::registry::{MAX_SITES, SiteRegistry};
use crate::schema::site_entries;
use crate::validation::validate_site_url;
use async_trait::async_trait;
use diesel::prelude::*;
use tracing::warn;

#[derive(Clone)]
pub struct SqliteSiteRepository {
    db: SharedConnection,
}

impl SqliteSiteRepository {
    pub fn new(db: SharedConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SiteRepository for SqliteSiteRepository {
    async fn load(&self) -> Result<SiteRegistry, ApiError> {
        let rows = {
            let mut conn = lock(&self.db)?;
            site_entries::table
                .order(site_entries::position.asc())
                .select(SiteEntry::as_select())
                .load::<SiteEntry>(&mut *conn)?
        };

        let sites = rows
            .into_iter()
            .filter_map(|row| match validate_site_url(&row.url) {
                Ok(site) => Some(site),
                Err(err) => {
                    warn!(position = row.position, url = %row.url, error = %err, "Ignoring stored site entry");
                    None
                }
            })
            .take(MAX_SITES)
            .collect();

        Ok(SiteRegistry::new(sites)?)
    }

    async fn replace(&self, registry: &SiteRegistry) -> Result<(), ApiError> {
        let entries: Vec<SiteEntry> = registry
            .iter()
            .enumerate()
            .map(|(position, site)| SiteEntry {
                position: position as i32,
                url: site.to_string(),
            })
            .collect();

        let mut conn = lock(&self.db)?;
        conn.transaction::<_, diesel::result::Error, _>(|conn| {
            diesel::delete(site_entries::table).execute(conn)?;
            if !entries.is_empty() {
                diesel::insert_into(site_entries::table)
                    .values(&entries)
                    .execute(conn)?;
            }
            Ok(())
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::establish_test_connection;
    use std::sync::{Arc, Mutex};

    fn repo() -> SqliteSiteRepository {
        SqliteSiteRepository::new(Arc::new(Mutex::new(establish_test_connection())))
    }

    #[tokio::test]
    async fn test_load_empty() {
        assert!(repo().load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_replace_preserves_order_and_overwrites() {
        let repo = repo();

        let (first, _) =
            SiteRegistry::from_inputs(&["https://b.example", "https://a.example"]).unwrap();
        repo.replace(&first).await.unwrap();
        assert_eq!(repo.load().await.unwrap(), first);

        let (second, _) = SiteRegistry::from_inputs(&["https://c.example"]).unwrap();
        repo.replace(&second).await.unwrap();

        let loaded = repo.load().await.unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded, second);
    }
}
