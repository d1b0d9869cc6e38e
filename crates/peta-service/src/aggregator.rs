use rand::Rng;
use rand::seq::SliceRandom;
use tracing::{debug, warn};

use crate::fetcher::SiteClient;
use crate::models::FeedPost;
use crate::validation::SiteUrl;

/// Posts shown per render, across all sites.
pub const SAMPLE_SIZE: usize = 10;

/// Polls each site in order, one at a time. A site that fails is logged and
/// skipped; the result is the concatenation of everything that came back.
pub async fn collect_posts<'a, C, I>(client: &C, sites: I, per_site: u32) -> Vec<FeedPost>
where
    C: SiteClient,
    I: IntoIterator<Item = &'a SiteUrl>,
{
    let mut posts = Vec::new();

    for site in sites {
        match client.fetch_posts(site, per_site).await {
            Ok(fetched) => {
                debug!(site = %site, count = fetched.len(), "Fetched posts");
                posts.extend(fetched.into_iter().map(|post| FeedPost {
                    post,
                    website: site.clone(),
                }));
            }
            Err(err) => {
                warn!(site = %site, error = %err, "Skipping site");
            }
        }
    }

    posts
}

/// Uniformly shuffles and keeps the first `limit` posts. Duplicates in the
/// input are kept.
pub fn sample_posts<R>(mut posts: Vec<FeedPost>, limit: usize, rng: &mut R) -> Vec<FeedPost>
where
    R: Rng + ?Sized,
{
    posts.shuffle(rng);
    posts.truncate(limit);
    posts
}
