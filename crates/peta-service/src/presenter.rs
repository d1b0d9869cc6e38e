use askama::Template;

use crate::models::FeedPost;
use crate::registry::SiteRegistry;

pub const NO_POSTS_MESSAGE: &str = "There are no posts to display";

/// One row of the approvable list.
#[derive(Debug, Clone)]
pub struct PostView {
    pub id: u64,
    pub title: String,
    pub href: String,
    pub website: String,
}

impl From<&FeedPost> for PostView {
    fn from(item: &FeedPost) -> Self {
        Self {
            id: item.post.id,
            title: item.post.post_title.clone(),
            href: safe_href(&item.post.permalink),
            website: item.website.to_string(),
        }
    }
}

/// Remote permalinks are untrusted: anything that isn't http(s) becomes `#`.
fn safe_href(permalink: &str) -> String {
    match url::Url::parse(permalink) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => url.to_string(),
        _ => "#".to_string(),
    }
}

#[derive(Template)]
#[template(path = "post_list.html")]
struct PostListTemplate<'a> {
    posts: &'a [PostView],
}

#[derive(Template)]
#[template(path = "dashboard.html")]
struct DashboardTemplate<'a> {
    sites: Vec<String>,
    posts: &'a [PostView],
    ajax_base: &'a str,
}

pub fn render_post_list(posts: &[FeedPost]) -> Result<String, askama::Error> {
    let views: Vec<PostView> = posts.iter().map(PostView::from).collect();
    PostListTemplate { posts: &views }.render()
}

pub fn render_dashboard(
    sites: &SiteRegistry,
    posts: &[FeedPost],
    ajax_base: &str,
) -> Result<String, askama::Error> {
    let views: Vec<PostView> = posts.iter().map(PostView::from).collect();
    DashboardTemplate {
        sites: sites.iter().map(|site| site.to_string()).collect(),
        posts: &views,
        ajax_base,
    }
    .render()
}
