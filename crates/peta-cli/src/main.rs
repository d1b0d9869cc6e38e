use clap::{Parser, Subcommand};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use std::error::Error;
use url::Url;

#[derive(Parser)]
#[command(name = "peta")]
#[command(about = "A CLI for reviewing posts aggregated from remote sites")]
struct Cli {
    /// Base URL for the Peta service
    #[arg(long, default_value = "http://localhost:3000")]
    service_url: String,

    /// Acting username, sent as the x-remote-user header
    #[arg(long, global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show or replace the configured sites
    Sites {
        #[command(subcommand)]
        command: SitesCommand,
    },
    /// Publish local posts
    Posts {
        #[command(subcommand)]
        command: PostsCommand,
    },
    /// Print the unapproved feed of a site
    Feed {
        /// Base URL of the site
        site: String,
        /// Number of posts to request
        #[arg(short, long, default_value_t = 10)]
        count: u32,
    },
    /// Approve a post on behalf of the acting user
    Approve {
        post_id: u64,
        /// Site the post came from
        #[arg(short, long)]
        website: String,
    },
}

#[derive(Subcommand)]
enum SitesCommand {
    List,
    /// Replace the list (at most five URLs)
    Set { urls: Vec<String> },
}

#[derive(Subcommand)]
enum PostsCommand {
    Add {
        title: String,
        /// Store as a draft, which stays out of the feed
        #[arg(long)]
        draft: bool,
    },
}

#[derive(Serialize)]
struct UpdateSettings<'a> {
    sites: &'a [String],
}

#[derive(Deserialize)]
struct Rejected {
    input: String,
    reason: String,
}

#[derive(Deserialize)]
struct SettingsResponse {
    sites: Vec<String>,
    #[serde(default)]
    rejected: Vec<Rejected>,
}

#[derive(Serialize)]
struct NewPost<'a> {
    title: &'a str,
    status: &'static str,
}

#[derive(Deserialize)]
struct FeedPost {
    #[serde(rename = "ID")]
    id: u64,
    #[serde(default)]
    post_title: String,
    #[serde(default)]
    permalink: String,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(err) = run(cli).await {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let client = Client::new();
    let service_url = cli.service_url.trim_end_matches('/');

    match cli.command {
        Commands::Sites {
            command: SitesCommand::List,
        } => list_sites(&client, service_url).await,
        Commands::Sites {
            command: SitesCommand::Set { urls },
        } => set_sites(&client, service_url, &urls).await,
        Commands::Posts {
            command: PostsCommand::Add { title, draft },
        } => add_post(&client, service_url, &title, draft).await,
        Commands::Feed { site, count } => show_feed(&client, &site, count).await,
        Commands::Approve { post_id, website } => {
            approve(&client, service_url, cli.user.as_deref(), post_id, &website).await
        }
    }
}

/// Hands back a successful response; any other status becomes an error
/// carrying the response body.
async fn check(response: Response, action: &str) -> Result<Response, Box<dyn Error>> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await?;
    Err(format!("Failed to {action}: {status}\nResponse: {body}").into())
}

fn print_sites(settings: &SettingsResponse) {
    if settings.sites.is_empty() {
        println!("No sites configured");
    }
    for (position, site) in settings.sites.iter().enumerate() {
        println!("{}. {site}", position + 1);
    }
    for rejected in &settings.rejected {
        eprintln!("Cleared {:?}: {}", rejected.input, rejected.reason);
    }
}

async fn list_sites(client: &Client, service_url: &str) -> Result<(), Box<dyn Error>> {
    let response = client
        .get(format!("{service_url}/admin/settings"))
        .send()
        .await?;

    let response = check(response, "load sites").await?;
    print_sites(&response.json().await?);
    Ok(())
}

async fn set_sites(client: &Client, service_url: &str, urls: &[String]) -> Result<(), Box<dyn Error>> {
    let response = client
        .put(format!("{service_url}/admin/settings"))
        .json(&UpdateSettings { sites: urls })
        .send()
        .await?;

    let response = check(response, "save sites").await?;
    print_sites(&response.json().await?);
    Ok(())
}

async fn add_post(
    client: &Client,
    service_url: &str,
    title: &str,
    draft: bool,
) -> Result<(), Box<dyn Error>> {
    let payload = NewPost {
        title,
        status: if draft { "draft" } else { "publish" },
    };

    let response = client
        .post(format!("{service_url}/admin/posts"))
        .json(&payload)
        .send()
        .await?;

    let response = check(response, "add post").await?;
    let post: FeedPost = response.json().await?;
    println!("Post added with ID {}: {}", post.id, post.permalink);
    Ok(())
}

async fn show_feed(client: &Client, site: &str, count: u32) -> Result<(), Box<dyn Error>> {
    let count = count.to_string();
    let mut endpoint = Url::parse(site.trim().trim_end_matches('/'))?;
    endpoint
        .path_segments_mut()
        .map_err(|_| format!("{site} cannot be a base URL"))?
        .pop_if_empty()
        .extend(["wp-json", "peta", "v1", "get_posts", count.as_str()]);

    let response = client.get(endpoint).send().await?;

    let response = check(response, "fetch feed").await?;
    let posts: Vec<FeedPost> = response.json().await?;
    if posts.is_empty() {
        println!("There are no posts to display");
    }
    for post in posts {
        println!("[{}] {} <{}>", post.id, post.post_title, post.permalink);
    }
    Ok(())
}

async fn approve(
    client: &Client,
    service_url: &str,
    user: Option<&str>,
    post_id: u64,
    website: &str,
) -> Result<(), Box<dyn Error>> {
    let mut request = client
        .post(format!("{service_url}/admin/ajax/peta_approve_website"))
        .form(&[("post_id", post_id.to_string()), ("website", website.to_string())]);

    if let Some(user) = user {
        request = request.header("x-remote-user", user);
    }

    check(request.send().await?, "approve post").await?;
    println!("Approved post {post_id} from {website}");
    Ok(())
}
