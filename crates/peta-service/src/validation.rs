use serde::{Deserialize, Serialize};
use std::convert::TryFrom;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;
use thiserror::Error;
use url::{Host, Url};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("URL cannot be empty")]
    EmptyUrl,
    #[error("Malformed URL: {0}")]
    MalformedUrl(String),
    #[error("URL must have a host")]
    MissingHost,
    #[error("Local addresses not allowed: {0}")]
    LocalAddress(String),
    #[error("Unsupported URL scheme: {0}")]
    UnsupportedScheme(String),
    #[error("Site URL must not carry a query string: {0}")]
    QueryNotAllowed(String),
    #[error("Invalid username: {0:?}")]
    InvalidUsername(String),
    #[error("At most {max} sites can be configured, got {count}")]
    TooManySites { count: usize, max: usize },
    #[error("Post title cannot be empty")]
    EmptyTitle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    fn default_port(self) -> u16 {
        match self {
            Scheme::Http => 80,
            Scheme::Https => 443,
        }
    }
}

impl fmt::Display for Scheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scheme::Http => write!(f, "http"),
            Scheme::Https => write!(f, "https"),
        }
    }
}

/// Base URL of a site whose feed can be polled.
/// Guarantees: HTTP/HTTPS scheme, non-empty lowercase host, no query,
/// no fragment, no trailing slash.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SiteUrl {
    pub scheme: Scheme,

    /// guaranteed non-empty
    pub host: String,

    /// only non-default ports
    pub port: Option<u16>,

    /// empty for the site root, otherwise starts with '/' and never ends with one
    pub path: String,
}

impl SiteUrl {
    /// Joins REST path segments onto the base URL, percent-encoding each one.
    pub fn endpoint<I, S>(&self, segments: I) -> Result<Url, ValidationError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let base = self.to_string();
        let mut url = Url::parse(&base).map_err(|_| ValidationError::MalformedUrl(base))?;
        url.path_segments_mut()
            .map_err(|_| ValidationError::MalformedUrl(self.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// True when the host is a loopback, private, link-local or unspecified
    /// address (IPv4-mapped IPv6 included), or a `localhost` name.
    pub fn is_local(&self) -> bool {
        if self.host == "localhost" || self.host.ends_with(".localhost") {
            return true;
        }

        let bare = self.host.trim_start_matches('[').trim_end_matches(']');
        match bare.parse::<IpAddr>() {
            Ok(IpAddr::V4(ip)) => is_local_v4(&ip),
            Ok(IpAddr::V6(ip)) => match ip.to_ipv4_mapped() {
                Some(mapped) => is_local_v4(&mapped),
                None => {
                    ip.is_loopback()
                        || ip.is_unspecified()
                        || is_unique_local(&ip)
                        || is_unicast_link_local(&ip)
                }
            },
            Err(_) => false,
        }
    }

    /// Fetch-time policy: refuse local hosts unless explicitly allowed.
    pub fn check_fetchable(&self, allow_local: bool) -> Result<(), ValidationError> {
        if !allow_local && self.is_local() {
            return Err(ValidationError::LocalAddress(self.host.clone()));
        }
        Ok(())
    }
}

fn is_local_v4(ip: &Ipv4Addr) -> bool {
    ip.is_loopback() || ip.is_private() || ip.is_link_local() || ip.is_unspecified()
}

/// `fc00::/7`
fn is_unique_local(ip: &Ipv6Addr) -> bool {
    (ip.segments()[0] & 0xfe00) == 0xfc00
}

/// `fe80::/10`
fn is_unicast_link_local(ip: &Ipv6Addr) -> bool {
    (ip.segments()[0] & 0xffc0) == 0xfe80
}

impl fmt::Display for SiteUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.host)?;

        if let Some(port) = self.port {
            write!(f, ":{port}")?;
        }

        write!(f, "{}", self.path)
    }
}

impl TryFrom<Url> for SiteUrl {
    type Error = ValidationError;

    fn try_from(url: Url) -> Result<Self, Self::Error> {
        let scheme = match url.scheme() {
            "http" => Scheme::Http,
            "https" => Scheme::Https,
            scheme => return Err(ValidationError::UnsupportedScheme(scheme.to_string())),
        };

        let host = match url.host() {
            Some(Host::Domain(domain)) if !domain.is_empty() => domain.to_lowercase(),
            Some(Host::Ipv4(ip)) => ip.to_string(),
            Some(Host::Ipv6(ip)) => format!("[{ip}]"),
            _ => return Err(ValidationError::MissingHost),
        };

        if url.query().is_some_and(|q| !q.is_empty()) {
            return Err(ValidationError::QueryNotAllowed(url.to_string()));
        }

        let port = url.port().filter(|&p| p != scheme.default_port());

        let path = url.path().trim_end_matches('/').to_string();

        Ok(SiteUrl {
            scheme,
            host,
            port,
            path,
        })
    }
}

impl FromStr for SiteUrl {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        validate_site_url(s)
    }
}

impl TryFrom<String> for SiteUrl {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        validate_site_url(&value)
    }
}

impl From<SiteUrl> for String {
    fn from(value: SiteUrl) -> Self {
        value.to_string()
    }
}

pub fn validate_site_url(url_str: &str) -> Result<SiteUrl, ValidationError> {
    if url_str.is_empty() {
        return Err(ValidationError::EmptyUrl);
    }

    let url =
        Url::parse(url_str).map_err(|_| ValidationError::MalformedUrl(url_str.to_string()))?;
    SiteUrl::try_from(url)
}

/// Settings-form sanitization: trims whitespace and trailing slashes, then
/// validates.
pub fn sanitize_site_url(input: &str) -> Result<SiteUrl, ValidationError> {
    let trimmed = input.trim().trim_end_matches('/');
    validate_site_url(trimmed)
}

/// Usernames travel in a URL path segment: `[-_a-zA-Z0-9]+`.
pub fn validate_username(username: &str) -> Result<&str, ValidationError> {
    let valid = !username.is_empty()
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

    if valid {
        Ok(username)
    } else {
        Err(ValidationError::InvalidUsername(username.to_string()))
    }
}
