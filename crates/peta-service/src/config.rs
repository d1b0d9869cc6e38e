use std::env;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;

use crate::fetcher::DEFAULT_FETCH_TIMEOUT;
use crate::validation::{SiteUrl, sanitize_site_url, validate_username};

pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:3000";
pub const DEFAULT_SITE_URL: &str = "http://localhost:3000";
pub const DEFAULT_ADMIN_USERNAME: &str = "admin";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} environment variable must be set")]
    Missing(&'static str),

    #[error("Invalid value {value:?} for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub database_url: String,
    pub bind_address: SocketAddr,
    /// Public base URL of this instance. Approvals for posts from this
    /// origin are recorded locally.
    pub site_url: SiteUrl,
    /// Acting user when the request carries no `x-remote-user` header.
    pub admin_username: String,
    pub fetch_timeout: Duration,
    pub request_timeout: Duration,
    pub allow_local_sites: bool,
    /// Shared secret required by the approval endpoint when set.
    pub approval_token: Option<String>,
}

impl ServiceConfig {
    /// Defaults for everything except the database location and public URL.
    pub fn new(database_url: impl Into<String>, site_url: SiteUrl) -> Self {
        Self {
            database_url: database_url.into(),
            bind_address: SocketAddr::from(([0, 0, 0, 0], 3000)),
            site_url,
            admin_username: DEFAULT_ADMIN_USERNAME.to_string(),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            allow_local_sites: false,
            approval_token: None,
        }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key lookup; `from_env` passes the process
    /// environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.is_empty())
            .ok_or(ConfigError::Missing("DATABASE_URL"))?;

        let bind_raw =
            lookup("PETA_BIND_ADDRESS").unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());
        let bind_address = bind_raw
            .parse::<SocketAddr>()
            .map_err(|err| invalid("PETA_BIND_ADDRESS", &bind_raw, err))?;

        let site_raw = lookup("PETA_SITE_URL").unwrap_or_else(|| DEFAULT_SITE_URL.to_string());
        let site_url =
            sanitize_site_url(&site_raw).map_err(|err| invalid("PETA_SITE_URL", &site_raw, err))?;

        let admin_username =
            lookup("PETA_ADMIN_USERNAME").unwrap_or_else(|| DEFAULT_ADMIN_USERNAME.to_string());
        validate_username(&admin_username)
            .map_err(|err| invalid("PETA_ADMIN_USERNAME", &admin_username, err))?;

        let fetch_timeout = match lookup("PETA_FETCH_TIMEOUT_SECS") {
            Some(raw) => parse_secs("PETA_FETCH_TIMEOUT_SECS", &raw)?,
            None => DEFAULT_FETCH_TIMEOUT,
        };

        let request_timeout = match lookup("PETA_REQUEST_TIMEOUT_SECS") {
            Some(raw) => parse_secs("PETA_REQUEST_TIMEOUT_SECS", &raw)?,
            None => DEFAULT_REQUEST_TIMEOUT,
        };

        let allow_local_sites = match lookup("PETA_ALLOW_LOCAL_SITES") {
            Some(raw) => parse_bool("PETA_ALLOW_LOCAL_SITES", &raw)?,
            None => false,
        };

        let approval_token = lookup("PETA_APPROVAL_TOKEN").filter(|v| !v.is_empty());

        Ok(Self {
            database_url,
            bind_address,
            site_url,
            admin_username,
            fetch_timeout,
            request_timeout,
            allow_local_sites,
            approval_token,
        })
    }
}

fn invalid(var: &'static str, value: &str, reason: impl ToString) -> ConfigError {
    ConfigError::Invalid {
        var,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_secs(var: &'static str, raw: &str) -> Result<Duration, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(0) => Err(invalid(var, raw, "must be greater than 0")),
        Ok(secs) => Ok(Duration::from_secs(secs)),
        Err(err) => Err(invalid(var, raw, err)),
    }
}

fn parse_bool(var: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(invalid(var, raw, "expected a boolean")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ServiceConfig::from_lookup(lookup(&[("DATABASE_URL", "peta.db")])).unwrap();

        assert_eq!(config.database_url, "peta.db");
        assert_eq!(config.bind_address.to_string(), DEFAULT_BIND_ADDRESS);
        assert_eq!(config.site_url.to_string(), DEFAULT_SITE_URL);
        assert_eq!(config.admin_username, "admin");
        assert_eq!(config.fetch_timeout, Duration::from_secs(5));
        assert_eq!(config.request_timeout, Duration::from_secs(15));
        assert!(!config.allow_local_sites);
        assert!(config.approval_token.is_none());
    }

    #[test]
    fn test_missing_database_url() {
        assert!(matches!(
            ServiceConfig::from_lookup(lookup(&[])),
            Err(ConfigError::Missing("DATABASE_URL"))
        ));
    }

    #[test]
    fn test_overrides() {
        let config = ServiceConfig::from_lookup(lookup(&[
            ("DATABASE_URL", ":memory:"),
            ("PETA_BIND_ADDRESS", "127.0.0.1:8080"),
            ("PETA_SITE_URL", "https://news.example.com/"),
            ("PETA_ADMIN_USERNAME", "editor"),
            ("PETA_FETCH_TIMEOUT_SECS", "2"),
            ("PETA_ALLOW_LOCAL_SITES", "yes"),
            ("PETA_APPROVAL_TOKEN", "s3cret"),
        ]))
        .unwrap();

        assert_eq!(config.bind_address.port(), 8080);
        assert_eq!(config.site_url.to_string(), "https://news.example.com");
        assert_eq!(config.admin_username, "editor");
        assert_eq!(config.fetch_timeout, Duration::from_secs(2));
        assert!(config.allow_local_sites);
        assert_eq!(config.approval_token.as_deref(), Some("s3cret"));
    }

    #[test]
    fn test_invalid_values() {
        for (var, value) in [
            ("PETA_BIND_ADDRESS", "nowhere"),
            ("PETA_SITE_URL", "not a url"),
            ("PETA_ADMIN_USERNAME", "has space"),
            ("PETA_FETCH_TIMEOUT_SECS", "0"),
            ("PETA_REQUEST_TIMEOUT_SECS", "soon"),
            ("PETA_ALLOW_LOCAL_SITES", "maybe"),
        ] {
            let result = ServiceConfig::from_lookup(lookup(&[("DATABASE_URL", "x.db"), (var, value)]));
            assert!(
                matches!(result, Err(ConfigError::Invalid { var: v, .. }) if v == var),
                "{var}={value} should be rejected"
            );
        }
    }
}
