//! Configuration management for the server.

use std::env;
use std::time::Duration;

/// Default CMS API root.
pub const DEFAULT_CMS_BASE_URL: &str = "https://api.webflow.com/v2";

/// Server configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address
    pub host: String,
    /// Server port
    pub port: u16,
    /// PostgreSQL connection URL (create-lock store); in-process lock when unset
    pub database_url: Option<String>,
    /// Shared secret expected as a bearer token on the webhook; open when unset
    pub webhook_secret: Option<String>,
    pub cms: CmsConfig,
    pub crm: CrmConfig,
    /// Lifetime of a create-lock claim
    pub create_lock_ttl: Duration,
}

/// Target store (CMS) settings.
#[derive(Debug, Clone)]
pub struct CmsConfig {
    pub base_url: String,
    pub api_token: String,
    pub events_collection_id: String,
    pub locations_collection_id: String,
    pub categories_collection_id: String,
    pub airports_collection_id: String,
    /// Pause before every request, keeping under the CMS rate ceiling
    pub request_delay: Duration,
    /// Wall-clock limit of a single request
    pub timeout: Duration,
    /// Attempts per call when throttled, the first included
    pub max_attempts: u32,
}

/// Source-of-record (CRM) settings.
#[derive(Debug, Clone)]
pub struct CrmConfig {
    pub base_url: String,
    pub api_token: String,
    pub timeout: Duration,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = parse_var("PORT", 3000)?;

        let database_url = env::var("DATABASE_URL").ok().filter(|s| !s.is_empty());
        let webhook_secret = env::var("WEBHOOK_SECRET").ok().filter(|s| !s.is_empty());

        let cms = CmsConfig {
            base_url: env::var("CMS_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_CMS_BASE_URL.to_string()),
            api_token: required("CMS_API_TOKEN")?,
            events_collection_id: required("CMS_EVENTS_COLLECTION_ID")?,
            locations_collection_id: required("CMS_LOCATIONS_COLLECTION_ID")?,
            categories_collection_id: required("CMS_CATEGORIES_COLLECTION_ID")?,
            airports_collection_id: required("CMS_AIRPORTS_COLLECTION_ID")?,
            request_delay: Duration::from_millis(parse_var("CMS_REQUEST_DELAY_MS", 1100)?),
            timeout: Duration::from_secs(parse_var("CMS_TIMEOUT_SECS", 30)?),
            max_attempts: parse_var("CMS_MAX_ATTEMPTS", 5)?,
        };

        let crm = CrmConfig {
            base_url: required("CRM_BASE_URL")?,
            api_token: required("CRM_API_TOKEN")?,
            timeout: Duration::from_secs(parse_var("CRM_TIMEOUT_SECS", 30)?),
        };

        let create_lock_ttl = Duration::from_secs(parse_var("CREATE_LOCK_TTL_SECS", 30)?);

        Ok(Self {
            host,
            port,
            database_url,
            webhook_secret,
            cms,
            crm,
            create_lock_ttl,
        })
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(name)),
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(default),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}
