use serde::Deserialize;

use crate::utils::constants::{
    BUFFER_SECONDS, DEFAULT_CLIENT_ID, DEFAULT_CLIENT_SECRET, DEFAULT_CONNECT_TIMEOUT_MS,
    DEFAULT_DISCOVERY_URL, DEFAULT_HTTP_TIMEOUT_MS, DEFAULT_MAX_PAGES,
};

/// ================================
/// Full session layer configuration
/// ================================
#[derive(Debug, Deserialize, Clone, Default)]
pub struct SessionConfig {
    #[serde(default)]
    pub identity: IdentityConfig,
    #[serde(default)]
    pub services: ServiceUrls,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub token: TokenConfig,
    #[serde(default)]
    pub pagination: PaginationConfig,
    pub logging: Option<LoggingConfig>,
}

/// ================================
/// Identity provider
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct IdentityConfig {
    #[serde(default = "default_discovery_url")]
    pub discovery_url: String,
    /// basic auth user sent to the token endpoint
    #[serde(default = "default_client_id")]
    pub client_id: String,
    #[serde(default = "default_client_secret")]
    pub client_secret: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            discovery_url: default_discovery_url(),
            client_id: default_client_id(),
            client_secret: default_client_secret(),
        }
    }
}

/// Base URLs of the resource APIs reached with the session's bearer token.
#[derive(Debug, Deserialize, Clone)]
pub struct ServiceUrls {
    #[serde(default = "default_accounts_url")]
    pub accounts: String,
    #[serde(default = "default_containers_url")]
    pub containers: String,
    #[serde(default = "default_tagging_url")]
    pub tagging: String,
    #[serde(default = "default_billing_url")]
    pub billing: String,
    #[serde(default = "default_resource_controller_url")]
    pub resource_controller: String,
    /// document store holding schedules and API key records
    #[serde(default = "default_documents_url")]
    pub documents: String,
}

impl Default for ServiceUrls {
    fn default() -> Self {
        Self {
            accounts: default_accounts_url(),
            containers: default_containers_url(),
            tagging: default_tagging_url(),
            billing: default_billing_url(),
            resource_controller: default_resource_controller_url(),
            documents: default_documents_url(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    /// deadline for a single network round-trip
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct TokenConfig {
    /// invariant: >= 0
    #[serde(default = "default_buffer_seconds")]
    pub buffer_seconds: i64,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self { buffer_seconds: default_buffer_seconds() }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct PaginationConfig {
    /// invariant: > 0
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self { max_pages: default_max_pages() }
    }
}

/// ================================
/// Logging
/// ================================
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String, // allowed: trace, debug, info, warn, error
    pub format: LogFormat,
}

impl LoggingConfig {
    pub fn new(level: String, format: LogFormat) -> Self {
        Self { level, format }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::new("info".to_owned(), LogFormat::Compact)
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Compact,
}

fn default_discovery_url() -> String {
    DEFAULT_DISCOVERY_URL.to_string()
}

fn default_client_id() -> String {
    DEFAULT_CLIENT_ID.to_string()
}

fn default_client_secret() -> String {
    DEFAULT_CLIENT_SECRET.to_string()
}

fn default_accounts_url() -> String {
    "https://accounts.cloud.ibm.com".to_string()
}

fn default_containers_url() -> String {
    "https://containers.cloud.ibm.com".to_string()
}

fn default_tagging_url() -> String {
    "https://tags.global-search-tagging.cloud.ibm.com".to_string()
}

fn default_billing_url() -> String {
    "https://billing.cloud.ibm.com".to_string()
}

fn default_resource_controller_url() -> String {
    "https://resource-controller.cloud.ibm.com".to_string()
}

fn default_documents_url() -> String {
    "https://cloudant.cloud.ibm.com".to_string()
}

fn default_timeout_ms() -> u64 {
    DEFAULT_HTTP_TIMEOUT_MS
}

fn default_connect_timeout_ms() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_MS
}

fn default_buffer_seconds() -> i64 {
    BUFFER_SECONDS
}

fn default_max_pages() -> usize {
    DEFAULT_MAX_PAGES
}
