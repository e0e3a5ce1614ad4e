//! Shared constants and invariants

/// A token is only used while it has more than this many seconds left.
/// Tokens are issued for 3600 seconds.
pub const BUFFER_SECONDS: i64 = 100;
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 5000;
pub const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 2000;
pub const DEFAULT_MAX_PAGES: usize = 1000;

pub const DEFAULT_DISCOVERY_URL: &str = "https://iam.cloud.ibm.com/identity/.well-known/openid-configuration";
pub const DEFAULT_CLIENT_ID: &str = "bx";
pub const DEFAULT_CLIENT_SECRET: &str = "bx";

// Token endpoint grant types
pub const GRANT_API_KEY: &str = "urn:ibm:params:oauth:grant-type:apikey";
pub const GRANT_PASSCODE: &str = "urn:ibm:params:oauth:grant-type:passcode";
pub const GRANT_REFRESH_TOKEN: &str = "refresh_token";
