//! Configuration validation with aggregated errors.
//! - Aggregates all issues into Vec<String>
//! - Validates:
//!   * identity provider URL and client credentials
//!   * downstream service base URLs
//!   * timeout, token buffer and page ceiling bounds
//!   * logging level

use tracing::{error, info};

use crate::config::settings::{
    HttpConfig, IdentityConfig, LoggingConfig, PaginationConfig, ServiceUrls, SessionConfig,
    TokenConfig,
};
use crate::observability::metrics::get_metrics;

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Public entrypoint: returns Ok(()) or Err(Vec<String>) containing all issues.
pub async fn validate_session_config(cfg: &SessionConfig) -> Result<(), Vec<String>> {
    let mut errors: Vec<String> = Vec::new();

    validate_identity(&cfg.identity, &mut errors);
    validate_services(&cfg.services, &mut errors);
    validate_http(&cfg.http, &mut errors);
    validate_token(&cfg.token, &mut errors);
    validate_pagination(&cfg.pagination, &mut errors);
    if let Some(logging) = &cfg.logging {
        validate_logging(logging, &mut errors);
    }

    if errors.is_empty() {
        info!("config valid");
        Ok(())
    } else {
        error!("configuration validation errors ({}):", errors.len());
        for e in &errors {
            error!(" - {}", e);
        }
        get_metrics().await.config_validation_errors.inc();
        Err(errors)
    }
}

fn validate_identity(identity: &IdentityConfig, errors: &mut Vec<String>) {
    validate_url("identity.discovery_url", &identity.discovery_url, errors);
    if identity.client_id.is_empty() {
        errors.push("identity.client_id must not be empty".to_string());
    }
}

fn validate_services(services: &ServiceUrls, errors: &mut Vec<String>) {
    validate_url("services.accounts", &services.accounts, errors);
    validate_url("services.containers", &services.containers, errors);
    validate_url("services.tagging", &services.tagging, errors);
    validate_url("services.billing", &services.billing, errors);
    validate_url("services.resource_controller", &services.resource_controller, errors);
    validate_url("services.documents", &services.documents, errors);
}

fn validate_http(http: &HttpConfig, errors: &mut Vec<String>) {
    if http.timeout_ms == 0 {
        errors.push("http.timeout_ms must be > 0".to_string());
    }
    if http.connect_timeout_ms == 0 {
        errors.push("http.connect_timeout_ms must be > 0".to_string());
    }
}

fn validate_token(token: &TokenConfig, errors: &mut Vec<String>) {
    // tokens live for 3600 seconds; a buffer that large would refresh on every call
    if !(0..3600).contains(&token.buffer_seconds) {
        errors.push(format!(
            "token.buffer_seconds ({}) must be within 0..3600",
            token.buffer_seconds
        ));
    }
}

fn validate_pagination(pagination: &PaginationConfig, errors: &mut Vec<String>) {
    if pagination.max_pages == 0 {
        errors.push("pagination.max_pages must be > 0".to_string());
    }
}

fn validate_logging(logging: &LoggingConfig, errors: &mut Vec<String>) {
    if !LOG_LEVELS.contains(&logging.level.to_lowercase().as_str()) {
        errors.push(format!(
            "logging.level '{}' must be one of {:?}",
            logging.level, LOG_LEVELS
        ));
    }
}

fn validate_url(field: &str, url: &str, errors: &mut Vec<String>) {
    if url.is_empty() {
        errors.push(format!("{} must not be empty", field));
    } else if !(url.starts_with("http://") || url.starts_with("https://")) {
        errors.push(format!("{} '{}' must be an http(s) URL", field, url));
    }
}

#[cfg(test)]
mod test {
    use super::validate_session_config;
    use crate::config::settings::{LogFormat, LoggingConfig, SessionConfig};

    #[tokio::test]
    async fn default_config_is_valid() {
        assert!(validate_session_config(&SessionConfig::default()).await.is_ok());
    }

    #[tokio::test]
    async fn every_violation_is_collected() {
        let mut cfg = SessionConfig::default();
        cfg.identity.client_id = String::new();
        cfg.services.billing = String::new();
        cfg.services.documents = "cloudant.local".to_string();
        cfg.http.connect_timeout_ms = 0;
        cfg.token.buffer_seconds = -1;
        cfg.logging = Some(LoggingConfig::new("loud".to_string(), LogFormat::Json));

        let errors = validate_session_config(&cfg).await.unwrap_err();
        assert_eq!(errors.len(), 6, "{errors:?}");
        assert!(errors.iter().any(|e| e.starts_with("identity.client_id")));
        assert!(errors.iter().any(|e| e == "services.billing must not be empty"));
        assert!(errors.iter().any(|e| e.contains("'cloudant.local' must be an http(s) URL")));
        assert!(errors.iter().any(|e| e.starts_with("http.connect_timeout_ms")));
        assert!(errors.iter().any(|e| e.starts_with("token.buffer_seconds (-1)")));
        assert!(errors.iter().any(|e| e.starts_with("logging.level 'loud'")));
    }
}
