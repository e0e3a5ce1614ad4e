use std::{fs, path::Path};

use anyhow::{anyhow, Result};
use regex::Regex;
use tracing::{debug, error};

use crate::config::proc_validator;
use crate::config::settings::{LoggingConfig, SessionConfig};
use crate::observability::metrics::get_metrics;

/// Load and validate config from YAML file
pub async fn file_to_config(path: &Path) -> Result<SessionConfig> {
    let content = fs::read_to_string(path)
        .map_err(|e| anyhow!("cannot read config '{}': {}", path.display(), e))?;

    let expanded = expand_env_vars(&content);
    parse_config(expanded).await
}

pub async fn parse_config(content: String) -> Result<SessionConfig> {
    let metrics = get_metrics().await;
    let mut session_config: SessionConfig = if content.trim().is_empty() {
        SessionConfig::default()
    } else {
        serde_yaml::from_str(&content).inspect_err(|e| {
            error!("parse config error: {}", e);
            metrics.config_validation_errors.inc();
        })?
    };

    // Apply defaults
    if session_config.logging.is_none() {
        session_config.logging = Some(LoggingConfig::default());
    }
    normalize_urls(&mut session_config);

    debug!("validation config ...");
    proc_validator::validate_session_config(&session_config)
        .await
        .map_err(|errors| {
            anyhow!(
                "config is not valid, total errors:{}, \n{}",
                errors.len(),
                errors.join("\n")
            )
        })?;

    Ok(session_config)
}

/// Page cursors are matched against base URLs, so drop trailing slashes once here.
fn normalize_urls(config: &mut SessionConfig) {
    let services = &mut config.services;
    for url in [
        &mut services.accounts,
        &mut services.containers,
        &mut services.tagging,
        &mut services.billing,
        &mut services.resource_controller,
        &mut services.documents,
    ] {
        let trimmed = url.trim_end_matches('/').len();
        url.truncate(trimmed);
    }
}

/// Replace `${VAR}` and `${VAR:default}` with values from the environment.
fn expand_env_vars(input: &str) -> String {
    let re = Regex::new(r"\$\{(\w+)(?::([^\}]+))?\}").expect("env placeholder regex");
    re.replace_all(input, |caps: &regex::Captures| {
        let var = &caps[1];
        let default = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        std::env::var(var).unwrap_or_else(|_| default.to_string())
    })
    .to_string()
}
