use std::future::Future;

use http::header::ACCEPT;
use reqwest::Client;
use serde::Deserialize;
use tracing::{error, info};

use crate::cache::token::Token;
use crate::errors::SessionError;
use crate::helpers::text::truncate;
use crate::helpers::time::{get_instant, now_i64};
use crate::observability::metrics::get_metrics;
use crate::resilience::deadline::Deadline;
use crate::utils::constants::{GRANT_API_KEY, GRANT_PASSCODE, GRANT_REFRESH_TOKEN};

/// Token acquisition protocols spoken with the identity provider's token endpoint.
pub trait TokenIssuer: Send + Sync {
    /// Initial login with an API key. Failures are [`SessionError::Authentication`].
    fn exchange_api_key(
        &self,
        token_endpoint: &str,
        api_key: &str,
    ) -> impl Future<Output = Result<Token, SessionError>> + Send;

    /// Interactive login with a one-time passcode. Failures are [`SessionError::Authentication`].
    fn exchange_one_time_passcode(
        &self,
        token_endpoint: &str,
        passcode: &str,
    ) -> impl Future<Output = Result<Token, SessionError>> + Send;

    /// Exchange a refresh token for a new pair, bound to `account_id` when one is given.
    /// Failures are [`SessionError::Refresh`].
    fn refresh(
        &self,
        token_endpoint: &str,
        refresh_token: &str,
        account_id: Option<&str>,
    ) -> impl Future<Output = Result<Token, SessionError>> + Send;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grant {
    ApiKey,
    Passcode,
    Refresh,
}

impl Grant {
    pub fn label(&self) -> &'static str {
        match self {
            Grant::ApiKey => "apikey",
            Grant::Passcode => "passcode",
            Grant::Refresh => "refresh_token",
        }
    }

    fn grant_type(&self) -> &'static str {
        match self {
            Grant::ApiKey => GRANT_API_KEY,
            Grant::Passcode => GRANT_PASSCODE,
            Grant::Refresh => GRANT_REFRESH_TOKEN,
        }
    }

    fn failure(&self, message: String) -> SessionError {
        match self {
            Grant::ApiKey | Grant::Passcode => SessionError::Authentication(message),
            Grant::Refresh => SessionError::Refresh(message),
        }
    }
}

/// Token endpoint response body.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    /// lifetime in seconds
    expires_in: Option<i64>,
    /// absolute expiry, unix seconds
    expiration: Option<i64>,
}

impl TokenResponse {
    fn into_token(self, now: i64, presented_refresh_token: Option<&str>) -> Result<Token, String> {
        if self.access_token.is_empty() {
            return Err("token response has an empty access_token".to_string());
        }
        let expiration = match (self.expires_in, self.expiration) {
            (Some(expires_in), _) => Some(expires_in)
                .filter(|lifetime| *lifetime > 0)
                .and_then(|lifetime| now.checked_add(lifetime))
                .ok_or_else(|| format!("token response has an unusable expires_in ({expires_in})"))?,
            (None, Some(expiration)) => expiration,
            (None, None) => return Err("token response carries neither expires_in nor expiration".to_string()),
        };
        // a refresh grant may omit the refresh token, the presented one stays usable
        let refresh_token = self
            .refresh_token
            .filter(|t| !t.is_empty())
            .or_else(|| presented_refresh_token.map(str::to_owned))
            .ok_or_else(|| "token response has no refresh_token".to_string())?;
        Ok(Token::new(self.access_token, refresh_token, expiration))
    }
}

/// IBM Cloud IAM token endpoint client: form-encoded grants with HTTP basic
/// client credentials.
#[derive(Debug, Clone)]
pub struct IamTokenIssuer {
    client: Client,
    client_id: String,
    client_secret: String,
    deadline: Deadline,
}

impl IamTokenIssuer {
    pub fn new(client: Client, client_id: String, client_secret: String, deadline: Deadline) -> Self {
        Self { client, client_id, client_secret, deadline }
    }

    async fn request_token(
        &self,
        token_endpoint: &str,
        grant: Grant,
        form: Vec<(&str, &str)>,
        presented_refresh_token: Option<&str>,
    ) -> Result<Token, SessionError> {
        let metrics = get_metrics().await;
        let start = get_instant();
        metrics.token_requests.with_label_values(&[grant.label()]).inc();

        let result = self
            .deadline
            .run(
                grant.label(),
                self.post_grant(token_endpoint, grant, &form, presented_refresh_token),
                |message| grant.failure(message),
            )
            .await;

        metrics
            .token_duration
            .with_label_values(&[grant.label()])
            .observe(start.elapsed().as_secs_f64());
        result
            .inspect(|token| {
                info!(grant = grant.label(), expiration = token.expiration, "token issued");
            })
            .inspect_err(|e| {
                metrics.token_failures.with_label_values(&[grant.label()]).inc();
                error!(grant = grant.label(), error = %e, "token request failed");
            })
    }

    async fn post_grant(
        &self,
        token_endpoint: &str,
        grant: Grant,
        form: &[(&str, &str)],
        presented_refresh_token: Option<&str>,
    ) -> Result<Token, SessionError> {
        let mut params = vec![("grant_type", grant.grant_type())];
        params.extend_from_slice(form);

        let response = self
            .client
            .post(token_endpoint)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .header(ACCEPT, "application/json")
            .form(&params)
            .send()
            .await
            .map_err(|e| grant.failure(format!("token endpoint unreachable: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| grant.failure(format!("cannot read token response: {e}")))?;

        if !status.is_success() {
            return Err(grant.failure(format!(
                "token endpoint rejected {} grant: {}: {}",
                grant.label(),
                status,
                truncate(&body, 200)
            )));
        }

        let response: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| grant.failure(format!("malformed token response: {e}")))?;
        response
            .into_token(now_i64(), presented_refresh_token)
            .map_err(|message| grant.failure(message))
    }
}

impl TokenIssuer for IamTokenIssuer {
    async fn exchange_api_key(&self, token_endpoint: &str, api_key: &str) -> Result<Token, SessionError> {
        self.request_token(
            token_endpoint,
            Grant::ApiKey,
            vec![("apikey", api_key), ("response_type", "cloud_iam")],
            None,
        )
        .await
    }

    async fn exchange_one_time_passcode(&self, token_endpoint: &str, passcode: &str) -> Result<Token, SessionError> {
        self.request_token(
            token_endpoint,
            Grant::Passcode,
            vec![("passcode", passcode), ("response_type", "cloud_iam")],
            None,
        )
        .await
    }

    async fn refresh(
        &self,
        token_endpoint: &str,
        refresh_token: &str,
        account_id: Option<&str>,
    ) -> Result<Token, SessionError> {
        let mut form = vec![("refresh_token", refresh_token)];
        if let Some(account_id) = account_id.filter(|a| !a.is_empty()) {
            form.push(("bss_account", account_id));
        }
        self.request_token(token_endpoint, Grant::Refresh, form, Some(refresh_token))
            .await
    }
}
