use std::future::Future;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::cache::token::Token;
use crate::config::settings::SessionConfig;
use crate::downstream::{requests, ApiRequest, AuthorizedTransport};
use crate::errors::SessionError;
use crate::helpers::time::now_i64;
use crate::identity::discovery::IdentityEndpoints;
use crate::identity::issuer::TokenIssuer;
use crate::observability::metrics::get_metrics;
use crate::session::pagination::{fetch_all, PagedResult};
use crate::utils::constants::{BUFFER_SECONDS, DEFAULT_MAX_PAGES};

/// Per-session policy knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    pub buffer_seconds: i64,
    pub max_pages: usize,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self { buffer_seconds: BUFFER_SECONDS, max_pages: DEFAULT_MAX_PAGES }
    }
}

impl From<&SessionConfig> for SessionSettings {
    fn from(config: &SessionConfig) -> Self {
        Self {
            buffer_seconds: config.token.buffer_seconds,
            max_pages: config.pagination.max_pages,
        }
    }
}

/// An authenticated identity and the token it currently holds.
///
/// Every protected operation goes through [`Session::guarded`]: the token is
/// checked, refreshed when it is inside the expiry buffer, and only then is
/// the resource API called. The check-and-refresh step holds a per-session
/// lock, so concurrent calls on one session refresh at most once.
pub struct Session<I, T> {
    token: Mutex<Token>,
    endpoints: Arc<IdentityEndpoints>,
    issuer: Arc<I>,
    transport: Arc<T>,
    settings: SessionSettings,
}

/// Account scope used for the refresh: an empty id means an unbound refresh.
fn scoped(account_id: &str) -> Option<&str> {
    Some(account_id).filter(|a| !a.is_empty())
}

impl<I, T> Session<I, T>
where
    I: TokenIssuer,
    T: AuthorizedTransport,
{
    pub fn new(
        token: Token,
        endpoints: Arc<IdentityEndpoints>,
        issuer: Arc<I>,
        transport: Arc<T>,
        settings: SessionSettings,
    ) -> Self {
        Self { token: Mutex::new(token), endpoints, issuer, transport, settings }
    }

    /// Snapshot of the token currently held.
    pub async fn token(&self) -> Token {
        self.token.lock().await.clone()
    }

    pub fn endpoints(&self) -> &IdentityEndpoints {
        &self.endpoints
    }

    pub fn settings(&self) -> SessionSettings {
        self.settings
    }

    pub async fn is_valid(&self) -> bool {
        self.is_valid_at(now_i64()).await
    }

    pub async fn is_valid_at(&self, now: i64) -> bool {
        self.token.lock().await.is_valid_at(now, self.settings.buffer_seconds)
    }

    /// A new session whose token is bound to `account_id`. `self` keeps its token.
    pub async fn bind_account_to_token(&self, account_id: &str) -> Result<Self, SessionError> {
        let token = self.exchange_refresh_token(scoped(account_id)).await?;
        info!(account_id, "token bound to account");
        Ok(self.with_token(token))
    }

    /// A new session with a freshly issued token, whether or not the current one is still valid.
    pub async fn renew_session(&self) -> Result<Self, SessionError> {
        let token = self.exchange_refresh_token(None).await?;
        info!("session renewed");
        Ok(self.with_token(token))
    }

    async fn exchange_refresh_token(&self, account_scope: Option<&str>) -> Result<Token, SessionError> {
        let refresh_token = self.token.lock().await.refresh_token.clone();
        self.issuer
            .refresh(&self.endpoints.token_endpoint, &refresh_token, account_scope)
            .await
    }

    fn with_token(&self, token: Token) -> Self {
        Self::new(
            token,
            self.endpoints.clone(),
            self.issuer.clone(),
            self.transport.clone(),
            self.settings,
        )
    }

    /// Access token that is safe to send now, refreshing first when needed.
    async fn ensure_fresh(&self, account_scope: Option<&str>) -> Result<String, SessionError> {
        let mut token = self.token.lock().await;
        if !token.is_valid_at(now_i64(), self.settings.buffer_seconds) {
            warn!(expiration = token.expiration, "access token expired, refreshing");
            get_metrics().await.guarded_refreshes.inc();
            let renewed = self
                .issuer
                .refresh(&self.endpoints.token_endpoint, &token.refresh_token, account_scope)
                .await?;
            *token = renewed;
            info!(expiration = token.expiration, "token refreshed");
        }
        Ok(token.access_token.clone())
    }

    /// Run `operation` with a valid access token.
    ///
    /// A refresh failure is returned as is and `operation` never runs. The
    /// operation's own error is returned untouched; nothing is retried.
    pub async fn guarded<F, Fut, R>(&self, account_scope: Option<&str>, operation: F) -> Result<R, SessionError>
    where
        F: FnOnce(String) -> Fut,
        Fut: Future<Output = Result<R, SessionError>>,
    {
        let access_token = self.ensure_fresh(account_scope).await?;
        operation(access_token).await
    }

    async fn call(&self, account_scope: Option<&str>, request: ApiRequest) -> Result<Value, SessionError> {
        debug!(service = request.service.label(), method = %request.method, "protected call");
        self.guarded(account_scope, |access_token| async move {
            self.transport.call(request, &access_token).await
        })
        .await
    }

    // ---------- accounts ----------

    /// Every account visible to the identity, following page cursors.
    pub async fn get_accounts(&self) -> Result<Vec<Value>, SessionError> {
        fetch_all(self.settings.max_pages, |cursor| async move {
            let page = self.call(None, requests::list_accounts(cursor)).await?;
            serde_json::from_value::<PagedResult<Value>>(page)
                .map_err(|e| SessionError::downstream(format!("malformed account page: {e}")))
        })
        .await
    }

    pub async fn get_account_resources(&self, account_id: &str) -> Result<Value, SessionError> {
        self.call(None, requests::get_account_resources(account_id)).await
    }

    pub async fn get_billing_data(&self, account_id: &str, cluster_id: &str, cluster_crn: &str) -> Result<Value, SessionError> {
        self.call(None, requests::get_billing_data(account_id, cluster_id, cluster_crn)).await
    }

    // ---------- clusters ----------

    pub async fn get_cluster(&self, cluster_id: &str, resource_group: &str) -> Result<Value, SessionError> {
        self.call(None, requests::get_cluster(cluster_id, resource_group)).await
    }

    pub async fn get_clusters(&self, location: &str) -> Result<Value, SessionError> {
        self.call(None, requests::get_clusters(location)).await
    }

    pub async fn create_cluster(&self, cluster: Value) -> Result<Value, SessionError> {
        self.call(None, requests::create_cluster(cluster)).await
    }

    pub async fn delete_cluster(&self, cluster_id: &str, resource_group: &str, delete_resources: bool) -> Result<(), SessionError> {
        self.call(None, requests::delete_cluster(cluster_id, resource_group, delete_resources)).await.map(|_| ())
    }

    pub async fn get_workers(&self, cluster_id: &str) -> Result<Value, SessionError> {
        self.call(None, requests::get_workers(cluster_id)).await
    }

    pub async fn get_datacenter_vlans(&self, datacenter: &str) -> Result<Value, SessionError> {
        self.call(None, requests::get_datacenter_vlans(datacenter)).await
    }

    // ---------- tags ----------

    pub async fn set_tag(&self, update: Value) -> Result<Value, SessionError> {
        self.call(None, requests::set_tag(update)).await
    }

    pub async fn set_cluster_tag(&self, tag: &str, cluster_id: &str, resource_id: &str) -> Result<Value, SessionError> {
        self.call(None, requests::set_cluster_tag(tag, cluster_id, resource_id)).await
    }

    pub async fn delete_tag(&self, update: Value) -> Result<Value, SessionError> {
        self.call(None, requests::delete_tag(update)).await
    }

    pub async fn get_tags(&self, cluster_crn: &str) -> Result<Value, SessionError> {
        self.call(None, requests::get_tags(cluster_crn)).await
    }

    // ---------- API key records, refreshed within the account ----------

    pub async fn set_api_key(&self, api_key: &str, account_id: &str) -> Result<(), SessionError> {
        self.call(scoped(account_id), requests::set_api_key(api_key, account_id)).await.map(|_| ())
    }

    pub async fn check_api_key(&self, account_id: &str) -> Result<(), SessionError> {
        self.call(scoped(account_id), requests::check_api_key(account_id)).await.map(|_| ())
    }

    pub async fn update_api_key(&self, api_key: &str, account_id: &str) -> Result<(), SessionError> {
        self.call(scoped(account_id), requests::update_api_key(api_key, account_id)).await.map(|_| ())
    }

    pub async fn delete_api_key(&self, account_id: &str) -> Result<(), SessionError> {
        self.call(scoped(account_id), requests::delete_api_key(account_id)).await.map(|_| ())
    }

    // ---------- schedule documents, refreshed within the account ----------

    pub async fn get_document(&self, account_id: &str) -> Result<Value, SessionError> {
        self.call(scoped(account_id), requests::get_document(account_id)).await
    }

    pub async fn get_document_v2(&self, account_id: &str) -> Result<Value, SessionError> {
        self.call(scoped(account_id), requests::get_document_v2(account_id)).await
    }

    pub async fn get_all_documents(&self, account_id: &str) -> Result<Value, SessionError> {
        self.call(scoped(account_id), requests::get_all_documents()).await
    }

    pub async fn create_document(&self, account_id: &str, data: Value) -> Result<(), SessionError> {
        self.call(scoped(account_id), requests::create_document(account_id, data)).await.map(|_| ())
    }

    pub async fn update_document(&self, account_id: &str, id: &str, rev: &str, data: Value) -> Result<(), SessionError> {
        self.call(scoped(account_id), requests::update_document(account_id, id, rev, data)).await.map(|_| ())
    }

    pub async fn delete_document(&self, account_id: &str, id: &str, rev: &str) -> Result<(), SessionError> {
        self.call(scoped(account_id), requests::delete_document(id, rev)).await.map(|_| ())
    }
}
