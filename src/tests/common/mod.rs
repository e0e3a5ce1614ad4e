// tests/common/mod.rs
pub use axum::Router;
pub use serde_json::json;
pub use tokio::task::JoinHandle;

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use reqwest::Client;
use serde_json::Value;

use crate::cache::token::Token;
use crate::config::settings::ServiceUrls;
use crate::downstream::{ApiRequest, AuthorizedTransport};
use crate::errors::SessionError;
use crate::helpers::time::now_i64;
use crate::identity::discovery::IdentityEndpoints;
use crate::identity::issuer::TokenIssuer;
use crate::session::{Session, SessionSettings};

/// Spawn an Axum router on an ephemeral port and return (JoinHandle, SocketAddr)
pub async fn spawn_axum(router: Router) -> (JoinHandle<()>, SocketAddr) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind failed");
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.expect("server failed");
    });
    (handle, addr)
}

pub fn build_reqwest_client() -> Client {
    Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .expect("reqwest client")
}

/// Every resource service pointed at the same base URL.
pub fn service_urls(base: &str) -> ServiceUrls {
    ServiceUrls {
        accounts: base.to_string(),
        containers: base.to_string(),
        tagging: base.to_string(),
        billing: base.to_string(),
        resource_controller: base.to_string(),
        documents: base.to_string(),
    }
}

/// Discovery document as served by the identity provider, rooted at `base`.
pub fn discovery_document(base: &str) -> Value {
    json!({
        "issuer": format!("{base}/identity"),
        "authorization_endpoint": format!("{base}/identity/authorize"),
        "token_endpoint": format!("{base}/identity/token"),
        "passcode_endpoint": format!("{base}/identity/passcode"),
        "userinfo_endpoint": format!("{base}/identity/userinfo"),
        "jwks_uri": format!("{base}/identity/keys"),
    })
}

pub fn endpoints() -> Arc<IdentityEndpoints> {
    Arc::new(IdentityEndpoints {
        token_endpoint: "https://iam.test/identity/token".to_string(),
        issuer: None,
        authorization_endpoint: None,
        passcode_endpoint: None,
        userinfo_endpoint: None,
        jwks_uri: None,
    })
}

/// Token expiring `seconds_left` from now.
pub fn token_expiring_in(access: &str, refresh: &str, seconds_left: i64) -> Token {
    Token::new(access.to_string(), refresh.to_string(), now_i64() + seconds_left)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshCall {
    pub token_endpoint: String,
    pub refresh_token: String,
    pub account_id: Option<String>,
}

/// Issuer that hands out numbered tokens (`A1`/`R1`, `A2`/`R2`, ...) and records every refresh.
pub struct StubIssuer {
    lifetime_seconds: i64,
    reject: bool,
    delay: Duration,
    issued: AtomicUsize,
    refresh_calls: Mutex<Vec<RefreshCall>>,
}

impl StubIssuer {
    pub fn issuing(lifetime_seconds: i64) -> Self {
        Self {
            lifetime_seconds,
            reject: false,
            delay: Duration::ZERO,
            issued: AtomicUsize::new(0),
            refresh_calls: Mutex::new(Vec::new()),
        }
    }

    pub fn rejecting() -> Self {
        Self { reject: true, ..Self::issuing(3600) }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn refresh_calls(&self) -> Vec<RefreshCall> {
        self.refresh_calls.lock().unwrap().clone()
    }

    pub fn refresh_count(&self) -> usize {
        self.refresh_calls.lock().unwrap().len()
    }

    fn next_token(&self) -> Token {
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        token_expiring_in(&format!("A{n}"), &format!("R{n}"), self.lifetime_seconds)
    }
}

impl TokenIssuer for StubIssuer {
    async fn exchange_api_key(&self, _token_endpoint: &str, _api_key: &str) -> Result<Token, SessionError> {
        if self.reject {
            return Err(SessionError::Authentication("invalid api key".into()));
        }
        Ok(self.next_token())
    }

    async fn exchange_one_time_passcode(&self, _token_endpoint: &str, _passcode: &str) -> Result<Token, SessionError> {
        if self.reject {
            return Err(SessionError::Authentication("invalid passcode".into()));
        }
        Ok(self.next_token())
    }

    async fn refresh(
        &self,
        token_endpoint: &str,
        refresh_token: &str,
        account_id: Option<&str>,
    ) -> Result<Token, SessionError> {
        self.refresh_calls.lock().unwrap().push(RefreshCall {
            token_endpoint: token_endpoint.to_string(),
            refresh_token: refresh_token.to_string(),
            account_id: account_id.map(str::to_string),
        });
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.reject {
            return Err(SessionError::Refresh("refresh token revoked".into()));
        }
        Ok(self.next_token())
    }
}

/// Transport that records each request with the access token it carried.
///
/// Queued responses are returned first; afterwards every call gets an empty list page.
#[derive(Default)]
pub struct RecordingTransport {
    calls: Mutex<Vec<(ApiRequest, String)>>,
    responses: Mutex<VecDeque<Result<Value, SessionError>>>,
}

impl RecordingTransport {
    pub fn responding(responses: Vec<Result<Value, SessionError>>) -> Self {
        Self { calls: Mutex::new(Vec::new()), responses: Mutex::new(responses.into()) }
    }

    pub fn calls(&self) -> Vec<(ApiRequest, String)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn access_tokens(&self) -> Vec<String> {
        self.calls().into_iter().map(|(_, token)| token).collect()
    }
}

impl AuthorizedTransport for RecordingTransport {
    async fn call(&self, request: ApiRequest, access_token: &str) -> Result<Value, SessionError> {
        self.calls.lock().unwrap().push((request, access_token.to_string()));
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(json!({"resources": []})))
    }

    async fn call_public(&self, request: ApiRequest) -> Result<Value, SessionError> {
        self.call(request, "").await
    }
}

pub fn session_with(
    token: Token,
    issuer: &Arc<StubIssuer>,
    transport: &Arc<RecordingTransport>,
) -> Session<StubIssuer, RecordingTransport> {
    Session::new(token, endpoints(), issuer.clone(), transport.clone(), SessionSettings::default())
}
