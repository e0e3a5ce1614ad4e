use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use reqwest::Client;
use serde_json::Value;
use tracing::info;

use crate::cache::endpoint_directory::EndpointDirectory;
use crate::cache::token::Token;
use crate::config::settings::SessionConfig;
use crate::downstream::http_transport::HttpTransport;
use crate::downstream::{requests, AuthorizedTransport};
use crate::errors::SessionError;
use crate::identity::discovery::IdentityEndpoints;
use crate::identity::issuer::{IamTokenIssuer, TokenIssuer};
use crate::resilience::deadline::Deadline;
use crate::session::session::{Session, SessionSettings};

/// Entry point for logging in: resolves the identity endpoints once and hands out sessions.
pub struct Authenticator<I, T> {
    directory: Arc<EndpointDirectory>,
    issuer: Arc<I>,
    transport: Arc<T>,
    settings: SessionSettings,
}

impl Authenticator<IamTokenIssuer, HttpTransport> {
    /// HTTP-backed authenticator sharing the process-wide endpoint cache.
    pub fn from_config(config: &SessionConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(config.http.timeout_ms))
            .connect_timeout(Duration::from_millis(config.http.connect_timeout_ms))
            .build()
            .context("failed to build HTTP client")?;
        let deadline = Deadline::from_millis(config.http.timeout_ms);

        let directory = EndpointDirectory::shared(&config.identity.discovery_url, &client, deadline);
        let issuer = IamTokenIssuer::new(
            client.clone(),
            config.identity.client_id.clone(),
            config.identity.client_secret.clone(),
            deadline,
        );
        let transport = HttpTransport::new(client, config.services.clone(), deadline);

        Ok(Self::new(directory, Arc::new(issuer), Arc::new(transport), SessionSettings::from(config)))
    }
}

impl<I, T> Authenticator<I, T>
where
    I: TokenIssuer,
    T: AuthorizedTransport,
{
    pub fn new(directory: Arc<EndpointDirectory>, issuer: Arc<I>, transport: Arc<T>, settings: SessionSettings) -> Self {
        Self { directory, issuer, transport, settings }
    }

    pub async fn identity_endpoints(&self) -> Result<Arc<IdentityEndpoints>, SessionError> {
        self.directory.resolve().await
    }

    pub async fn authenticate_api_key(&self, api_key: &str) -> Result<Session<I, T>, SessionError> {
        let endpoints = self.directory.resolve().await?;
        let token = self.issuer.exchange_api_key(&endpoints.token_endpoint, api_key).await?;
        info!(expiration = token.expiration, "authenticated with api key");
        Ok(self.session(token, endpoints))
    }

    pub async fn authenticate_passcode(&self, passcode: &str) -> Result<Session<I, T>, SessionError> {
        let endpoints = self.directory.resolve().await?;
        let token = self
            .issuer
            .exchange_one_time_passcode(&endpoints.token_endpoint, passcode)
            .await?;
        info!(expiration = token.expiration, "authenticated with passcode");
        Ok(self.session(token, endpoints))
    }

    /// Rebuild a session from a token persisted earlier. Nothing is sent to the token endpoint.
    pub async fn resume(&self, token: Token) -> Result<Session<I, T>, SessionError> {
        let endpoints = self.directory.resolve().await?;
        Ok(self.session(token, endpoints))
    }

    // ---------- public catalog, no token involved ----------

    pub async fn get_zones(&self, show_flavors: bool, location: &str) -> Result<Value, SessionError> {
        self.transport.call_public(requests::get_zones(show_flavors, location)).await
    }

    pub async fn get_versions(&self) -> Result<Value, SessionError> {
        self.transport.call_public(requests::get_versions()).await
    }

    pub async fn get_locations(&self) -> Result<Value, SessionError> {
        self.transport.call_public(requests::get_locations()).await
    }

    pub async fn get_geo_locations(&self, geo: &str) -> Result<Value, SessionError> {
        self.transport.call_public(requests::get_geo_locations(geo)).await
    }

    pub async fn get_machine_type(
        &self,
        datacenter: &str,
        server_type: &str,
        os: &str,
        cpu_limit: u32,
        memory_limit: u32,
    ) -> Result<Value, SessionError> {
        self.transport
            .call_public(requests::get_machine_types(datacenter, server_type, os, cpu_limit, memory_limit))
            .await
    }

    fn session(&self, token: Token, endpoints: Arc<IdentityEndpoints>) -> Session<I, T> {
        Session::new(token, endpoints, self.issuer.clone(), self.transport.clone(), self.settings)
    }
}
