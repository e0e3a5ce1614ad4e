use http::header::ACCEPT;
use reqwest::Client;
use serde::Deserialize;
use tracing::{error, info};

use crate::errors::SessionError;
use crate::observability::metrics::get_metrics;
use crate::resilience::deadline::Deadline;

/// Provider URLs published in the OpenID configuration document.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IdentityEndpoints {
    pub token_endpoint: String,
    pub issuer: Option<String>,
    pub authorization_endpoint: Option<String>,
    pub passcode_endpoint: Option<String>,
    pub userinfo_endpoint: Option<String>,
    pub jwks_uri: Option<String>,
}

/// GET the well-known discovery document and extract the provider endpoints.
pub async fn fetch_identity_endpoints(
    client: &Client,
    discovery_url: &str,
    deadline: Deadline,
) -> Result<IdentityEndpoints, SessionError> {
    let metrics = get_metrics().await;
    metrics.discovery_requests.inc();

    deadline
        .run(
            "identity discovery",
            request_identity_endpoints(client, discovery_url),
            SessionError::Discovery,
        )
        .await
        .inspect(|endpoints| {
            info!(token_endpoint = %endpoints.token_endpoint, "identity endpoints resolved");
        })
        .inspect_err(|e| {
            metrics.discovery_failures.inc();
            error!(url = %discovery_url, error = %e, "identity discovery failed");
        })
}

async fn request_identity_endpoints(
    client: &Client,
    discovery_url: &str,
) -> Result<IdentityEndpoints, SessionError> {
    let response = client
        .get(discovery_url)
        .header(ACCEPT, "application/json")
        .send()
        .await
        .map_err(|e| SessionError::Discovery(e.to_string()))?;

    if !response.status().is_success() {
        return Err(SessionError::Discovery(format!(
            "discovery request failed: {}",
            response.status()
        )));
    }

    let endpoints: IdentityEndpoints = response
        .json()
        .await
        .map_err(|e| SessionError::Discovery(format!("malformed discovery document: {e}")))?;

    if endpoints.token_endpoint.trim().is_empty() {
        return Err(SessionError::Discovery(
            "discovery document has an empty token_endpoint".to_string(),
        ));
    }
    Ok(endpoints)
}

#[cfg(test)]
mod test {
    use httpmock::Method::GET;
    use httpmock::MockServer;
    use serde_json::json;

    use super::fetch_identity_endpoints;
    use crate::errors::SessionError;
    use crate::resilience::deadline::Deadline;
    use crate::tests::common::{build_reqwest_client, discovery_document};

    const WELL_KNOWN: &str = "/identity/.well-known/openid-configuration";

    async fn discover(server: &MockServer) -> Result<super::IdentityEndpoints, SessionError> {
        fetch_identity_endpoints(&build_reqwest_client(), &server.url(WELL_KNOWN), Deadline::from_millis(2000)).await
    }

    #[tokio::test]
    async fn reads_provider_endpoints() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path(WELL_KNOWN);
                then.status(200).json_body(discovery_document(&server.base_url()));
            })
            .await;

        let endpoints = discover(&server).await.unwrap();
        assert_eq!(endpoints.token_endpoint, server.url("/identity/token"));
        assert_eq!(endpoints.passcode_endpoint, Some(server.url("/identity/passcode")));
    }

    #[tokio::test]
    async fn only_token_endpoint_is_required() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path(WELL_KNOWN);
                then.status(200).json_body(json!({"token_endpoint": "https://iam.test/identity/token"}));
            })
            .await;

        let endpoints = discover(&server).await.unwrap();
        assert_eq!(endpoints.issuer, None);
        assert_eq!(endpoints.jwks_uri, None);
    }

    #[tokio::test]
    async fn unusable_documents_are_discovery_errors() {
        let server = MockServer::start_async().await;
        let mut mock = server
            .mock_async(|when, then| {
                when.method(GET).path(WELL_KNOWN);
                then.status(503);
            })
            .await;
        assert!(matches!(discover(&server).await, Err(SessionError::Discovery(_))));
        mock.delete_async().await;

        mock = server
            .mock_async(|when, then| {
                when.method(GET).path(WELL_KNOWN);
                then.status(200).json_body(json!({"issuer": "https://iam.test"}));
            })
            .await;
        assert!(matches!(discover(&server).await, Err(SessionError::Discovery(_))));
        mock.delete_async().await;

        server
            .mock_async(|when, then| {
                when.method(GET).path(WELL_KNOWN);
                then.status(200).json_body(json!({"token_endpoint": "  "}));
            })
            .await;
        let err = discover(&server).await.unwrap_err();
        assert!(err.to_string().contains("empty token_endpoint"), "{err}");
    }
}
