use std::sync::{Arc, OnceLock};

use reqwest::Client;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::errors::SessionError;
use crate::identity::discovery::{fetch_identity_endpoints, IdentityEndpoints};
use crate::resilience::deadline::Deadline;

static SHARED_DIRECTORY: OnceLock<Arc<EndpointDirectory>> = OnceLock::new();

/// Resolves the identity provider endpoints once and keeps them for the
/// lifetime of the directory.
///
/// Concurrent first callers wait on a single discovery request. A failed
/// discovery leaves the directory empty, so the next caller retries from scratch.
/// There is no expiry and no invalidation.
#[derive(Debug)]
pub struct EndpointDirectory {
    discovery_url: String,
    client: Client,
    deadline: Deadline,
    endpoints: OnceCell<Arc<IdentityEndpoints>>,
}

impl EndpointDirectory {
    pub fn new(discovery_url: impl Into<String>, client: Client, deadline: Deadline) -> Self {
        Self {
            discovery_url: discovery_url.into(),
            client,
            deadline,
            endpoints: OnceCell::new(),
        }
    }

    /// Process-wide directory. The first caller decides the discovery URL.
    pub fn shared(discovery_url: &str, client: &Client, deadline: Deadline) -> Arc<EndpointDirectory> {
        let directory = SHARED_DIRECTORY
            .get_or_init(|| Arc::new(EndpointDirectory::new(discovery_url, client.clone(), deadline)))
            .clone();
        if directory.discovery_url != discovery_url {
            warn!(
                requested = %discovery_url,
                active = %directory.discovery_url,
                "shared endpoint directory already bound to another discovery URL"
            );
        }
        directory
    }

    pub fn discovery_url(&self) -> &str {
        &self.discovery_url
    }

    pub async fn resolve(&self) -> Result<Arc<IdentityEndpoints>, SessionError> {
        self.endpoints
            .get_or_try_init(|| async {
                debug!(url = %self.discovery_url, "resolving identity endpoints");
                fetch_identity_endpoints(&self.client, &self.discovery_url, self.deadline)
                    .await
                    .map(Arc::new)
            })
            .await
            .cloned()
    }

    /// Endpoints if a discovery has already succeeded.
    pub fn cached(&self) -> Option<Arc<IdentityEndpoints>> {
        self.endpoints.get().cloned()
    }
}
