use std::future::Future;

use tokio::time::{timeout, Duration};
use tracing::warn;

use crate::errors::SessionError;

/// Upper bound on a single network round-trip.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    pub timeout: Duration,
}

impl Deadline {
    pub fn from_millis(timeout_ms: u64) -> Self {
        Self { timeout: Duration::from_millis(timeout_ms) }
    }

    /// Runs `operation`, turning an elapsed deadline into the error `on_elapsed` builds.
    ///
    /// The error keeps the category of the interrupted call, so a token grant that
    /// times out is still an authentication or refresh failure.
    pub async fn run<Fut, T>(
        &self,
        call: &str,
        operation: Fut,
        on_elapsed: impl FnOnce(String) -> SessionError,
    ) -> Result<T, SessionError>
    where
        Fut: Future<Output = Result<T, SessionError>>,
    {
        match timeout(self.timeout, operation).await {
            Ok(result) => result,
            Err(_) => {
                warn!("{call} exceeded deadline of {} ms", self.timeout.as_millis());
                Err(on_elapsed(format!(
                    "{call} timed out after {} ms",
                    self.timeout.as_millis()
                )))
            }
        }
    }
}
