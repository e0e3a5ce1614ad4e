//! Error taxonomy for the session layer.
//!
//! Callers match on [`SessionError`] to tell "log in again" apart from
//! "the requested operation failed".

use thiserror::Error;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    /// Identity provider metadata unreachable or malformed. Never cached.
    #[error("identity discovery failed: {0}")]
    Discovery(String),

    /// API key or passcode exchange rejected, or the exchange itself failed.
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// Refresh token rejected (expired, revoked) or the grant call failed.
    /// Terminal for the session.
    #[error("token refresh failed: {0}")]
    Refresh(String),

    /// The resource API call failed after a valid token was in hand.
    #[error("downstream call failed{}: {message}", status.map(|s| format!(" with status {s}")).unwrap_or_default())]
    Downstream {
        status: Option<u16>,
        message: String,
    },

    /// A list endpoint kept returning page cursors past the configured ceiling.
    #[error("pagination stopped after {max_pages} pages")]
    PageLimitExceeded { max_pages: usize },
}

impl SessionError {
    pub fn downstream(message: impl Into<String>) -> Self {
        SessionError::Downstream { status: None, message: message.into() }
    }

    /// True when the only way forward is a fresh login.
    pub fn requires_reauthentication(&self) -> bool {
        matches!(self, SessionError::Authentication(_) | SessionError::Refresh(_))
    }
}

#[cfg(test)]
mod test {
    use super::SessionError;

    #[test]
    fn reauthentication_is_required_only_for_credential_failures() {
        assert!(SessionError::Authentication("bad key".into()).requires_reauthentication());
        assert!(SessionError::Refresh("revoked".into()).requires_reauthentication());
        assert!(!SessionError::Discovery("down".into()).requires_reauthentication());
        assert!(!SessionError::downstream("boom").requires_reauthentication());
        assert!(!SessionError::PageLimitExceeded { max_pages: 3 }.requires_reauthentication());
    }

    #[test]
    fn downstream_message_carries_status_when_known() {
        let err = SessionError::Downstream { status: Some(404), message: "no such cluster".into() };
        assert_eq!(err.to_string(), "downstream call failed with status 404: no such cluster");
        assert_eq!(SessionError::downstream("io").to_string(), "downstream call failed: io");
    }
}
