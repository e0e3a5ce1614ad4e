use std::fmt;

use serde::{Deserialize, Serialize};

use crate::utils::constants::BUFFER_SECONDS;

/// Bearer/refresh pair issued by the token endpoint.
///
/// Never updated in place: a refresh produces a new `Token` that replaces the old one.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub refresh_token: String,
    pub expiration: i64, // UNIX TIMESTAMP
}

impl Token {
    pub fn new(access_token: String, refresh_token: String, expiration: i64) -> Self {
        Self { access_token, refresh_token, expiration }
    }

    /// True while more than `buffer_seconds` remain before expiry.
    pub fn is_valid_at(&self, now: i64, buffer_seconds: i64) -> bool {
        self.expiration.saturating_sub(now) > buffer_seconds
    }
}

/// Validity with the standard 100 second buffer.
pub fn is_valid(token: &Token, now: i64) -> bool {
    token.is_valid_at(now, BUFFER_SECONDS)
}

// credentials stay out of logs
impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .field("expiration", &self.expiration)
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::{is_valid, Token};

    fn token_expiring_at(expiration: i64) -> Token {
        Token::new("A1".into(), "R1".into(), expiration)
    }

    #[test]
    fn validity_boundary_is_exclusive_of_the_buffer() {
        let now = 1_700_000_000;
        assert!(!is_valid(&token_expiring_at(now + 100), now));
        assert!(is_valid(&token_expiring_at(now + 101), now));
        assert!(!is_valid(&token_expiring_at(now + 99), now));
        assert!(!is_valid(&token_expiring_at(now - 5), now));
        assert!(is_valid(&token_expiring_at(now + 3600), now));
    }

    #[test]
    fn custom_buffer_shifts_the_boundary() {
        let token = token_expiring_at(1_000);
        assert!(token.is_valid_at(989, 10));
        assert!(!token.is_valid_at(990, 10));
        assert!(token.is_valid_at(999, 0));
        assert!(!token.is_valid_at(1_000, 0));
    }

    #[test]
    fn debug_output_hides_credentials() {
        let rendered = format!("{:?}", Token::new("secret-access".into(), "secret-refresh".into(), 42));
        assert!(!rendered.contains("secret"));
        assert!(rendered.contains("expiration: 42"));
    }

    #[test]
    fn extreme_expirations_do_not_overflow() {
        let now = 1_700_000_000;
        assert!(!is_valid(&token_expiring_at(i64::MIN), now));
        assert!(is_valid(&token_expiring_at(i64::MAX), now));
        assert!(!token_expiring_at(0).is_valid_at(i64::MAX, 100));
        assert!(token_expiring_at(i64::MAX).is_valid_at(i64::MIN, 100));
    }
}
