//! # IAM Session Library
//!
//! Authenticated sessions against an OpenID-style identity provider, and the
//! resource APIs reached with them.
//!
//! Modules:
//! - `config` — YAML configuration, loading and validation
//! - `cache` — token value type and the identity endpoint cache
//! - `identity` — endpoint discovery and token grants
//! - `session` — authenticator, guarded calls, pagination
//! - `downstream` — request shapes and the bearer-token HTTP transport
//! - `observability` — Prometheus metrics

pub mod cache;
pub mod config;
pub mod downstream;
pub mod errors;
pub mod helpers;
pub mod identity;
pub mod observability;
pub mod resilience;
pub mod session;
pub mod utils;

#[cfg(test)]
mod tests;

pub use crate::cache::token::Token;
pub use crate::errors::SessionError;
pub use crate::session::{Authenticator, PagedResult, Session, SessionSettings};
