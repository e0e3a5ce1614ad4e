//! Resource APIs reached with the session's bearer token.
//!
//! The session layer does not interpret payloads: requests carry opaque JSON
//! bodies and responses come back as [`serde_json::Value`]. The only shape it
//! relies on is the list page envelope used for pagination.

use std::future::Future;

use http::Method;
use serde_json::Value;

use crate::errors::SessionError;

pub mod http_transport;
pub mod requests;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Service {
    Accounts,
    Containers,
    Tagging,
    Billing,
    ResourceController,
    Documents,
}

impl Service {
    pub fn label(&self) -> &'static str {
        match self {
            Service::Accounts => "accounts",
            Service::Containers => "containers",
            Service::Tagging => "tagging",
            Service::Billing => "billing",
            Service::ResourceController => "resource_controller",
            Service::Documents => "documents",
        }
    }
}

/// Where on the service the request goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Path segments appended to the service base URL, each percent-encoded.
    Segments(Vec<String>),
    /// Continuation URL handed out by a previous page, used verbatim.
    Cursor(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub service: Service,
    pub method: Method,
    pub target: Target,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl ApiRequest {
    pub fn new<S: AsRef<str>>(service: Service, method: Method, segments: &[S]) -> Self {
        Self {
            service,
            method,
            target: Target::Segments(segments.iter().map(|s| s.as_ref().to_owned()).collect()),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get<S: AsRef<str>>(service: Service, segments: &[S]) -> Self {
        Self::new(service, Method::GET, segments)
    }

    pub fn post<S: AsRef<str>>(service: Service, segments: &[S]) -> Self {
        Self::new(service, Method::POST, segments)
    }

    pub fn put<S: AsRef<str>>(service: Service, segments: &[S]) -> Self {
        Self::new(service, Method::PUT, segments)
    }

    pub fn delete<S: AsRef<str>>(service: Service, segments: &[S]) -> Self {
        Self::new(service, Method::DELETE, segments)
    }

    pub fn cursor(service: Service, cursor: String) -> Self {
        Self {
            service,
            method: Method::GET,
            target: Target::Cursor(cursor),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn query(mut self, key: &str, value: impl Into<String>) -> Self {
        self.query.push((key.to_owned(), value.into()));
        self
    }

    pub fn header(mut self, key: &str, value: impl Into<String>) -> Self {
        self.headers.push((key.to_owned(), value.into()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// The "authenticated HTTP call" capability the session delegates to.
///
/// Implementations send `request` with `access_token` as bearer credential and
/// report any failure as [`SessionError::Downstream`].
pub trait AuthorizedTransport: Send + Sync {
    fn call(
        &self,
        request: ApiRequest,
        access_token: &str,
    ) -> impl Future<Output = Result<Value, SessionError>> + Send;

    /// Same as [`AuthorizedTransport::call`] but with no credential attached,
    /// for public catalog endpoints.
    fn call_public(&self, request: ApiRequest) -> impl Future<Output = Result<Value, SessionError>> + Send;
}
