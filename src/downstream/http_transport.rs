use http::header::ACCEPT;
use reqwest::{Client, Url};
use serde_json::Value;
use tracing::warn;

use crate::config::settings::ServiceUrls;
use crate::downstream::{ApiRequest, AuthorizedTransport, Service, Target};
use crate::errors::SessionError;
use crate::helpers::text::truncate;
use crate::helpers::time::get_instant;
use crate::observability::metrics::get_metrics;
use crate::resilience::deadline::Deadline;

/// Bearer-authenticated JSON calls against the configured service base URLs.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    services: ServiceUrls,
    deadline: Deadline,
}

impl HttpTransport {
    pub fn new(client: Client, services: ServiceUrls, deadline: Deadline) -> Self {
        Self { client, services, deadline }
    }

    fn base_url(&self, service: Service) -> &str {
        match service {
            Service::Accounts => &self.services.accounts,
            Service::Containers => &self.services.containers,
            Service::Tagging => &self.services.tagging,
            Service::Billing => &self.services.billing,
            Service::ResourceController => &self.services.resource_controller,
            Service::Documents => &self.services.documents,
        }
    }

    fn resolve_url(&self, request: &ApiRequest) -> Result<Url, SessionError> {
        let base = self.base_url(request.service);
        let base_url = Url::parse(base)
            .map_err(|e| SessionError::downstream(format!("invalid base URL '{base}': {e}")))?;

        match &request.target {
            Target::Segments(segments) => {
                let mut url = base_url;
                {
                    let mut path = url.path_segments_mut().map_err(|_| {
                        SessionError::downstream(format!("base URL '{base}' cannot carry a path"))
                    })?;
                    path.pop_if_empty().extend(segments);
                }
                Ok(url)
            }
            Target::Cursor(cursor) => {
                let url = base_url
                    .join(cursor)
                    .map_err(|e| SessionError::downstream(format!("invalid page cursor '{cursor}': {e}")))?;
                // the bearer token must not follow a cursor to another host
                if url.origin() != base_url.origin() {
                    return Err(SessionError::downstream(format!(
                        "page cursor '{cursor}' points outside {base}"
                    )));
                }
                Ok(url)
            }
        }
    }

    async fn send(&self, request: ApiRequest, access_token: Option<&str>) -> Result<Value, SessionError> {
        let url = self.resolve_url(&request)?;

        let mut builder = self
            .client
            .request(request.method.clone(), url)
            .header(ACCEPT, "application/json");
        if let Some(access_token) = access_token {
            builder = builder.bearer_auth(access_token);
        }
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        for (key, value) in &request.headers {
            builder = builder.header(key.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| SessionError::downstream(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| SessionError::downstream(format!("cannot read response: {e}")))?;

        if !status.is_success() {
            return Err(SessionError::Downstream {
                status: Some(status.as_u16()),
                message: truncate(&text, 200).to_owned(),
            });
        }
        Ok(parse_body(text))
    }
}

/// Empty bodies become `null`; bodies that are not JSON are handed back as a string.
fn parse_body(text: String) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(&text).unwrap_or(Value::String(text))
}

impl HttpTransport {
    async fn dispatch(&self, request: ApiRequest, access_token: Option<&str>) -> Result<Value, SessionError> {
        let metrics = get_metrics().await;
        let service = request.service.label();
        let method = request.method.clone();
        let start = get_instant();
        metrics
            .downstream_requests
            .with_label_values(&[service, method.as_str()])
            .inc();

        let result = self
            .deadline
            .run(service, self.send(request, access_token), |message| {
                SessionError::downstream(message)
            })
            .await;

        metrics
            .downstream_duration
            .with_label_values(&[service])
            .observe(start.elapsed().as_secs_f64());
        result.inspect_err(|e| {
            let status = match e {
                SessionError::Downstream { status: Some(status), .. } => status.to_string(),
                _ => "error".to_string(),
            };
            metrics
                .downstream_failures
                .with_label_values(&[service, status.as_str()])
                .inc();
            warn!(service, method = %method, error = %e, "downstream call failed");
        })
    }
}

impl AuthorizedTransport for HttpTransport {
    async fn call(&self, request: ApiRequest, access_token: &str) -> Result<Value, SessionError> {
        self.dispatch(request, Some(access_token)).await
    }

    async fn call_public(&self, request: ApiRequest) -> Result<Value, SessionError> {
        self.dispatch(request, None).await
    }
}
