use std::sync::Arc;

use anyhow::Result;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};
use tokio::sync::OnceCell;
use tracing::info;

// Declare the static OnceCell to hold the Metrics.
static METRICS_INSTANCE: OnceCell<Arc<Metrics>> = OnceCell::const_new();

/// Lazily creates the process-wide metrics registry.
pub async fn get_metrics() -> &'static Arc<Metrics> {
    METRICS_INSTANCE
        .get_or_init(|| async {
            info!("Initializing Metrics ...");
            Metrics::new()
        })
        .await
}

#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,

    // Discovery metrics
    pub discovery_requests: IntCounter,
    pub discovery_failures: IntCounter,

    // Token endpoint metrics
    pub token_requests: IntCounterVec,
    pub token_failures: IntCounterVec,
    pub token_duration: HistogramVec,
    pub guarded_refreshes: IntCounter,

    // Resource API metrics
    pub downstream_requests: IntCounterVec,
    pub downstream_failures: IntCounterVec,
    pub downstream_duration: HistogramVec,
    pub pages_fetched: IntCounter,

    // Config
    pub config_validation_errors: IntCounter,
}

impl Metrics {
    fn new() -> Arc<Self> {
        let registry = Registry::new_custom(Some("iamsession".into()), None).unwrap();

        let metrics: Arc<Metrics> = Arc::new(Self {
            // Discovery
            discovery_requests: IntCounter::new("discovery_requests_total", "Identity endpoint discovery attempts").unwrap(),
            discovery_failures: IntCounter::new("discovery_failures_total", "Identity endpoint discovery failures").unwrap(),

            // Token endpoint
            token_requests: IntCounterVec::new(Opts::new("token_requests_total", "Token endpoint calls by grant"), &["grant"]).unwrap(),
            token_failures: IntCounterVec::new(Opts::new("token_failures_total", "Token endpoint failures by grant"), &["grant"]).unwrap(),
            token_duration: HistogramVec::new(HistogramOpts::new("token_request_duration_seconds", "Token endpoint call duration seconds").buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]), &["grant"]).unwrap(),
            guarded_refreshes: IntCounter::new("guarded_refreshes_total", "Refreshes triggered by an expiring token before a protected call").unwrap(),

            // Resource APIs
            downstream_requests: IntCounterVec::new(Opts::new("downstream_requests_total", "Resource API calls"), &["service", "method"]).unwrap(),
            downstream_failures: IntCounterVec::new(Opts::new("downstream_failures_total", "Resource API failures"), &["service", "status"]).unwrap(),
            downstream_duration: HistogramVec::new(HistogramOpts::new("downstream_duration_seconds", "Resource API call duration seconds").buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]), &["service"]).unwrap(),
            pages_fetched: IntCounter::new("pages_fetched_total", "List pages fetched while aggregating").unwrap(),

            config_validation_errors: IntCounter::new("config_validation_errors_total", "Rejected configurations").unwrap(),

            registry,
        });

        // Register all metrics in the registry
        let reg = &metrics.registry;
        reg.register(Box::new(metrics.discovery_requests.clone())).unwrap();
        reg.register(Box::new(metrics.discovery_failures.clone())).unwrap();
        reg.register(Box::new(metrics.token_requests.clone())).unwrap();
        reg.register(Box::new(metrics.token_failures.clone())).unwrap();
        reg.register(Box::new(metrics.token_duration.clone())).unwrap();
        reg.register(Box::new(metrics.guarded_refreshes.clone())).unwrap();
        reg.register(Box::new(metrics.downstream_requests.clone())).unwrap();
        reg.register(Box::new(metrics.downstream_failures.clone())).unwrap();
        reg.register(Box::new(metrics.downstream_duration.clone())).unwrap();
        reg.register(Box::new(metrics.pages_fetched.clone())).unwrap();
        reg.register(Box::new(metrics.config_validation_errors.clone())).unwrap();

        metrics
    }

    /// Prometheus text exposition of everything recorded so far.
    pub fn render(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
