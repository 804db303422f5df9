use crate::{config::Config, metrics, server::access::AccessPolicy, upstream::Upstream};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Instant;

/// Application state shared across all handlers. Read-only after startup.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<Config>,
    /// Shared upstream client for connection pooling
    pub upstream: Upstream,
    /// Origin allow/deny policy
    pub access: Arc<AccessPolicy>,
    /// Prometheus exposition handle
    pub metrics: PrometheusHandle,
    pub started_at: Instant,
}

impl AppState {
    /// Create a new AppState with the given configuration
    pub fn new(config: Config) -> Self {
        let upstream = Upstream::new(&config);
        let access = Arc::new(AccessPolicy::from_config(&config));

        Self {
            config: Arc::new(config),
            upstream,
            access,
            metrics: metrics::init(),
            started_at: Instant::now(),
        }
    }
}
