//! Instruments the HTTP layer declares on its registry at startup.

use tally_core::{MetricHandle, MetricKind, Registry, Result};

pub const HTTP_REQUESTS_TOTAL: &str = "http_requests_total";
pub const CUSTOM_GAUGE: &str = "custom_gauge";

/// Handles for the server's own metrics, resolved once at startup.
#[derive(Debug, Clone)]
pub struct ServerMetrics {
    /// Requests by method and matched route.
    pub http_requests: MetricHandle,
    /// Set through `POST /admin/gauge`.
    pub custom_gauge: MetricHandle,
}

impl ServerMetrics {
    pub fn declare(registry: &Registry) -> Result<Self> {
        let http_requests = registry.declare(
            HTTP_REQUESTS_TOTAL,
            "Total HTTP Requests (count)",
            MetricKind::Counter,
            &["method", "path"],
        )?;
        let custom_gauge = registry.declare(
            CUSTOM_GAUGE,
            "An example gauge metric",
            MetricKind::Gauge,
            &[],
        )?;
        Ok(Self {
            http_requests,
            custom_gauge,
        })
    }
}
