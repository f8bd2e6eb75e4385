//! Shared application state for the tally server.
//!
//! The registry is built by the caller (or by `new`) and injected here; handlers
//! reach it only through this state.

use std::sync::Arc;

use bytes::Bytes;
use tally_core::error::Result;
use tally_core::{render, Registry};

use crate::config::ServerConfig;
use crate::instruments::ServerMetrics;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
    registry: Arc<Registry>,
}

struct AppStateInner {
    cfg: ServerConfig,
    metrics: ServerMetrics,
}

impl AppState {
    /// Build state around a fresh registry.
    pub fn new(cfg: ServerConfig) -> Result<Self> {
        Self::with_registry(cfg, Arc::new(Registry::new()))
    }

    /// Build state around an existing registry, declaring the server's
    /// instruments on it. Fails if those names are already taken.
    pub fn with_registry(cfg: ServerConfig, registry: Arc<Registry>) -> Result<Self> {
        let metrics = ServerMetrics::declare(&registry)?;
        tracing::info!(metrics = registry.len(), "registry ready");
        Ok(Self {
            inner: Arc::new(AppStateInner { cfg, metrics }),
            registry,
        })
    }

    pub fn cfg(&self) -> &ServerConfig {
        &self.inner.cfg
    }

    pub fn registry(&self) -> Arc<Registry> {
        Arc::clone(&self.registry)
    }

    pub fn metrics(&self) -> &ServerMetrics {
        &self.inner.metrics
    }

    /// Count one inbound request.
    pub fn record_request(&self, method: &str, path: &str) -> Result<()> {
        self.registry
            .inc(&self.inner.metrics.http_requests, &[method, path])
    }

    pub fn set_custom_gauge(&self, value: f64) -> Result<()> {
        self.registry.set(&self.inner.metrics.custom_gauge, &[], value)
    }

    /// Exposition body for the scrape endpoint.
    pub fn render_metrics(&self) -> Bytes {
        render(&self.registry.snapshot())
    }
}
