//! Shared application state for the meterline server.
//!
//! Owns the metric registry (created once, shared through `Arc`) and the
//! handles of the HTTP families registered on it. Startup errors are returned,
//! not panicked.

use std::sync::Arc;

use meterline_core::error::Result;
use meterline_core::exposition;
use meterline_core::Registry;

use crate::config::ServerConfig;
use crate::obs::HttpMetrics;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    cfg: ServerConfig,
    registry: Arc<Registry>,
    http: HttpMetrics,
}

impl AppState {
    /// Build state around a fresh registry.
    pub fn new(cfg: ServerConfig) -> Result<Self> {
        Self::with_registry(cfg, Arc::new(Registry::new()))
    }

    /// Build state around an existing registry, e.g. one that already carries
    /// application-specific families.
    pub fn with_registry(cfg: ServerConfig, registry: Arc<Registry>) -> Result<Self> {
        let http = HttpMetrics::register(&registry, &cfg.metrics.latency_buckets)?;
        tracing::info!(families = registry.len(), "metrics registered");

        Ok(Self {
            inner: Arc::new(AppStateInner { cfg, registry, http }),
        })
    }

    pub fn cfg(&self) -> &ServerConfig {
        &self.inner.cfg
    }

    pub fn registry(&self) -> Arc<Registry> {
        Arc::clone(&self.inner.registry)
    }

    pub fn http_metrics(&self) -> &HttpMetrics {
        &self.inner.http
    }

    /// Scrape body for the current registry state.
    pub fn render_metrics(&self) -> String {
        exposition::render(&self.inner.registry.snapshot())
    }
}
