use std::net::SocketAddr;
use std::time::Duration;

use meterline_core::error::{MeterlineError, Result};
use meterline_core::registry::DEFAULT_BUCKETS;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    pub version: u32,

    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub demo: DemoSection,

    #[serde(default)]
    pub metrics: MetricsSection,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            version: 1,
            server: ServerSection::default(),
            demo: DemoSection::default(),
            metrics: MetricsSection::default(),
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(MeterlineError::Config(format!(
                "unsupported config version {}",
                self.version
            )));
        }

        self.server.validate()?;
        self.demo.validate()?;
        self.metrics.validate()?;

        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    #[serde(default = "default_listen")]
    pub listen: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            listen: default_listen(),
        }
    }
}

impl ServerSection {
    pub fn listen_addr(&self) -> Result<SocketAddr> {
        self.listen.parse().map_err(|e| {
            MeterlineError::Config(format!(
                "server.listen {:?} is not a socket address: {e}",
                self.listen
            ))
        })
    }

    pub fn validate(&self) -> Result<()> {
        self.listen_addr().map(|_| ())
    }
}

/// Simulated work for the demo endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DemoSection {
    #[serde(default = "default_min_delay_ms")]
    pub min_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    /// Probability in `[0, 1]` that `/error` answers 500.
    #[serde(default = "default_error_rate")]
    pub error_rate: f64,
}

impl Default for DemoSection {
    fn default() -> Self {
        Self {
            min_delay_ms: default_min_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            error_rate: default_error_rate(),
        }
    }
}

impl DemoSection {
    pub fn validate(&self) -> Result<()> {
        if self.min_delay_ms > self.max_delay_ms {
            return Err(MeterlineError::Config(
                "demo.min_delay_ms must not exceed demo.max_delay_ms".into(),
            ));
        }
        if self.max_delay_ms > 60_000 {
            return Err(MeterlineError::Config(
                "demo.max_delay_ms must be at most 60000".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.error_rate) {
            return Err(MeterlineError::Config(
                "demo.error_rate must be between 0 and 1".into(),
            ));
        }
        Ok(())
    }

    pub fn delay_range(&self) -> (Duration, Duration) {
        (
            Duration::from_millis(self.min_delay_ms),
            Duration::from_millis(self.max_delay_ms),
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsSection {
    /// Bucket bounds in seconds for `http_request_duration_seconds`.
    #[serde(default = "default_latency_buckets")]
    pub latency_buckets: Vec<f64>,
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self {
            latency_buckets: default_latency_buckets(),
        }
    }
}

impl MetricsSection {
    pub fn validate(&self) -> Result<()> {
        // Ordering and finiteness are checked again when the histogram registers.
        if self.latency_buckets.is_empty() {
            return Err(MeterlineError::Config(
                "metrics.latency_buckets must not be empty".into(),
            ));
        }
        Ok(())
    }
}

fn default_listen() -> String {
    "0.0.0.0:8000".into()
}
fn default_min_delay_ms() -> u64 {
    100
}
fn default_max_delay_ms() -> u64 {
    600
}
fn default_error_rate() -> f64 {
    0.5
}
fn default_latency_buckets() -> Vec<f64> {
    DEFAULT_BUCKETS.to_vec()
}
