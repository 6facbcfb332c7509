//! Server config loader (strict parsing).

pub mod schema;

use std::env::VarError;
use std::fs;
use std::io::ErrorKind;

use meterline_core::error::{MeterlineError, Result};

pub use schema::{DemoSection, MetricsSection, ServerConfig, ServerSection};

/// Looked up in the working directory when `METERLINE_CONFIG` is unset.
pub const DEFAULT_PATH: &str = "meterline.yaml";

/// Environment variable naming an explicit config file.
pub const ENV_VAR: &str = "METERLINE_CONFIG";

/// Load from the path in [`ENV_VAR`], or from [`DEFAULT_PATH`] when it is unset.
///
/// Takes the raw `std::env::var` result. A path that is set must exist; a
/// value that is not valid UTF-8 is a config error, never a silent fallback.
pub fn load_from_env(var: std::result::Result<String, VarError>) -> Result<ServerConfig> {
    match var {
        Ok(path) => load_from_file(&path),
        Err(VarError::NotPresent) => load_or_default(DEFAULT_PATH),
        Err(VarError::NotUnicode(raw)) => Err(MeterlineError::Config(format!(
            "{ENV_VAR} is not valid UTF-8: {raw:?}"
        ))),
    }
}

pub fn load_from_file(path: &str) -> Result<ServerConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| MeterlineError::Config(format!("read {path} failed: {e}")))?;
    load_from_str(&s)
}

/// Like [`load_from_file`], but a missing file yields the built-in defaults.
pub fn load_or_default(path: &str) -> Result<ServerConfig> {
    match fs::read_to_string(path) {
        Ok(s) => load_from_str(&s),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::info!(%path, "config file not found, using defaults");
            Ok(ServerConfig::default())
        }
        Err(e) => Err(MeterlineError::Config(format!("read {path} failed: {e}"))),
    }
}

pub fn load_from_str(s: &str) -> Result<ServerConfig> {
    let cfg: ServerConfig = serde_yaml::from_str(s)
        .map_err(|e| MeterlineError::Config(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}
