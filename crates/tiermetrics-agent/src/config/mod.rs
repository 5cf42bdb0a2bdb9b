//! Metrics config loader (strict parsing).
//!
//! Unknown keys are rejected; level tokens are not, they fall back instead.
//! After parsing, `TIERMETRICS_ENABLED` and `TIERMETRICS_ROOT_LEVEL` from the
//! environment override the document.

pub mod schema;

use std::fs;

use tiermetrics_core::error::{MetricsError, Result};
use tiermetrics_core::Level;

pub use schema::{
    CleanupConfig, ConsoleConfig, CsvConfig, FilterConfig, HistoryConfig, IntrospectionConfig,
    LevelsSection, LogConfig, MetricsConfig, ReportingSection, ReservoirSection, MAX_PERIOD_SECS,
};

pub const ENV_ENABLED: &str = "TIERMETRICS_ENABLED";
pub const ENV_ROOT_LEVEL: &str = "TIERMETRICS_ROOT_LEVEL";

pub fn load_from_file(path: &str) -> Result<MetricsConfig> {
    let s = fs::read_to_string(path)
        .map_err(|e| MetricsError::Config(format!("read config failed ({path}): {e}")))?;
    let mut cfg = load_from_str(&s)?;
    apply_env_overrides(&mut cfg, |key| std::env::var(key).ok());
    Ok(cfg)
}

pub fn load_from_str(s: &str) -> Result<MetricsConfig> {
    let cfg: MetricsConfig =
        serde_yaml::from_str(s).map_err(|e| MetricsError::Config(format!("invalid yaml: {e}")))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Apply overrides looked up through `lookup`. Unparseable values are logged and ignored.
pub fn apply_env_overrides(cfg: &mut MetricsConfig, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = lookup(ENV_ENABLED) {
        match v.trim().to_ascii_lowercase().as_str() {
            "true" => cfg.enabled = true,
            "false" => cfg.enabled = false,
            _ => tracing::warn!(key = ENV_ENABLED, value = %v, "ignoring non-boolean override"),
        }
    }
    if let Some(v) = lookup(ENV_ROOT_LEVEL) {
        let level = Level::parse_or(&v, cfg.levels.root());
        cfg.levels.root_level = level.as_str().to_owned();
    }
}
