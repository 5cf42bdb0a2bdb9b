use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;
use tiermetrics_core::error::{MetricsError, Result};
use tiermetrics_core::reservoir::{ReservoirKind, ReservoirSettings};
use tiermetrics_core::Level;

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    pub version: u32,

    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub levels: LevelsSection,

    #[serde(default)]
    pub reservoir: ReservoirSection,

    #[serde(default)]
    pub reporting: ReportingSection,
}

impl MetricsConfig {
    pub fn validate(&self) -> Result<()> {
        if self.version != 1 {
            return Err(MetricsError::Config(format!(
                "unsupported config version {}",
                self.version
            )));
        }
        self.levels.validate()?;
        self.reservoir.validate()?;
        self.reporting.validate()?;
        Ok(())
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            version: 1,
            enabled: true,
            levels: LevelsSection::default(),
            reservoir: ReservoirSection::default(),
            reporting: ReportingSection::default(),
        }
    }
}

/// Level tokens stay strings here so a typo degrades instead of failing the load.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LevelsSection {
    #[serde(default = "default_root_level")]
    pub root_level: String,

    /// Name prefix to level.
    #[serde(default)]
    pub metrics: BTreeMap<String, String>,
}

impl Default for LevelsSection {
    fn default() -> Self {
        Self {
            root_level: default_root_level(),
            metrics: BTreeMap::new(),
        }
    }
}

impl LevelsSection {
    /// The root is set through `root_level`, never through an empty prefix.
    pub fn validate(&self) -> Result<()> {
        if let Some(prefix) = self.metrics.keys().find(|p| p.trim().is_empty()) {
            return Err(MetricsError::Config(format!(
                "levels.metrics: blank prefix {prefix:?}; use levels.root_level"
            )));
        }
        Ok(())
    }

    pub fn root(&self) -> Level {
        Level::parse_or(&self.root_level, Level::Info)
    }

    pub fn entries(&self) -> Vec<(String, Level)> {
        self.metrics
            .iter()
            .map(|(prefix, token)| (prefix.clone(), Level::parse_or(token, Level::Off)))
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReservoirSection {
    #[serde(default)]
    pub kind: ReservoirKind,

    #[serde(default = "default_significant_digits")]
    pub significant_digits: u8,

    #[serde(default = "default_reservoir_size")]
    pub size: usize,
}

impl Default for ReservoirSection {
    fn default() -> Self {
        Self {
            kind: ReservoirKind::default(),
            significant_digits: default_significant_digits(),
            size: default_reservoir_size(),
        }
    }
}

impl ReservoirSection {
    pub fn validate(&self) -> Result<()> {
        if self.significant_digits > 5 {
            return Err(MetricsError::Config(
                "reservoir.significant_digits must be between 0 and 5".into(),
            ));
        }
        if self.size == 0 {
            return Err(MetricsError::Config("reservoir.size must be positive".into()));
        }
        Ok(())
    }

    pub fn settings(&self) -> ReservoirSettings {
        ReservoirSettings {
            kind: self.kind,
            significant_digits: self.significant_digits,
            size: self.size,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ReportingSection {
    #[serde(default)]
    pub console: ConsoleConfig,
    #[serde(default)]
    pub log: LogConfig,
    #[serde(default)]
    pub csv: CsvConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub introspection: IntrospectionConfig,
}

impl ReportingSection {
    pub fn validate(&self) -> Result<()> {
        check_period("reporting.console", self.console.polling_period_secs)?;
        check_period("reporting.log", self.log.polling_period_secs)?;
        check_period("reporting.csv", self.csv.polling_period_secs)?;
        check_period("reporting.history", self.history.polling_period_secs)?;
        self.history.cleanup.validate()?;

        let names = [
            &self.console.name,
            &self.log.name,
            &self.csv.name,
            &self.history.name,
            &self.introspection.name,
        ];
        for (i, a) in names.iter().enumerate() {
            if a.is_empty() {
                return Err(MetricsError::Config("reporter name must not be empty".into()));
            }
            if names[i + 1..].contains(a) {
                return Err(MetricsError::Config(format!("duplicate reporter name: {a}")));
            }
        }
        Ok(())
    }
}

/// Longest accepted schedule period, in seconds (30 days).
pub const MAX_PERIOD_SECS: u64 = 30 * 86_400;

fn check_period(section: &str, secs: u64) -> Result<()> {
    if secs == 0 || secs > MAX_PERIOD_SECS {
        return Err(MetricsError::Config(format!(
            "{section}.polling_period_secs must be between 1 and {MAX_PERIOD_SECS}"
        )));
    }
    Ok(())
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct FilterConfig {
    #[serde(default)]
    pub includes: Vec<String>,
    #[serde(default)]
    pub excludes: Vec<String>,
    #[serde(default)]
    pub use_regex_filters: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConsoleConfig {
    #[serde(default = "default_console_name")]
    pub name: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_polling_period_secs")]
    pub polling_period_secs: u64,
    #[serde(default)]
    pub filter: FilterConfig,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            name: default_console_name(),
            enabled: false,
            polling_period_secs: default_polling_period_secs(),
            filter: FilterConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    #[serde(default = "default_log_name")]
    pub name: String,
    #[serde(default)]
    pub enabled: bool,
    /// Required when enabled.
    #[serde(default)]
    pub logger: Option<String>,
    #[serde(default = "default_polling_period_secs")]
    pub polling_period_secs: u64,
    #[serde(default)]
    pub filter: FilterConfig,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            name: default_log_name(),
            enabled: false,
            logger: None,
            polling_period_secs: default_polling_period_secs(),
            filter: FilterConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CsvConfig {
    #[serde(default = "default_csv_name")]
    pub name: String,
    #[serde(default)]
    pub enabled: bool,
    /// Output directory; required when enabled, created if missing.
    #[serde(default)]
    pub location: Option<PathBuf>,
    #[serde(default = "default_polling_period_secs")]
    pub polling_period_secs: u64,
    #[serde(default)]
    pub filter: FilterConfig,
}

impl Default for CsvConfig {
    fn default() -> Self {
        Self {
            name: default_csv_name(),
            enabled: false,
            location: None,
            polling_period_secs: default_polling_period_secs(),
            filter: FilterConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HistoryConfig {
    #[serde(default = "default_history_name")]
    pub name: String,
    #[serde(default)]
    pub enabled: bool,
    /// Source tag stored with every record; defaults to the host name.
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default = "default_polling_period_secs")]
    pub polling_period_secs: u64,
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub cleanup: CleanupConfig,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            name: default_history_name(),
            enabled: false,
            source: None,
            polling_period_secs: default_polling_period_secs(),
            filter: FilterConfig::default(),
            cleanup: CleanupConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CleanupConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_cleanup_period_secs")]
    pub period_secs: u64,
    #[serde(default = "default_days_to_keep")]
    pub days_to_keep: u32,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            period_secs: default_cleanup_period_secs(),
            days_to_keep: default_days_to_keep(),
        }
    }
}

impl CleanupConfig {
    pub fn validate(&self) -> Result<()> {
        if self.period_secs == 0 || self.period_secs > MAX_PERIOD_SECS {
            return Err(MetricsError::Config(format!(
                "reporting.history.cleanup.period_secs must be between 1 and {MAX_PERIOD_SECS}"
            )));
        }
        if self.days_to_keep == 0 {
            return Err(MetricsError::Config(
                "reporting.history.cleanup.days_to_keep must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn period(&self) -> Duration {
        Duration::from_secs(self.period_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IntrospectionConfig {
    #[serde(default = "default_introspection_name")]
    pub name: String,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_introspection_listen")]
    pub listen: String,
    #[serde(default = "default_introspection_path")]
    pub path: String,
    #[serde(default)]
    pub filter: FilterConfig,
}

impl Default for IntrospectionConfig {
    fn default() -> Self {
        Self {
            name: default_introspection_name(),
            enabled: false,
            listen: default_introspection_listen(),
            path: default_introspection_path(),
            filter: FilterConfig::default(),
        }
    }
}

fn default_true() -> bool {
    true
}
fn default_root_level() -> String {
    "info".into()
}
fn default_significant_digits() -> u8 {
    2
}
fn default_reservoir_size() -> usize {
    1028
}
fn default_polling_period_secs() -> u64 {
    60
}
fn default_cleanup_period_secs() -> u64 {
    86400
}
fn default_days_to_keep() -> u32 {
    7
}
fn default_console_name() -> String {
    "console".into()
}
fn default_log_name() -> String {
    "log".into()
}
fn default_csv_name() -> String {
    "csv".into()
}
fn default_history_name() -> String {
    "history".into()
}
fn default_introspection_name() -> String {
    "introspection".into()
}
fn default_introspection_listen() -> String {
    "127.0.0.1:9102".into()
}
fn default_introspection_path() -> String {
    "/metrics".into()
}
