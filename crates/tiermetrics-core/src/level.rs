//! Metric verbosity levels.
//!
//! A `Level` is used both as a threshold (configured on a name prefix or the
//! root) and as a tag declared by each metric. `Off` never records and `All`
//! always records.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MetricsError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Off,
    Info,
    Debug,
    Trace,
    All,
}

impl Level {
    pub const VALUES: [Level; 5] = [Level::Off, Level::Info, Level::Debug, Level::Trace, Level::All];

    /// Parse a case-insensitive token, degrading to `fallback` when unrecognized.
    ///
    /// Level configuration must never keep the host from starting, so this
    /// never fails.
    pub fn parse_or(token: &str, fallback: Level) -> Level {
        match token.parse() {
            Ok(level) => level,
            Err(_) => {
                tracing::warn!(token = %token, fallback = %fallback, "unknown metric level, using fallback");
                fallback
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Level::Off => "OFF",
            Level::Info => "INFO",
            Level::Debug => "DEBUG",
            Level::Trace => "TRACE",
            Level::All => "ALL",
        }
    }
}

impl Default for Level {
    fn default() -> Self {
        Level::Info
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = MetricsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        Level::VALUES
            .into_iter()
            .find(|l| l.as_str().eq_ignore_ascii_case(token))
            .ok_or_else(|| MetricsError::Config(format!("unknown level: {s}")))
    }
}
