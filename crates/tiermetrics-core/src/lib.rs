//! tiermetrics core: levels, metric names, measurements and the level-gated registry.
//!
//! This crate holds everything an application needs to record measurements.
//! It carries no async runtime or I/O dependency. Exporting values to sinks
//! lives in `tiermetrics-agent`, which reads the registry through
//! [`MetricRegistry::samples`].
//!
//! Recording never fails, and the gate check on each call takes no lock: a
//! handle call either reaches the measurement or is dropped, depending on the
//! node's current level. Creation, lookup and level changes report problems as
//! [`MetricsError`] values.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod error;
pub mod level;
pub mod measure;
pub mod name;
pub mod registry;
pub mod reservoir;

/// Shared result type.
pub use error::{ErrorCode, MetricsError, Result};
pub use level::Level;
pub use registry::{MetricRegistry, MetricRegistryBuilder};
