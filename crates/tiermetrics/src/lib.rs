//! Top-level facade crate for tiermetrics.
//!
//! Re-exports the registry core and the agent library so users can depend on a single crate.

pub mod core {
    pub use tiermetrics_core::*;
}

pub mod agent {
    pub use tiermetrics_agent::*;
}

pub use tiermetrics_core::{Level, MetricRegistry, MetricsError, Result};
