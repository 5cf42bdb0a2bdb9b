//! tiermetrics agent library entry.
//!
//! This crate wires the registry from `tiermetrics-core` to configuration,
//! reporters and the management surface. It is consumed by the binary
//! (`main.rs`) and by integration tests.
//!
//! Panics, `unwrap`, and `expect` are compile-denied, as in the core crate.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]

pub mod config;
pub mod management;
pub mod metrics;
pub mod reporting;
