//! Metrics service assembled from configuration.
//!
//! Building creates the registry (disabled until activation), applies level
//! configuration and installs every configured reporter. A reporter that
//! fails to build is logged and skipped so that metrics never keep the host
//! from starting.

use std::sync::Arc;

use tiermetrics_core::error::Result;
use tiermetrics_core::MetricRegistry;

use crate::config::MetricsConfig;
use crate::management::MetricManagement;
use crate::reporting::sinks::{HistoryReporterBuilder, MemoryHistoryStore};
use crate::reporting::ReporterBuilder;

#[derive(Clone)]
pub struct Metrics {
    inner: Arc<MetricsInner>,
}

struct MetricsInner {
    cfg: MetricsConfig,
    management: MetricManagement,
    history: Arc<MemoryHistoryStore>,
}

impl Metrics {
    pub async fn new(cfg: MetricsConfig) -> Result<Self> {
        cfg.validate()?;

        let mut builder = MetricRegistry::builder()
            .enabled(false)
            .root_level(cfg.levels.root())
            .reservoir(cfg.reservoir.settings());
        for (prefix, level) in cfg.levels.entries() {
            builder = builder.level(&prefix, level);
        }
        let registry = Arc::new(builder.build());
        let management = MetricManagement::new(registry);

        let history = Arc::new(MemoryHistoryStore::new());
        let reporting = &cfg.reporting;
        let history_builder =
            HistoryReporterBuilder::new(reporting.history.clone(), Arc::clone(&history) as _);
        let builders: [&dyn ReporterBuilder; 5] = [
            &reporting.console,
            &reporting.log,
            &reporting.csv,
            &history_builder,
            &reporting.introspection,
        ];
        for b in builders {
            if let Err(e) = management.add_reporter(b).await {
                tracing::warn!(reporter = %b.name(), error = %e, "reporter not installed");
            }
        }

        Ok(Self {
            inner: Arc::new(MetricsInner {
                cfg,
                management,
                history,
            }),
        })
    }

    /// Turn the subsystem on if configured to be enabled.
    pub async fn activate(&self) {
        if self.inner.cfg.enabled {
            self.inner.management.enable().await;
        }
        tracing::info!(
            enabled = self.inner.management.is_enabled(),
            root_level = %self.inner.management.root_level(),
            reporters = self.inner.management.reporter_names().len(),
            "metrics activated"
        );
    }

    pub async fn deactivate(&self) {
        self.inner.management.stop_reporters().await;
        tracing::info!("metrics deactivated");
    }

    pub fn cfg(&self) -> &MetricsConfig {
        &self.inner.cfg
    }

    pub fn registry(&self) -> Arc<MetricRegistry> {
        self.inner.management.registry()
    }

    pub fn management(&self) -> &MetricManagement {
        &self.inner.management
    }

    pub fn history(&self) -> Arc<MemoryHistoryStore> {
        Arc::clone(&self.inner.history)
    }
}
