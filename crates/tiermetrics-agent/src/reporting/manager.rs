//! Named reporter registry with bulk lifecycle operations.

use std::sync::Arc;

use dashmap::DashMap;
use futures_util::future::join_all;

use tiermetrics_core::{MetricRegistry, MetricsError, Result};

use crate::reporting::{Reporter, ReporterBuilder, ReporterKind};

pub struct ReporterManager {
    registry: Arc<MetricRegistry>,
    reporters: DashMap<String, Arc<Reporter>>,
}

impl ReporterManager {
    pub fn new(registry: Arc<MetricRegistry>) -> Self {
        Self {
            registry,
            reporters: DashMap::new(),
        }
    }

    /// Build and install a reporter.
    ///
    /// A disabled builder installs a placeholder. An existing reporter under
    /// the same name is stopped and replaced; the new one starts right away
    /// when the subsystem is enabled.
    pub async fn add_reporter(&self, builder: &dyn ReporterBuilder) -> Result<()> {
        let reporter = if builder.is_enabled() {
            let filter = builder.filter()?;
            builder.build(Arc::clone(&self.registry), filter).map_err(|e| match e {
                MetricsError::ReporterBuild(_) => e,
                other => MetricsError::ReporterBuild(format!("{}: {other}", builder.name())),
            })?
        } else {
            Reporter::disabled(builder.name())
        };
        self.install(reporter).await;
        Ok(())
    }

    /// Install an already built reporter under its own name.
    pub async fn install(&self, reporter: Reporter) {
        let name = reporter.name().to_owned();
        let reporter = Arc::new(reporter);
        if let Some(old) = self.reporters.insert(name.clone(), Arc::clone(&reporter)) {
            old.shutdown().await;
            tracing::info!(reporter = %name, "reporter replaced");
        }
        if reporter.is_enabled() && self.registry.is_enabled() {
            if let Err(e) = reporter.start().await {
                tracing::warn!(reporter = %name, error = %e, "reporter failed to start");
            }
        }
    }

    /// Stop and remove. Returns whether the reporter existed.
    pub async fn remove_reporter(&self, name: &str) -> bool {
        match self.reporters.remove(name) {
            Some((_, reporter)) => {
                reporter.shutdown().await;
                true
            }
            None => false,
        }
    }

    fn get(&self, name: &str) -> Result<Arc<Reporter>> {
        self.reporters
            .get(name)
            .map(|r| Arc::clone(r.value()))
            .ok_or_else(|| MetricsError::ReporterNotFound(name.to_owned()))
    }

    fn snapshot(&self) -> Vec<Arc<Reporter>> {
        self.reporters.iter().map(|r| Arc::clone(r.value())).collect()
    }

    pub async fn start_reporter(&self, name: &str) -> Result<()> {
        self.get(name)?.start().await
    }

    pub async fn stop_reporter(&self, name: &str) -> Result<()> {
        self.get(name)?.stop().await
    }

    pub fn is_reporter_running(&self, name: &str) -> bool {
        self.reporters.get(name).map_or(false, |r| r.is_running())
    }

    pub fn reporter_kind(&self, name: &str) -> Result<ReporterKind> {
        Ok(self.get(name)?.kind())
    }

    pub fn reporter_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.reporters.iter().map(|r| r.key().clone()).collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.reporters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reporters.is_empty()
    }

    /// Export now through one reporter.
    pub async fn report(&self, name: &str) -> Result<()> {
        self.get(name)?.report().await
    }

    /// Export now through every running scheduled reporter.
    pub async fn report_all(&self) {
        for reporter in self.snapshot() {
            if !reporter.is_enabled() {
                continue;
            }
            if let Err(e) = reporter.report().await {
                tracing::warn!(reporter = %reporter.name(), error = %e, "on-demand report failed");
            }
        }
    }

    /// Start every enabled reporter; failures are logged and do not stop the rest.
    pub async fn start_reporters(&self) {
        for reporter in self.snapshot() {
            if !reporter.is_enabled() {
                continue;
            }
            if let Err(e) = reporter.start().await {
                tracing::warn!(reporter = %reporter.name(), error = %e, "reporter failed to start");
            }
        }
    }

    pub async fn stop_reporters(&self) {
        let reporters = self.snapshot();
        join_all(reporters.iter().map(|r| r.shutdown())).await;
    }

    /// Restart running listening reporters so they republish their metric set.
    pub async fn restart_listening(&self) {
        for reporter in self.snapshot() {
            if reporter.kind() != ReporterKind::Listening || !reporter.is_running() {
                continue;
            }
            reporter.shutdown().await;
            if let Err(e) = reporter.start().await {
                tracing::warn!(reporter = %reporter.name(), error = %e, "listening reporter failed to restart");
            }
        }
    }
}
