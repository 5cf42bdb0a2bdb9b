//! Operational control surface.
//!
//! One object for tooling: the global switch, root and per-metric levels,
//! registry counts, and reporter lifecycle. Enabling the subsystem starts
//! every enabled reporter and disabling stops them all. A level change
//! restarts running listening reporters so live endpoints reflect the new
//! metric set.

use std::sync::Arc;

use tiermetrics_core::{Level, MetricRegistry, Result};

use crate::reporting::{ReporterBuilder, ReporterManager};

#[derive(Clone)]
pub struct MetricManagement {
    registry: Arc<MetricRegistry>,
    reporters: Arc<ReporterManager>,
}

impl MetricManagement {
    pub fn new(registry: Arc<MetricRegistry>) -> Self {
        let reporters = Arc::new(ReporterManager::new(Arc::clone(&registry)));
        Self { registry, reporters }
    }

    pub fn registry(&self) -> Arc<MetricRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn reporters(&self) -> Arc<ReporterManager> {
        Arc::clone(&self.reporters)
    }

    // ---- switch ----

    pub async fn enable(&self) {
        self.registry.set_enabled(true);
        self.reporters.start_reporters().await;
    }

    pub async fn disable(&self) {
        self.registry.set_enabled(false);
        self.reporters.stop_reporters().await;
    }

    pub fn is_enabled(&self) -> bool {
        self.registry.is_enabled()
    }

    // ---- levels ----

    pub fn root_level(&self) -> Level {
        self.registry.root_level()
    }

    pub async fn set_root_level(&self, level: Level) {
        let prev = self.registry.root_level();
        self.registry.set_root_level(level);
        if prev != level {
            self.reporters.restart_listening().await;
        }
    }

    pub fn metric_level(&self, name: &str) -> Result<Option<Level>> {
        self.registry.metric_level(name)
    }

    pub async fn set_metric_level(&self, name: &str, level: Level) -> Result<()> {
        let prev = self.registry.metric_level(name)?;
        self.registry.set_metric_level(name, level)?;
        if prev != Some(level) {
            self.reporters.restart_listening().await;
        }
        Ok(())
    }

    // ---- counts ----

    pub fn metrics_count(&self) -> usize {
        self.registry.metrics_count()
    }

    pub fn enabled_metrics_count(&self) -> usize {
        self.registry.enabled_metrics_count()
    }

    pub fn metric_collections_count(&self) -> usize {
        self.registry.collections_count()
    }

    // ---- reporters ----

    pub async fn add_reporter(&self, builder: &dyn ReporterBuilder) -> Result<()> {
        self.reporters.add_reporter(builder).await
    }

    pub async fn remove_reporter(&self, name: &str) -> bool {
        self.reporters.remove_reporter(name).await
    }

    pub fn reporter_names(&self) -> Vec<String> {
        self.reporters.reporter_names()
    }

    pub async fn start_reporter(&self, name: &str) -> Result<()> {
        self.reporters.start_reporter(name).await
    }

    pub async fn stop_reporter(&self, name: &str) -> Result<()> {
        self.reporters.stop_reporter(name).await
    }

    pub fn is_reporter_running(&self, name: &str) -> bool {
        self.reporters.is_reporter_running(name)
    }

    pub async fn start_reporters(&self) {
        self.reporters.start_reporters().await
    }

    pub async fn stop_reporters(&self) {
        self.reporters.stop_reporters().await
    }

    pub async fn report(&self) {
        self.reporters.report_all().await
    }

    pub async fn report_to(&self, name: &str) -> Result<()> {
        self.reporters.report(name).await
    }
}
