//! Timestamped history of exported samples, with retention cleanup.
//!
//! Every export appends one record per sample. The store grows without bound
//! unless the companion [`CleanupTask`] runs, deleting records older than
//! `days_to_keep` days on its own period.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use serde::Serialize;

use tiermetrics_core::measure::MetricKind;
use tiermetrics_core::registry::MetricSample;
use tiermetrics_core::{MetricRegistry, MetricsError, Result};

use crate::config::{CleanupConfig, HistoryConfig};
use crate::reporting::sinks::filter_of;
use crate::reporting::{MetricFilter, Reporter, ReporterBuilder, Sink, Task};

const SECS_PER_DAY: i64 = 86_400;

#[derive(Debug, Clone, Serialize)]
pub struct HistoryRecord {
    /// Unix seconds.
    pub timestamp: i64,
    pub source: String,
    pub name: String,
    pub kind: MetricKind,
    pub value: serde_json::Value,
}

pub trait HistoryStore: Send + Sync + 'static {
    fn append(&self, records: Vec<HistoryRecord>) -> Result<()>;

    /// Delete records with `timestamp < cutoff`. Returns how many were removed.
    fn purge_older_than(&self, cutoff: i64) -> Result<usize>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Default)]
pub struct MemoryHistoryStore {
    records: Mutex<Vec<HistoryRecord>>,
}

impl MemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<HistoryRecord> {
        self.records.lock().clone()
    }
}

impl HistoryStore for MemoryHistoryStore {
    fn append(&self, records: Vec<HistoryRecord>) -> Result<()> {
        self.records.lock().extend(records);
        Ok(())
    }

    fn purge_older_than(&self, cutoff: i64) -> Result<usize> {
        let mut records = self.records.lock();
        let before = records.len();
        records.retain(|r| r.timestamp >= cutoff);
        Ok(before - records.len())
    }

    fn len(&self) -> usize {
        self.records.lock().len()
    }
}

pub struct HistorySink {
    source: String,
    store: Arc<dyn HistoryStore>,
    cleanup: Option<(Arc<CleanupTask>, Duration)>,
}

impl HistorySink {
    pub fn new(source: impl Into<String>, store: Arc<dyn HistoryStore>) -> Self {
        Self {
            source: source.into(),
            store,
            cleanup: None,
        }
    }

    pub fn with_cleanup(mut self, cfg: &CleanupConfig) -> Self {
        if cfg.enabled {
            let task = CleanupTask::new(Arc::clone(&self.store), cfg.days_to_keep);
            self.cleanup = Some((Arc::new(task), cfg.period()));
        }
        self
    }

    fn records(&self, samples: &[MetricSample], timestamp: i64) -> Result<Vec<HistoryRecord>> {
        samples
            .iter()
            .map(|s| {
                Ok(HistoryRecord {
                    timestamp,
                    source: self.source.clone(),
                    name: s.name.clone(),
                    kind: s.kind,
                    value: serde_json::to_value(&s.value)
                        .map_err(|e| MetricsError::Export(format!("encode {}: {e}", s.name)))?,
                })
            })
            .collect()
    }
}

#[async_trait]
impl Sink for HistorySink {
    async fn export(&self, samples: &[MetricSample]) -> Result<()> {
        let records = self.records(samples, Utc::now().timestamp())?;
        self.store.append(records)
    }

    fn companion(&self) -> Option<(Arc<dyn Task>, Duration)> {
        self.cleanup
            .as_ref()
            .map(|(task, period)| (Arc::clone(task) as Arc<dyn Task>, *period))
    }
}

/// Deletes history older than the retention window.
pub struct CleanupTask {
    store: Arc<dyn HistoryStore>,
    days_to_keep: u32,
}

impl CleanupTask {
    pub fn new(store: Arc<dyn HistoryStore>, days_to_keep: u32) -> Self {
        Self { store, days_to_keep }
    }

    /// Records exactly `days_to_keep` days old are kept.
    pub fn cutoff(&self, now: i64) -> i64 {
        now - i64::from(self.days_to_keep) * SECS_PER_DAY
    }

    pub fn purge_at(&self, now: i64) -> Result<usize> {
        let cutoff = self.cutoff(now);
        let removed = self.store.purge_older_than(cutoff)?;
        tracing::info!(removed, cutoff, days_to_keep = self.days_to_keep, "history cleanup");
        Ok(removed)
    }
}

#[async_trait]
impl Task for CleanupTask {
    fn name(&self) -> &str {
        "history-cleanup"
    }

    async fn run(&self) -> Result<()> {
        self.purge_at(Utc::now().timestamp()).map(|_| ())
    }
}

/// History configuration paired with the store it writes to.
pub struct HistoryReporterBuilder {
    cfg: HistoryConfig,
    store: Arc<dyn HistoryStore>,
}

impl HistoryReporterBuilder {
    pub fn new(cfg: HistoryConfig, store: Arc<dyn HistoryStore>) -> Self {
        Self { cfg, store }
    }
}

fn host_name() -> String {
    std::env::var("HOSTNAME")
        .ok()
        .filter(|h| !h.trim().is_empty())
        .unwrap_or_else(|| "localhost".to_owned())
}

impl ReporterBuilder for HistoryReporterBuilder {
    fn name(&self) -> &str {
        &self.cfg.name
    }

    fn is_enabled(&self) -> bool {
        self.cfg.enabled
    }

    fn filter(&self) -> Result<MetricFilter> {
        filter_of(&self.cfg.filter)
    }

    fn build(&self, source: Arc<MetricRegistry>, filter: MetricFilter) -> Result<Reporter> {
        let tag = match self.cfg.source.as_deref().map(str::trim) {
            Some("") => {
                return Err(MetricsError::ReporterBuild(format!(
                    "{}: source must not be blank",
                    self.cfg.name
                )))
            }
            Some(s) => s.to_owned(),
            None => host_name(),
        };
        let sink = HistorySink::new(tag, Arc::clone(&self.store)).with_cleanup(&self.cfg.cleanup);
        Ok(Reporter::scheduled(
            self.cfg.name.clone(),
            Arc::new(sink),
            source,
            filter,
            Duration::from_secs(self.cfg.polling_period_secs),
        ))
    }
}
