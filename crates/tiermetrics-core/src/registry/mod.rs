//! Level-gated metric registry.
//!
//! The registry owns one live measurement per concrete name. Each node holds
//! an atomically swappable gate deciding whether updates are forwarded to the
//! measurement or discarded. A node is active when the subsystem is enabled,
//! its effective level is above `Off`, and that level is at least the level
//! the metric was declared with.
//!
//! Writers (level changes, enable/disable) take the level-map write lock and
//! re-derive affected nodes in place. Creation takes the read lock, so a node
//! is never inserted with state derived from a configuration that a
//! concurrent writer has already replaced. The update path takes no lock.

mod handle;
mod node;
mod sample;
mod updater;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;

use crate::error::{MetricsError, Result};
use crate::level::Level;
use crate::measure::{Counter, Gauge, Histogram, Meter, Timer};
use crate::name::{self, LevelTree};
use crate::reservoir::ReservoirSettings;

pub use handle::{
    CounterHandle, GaugeHandle, Handle, HistogramHandle, MeterHandle, TimerContext, TimerHandle,
};
pub use node::{Measure, Metric, Node};
pub use sample::{DistributionSample, MetricSample, RateSample, SampleValue};

use node::Gate;

pub struct MetricRegistry {
    metrics: DashMap<String, Metric>,
    /// Annotated name to its concrete member names, for bundles only.
    collections: DashMap<String, Vec<String>>,
    levels: RwLock<LevelTree>,
    enabled: AtomicBool,
    reservoir: ReservoirSettings,
}

#[derive(Debug, Clone)]
pub struct MetricRegistryBuilder {
    enabled: bool,
    levels: LevelTree,
    reservoir: ReservoirSettings,
}

impl MetricRegistryBuilder {
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn root_level(mut self, level: Level) -> Self {
        self.levels.set_root(level);
        self
    }

    /// Configure a level at a name prefix before any metric exists.
    pub fn level(mut self, prefix: &str, level: Level) -> Self {
        self.levels.set(prefix, level);
        self
    }

    pub fn reservoir(mut self, reservoir: ReservoirSettings) -> Self {
        self.reservoir = reservoir;
        self
    }

    pub fn build(self) -> MetricRegistry {
        MetricRegistry {
            metrics: DashMap::new(),
            collections: DashMap::new(),
            levels: RwLock::new(self.levels),
            enabled: AtomicBool::new(self.enabled),
            reservoir: self.reservoir,
        }
    }
}

impl Default for MetricRegistry {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl MetricRegistry {
    /// Enabled, root level `Info`, HDR histogram reservoirs.
    pub fn builder() -> MetricRegistryBuilder {
        MetricRegistryBuilder {
            enabled: true,
            levels: LevelTree::new(Level::Info),
            reservoir: ReservoirSettings::default(),
        }
    }

    // ---- creation ----

    pub fn counter(&self, name: &str, levels: &[Level]) -> Result<CounterHandle> {
        self.get_or_create(name, levels, || Ok(Counter::new()))
    }

    pub fn meter(&self, name: &str, levels: &[Level]) -> Result<MeterHandle> {
        self.get_or_create(name, levels, || Ok(Meter::new()))
    }

    pub fn histogram(&self, name: &str, levels: &[Level]) -> Result<HistogramHandle> {
        self.get_or_create(name, levels, || Ok(Histogram::new(self.reservoir.build()?)))
    }

    pub fn timer(&self, name: &str, levels: &[Level]) -> Result<TimerHandle> {
        self.get_or_create(name, levels, || Ok(Timer::new(self.reservoir.build()?)))
    }

    /// Register a gauge. An existing gauge under `name` keeps its original supplier.
    pub fn gauge<F>(&self, name: &str, level: Level, supplier: F) -> Result<GaugeHandle>
    where
        F: Fn() -> f64 + Send + Sync + 'static,
    {
        let supplier = parking_lot::Mutex::new(Some(supplier));
        self.get_or_create(name, &[level], || {
            supplier
                .lock()
                .take()
                .map(Gauge::new)
                .ok_or_else(|| MetricsError::Internal("gauge supplier consumed".into()))
        })
    }

    /// Register a gauge whose supplier runs at most once per `ttl`.
    pub fn cached_gauge<F>(&self, name: &str, level: Level, ttl: Duration, supplier: F) -> Result<GaugeHandle>
    where
        F: Fn() -> f64 + Send + Sync + 'static,
    {
        let supplier = parking_lot::Mutex::new(Some(supplier));
        self.get_or_create(name, &[level], || {
            supplier
                .lock()
                .take()
                .map(|f| Gauge::cached(ttl, f))
                .ok_or_else(|| MetricsError::Internal("gauge supplier consumed".into()))
        })
    }

    fn get_or_create<M: Measure>(
        &self,
        raw: &str,
        levels: &[Level],
        make: impl Fn() -> Result<M>,
    ) -> Result<Handle<M>> {
        let spec = name::expand(raw, levels)?;

        let tree = self.levels.read();

        // A bundle is created whole or not at all: check every existing member first.
        for member in spec.members() {
            if let Some(existing) = self.metrics.get(&member.name) {
                Self::expect_kind::<M>(&member.name, existing.value())?;
            }
        }

        let enabled = self.enabled.load(Ordering::Acquire);
        let mut members = Vec::with_capacity(spec.members().len());
        let mut created: Vec<&str> = Vec::new();
        for member in spec.members() {
            let node = match self.metrics.entry(member.name.clone()) {
                Entry::Occupied(e) => Self::expect_kind::<M>(&member.name, e.get()),
                Entry::Vacant(v) => {
                    let gate = Gate::derive(enabled, tree.effective_level(&member.name), member.level);
                    let active = gate.active;
                    match make() {
                        Ok(measure) => {
                            let node = Arc::new(Node::new(member.name.clone(), member.level, measure, gate));
                            v.insert(M::wrap(Arc::clone(&node)));
                            created.push(&member.name);
                            tracing::debug!(metric = %member.name, kind = %M::KIND, level = %member.level, active, "metric created");
                            Ok(node)
                        }
                        Err(e) => Err(e),
                    }
                }
            };
            match node {
                Ok(node) => members.push(node),
                Err(e) => {
                    // A concurrent creator of another kind got in after the check.
                    for name in created {
                        self.metrics.remove(name);
                    }
                    return Err(e);
                }
            }
        }
        drop(tree);

        if spec.is_bundle() {
            self.collections.entry(raw.to_owned()).or_insert_with(|| {
                spec.members().iter().map(|m| m.name.clone()).collect()
            });
        }
        Ok(Handle::new(members))
    }

    // ---- lookup ----

    pub fn get_counter(&self, name: &str) -> Result<CounterHandle> {
        self.get_existing(name)
    }

    pub fn get_meter(&self, name: &str) -> Result<MeterHandle> {
        self.get_existing(name)
    }

    pub fn get_histogram(&self, name: &str) -> Result<HistogramHandle> {
        self.get_existing(name)
    }

    pub fn get_timer(&self, name: &str) -> Result<TimerHandle> {
        self.get_existing(name)
    }

    pub fn get_gauge(&self, name: &str) -> Result<GaugeHandle> {
        self.get_existing(name)
    }

    fn expect_kind<M: Measure>(name: &str, metric: &Metric) -> Result<Arc<Node<M>>> {
        M::unwrap(metric).ok_or_else(|| MetricsError::KindMismatch {
            name: name.to_owned(),
            expected: M::KIND.as_str(),
            actual: metric.kind().as_str(),
        })
    }

    /// Look up a concrete name, or an annotated name that was used to create a bundle.
    fn get_existing<M: Measure>(&self, name: &str) -> Result<Handle<M>> {
        let names: Vec<String> = match self.collections.get(name) {
            Some(members) => members.value().clone(),
            None => vec![name.to_owned()],
        };
        let mut members = Vec::with_capacity(names.len());
        for n in &names {
            let metric = self
                .metrics
                .get(n)
                .ok_or_else(|| MetricsError::MetricNotFound(n.clone()))?;
            let node = Self::expect_kind::<M>(n, metric.value())?;
            members.push(node);
        }
        Ok(Handle::new(members))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.metrics.contains_key(name)
    }

    // ---- levels & switch ----

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Flip the global switch and re-derive every node.
    pub fn set_enabled(&self, enabled: bool) {
        let tree = self.levels.write();
        if self.enabled.swap(enabled, Ordering::AcqRel) == enabled {
            return;
        }
        let changed = self.rederive(&tree, "");
        tracing::info!(enabled, changed, "metrics switch changed");
    }

    pub fn root_level(&self) -> Level {
        self.levels.read().root()
    }

    pub fn set_root_level(&self, level: Level) {
        let mut tree = self.levels.write();
        tree.set_root(level);
        let changed = self.rederive(&tree, "");
        tracing::info!(level = %level, changed, "root metric level changed");
    }

    /// Configure `level` at any name prefix and re-derive the nodes below it.
    pub fn configure_level(&self, prefix: &str, level: Level) {
        let mut tree = self.levels.write();
        tree.set(prefix, level);
        let changed = self.rederive(&tree, prefix);
        tracing::debug!(prefix = %prefix, level = %level, changed, "metric level configured");
    }

    /// Set the level of an existing metric; its descendants inherit it.
    pub fn set_metric_level(&self, name: &str, level: Level) -> Result<()> {
        if !self.contains(name) {
            return Err(MetricsError::MetricNotFound(name.to_owned()));
        }
        self.configure_level(name, level);
        Ok(())
    }

    /// Explicitly configured level of an existing metric, if any.
    pub fn metric_level(&self, name: &str) -> Result<Option<Level>> {
        if !self.contains(name) {
            return Err(MetricsError::MetricNotFound(name.to_owned()));
        }
        Ok(self.levels.read().get(name))
    }

    /// Level in force for `name`, whether or not a metric exists under it.
    pub fn effective_level(&self, name: &str) -> Level {
        self.levels.read().effective_level(name)
    }

    fn rederive(&self, tree: &LevelTree, prefix: &str) -> usize {
        let enabled = self.enabled.load(Ordering::Acquire);
        let mut changed = 0;
        for entry in self.metrics.iter() {
            if !name::is_within(entry.key(), prefix) {
                continue;
            }
            let node = entry.value().gated();
            if node.refresh(enabled, tree.effective_level(entry.key())) {
                changed += 1;
            }
        }
        changed
    }

    // ---- counts & export ----

    pub fn metrics_count(&self) -> usize {
        self.metrics.len()
    }

    pub fn enabled_metrics_count(&self) -> usize {
        self.metrics.iter().filter(|e| e.value().is_active()).count()
    }

    pub fn collections_count(&self) -> usize {
        self.collections.len()
    }

    /// Samples of every active metric accepted by `filter`, sorted by name.
    pub fn samples(&self, filter: impl Fn(&str) -> bool) -> Vec<MetricSample> {
        // Gauge suppliers run outside the map's shard locks.
        let selected: Vec<Metric> = self
            .metrics
            .iter()
            .filter(|e| e.value().is_active() && filter(e.key()))
            .map(|e| e.value().clone())
            .collect();
        let mut out: Vec<MetricSample> = selected.iter().map(MetricSample::of).collect();
        out.sort_by(|a, b| a.name.cmp(&b.name));
        out
    }
}
