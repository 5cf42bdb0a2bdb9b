#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tiermetrics_agent::management::MetricManagement;
use tiermetrics_agent::reporting::{
    Listener, MetricFilter, Reporter, ReporterBuilder, ReporterManager, Sink,
};
use tiermetrics_core::registry::MetricSample;
use tiermetrics_core::{ErrorCode, Level, MetricRegistry, MetricsError, Result};

#[derive(Default)]
struct RecordingSink {
    exports: AtomicUsize,
    last: Mutex<Vec<String>>,
    fail: bool,
}

#[async_trait]
impl Sink for RecordingSink {
    async fn export(&self, samples: &[MetricSample]) -> Result<()> {
        self.exports.fetch_add(1, Ordering::SeqCst);
        *self.last.lock() = samples.iter().map(|s| s.name.clone()).collect();
        if self.fail {
            return Err(MetricsError::Export("sink down".into()));
        }
        Ok(())
    }
}

impl RecordingSink {
    fn exports(&self) -> usize {
        self.exports.load(Ordering::SeqCst)
    }
}

struct TestBuilder {
    name: &'static str,
    enabled: bool,
    period: Duration,
    sink: Arc<RecordingSink>,
    filter: MetricFilter,
    broken: bool,
}

impl TestBuilder {
    fn new(name: &'static str, sink: Arc<RecordingSink>) -> Self {
        Self {
            name,
            enabled: true,
            period: Duration::from_secs(3600),
            sink,
            filter: MetricFilter::all(),
            broken: false,
        }
    }
}

impl ReporterBuilder for TestBuilder {
    fn name(&self) -> &str {
        self.name
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn filter(&self) -> Result<MetricFilter> {
        Ok(self.filter.clone())
    }

    fn build(&self, source: Arc<MetricRegistry>, filter: MetricFilter) -> Result<Reporter> {
        if self.broken {
            return Err(MetricsError::ReporterBuild("endpoint unreachable".into()));
        }
        Ok(Reporter::scheduled(
            self.name,
            Arc::clone(&self.sink) as Arc<dyn Sink>,
            source,
            filter,
            self.period,
        ))
    }
}

fn manager(enabled: bool) -> (Arc<MetricRegistry>, ReporterManager) {
    let registry = Arc::new(MetricRegistry::builder().enabled(enabled).build());
    let manager = ReporterManager::new(Arc::clone(&registry));
    (registry, manager)
}

#[tokio::test]
async fn disabled_config_installs_inoperable_placeholder() {
    let (_, m) = manager(true);
    let mut b = TestBuilder::new("console", Arc::default());
    b.enabled = false;
    m.add_reporter(&b).await.unwrap();

    assert_eq!(m.reporter_names(), vec!["console"]);
    assert!(!m.is_reporter_running("console"));
    let err = m.start_reporter("console").await.expect_err("must fail");
    assert_eq!(err.code(), ErrorCode::IllegalState);
    let err = m.stop_reporter("console").await.expect_err("must fail");
    assert_eq!(err.code(), ErrorCode::IllegalState);

    // Bulk operations skip placeholders.
    m.start_reporters().await;
    assert!(!m.is_reporter_running("console"));
}

#[tokio::test]
async fn re_adding_replaces_and_remove_is_single_shot() {
    let (_, m) = manager(true);
    let first = Arc::new(RecordingSink::default());
    let second = Arc::new(RecordingSink::default());

    m.add_reporter(&TestBuilder::new("csv", Arc::clone(&first))).await.unwrap();
    assert!(m.is_reporter_running("csv"));

    m.add_reporter(&TestBuilder::new("csv", Arc::clone(&second))).await.unwrap();
    assert_eq!(m.len(), 1);
    assert!(m.is_reporter_running("csv"));

    m.report("csv").await.unwrap();
    assert_eq!(first.exports(), 0);
    assert_eq!(second.exports(), 1);

    assert!(m.remove_reporter("csv").await);
    assert!(!m.remove_reporter("csv").await);
    assert!(!m.is_reporter_running("csv"));
    assert!(m.is_empty());
}

#[tokio::test]
async fn start_and_stop_are_idempotent() {
    let (_, m) = manager(false);
    m.add_reporter(&TestBuilder::new("log", Arc::default())).await.unwrap();
    assert!(!m.is_reporter_running("log"));

    m.start_reporter("log").await.unwrap();
    m.start_reporter("log").await.unwrap();
    assert!(m.is_reporter_running("log"));

    m.stop_reporter("log").await.unwrap();
    m.stop_reporter("log").await.unwrap();
    assert!(!m.is_reporter_running("log"));
}

#[tokio::test]
async fn unknown_reporter_is_an_error() {
    let (_, m) = manager(true);
    for err in [
        m.start_reporter("nope").await.expect_err("must fail"),
        m.stop_reporter("nope").await.expect_err("must fail"),
        m.report("nope").await.expect_err("must fail"),
    ] {
        assert_eq!(err.code(), ErrorCode::ReporterNotFound);
    }
    assert!(!m.is_reporter_running("nope"));
}

#[tokio::test]
async fn build_failure_is_surfaced_and_not_installed() {
    let (_, m) = manager(true);
    let mut b = TestBuilder::new("jdbc", Arc::default());
    b.broken = true;
    let err = m.add_reporter(&b).await.expect_err("must fail");
    assert_eq!(err.code(), ErrorCode::ReporterBuild);
    assert!(m.is_empty());
}

#[tokio::test]
async fn report_exports_only_while_running() {
    let (_, m) = manager(false);
    let sink = Arc::new(RecordingSink::default());
    m.add_reporter(&TestBuilder::new("console", Arc::clone(&sink))).await.unwrap();

    m.report("console").await.unwrap();
    assert_eq!(sink.exports(), 0);

    m.start_reporter("console").await.unwrap();
    m.report("console").await.unwrap();
    m.report_all().await;
    assert_eq!(sink.exports(), 2);

    m.stop_reporter("console").await.unwrap();
    m.report_all().await;
    assert_eq!(sink.exports(), 2);
}

#[tokio::test]
async fn failing_sink_keeps_its_schedule() {
    let (_, m) = manager(true);
    let sink = Arc::new(RecordingSink {
        fail: true,
        ..Default::default()
    });
    let mut b = TestBuilder::new("remote", Arc::clone(&sink));
    b.period = Duration::from_millis(10);
    m.add_reporter(&b).await.unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(sink.exports() >= 2);
    assert!(m.is_reporter_running("remote"));
    m.stop_reporters().await;
    assert!(!m.is_reporter_running("remote"));
}

#[tokio::test]
async fn exports_cover_active_filtered_metrics() {
    let (registry, m) = manager(true);
    registry.counter("db.reads", &[Level::Info]).unwrap().inc();
    registry.counter("db.writes", &[Level::Info]).unwrap().inc();
    registry.counter("db.trace", &[Level::Trace]).unwrap().inc();
    registry.counter("web.hits", &[Level::Info]).unwrap().inc();

    let sink = Arc::new(RecordingSink::default());
    let mut b = TestBuilder::new("db-only", Arc::clone(&sink));
    b.filter = MetricFilter::new(&[r"db\..*".into()], &["db.writes".into()], true).unwrap();
    m.add_reporter(&b).await.unwrap();
    m.report("db-only").await.unwrap();

    assert_eq!(*sink.last.lock(), vec!["db.reads".to_string()]);
}

#[tokio::test]
async fn switch_starts_and_stops_every_reporter() {
    let registry = Arc::new(MetricRegistry::builder().enabled(false).build());
    let mgmt = MetricManagement::new(Arc::clone(&registry));
    mgmt.add_reporter(&TestBuilder::new("a", Arc::default())).await.unwrap();
    mgmt.add_reporter(&TestBuilder::new("b", Arc::default())).await.unwrap();
    let mut off = TestBuilder::new("c", Arc::default());
    off.enabled = false;
    mgmt.add_reporter(&off).await.unwrap();

    let c = registry.counter("jobs", &[Level::Info]).unwrap();
    c.inc();
    assert_eq!(c.count(), 0);

    mgmt.enable().await;
    assert!(mgmt.is_enabled());
    assert!(mgmt.is_reporter_running("a"));
    assert!(mgmt.is_reporter_running("b"));
    assert!(!mgmt.is_reporter_running("c"));
    c.inc();
    assert_eq!(c.count(), 1);

    mgmt.disable().await;
    assert!(!mgmt.is_reporter_running("a"));
    assert!(!mgmt.is_reporter_running("b"));
    c.inc();
    assert_eq!(c.count(), 1);
    assert_eq!(mgmt.reporter_names(), vec!["a", "b", "c"]);
}

#[tokio::test]
async fn management_levels_and_counts() {
    let registry = Arc::new(MetricRegistry::builder().build());
    let mgmt = MetricManagement::new(Arc::clone(&registry));
    registry.counter("svc[+].api.calls", &[Level::Info, Level::Debug]).unwrap();

    assert_eq!(mgmt.metrics_count(), 2);
    assert_eq!(mgmt.metric_collections_count(), 1);
    assert_eq!(mgmt.enabled_metrics_count(), 1);

    mgmt.set_root_level(Level::Debug).await;
    assert_eq!(mgmt.root_level(), Level::Debug);
    assert_eq!(mgmt.enabled_metrics_count(), 2);

    mgmt.set_metric_level("svc.calls", Level::Off).await.unwrap();
    assert_eq!(mgmt.metric_level("svc.calls").unwrap(), Some(Level::Off));
    assert_eq!(mgmt.enabled_metrics_count(), 1);

    let err = mgmt.set_metric_level("svc.nope", Level::Info).await.expect_err("must fail");
    assert_eq!(err.code(), ErrorCode::MetricNotFound);
}

#[derive(Default)]
struct CountingListener {
    opens: AtomicUsize,
    closes: AtomicUsize,
}

impl CountingListener {
    fn counts(&self) -> (usize, usize) {
        (self.opens.load(Ordering::SeqCst), self.closes.load(Ordering::SeqCst))
    }
}

#[async_trait]
impl Listener for CountingListener {
    async fn open(&self) -> Result<()> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn level_changes_restart_running_listeners_only() {
    let registry = Arc::new(MetricRegistry::builder().build());
    let mgmt = MetricManagement::new(Arc::clone(&registry));
    registry.counter("db.reads", &[Level::Info]).unwrap();

    let live = Arc::new(CountingListener::default());
    let idle = Arc::new(CountingListener::default());
    let reporters = mgmt.reporters();
    reporters
        .install(Reporter::listening("live", Arc::clone(&live) as Arc<dyn Listener>))
        .await;
    reporters
        .install(Reporter::listening("idle", Arc::clone(&idle) as Arc<dyn Listener>))
        .await;
    mgmt.add_reporter(&TestBuilder::new("sched", Arc::default())).await.unwrap();
    mgmt.stop_reporter("idle").await.unwrap();
    assert_eq!(live.counts(), (1, 0));
    assert_eq!(idle.counts(), (1, 1));

    mgmt.set_root_level(Level::Debug).await;
    assert_eq!(live.counts(), (2, 1));
    assert!(mgmt.is_reporter_running("live"));
    assert_eq!(idle.counts(), (1, 1));
    assert!(!mgmt.is_reporter_running("idle"));
    assert!(mgmt.is_reporter_running("sched"));

    // Same level again: nothing to republish.
    mgmt.set_root_level(Level::Debug).await;
    assert_eq!(live.counts(), (2, 1));

    mgmt.set_metric_level("db.reads", Level::Off).await.unwrap();
    assert_eq!(live.counts(), (3, 2));
    mgmt.set_metric_level("db.reads", Level::Off).await.unwrap();
    assert_eq!(live.counts(), (3, 2));
    assert_eq!(idle.counts(), (1, 1));
    assert!(mgmt.is_reporter_running("live"));
}
