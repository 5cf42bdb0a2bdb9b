#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tiermetrics_core::{ErrorCode, Level, MetricRegistry};

fn registry() -> MetricRegistry {
    MetricRegistry::builder().root_level(Level::Info).build()
}

#[test]
fn get_or_create_shares_the_measurement() {
    let r = registry();
    let a = r.counter("app.requests", &[Level::Info]).unwrap();
    let b = r.counter("app.requests", &[Level::Trace]).unwrap();
    a.inc();
    b.inc_by(2);
    assert_eq!(a.count(), 3);
    assert_eq!(r.metrics_count(), 1);
    // The later call does not overwrite the declared level.
    assert!(b.is_active());
}

#[test]
fn kind_mismatch_is_rejected() {
    let r = registry();
    r.counter("app.x", &[Level::Info]).unwrap();
    let err = r.meter("app.x", &[Level::Info]).expect_err("must fail");
    assert_eq!(err.code(), ErrorCode::KindMismatch);
}

#[test]
fn failed_bundle_creates_nothing() {
    let r = registry();
    r.meter("p.q.m", &[Level::Info]).unwrap();

    let err = r.counter("p[+].q.m", &[Level::Info, Level::Info]).expect_err("must fail");
    assert_eq!(err.code(), ErrorCode::KindMismatch);
    assert_eq!(r.metrics_count(), 1);
    assert_eq!(r.enabled_metrics_count(), 1);
    assert_eq!(r.collections_count(), 0);
    assert!(!r.contains("p.m"));
    assert!(r.samples(|_| true).iter().all(|s| s.name == "p.q.m"));

    // The short member alone is still free to take any kind.
    r.counter("p.m", &[Level::Info]).unwrap();
    assert_eq!(r.metrics_count(), 2);
}

#[test]
fn disable_then_enable_keeps_counts() {
    let r = registry();
    let c = r.counter("app.jobs", &[Level::Info]).unwrap();
    c.inc_by(5);
    r.set_enabled(false);
    c.inc();
    assert_eq!(c.count(), 5);
    r.set_enabled(true);
    c.inc();
    assert_eq!(c.count(), 6);
}

#[test]
fn created_while_disabled_starts_gated() {
    let r = MetricRegistry::builder().enabled(false).build();
    let c = r.counter("app.late", &[Level::Info]).unwrap();
    c.inc();
    assert_eq!(c.count(), 0);
    assert_eq!(r.enabled_metrics_count(), 0);
    r.set_enabled(true);
    c.inc();
    assert_eq!(c.count(), 1);
}

#[test]
fn bundle_fans_out_and_reads_primary() {
    let r = registry();
    let c = r.counter("p[+].q.m", &[Level::Info, Level::Info]).unwrap();
    c.inc();
    assert_eq!(r.get_counter("p.m").unwrap().count(), 1);
    assert_eq!(r.get_counter("p.q.m").unwrap().count(), 1);
    assert_eq!(c.member_names(), vec!["p.m", "p.q.m"]);
    assert_eq!(r.collections_count(), 1);

    r.get_counter("p.q.m").unwrap().inc_by(10);
    assert_eq!(c.count(), 1);
    assert_eq!(r.get_counter("p[+].q.m").unwrap().count(), 1);
}

#[test]
fn bundle_members_are_gated_independently() {
    let r = registry();
    let c = r.counter("svc[+].api.calls", &[Level::Info, Level::Debug]).unwrap();
    c.inc();
    assert_eq!(r.get_counter("svc.calls").unwrap().count(), 1);
    assert_eq!(r.get_counter("svc.api.calls").unwrap().count(), 0);

    r.configure_level("svc.api", Level::Debug);
    c.inc();
    assert_eq!(r.get_counter("svc.api.calls").unwrap().count(), 1);
    assert_eq!(r.get_counter("svc.calls").unwrap().count(), 2);
}

#[test]
fn level_changes_rederive_descendants() {
    let r = registry();
    let deep = r.counter("a.b.c.d", &[Level::Trace]).unwrap();
    deep.inc();
    assert_eq!(deep.count(), 0);

    r.configure_level("a.b", Level::Trace);
    assert_eq!(r.effective_level("a.b.c.d"), Level::Trace);
    deep.inc();
    assert_eq!(deep.count(), 1);

    r.configure_level("a.b.c", Level::Info);
    deep.inc();
    assert_eq!(deep.count(), 1);
}

#[test]
fn root_level_off_gates_everything() {
    let r = registry();
    let c = r.counter("x", &[Level::Info]).unwrap();
    r.set_root_level(Level::Off);
    c.inc();
    assert_eq!(c.count(), 0);
    assert_eq!(r.root_level(), Level::Off);
    r.set_root_level(Level::All);
    c.inc();
    assert_eq!(c.count(), 1);
}

#[test]
fn metric_level_requires_existing_metric() {
    let r = registry();
    let err = r.set_metric_level("missing", Level::Info).expect_err("must fail");
    assert_eq!(err.code(), ErrorCode::MetricNotFound);
    let err = r.metric_level("missing").expect_err("must fail");
    assert_eq!(err.code(), ErrorCode::MetricNotFound);

    r.counter("present", &[Level::Debug]).unwrap();
    assert_eq!(r.metric_level("present").unwrap(), None);
    r.set_metric_level("present", Level::Debug).unwrap();
    assert_eq!(r.metric_level("present").unwrap(), Some(Level::Debug));
    assert_eq!(r.enabled_metrics_count(), 1);
}

#[test]
fn get_existing_reports_not_found() {
    let r = registry();
    let err = r.get_timer("nope").expect_err("must fail");
    assert_eq!(err.code(), ErrorCode::MetricNotFound);
}

#[test]
fn samples_only_cover_active_metrics() {
    let r = registry();
    r.counter("on", &[Level::Info]).unwrap().inc();
    r.counter("off", &[Level::Trace]).unwrap().inc();
    r.gauge("g", Level::Info, || 4.5).unwrap();
    let names: Vec<_> = r.samples(|_| true).into_iter().map(|s| s.name).collect();
    assert_eq!(names, vec!["g", "on"]);

    let json = serde_json::to_string(&r.samples(|n| n == "on")).unwrap();
    assert!(json.contains("\"count\":1"));
}

#[test]
fn timer_and_histogram_record_when_active() {
    let r = registry();
    let t = r.timer("op.latency", &[Level::Info]).unwrap();
    t.update(Duration::from_millis(3));
    t.time_fn(|| ());
    assert_eq!(t.count(), 2);

    let h = r.histogram("op.size", &[Level::Info]).unwrap();
    h.update(10);
    h.update(30);
    assert_eq!(h.count(), 2);
    assert_eq!(h.snapshot().max(), 30);
}

#[test]
fn cached_gauge_reuses_value_within_ttl() {
    let r = registry();
    let calls = Arc::new(AtomicUsize::new(0));
    let c = Arc::clone(&calls);
    let g = r
        .cached_gauge("cache.size", Level::Info, Duration::from_secs(60), move || {
            c.fetch_add(1, Ordering::SeqCst) as f64
        })
        .unwrap();
    assert_eq!(g.value(), 0.0);
    assert_eq!(g.value(), 0.0);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn concurrent_creation_yields_one_measurement() {
    let r = Arc::new(registry());
    let workers: Vec<_> = (0..8)
        .map(|_| {
            let r = Arc::clone(&r);
            thread::spawn(move || {
                let c = r.counter("race.hits", &[Level::Info]).unwrap();
                for _ in 0..1000 {
                    c.inc();
                }
            })
        })
        .collect();
    let toggler = {
        let r = Arc::clone(&r);
        thread::spawn(move || {
            for _ in 0..50 {
                r.set_root_level(Level::Debug);
                r.set_root_level(Level::Info);
            }
        })
    };
    for w in workers {
        w.join().unwrap();
    }
    toggler.join().unwrap();
    assert_eq!(r.metrics_count(), 1);
    assert_eq!(r.get_counter("race.hits").unwrap().count(), 8000);
}
