#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;

use tiermetrics_agent::config::{CsvConfig, FilterConfig, IntrospectionConfig, LogConfig};
use tiermetrics_agent::metrics::Metrics;
use tiermetrics_agent::reporting::sinks::introspection::render;
use tiermetrics_agent::reporting::sinks::{ConsoleSink, CsvSink, HistoryStore, IntrospectionListener};
use tiermetrics_agent::reporting::{
    Listener, MetricFilter, ReporterBuilder, ReporterKind, ReporterManager, Sink,
};
use tiermetrics_agent::config;
use tiermetrics_core::{ErrorCode, Level, MetricRegistry};

fn registry() -> Arc<MetricRegistry> {
    let r = Arc::new(MetricRegistry::builder().build());
    r.counter("app.requests", &[Level::Info]).unwrap().inc_by(3);
    r.histogram("app.size", &[Level::Info]).unwrap().update(42);
    r.gauge("app.load", Level::Info, || 0.5).unwrap();
    r
}

#[tokio::test]
async fn csv_writes_header_once_then_rows() {
    let dir = tempfile::tempdir().unwrap();
    let sink = CsvSink::new(dir.path().join("out")).unwrap();
    let r = registry();

    sink.export(&r.samples(|_| true)).await.unwrap();
    r.get_counter("app.requests").unwrap().inc();
    sink.export(&r.samples(|_| true)).await.unwrap();

    let text = std::fs::read_to_string(sink.file_for("app.requests")).unwrap();
    let lines: Vec<_> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "t,count");
    assert!(lines[1].ends_with(",3"));
    assert!(lines[2].ends_with(",4"));
    assert!(sink.file_for("app.size").exists());
}

#[test]
fn csv_location_must_be_a_directory() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("plain");
    std::fs::write(&file, b"x").unwrap();
    let err = CsvSink::new(&file).expect_err("must fail");
    assert_eq!(err.code(), ErrorCode::ReporterBuild);
}

#[test]
fn required_fields_are_build_errors() {
    let r = registry();
    let csv = CsvConfig {
        enabled: true,
        ..Default::default()
    };
    let err = csv.build(Arc::clone(&r), MetricFilter::all()).expect_err("must fail");
    assert_eq!(err.code(), ErrorCode::ReporterBuild);

    let log = LogConfig {
        enabled: true,
        logger: Some("  ".into()),
        ..Default::default()
    };
    let err = log.build(Arc::clone(&r), MetricFilter::all()).expect_err("must fail");
    assert_eq!(err.code(), ErrorCode::ReporterBuild);

    let intro = IntrospectionConfig {
        enabled: true,
        listen: "not-an-addr".into(),
        ..Default::default()
    };
    let err = intro.build(r, MetricFilter::all()).expect_err("must fail");
    assert_eq!(err.code(), ErrorCode::ReporterBuild);
}

#[test]
fn invalid_regex_filter_is_a_build_error() {
    let cfg = LogConfig {
        enabled: true,
        logger: Some("metrics".into()),
        filter: FilterConfig {
            includes: vec!["db.(".into()],
            excludes: vec![],
            use_regex_filters: true,
        },
        ..Default::default()
    };
    let err = cfg.filter().expect_err("must fail");
    assert_eq!(err.code(), ErrorCode::ReporterBuild);
}

#[test]
fn console_and_exposition_render_samples() {
    let r = registry();
    let samples = r.samples(|_| true);

    let table = ConsoleSink::render(&samples, chrono::Utc::now());
    assert!(table.contains("app.requests"));
    assert!(table.contains("count=3"));

    let text = render(&samples);
    assert!(text.contains("# TYPE app_requests counter\napp_requests 3"));
    assert!(text.contains("app_load 0.5"));
    assert!(text.contains("app_size_count 1"));
}

#[test]
fn exposition_names_never_start_with_a_digit() {
    let r = Arc::new(MetricRegistry::builder().build());
    r.counter("5xx.errors", &[Level::Info]).unwrap().inc();
    let text = render(&r.samples(|_| true));
    assert!(text.contains("# TYPE _5xx_errors counter\n_5xx_errors 1"), "{text}");
}

#[tokio::test]
async fn introspection_serves_text_and_json() {
    let r = registry();
    let filter = MetricFilter::new(&[], &["app.load".into()], false).unwrap();
    let listener = IntrospectionListener::new("127.0.0.1:0".parse().unwrap(), "/metrics", r, filter);
    assert!(listener.local_addr().is_none());
    listener.open().await.unwrap();
    let addr = listener.local_addr().expect("bound address");

    let resp = reqwest::get(format!("http://{addr}/metrics")).await.unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    let content_type = resp.headers()[reqwest::header::CONTENT_TYPE].to_str().unwrap().to_owned();
    assert!(content_type.starts_with("text/plain"), "{content_type}");
    let body = resp.text().await.unwrap();
    assert!(body.contains("app_requests 3"), "{body}");
    assert!(!body.contains("app_load"), "{body}");

    let body = reqwest::get(format!("http://{addr}/metrics.json"))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    let names: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["app.requests", "app.size"]);
    assert_eq!(json[0]["value"]["count"], 3);

    let missing = reqwest::get(format!("http://{addr}/other")).await.unwrap();
    assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);

    listener.close().await;
    assert!(listener.local_addr().is_none());
    assert!(reqwest::get(format!("http://{addr}/metrics")).await.is_err());
}

#[tokio::test]
async fn introspection_is_a_listening_reporter() {
    let r = registry();
    let m = ReporterManager::new(Arc::clone(&r));
    let cfg = IntrospectionConfig {
        enabled: true,
        listen: "127.0.0.1:0".into(),
        ..Default::default()
    };
    m.add_reporter(&cfg).await.unwrap();
    assert_eq!(m.reporter_kind("introspection").unwrap(), ReporterKind::Listening);
    assert!(m.is_reporter_running("introspection"));

    m.report("introspection").await.unwrap();
    m.stop_reporter("introspection").await.unwrap();
    assert!(!m.is_reporter_running("introspection"));
    m.start_reporter("introspection").await.unwrap();
    assert!(m.is_reporter_running("introspection"));
    m.stop_reporters().await;
}

#[tokio::test]
async fn service_wires_history_from_config() {
    let cfg = config::load_from_str(
        r#"
version: 1
levels:
  root_level: debug
reporting:
  history:
    enabled: true
    source: node-1
    polling_period_secs: 3600
  csv:
    enabled: true
"#,
    )
    .unwrap();
    let metrics = Metrics::new(cfg).await.unwrap();
    let mgmt = metrics.management();

    // csv has no location, so it is skipped rather than failing the service.
    assert_eq!(
        mgmt.reporter_names(),
        vec!["console", "history", "introspection", "log"]
    );
    assert!(!mgmt.is_enabled());

    metrics.activate().await;
    assert!(mgmt.is_reporter_running("history"));
    assert!(!mgmt.is_reporter_running("console"));

    metrics
        .registry()
        .counter("jobs.done", &[Level::Debug])
        .unwrap()
        .inc();
    mgmt.report_to("history").await.unwrap();

    let records = metrics.history().records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "jobs.done");
    assert_eq!(records[0].source, "node-1");
    assert_eq!(records[0].value["count"], 1);
    assert_eq!(metrics.history().len(), 1);

    metrics.deactivate().await;
    assert!(!mgmt.is_reporter_running("history"));
}
