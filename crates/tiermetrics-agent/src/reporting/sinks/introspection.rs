//! Live introspection endpoint.
//!
//! While registered, an HTTP listener serves the active metrics:
//! - `{path}`      : text exposition format
//! - `{path}.json` : samples as JSON

use std::fmt::Write;
use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use tiermetrics_core::registry::{DistributionSample, MetricSample, SampleValue};
use tiermetrics_core::{MetricRegistry, MetricsError, Result};

use crate::config::IntrospectionConfig;
use crate::reporting::sinks::filter_of;
use crate::reporting::task::STOP_GRACE;
use crate::reporting::{Listener, MetricFilter, Reporter, ReporterBuilder};

struct View {
    source: Arc<MetricRegistry>,
    filter: MetricFilter,
}

impl View {
    fn samples(&self) -> Vec<MetricSample> {
        self.source.samples(|name| self.filter.matches(name))
    }
}

struct Serving {
    addr: SocketAddr,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

pub struct IntrospectionListener {
    listen: SocketAddr,
    path: String,
    view: Arc<View>,
    serving: Mutex<Option<Serving>>,
}

impl IntrospectionListener {
    pub fn new(listen: SocketAddr, path: impl Into<String>, source: Arc<MetricRegistry>, filter: MetricFilter) -> Self {
        Self {
            listen,
            path: path.into(),
            view: Arc::new(View { source, filter }),
            serving: Mutex::new(None),
        }
    }

    /// Bound address while open; useful when listening on port 0.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.serving.lock().as_ref().map(|s| s.addr)
    }

    fn router(&self) -> Router {
        Router::new()
            .route(&self.path, get(metrics_text))
            .route(&format!("{}.json", self.path), get(metrics_json))
            .with_state(Arc::clone(&self.view))
    }
}

#[async_trait]
impl Listener for IntrospectionListener {
    async fn open(&self) -> Result<()> {
        if self.serving.lock().is_some() {
            return Ok(());
        }
        let listener = tokio::net::TcpListener::bind(self.listen)
            .await
            .map_err(|e| MetricsError::Export(format!("bind {} failed: {e}", self.listen)))?;
        let addr = listener
            .local_addr()
            .map_err(|e| MetricsError::Internal(format!("local addr: {e}")))?;

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let app = self.router();
        let handle = tokio::spawn(async move {
            let shutdown = async move { token.cancelled().await };
            if let Err(e) = axum::serve(listener, app).with_graceful_shutdown(shutdown).await {
                tracing::warn!(error = %e, "introspection server failed");
            }
        });

        tracing::info!(%addr, path = %self.path, "introspection endpoint listening");
        *self.serving.lock() = Some(Serving { addr, cancel, handle });
        Ok(())
    }

    async fn close(&self) {
        let Some(serving) = self.serving.lock().take() else {
            return;
        };
        serving.cancel.cancel();
        let mut handle = serving.handle;
        if tokio::time::timeout(STOP_GRACE, &mut handle).await.is_err() {
            tracing::warn!(addr = %serving.addr, "introspection server did not drain, aborting");
            handle.abort();
        }
    }
}

async fn metrics_text(State(view): State<Arc<View>>) -> Response {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4; charset=utf-8")],
        render(&view.samples()),
    )
        .into_response()
}

async fn metrics_json(State(view): State<Arc<View>>) -> Json<Vec<MetricSample>> {
    Json(view.samples())
}

/// Exposition names may not start with a digit.
fn exposition_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 1);
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        out.push('_');
    }
    out.extend(name.chars().map(|c| if c.is_ascii_alphanumeric() { c } else { '_' }));
    out
}

fn render_summary(out: &mut String, name: &str, d: &DistributionSample) {
    let _ = writeln!(out, "# TYPE {name} summary");
    for (q, v) in [
        ("0.5", d.p50),
        ("0.75", d.p75),
        ("0.95", d.p95),
        ("0.98", d.p98),
        ("0.99", d.p99),
        ("0.999", d.p999),
    ] {
        let _ = writeln!(out, "{name}{{quantile=\"{q}\"}} {v}");
    }
    let _ = writeln!(out, "{name}_count {}", d.count);
}

/// Render samples in text exposition format.
pub fn render(samples: &[MetricSample]) -> String {
    let mut out = String::new();
    for sample in samples {
        let name = exposition_name(&sample.name);
        match &sample.value {
            SampleValue::Counter { count } => {
                let _ = writeln!(out, "# TYPE {name} counter\n{name} {count}");
            }
            SampleValue::Gauge { value } => {
                let _ = writeln!(out, "# TYPE {name} gauge\n{name} {value}");
            }
            SampleValue::Meter(r) => {
                let _ = writeln!(out, "# TYPE {name}_total counter\n{name}_total {}", r.count);
                let _ = writeln!(out, "# TYPE {name}_m1_rate gauge\n{name}_m1_rate {}", r.m1_rate);
            }
            SampleValue::Histogram(d) => render_summary(&mut out, &name, d),
            SampleValue::Timer { rates, durations } => {
                render_summary(&mut out, &format!("{name}_ms"), durations);
                let _ = writeln!(out, "# TYPE {name}_m1_rate gauge\n{name}_m1_rate {}", rates.m1_rate);
            }
        }
    }
    out
}

impl ReporterBuilder for IntrospectionConfig {
    fn name(&self) -> &str {
        &self.name
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }

    fn filter(&self) -> Result<MetricFilter> {
        filter_of(&self.filter)
    }

    fn build(&self, source: Arc<MetricRegistry>, filter: MetricFilter) -> Result<Reporter> {
        let listen: SocketAddr = self.listen.parse().map_err(|e| {
            MetricsError::ReporterBuild(format!("{}: invalid listen address {}: {e}", self.name, self.listen))
        })?;
        if !self.path.starts_with('/') {
            return Err(MetricsError::ReporterBuild(format!(
                "{}: path must start with '/'",
                self.name
            )));
        }
        let listener = IntrospectionListener::new(listen, self.path.clone(), source, filter);
        Ok(Reporter::listening(self.name.clone(), Arc::new(listener)))
    }
}
