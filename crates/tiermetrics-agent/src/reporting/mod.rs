//! Reporters: named exporters of registry state.
//!
//! A reporter is either *scheduled* (a fixed-period export loop around a
//! [`Sink`]) or *listening* (a [`Listener`] that serves registry state on
//! demand). Both share the same start/stop/is-running surface. A reporter
//! built from a disabled configuration is a placeholder that refuses to be
//! operated.

pub mod filter;
pub mod manager;
pub mod sinks;
pub mod task;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use tiermetrics_core::registry::MetricSample;
use tiermetrics_core::{MetricRegistry, MetricsError, Result};

pub use filter::MetricFilter;
pub use manager::ReporterManager;
pub use task::{ScheduledTask, Task};

/// Destination of a scheduled export.
#[async_trait]
pub trait Sink: Send + Sync + 'static {
    async fn export(&self, samples: &[MetricSample]) -> Result<()>;

    /// Periodic job started and stopped together with the reporter.
    fn companion(&self) -> Option<(Arc<dyn Task>, Duration)> {
        None
    }
}

/// Endpoint that serves registry state while registered.
#[async_trait]
pub trait Listener: Send + Sync + 'static {
    async fn open(&self) -> Result<()>;
    async fn close(&self);
}

/// Factory for a reporter, implemented by each sink configuration.
pub trait ReporterBuilder: Send + Sync {
    fn name(&self) -> &str;

    fn is_enabled(&self) -> bool;

    fn filter(&self) -> Result<MetricFilter> {
        Ok(MetricFilter::all())
    }

    fn build(&self, source: Arc<MetricRegistry>, filter: MetricFilter) -> Result<Reporter>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReporterKind {
    Scheduled,
    Listening,
    Disabled,
}

enum Mode {
    Disabled,
    Scheduled { export: Arc<Export>, period: Duration },
    Listening(Arc<dyn Listener>),
}

/// One export pass, shared by the schedule and on-demand reports.
struct Export {
    reporter: String,
    sink: Arc<dyn Sink>,
    source: Arc<MetricRegistry>,
    filter: MetricFilter,
    // Serializes scheduled and on-demand exports against the sink.
    lock: Mutex<()>,
}

impl Export {
    async fn run_once(&self) -> Result<()> {
        let _guard = self.lock.lock().await;
        let samples = self.source.samples(|name| self.filter.matches(name));
        self.sink.export(&samples).await
    }
}

#[async_trait]
impl Task for Export {
    fn name(&self) -> &str {
        &self.reporter
    }

    async fn run(&self) -> Result<()> {
        self.run_once().await
    }
}

pub struct Reporter {
    name: String,
    mode: Mode,
    running: AtomicBool,
    tasks: Mutex<Vec<ScheduledTask>>,
}

impl Reporter {
    pub fn scheduled(
        name: impl Into<String>,
        sink: Arc<dyn Sink>,
        source: Arc<MetricRegistry>,
        filter: MetricFilter,
        period: Duration,
    ) -> Self {
        let name = name.into();
        let export = Arc::new(Export {
            reporter: name.clone(),
            sink,
            source,
            filter,
            lock: Mutex::new(()),
        });
        Self::with_mode(name, Mode::Scheduled { export, period })
    }

    pub fn listening(name: impl Into<String>, listener: Arc<dyn Listener>) -> Self {
        Self::with_mode(name.into(), Mode::Listening(listener))
    }

    /// Placeholder for a disabled configuration.
    pub fn disabled(name: impl Into<String>) -> Self {
        Self::with_mode(name.into(), Mode::Disabled)
    }

    fn with_mode(name: String, mode: Mode) -> Self {
        Self {
            name,
            mode,
            running: AtomicBool::new(false),
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> ReporterKind {
        match self.mode {
            Mode::Disabled => ReporterKind::Disabled,
            Mode::Scheduled { .. } => ReporterKind::Scheduled,
            Mode::Listening(_) => ReporterKind::Listening,
        }
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self.mode, Mode::Disabled)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn ensure_enabled(&self, op: &str) -> Result<()> {
        if self.is_enabled() {
            Ok(())
        } else {
            Err(MetricsError::IllegalState(format!(
                "cannot {op} reporter {}: it is disabled",
                self.name
            )))
        }
    }

    /// Start exporting. Starting a running reporter is a no-op.
    pub async fn start(&self) -> Result<()> {
        self.ensure_enabled("start")?;
        let mut tasks = self.tasks.lock().await;
        if self.is_running() {
            return Ok(());
        }
        match &self.mode {
            Mode::Disabled => {}
            Mode::Scheduled { export, period } => {
                tasks.push(ScheduledTask::start(Arc::clone(export) as Arc<dyn Task>, *period));
                if let Some((job, every)) = export.sink.companion() {
                    tasks.push(ScheduledTask::start(job, every));
                }
            }
            Mode::Listening(listener) => listener.open().await?,
        }
        self.running.store(true, Ordering::Release);
        tracing::info!(reporter = %self.name, kind = ?self.kind(), "reporter started");
        Ok(())
    }

    /// Stop exporting. Stopping a stopped reporter is a no-op.
    pub async fn stop(&self) -> Result<()> {
        self.ensure_enabled("stop")?;
        self.shutdown().await;
        Ok(())
    }

    /// Stop without the disabled check; used on replacement and removal.
    pub(crate) async fn shutdown(&self) {
        let mut tasks = self.tasks.lock().await;
        if !self.is_running() {
            return;
        }
        for task in tasks.drain(..) {
            task.stop().await;
        }
        if let Mode::Listening(listener) = &self.mode {
            listener.close().await;
        }
        self.running.store(false, Ordering::Release);
        tracing::info!(reporter = %self.name, "reporter stopped");
    }

    /// Export now, outside the schedule. Only running scheduled reporters export.
    pub async fn report(&self) -> Result<()> {
        self.ensure_enabled("report on")?;
        match &self.mode {
            Mode::Scheduled { export, .. } if self.is_running() => export.run_once().await,
            _ => Ok(()),
        }
    }
}

impl std::fmt::Debug for Reporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reporter")
            .field("name", &self.name)
            .field("kind", &self.kind())
            .field("running", &self.is_running())
            .finish()
    }
}
