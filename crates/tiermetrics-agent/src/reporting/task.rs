//! Fixed-period background task.
//!
//! `ScheduledTask` runs a [`Task`] every `period`, first run one period after
//! start. Periods are clamped to between 1ms and 30 days. Stopping cancels
//! the loop, gives an in-flight run [`STOP_GRACE`] to finish, then aborts it.
//! Stop never fails.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use tiermetrics_core::Result;

pub const STOP_GRACE: Duration = Duration::from_secs(1);

const MIN_PERIOD: Duration = Duration::from_millis(1);
const MAX_PERIOD: Duration = Duration::from_secs(30 * 86_400);

#[async_trait]
pub trait Task: Send + Sync + 'static {
    fn name(&self) -> &str;

    /// One run. Errors are logged and the schedule continues.
    async fn run(&self) -> Result<()>;
}

pub struct ScheduledTask {
    name: String,
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl ScheduledTask {
    /// Spawn the loop on the current runtime.
    pub fn start(task: Arc<dyn Task>, period: Duration) -> Self {
        let period = period.clamp(MIN_PERIOD, MAX_PERIOD);
        let name = task.name().to_owned();
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            let now = Instant::now();
            let first = now.checked_add(period).unwrap_or(now);
            let mut ticker = tokio::time::interval_at(first, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {}
                }
                let span = tracing::debug_span!("scheduled_task", task = %task.name());
                if let Err(e) = task.run().instrument(span).await {
                    tracing::warn!(task = %task.name(), error = %e, "scheduled run failed");
                }
            }
        });

        tracing::debug!(task = %name, period_ms = period.as_millis() as u64, "scheduled task started");
        Self {
            name,
            cancel,
            handle: Some(handle),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }

    pub async fn stop(mut self) {
        self.cancel.cancel();
        let Some(mut handle) = self.handle.take() else {
            return;
        };
        match tokio::time::timeout(STOP_GRACE, &mut handle).await {
            Ok(Ok(())) => tracing::debug!(task = %self.name, "scheduled task stopped"),
            Ok(Err(e)) => tracing::warn!(task = %self.name, error = %e, "scheduled task ended abnormally"),
            Err(_) => {
                tracing::warn!(task = %self.name, grace_ms = STOP_GRACE.as_millis() as u64, "run still in flight, aborting");
                handle.abort();
            }
        }
    }
}

impl Drop for ScheduledTask {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
