//! Table printed to stdout.

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::io::AsyncWriteExt;

use tiermetrics_core::registry::MetricSample;
use tiermetrics_core::{MetricRegistry, MetricsError, Result};

use crate::config::ConsoleConfig;
use crate::reporting::sinks::{describe, filter_of};
use crate::reporting::{MetricFilter, Reporter, ReporterBuilder, Sink};

#[derive(Debug, Default)]
pub struct ConsoleSink;

impl ConsoleSink {
    pub fn render(samples: &[MetricSample], at: chrono::DateTime<Utc>) -> String {
        let mut out = String::new();
        let header = format!("-- {} ", at.format("%Y-%m-%d %H:%M:%S%.3f UTC"));
        let _ = writeln!(out, "{header:-<80}");
        for sample in samples {
            let _ = writeln!(out, "{:<50} {:<9} {}", sample.name, sample.kind, describe(sample));
        }
        out
    }
}

#[async_trait]
impl Sink for ConsoleSink {
    async fn export(&self, samples: &[MetricSample]) -> Result<()> {
        let text = Self::render(samples, Utc::now());
        let mut stdout = tokio::io::stdout();
        stdout
            .write_all(text.as_bytes())
            .await
            .map_err(|e| MetricsError::Export(format!("console write failed: {e}")))?;
        stdout
            .flush()
            .await
            .map_err(|e| MetricsError::Export(format!("console flush failed: {e}")))
    }
}

impl ReporterBuilder for ConsoleConfig {
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
        Ok(Reporter::scheduled(
            self.name.clone(),
            Arc::new(ConsoleSink),
            source,
            filter,
            Duration::from_secs(self.polling_period_secs),
        ))
    }
}
