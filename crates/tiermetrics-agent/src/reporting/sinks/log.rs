//! Metric lines written through `tracing`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use tiermetrics_core::registry::MetricSample;
use tiermetrics_core::{MetricRegistry, MetricsError, Result};

use crate::config::LogConfig;
use crate::reporting::sinks::{describe, filter_of};
use crate::reporting::{MetricFilter, Reporter, ReporterBuilder, Sink};

#[derive(Debug)]
pub struct LogSink {
    logger: String,
}

impl LogSink {
    pub fn new(logger: impl Into<String>) -> Self {
        Self { logger: logger.into() }
    }
}

#[async_trait]
impl Sink for LogSink {
    async fn export(&self, samples: &[MetricSample]) -> Result<()> {
        for sample in samples {
            tracing::info!(
                logger = %self.logger,
                metric = %sample.name,
                kind = %sample.kind,
                "{}",
                describe(sample)
            );
        }
        Ok(())
    }
}

impl ReporterBuilder for LogConfig {
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
        let logger = match self.logger.as_deref().map(str::trim) {
            Some(l) if !l.is_empty() => l.to_owned(),
            _ => {
                return Err(MetricsError::ReporterBuild(format!(
                    "{}: logger name is required",
                    self.name
                )))
            }
        };
        Ok(Reporter::scheduled(
            self.name.clone(),
            Arc::new(LogSink::new(logger)),
            source,
            filter,
            Duration::from_secs(self.polling_period_secs),
        ))
    }
}
