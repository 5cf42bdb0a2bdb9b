//! One CSV file per metric, a row appended per export.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio::io::AsyncWriteExt;

use tiermetrics_core::registry::{MetricSample, SampleValue};
use tiermetrics_core::{MetricRegistry, MetricsError, Result};

use crate::config::CsvConfig;
use crate::reporting::sinks::filter_of;
use crate::reporting::{MetricFilter, Reporter, ReporterBuilder, Sink};

const DISTRIBUTION_HEADER: &str = "count,min,max,mean,stddev,p50,p75,p95,p98,p99,p999";
const RATE_HEADER: &str = "count,mean_rate,m1_rate,m5_rate,m15_rate";

#[derive(Debug)]
pub struct CsvSink {
    dir: PathBuf,
}

impl CsvSink {
    /// Create `dir` if needed. Fails when it exists but is not a directory.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        if dir.exists() && !dir.is_dir() {
            return Err(MetricsError::ReporterBuild(format!(
                "csv location is not a directory: {}",
                dir.display()
            )));
        }
        std::fs::create_dir_all(&dir).map_err(|e| {
            MetricsError::ReporterBuild(format!("cannot create csv location {}: {e}", dir.display()))
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn file_for(&self, metric: &str) -> PathBuf {
        self.dir.join(format!("{metric}.csv"))
    }

    fn header(value: &SampleValue) -> String {
        match value {
            SampleValue::Counter { .. } => "t,count".into(),
            SampleValue::Gauge { .. } => "t,value".into(),
            SampleValue::Meter(_) => format!("t,{RATE_HEADER}"),
            SampleValue::Histogram(_) => format!("t,{DISTRIBUTION_HEADER}"),
            SampleValue::Timer { .. } => format!("t,{DISTRIBUTION_HEADER},mean_rate,m1_rate,m5_rate,m15_rate"),
        }
    }

    fn row(t: i64, value: &SampleValue) -> String {
        match value {
            SampleValue::Counter { count } => format!("{t},{count}"),
            SampleValue::Gauge { value } => format!("{t},{value}"),
            SampleValue::Meter(r) => format!(
                "{t},{},{},{},{},{}",
                r.count, r.mean_rate, r.m1_rate, r.m5_rate, r.m15_rate
            ),
            SampleValue::Histogram(d) => format!(
                "{t},{},{},{},{},{},{},{},{},{},{},{}",
                d.count, d.min, d.max, d.mean, d.stddev, d.p50, d.p75, d.p95, d.p98, d.p99, d.p999
            ),
            SampleValue::Timer { rates: r, durations: d } => format!(
                "{t},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
                d.count, d.min, d.max, d.mean, d.stddev, d.p50, d.p75, d.p95, d.p98, d.p99, d.p999,
                r.mean_rate, r.m1_rate, r.m5_rate, r.m15_rate
            ),
        }
    }

    async fn append(&self, sample: &MetricSample, t: i64) -> std::io::Result<()> {
        let path = self.file_for(&sample.name);
        let fresh = !tokio::fs::try_exists(&path).await.unwrap_or(false);
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        let mut text = String::new();
        if fresh {
            text.push_str(&Self::header(&sample.value));
            text.push('\n');
        }
        text.push_str(&Self::row(t, &sample.value));
        text.push('\n');
        file.write_all(text.as_bytes()).await?;
        file.flush().await
    }
}

#[async_trait]
impl Sink for CsvSink {
    async fn export(&self, samples: &[MetricSample]) -> Result<()> {
        let t = Utc::now().timestamp();
        let mut failed = 0usize;
        for sample in samples {
            if let Err(e) = self.append(sample, t).await {
                failed += 1;
                tracing::warn!(metric = %sample.name, error = %e, "csv append failed");
            }
        }
        if failed > 0 {
            return Err(MetricsError::Export(format!("{failed} csv file(s) not written")));
        }
        Ok(())
    }
}

impl ReporterBuilder for CsvConfig {
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
        let location = self.location.as_ref().ok_or_else(|| {
            MetricsError::ReporterBuild(format!("{}: location is required", self.name))
        })?;
        Ok(Reporter::scheduled(
            self.name.clone(),
            Arc::new(CsvSink::new(location)?),
            source,
            filter,
            Duration::from_secs(self.polling_period_secs),
        ))
    }
}
