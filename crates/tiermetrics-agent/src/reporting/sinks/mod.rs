//! Built-in sinks and the reporter builders for their configuration sections.

pub mod console;
pub mod csv;
pub mod history;
pub mod introspection;
pub mod log;

use std::fmt::Write;

use tiermetrics_core::registry::{MetricSample, SampleValue};
use tiermetrics_core::Result;

use crate::config::FilterConfig;
use crate::reporting::MetricFilter;

pub use console::ConsoleSink;
pub use csv::CsvSink;
pub use history::{CleanupTask, HistoryRecord, HistoryReporterBuilder, HistorySink, HistoryStore, MemoryHistoryStore};
pub use introspection::IntrospectionListener;
pub use log::LogSink;

pub(crate) fn filter_of(cfg: &FilterConfig) -> Result<MetricFilter> {
    MetricFilter::new(&cfg.includes, &cfg.excludes, cfg.use_regex_filters)
}

/// `key=value` pairs for one sample, shared by the line-oriented sinks.
pub(crate) fn describe(sample: &MetricSample) -> String {
    let mut out = String::new();
    match &sample.value {
        SampleValue::Counter { count } => {
            let _ = write!(out, "count={count}");
        }
        SampleValue::Gauge { value } => {
            let _ = write!(out, "value={value}");
        }
        SampleValue::Meter(r) => {
            let _ = write!(
                out,
                "count={} mean_rate={:.3} m1={:.3} m5={:.3} m15={:.3}",
                r.count, r.mean_rate, r.m1_rate, r.m5_rate, r.m15_rate
            );
        }
        SampleValue::Histogram(d) => {
            let _ = write!(
                out,
                "count={} min={} max={} mean={:.3} stddev={:.3} p50={} p75={} p95={} p98={} p99={} p999={}",
                d.count, d.min, d.max, d.mean, d.stddev, d.p50, d.p75, d.p95, d.p98, d.p99, d.p999
            );
        }
        SampleValue::Timer { rates, durations: d } => {
            let _ = write!(
                out,
                "count={} mean_rate={:.3} m1={:.3} min_ms={:.3} max_ms={:.3} mean_ms={:.3} p50_ms={:.3} p99_ms={:.3}",
                rates.count, rates.mean_rate, rates.m1_rate, d.min, d.max, d.mean, d.p50, d.p99
            );
        }
    }
    out
}
