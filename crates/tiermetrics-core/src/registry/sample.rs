//! Point-in-time values read from the registry for export.

use serde::Serialize;

use crate::level::Level;
use crate::measure::{Meter, MetricKind};
use crate::registry::node::Metric;
use crate::reservoir::Snapshot;

const NANOS_PER_MILLI: f64 = 1_000_000.0;

#[derive(Debug, Clone, Serialize)]
pub struct MetricSample {
    pub name: String,
    pub kind: MetricKind,
    pub level: Level,
    pub value: SampleValue,
}

#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum SampleValue {
    Counter {
        count: i64,
    },
    Meter(RateSample),
    Histogram(DistributionSample),
    /// Durations are in milliseconds.
    Timer {
        rates: RateSample,
        durations: DistributionSample,
    },
    Gauge {
        value: f64,
    },
}

/// Rates are events per second.
#[derive(Debug, Clone, Serialize)]
pub struct RateSample {
    pub count: u64,
    pub mean_rate: f64,
    pub m1_rate: f64,
    pub m5_rate: f64,
    pub m15_rate: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DistributionSample {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub stddev: f64,
    pub p50: f64,
    pub p75: f64,
    pub p95: f64,
    pub p98: f64,
    pub p99: f64,
    pub p999: f64,
}

impl RateSample {
    fn of(meter: &Meter) -> Self {
        Self {
            count: meter.count(),
            mean_rate: meter.mean_rate(),
            m1_rate: meter.one_minute_rate(),
            m5_rate: meter.five_minute_rate(),
            m15_rate: meter.fifteen_minute_rate(),
        }
    }
}

impl DistributionSample {
    fn of(count: u64, s: &Snapshot, scale: f64) -> Self {
        Self {
            count,
            min: s.min() as f64 / scale,
            max: s.max() as f64 / scale,
            mean: s.mean() / scale,
            stddev: s.stddev() / scale,
            p50: s.median() / scale,
            p75: s.p75() / scale,
            p95: s.p95() / scale,
            p98: s.percentile(0.98) / scale,
            p99: s.p99() / scale,
            p999: s.p999() / scale,
        }
    }
}

impl MetricSample {
    pub(crate) fn of(metric: &Metric) -> Self {
        let (level, value) = match metric {
            Metric::Counter(n) => (
                n.effective_level(),
                SampleValue::Counter {
                    count: n.measure().count(),
                },
            ),
            Metric::Meter(n) => (n.effective_level(), SampleValue::Meter(RateSample::of(n.measure()))),
            Metric::Histogram(n) => {
                let h = n.measure();
                (
                    n.effective_level(),
                    SampleValue::Histogram(DistributionSample::of(h.count(), &h.snapshot(), 1.0)),
                )
            }
            Metric::Timer(n) => {
                let t = n.measure();
                (
                    n.effective_level(),
                    SampleValue::Timer {
                        rates: RateSample::of(t.meter()),
                        durations: DistributionSample::of(t.count(), &t.snapshot(), NANOS_PER_MILLI),
                    },
                )
            }
            Metric::Gauge(n) => (
                n.effective_level(),
                SampleValue::Gauge {
                    value: n.measure().value(),
                },
            ),
        };
        Self {
            name: metric.name().to_owned(),
            kind: metric.kind(),
            level,
            value,
        }
    }
}
