//! Statistical reservoirs backing histograms and timers.
//!
//! A reservoir accepts values and produces a [`Snapshot`] with count, min,
//! max, mean, standard deviation and percentiles. Which reservoir a registry
//! hands out is decided once, by [`ReservoirSettings`].

use std::collections::VecDeque;
use std::sync::Arc;

use hdrhistogram::Histogram;
use parking_lot::Mutex;
use rand::Rng;
use serde::Deserialize;

use crate::error::{MetricsError, Result};

pub trait Reservoir: Send + Sync {
    fn update(&self, value: i64);
    fn snapshot(&self) -> Snapshot;
}

/// Point-in-time view of a reservoir.
#[derive(Debug, Clone)]
pub struct Snapshot {
    inner: SnapshotInner,
}

#[derive(Debug, Clone)]
enum SnapshotInner {
    Hdr(Histogram<u64>),
    Sorted(Vec<i64>),
}

impl Snapshot {
    fn hdr(h: Histogram<u64>) -> Self {
        Self {
            inner: SnapshotInner::Hdr(h),
        }
    }

    fn sorted(mut values: Vec<i64>) -> Self {
        values.sort_unstable();
        Self {
            inner: SnapshotInner::Sorted(values),
        }
    }

    pub fn count(&self) -> u64 {
        match &self.inner {
            SnapshotInner::Hdr(h) => h.len(),
            SnapshotInner::Sorted(v) => v.len() as u64,
        }
    }

    pub fn min(&self) -> i64 {
        match &self.inner {
            SnapshotInner::Hdr(h) if h.is_empty() => 0,
            SnapshotInner::Hdr(h) => h.min() as i64,
            SnapshotInner::Sorted(v) => v.first().copied().unwrap_or(0),
        }
    }

    pub fn max(&self) -> i64 {
        match &self.inner {
            SnapshotInner::Hdr(h) if h.is_empty() => 0,
            SnapshotInner::Hdr(h) => h.max() as i64,
            SnapshotInner::Sorted(v) => v.last().copied().unwrap_or(0),
        }
    }

    pub fn mean(&self) -> f64 {
        match &self.inner {
            SnapshotInner::Hdr(h) if h.is_empty() => 0.0,
            SnapshotInner::Hdr(h) => h.mean(),
            SnapshotInner::Sorted(v) if v.is_empty() => 0.0,
            SnapshotInner::Sorted(v) => v.iter().map(|x| *x as f64).sum::<f64>() / v.len() as f64,
        }
    }

    pub fn stddev(&self) -> f64 {
        match &self.inner {
            SnapshotInner::Hdr(h) if h.is_empty() => 0.0,
            SnapshotInner::Hdr(h) => h.stdev(),
            SnapshotInner::Sorted(v) if v.len() < 2 => 0.0,
            SnapshotInner::Sorted(v) => {
                let mean = self.mean();
                let sum: f64 = v.iter().map(|x| (*x as f64 - mean).powi(2)).sum();
                (sum / (v.len() - 1) as f64).sqrt()
            }
        }
    }

    /// Value at quantile `q`, where `q` is in `[0, 1]`.
    pub fn percentile(&self, q: f64) -> f64 {
        let q = if q.is_nan() { 0.0 } else { q.clamp(0.0, 1.0) };
        match &self.inner {
            SnapshotInner::Hdr(h) if h.is_empty() => 0.0,
            SnapshotInner::Hdr(h) => h.value_at_quantile(q) as f64,
            SnapshotInner::Sorted(v) => {
                if v.is_empty() {
                    return 0.0;
                }
                let pos = q * (v.len() + 1) as f64;
                if pos < 1.0 {
                    return v[0] as f64;
                }
                if pos >= v.len() as f64 {
                    return v[v.len() - 1] as f64;
                }
                let lower = v[pos as usize - 1] as f64;
                let upper = v[pos as usize] as f64;
                lower + (pos - pos.floor()) * (upper - lower)
            }
        }
    }

    pub fn median(&self) -> f64 {
        self.percentile(0.5)
    }

    pub fn p75(&self) -> f64 {
        self.percentile(0.75)
    }

    pub fn p95(&self) -> f64 {
        self.percentile(0.95)
    }

    pub fn p99(&self) -> f64 {
        self.percentile(0.99)
    }

    pub fn p999(&self) -> f64 {
        self.percentile(0.999)
    }
}

fn new_histogram(significant_digits: u8) -> Result<Histogram<u64>> {
    Histogram::new(significant_digits)
        .map_err(|e| MetricsError::Internal(format!("hdr histogram: {e:?}")))
}

/// HDR histogram holding every value recorded since creation.
///
/// Negative values are recorded as zero; values past the trackable range
/// saturate at its highest bucket.
pub struct HdrReservoir {
    histogram: Mutex<Histogram<u64>>,
}

impl HdrReservoir {
    pub fn new(significant_digits: u8) -> Result<Self> {
        Ok(Self {
            histogram: Mutex::new(new_histogram(significant_digits)?),
        })
    }
}

impl Reservoir for HdrReservoir {
    fn update(&self, value: i64) {
        self.histogram.lock().saturating_record(value.max(0) as u64);
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot::hdr(self.histogram.lock().clone())
    }
}

/// HDR histogram whose snapshot covers only values recorded since the previous snapshot.
pub struct HdrResetOnSnapshotReservoir {
    histogram: Mutex<Histogram<u64>>,
}

impl HdrResetOnSnapshotReservoir {
    pub fn new(significant_digits: u8) -> Result<Self> {
        Ok(Self {
            histogram: Mutex::new(new_histogram(significant_digits)?),
        })
    }
}

impl Reservoir for HdrResetOnSnapshotReservoir {
    fn update(&self, value: i64) {
        self.histogram.lock().saturating_record(value.max(0) as u64);
    }

    fn snapshot(&self) -> Snapshot {
        let mut h = self.histogram.lock();
        let interval = h.clone();
        h.reset();
        Snapshot::hdr(interval)
    }
}

/// Keeps the last `size` values.
pub struct SlidingWindowReservoir {
    size: usize,
    values: Mutex<VecDeque<i64>>,
}

impl SlidingWindowReservoir {
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            size,
            values: Mutex::new(VecDeque::with_capacity(size)),
        }
    }
}

impl Reservoir for SlidingWindowReservoir {
    fn update(&self, value: i64) {
        let mut values = self.values.lock();
        if values.len() == self.size {
            values.pop_front();
        }
        values.push_back(value);
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot::sorted(self.values.lock().iter().copied().collect())
    }
}

/// Uniform random sample of `size` values over the whole stream (Vitter's algorithm R).
pub struct UniformReservoir {
    size: usize,
    state: Mutex<UniformState>,
}

struct UniformState {
    seen: u64,
    values: Vec<i64>,
}

impl UniformReservoir {
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            size,
            state: Mutex::new(UniformState {
                seen: 0,
                values: Vec::with_capacity(size),
            }),
        }
    }
}

impl Reservoir for UniformReservoir {
    fn update(&self, value: i64) {
        let mut state = self.state.lock();
        state.seen += 1;
        if state.values.len() < self.size {
            state.values.push(value);
            return;
        }
        let slot = rand::thread_rng().gen_range(0..state.seen);
        if let Some(v) = state.values.get_mut(slot as usize) {
            *v = value;
        }
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot::sorted(self.state.lock().values.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ReservoirKind {
    #[default]
    HdrHistogram,
    HdrHistogramResetOnSnapshot,
    SlidingWindow,
    Uniform,
}

/// Which reservoir new histograms and timers get.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservoirSettings {
    pub kind: ReservoirKind,
    pub significant_digits: u8,
    pub size: usize,
}

impl Default for ReservoirSettings {
    fn default() -> Self {
        Self {
            kind: ReservoirKind::HdrHistogram,
            significant_digits: 2,
            size: 1028,
        }
    }
}

impl ReservoirSettings {
    pub fn build(&self) -> Result<Arc<dyn Reservoir>> {
        Ok(match self.kind {
            ReservoirKind::HdrHistogram => Arc::new(HdrReservoir::new(self.significant_digits)?),
            ReservoirKind::HdrHistogramResetOnSnapshot => {
                Arc::new(HdrResetOnSnapshotReservoir::new(self.significant_digits)?)
            }
            ReservoirKind::SlidingWindow => Arc::new(SlidingWindowReservoir::new(self.size)),
            ReservoirKind::Uniform => Arc::new(UniformReservoir::new(self.size)),
        })
    }
}
