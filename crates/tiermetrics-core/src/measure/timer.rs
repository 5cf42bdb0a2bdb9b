use std::sync::Arc;
use std::time::Duration;

use crate::measure::{Histogram, Meter};
use crate::reservoir::{Reservoir, Snapshot};

/// Rate of events plus the distribution of their durations, in nanoseconds.
#[derive(Debug)]
pub struct Timer {
    meter: Meter,
    histogram: Histogram,
}

impl Timer {
    pub fn new(reservoir: Arc<dyn Reservoir>) -> Self {
        Self {
            meter: Meter::new(),
            histogram: Histogram::new(reservoir),
        }
    }

    pub fn update(&self, duration: Duration) {
        let nanos = i64::try_from(duration.as_nanos()).unwrap_or(i64::MAX);
        self.histogram.update(nanos);
        self.meter.mark(1);
    }

    pub fn count(&self) -> u64 {
        self.histogram.count()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.histogram.snapshot()
    }

    pub fn meter(&self) -> &Meter {
        &self.meter
    }
}
