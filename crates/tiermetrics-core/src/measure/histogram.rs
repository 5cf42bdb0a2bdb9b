use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::reservoir::{Reservoir, Snapshot};

/// Distribution of values, sampled by a reservoir.
///
/// `count` covers every update even when the reservoir only keeps a sample.
pub struct Histogram {
    count: AtomicU64,
    reservoir: Arc<dyn Reservoir>,
}

impl Histogram {
    pub fn new(reservoir: Arc<dyn Reservoir>) -> Self {
        Self {
            count: AtomicU64::new(0),
            reservoir,
        }
    }

    pub fn update(&self, value: i64) {
        self.count.fetch_add(1, Ordering::Relaxed);
        self.reservoir.update(value);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> Snapshot {
        self.reservoir.snapshot()
    }
}

impl std::fmt::Debug for Histogram {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Histogram").field("count", &self.count()).finish()
    }
}
