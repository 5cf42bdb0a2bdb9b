use std::time::{Duration, Instant};

use parking_lot::Mutex;

type Supplier = Box<dyn Fn() -> f64 + Send + Sync>;

/// A value read on demand from a supplier.
pub struct Gauge {
    supplier: Supplier,
    cache: Option<Cache>,
}

struct Cache {
    ttl: Duration,
    last: Mutex<Option<(Instant, f64)>>,
}

impl Gauge {
    pub fn new<F>(supplier: F) -> Self
    where
        F: Fn() -> f64 + Send + Sync + 'static,
    {
        Self {
            supplier: Box::new(supplier),
            cache: None,
        }
    }

    /// A gauge whose supplier runs at most once per `ttl`; reads in between
    /// return the cached value, which may be up to `ttl` stale.
    pub fn cached<F>(ttl: Duration, supplier: F) -> Self
    where
        F: Fn() -> f64 + Send + Sync + 'static,
    {
        Self {
            supplier: Box::new(supplier),
            cache: Some(Cache {
                ttl,
                last: Mutex::new(None),
            }),
        }
    }

    pub fn value(&self) -> f64 {
        let Some(cache) = &self.cache else {
            return (self.supplier)();
        };
        let mut last = cache.last.lock();
        match *last {
            Some((at, v)) if at.elapsed() < cache.ttl => v,
            _ => {
                let v = (self.supplier)();
                *last = Some((Instant::now(), v));
                v
            }
        }
    }

    pub fn is_cached(&self) -> bool {
        self.cache.is_some()
    }
}

impl std::fmt::Debug for Gauge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gauge").field("cached", &self.is_cached()).finish()
    }
}
