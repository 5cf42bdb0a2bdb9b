use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

const TICK: Duration = Duration::from_secs(5);

/// Exponentially weighted moving average, ticked every five seconds.
#[derive(Debug)]
struct Ewma {
    alpha: f64,
    rate: f64,
    initialized: bool,
}

impl Ewma {
    fn minutes(m: f64) -> Self {
        Self {
            alpha: 1.0 - (-(TICK.as_secs_f64()) / 60.0 / m).exp(),
            rate: 0.0,
            initialized: false,
        }
    }

    fn tick(&mut self, count: u64) {
        let instant = count as f64 / TICK.as_secs_f64();
        if self.initialized {
            self.rate += self.alpha * (instant - self.rate);
        } else {
            self.rate = instant;
            self.initialized = true;
        }
    }
}

#[derive(Debug)]
struct Rates {
    last_tick: Instant,
    m1: Ewma,
    m5: Ewma,
    m15: Ewma,
}

/// Event count plus mean and 1/5/15 minute moving rates, in events per second.
#[derive(Debug)]
pub struct Meter {
    count: AtomicU64,
    uncounted: AtomicU64,
    start: Instant,
    rates: Mutex<Rates>,
}

impl Meter {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            count: AtomicU64::new(0),
            uncounted: AtomicU64::new(0),
            start: now,
            rates: Mutex::new(Rates {
                last_tick: now,
                m1: Ewma::minutes(1.0),
                m5: Ewma::minutes(5.0),
                m15: Ewma::minutes(15.0),
            }),
        }
    }

    pub fn mark(&self, n: u64) {
        self.tick_if_due(false);
        self.count.fetch_add(n, Ordering::Relaxed);
        self.uncounted.fetch_add(n, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn mean_rate(&self) -> f64 {
        let elapsed = self.start.elapsed().as_secs_f64();
        if elapsed <= 0.0 {
            return 0.0;
        }
        self.count() as f64 / elapsed
    }

    pub fn one_minute_rate(&self) -> f64 {
        self.tick_if_due(true);
        self.rates.lock().m1.rate
    }

    pub fn five_minute_rate(&self) -> f64 {
        self.tick_if_due(true);
        self.rates.lock().m5.rate
    }

    pub fn fifteen_minute_rate(&self) -> f64 {
        self.tick_if_due(true);
        self.rates.lock().m15.rate
    }

    // The update path must not wait on a reader, so it only ticks when the lock is free.
    fn tick_if_due(&self, blocking: bool) {
        let guard = if blocking {
            Some(self.rates.lock())
        } else {
            self.rates.try_lock()
        };
        let Some(mut rates) = guard else {
            return;
        };
        let elapsed = rates.last_tick.elapsed();
        if elapsed < TICK {
            return;
        }
        let ticks = (elapsed.as_nanos() / TICK.as_nanos()) as u32;
        rates.last_tick += TICK * ticks;
        for i in 0..ticks {
            let count = if i == 0 {
                self.uncounted.swap(0, Ordering::Relaxed)
            } else {
                0
            };
            rates.m1.tick(count);
            rates.m5.tick(count);
            rates.m15.tick(count);
        }
    }
}

impl Default for Meter {
    fn default() -> Self {
        Self::new()
    }
}
