//! Forwarding and discarding update capabilities.
//!
//! Both are stateless statics; a node swaps between them by publishing a new
//! [`Gate`](super::node::Gate).

use std::time::Duration;

use crate::measure::{Counter, Histogram, Meter, Timer};

pub(crate) trait Updater: Send + Sync {
    fn inc(&self, counter: &Counter, n: i64);
    fn dec(&self, counter: &Counter, n: i64);
    fn mark(&self, meter: &Meter, n: u64);
    fn update(&self, histogram: &Histogram, value: i64);
    fn record(&self, timer: &Timer, duration: Duration);
}

struct Forward;

impl Updater for Forward {
    fn inc(&self, counter: &Counter, n: i64) {
        counter.inc(n);
    }

    fn dec(&self, counter: &Counter, n: i64) {
        counter.dec(n);
    }

    fn mark(&self, meter: &Meter, n: u64) {
        meter.mark(n);
    }

    fn update(&self, histogram: &Histogram, value: i64) {
        histogram.update(value);
    }

    fn record(&self, timer: &Timer, duration: Duration) {
        timer.update(duration);
    }
}

struct Discard;

impl Updater for Discard {
    fn inc(&self, _: &Counter, _: i64) {}
    fn dec(&self, _: &Counter, _: i64) {}
    fn mark(&self, _: &Meter, _: u64) {}
    fn update(&self, _: &Histogram, _: i64) {}
    fn record(&self, _: &Timer, _: Duration) {}
}

static FORWARD: Forward = Forward;
static DISCARD: Discard = Discard;

pub(crate) fn select(active: bool) -> &'static dyn Updater {
    if active {
        &FORWARD
    } else {
        &DISCARD
    }
}
