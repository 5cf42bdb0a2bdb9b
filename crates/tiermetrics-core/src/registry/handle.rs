//! Application-facing handles.
//!
//! A handle wraps every node of a bundle. Writes fan out to all members in
//! bundle order through each member's current updater; reads report the
//! primary (first) member only.

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::measure::{Counter, Gauge, Histogram, Meter, Timer};
use crate::registry::node::Node;
use crate::reservoir::Snapshot;

pub struct Handle<M> {
    members: Arc<[Arc<Node<M>>]>,
}

pub type CounterHandle = Handle<Counter>;
pub type MeterHandle = Handle<Meter>;
pub type HistogramHandle = Handle<Histogram>;
pub type TimerHandle = Handle<Timer>;
pub type GaugeHandle = Handle<Gauge>;

impl<M> Clone for Handle<M> {
    fn clone(&self) -> Self {
        Self {
            members: Arc::clone(&self.members),
        }
    }
}

impl<M> std::fmt::Debug for Handle<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handle")
            .field("members", &self.member_names())
            .finish()
    }
}

impl<M> Handle<M> {
    /// `members` is never empty; the registry builds it from an expanded bundle.
    pub(crate) fn new(members: Vec<Arc<Node<M>>>) -> Self {
        Self {
            members: members.into(),
        }
    }

    fn primary(&self) -> &Node<M> {
        &self.members[0]
    }

    /// Name of the primary member.
    pub fn name(&self) -> &str {
        self.primary().name()
    }

    /// Concrete names in bundle order.
    pub fn member_names(&self) -> Vec<&str> {
        self.members.iter().map(|n| n.name()).collect()
    }

    pub fn is_active(&self) -> bool {
        self.primary().is_active()
    }

    fn each(&self, f: impl Fn(&Node<M>)) {
        for node in self.members.iter() {
            f(node);
        }
    }
}

impl Handle<Counter> {
    pub fn inc(&self) {
        self.inc_by(1);
    }

    pub fn inc_by(&self, n: i64) {
        self.each(|node| node.gate().updater.inc(node.measure(), n));
    }

    pub fn dec(&self) {
        self.dec_by(1);
    }

    pub fn dec_by(&self, n: i64) {
        self.each(|node| node.gate().updater.dec(node.measure(), n));
    }

    pub fn count(&self) -> i64 {
        self.primary().measure().count()
    }
}

impl Handle<Meter> {
    pub fn mark(&self) {
        self.mark_n(1);
    }

    pub fn mark_n(&self, n: u64) {
        self.each(|node| node.gate().updater.mark(node.measure(), n));
    }

    pub fn count(&self) -> u64 {
        self.primary().measure().count()
    }

    pub fn mean_rate(&self) -> f64 {
        self.primary().measure().mean_rate()
    }

    pub fn one_minute_rate(&self) -> f64 {
        self.primary().measure().one_minute_rate()
    }
}

impl Handle<Histogram> {
    pub fn update(&self, value: i64) {
        self.each(|node| node.gate().updater.update(node.measure(), value));
    }

    pub fn count(&self) -> u64 {
        self.primary().measure().count()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.primary().measure().snapshot()
    }
}

impl Handle<Timer> {
    pub fn update(&self, duration: Duration) {
        self.each(|node| node.gate().updater.record(node.measure(), duration));
    }

    /// Start timing; the elapsed time is recorded on `stop` or drop.
    pub fn time(&self) -> TimerContext {
        TimerContext {
            timer: self.clone(),
            start: Instant::now(),
            stopped: false,
        }
    }

    /// Time a closure.
    pub fn time_fn<T>(&self, f: impl FnOnce() -> T) -> T {
        let ctx = self.time();
        let out = f();
        ctx.stop();
        out
    }

    pub fn count(&self) -> u64 {
        self.primary().measure().count()
    }

    pub fn snapshot(&self) -> Snapshot {
        self.primary().measure().snapshot()
    }

    pub fn mean_rate(&self) -> f64 {
        self.primary().measure().meter().mean_rate()
    }
}

impl Handle<Gauge> {
    pub fn value(&self) -> f64 {
        self.primary().measure().value()
    }
}

pub struct TimerContext {
    timer: TimerHandle,
    start: Instant,
    stopped: bool,
}

impl TimerContext {
    /// Record and return the elapsed time.
    pub fn stop(mut self) -> Duration {
        self.stopped = true;
        let elapsed = self.start.elapsed();
        self.timer.update(elapsed);
        elapsed
    }
}

impl Drop for TimerContext {
    fn drop(&mut self) {
        if !self.stopped {
            self.timer.update(self.start.elapsed());
        }
    }
}
