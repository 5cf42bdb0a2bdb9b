//! Registry nodes: one live measurement plus its swappable gate.

use std::sync::Arc;

use arc_swap::ArcSwap;

use crate::level::Level;
use crate::measure::{Counter, Gauge, Histogram, Meter, MetricKind, Timer};
use crate::registry::updater::{self, Updater};

/// Effective state of a node, published as one atomic reference.
pub(crate) struct Gate {
    pub(crate) effective: Level,
    pub(crate) active: bool,
    pub(crate) updater: &'static dyn Updater,
}

impl Gate {
    pub(crate) fn derive(enabled: bool, effective: Level, declared: Level) -> Self {
        let active = enabled && effective > Level::Off && effective >= declared;
        Self {
            effective,
            active,
            updater: updater::select(active),
        }
    }
}

pub struct Node<M> {
    name: String,
    declared: Level,
    measure: M,
    gate: ArcSwap<Gate>,
}

impl<M> Node<M> {
    pub(crate) fn new(name: String, declared: Level, measure: M, gate: Gate) -> Self {
        Self {
            name,
            declared,
            measure,
            gate: ArcSwap::from_pointee(gate),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Level the metric was created with.
    pub fn declared_level(&self) -> Level {
        self.declared
    }

    /// Threshold currently in force for this node.
    pub fn effective_level(&self) -> Level {
        self.gate.load().effective
    }

    pub fn is_active(&self) -> bool {
        self.gate.load().active
    }

    pub fn measure(&self) -> &M {
        &self.measure
    }

    pub(crate) fn gate(&self) -> arc_swap::Guard<Arc<Gate>> {
        self.gate.load()
    }

    /// Re-derive the gate. Returns true when activity flipped.
    pub(crate) fn refresh(&self, enabled: bool, effective: Level) -> bool {
        let next = Gate::derive(enabled, effective, self.declared);
        let now_active = next.active;
        let prev = self.gate.swap(Arc::new(next));
        prev.active != now_active
    }
}

/// Kind-erased view of a node, used by re-derivation and sampling.
pub(crate) trait Gated: Send + Sync {
    fn name(&self) -> &str;
    fn is_active(&self) -> bool;
    fn refresh(&self, enabled: bool, effective: Level) -> bool;
}

impl<M: Send + Sync> Gated for Node<M> {
    fn name(&self) -> &str {
        Node::name(self)
    }

    fn is_active(&self) -> bool {
        Node::is_active(self)
    }

    fn refresh(&self, enabled: bool, effective: Level) -> bool {
        Node::refresh(self, enabled, effective)
    }
}

/// A registered metric of any kind.
#[derive(Clone)]
pub enum Metric {
    Counter(Arc<Node<Counter>>),
    Meter(Arc<Node<Meter>>),
    Histogram(Arc<Node<Histogram>>),
    Timer(Arc<Node<Timer>>),
    Gauge(Arc<Node<Gauge>>),
}

impl Metric {
    pub fn kind(&self) -> MetricKind {
        match self {
            Metric::Counter(_) => MetricKind::Counter,
            Metric::Meter(_) => MetricKind::Meter,
            Metric::Histogram(_) => MetricKind::Histogram,
            Metric::Timer(_) => MetricKind::Timer,
            Metric::Gauge(_) => MetricKind::Gauge,
        }
    }

    pub(crate) fn gated(&self) -> &dyn Gated {
        match self {
            Metric::Counter(n) => n.as_ref(),
            Metric::Meter(n) => n.as_ref(),
            Metric::Histogram(n) => n.as_ref(),
            Metric::Timer(n) => n.as_ref(),
            Metric::Gauge(n) => n.as_ref(),
        }
    }

    pub fn name(&self) -> &str {
        self.gated().name()
    }

    pub fn is_active(&self) -> bool {
        self.gated().is_active()
    }
}

/// Ties a measurement type to its `Metric` variant.
pub trait Measure: Sized + Send + Sync + 'static {
    const KIND: MetricKind;

    fn wrap(node: Arc<Node<Self>>) -> Metric;
    fn unwrap(metric: &Metric) -> Option<Arc<Node<Self>>>;
}

macro_rules! measure_variant {
    ($ty:ident) => {
        impl Measure for $ty {
            const KIND: MetricKind = MetricKind::$ty;

            fn wrap(node: Arc<Node<Self>>) -> Metric {
                Metric::$ty(node)
            }

            fn unwrap(metric: &Metric) -> Option<Arc<Node<Self>>> {
                match metric {
                    Metric::$ty(n) => Some(Arc::clone(n)),
                    _ => None,
                }
            }
        }
    };
}

measure_variant!(Counter);
measure_variant!(Meter);
measure_variant!(Histogram);
measure_variant!(Timer);
measure_variant!(Gauge);
