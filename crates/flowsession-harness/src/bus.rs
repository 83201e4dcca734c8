//! Seeded in-memory message bus.
//!
//! Stands in for the messaging layer underneath the session protocol. Each
//! published event is independently dropped, delayed, duplicated, or held
//! back past later traffic according to a [`NetworkProfile`]. All randomness
//! comes from one ChaCha stream seeded at construction.

use std::time::Duration;

use flowsession_proto::{SessionEvent, Timestamp};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::trace;

/// Fault model applied to every published event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NetworkProfile {
    /// Minimum delivery delay
    pub base_latency: Duration,
    /// Uniform extra delay on top of the base latency
    pub jitter: Duration,
    /// Probability an event is lost
    pub loss_rate: f64,
    /// Probability an event is delivered twice
    pub duplicate_rate: f64,
    /// Probability an event is held back long enough to overtake
    pub reorder_rate: f64,
}

impl Default for NetworkProfile {
    fn default() -> Self {
        Self::reliable()
    }
}

impl NetworkProfile {
    /// In-order, lossless, fixed latency.
    pub fn reliable() -> Self {
        Self {
            base_latency: Duration::from_millis(10),
            jitter: Duration::ZERO,
            loss_rate: 0.0,
            duplicate_rate: 0.0,
            reorder_rate: 0.0,
        }
    }

    /// Badly degraded link. Sessions must still converge.
    pub fn lossy() -> Self {
        Self {
            base_latency: Duration::from_millis(10),
            jitter: Duration::from_millis(40),
            loss_rate: 0.2,
            duplicate_rate: 0.1,
            reorder_rate: 0.2,
        }
    }

    fn clamped(self) -> Self {
        Self {
            loss_rate: self.loss_rate.clamp(0.0, 1.0),
            duplicate_rate: self.duplicate_rate.clamp(0.0, 1.0),
            reorder_rate: self.reorder_rate.clamp(0.0, 1.0),
            ..self
        }
    }
}

/// An event in flight to a named party.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    /// Receiving party
    pub to: String,
    /// Instant the event becomes deliverable
    pub deliver_at: Timestamp,
    /// The event as published by the sender
    pub event: SessionEvent,
    order: u64,
}

/// Delivery counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BusStats {
    /// Events handed to [`SimBus::publish`]
    pub published: u64,
    /// Events lost
    pub dropped: u64,
    /// Extra copies injected
    pub duplicated: u64,
    /// Events held back
    pub reordered: u64,
    /// Envelopes handed out by [`SimBus::deliver_due`]
    pub delivered: u64,
}

/// Lossy, duplicating, reordering bus driven by a seeded RNG.
pub struct SimBus {
    rng: ChaCha8Rng,
    profile: NetworkProfile,
    in_flight: Vec<Envelope>,
    next_order: u64,
    stats: BusStats,
}

impl SimBus {
    /// Bus with the given seed and fault model.
    pub fn new(seed: u64, profile: NetworkProfile) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            profile: profile.clamped(),
            in_flight: Vec::new(),
            next_order: 0,
            stats: BusStats::default(),
        }
    }

    /// Swap the fault model, e.g. to heal the link mid-run.
    pub fn set_profile(&mut self, profile: NetworkProfile) {
        self.profile = profile.clamped();
    }

    /// Current fault model.
    pub fn profile(&self) -> NetworkProfile {
        self.profile
    }

    /// Counters since construction.
    pub fn stats(&self) -> BusStats {
        self.stats
    }

    /// True when nothing is in flight.
    pub fn is_idle(&self) -> bool {
        self.in_flight.is_empty()
    }

    /// Number of envelopes in flight.
    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Hand `event` to the bus for delivery to `to`.
    pub fn publish(&mut self, to: &str, event: SessionEvent, now: Timestamp) {
        self.stats.published += 1;

        if self.rng.gen_bool(self.profile.loss_rate) {
            self.stats.dropped += 1;
            trace!(to, kind = %event.kind(), sequence_num = ?event.sequence_num, "dropped");
            return;
        }

        if self.rng.gen_bool(self.profile.duplicate_rate) {
            self.stats.duplicated += 1;
            let delay = self.sample_delay();
            self.push(to, event.clone(), now + delay);
        }

        let mut delay = self.sample_delay();
        if self.rng.gen_bool(self.profile.reorder_rate) {
            self.stats.reordered += 1;
            delay += self.profile.base_latency * 3 + self.profile.jitter;
        }
        self.push(to, event, now + delay);
    }

    /// Remove and return every envelope deliverable at `now`, oldest first.
    pub fn deliver_due(&mut self, now: Timestamp) -> Vec<Envelope> {
        let (mut due, pending): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.in_flight).into_iter().partition(|e| e.deliver_at <= now);
        self.in_flight = pending;

        due.sort_by_key(|e| (e.deliver_at, e.order));
        self.stats.delivered += due.len() as u64;
        due
    }

    fn sample_delay(&mut self) -> Duration {
        let jitter_ms = self.profile.jitter.as_millis() as u64;
        let extra = if jitter_ms > 0 { self.rng.gen_range(0..=jitter_ms) } else { 0 };
        self.profile.base_latency + Duration::from_millis(extra)
    }

    fn push(&mut self, to: &str, event: SessionEvent, deliver_at: Timestamp) {
        let order = self.next_order;
        self.next_order += 1;
        self.in_flight.push(Envelope { to: to.to_string(), deliver_at, event, order });
    }
}
