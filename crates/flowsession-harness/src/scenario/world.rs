//! World state for scenario execution.
//!
//! The World owns every party, the bus between them, and the simulated
//! clock. Each tick flushes every party onto the bus, advances the clock,
//! and delivers whatever the bus says is due.

use std::{collections::BTreeMap, time::Duration};

use flowsession_core::SessionStatus;
use flowsession_proto::Timestamp;
use tracing::debug;

use crate::{
    bus::{NetworkProfile, SimBus},
    party::Party,
};

/// All parties, the bus, and the clock.
pub struct World {
    parties: BTreeMap<String, Party>,
    peers: BTreeMap<String, String>,
    bus: SimBus,
    now: Timestamp,
    tick: Duration,
    ticks: u64,
}

impl World {
    /// Empty world at time zero.
    pub fn new(seed: u64, profile: NetworkProfile, tick: Duration) -> Self {
        Self {
            parties: BTreeMap::new(),
            peers: BTreeMap::new(),
            bus: SimBus::new(seed, profile),
            now: Timestamp::from_millis(0),
            tick,
            ticks: 0,
        }
    }

    /// Add a party. Replaces an existing party of the same name.
    pub fn add_party(&mut self, party: Party) {
        self.parties.insert(party.name().to_string(), party);
    }

    /// Route everything `a` publishes to `b` and vice versa.
    pub fn connect(&mut self, a: &str, b: &str) {
        self.peers.insert(a.to_string(), b.to_string());
        self.peers.insert(b.to_string(), a.to_string());
    }

    /// Party by name.
    pub fn party(&self, name: &str) -> Option<&Party> {
        self.parties.get(name)
    }

    /// Mutable party by name.
    pub fn party_mut(&mut self, name: &str) -> Option<&mut Party> {
        self.parties.get_mut(name)
    }

    /// Status of `session_id` at `party`.
    pub fn status(&self, party: &str, session_id: &str) -> Option<SessionStatus> {
        self.party(party).and_then(|p| p.status(session_id))
    }

    /// Simulated clock.
    pub fn now(&self) -> Timestamp {
        self.now
    }

    /// Ticks run so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// The bus.
    pub fn bus(&self) -> &SimBus {
        &self.bus
    }

    /// Mutable bus, e.g. to change the fault model mid-run.
    pub fn bus_mut(&mut self) -> &mut SimBus {
        &mut self.bus
    }

    /// Nothing in flight and nothing left to send.
    pub fn is_quiet(&self) -> bool {
        self.bus.is_idle() && self.parties.values().all(|p| !p.has_pending_messages())
    }

    /// One tick: flush, advance the clock, deliver.
    pub fn step(&mut self) {
        for (name, party) in &mut self.parties {
            let Some(peer) = self.peers.get(name) else {
                continue;
            };
            for event in party.flush(self.now) {
                self.bus.publish(peer, event, self.now);
            }
        }

        self.now = self.now + self.tick;
        self.ticks += 1;

        for envelope in self.bus.deliver_due(self.now) {
            match self.parties.get_mut(&envelope.to) {
                Some(party) => party.receive(&envelope.event, self.now),
                None => debug!(to = %envelope.to, "no such party"),
            }
        }
    }

    /// Advance the clock by at least `duration`, ticking as usual.
    pub fn advance(&mut self, duration: Duration) {
        let target = self.now + duration;
        while self.now < target {
            self.step();
        }
    }

    /// Tick until quiet. Returns the number of ticks taken.
    pub fn settle(&mut self, max_ticks: u64) -> Result<u64, String> {
        let start = self.ticks;
        // Locally submitted events are only visible after a flush.
        self.step();
        while !self.is_quiet() {
            if self.ticks - start >= max_ticks {
                return Err(format!(
                    "not quiet after {max_ticks} ticks ({} in flight)",
                    self.bus.in_flight()
                ));
            }
            self.step();
        }
        Ok(self.ticks - start)
    }
}
