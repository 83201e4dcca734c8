//! Scenario builder API.
//!
//! Provides a declarative API for scripting session scenarios that enforce
//! the Oracle Pattern.

use std::time::Duration;

use bytes::Bytes;
use flowsession_core::SessionManagerConfig;
use flowsession_proto::SessionProperties;

use crate::{
    bus::NetworkProfile,
    party::Party,
    scenario::{OracleFn, World},
};

/// Upper bound on ticks for a single [`Step::Settle`].
const DEFAULT_MAX_TICKS: u64 = 20_000;

/// One scripted action.
#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    /// `party` opens `session_id`
    Open {
        /// Initiating party
        party: String,
        /// Session to open
        session_id: String,
    },
    /// `party` sends `payload` on `session_id`
    Send {
        /// Sending party
        party: String,
        /// Target session
        session_id: String,
        /// Application bytes
        payload: Bytes,
    },
    /// `party` closes `session_id`
    Close {
        /// Closing party
        party: String,
        /// Session to close
        session_id: String,
    },
    /// `party` aborts `session_id`
    Abort {
        /// Aborting party
        party: String,
        /// Session to abort
        session_id: String,
    },
    /// Tick until nothing is in flight or pending
    Settle,
    /// Tick for a fixed duration
    Advance(Duration),
    /// Replace the bus fault model
    Network(NetworkProfile),
}

/// Scenario builder.
///
/// Must call `.oracle()` to get a [`RunnableScenario`] that can be executed.
pub struct Scenario {
    name: String,
    seed: u64,
    profile: NetworkProfile,
    config: SessionManagerConfig,
    tick: Duration,
    max_ticks: u64,
    pairs: Vec<(String, String)>,
    steps: Vec<Step>,
}

impl Scenario {
    /// Create a new scenario with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            seed: 0,
            profile: NetworkProfile::reliable(),
            config: SessionManagerConfig {
                message_resend_window: Duration::from_millis(200),
                session_timeout_window: Duration::from_secs(30),
            },
            tick: Duration::from_millis(10),
            max_ticks: DEFAULT_MAX_TICKS,
            pairs: Vec::new(),
            steps: Vec::new(),
        }
    }

    /// Seed for the bus RNG.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Initial fault model.
    pub fn network(mut self, profile: NetworkProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Manager configuration used by every party.
    pub fn config(mut self, config: SessionManagerConfig) -> Self {
        self.config = config;
        self
    }

    /// Tick budget per settle.
    pub fn max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = max_ticks;
        self
    }

    /// Two parties talking to each other.
    pub fn pair(mut self, a: impl Into<String>, b: impl Into<String>) -> Self {
        self.pairs.push((a.into(), b.into()));
        self
    }

    /// Append a step.
    pub fn step(mut self, step: Step) -> Self {
        self.steps.push(step);
        self
    }

    /// Append an Open step.
    pub fn open(self, party: &str, session_id: &str) -> Self {
        self.step(Step::Open { party: party.into(), session_id: session_id.into() })
    }

    /// Append a Send step.
    pub fn send(self, party: &str, session_id: &str, payload: impl Into<Bytes>) -> Self {
        self.step(Step::Send {
            party: party.into(),
            session_id: session_id.into(),
            payload: payload.into(),
        })
    }

    /// Append a Close step.
    pub fn close(self, party: &str, session_id: &str) -> Self {
        self.step(Step::Close { party: party.into(), session_id: session_id.into() })
    }

    /// Append an Abort step.
    pub fn abort(self, party: &str, session_id: &str) -> Self {
        self.step(Step::Abort { party: party.into(), session_id: session_id.into() })
    }

    /// Append a Settle step.
    pub fn settle(self) -> Self {
        self.step(Step::Settle)
    }

    /// Set the oracle function and return a runnable scenario.
    ///
    /// The oracle is mandatory - you cannot run a scenario without
    /// verification.
    pub fn oracle(self, oracle: OracleFn) -> RunnableScenario {
        RunnableScenario { scenario: self, oracle }
    }
}

/// A scenario with an oracle function that can be executed.
pub struct RunnableScenario {
    scenario: Scenario,
    oracle: OracleFn,
}

impl RunnableScenario {
    /// Execute the script, then run the oracle.
    ///
    /// Returns the final world so callers can compare runs.
    pub fn run(self) -> Result<World, String> {
        let scenario = self.scenario;
        let name = scenario.name.as_str();
        let mut world = World::new(scenario.seed, scenario.profile, scenario.tick);

        for (a, b) in &scenario.pairs {
            for party in [a, b] {
                let party = Party::new(party.as_str(), scenario.config.clone())
                    .map_err(|e| format!("Scenario '{name}': party {party}: {e}"))?;
                world.add_party(party);
            }
            world.connect(a, b);
        }

        for (index, step) in scenario.steps.iter().enumerate() {
            run_step(&mut world, step, scenario.max_ticks)
                .map_err(|e| format!("Scenario '{name}': step {index} ({step:?}): {e}"))?;
        }

        (self.oracle)(&world).map_err(|e| format!("Scenario '{name}': oracle: {e}"))?;

        Ok(world)
    }
}

fn run_step(world: &mut World, step: &Step, max_ticks: u64) -> Result<(), String> {
    let now = world.now();
    match step {
        Step::Open { party, session_id } => {
            party_mut(world, party)?.open(session_id, SessionProperties::new(), now);
        },
        Step::Send { party, session_id, payload } => {
            party_mut(world, party)?.send_data(session_id, payload.clone(), now);
        },
        Step::Close { party, session_id } => {
            party_mut(world, party)?.close(session_id, now);
        },
        Step::Abort { party, session_id } => {
            party_mut(world, party)?.abort(session_id, "scripted abort", now);
        },
        Step::Settle => {
            world.settle(max_ticks)?;
        },
        Step::Advance(duration) => world.advance(*duration),
        Step::Network(profile) => world.bus_mut().set_profile(*profile),
    }
    Ok(())
}

fn party_mut<'a>(world: &'a mut World, name: &str) -> Result<&'a mut Party, String> {
    world.party_mut(name).ok_or_else(|| format!("party {name} not found"))
}
