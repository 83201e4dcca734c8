//! Deterministic simulation harness for flowsession.
//!
//! Plays the role of the external event-processing engine around the pure
//! core: a [`Party`] loads, applies and stores session state per key and
//! drives the session manager, while a seeded [`SimBus`] carries events
//! between parties with configurable loss, duplication, and reordering.
//!
//! Every run is a pure function of its seed, so a failing scenario can be
//! replayed exactly.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod bus;
pub mod party;
pub mod scenario;

pub use bus::{BusStats, Envelope, NetworkProfile, SimBus};
pub use party::Party;
pub use scenario::{OracleFn, RunnableScenario, Scenario, Step, World};
