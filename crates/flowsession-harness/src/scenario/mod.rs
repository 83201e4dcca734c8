//! Scripted scenarios with mandatory oracles.
//!
//! A [`Scenario`] lists parties and a script of [`Step`]s. It cannot run
//! until an oracle is attached; the oracle inspects the final [`World`] and
//! decides whether the run was correct.

mod builder;
mod world;

pub use builder::{RunnableScenario, Scenario, Step};
pub use world::World;

/// Verification run against the final world.
pub type OracleFn = Box<dyn Fn(&World) -> Result<(), String>>;
