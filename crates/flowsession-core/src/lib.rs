//! flowsession protocol core logic
//!
//! Pure state machine logic for long-lived, ordered sessions carried over a
//! transport that may drop, duplicate, or reorder messages. Nothing in this
//! crate performs I/O, reads the clock, or holds state across calls.
//!
//! # Architecture
//!
//! The caller owns one persisted [`SessionState`] per [`SessionKey`]. For
//! each event it loads the prior state (or `None` for a brand-new key),
//! calls [`apply`], and writes the returned state back atomically. Events
//! for one key must be applied strictly in sequence; different keys are
//! independent.
//!
//! Each (payload, direction) pair has a transition processor in
//! [`processors`]. A processor takes the prior state by value and returns the
//! next one. Protocol violations never surface as `Err`: the session is moved
//! to [`SessionStatus::Error`] and an Error event is queued for the
//! counterparty.
//!
//! What to put on the wire is read back from the returned state. The
//! [`manager`] module turns the send queue and the pending-ack flag into the
//! concrete list of events to transmit at a given instant.
//!
//! # Components
//!
//! - [`state`]: Session state record and status
//! - [`delivery`]: Per-direction delivery tracking queues
//! - [`processors`]: One transition function per payload and direction
//! - [`driver`]: Dispatch from an event to its processor
//! - [`manager`]: Outbound scheduling, resends, inbox consumption, timeouts
//! - [`config`]: Manager configuration
//! - [`error`]: Violation reasons and configuration errors

pub mod config;
pub mod delivery;
pub mod driver;
pub mod error;
pub mod manager;
pub mod processors;
pub mod state;

pub use config::SessionManagerConfig;
pub use delivery::DeliveryTrackingState;
pub use driver::apply;
pub use error::{ConfigError, Violation};
pub use state::{SessionKey, SessionState, SessionStatus};
