//! Event types for the flowsession protocol.
//!
//! A session is a long-lived, ordered, bidirectional conversation between two
//! parties multiplexed over a shared log that may drop, duplicate, or reorder
//! messages. Every unit of traffic on that log is a [`SessionEvent`]: a
//! direction, a session id, an optional sequence number, and a [`Payload`].
//!
//! Wire encoding is not defined here. All types derive `serde` so the caller
//! can pick whatever encoding its transport and storage use.
#![forbid(unsafe_code)]

pub mod errors;
pub mod event;
pub mod payloads;
pub mod properties;

pub use errors::{ProtocolError, Result};
pub use event::{MessageDirection, SequenceNum, SessionEvent, Timestamp};
pub use payloads::{Payload, PayloadKind};
pub use properties::SessionProperties;
