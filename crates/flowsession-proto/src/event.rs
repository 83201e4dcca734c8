//! Session events and the values that label them.

use std::{
    fmt,
    ops::Add,
    time::Duration,
};

use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::{
    payloads::{Payload, PayloadKind},
    properties::SessionProperties,
};

/// Position of a numbered event within one direction of a session.
///
/// Numbered events start at 1. A value of 0 in a tracking state means nothing
/// has been processed yet.
pub type SequenceNum = u64;

/// Which way an event travels relative to the local party.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum MessageDirection {
    /// Received from the counterparty
    Inbound = 0,
    /// Produced locally for the counterparty
    Outbound = 1,
}

impl fmt::Display for MessageDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Inbound => f.write_str("inbound"),
            Self::Outbound => f.write_str("outbound"),
        }
    }
}

/// Wall-clock instant in milliseconds since the Unix epoch.
///
/// State machines never read the clock; the caller passes a `Timestamp` into
/// every transition so replays are deterministic.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Timestamp(u64);

impl Timestamp {
    /// Build a timestamp from milliseconds since the epoch.
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Milliseconds since the epoch.
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// Time elapsed since `earlier`, or zero if `earlier` is in the future.
    pub fn saturating_duration_since(self, earlier: Self) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }
}

impl Add<Duration> for Timestamp {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self {
        Self(self.0.saturating_add(rhs.as_millis() as u64))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

/// One unit of protocol traffic for a session.
///
/// Events are immutable values. Processors that need a modified copy (for
/// example to stamp a sequence number on an outbound event) clone and rebuild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEvent {
    /// Session this event belongs to
    pub session_id: String,
    /// Inbound from the counterparty or outbound from the local party
    pub direction: MessageDirection,
    /// When the event was produced, or last handed to the transport
    pub timestamp: Timestamp,
    /// Present for numbered payloads, absent for Ack and Error
    pub sequence_num: Option<SequenceNum>,
    /// Event contents
    pub payload: Payload,
}

impl SessionEvent {
    /// Create an unnumbered event.
    pub fn new(
        session_id: impl Into<String>,
        direction: MessageDirection,
        timestamp: Timestamp,
        payload: impl Into<Payload>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            direction,
            timestamp,
            sequence_num: None,
            payload: payload.into(),
        }
    }

    /// Attach a sequence number.
    #[must_use]
    pub fn with_sequence_num(mut self, sequence_num: SequenceNum) -> Self {
        self.sequence_num = Some(sequence_num);
        self
    }

    /// Replace the timestamp.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: Timestamp) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Payload discriminant, for dispatch and logging.
    pub fn kind(&self) -> PayloadKind {
        self.payload.kind()
    }

    /// Whether this payload occupies a sequence slot.
    pub fn is_numbered(&self) -> bool {
        self.payload.is_numbered()
    }

    /// Negotiated properties carried by handshake payloads.
    pub fn session_properties(&self) -> Option<&SessionProperties> {
        self.payload.session_properties()
    }
}
