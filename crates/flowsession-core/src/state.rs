//! Session state record.
//!
//! # State Machine
//!
//! ```text
//!              send Init                 recv Confirm / Ack(Init)
//!   (absent) ────────────> CREATED ─────────────────────────────┐
//!      │                      │                                 ↓
//!      │ recv Init            │ recv Close                 CONFIRMED
//!      └──────────────────────┼───────────────────────────────> │
//!                             ↓           send / recv Close     │
//!                          CLOSING <────────────────────────────┘
//!                             │
//!             mirror Close    │   mirror Close, sends unacked
//!        ┌────────────────────┴────────────────┐
//!        ↓                                     ↓
//!     CLOSED <──── last numbered send acked ─ WAIT_FOR_FINAL_ACK
//!
//!   any status ── violation / recv Error / send Error ──> ERROR
//! ```
//!
//! CLOSED and ERROR are terminal. A terminal state is kept only so duplicate
//! deliveries are answered idempotently.

use std::fmt;

use flowsession_proto::{SequenceNum, SessionEvent, SessionProperties, Timestamp};
use serde::{Deserialize, Serialize};
use serde_repr::{Deserialize_repr, Serialize_repr};

use crate::delivery::DeliveryTrackingState;

/// Caller-owned identifier of one session's persisted state.
///
/// Opaque to the core. It is only used to label log output and error
/// messages.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionKey(String);

impl SessionKey {
    /// Wrap a caller-provided key.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Underlying string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

impl From<String> for SessionKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

/// Lifecycle status of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize_repr, Deserialize_repr)]
#[repr(u8)]
pub enum SessionStatus {
    /// Local Init sent, awaiting the counterparty
    Created = 0,
    /// Handshake complete, data may flow
    Confirmed = 1,
    /// One Close exchanged, waiting for the mirror Close
    Closing = 2,
    /// Both Closes exchanged, an earlier send is still unacknowledged
    WaitForFinalAck = 3,
    /// Closed successfully
    Closed = 4,
    /// Aborted
    Error = 5,
}

impl SessionStatus {
    /// CLOSED and ERROR are never left.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Closed | Self::Error)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "CREATED",
            Self::Confirmed => "CONFIRMED",
            Self::Closing => "CLOSING",
            Self::WaitForFinalAck => "WAIT_FOR_FINAL_ACK",
            Self::Closed => "CLOSED",
            Self::Error => "ERROR",
        };
        f.write_str(name)
    }
}

/// Persisted record for one session key.
///
/// Mutated only by the transition processors. The caller persists the value
/// returned by [`crate::apply`] and passes it back on the next event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    /// Session identifier stamped on synthesized events
    pub session_id: String,
    /// Lifecycle status
    pub status: SessionStatus,
    /// When the state was first created
    pub session_start_time: Timestamp,
    /// When the last inbound event was processed
    pub last_received_message_time: Timestamp,
    /// Outbound events not yet acknowledged by the counterparty
    pub send_events_state: DeliveryTrackingState,
    /// Inbound events not yet consumed by the local application
    pub received_events_state: DeliveryTrackingState,
    /// Local (or negotiated) session properties
    pub session_properties: SessionProperties,
    /// Properties advertised by the counterparty
    pub counterparty_session_properties: SessionProperties,
    /// A bare Ack must be emitted for the latest processed inbound event
    pub send_ack: bool,
    /// Sequence number of the local Close, once sent
    pub close_sent: Option<SequenceNum>,
    /// Sequence number of the counterparty's Close, once received
    pub close_received: Option<SequenceNum>,
}

impl SessionState {
    /// Fresh state with empty queues.
    pub fn new(session_id: impl Into<String>, status: SessionStatus, now: Timestamp) -> Self {
        Self {
            session_id: session_id.into(),
            status,
            session_start_time: now,
            last_received_message_time: now,
            send_events_state: DeliveryTrackingState::new(),
            received_events_state: DeliveryTrackingState::new(),
            session_properties: SessionProperties::new(),
            counterparty_session_properties: SessionProperties::new(),
            send_ack: false,
            close_sent: None,
            close_received: None,
        }
    }

    /// Whether the status is CLOSED or ERROR.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Sequence number the next numbered outbound event will take.
    pub fn next_send_sequence_num(&self) -> SequenceNum {
        self.send_events_state.last_processed_sequence_num + 1
    }

    /// Numbered outbound events still awaiting acknowledgement.
    pub fn unacked_sends(&self) -> impl Iterator<Item = &SessionEvent> {
        self.send_events_state.undelivered_messages.iter().filter(|e| e.is_numbered())
    }

    /// Whether any numbered send other than the local Close is unacknowledged.
    pub fn has_unacked_sends_besides_close(&self) -> bool {
        self.unacked_sends().any(|e| e.sequence_num != self.close_sent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses() {
        assert!(SessionStatus::Closed.is_terminal());
        assert!(SessionStatus::Error.is_terminal());
        assert!(!SessionStatus::WaitForFinalAck.is_terminal());
        assert!(!SessionStatus::Created.is_terminal());
    }

    #[test]
    fn next_sequence_follows_send_side() {
        let mut state = SessionState::new("s1", SessionStatus::Confirmed, Timestamp::default());
        assert_eq!(state.next_send_sequence_num(), 1);

        state.send_events_state.last_processed_sequence_num = 4;
        assert_eq!(state.next_send_sequence_num(), 5);
    }

    #[test]
    fn state_survives_cbor_snapshot() {
        let mut state =
            SessionState::new("s1", SessionStatus::Closing, Timestamp::from_millis(10));
        state.close_received = Some(3);
        state.send_ack = true;

        let mut buf = Vec::new();
        ciborium::ser::into_writer(&state, &mut buf).unwrap();
        let restored: SessionState = ciborium::de::from_reader(buf.as_slice()).unwrap();
        assert_eq!(restored, state);
    }
}
