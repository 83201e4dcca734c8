//! Violation reasons and configuration errors.
//!
//! Transitions never return `Err`. A [`Violation`] describes why a session was
//! forced into ERROR; its display text becomes the `error_message` of the
//! Error event sent to the counterparty.

use std::time::Duration;

use flowsession_proto::{PayloadKind, SequenceNum};
use thiserror::Error;

use crate::state::SessionStatus;

/// Error type for protocol violations.
pub const PROTOCOL_VIOLATION: &str = "flowsession.protocol.violation";

/// Error type for sessions that stopped hearing from the counterparty.
pub const SESSION_TIMEOUT: &str = "flowsession.session.timeout";

/// Why a session was aborted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    /// Any event other than Init for a key with no state.
    #[error("{kind} for a session that does not exist")]
    NoSession {
        /// Offending payload
        kind: PayloadKind,
    },

    /// A numbered payload arrived without a sequence number.
    #[error("{kind} carries no sequence number")]
    MissingSequenceNum {
        /// Offending payload
        kind: PayloadKind,
    },

    /// Both parties sent Init for the same session.
    #[error("both parties initiated the session simultaneously")]
    Glare,

    /// Init for a session that already exists and is past the handshake.
    #[error("Init for a session that already exists in status {status}")]
    InitOnExistingSession {
        /// Status at the time
        status: SessionStatus,
    },

    /// Inbound event for a session that was already aborted.
    #[error("{kind} received on an aborted session")]
    SessionAborted {
        /// Offending payload
        kind: PayloadKind,
    },

    /// Local payload not permitted in the current status.
    #[error("{kind} cannot be sent in status {status}")]
    InvalidSend {
        /// Offending payload
        kind: PayloadKind,
        /// Status at the time
        status: SessionStatus,
    },

    /// Inbound numbered event logically after the counterparty's Close.
    #[error("{kind} at sequence number {sequence_num} received after Close at {close}")]
    AfterClose {
        /// Offending payload
        kind: PayloadKind,
        /// Its sequence number
        sequence_num: SequenceNum,
        /// Sequence number of the counterparty's Close
        close: SequenceNum,
    },

    /// Local Close while inbound events are still unconsumed.
    #[error("Close requested with {pending} received events not yet consumed")]
    PendingInbox {
        /// Unconsumed inbound events
        pending: usize,
    },

    /// Local Close sent twice.
    #[error("Close already sent at sequence number {0}")]
    DuplicateLocalClose(SequenceNum),

    /// Counterparty sent a second, different Close.
    #[error("Close at sequence number {sequence_num} after Close at {first}")]
    ConflictingClose {
        /// New Close sequence number
        sequence_num: SequenceNum,
        /// First Close sequence number
        first: SequenceNum,
    },

    /// Inbound event reusing a slot already taken by a different event.
    #[error("{kind} reuses processed sequence number {sequence_num}")]
    SequenceReuse {
        /// Offending payload
        kind: PayloadKind,
        /// Reused sequence number
        sequence_num: SequenceNum,
    },

    /// Nothing heard from the counterparty while sends are outstanding.
    #[error("no message received for {elapsed:?}")]
    Timeout {
        /// Time since the last inbound event
        elapsed: Duration,
    },
}

impl Violation {
    /// Error category placed in the outbound Error payload.
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => SESSION_TIMEOUT,
            _ => PROTOCOL_VIOLATION,
        }
    }
}

/// Invalid [`crate::SessionManagerConfig`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A window was configured as zero.
    #[error("{0} must be greater than zero")]
    ZeroWindow(&'static str),

    /// Resending after the session has already timed out is pointless.
    #[error("message resend window {resend:?} must be shorter than session timeout {timeout:?}")]
    ResendNotShorterThanTimeout {
        /// Configured resend window
        resend: Duration,
        /// Configured session timeout
        timeout: Duration,
    },
}
