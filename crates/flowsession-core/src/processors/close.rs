//! Close processors.
//!
//! Closing is bilateral: each side sends one Close and acknowledges the
//! other's. Which status a session ends up in depends on which Close came
//! first and whether earlier sends are still unacknowledged.
//!
//! ```text
//! local Close first:   CONFIRMED ─send─> CLOSING ─recv─> CLOSED
//!                                                 └────> WAIT_FOR_FINAL_ACK (earlier sends unacked)
//! remote Close first:  CONFIRMED ─recv─> CLOSING ─send─> WAIT_FOR_FINAL_ACK ─ack─> CLOSED
//! ```

use flowsession_proto::{SessionEvent, Timestamp, payloads::Close};

use super::{Arrival, classify, fail, queue_ack, queue_numbered_send, reject, settle_close};
use crate::{
    error::Violation,
    state::{SessionKey, SessionState, SessionStatus},
};

/// Local party closes its direction.
///
/// From CONFIRMED the inbox must be drained first. From CLOSING only when the
/// counterparty closed first; a second local Close aborts.
pub fn send(
    key: &SessionKey,
    state: Option<SessionState>,
    event: &SessionEvent,
    _close: &Close,
    now: Timestamp,
) -> SessionState {
    let Some(mut state) = state else {
        return reject(key, None, event, &Violation::NoSession { kind: event.kind() }, now);
    };

    match state.status {
        SessionStatus::Error => state,
        SessionStatus::Confirmed if !state.received_events_state.is_empty() => {
            let pending = state.received_events_state.len();
            fail(key, state, &Violation::PendingInbox { pending }, now)
        },
        SessionStatus::Confirmed => {
            let seq = queue_numbered_send(&mut state, event, now);
            state.close_sent = Some(seq);
            state.status = SessionStatus::Closing;
            state
        },
        SessionStatus::Closing | SessionStatus::WaitForFinalAck => match state.close_sent {
            Some(sent) => fail(key, state, &Violation::DuplicateLocalClose(sent), now),
            None => {
                let seq = queue_numbered_send(&mut state, event, now);
                state.close_sent = Some(seq);
                state.status = SessionStatus::WaitForFinalAck;
                state
            },
        },
        status @ (SessionStatus::Created | SessionStatus::Closed) => {
            fail(key, state, &Violation::InvalidSend { kind: event.kind(), status }, now)
        },
    }
}

/// Counterparty closes its direction.
///
/// The Close is queued for the local application and acknowledged with an
/// Ack placed directly on the send queue, replacing any Ack still pending.
pub fn receive(
    key: &SessionKey,
    state: Option<SessionState>,
    event: &SessionEvent,
    _close: &Close,
    now: Timestamp,
) -> SessionState {
    let Some(mut state) = state else {
        return reject(key, None, event, &Violation::NoSession { kind: event.kind() }, now);
    };

    if state.status == SessionStatus::Error {
        return fail(key, state, &Violation::SessionAborted { kind: event.kind() }, now);
    }

    let Some(seq) = event.sequence_num else {
        return fail(key, state, &Violation::MissingSequenceNum { kind: event.kind() }, now);
    };

    match state.close_received {
        Some(first) if first == seq => {
            state.last_received_message_time = now;
            queue_ack(&mut state, now);
            return state;
        },
        Some(first) => {
            return fail(key, state, &Violation::ConflictingClose { sequence_num: seq, first }, now);
        },
        None => {},
    }

    if classify(&state, seq) == Arrival::Duplicate {
        let violation = Violation::SequenceReuse { kind: event.kind(), sequence_num: seq };
        return fail(key, state, &violation, now);
    }

    state.last_received_message_time = now;
    state.close_received = Some(seq);
    state.received_events_state.enqueue(event.clone());
    if classify(&state, seq) == Arrival::Next {
        state.received_events_state.advance_to(seq);
    }

    if matches!(state.status, SessionStatus::Created | SessionStatus::Confirmed) {
        state.status = SessionStatus::Closing;
    }
    // A Close ahead of a gap leaves the session CLOSING until the missing
    // events arrive.
    settle_close(&mut state);

    queue_ack(&mut state, now);
    state
}
