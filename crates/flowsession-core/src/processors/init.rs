//! Init processors.
//!
//! Init is the only payload that may create a session.

use flowsession_proto::{SessionEvent, Timestamp, payloads::Init};

use super::{Arrival, classify, fail, queue_numbered_send};
use crate::{
    error::Violation,
    state::{SessionKey, SessionState, SessionStatus},
};

/// Local party opens a session.
///
/// Creates a CREATED state and queues the Init as send sequence 1. A repeated
/// Init on a CREATED session (the caller redelivering its own request) leaves
/// the state unchanged.
pub fn send(
    key: &SessionKey,
    state: Option<SessionState>,
    event: &SessionEvent,
    init: &Init,
    now: Timestamp,
) -> SessionState {
    match state {
        None => {
            let mut state =
                SessionState::new(event.session_id.as_str(), SessionStatus::Created, now);
            state.session_properties = init.properties.clone();
            queue_numbered_send(&mut state, event, now);
            state
        },
        Some(state) if matches!(state.status, SessionStatus::Created | SessionStatus::Error) => {
            state
        },
        Some(state) => {
            let violation = Violation::InitOnExistingSession { status: state.status };
            fail(key, state, &violation, now)
        },
    }
}

/// Counterparty opens a session.
///
/// A new session is CONFIRMED immediately and the Init is queued for the
/// local application. An Init for an existing session is either a duplicate
/// (re-acked) or glare, when both sides opened the same session.
pub fn receive(
    key: &SessionKey,
    state: Option<SessionState>,
    event: &SessionEvent,
    init: &Init,
    now: Timestamp,
) -> SessionState {
    let Some(seq) = event.sequence_num else {
        return super::reject(
            key,
            state,
            event,
            &Violation::MissingSequenceNum { kind: event.kind() },
            now,
        );
    };

    let Some(mut state) = state else {
        let mut state = SessionState::new(event.session_id.as_str(), SessionStatus::Confirmed, now);
        state.counterparty_session_properties = init.properties.clone();
        state.received_events_state.enqueue(event.clone());
        state.received_events_state.advance_to(seq);
        state.send_ack = true;
        return state;
    };

    match state.status {
        SessionStatus::Error => {
            fail(key, state, &Violation::SessionAborted { kind: event.kind() }, now)
        },
        SessionStatus::Created => fail(key, state, &Violation::Glare, now),
        _ if classify(&state, seq) == Arrival::Duplicate => {
            state.last_received_message_time = now;
            state.send_ack = true;
            state
        },
        status => fail(key, state, &Violation::InitOnExistingSession { status }, now),
    }
}
