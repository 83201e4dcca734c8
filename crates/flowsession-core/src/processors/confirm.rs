//! Confirm processors.
//!
//! Confirm is the responder's property reply to an Init. It is the canonical
//! negotiation step; [`super::counterparty_info`] is an equivalent exchange
//! that the initiator can trigger explicitly.

use flowsession_proto::{SessionEvent, Timestamp, payloads::Confirm};

use super::{fail, queue_numbered_send, receive_numbered, reject};
use crate::{
    error::Violation,
    state::{SessionKey, SessionState, SessionStatus},
};

/// Local responder sends its properties.
///
/// Legal only once the session is CONFIRMED. The properties become the local
/// session properties.
pub fn send(
    key: &SessionKey,
    state: Option<SessionState>,
    event: &SessionEvent,
    confirm: &Confirm,
    now: Timestamp,
) -> SessionState {
    let Some(mut state) = state else {
        return reject(key, None, event, &Violation::NoSession { kind: event.kind() }, now);
    };

    match state.status {
        SessionStatus::Error => state,
        SessionStatus::Confirmed => {
            state.session_properties = confirm.properties.clone();
            queue_numbered_send(&mut state, event, now);
            state
        },
        status => fail(key, state, &Violation::InvalidSend { kind: event.kind(), status }, now),
    }
}

/// Counterparty replied to our Init.
///
/// Stores the counterparty properties and completes the handshake.
pub fn receive(
    key: &SessionKey,
    state: Option<SessionState>,
    event: &SessionEvent,
    confirm: &Confirm,
    now: Timestamp,
) -> SessionState {
    let Some(state) = state else {
        return reject(key, None, event, &Violation::NoSession { kind: event.kind() }, now);
    };

    receive_numbered(key, state, event, now, |state, _seq, _now| {
        state.counterparty_session_properties = confirm.properties.clone();
        if state.status == SessionStatus::Created {
            state.status = SessionStatus::Confirmed;
        }
    })
}
