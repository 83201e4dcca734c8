//! CounterpartyInfo request/response processors.
//!
//! An explicit property exchange equivalent to Init/Confirm negotiation. The
//! request carries the requester's properties; receiving it automatically
//! queues a response with the local properties. The response carries the
//! property set the responder settled on, which the requester adopts as its
//! own session properties.

use flowsession_proto::{
    MessageDirection, SessionEvent, Timestamp,
    payloads::{CounterpartyInfoRequest, CounterpartyInfoResponse},
};

use super::{fail, queue_numbered_send, receive_numbered, reject};
use crate::{
    error::Violation,
    state::{SessionKey, SessionState, SessionStatus},
};

/// Local party asks for the counterparty's properties.
///
/// Legal while CREATED or CONFIRMED.
pub fn send_request(
    key: &SessionKey,
    state: Option<SessionState>,
    event: &SessionEvent,
    request: &CounterpartyInfoRequest,
    now: Timestamp,
) -> SessionState {
    let Some(mut state) = state else {
        return reject(key, None, event, &Violation::NoSession { kind: event.kind() }, now);
    };

    match state.status {
        SessionStatus::Error => state,
        SessionStatus::Created | SessionStatus::Confirmed => {
            if state.session_properties.is_empty() {
                state.session_properties = request.properties.clone();
            }
            queue_numbered_send(&mut state, event, now);
            state
        },
        status => fail(key, state, &Violation::InvalidSend { kind: event.kind(), status }, now),
    }
}

/// Counterparty asks for our properties.
///
/// Stores theirs and queues a numbered response carrying ours. A duplicate
/// request is re-acked only; the earlier response is still in the send queue
/// until acknowledged.
pub fn receive_request(
    key: &SessionKey,
    state: Option<SessionState>,
    event: &SessionEvent,
    request: &CounterpartyInfoRequest,
    now: Timestamp,
) -> SessionState {
    let Some(state) = state else {
        return reject(key, None, event, &Violation::NoSession { kind: event.kind() }, now);
    };

    receive_numbered(key, state, event, now, |state, _seq, now| {
        state.counterparty_session_properties = request.properties.clone();
        let response = SessionEvent::new(
            state.session_id.as_str(),
            MessageDirection::Outbound,
            now,
            CounterpartyInfoResponse { properties: state.session_properties.clone() },
        );
        queue_numbered_send(state, &response, now);
    })
}

/// Local party answers a request explicitly.
///
/// Legal once CONFIRMED.
pub fn send_response(
    key: &SessionKey,
    state: Option<SessionState>,
    event: &SessionEvent,
    response: &CounterpartyInfoResponse,
    now: Timestamp,
) -> SessionState {
    let Some(mut state) = state else {
        return reject(key, None, event, &Violation::NoSession { kind: event.kind() }, now);
    };

    match state.status {
        SessionStatus::Error => state,
        SessionStatus::Confirmed => {
            state.session_properties = response.properties.clone();
            queue_numbered_send(&mut state, event, now);
            state
        },
        status => fail(key, state, &Violation::InvalidSend { kind: event.kind(), status }, now),
    }
}

/// Counterparty answered our request.
///
/// The response properties become the local session properties and the
/// handshake completes if it had not already.
pub fn receive_response(
    key: &SessionKey,
    state: Option<SessionState>,
    event: &SessionEvent,
    response: &CounterpartyInfoResponse,
    now: Timestamp,
) -> SessionState {
    let Some(state) = state else {
        return reject(key, None, event, &Violation::NoSession { kind: event.kind() }, now);
    };

    receive_numbered(key, state, event, now, |state, _seq, _now| {
        state.session_properties = response.properties.clone();
        if state.status == SessionStatus::Created {
            state.status = SessionStatus::Confirmed;
        }
    })
}
