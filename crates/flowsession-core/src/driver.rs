//! Session protocol driver.
//!
//! Selects the transition processor for an event by matching on its payload
//! and direction. The match is exhaustive, so adding a payload variant
//! without wiring both directions fails to compile.
//!
//! The driver owns no state. It is the only place in this crate that logs.

use flowsession_proto::{MessageDirection, Payload, SessionEvent, Timestamp};
use tracing::{debug, warn};

use crate::{
    processors::{ack, close, confirm, counterparty_info, data, error, init},
    state::{SessionKey, SessionState, SessionStatus},
};

/// Apply one event to a session.
///
/// `state` is the last persisted state for `key`, or `None` for a key seen
/// for the first time. The returned state must be persisted atomically
/// before the next event for the same key is applied.
///
/// Never fails: protocol violations yield an ERROR state with an Error event
/// queued for the counterparty.
pub fn apply(
    key: &SessionKey,
    state: Option<SessionState>,
    event: &SessionEvent,
    now: Timestamp,
) -> SessionState {
    let before = state.as_ref().map(|s| s.status);
    let next = dispatch(key, state, event, now);

    debug!(
        session_key = %key,
        kind = %event.kind(),
        direction = %event.direction,
        sequence_num = ?event.sequence_num,
        from = ?before,
        to = %next.status,
        "applied session event"
    );
    if next.status == SessionStatus::Error && before != Some(SessionStatus::Error) {
        warn!(
            session_key = %key,
            kind = %event.kind(),
            direction = %event.direction,
            "session entered error state"
        );
    }

    next
}

fn dispatch(
    key: &SessionKey,
    state: Option<SessionState>,
    event: &SessionEvent,
    now: Timestamp,
) -> SessionState {
    use MessageDirection::{Inbound, Outbound};

    match (event.direction, &event.payload) {
        (Inbound, Payload::Init(p)) => init::receive(key, state, event, p, now),
        (Outbound, Payload::Init(p)) => init::send(key, state, event, p, now),
        (Inbound, Payload::Ack(p)) => ack::receive(key, state, event, p, now),
        (Outbound, Payload::Ack(p)) => ack::send(key, state, event, p, now),
        (Inbound, Payload::Confirm(p)) => confirm::receive(key, state, event, p, now),
        (Outbound, Payload::Confirm(p)) => confirm::send(key, state, event, p, now),
        (Inbound, Payload::CounterpartyInfoRequest(p)) => {
            counterparty_info::receive_request(key, state, event, p, now)
        },
        (Outbound, Payload::CounterpartyInfoRequest(p)) => {
            counterparty_info::send_request(key, state, event, p, now)
        },
        (Inbound, Payload::CounterpartyInfoResponse(p)) => {
            counterparty_info::receive_response(key, state, event, p, now)
        },
        (Outbound, Payload::CounterpartyInfoResponse(p)) => {
            counterparty_info::send_response(key, state, event, p, now)
        },
        (Inbound, Payload::Data(p)) => data::receive(key, state, event, p, now),
        (Outbound, Payload::Data(p)) => data::send(key, state, event, p, now),
        (Inbound, Payload::Close(p)) => close::receive(key, state, event, p, now),
        (Outbound, Payload::Close(p)) => close::send(key, state, event, p, now),
        (Inbound, Payload::Error(p)) => error::receive(key, state, event, p, now),
        (Outbound, Payload::Error(p)) => error::send(key, state, event, p, now),
    }
}
