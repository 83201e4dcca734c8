//! Error processors.
//!
//! An Error always forces ERROR, whatever the prior status, and may create a
//! session that never existed locally.

use flowsession_proto::{
    MessageDirection, PayloadKind, SessionEvent, Timestamp, payloads::ErrorPayload,
};

use crate::state::{SessionKey, SessionState, SessionStatus};

/// Local party aborts the session.
///
/// The Error is queued for the counterparty unless one is already pending.
pub fn send(
    _key: &SessionKey,
    state: Option<SessionState>,
    event: &SessionEvent,
    _error: &ErrorPayload,
    now: Timestamp,
) -> SessionState {
    let mut state = state.unwrap_or_else(|| {
        SessionState::new(event.session_id.as_str(), SessionStatus::Error, now)
    });

    let mut outbound = event.clone().with_timestamp(now);
    outbound.direction = MessageDirection::Outbound;
    outbound.sequence_num = None;
    outbound.session_id.clone_from(&state.session_id);

    state.status = SessionStatus::Error;
    state.send_ack = false;
    if !state.send_events_state.contains_kind(PayloadKind::Error) {
        state.send_events_state.enqueue(outbound);
    }
    state
}

/// Counterparty aborted the session.
///
/// The Error is queued for the local application. Nothing is sent back.
pub fn receive(
    _key: &SessionKey,
    state: Option<SessionState>,
    event: &SessionEvent,
    _error: &ErrorPayload,
    now: Timestamp,
) -> SessionState {
    let mut state = state.unwrap_or_else(|| {
        SessionState::new(event.session_id.as_str(), SessionStatus::Error, now)
    });

    state.status = SessionStatus::Error;
    state.send_ack = false;
    state.last_received_message_time = now;
    state.received_events_state.enqueue_unique(event.clone());
    state
}

#[cfg(test)]
mod tests {
    use flowsession_proto::Payload;

    use super::*;
    use crate::processors::test_support::{error_count, inbound, key, now, outbound, state};

    fn abort() -> ErrorPayload {
        ErrorPayload::new("flowsession.flow.failed", "boom")
    }

    #[test]
    fn send_error_without_state_creates_error_session() {
        let result = send(&key(), None, &outbound(abort()), &abort(), now());

        assert_eq!(result.status, SessionStatus::Error);
        assert_eq!(result.send_events_state.len(), 1);
        assert!(matches!(result.send_events_state.undelivered_messages[0].payload, Payload::Error(_)));
    }

    #[test]
    fn send_error_from_any_status() {
        for status in [
            SessionStatus::Created,
            SessionStatus::Confirmed,
            SessionStatus::Closing,
            SessionStatus::WaitForFinalAck,
            SessionStatus::Closed,
        ] {
            let result = send(&key(), Some(state(status)), &outbound(abort()), &abort(), now());
            assert_eq!(result.status, SessionStatus::Error, "from {status}");
            assert_eq!(error_count(&result), 1, "from {status}");
        }
    }

    #[test]
    fn repeated_send_error_does_not_grow_queue() {
        let first = send(&key(), None, &outbound(abort()), &abort(), now());
        let second = send(&key(), Some(first.clone()), &outbound(abort()), &abort(), now());
        assert_eq!(second, first);
    }

    #[test]
    fn receive_error_without_state_records_it() {
        let event = inbound(abort(), None);
        let result = receive(&key(), None, &event, &abort(), now());

        assert_eq!(result.status, SessionStatus::Error);
        assert_eq!(result.received_events_state.undelivered_messages, vec![event]);
        assert!(result.send_events_state.is_empty());
    }

    #[test]
    fn receive_error_never_answers_with_error() {
        let mut confirmed = state(SessionStatus::Confirmed);
        confirmed.send_ack = true;

        let event = inbound(abort(), None);
        let result = receive(&key(), Some(confirmed), &event, &abort(), now());
        assert_eq!(result.status, SessionStatus::Error);
        assert_eq!(error_count(&result), 0);
        assert!(!result.send_ack);

        let again = receive(&key(), Some(result.clone()), &event, &abort(), now());
        assert_eq!(again, result);
    }
}
