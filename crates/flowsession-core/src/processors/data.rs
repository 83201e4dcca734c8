//! Data processors.
//!
//! Data is not kept on the receive queue. The caller hands an accepted Data
//! event to its application once the receive-side high-water mark has moved
//! past the event's sequence number.

use flowsession_proto::{SessionEvent, Timestamp, payloads::Data};

use super::{fail, queue_numbered_send, receive_numbered, reject};
use crate::{
    error::Violation,
    state::{SessionKey, SessionState, SessionStatus},
};

/// Local party sends application data.
///
/// Legal only while CONFIRMED. Data after a Close in either direction, or
/// before the handshake completes, aborts the session.
pub fn send(
    key: &SessionKey,
    state: Option<SessionState>,
    event: &SessionEvent,
    _data: &Data,
    now: Timestamp,
) -> SessionState {
    let Some(mut state) = state else {
        return reject(key, None, event, &Violation::NoSession { kind: event.kind() }, now);
    };

    match state.status {
        SessionStatus::Error => state,
        SessionStatus::Confirmed => {
            queue_numbered_send(&mut state, event, now);
            state
        },
        status => fail(key, state, &Violation::InvalidSend { kind: event.kind(), status }, now),
    }
}

/// Counterparty sent application data.
///
/// Duplicates are re-acked. Data at or after the counterparty's Close aborts
/// the session. Data arriving while CREATED means the counterparty processed
/// our Init, so the handshake is treated as complete.
pub fn receive(
    key: &SessionKey,
    state: Option<SessionState>,
    event: &SessionEvent,
    _data: &Data,
    now: Timestamp,
) -> SessionState {
    let Some(state) = state else {
        return reject(key, None, event, &Violation::NoSession { kind: event.kind() }, now);
    };

    receive_numbered(key, state, event, now, |state, _seq, _now| {
        if state.status == SessionStatus::Created {
            state.status = SessionStatus::Confirmed;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processors::test_support::{
        ack_count, error_count, inbound, key, now, outbound, state,
    };

    fn data() -> Data {
        Data::new(b"hello".to_vec())
    }

    fn confirmed_at(last: u64) -> SessionState {
        let mut state = state(SessionStatus::Confirmed);
        state.received_events_state.last_processed_sequence_num = last;
        state
    }

    #[test]
    fn in_order_data_advances_and_acks() {
        let result = receive(&key(), Some(confirmed_at(1)), &inbound(data(), Some(2)), &data(), now());

        assert_eq!(result.status, SessionStatus::Confirmed);
        assert_eq!(result.received_events_state.last_processed_sequence_num, 2);
        assert!(result.received_events_state.is_empty());
        assert!(result.send_ack);
    }

    #[test]
    fn duplicate_data_only_reacks() {
        let before = confirmed_at(2);
        let result = receive(&key(), Some(before.clone()), &inbound(data(), Some(2)), &data(), now());

        assert_eq!(result.status, SessionStatus::Confirmed);
        assert_eq!(result.received_events_state, before.received_events_state);
        assert!(result.send_ack);
        assert!(result.send_events_state.is_empty());
    }

    #[test]
    fn data_ahead_of_gap_is_deferred() {
        let result = receive(&key(), Some(confirmed_at(1)), &inbound(data(), Some(5)), &data(), now());

        assert_eq!(result.received_events_state.last_processed_sequence_num, 1);
        assert!(!result.send_ack);
    }

    #[test]
    fn data_at_counterparty_close_is_violation() {
        let mut closing = confirmed_at(3);
        closing.status = SessionStatus::Closing;
        closing.close_received = Some(4);

        let result = receive(&key(), Some(closing), &inbound(data(), Some(4)), &data(), now());
        assert_eq!(result.status, SessionStatus::Error);
        assert_eq!(error_count(&result), 1);
    }

    #[test]
    fn data_predating_close_is_accepted_and_absorbs_close() {
        let mut closing = confirmed_at(2);
        closing.status = SessionStatus::Closing;
        closing.close_received = Some(4);

        let result = receive(&key(), Some(closing), &inbound(data(), Some(3)), &data(), now());
        assert_eq!(result.status, SessionStatus::Closing);
        assert_eq!(result.received_events_state.last_processed_sequence_num, 4);
        assert!(result.send_ack);
    }

    #[test]
    fn data_while_created_confirms_session() {
        let result =
            receive(&key(), Some(state(SessionStatus::Created)), &inbound(data(), Some(1)), &data(), now());
        assert_eq!(result.status, SessionStatus::Confirmed);
    }

    #[test]
    fn data_without_state_is_error() {
        let result = receive(&key(), None, &inbound(data(), Some(1)), &data(), now());
        assert_eq!(result.status, SessionStatus::Error);
        assert_eq!(error_count(&result), 1);
    }

    #[test]
    fn errored_session_keeps_one_error_pending() {
        let errored = receive(&key(), None, &inbound(data(), Some(1)), &data(), now());
        let again = receive(&key(), Some(errored), &inbound(data(), Some(2)), &data(), now());

        assert_eq!(again.status, SessionStatus::Error);
        assert_eq!(error_count(&again), 1);
        assert_eq!(ack_count(&again), 0);
    }

    #[test]
    fn errored_session_requeues_error_once_drained() {
        let mut errored = state(SessionStatus::Error);
        errored.send_events_state.undelivered_messages.clear();

        let result = receive(&key(), Some(errored), &inbound(data(), Some(1)), &data(), now());
        assert_eq!(result.status, SessionStatus::Error);
        assert_eq!(error_count(&result), 1);
    }

    #[test]
    fn send_data_while_confirmed() {
        let result = send(&key(), Some(state(SessionStatus::Confirmed)), &outbound(data()), &data(), now());

        assert_eq!(result.status, SessionStatus::Confirmed);
        assert_eq!(result.send_events_state.last_processed_sequence_num, 1);
        assert_eq!(result.send_events_state.undelivered_messages[0].sequence_num, Some(1));
    }

    #[test]
    fn send_data_outside_confirmed_is_violation() {
        for status in [
            SessionStatus::Created,
            SessionStatus::Closing,
            SessionStatus::WaitForFinalAck,
            SessionStatus::Closed,
        ] {
            let result = send(&key(), Some(state(status)), &outbound(data()), &data(), now());
            assert_eq!(result.status, SessionStatus::Error, "from {status}");
            assert_eq!(error_count(&result), 1, "from {status}");
        }

        let result = send(&key(), None, &outbound(data()), &data(), now());
        assert_eq!(result.status, SessionStatus::Error);
        assert_eq!(error_count(&result), 1);
    }

    #[test]
    fn send_data_on_errored_session_queues_nothing() {
        let errored = state(SessionStatus::Error);
        let result = send(&key(), Some(errored.clone()), &outbound(data()), &data(), now());
        assert_eq!(result, errored);
    }
}
