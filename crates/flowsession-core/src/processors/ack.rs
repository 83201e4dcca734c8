//! Ack processors.

use flowsession_proto::{PayloadKind, SessionEvent, Timestamp, payloads::Ack};

use super::{reject, settle_close};
use crate::{
    error::Violation,
    state::{SessionKey, SessionState, SessionStatus},
};

/// Counterparty acknowledged numbered events.
///
/// Retires every covered event from the send queue. Acknowledgement of the
/// local Init completes the handshake; acknowledgement of the last numbered
/// send completes a close that was waiting for it, provided the
/// counterparty's events up to its Close have all been processed.
pub fn receive(
    key: &SessionKey,
    state: Option<SessionState>,
    event: &SessionEvent,
    ack: &Ack,
    now: Timestamp,
) -> SessionState {
    let Some(mut state) = state else {
        return reject(key, None, event, &Violation::NoSession { kind: event.kind() }, now);
    };

    state.last_received_message_time = now;
    state.send_events_state.retire(|queued| {
        queued.sequence_num.is_some_and(|seq| queued.is_numbered() && ack.covers(seq))
    });

    match state.status {
        SessionStatus::Created if !state.send_events_state.contains_kind(PayloadKind::Init) => {
            state.status = SessionStatus::Confirmed;
        },
        SessionStatus::WaitForFinalAck => settle_close(&mut state),
        _ => {},
    }
    state
}

/// Local party emits an Ack explicitly.
///
/// Queued unnumbered. Ignored once ERROR; the pending Error is the only
/// thing left to say.
pub fn send(
    key: &SessionKey,
    state: Option<SessionState>,
    event: &SessionEvent,
    _ack: &Ack,
    now: Timestamp,
) -> SessionState {
    let Some(mut state) = state else {
        return reject(key, None, event, &Violation::NoSession { kind: event.kind() }, now);
    };
    if state.status == SessionStatus::Error {
        return state;
    }

    let mut outbound = event.clone().with_timestamp(now);
    outbound.sequence_num = None;
    outbound.session_id.clone_from(&state.session_id);
    state.send_events_state.enqueue(outbound);
    state.send_ack = false;
    state
}

#[cfg(test)]
mod tests {
    use flowsession_proto::payloads::{Close, Data, Init};

    use super::*;
    use crate::processors::test_support::{error_count, inbound, key, now, outbound, state};

    fn queued(state: &mut SessionState, event: SessionEvent, seq: u64) {
        state.send_events_state.enqueue(event.with_sequence_num(seq));
        state.send_events_state.advance_to(seq);
    }

    #[test]
    fn ack_retires_covered_events() {
        let mut confirmed = state(SessionStatus::Confirmed);
        queued(&mut confirmed, outbound(Data::new(vec![1])), 1);
        queued(&mut confirmed, outbound(Data::new(vec![2])), 2);
        queued(&mut confirmed, outbound(Data::new(vec![3])), 3);

        let ack = Ack::upto(2);
        let result = receive(&key(), Some(confirmed), &inbound(ack.clone(), None), &ack, now());

        let remaining: Vec<_> =
            result.send_events_state.undelivered_messages.iter().map(|e| e.sequence_num).collect();
        assert_eq!(remaining, vec![Some(3)]);
        assert_eq!(result.send_events_state.last_processed_sequence_num, 3);
    }

    #[test]
    fn selective_ack_retires_only_listed() {
        let mut closing = state(SessionStatus::Closing);
        queued(&mut closing, outbound(Data::new(vec![1])), 1);
        queued(&mut closing, outbound(Close), 2);

        let ack = Ack { received_sequence_num: 0, out_of_order_sequence_nums: vec![2] };
        let result = receive(&key(), Some(closing), &inbound(ack.clone(), None), &ack, now());

        assert_eq!(result.send_events_state.len(), 1);
        assert_eq!(result.send_events_state.undelivered_messages[0].sequence_num, Some(1));
    }

    #[test]
    fn init_ack_confirms_session() {
        let mut created = state(SessionStatus::Created);
        queued(&mut created, outbound(Init::default()), 1);

        let ack = Ack::upto(1);
        let result = receive(&key(), Some(created), &inbound(ack.clone(), None), &ack, now());
        assert_eq!(result.status, SessionStatus::Confirmed);
        assert!(result.send_events_state.is_empty());
    }

    #[test]
    fn stale_ack_leaves_created() {
        let mut created = state(SessionStatus::Created);
        queued(&mut created, outbound(Init::default()), 1);

        let ack = Ack::upto(0);
        let result = receive(&key(), Some(created), &inbound(ack.clone(), None), &ack, now());
        assert_eq!(result.status, SessionStatus::Created);
    }

    #[test]
    fn final_ack_closes_session() {
        let mut waiting = state(SessionStatus::WaitForFinalAck);
        queued(&mut waiting, outbound(Data::new(vec![1])), 1);
        queued(&mut waiting, outbound(Close), 2);
        waiting.close_sent = Some(2);

        let partial = Ack::upto(1);
        let result = receive(&key(), Some(waiting), &inbound(partial.clone(), None), &partial, now());
        assert_eq!(result.status, SessionStatus::WaitForFinalAck);

        let last = Ack::upto(2);
        let result = receive(&key(), Some(result), &inbound(last.clone(), None), &last, now());
        assert_eq!(result.status, SessionStatus::Closed);
        assert!(result.send_events_state.is_empty());
    }

    #[test]
    fn ack_on_errored_session_keeps_error() {
        let mut errored = state(SessionStatus::Error);
        queued(&mut errored, outbound(Data::new(vec![1])), 1);

        let ack = Ack::upto(1);
        let result = receive(&key(), Some(errored), &inbound(ack.clone(), None), &ack, now());
        assert_eq!(result.status, SessionStatus::Error);
        assert!(result.send_events_state.is_empty());
    }

    #[test]
    fn ack_without_state_is_error() {
        let ack = Ack::upto(1);
        let result = receive(&key(), None, &inbound(ack.clone(), None), &ack, now());
        assert_eq!(result.status, SessionStatus::Error);
        assert_eq!(error_count(&result), 1);
    }

    #[test]
    fn send_ack_queues_unnumbered_and_clears_flag() {
        let mut confirmed = state(SessionStatus::Confirmed);
        confirmed.send_ack = true;

        let ack = Ack::upto(4);
        let result = send(&key(), Some(confirmed), &outbound(ack.clone()), &ack, now());
        assert!(!result.send_ack);
        assert_eq!(result.send_events_state.len(), 1);
        assert_eq!(result.send_events_state.undelivered_messages[0].sequence_num, None);
        assert_eq!(result.send_events_state.last_processed_sequence_num, 0);
    }

    #[test]
    fn send_ack_on_errored_session_is_ignored() {
        let errored = state(SessionStatus::Error);

        let ack = Ack::upto(1);
        let result = send(&key(), Some(errored.clone()), &outbound(ack.clone()), &ack, now());
        assert_eq!(result, errored);
    }
}
