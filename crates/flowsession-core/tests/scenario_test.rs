//! End-to-end transitions through the driver.
//!
//! Each test starts from a hand-built state and applies events the way the
//! surrounding engine would: load, apply, store.

use flowsession_core::{SessionKey, SessionState, SessionStatus, apply};
use flowsession_proto::{
    MessageDirection, Payload, SessionEvent, Timestamp,
    payloads::{Ack, Close, Data, Init},
};

fn key() -> SessionKey {
    SessionKey::new("bob:flow-7")
}

fn now() -> Timestamp {
    Timestamp::from_millis(42_000)
}

fn inbound(payload: impl Into<Payload>, seq: u64) -> SessionEvent {
    SessionEvent::new("flow-7", MessageDirection::Inbound, now(), payload).with_sequence_num(seq)
}

fn outbound(payload: impl Into<Payload>) -> SessionEvent {
    SessionEvent::new("flow-7", MessageDirection::Outbound, now(), payload)
}

fn confirmed() -> SessionState {
    SessionState::new("flow-7", SessionStatus::Confirmed, now())
}

fn count(state: &SessionState, pred: impl Fn(&Payload) -> bool) -> usize {
    state.send_events_state.undelivered_messages.iter().filter(|e| pred(&e.payload)).count()
}

fn errors(state: &SessionState) -> usize {
    count(state, |p| matches!(p, Payload::Error(_)))
}

fn acks(state: &SessionState) -> usize {
    count(state, |p| matches!(p, Payload::Ack(_)))
}

#[test]
fn receive_init_opens_confirmed_session() {
    let state = apply(&key(), None, &inbound(Init::default(), 1), now());

    assert_eq!(state.status, SessionStatus::Confirmed);
    assert_eq!(state.received_events_state.last_processed_sequence_num, 1);
    assert!(state.send_ack);
}

#[test]
fn close_with_unconsumed_inbox_aborts() {
    let mut state = confirmed();
    state.received_events_state.enqueue(inbound(Data::new(&b"unread"[..]), 1));
    state.received_events_state.advance_to(1);

    let state = apply(&key(), Some(state), &outbound(Close), now());

    assert_eq!(state.status, SessionStatus::Error);
    assert_eq!(errors(&state), 1);
}

#[test]
fn local_close_then_mirror_close_closes() {
    let state = apply(&key(), Some(confirmed()), &outbound(Close), now());
    assert_eq!(state.status, SessionStatus::Closing);
    assert_eq!(count(&state, |p| matches!(p, Payload::Close(_))), 1);

    let state = apply(&key(), Some(state), &inbound(Close, 1), now());
    assert_eq!(state.status, SessionStatus::Closed);
    assert_eq!(acks(&state), 1);
}

#[test]
fn mirror_close_with_unacked_send_waits_for_final_ack() {
    let data = outbound(Data::new(&b"last words"[..]));
    let state = apply(&key(), Some(confirmed()), &data, now());
    let state = apply(&key(), Some(state), &outbound(Close), now());
    assert_eq!(state.status, SessionStatus::Closing);

    let state = apply(&key(), Some(state), &inbound(Close, 1), now());
    assert_eq!(state.status, SessionStatus::WaitForFinalAck);

    let queued = &state.send_events_state.undelivered_messages;
    assert!(
        queued.iter().any(|e| matches!(e.payload, Payload::Data(_)) && e.sequence_num == Some(1))
    );
    assert_eq!(acks(&state), 1);
}

#[test]
fn duplicate_data_is_reacked_only() {
    let mut state = confirmed();
    state.received_events_state.advance_to(2);

    let next = apply(&key(), Some(state.clone()), &inbound(Data::new(&b"again"[..]), 2), now());

    assert_eq!(next.status, SessionStatus::Confirmed);
    assert!(next.send_ack);
    assert_eq!(next.received_events_state, state.received_events_state);
}

#[test]
fn data_at_or_after_counterparty_close_aborts() {
    let mut state = SessionState::new("flow-7", SessionStatus::Closing, now());
    state.received_events_state.advance_to(3);
    state.close_received = Some(4);

    let state = apply(&key(), Some(state), &inbound(Data::new(&b"late"[..]), 4), now());

    assert_eq!(state.status, SessionStatus::Error);
    assert_eq!(errors(&state), 1);
}

#[test]
fn remote_close_first_then_local_close_then_final_ack() {
    let state = apply(&key(), Some(confirmed()), &inbound(Close, 1), now());
    assert_eq!(state.status, SessionStatus::Closing);

    // The application consumes the Close before answering it.
    let mut state = state;
    state.received_events_state.remove(1);

    let state = apply(&key(), Some(state), &outbound(Close), now());
    assert_eq!(state.status, SessionStatus::WaitForFinalAck);
    assert_eq!(state.close_sent, Some(1));

    let ack = SessionEvent::new("flow-7", MessageDirection::Inbound, now(), Ack::upto(1));
    let state = apply(&key(), Some(state), &ack, now());
    assert_eq!(state.status, SessionStatus::Closed);
}

#[test]
fn close_ahead_of_gap_is_absorbed_when_gap_fills() {
    let state = apply(&key(), Some(confirmed()), &inbound(Close, 2), now());
    assert_eq!(state.close_received, Some(2));
    assert_eq!(state.received_events_state.last_processed_sequence_num, 0);

    let state = apply(&key(), Some(state), &inbound(Data::new(&b"first"[..]), 1), now());
    assert_eq!(state.received_events_state.last_processed_sequence_num, 2);
    assert_ne!(state.status, SessionStatus::Error);

    // Data is handed over by the caller; only the Close waits in the inbox.
    let seqs: Vec<_> =
        state.received_events_state.undelivered_messages.iter().map(|e| e.sequence_num).collect();
    assert_eq!(seqs, vec![Some(2)]);
}

#[test]
fn early_mirror_close_does_not_close_before_missing_data() {
    let mut state = confirmed();
    state.received_events_state.last_processed_sequence_num = 2;
    let state = apply(&key(), Some(state), &outbound(Close), now());
    assert_eq!(state.status, SessionStatus::Closing);

    let state = apply(&key(), Some(state), &inbound(Close, 5), now());
    assert_eq!(state.status, SessionStatus::Closing);

    let state = apply(&key(), Some(state), &inbound(Data::new(&b"three"[..]), 3), now());
    assert_eq!(state.status, SessionStatus::Closing);
    assert_eq!(state.received_events_state.last_processed_sequence_num, 3);

    let state = apply(&key(), Some(state), &inbound(Data::new(&b"four"[..]), 4), now());
    assert_eq!(state.status, SessionStatus::Closed);
    assert_eq!(state.received_events_state.last_processed_sequence_num, 5);
    assert_eq!(errors(&state), 0);
}
