//! Transition processors.
//!
//! One pure function per (payload, direction) pair. Every processor has the
//! same shape:
//!
//! ```text
//! (key, Option<SessionState>, &SessionEvent, &payload, now) -> SessionState
//! ```
//!
//! The prior state is taken by value, so the caller's copy is never touched.
//! Processors perform no I/O and do not log; [`crate::driver`] does that.
//!
//! Shared rules:
//! - No prior state is a violation for everything except Init and Error.
//! - Once ERROR, local sends other than Ack and Error leave the state as is;
//!   inbound events re-queue an Error unless one is already pending.
//! - Inbound numbered events are processed in order. Duplicates are re-acked,
//!   events ahead of a gap are deferred until the counterparty retransmits.

pub mod ack;
pub mod close;
pub mod confirm;
pub mod counterparty_info;
pub mod data;
pub mod error;
pub mod init;

use flowsession_proto::{
    MessageDirection, PayloadKind, SequenceNum, SessionEvent, Timestamp,
    payloads::{Ack, ErrorPayload},
};

use crate::{
    error::Violation,
    state::{SessionKey, SessionState, SessionStatus},
};

/// Where an inbound numbered event falls relative to what was processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Arrival {
    /// Already processed; re-ack only
    Duplicate,
    /// Exactly the next expected sequence number
    Next,
    /// Beyond a gap; wait for the retransmission of the missing events
    Ahead,
}

pub(crate) fn classify(state: &SessionState, sequence_num: SequenceNum) -> Arrival {
    let last = state.received_events_state.last_processed_sequence_num;
    if sequence_num <= last {
        Arrival::Duplicate
    } else if sequence_num == last + 1 {
        Arrival::Next
    } else {
        Arrival::Ahead
    }
}

/// Outbound Error event describing `violation`.
pub(crate) fn error_event(
    key: &SessionKey,
    session_id: &str,
    violation: &Violation,
    now: Timestamp,
) -> SessionEvent {
    let payload =
        ErrorPayload::new(violation.error_type(), format!("session {key}: {violation}"));
    SessionEvent::new(session_id, MessageDirection::Outbound, now, payload)
}

/// Outbound Ack covering everything processed on the receive side.
///
/// A counterparty Close that overtook earlier events is acked selectively.
pub fn ack_event(state: &SessionState, now: Timestamp) -> SessionEvent {
    let received = state.received_events_state.last_processed_sequence_num;
    let out_of_order = state.close_received.into_iter().filter(|close| *close > received).collect();
    let ack = Ack { received_sequence_num: received, out_of_order_sequence_nums: out_of_order };
    SessionEvent::new(state.session_id.as_str(), MessageDirection::Outbound, now, ack)
}

/// Move `state` to ERROR and make sure an Error is waiting for the
/// counterparty.
pub(crate) fn fail(
    key: &SessionKey,
    mut state: SessionState,
    violation: &Violation,
    now: Timestamp,
) -> SessionState {
    let error = error_event(key, &state.session_id, violation, now);
    state.status = SessionStatus::Error;
    state.send_ack = false;
    if !state.send_events_state.contains_kind(PayloadKind::Error) {
        state.send_events_state.enqueue(error);
    }
    state
}

/// Brand-new ERROR state for an event that needed an existing session.
pub(crate) fn fail_without_state(
    key: &SessionKey,
    event: &SessionEvent,
    violation: &Violation,
    now: Timestamp,
) -> SessionState {
    let state = SessionState::new(event.session_id.as_str(), SessionStatus::Error, now);
    fail(key, state, violation, now)
}

/// Reject an event against an optional prior state.
pub(crate) fn reject(
    key: &SessionKey,
    state: Option<SessionState>,
    event: &SessionEvent,
    violation: &Violation,
    now: Timestamp,
) -> SessionState {
    match state {
        Some(state) => fail(key, state, violation, now),
        None => fail_without_state(key, event, violation, now),
    }
}

/// Append a locally produced numbered event to the send queue.
///
/// The event takes the next send sequence number and is due for transmission
/// immediately.
pub(crate) fn queue_numbered_send(
    state: &mut SessionState,
    event: &SessionEvent,
    now: Timestamp,
) -> SequenceNum {
    let seq = state.next_send_sequence_num();
    let mut outbound = event.clone().with_sequence_num(seq).with_timestamp(now);
    outbound.direction = MessageDirection::Outbound;
    outbound.session_id.clone_from(&state.session_id);
    state.send_events_state.enqueue(outbound);
    state.send_events_state.advance_to(seq);
    seq
}

/// Advance past a recorded counterparty Close once the gap before it closes.
pub(crate) fn absorb_pending_close(state: &mut SessionState) {
    let last = state.received_events_state.last_processed_sequence_num;
    if state.close_received == Some(last + 1) {
        state.received_events_state.advance_to(last + 1);
        settle_close(state);
    }
}

/// Finish a close once both Closes are recorded and every counterparty event
/// up to its Close has been processed.
///
/// CLOSING becomes CLOSED, or WAIT_FOR_FINAL_ACK while earlier local sends are
/// unacknowledged. WAIT_FOR_FINAL_ACK becomes CLOSED once nothing numbered is
/// left to acknowledge.
pub(crate) fn settle_close(state: &mut SessionState) {
    let last = state.received_events_state.last_processed_sequence_num;
    let stream_complete = state.close_received.is_some_and(|close| close <= last);
    if state.close_sent.is_none() || !stream_complete {
        return;
    }

    state.status = match state.status {
        SessionStatus::Closing if state.has_unacked_sends_besides_close() => {
            SessionStatus::WaitForFinalAck
        },
        SessionStatus::Closing => SessionStatus::Closed,
        SessionStatus::WaitForFinalAck if state.unacked_sends().next().is_none() => {
            SessionStatus::Closed
        },
        status => status,
    };
}

/// Queue a fresh Ack, replacing any Ack still waiting to go out.
///
/// A newer Ack covers everything an older one did.
pub(crate) fn queue_ack(state: &mut SessionState, now: Timestamp) {
    state.send_events_state.retire(|queued| queued.kind() == PayloadKind::Ack);
    let ack = ack_event(state, now);
    state.send_events_state.enqueue(ack);
}

/// Common receive path for numbered events other than Init and Close.
///
/// Rejects events at or beyond the counterparty's Close, re-acks duplicates,
/// defers events ahead of a gap, and runs `on_next` for the next in-order
/// event before advancing the high-water mark.
pub(crate) fn receive_numbered(
    key: &SessionKey,
    mut state: SessionState,
    event: &SessionEvent,
    now: Timestamp,
    on_next: impl FnOnce(&mut SessionState, SequenceNum, Timestamp),
) -> SessionState {
    if state.status == SessionStatus::Error {
        return fail(key, state, &Violation::SessionAborted { kind: event.kind() }, now);
    }

    let Some(seq) = event.sequence_num else {
        return fail(key, state, &Violation::MissingSequenceNum { kind: event.kind() }, now);
    };

    if let Some(close) = state.close_received
        && seq >= close
    {
        let violation = Violation::AfterClose { kind: event.kind(), sequence_num: seq, close };
        return fail(key, state, &violation, now);
    }

    state.last_received_message_time = now;
    match classify(&state, seq) {
        Arrival::Duplicate => state.send_ack = true,
        Arrival::Ahead => {},
        Arrival::Next => {
            on_next(&mut state, seq, now);
            state.received_events_state.advance_to(seq);
            absorb_pending_close(&mut state);
            state.send_ack = true;
        },
    }
    state
}
