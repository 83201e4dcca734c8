//! Session manager.
//!
//! Helpers the caller uses between transitions: deciding what to put on the
//! transport right now, handing inbound events to the application, and
//! aborting sessions whose counterparty has gone silent.
//!
//! Like the processors these are pure. They take a state and a timestamp and
//! return a new state plus whatever the caller should act on.
//!
//! # Outbound scheduling
//!
//! For queued outbound events the `timestamp` is the instant the event is
//! next due. Processors queue events due immediately. When an event is
//! handed out, numbered events are re-stamped one resend window later and
//! stay queued until acknowledged; Acks and Errors are one-shot and leave
//! the queue.

use flowsession_proto::{SequenceNum, SessionEvent, Timestamp};
use tracing::{debug, trace, warn};

use crate::{
    config::SessionManagerConfig,
    error::Violation,
    processors::{ack_event, fail},
    state::{SessionKey, SessionState, SessionStatus},
};

/// Next inbound event the application has not consumed yet.
pub fn next_received_event(state: &SessionState) -> Option<&SessionEvent> {
    state.received_events_state.front()
}

/// The application consumed the inbound event with `sequence_num`.
///
/// Consuming an unknown sequence number is a no-op.
pub fn acknowledge_received_event(
    mut state: SessionState,
    sequence_num: SequenceNum,
) -> SessionState {
    state.received_events_state.remove(sequence_num);
    state
}

/// Consume the next inbound event, numbered or not.
///
/// The only way to consume an unnumbered counterparty Error.
pub fn take_received_event(mut state: SessionState) -> (SessionState, Option<SessionEvent>) {
    let event = state.received_events_state.pop_front();
    (state, event)
}

/// Whether the session reached CLOSED or ERROR.
pub fn is_terminal(state: &SessionState) -> bool {
    state.is_terminal()
}

/// Whether anything is queued or an Ack is owed.
pub fn has_pending_messages(state: &SessionState) -> bool {
    state.send_ack || !state.send_events_state.is_empty()
}

/// Events to hand to the transport at `now`.
///
/// Checks the session timeout first, so a timed-out session returns its
/// Error in the same call. A pending-ack flag produces one bare Ack and is
/// cleared. Once ERROR, unacknowledged numbered events are abandoned.
pub fn messages_to_send(
    key: &SessionKey,
    state: SessionState,
    now: Timestamp,
    config: &SessionManagerConfig,
) -> (SessionState, Vec<SessionEvent>) {
    let mut state = check_timeout(key, state, now, config);
    let mut out = Vec::new();

    // An aborted session only reports the abort.
    if state.status == SessionStatus::Error {
        state.send_events_state.retire(SessionEvent::is_numbered);
    }

    let queued = std::mem::take(&mut state.send_events_state.undelivered_messages);
    for mut event in queued {
        if event.timestamp > now {
            state.send_events_state.undelivered_messages.push(event);
            continue;
        }
        out.push(event.clone().with_timestamp(now));

        // Acks and Errors are not retransmitted.
        if event.is_numbered() {
            trace!(
                session_key = %key,
                kind = %event.kind(),
                sequence_num = ?event.sequence_num,
                "handing numbered event to transport"
            );
            event.timestamp = now + config.message_resend_window;
            state.send_events_state.undelivered_messages.push(event);
        }
    }

    if state.send_ack {
        out.push(ack_event(&state, now));
        state.send_ack = false;
    }

    (state, out)
}

/// Give up on a session that has outstanding sends and has heard nothing from
/// the counterparty for the configured window.
///
/// A live session is aborted. A CLOSED session keeps its status and stops
/// resending its unacknowledged Close, so the caller can release it.
pub fn check_timeout(
    key: &SessionKey,
    mut state: SessionState,
    now: Timestamp,
    config: &SessionManagerConfig,
) -> SessionState {
    if state.status == SessionStatus::Error || state.unacked_sends().next().is_none() {
        return state;
    }

    let elapsed = now.saturating_duration_since(state.last_received_message_time);
    if elapsed <= config.session_timeout_window {
        return state;
    }

    if state.status == SessionStatus::Closed {
        let abandoned = state.send_events_state.retire(SessionEvent::is_numbered);
        debug!(session_key = %key, ?elapsed, abandoned, "abandoning unacknowledged close");
        return state;
    }

    warn!(session_key = %key, ?elapsed, "session timed out");
    fail(key, state, &Violation::Timeout { elapsed }, now)
}
