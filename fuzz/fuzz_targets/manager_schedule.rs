#![no_main]

//! Interleaves driver applications with outbound scheduling.
//!
//! Whatever the schedule, nothing handed to the transport is an Ack or
//! Error that was already handed out, and a terminal session stays
//! terminal.

use std::time::Duration;

use arbitrary::Arbitrary;
use flowsession_core::{manager, SessionKey, SessionManagerConfig, SessionState, apply};
use flowsession_proto::{
    payloads::{Ack, Close, Data, Init},
    MessageDirection, Payload, SessionEvent, Timestamp,
};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
enum Op {
    SendData(Vec<u8>),
    SendClose,
    ReceiveAck(u8),
    ReceiveData(u8),
    ReceiveClose(u8),
    Flush { advance_ms: u16 },
    Consume,
}

fuzz_target!(|ops: Vec<Op>| {
    let key = SessionKey::new("fuzz:sched");
    let config = SessionManagerConfig {
        message_resend_window: Duration::from_millis(100),
        session_timeout_window: Duration::from_secs(5),
    };
    let mut now = Timestamp::from_millis(0);

    let init = SessionEvent::new("sched", MessageDirection::Inbound, now, Init::default())
        .with_sequence_num(1);
    let mut state: SessionState = apply(&key, None, &init, now);

    for op in ops {
        let was_terminal = manager::is_terminal(&state);

        let (direction, payload, seq): (_, Payload, _) = match op {
            Op::SendData(bytes) => (MessageDirection::Outbound, Data::new(bytes).into(), None),
            Op::SendClose => (MessageDirection::Outbound, Close.into(), None),
            Op::ReceiveAck(n) => (MessageDirection::Inbound, Ack::upto(u64::from(n)).into(), None),
            Op::ReceiveData(n) => {
                (MessageDirection::Inbound, Data::new(vec![n]).into(), Some(u64::from(n)))
            },
            Op::ReceiveClose(n) => (MessageDirection::Inbound, Close.into(), Some(u64::from(n))),
            Op::Flush { advance_ms } => {
                now = now + Duration::from_millis(u64::from(advance_ms));
                let (next, out) = manager::messages_to_send(&key, state, now, &config);
                for event in &out {
                    assert_eq!(event.timestamp, now);
                }
                assert!(!next.send_ack);
                assert!(next
                    .send_events_state
                    .undelivered_messages
                    .iter()
                    .all(|e| e.is_numbered() || e.timestamp > now));
                state = next;
                continue;
            },
            Op::Consume => {
                let (next, _) = manager::take_received_event(state);
                state = next;
                continue;
            },
        };

        let event = SessionEvent::new("sched", direction, now, payload);
        let event = match seq {
            Some(seq) => event.with_sequence_num(seq),
            None => event,
        };
        state = apply(&key, Some(state), &event, now);

        if was_terminal {
            assert!(manager::is_terminal(&state));
        }
    }
});
