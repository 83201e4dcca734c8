#![no_main]

//! Arbitrary event sequences against the driver.
//!
//! Checks that the high-water marks never decrease, that ERROR is never
//! left, and that an aborted session's send queue stays bounded.

use arbitrary::Arbitrary;
use flowsession_core::{SessionKey, SessionState, SessionStatus, apply};
use flowsession_proto::{
    payloads::{
        Ack, Close, Confirm, CounterpartyInfoRequest, CounterpartyInfoResponse, Data,
        ErrorPayload, Init,
    },
    MessageDirection, Payload, SessionEvent, Timestamp,
};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
enum Kind {
    Init,
    Ack { upto: u8, selective: Vec<u8> },
    Confirm,
    InfoRequest,
    InfoResponse,
    Data(Vec<u8>),
    Close,
    Error,
}

#[derive(Debug, Arbitrary)]
struct Op {
    inbound: bool,
    kind: Kind,
    sequence_num: Option<u8>,
    advance_ms: u16,
}

impl Op {
    fn event(self, now: Timestamp) -> SessionEvent {
        let payload: Payload = match self.kind {
            Kind::Init => Init::default().into(),
            Kind::Ack { upto, selective } => Ack {
                received_sequence_num: u64::from(upto),
                out_of_order_sequence_nums: selective.into_iter().map(u64::from).collect(),
            }
            .into(),
            Kind::Confirm => Confirm::default().into(),
            Kind::InfoRequest => CounterpartyInfoRequest::default().into(),
            Kind::InfoResponse => CounterpartyInfoResponse::default().into(),
            Kind::Data(bytes) => Data::new(bytes).into(),
            Kind::Close => Close.into(),
            Kind::Error => ErrorPayload::new("fuzz", "fuzz").into(),
        };
        let direction =
            if self.inbound { MessageDirection::Inbound } else { MessageDirection::Outbound };
        let event = SessionEvent::new("fuzz", direction, now, payload);
        match self.sequence_num {
            Some(seq) => event.with_sequence_num(u64::from(seq)),
            None => event,
        }
    }
}

fuzz_target!(|ops: Vec<Op>| {
    let key = SessionKey::new("fuzz:fuzz");
    let mut now = Timestamp::from_millis(0);
    let mut state: Option<SessionState> = None;
    let mut error_bound: Option<usize> = None;

    for op in ops {
        now = now + std::time::Duration::from_millis(u64::from(op.advance_ms));
        let event = op.event(now);

        let before = state.as_ref().map(|s| {
            (
                s.received_events_state.last_processed_sequence_num,
                s.send_events_state.last_processed_sequence_num,
            )
        });
        let next = apply(&key, state, &event, now);

        if let Some((received, sent)) = before {
            assert!(next.received_events_state.last_processed_sequence_num >= received);
            assert!(next.send_events_state.last_processed_sequence_num >= sent);
        }

        match error_bound {
            Some(bound) => {
                assert_eq!(next.status, SessionStatus::Error);
                assert!(next.send_events_state.len() <= bound + 1);
            },
            None if next.status == SessionStatus::Error => {
                error_bound = Some(next.send_events_state.len());
            },
            None => {},
        }

        state = Some(next);
    }
});
