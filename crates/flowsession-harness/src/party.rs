//! One participant and its session store.
//!
//! A party owns the persisted state for every session it takes part in and
//! runs each event through load, apply, store. It also plays its own
//! application: Data is handed over once the receive side has processed it,
//! inbound Init/Close/Error events are consumed from the inbox, and a
//! counterparty Close is answered with a local Close.

use std::collections::BTreeMap;

use bytes::Bytes;
use flowsession_core::{
    ConfigError, SessionKey, SessionManagerConfig, SessionState, SessionStatus, apply, manager,
};
use flowsession_proto::{
    MessageDirection, Payload, PayloadKind, SessionEvent, SessionProperties, Timestamp,
    payloads::{Close, Data, ErrorPayload, Init},
};
use tracing::debug;

/// A named participant.
pub struct Party {
    name: String,
    config: SessionManagerConfig,
    store: BTreeMap<SessionKey, SessionState>,
    delivered: BTreeMap<String, Vec<Bytes>>,
    consumed: BTreeMap<String, Vec<PayloadKind>>,
    close_on_remote_close: bool,
}

impl Party {
    /// Party with an empty store.
    pub fn new(name: impl Into<String>, config: SessionManagerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            name: name.into(),
            config,
            store: BTreeMap::new(),
            delivered: BTreeMap::new(),
            consumed: BTreeMap::new(),
            close_on_remote_close: true,
        })
    }

    /// Whether a counterparty Close is answered automatically. On by default.
    #[must_use]
    pub fn close_on_remote_close(mut self, enabled: bool) -> Self {
        self.close_on_remote_close = enabled;
        self
    }

    /// Party name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Store key this party uses for `session_id`.
    pub fn key_for(&self, session_id: &str) -> SessionKey {
        SessionKey::new(format!("{}:{session_id}", self.name))
    }

    /// Persisted state for `session_id`.
    pub fn state(&self, session_id: &str) -> Option<&SessionState> {
        self.store.get(&self.key_for(session_id))
    }

    /// Status for `session_id`.
    pub fn status(&self, session_id: &str) -> Option<SessionStatus> {
        self.state(session_id).map(|s| s.status)
    }

    /// Every stored session.
    pub fn sessions(&self) -> impl Iterator<Item = &SessionState> {
        self.store.values()
    }

    /// Data payloads handed to the application, in delivery order.
    pub fn delivered(&self, session_id: &str) -> &[Bytes] {
        self.delivered.get(session_id).map_or(&[], Vec::as_slice)
    }

    /// Kinds of inbox events the application consumed, in order.
    pub fn consumed(&self, session_id: &str) -> &[PayloadKind] {
        self.consumed.get(session_id).map_or(&[], Vec::as_slice)
    }

    /// Whether any session has something to transmit now or later.
    pub fn has_pending_messages(&self) -> bool {
        self.store.values().any(manager::has_pending_messages)
    }

    /// Open a session as initiator.
    pub fn open(
        &mut self,
        session_id: &str,
        properties: SessionProperties,
        now: Timestamp,
    ) -> SessionStatus {
        self.submit(session_id, Init { properties }, now)
    }

    /// Send application data.
    pub fn send_data(
        &mut self,
        session_id: &str,
        payload: impl Into<Bytes>,
        now: Timestamp,
    ) -> SessionStatus {
        self.submit(session_id, Data::new(payload), now)
    }

    /// Close the local direction.
    pub fn close(&mut self, session_id: &str, now: Timestamp) -> SessionStatus {
        self.submit(session_id, Close, now)
    }

    /// Abort the session.
    pub fn abort(&mut self, session_id: &str, reason: &str, now: Timestamp) -> SessionStatus {
        self.submit(session_id, ErrorPayload::new("flowsession.application.abort", reason), now)
    }

    /// Apply a locally produced event.
    pub fn submit(
        &mut self,
        session_id: &str,
        payload: impl Into<Payload>,
        now: Timestamp,
    ) -> SessionStatus {
        let event = SessionEvent::new(session_id, MessageDirection::Outbound, now, payload);
        self.apply_event(&event, now).status
    }

    /// Apply an event published by the counterparty, then let the
    /// application drain what became consumable.
    pub fn receive(&mut self, event: &SessionEvent, now: Timestamp) {
        let mut event = event.clone();
        event.direction = MessageDirection::Inbound;

        let before = self
            .state(&event.session_id)
            .map_or(0, |s| s.received_events_state.last_processed_sequence_num);
        let next = self.apply_event(&event, now);
        let after = next.received_events_state.last_processed_sequence_num;
        let status = next.status;

        if let (Payload::Data(data), Some(seq)) = (&event.payload, event.sequence_num)
            && status != SessionStatus::Error
            && before < seq
            && seq <= after
        {
            self.delivered.entry(event.session_id.clone()).or_default().push(data.payload.clone());
        }

        self.drain_inbox(&event.session_id, now);
    }

    /// Everything due for transmission across all sessions.
    pub fn flush(&mut self, now: Timestamp) -> Vec<SessionEvent> {
        let mut out = Vec::new();
        for (key, state) in std::mem::take(&mut self.store) {
            let (state, events) = manager::messages_to_send(&key, state, now, &self.config);
            out.extend(events);
            self.store.insert(key, state);
        }
        out
    }

    fn apply_event(&mut self, event: &SessionEvent, now: Timestamp) -> &SessionState {
        let key = self.key_for(&event.session_id);
        let prior = self.store.remove(&key);
        let next = apply(&key, prior, event, now);
        self.store.entry(key).or_insert(next)
    }

    fn drain_inbox(&mut self, session_id: &str, now: Timestamp) {
        let key = self.key_for(session_id);
        loop {
            let Some(state) = self.store.remove(&key) else {
                return;
            };

            let last = state.received_events_state.last_processed_sequence_num;
            let consumable = manager::next_received_event(&state)
                .is_some_and(|e| e.sequence_num.is_none_or(|seq| seq <= last));
            if !consumable {
                self.store.insert(key, state);
                return;
            }

            let (state, event) = manager::take_received_event(state);
            let answer_close = self.close_on_remote_close
                && state.close_sent.is_none()
                && !state.is_terminal();
            self.store.insert(key.clone(), state);

            let Some(event) = event else {
                return;
            };
            debug!(party = %self.name, session_id, kind = %event.kind(), "consumed");
            self.consumed.entry(session_id.to_string()).or_default().push(event.kind());

            if event.kind() == PayloadKind::Close && answer_close {
                self.close(session_id, now);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(millis: u64) -> Timestamp {
        Timestamp::from_millis(millis)
    }

    fn party(name: &str) -> Party {
        Party::new(name, SessionManagerConfig::default()).unwrap()
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = SessionManagerConfig {
            message_resend_window: std::time::Duration::ZERO,
            ..SessionManagerConfig::default()
        };
        assert!(Party::new("alice", config).is_err());
    }

    #[test]
    fn handshake_over_direct_hand_off() {
        let mut alice = party("alice");
        let mut bob = party("bob");

        assert_eq!(alice.open("s1", SessionProperties::new(), at(0)), SessionStatus::Created);
        for event in alice.flush(at(0)) {
            bob.receive(&event, at(1));
        }
        assert_eq!(bob.status("s1"), Some(SessionStatus::Confirmed));
        assert_eq!(bob.consumed("s1"), &[PayloadKind::Init]);

        for event in bob.flush(at(1)) {
            alice.receive(&event, at(2));
        }
        assert_eq!(alice.status("s1"), Some(SessionStatus::Confirmed));
        assert!(!alice.has_pending_messages());
    }

    #[test]
    fn data_is_delivered_once() {
        let mut alice = party("alice");
        let mut bob = party("bob");
        alice.open("s1", SessionProperties::new(), at(0));
        for event in alice.flush(at(0)) {
            bob.receive(&event, at(1));
        }
        for event in bob.flush(at(1)) {
            alice.receive(&event, at(2));
        }

        alice.send_data("s1", &b"hello"[..], at(3));
        let sent = alice.flush(at(3));
        for event in sent.iter().chain(sent.iter()) {
            bob.receive(event, at(4));
        }

        assert_eq!(bob.delivered("s1"), &[Bytes::from_static(b"hello")]);
    }

    #[test]
    fn keys_are_scoped_by_party() {
        let alice = party("alice");
        assert_eq!(alice.key_for("s1").as_str(), "alice:s1");
    }
}
