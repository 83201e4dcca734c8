//! Delivery tracking for one direction of a session.
//!
//! A session keeps two of these. The send side holds outbound events the
//! counterparty has not acknowledged yet (plus one-shot Acks and Errors
//! waiting to be handed to the transport). The receive side holds inbound
//! events the local application has not consumed yet.

use flowsession_proto::{PayloadKind, SequenceNum, SessionEvent};
use serde::{Deserialize, Serialize};

/// Ordered queue plus high-water mark for one direction.
///
/// Numbered events are kept in increasing sequence order, unnumbered events
/// in insertion order after them. `last_processed_sequence_num` never
/// decreases.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryTrackingState {
    /// Highest sequence number fully processed in this direction
    pub last_processed_sequence_num: SequenceNum,
    /// Events still waiting for acknowledgement or consumption
    pub undelivered_messages: Vec<SessionEvent>,
}

impl DeliveryTrackingState {
    /// Empty queue, nothing processed.
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no events are waiting.
    pub fn is_empty(&self) -> bool {
        self.undelivered_messages.is_empty()
    }

    /// Number of waiting events.
    pub fn len(&self) -> usize {
        self.undelivered_messages.len()
    }

    /// Oldest waiting event.
    pub fn front(&self) -> Option<&SessionEvent> {
        self.undelivered_messages.first()
    }

    /// Raise the high-water mark. Lower values are ignored.
    pub fn advance_to(&mut self, sequence_num: SequenceNum) {
        self.last_processed_sequence_num = self.last_processed_sequence_num.max(sequence_num);
    }

    /// Queue an event, keeping numbered events sorted.
    ///
    /// A numbered event whose sequence number is already queued is dropped.
    pub fn enqueue(&mut self, event: SessionEvent) {
        let Some(seq) = event.sequence_num else {
            self.undelivered_messages.push(event);
            return;
        };

        if self.position_of(seq).is_some() {
            return;
        }

        let index = self
            .undelivered_messages
            .iter()
            .position(|queued| queued.sequence_num.is_none_or(|queued_seq| queued_seq > seq))
            .unwrap_or(self.undelivered_messages.len());
        self.undelivered_messages.insert(index, event);
    }

    /// Queue an event unless an identical one is already waiting.
    pub fn enqueue_unique(&mut self, event: SessionEvent) {
        if !self.undelivered_messages.contains(&event) {
            self.enqueue(event);
        }
    }

    /// Remove and return the oldest waiting event.
    pub fn pop_front(&mut self) -> Option<SessionEvent> {
        if self.undelivered_messages.is_empty() {
            return None;
        }
        Some(self.undelivered_messages.remove(0))
    }

    /// Remove the numbered event with `sequence_num`.
    pub fn remove(&mut self, sequence_num: SequenceNum) -> Option<SessionEvent> {
        self.position_of(sequence_num).map(|index| self.undelivered_messages.remove(index))
    }

    /// Drop every event matching `retire`, returning how many were removed.
    pub fn retire(&mut self, mut retire: impl FnMut(&SessionEvent) -> bool) -> usize {
        let before = self.undelivered_messages.len();
        self.undelivered_messages.retain(|event| !retire(event));
        before - self.undelivered_messages.len()
    }

    /// Whether an event of `kind` is waiting.
    pub fn contains_kind(&self, kind: PayloadKind) -> bool {
        self.undelivered_messages.iter().any(|event| event.kind() == kind)
    }

    fn position_of(&self, sequence_num: SequenceNum) -> Option<usize> {
        self.undelivered_messages.iter().position(|event| event.sequence_num == Some(sequence_num))
    }
}

#[cfg(test)]
mod tests {
    use flowsession_proto::{
        MessageDirection, Timestamp,
        payloads::{Ack, Data},
    };

    use super::*;

    fn data(seq: SequenceNum) -> SessionEvent {
        SessionEvent::new("s1", MessageDirection::Outbound, Timestamp::default(), Data::new(vec![]))
            .with_sequence_num(seq)
    }

    fn ack() -> SessionEvent {
        SessionEvent::new("s1", MessageDirection::Outbound, Timestamp::default(), Ack::upto(1))
    }

    fn sequence(queue: &DeliveryTrackingState) -> Vec<Option<SequenceNum>> {
        queue.undelivered_messages.iter().map(|e| e.sequence_num).collect()
    }

    #[test]
    fn numbered_events_stay_sorted() {
        let mut queue = DeliveryTrackingState::new();
        queue.enqueue(data(3));
        queue.enqueue(ack());
        queue.enqueue(data(1));
        queue.enqueue(data(2));

        assert_eq!(sequence(&queue), vec![Some(1), Some(2), Some(3), None]);
    }

    #[test]
    fn duplicate_sequence_is_dropped() {
        let mut queue = DeliveryTrackingState::new();
        queue.enqueue(data(1));
        queue.enqueue(data(1));

        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn enqueue_unique_skips_identical_unnumbered() {
        let mut queue = DeliveryTrackingState::new();
        queue.enqueue_unique(ack());
        queue.enqueue_unique(ack());

        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn advance_never_decreases() {
        let mut queue = DeliveryTrackingState::new();
        queue.advance_to(5);
        queue.advance_to(2);

        assert_eq!(queue.last_processed_sequence_num, 5);
    }

    #[test]
    fn remove_and_retire() {
        let mut queue = DeliveryTrackingState::new();
        queue.enqueue(data(1));
        queue.enqueue(data(2));
        queue.enqueue(ack());

        assert_eq!(queue.remove(2).and_then(|e| e.sequence_num), Some(2));
        assert!(queue.remove(9).is_none());

        let retired = queue.retire(|e| !e.is_numbered());
        assert_eq!(retired, 1);
        assert_eq!(sequence(&queue), vec![Some(1)]);
        assert!(queue.contains_kind(PayloadKind::Data));
        assert!(!queue.contains_kind(PayloadKind::Ack));
    }
}
