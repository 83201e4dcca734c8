//! Session payload structs.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::{event::SequenceNum, properties::SessionProperties};

/// Session open request
///
/// # Protocol Flow
///
/// 1. Initiator sends Init carrying its session properties
/// 2. Responder creates the session, queues the Init for its application
///    and acknowledges it
/// 3. Responder replies with Confirm (or CounterpartyInfoResponse) carrying
///    its own properties
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Init {
    /// Initiator's session properties
    pub properties: SessionProperties,
}

/// Responder's reply to an Init
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confirm {
    /// Responder's session properties
    pub properties: SessionProperties,
}

/// Ask the counterparty for its session properties
///
/// Receipt automatically queues a [`CounterpartyInfoResponse`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterpartyInfoRequest {
    /// Requester's session properties
    pub properties: SessionProperties,
}

/// Reply to a [`CounterpartyInfoRequest`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterpartyInfoResponse {
    /// Responder's session properties
    pub properties: SessionProperties,
}

/// Application payload
///
/// The bytes are opaque to the session layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Data {
    /// Opaque application bytes
    pub payload: Bytes,
}

impl Data {
    /// Wrap application bytes.
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self { payload: payload.into() }
    }
}

/// Graceful close of the sender's direction
///
/// No Data may follow a Close from the same sender.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Close;

/// Acknowledgement of numbered events
///
/// Cumulative up to `received_sequence_num`, plus selective acknowledgement
/// of later events processed ahead of a gap (a Close that overtook Data).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    /// Every numbered event up to and including this one was processed
    pub received_sequence_num: SequenceNum,
    /// Individually processed events beyond `received_sequence_num`
    pub out_of_order_sequence_nums: Vec<SequenceNum>,
}

impl Ack {
    /// Cumulative ack with no selective entries.
    pub fn upto(received_sequence_num: SequenceNum) -> Self {
        Self { received_sequence_num, out_of_order_sequence_nums: Vec::new() }
    }

    /// Whether this ack covers `sequence_num`.
    pub fn covers(&self, sequence_num: SequenceNum) -> bool {
        sequence_num <= self.received_sequence_num
            || self.out_of_order_sequence_nums.contains(&sequence_num)
    }
}

/// Session abort
///
/// Carries an exception envelope describing why the sender gave up.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    /// Machine-readable error category
    pub error_type: String,
    /// Human-readable description
    pub error_message: String,
}

impl ErrorPayload {
    /// Build an error envelope.
    pub fn new(error_type: impl Into<String>, error_message: impl Into<String>) -> Self {
        Self { error_type: error_type.into(), error_message: error_message.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ack_covers_cumulative_and_selective() {
        let ack = Ack { received_sequence_num: 3, out_of_order_sequence_nums: vec![6] };

        assert!(ack.covers(1));
        assert!(ack.covers(3));
        assert!(!ack.covers(4));
        assert!(!ack.covers(5));
        assert!(ack.covers(6));
    }

    #[test]
    fn data_serde() {
        let data = Data::new(vec![1, 2, 3]);

        let mut buf = Vec::new();
        ciborium::ser::into_writer(&data, &mut buf).unwrap();
        let decoded: Data = ciborium::de::from_reader(buf.as_slice()).unwrap();
        assert_eq!(decoded, data);
    }
}
