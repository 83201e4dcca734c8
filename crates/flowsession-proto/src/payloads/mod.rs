//! Session payload variants.
//!
//! [`Payload`] is a closed sum type: the driver matches on it together with
//! the event direction, so the compiler guarantees every (payload, direction)
//! pair has a transition.

pub mod session;

use std::fmt;

use serde::{Deserialize, Serialize};

pub use session::{
    Ack, Close, Confirm, CounterpartyInfoRequest, CounterpartyInfoResponse, Data, ErrorPayload,
    Init,
};

use crate::properties::SessionProperties;

/// Contents of a session event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Payload {
    /// Open a session
    Init(Init),
    /// Acknowledge numbered events
    Ack(Ack),
    /// Responder's property reply to an Init
    Confirm(Confirm),
    /// Request the counterparty's properties
    CounterpartyInfoRequest(CounterpartyInfoRequest),
    /// Reply carrying the responder's properties
    CounterpartyInfoResponse(CounterpartyInfoResponse),
    /// Application bytes
    Data(Data),
    /// Graceful close of one direction
    Close(Close),
    /// Abort the session
    Error(ErrorPayload),
}

/// Payload discriminant without the contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadKind {
    /// [`Payload::Init`]
    Init,
    /// [`Payload::Ack`]
    Ack,
    /// [`Payload::Confirm`]
    Confirm,
    /// [`Payload::CounterpartyInfoRequest`]
    CounterpartyInfoRequest,
    /// [`Payload::CounterpartyInfoResponse`]
    CounterpartyInfoResponse,
    /// [`Payload::Data`]
    Data,
    /// [`Payload::Close`]
    Close,
    /// [`Payload::Error`]
    Error,
}

impl fmt::Display for PayloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "Init",
            Self::Ack => "Ack",
            Self::Confirm => "Confirm",
            Self::CounterpartyInfoRequest => "CounterpartyInfoRequest",
            Self::CounterpartyInfoResponse => "CounterpartyInfoResponse",
            Self::Data => "Data",
            Self::Close => "Close",
            Self::Error => "Error",
        };
        f.write_str(name)
    }
}

impl Payload {
    /// Discriminant of this payload.
    pub fn kind(&self) -> PayloadKind {
        match self {
            Self::Init(_) => PayloadKind::Init,
            Self::Ack(_) => PayloadKind::Ack,
            Self::Confirm(_) => PayloadKind::Confirm,
            Self::CounterpartyInfoRequest(_) => PayloadKind::CounterpartyInfoRequest,
            Self::CounterpartyInfoResponse(_) => PayloadKind::CounterpartyInfoResponse,
            Self::Data(_) => PayloadKind::Data,
            Self::Close(_) => PayloadKind::Close,
            Self::Error(_) => PayloadKind::Error,
        }
    }

    /// Ack and Error acknowledge or abort instead of occupying a sequence
    /// slot. Everything else is numbered.
    pub fn is_numbered(&self) -> bool {
        !matches!(self, Self::Ack(_) | Self::Error(_))
    }

    /// Properties carried by handshake payloads.
    pub fn session_properties(&self) -> Option<&SessionProperties> {
        match self {
            Self::Init(init) => Some(&init.properties),
            Self::Confirm(confirm) => Some(&confirm.properties),
            Self::CounterpartyInfoRequest(request) => Some(&request.properties),
            Self::CounterpartyInfoResponse(response) => Some(&response.properties),
            Self::Ack(_) | Self::Data(_) | Self::Close(_) | Self::Error(_) => None,
        }
    }
}

macro_rules! impl_from_payload {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for Payload {
                fn from(value: $ty) -> Self {
                    Self::$variant(value)
                }
            }
        )*
    };
}

impl_from_payload!(
    Init(Init),
    Ack(Ack),
    Confirm(Confirm),
    CounterpartyInfoRequest(CounterpartyInfoRequest),
    CounterpartyInfoResponse(CounterpartyInfoResponse),
    Data(Data),
    Close(Close),
    Error(ErrorPayload),
);
