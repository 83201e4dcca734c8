//! Negotiated session properties.
//!
//! Properties are an ordered key/value list exchanged during the handshake
//! (Init, Confirm, CounterpartyInfo). Order is preserved so that a snapshot
//! compares equal after a round trip through storage.

use serde::{Deserialize, Serialize};

use crate::errors::{ProtocolError, Result};

/// Name of the protocol the session speaks.
pub const PROTOCOL: &str = "flowsession.protocol";

/// Comma-separated list of protocol versions the sender supports.
pub const PROTOCOL_VERSIONS_SUPPORTED: &str = "flowsession.protocol.versions.supported";

/// Protocol version chosen by the responder.
pub const PROTOCOL_VERSION_NEGOTIATED: &str = "flowsession.protocol.version";

/// Version of the flow that initiated the session.
pub const INITIATOR_FLOW_VERSION: &str = "flowsession.initiator.flowVersion";

/// Ordered key/value properties for capability negotiation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionProperties(Vec<(String, String)>);

impl SessionProperties {
    /// Empty property list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Self::insert`].
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Set `key`, replacing an existing value in place or appending.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.0.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.0.push((key, value)),
        }
    }

    /// Raw value for `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    /// Entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no properties are set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Protocol name, if advertised.
    pub fn protocol(&self) -> Option<&str> {
        self.get(PROTOCOL)
    }

    /// Supported protocol versions, in advertised order.
    ///
    /// Returns an empty list when the property is absent.
    pub fn versions_supported(&self) -> Result<Vec<u32>> {
        let Some(raw) = self.get(PROTOCOL_VERSIONS_SUPPORTED) else {
            return Ok(Vec::new());
        };

        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<u32>().map_err(|_| ProtocolError::MalformedProperty {
                    key: PROTOCOL_VERSIONS_SUPPORTED.to_string(),
                    value: raw.to_string(),
                })
            })
            .collect()
    }

    /// Initiator flow version, if advertised.
    pub fn initiator_flow_version(&self) -> Result<Option<u32>> {
        self.get(INITIATOR_FLOW_VERSION)
            .map(|raw| {
                raw.trim().parse::<u32>().map_err(|_| ProtocolError::MalformedProperty {
                    key: INITIATOR_FLOW_VERSION.to_string(),
                    value: raw.to_string(),
                })
            })
            .transpose()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for SessionProperties {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut props = Self::new();
        for (k, v) in iter {
            props.insert(k, v);
        }
        props
    }
}
