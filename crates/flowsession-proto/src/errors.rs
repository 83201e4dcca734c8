//! Error types for session event handling.

use thiserror::Error;

/// Result alias for fallible protocol helpers.
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors raised while interpreting session event contents.
///
/// The transition functions never fail; these errors only surface from helper
/// APIs that parse negotiated values out of [`crate::SessionProperties`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// A property exists but its value could not be parsed.
    #[error("session property {key} has malformed value {value:?}")]
    MalformedProperty {
        /// Property key
        key: String,
        /// Raw value as received
        value: String,
    },
}
