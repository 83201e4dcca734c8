//! Session manager configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Timing knobs for [`crate::manager`].
///
/// The transition processors take no configuration; only outbound scheduling
/// and liveness depend on these values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionManagerConfig {
    /// Delay before an unacknowledged numbered event is sent again
    pub message_resend_window: Duration,
    /// Silence from the counterparty, with sends outstanding, before the
    /// session is aborted
    pub session_timeout_window: Duration,
}

impl Default for SessionManagerConfig {
    fn default() -> Self {
        Self {
            message_resend_window: Duration::from_secs(5),
            session_timeout_window: Duration::from_secs(60),
        }
    }
}

impl SessionManagerConfig {
    /// Check the windows are usable together.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.message_resend_window.is_zero() {
            return Err(ConfigError::ZeroWindow("message_resend_window"));
        }
        if self.session_timeout_window.is_zero() {
            return Err(ConfigError::ZeroWindow("session_timeout_window"));
        }
        if self.message_resend_window >= self.session_timeout_window {
            return Err(ConfigError::ResendNotShorterThanTimeout {
                resend: self.message_resend_window,
                timeout: self.session_timeout_window,
            });
        }
        Ok(())
    }
}
