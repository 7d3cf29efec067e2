//! Queue and ready-check tunables
//!
//! These settings are persisted in the store as a settings document so admin
//! commands can change them at runtime; the values here are the defaults used
//! until an admin writes the document.

use crate::error::{Result, ScrimError};
use serde::{Deserialize, Serialize};

/// Number of participants required to start a ready check or match
pub const MATCH_SIZE: usize = 10;

/// Players per team
pub const TEAM_SIZE: usize = 5;

/// Allowed range for the ready-check window
pub const READY_SECONDS_MIN: u64 = 10;
pub const READY_SECONDS_MAX: u64 = 600;

/// Runtime-configurable queue behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueSettings {
    /// When disabled, a full queue starts the match directly
    pub ready_enabled: bool,
    /// Ready-check confirmation window in seconds
    pub ready_seconds: u64,
}

impl Default for QueueSettings {
    fn default() -> Self {
        Self {
            ready_enabled: true,
            ready_seconds: 60,
        }
    }
}

impl QueueSettings {
    /// Apply a partial update, validating provided fields
    pub fn apply(
        &mut self,
        ready_enabled: Option<bool>,
        ready_seconds: Option<u64>,
    ) -> Result<()> {
        if let Some(enabled) = ready_enabled {
            self.ready_enabled = enabled;
        }
        if let Some(seconds) = ready_seconds {
            if !(READY_SECONDS_MIN..=READY_SECONDS_MAX).contains(&seconds) {
                return Err(ScrimError::ConfigurationError {
                    message: format!(
                        "ready_seconds must be between {} and {}",
                        READY_SECONDS_MIN, READY_SECONDS_MAX
                    ),
                }
                .into());
            }
            self.ready_seconds = seconds;
        }
        Ok(())
    }
}
