//! Veto protocol tunables
//!
//! Persisted in the store like the queue settings; partial updates only touch
//! the provided fields, and an explicitly empty map list restores the default
//! pool.

use crate::error::{Result, ScrimError};
use crate::types::CaptainMode;
use serde::{Deserialize, Serialize};

/// Default map pool used until an admin configures one
pub const DEFAULT_MAPS: [&str; 10] = [
    "Ascent", "Bind", "Haven", "Split", "Icebox", "Breeze", "Lotus", "Sunset", "Fracture", "Pearl",
];

/// Default per-turn ban window in seconds
pub const DEFAULT_TURN_SECONDS: u64 = 90;

/// Runtime-configurable veto behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VetoSettings {
    pub captain_mode: CaptainMode,
    pub maps: Vec<String>,
    pub turn_seconds: u64,
}

impl Default for VetoSettings {
    fn default() -> Self {
        Self {
            captain_mode: CaptainMode::Random,
            maps: default_map_pool(),
            turn_seconds: DEFAULT_TURN_SECONDS,
        }
    }
}

/// The default map pool as owned strings
pub fn default_map_pool() -> Vec<String> {
    DEFAULT_MAPS.iter().map(|m| m.to_string()).collect()
}

impl VetoSettings {
    /// Apply a partial update. `Some(vec![])` for `maps` resets to the default
    /// pool; `None` leaves the current pool untouched.
    pub fn apply(
        &mut self,
        captain_mode: Option<CaptainMode>,
        maps: Option<Vec<String>>,
        turn_seconds: Option<u64>,
    ) -> Result<()> {
        if let Some(mode) = captain_mode {
            self.captain_mode = mode;
        }
        if let Some(maps) = maps {
            self.maps = if maps.is_empty() {
                default_map_pool()
            } else {
                maps
            };
        }
        if let Some(seconds) = turn_seconds {
            if seconds == 0 {
                return Err(ScrimError::ConfigurationError {
                    message: "turn_seconds must be greater than 0".to_string(),
                }
                .into());
            }
            self.turn_seconds = seconds;
        }
        Ok(())
    }
}
