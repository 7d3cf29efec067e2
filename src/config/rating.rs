//! Rating system configuration

use crate::error::{Result, ScrimError};
use serde::{Deserialize, Serialize};

/// Configuration for the Elo rating engine
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RatingConfig {
    /// K-factor applied to team deltas
    pub k_factor: f64,
    /// Rating assigned to a participant with no prior history
    pub baseline_rating: i64,
}

impl Default for RatingConfig {
    fn default() -> Self {
        Self {
            k_factor: 24.0,
            baseline_rating: 1000,
        }
    }
}

impl RatingConfig {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<()> {
        if self.k_factor <= 0.0 {
            return Err(ScrimError::ConfigurationError {
                message: "K-factor must be positive".to_string(),
            }
            .into());
        }
        if self.baseline_rating <= 0 {
            return Err(ScrimError::ConfigurationError {
                message: "Baseline rating must be positive".to_string(),
            }
            .into());
        }
        Ok(())
    }
}
