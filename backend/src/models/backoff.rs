//! Backoff duration distributions
//!
//! A suspended node waits a freshly drawn backoff before sensing the channel
//! again.

use serde::{Deserialize, Serialize};

use crate::core::time::Tick;
use crate::rng::RngManager;

/// How long a node waits in `Suspended` before retrying
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BackoffConfig {
    /// Same duration every time; consumes no randomness
    Fixed { ticks: Tick },

    /// Uniform between min and max (inclusive)
    Uniform { min: Tick, max: Tick },
}

impl Default for BackoffConfig {
    /// 5 s plus up to 5 s at 1000 ticks/s
    fn default() -> Self {
        BackoffConfig::Uniform { min: 5000, max: 10000 }
    }
}

impl BackoffConfig {
    pub fn sample(&self, rng: &mut RngManager) -> Tick {
        match *self {
            BackoffConfig::Fixed { ticks } => ticks,
            BackoffConfig::Uniform { min, max } => rng.uniform_inclusive(min, max),
        }
    }

    /// Check the distribution is drawable
    pub fn validate(&self) -> Result<(), String> {
        match *self {
            BackoffConfig::Fixed { .. } => Ok(()),
            BackoffConfig::Uniform { min, max } if min > max => {
                Err(format!("backoff min ({}) must not exceed max ({})", min, max))
            }
            BackoffConfig::Uniform { .. } => Ok(()),
        }
    }
}
