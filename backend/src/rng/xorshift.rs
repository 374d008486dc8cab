//! xorshift64* random number generator
//!
//! Fast, deterministic PRNG. The simulator draws node jitter offsets at
//! construction and backoff durations at every suspend from one instance,
//! so the draw order is fixed by the scheduler's visiting order.
//!
//! # Determinism
//!
//! Same seed → same sequence → same per-node counters.

use serde::{Deserialize, Serialize};

/// Deterministic random number generator using xorshift64*
///
/// # Example
/// ```
/// use lbt_simulator_core_rs::RngManager;
///
/// let mut rng = RngManager::new(12345);
/// let backoff = rng.uniform_inclusive(5000, 10000);
/// assert!((5000..=10000).contains(&backoff));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RngManager {
    state: u64,
}

impl RngManager {
    /// Create a new RNG with given seed
    ///
    /// A zero seed is mapped to 1; xorshift never leaves the all-zero state.
    pub fn new(seed: u64) -> Self {
        let state = if seed == 0 { 1 } else { seed };
        Self { state }
    }

    /// Generate next random u64 value
    pub fn next(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545F4914F6CDD1D)
    }

    /// Generate random value in range [min, max]
    ///
    /// `min == max` returns `min` without consuming a draw.
    ///
    /// # Panics
    /// Panics if min > max
    pub fn uniform_inclusive(&mut self, min: u64, max: u64) -> u64 {
        assert!(min <= max, "min must not exceed max");
        if min == max {
            return min;
        }
        match (max - min).checked_add(1) {
            Some(span) => min + self.next() % span,
            // Full u64 domain
            None => self.next(),
        }
    }

    /// Get current RNG state (for replay)
    pub fn get_state(&self) -> u64 {
        self.state
    }
}
