//! Logical clock for the simulation
//!
//! The simulation operates in discrete ticks. A tick is a unit of logical
//! time, not wall time; every timer in the engine counts ticks. A run is
//! bounded by a tick budget fixed at construction.

use serde::{Deserialize, Serialize};

/// Logical time unit used by every timer in the simulation.
pub type Tick = u64;

/// Manages simulation time in discrete ticks
///
/// # Example
/// ```
/// use lbt_simulator_core_rs::TimeManager;
///
/// let mut time = TimeManager::new(3);
/// assert_eq!(time.current_tick(), 0);
/// assert!(!time.is_exhausted());
///
/// time.advance_tick();
/// time.advance_tick();
/// time.advance_tick();
/// assert_eq!(time.current_tick(), 3);
/// assert!(time.is_exhausted());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeManager {
    /// Total ticks elapsed since the run began
    current_tick: Tick,
    /// Tick count at which the run stops
    tick_budget: Tick,
}

impl TimeManager {
    /// Create a clock starting at tick 0
    ///
    /// # Arguments
    /// * `tick_budget` - Number of ticks the run is allowed to execute
    pub fn new(tick_budget: Tick) -> Self {
        assert!(tick_budget > 0, "tick_budget must be positive");
        Self {
            current_tick: 0,
            tick_budget,
        }
    }

    /// Advance time by one tick
    pub fn advance_tick(&mut self) {
        self.current_tick += 1;
    }

    /// Get the current tick (total ticks since start)
    pub fn current_tick(&self) -> Tick {
        self.current_tick
    }

    /// Get the configured tick budget
    pub fn tick_budget(&self) -> Tick {
        self.tick_budget
    }

    /// Ticks left before the budget is exhausted
    ///
    /// # Example
    /// ```
    /// use lbt_simulator_core_rs::TimeManager;
    ///
    /// let mut time = TimeManager::new(10);
    /// time.advance_tick();
    /// assert_eq!(time.remaining_ticks(), 9);
    /// ```
    pub fn remaining_ticks(&self) -> Tick {
        self.tick_budget.saturating_sub(self.current_tick)
    }

    /// Whether the clock has reached (or passed) the tick budget
    pub fn is_exhausted(&self) -> bool {
        self.current_tick >= self.tick_budget
    }
}
