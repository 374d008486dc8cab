//! Orchestrator - tick scheduler and run lifecycle
//!
//! See `engine.rs` for the scheduling contract.

pub mod engine;
pub mod report;

pub use engine::{
    ChannelConfig, InvariantViolation, Simulation, SimulationConfig, SimulationError, TickResult,
};
pub use report::{NodeReport, RunReport};
