//! LBT Simulator Core - Rust Engine
//!
//! Discrete-time simulation of Listen-Before-Talk contention among periodic
//! LoRa transmitters sharing one or more channels.
//!
//! # Architecture
//!
//! - **phy**: LoRa time-on-air model (modulation parameters → airtime)
//! - **models**: Domain types (Channel, Node state machine, backoff, events)
//! - **core**: Logical tick clock
//! - **orchestrator**: Tick scheduler, run lifecycle, reports
//! - **rng**: Deterministic random number generation
//!
//! # Critical Invariants
//!
//! 1. At most one node occupies a channel at any tick
//! 2. All randomness is deterministic (seeded RNG)
//! 3. Scheduling is single-threaded; contention is emulated by step order
//! 4. Contention losses are counters, never errors

// Module declarations
pub mod core;
pub mod models;
pub mod orchestrator;
pub mod phy;
pub mod rng;

// Re-exports for convenience
pub use crate::core::time::{Tick, TimeManager};
pub use models::{
    BackoffConfig, Channel, ChannelId, Event, EventLog, LbtParams, Node, NodeConfig, NodeCounters,
    NodeId, NodeState, Transition,
};
pub use orchestrator::{
    ChannelConfig, InvariantViolation, NodeReport, RunReport, Simulation, SimulationConfig,
    SimulationError, TickResult,
};
pub use phy::{
    airtime_ticks, AirtimeError, Bandwidth, CodingRate, LoraModulation, PacketShape,
    SpreadingFactor,
};
pub use rng::RngManager;

// FFI module (when feature enabled)
#[cfg(feature = "pyo3")]
pub mod ffi;

// PyO3 exports (when feature enabled)
#[cfg(feature = "pyo3")]
use pyo3::prelude::*;

#[cfg(feature = "pyo3")]
#[pymodule]
fn lbt_simulator_core_rs(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<ffi::simulation::PySimulation>()?;
    m.add_function(wrap_pyfunction!(ffi::simulation::time_on_air, m)?)?;
    Ok(())
}
