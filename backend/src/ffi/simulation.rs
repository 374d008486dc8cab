//! PyO3 wrapper for Simulation
//!
//! This module provides the Python interface to the Rust simulation, so an
//! experiment/plotting layer written in Python can drive runs and read the
//! per-node counters.

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;
use pyo3::types::{PyDict, PyList};

use super::types::{run_report_to_py, tick_result_to_py};
use crate::orchestrator::{Simulation as RustSimulation, SimulationConfig};
use crate::phy::{Bandwidth, LoraModulation, PacketShape, SpreadingFactor};

/// Python wrapper for Rust Simulation
///
/// # Example (from Python)
///
/// ```python
/// import json
/// from lbt_simulator_core_rs import Simulation, time_on_air
///
/// occupy = int(time_on_air(spreading_factor=9, payload=255) * 1000)
/// config = {
///     "rng_seed": 7,
///     "tick_budget": 600000,
///     "channels": [
///         {"label": "Channel 1",
///          "nodes": [{"id": i, "period_ticks": 60000, "occupy_ticks": occupy}
///                    for i in range(20)]},
///     ],
/// }
///
/// sim = Simulation(json.dumps(config))
/// for node in sim.run():
///     print(node["node_id"], node["success_count"], node["hard_fail_count"])
/// ```
#[pyclass(name = "Simulation")]
pub struct PySimulation {
    inner: RustSimulation,
}

#[pymethods]
impl PySimulation {
    /// Create a simulation from a JSON-encoded configuration
    ///
    /// # Errors
    ///
    /// Raises ValueError if the JSON does not parse or the configuration is
    /// invalid (duplicate node id, zero retry limit, ...).
    #[new]
    fn new(config_json: &str) -> PyResult<Self> {
        let config: SimulationConfig = serde_json::from_str(config_json)
            .map_err(|e| PyValueError::new_err(format!("Invalid config JSON: {}", e)))?;

        let inner = RustSimulation::new(config)
            .map_err(|e| PyValueError::new_err(format!("Failed to create simulation: {}", e)))?;

        Ok(PySimulation { inner })
    }

    /// Execute one tick; returns None once the tick budget is exhausted
    fn tick(&mut self, py: Python) -> PyResult<Option<Py<PyDict>>> {
        self.inner
            .tick()
            .map(|result| tick_result_to_py(py, &result))
            .transpose()
    }

    /// Run to the end of the tick budget and return per-node counters
    fn run(&mut self, py: Python) -> PyResult<Py<PyList>> {
        let report = self.inner.run();
        run_report_to_py(py, &report)
    }

    /// Per-node counters at the current tick
    fn report(&self, py: Python) -> PyResult<Py<PyList>> {
        run_report_to_py(py, &self.inner.report())
    }

    /// Per-node counters as a JSON string
    fn report_json(&self) -> PyResult<String> {
        serde_json::to_string(&self.inner.report())
            .map_err(|e| PyValueError::new_err(format!("Failed to encode report: {}", e)))
    }

    fn current_tick(&self) -> u64 {
        self.inner.current_tick()
    }

    fn is_finished(&self) -> bool {
        self.inner.is_finished()
    }
}

/// LoRa time on air in seconds
///
/// Raises ValueError for an unknown bandwidth or coding rate, a spreading
/// factor outside 6..=12, a payload over 255 bytes or a CRC over 2 bytes.
#[pyfunction]
#[pyo3(signature = (
    bandwidth = "125KHz",
    spreading_factor = 7,
    coding_rate = "4/5",
    preamble = 8,
    implicit_header = false,
    payload = 0,
    crc = 2,
    ldro = false,
))]
#[allow(clippy::too_many_arguments)]
pub fn time_on_air(
    bandwidth: &str,
    spreading_factor: u8,
    coding_rate: &str,
    preamble: u16,
    implicit_header: bool,
    payload: usize,
    crc: u8,
    ldro: bool,
) -> PyResult<f64> {
    let to_py = |e: crate::phy::AirtimeError| PyValueError::new_err(e.to_string());

    let modulation = LoraModulation::from_parts(
        bandwidth.parse::<Bandwidth>().map_err(to_py)?,
        SpreadingFactor::new(spreading_factor).map_err(to_py)?,
        coding_rate.parse().map_err(to_py)?,
    );
    let shape = PacketShape::new(payload)
        .and_then(|shape| shape.with_crc_bytes(crc))
        .map_err(to_py)?
        .with_preamble_symbols(preamble)
        .with_implicit_header(implicit_header)
        .with_low_data_rate_optimization(ldro);

    Ok(modulation.time_on_air(&shape))
}
