//! Type conversion utilities for FFI boundary
//!
//! Converts run results into Python dicts and lists.

use pyo3::prelude::*;
use pyo3::types::{PyDict, PyList};

use crate::models::NodeCounters;
use crate::orchestrator::{NodeReport, RunReport, TickResult};

/// Convert TickResult to Python dict
pub fn tick_result_to_py(py: Python, result: &TickResult) -> PyResult<Py<PyDict>> {
    let dict = PyDict::new(py);

    dict.set_item("tick", result.tick)?;
    dict.set_item("cycles_started", result.cycles_started)?;
    dict.set_item("acquisitions", result.acquisitions)?;
    dict.set_item("suspensions", result.suspensions)?;
    dict.set_item("hard_fails", result.hard_fails)?;
    dict.set_item("releases", result.releases)?;

    Ok(dict.unbind())
}

fn counters_into_dict(dict: &Bound<'_, PyDict>, counters: &NodeCounters) -> PyResult<()> {
    dict.set_item("success_count", counters.successes)?;
    dict.set_item("hard_fail_count", counters.hard_fails)?;
    dict.set_item("suspend_count", counters.suspends)?;
    dict.set_item("retry_count", counters.retries)?;
    dict.set_item("cycle_count", counters.cycles)?;
    Ok(())
}

/// Convert NodeReport to Python dict
///
/// Counter keys follow the `<outcome>_count` naming used by the Python side.
pub fn node_report_to_py(py: Python, node: &NodeReport) -> PyResult<Py<PyDict>> {
    let dict = PyDict::new(py);

    dict.set_item("node_id", node.id.0)?;
    dict.set_item("channel", node.channel.0)?;
    dict.set_item("channel_label", &node.channel_label)?;
    dict.set_item("jitter_ticks", node.jitter_ticks)?;
    counters_into_dict(&dict, &node.counters)?;

    Ok(dict.unbind())
}

/// Convert RunReport to a Python list of per-node dicts
pub fn run_report_to_py(py: Python, report: &RunReport) -> PyResult<Py<PyList>> {
    let list = PyList::empty(py);
    for node in &report.nodes {
        list.append(node_report_to_py(py, node)?)?;
    }
    Ok(list.unbind())
}
