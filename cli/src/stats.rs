//! Success and hard-fail rates aggregated over the nodes of a run

use lbt_simulator_core_rs::orchestrator::RunReport;
use serde::Serialize;

/// Aggregate outcome of one or more runs
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    pub nodes: usize,
    pub successes: u64,
    pub hard_fails: u64,
    pub suspends: u64,
    /// Mean over nodes of successes / resolved cycles
    pub mean_success_rate: Option<f64>,
    /// Mean over nodes of hard fails / resolved cycles
    pub mean_hard_fail_rate: Option<f64>,
}

impl Summary {
    /// Nodes that never resolved a cycle are left out of the rate means.
    pub fn from_report(report: &RunReport) -> Self {
        let totals = report.totals();
        let ratios: Vec<f64> = report
            .nodes
            .iter()
            .filter_map(|node| node.counters.success_ratio())
            .collect();

        Self {
            nodes: report.nodes.len(),
            successes: totals.successes,
            hard_fails: totals.hard_fails,
            suspends: totals.suspends,
            mean_success_rate: mean(ratios.iter().copied()),
            mean_hard_fail_rate: mean(ratios.iter().map(|ratio| 1.0 - ratio)),
        }
    }

    /// Combine repeated runs of the same configuration
    ///
    /// Counters are summed; rates are averaged across the runs that had one.
    pub fn combine(runs: &[Summary]) -> Self {
        Self {
            nodes: runs.first().map_or(0, |run| run.nodes),
            successes: runs.iter().map(|run| run.successes).sum(),
            hard_fails: runs.iter().map(|run| run.hard_fails).sum(),
            suspends: runs.iter().map(|run| run.suspends).sum(),
            mean_success_rate: mean(runs.iter().filter_map(|run| run.mean_success_rate)),
            mean_hard_fail_rate: mean(runs.iter().filter_map(|run| run.mean_hard_fail_rate)),
        }
    }
}

pub fn mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values
        .into_iter()
        .fold((0.0, 0usize), |(sum, count), value| (sum + value, count + 1));
    (count > 0).then(|| sum / count as f64)
}

/// `0.8125` as `81.25%`, or `-` when there is nothing to report
pub fn percent(rate: Option<f64>) -> String {
    match rate {
        Some(rate) => format!("{:.2}%", rate * 100.0),
        None => "-".to_string(),
    }
}
