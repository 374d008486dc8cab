//! Spreading factor / node count sweep
//!
//! For every combination, the nodes are split evenly across the channels,
//! each transmits a full packet once per period, and the run is summarised
//! by its mean success and hard-fail rates.

use anyhow::Result;
use lbt_simulator_core_rs::models::LbtParams;
use lbt_simulator_core_rs::orchestrator::Simulation;
use lbt_simulator_core_rs::phy::{LoraModulation, SpreadingFactor};
use lbt_simulator_core_rs::Tick;
use log::info;
use serde::Serialize;

use crate::scenario::{ChannelSection, RadioSection, Scenario, DEFAULT_TICKS_PER_SECOND};
use crate::stats::Summary;

#[derive(Debug, Clone)]
pub struct SweepPlan {
    /// Bandwidth, coding rate and packet shape; the spreading factor is swept
    pub radio: RadioSection,
    pub spreading_factors: Vec<SpreadingFactor>,
    pub node_counts: Vec<u32>,
    pub channels: u32,
    pub period_ticks: Tick,
    pub tick_budget: Tick,
    pub lbt: LbtParams,
    pub seed: u64,
    /// Repetitions per point, seeded `seed`, `seed + 1`, ...
    pub runs: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct SweepPoint {
    pub spreading_factor: u8,
    pub nodes: u32,
    pub occupy_ticks: Tick,
    pub summary: Summary,
}

impl SweepPlan {
    fn scenario(&self, spreading_factor: SpreadingFactor, nodes: u32, seed: u64) -> Scenario {
        let modulation = LoraModulation {
            spreading_factor,
            ..self.radio.modulation()
        };

        Scenario {
            seed,
            tick_budget: self.tick_budget,
            ticks_per_second: DEFAULT_TICKS_PER_SECOND,
            record_events: false,
            radio: RadioSection::new(modulation, self.radio.packet),
            lbt: self.lbt,
            channels: split_evenly(nodes, self.channels)
                .into_iter()
                .map(|count| ChannelSection::new(count, self.period_ticks))
                .collect(),
        }
    }

    pub fn run(&self) -> Result<Vec<SweepPoint>> {
        let mut points = Vec::with_capacity(self.spreading_factors.len() * self.node_counts.len());

        for &spreading_factor in &self.spreading_factors {
            for &nodes in &self.node_counts {
                let mut summaries = Vec::with_capacity(self.runs as usize);
                let mut occupy_ticks = 0;

                for run in 0..self.runs {
                    let seed = self.seed.wrapping_add(u64::from(run));
                    let scenario = self.scenario(spreading_factor, nodes, seed);
                    occupy_ticks = scenario.occupy_ticks();
                    let report = Simulation::new(scenario.to_config()?)?.run();
                    summaries.push(Summary::from_report(&report));
                }

                let summary = Summary::combine(&summaries);
                info!(
                    "{} x {} nodes: success {:?}, hard fail {:?}",
                    spreading_factor, nodes, summary.mean_success_rate, summary.mean_hard_fail_rate
                );
                points.push(SweepPoint {
                    spreading_factor: spreading_factor.value(),
                    nodes,
                    occupy_ticks,
                    summary,
                });
            }
        }

        Ok(points)
    }
}

/// Split `total` into `parts` contiguous counts differing by at most one
///
/// The first channels take the remainder.
pub fn split_evenly(total: u32, parts: u32) -> Vec<u32> {
    if parts == 0 {
        return Vec::new();
    }
    let base = total / parts;
    let remainder = total % parts;
    (0..parts).map(|i| base + u32::from(i < remainder)).collect()
}
