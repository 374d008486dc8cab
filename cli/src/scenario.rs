//! TOML scenario files
//!
//! A scenario describes the radio, the LBT parameters and how many nodes sit
//! on each channel. Node airtime is derived from the radio section once, at
//! load time, and every node in the scenario shares it.
//!
//! ```toml
//! seed = 12345
//! tick_budget = 600000
//!
//! [radio]
//! bandwidth = 125000
//! spreading_factor = 9
//! coding_rate = "4/5"
//!
//! [radio.packet]
//! payload_bytes = 255
//!
//! [[channels]]
//! label = "Channel 1"
//! nodes = 20
//! ```

use std::fs;
use std::path::Path;

use anyhow::{anyhow, ensure, Context, Result};
use lbt_simulator_core_rs::models::{LbtParams, NodeConfig};
use lbt_simulator_core_rs::orchestrator::{ChannelConfig, SimulationConfig};
use lbt_simulator_core_rs::phy::{
    Bandwidth, CodingRate, LoraModulation, PacketShape, SpreadingFactor,
};
use lbt_simulator_core_rs::Tick;
use serde::{Deserialize, Serialize};

/// One tick per millisecond
pub const DEFAULT_TICKS_PER_SECOND: f64 = 1000.0;

/// 60 s at the default tick rate
pub const DEFAULT_PERIOD_TICKS: Tick = 60_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Scenario {
    pub seed: u64,
    pub tick_budget: Tick,
    pub ticks_per_second: f64,
    pub record_events: bool,
    pub radio: RadioSection,
    pub lbt: LbtParams,
    pub channels: Vec<ChannelSection>,
}

impl Default for Scenario {
    fn default() -> Self {
        let defaults = SimulationConfig::default();
        Self {
            seed: defaults.rng_seed,
            tick_budget: defaults.tick_budget,
            ticks_per_second: DEFAULT_TICKS_PER_SECOND,
            record_events: false,
            radio: RadioSection::default(),
            lbt: defaults.lbt,
            channels: Vec::new(),
        }
    }
}

/// Modulation plus packet framing shared by every node of the scenario
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RadioSection {
    pub bandwidth: Bandwidth,
    pub spreading_factor: SpreadingFactor,
    pub coding_rate: CodingRate,
    pub packet: PacketShape,
}

impl Default for RadioSection {
    /// BW125k SF9 CR4/5 carrying a full 255 byte payload
    fn default() -> Self {
        let modulation =
            LoraModulation::from_parts(Bandwidth::Khz125, SpreadingFactor::SF9, CodingRate::Cr4_5);
        Self::new(modulation, PacketShape::max_payload())
    }
}

impl RadioSection {
    pub fn new(modulation: LoraModulation, packet: PacketShape) -> Self {
        Self {
            bandwidth: modulation.bandwidth,
            spreading_factor: modulation.spreading_factor,
            coding_rate: modulation.coding_rate,
            packet,
        }
    }

    pub fn modulation(&self) -> LoraModulation {
        LoraModulation::from_parts(self.bandwidth, self.spreading_factor, self.coding_rate)
    }

    pub fn occupy_ticks(&self, ticks_per_second: f64) -> Tick {
        self.modulation().time_on_air_ticks(&self.packet, ticks_per_second)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChannelSection {
    /// Defaults to "Channel N", counting from 1
    #[serde(default)]
    pub label: Option<String>,

    /// Number of nodes attached to this channel
    pub nodes: u32,

    #[serde(default = "default_period_ticks")]
    pub period_ticks: Tick,

    /// Id of the first node; defaults to one past the previous channel's last id
    #[serde(default)]
    pub first_node_id: Option<u32>,
}

fn default_period_ticks() -> Tick {
    DEFAULT_PERIOD_TICKS
}

impl ChannelSection {
    pub fn new(nodes: u32, period_ticks: Tick) -> Self {
        Self {
            label: None,
            nodes,
            period_ticks,
            first_node_id: None,
        }
    }
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read scenario {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("invalid scenario {}", path.display()))
    }

    pub fn parse(text: &str) -> Result<Self> {
        let scenario: Scenario = toml::from_str(text)?;
        ensure!(
            scenario.ticks_per_second > 0.0,
            "ticks_per_second must be positive, got {}",
            scenario.ticks_per_second
        );
        ensure!(!scenario.channels.is_empty(), "scenario has no channels");
        Ok(scenario)
    }

    /// Ticks a node holds the channel per transmission
    pub fn occupy_ticks(&self) -> Tick {
        self.radio.occupy_ticks(self.ticks_per_second)
    }

    /// Expand channel sections into a simulation configuration
    ///
    /// Node ids are only checked for duplicates when the simulation is built.
    pub fn to_config(&self) -> Result<SimulationConfig> {
        let occupy_ticks = self.occupy_ticks();
        ensure!(
            occupy_ticks > 0,
            "{} with a {} byte payload is shorter than one tick",
            self.radio.modulation(),
            self.radio.packet.payload_bytes()
        );

        let mut next_id = 0u32;
        let mut channels = Vec::with_capacity(self.channels.len());

        for (index, section) in self.channels.iter().enumerate() {
            let first = section.first_node_id.unwrap_or(next_id);
            let end = first.checked_add(section.nodes).ok_or_else(|| {
                anyhow!(
                    "channel {}: {} node ids from {} overflow u32",
                    index + 1,
                    section.nodes,
                    first
                )
            })?;
            let nodes = (first..end)
                .map(|id| NodeConfig::new(id, section.period_ticks, occupy_ticks))
                .collect();
            next_id = end;

            channels.push(ChannelConfig {
                label: section
                    .label
                    .clone()
                    .unwrap_or_else(|| format!("Channel {}", index + 1)),
                nodes,
            });
        }

        Ok(SimulationConfig {
            rng_seed: self.seed,
            tick_budget: self.tick_budget,
            lbt: self.lbt,
            record_events: self.record_events,
            channels,
        })
    }
}
