//! Simulation engine - tick scheduler and run lifecycle
//!
//! Owns the logical clock, the channels, the nodes bound to them, and the
//! seeded RNG, and drives ticks until the budget is exhausted.
//!
//! # Scheduling contract
//!
//! The scheduler is single-threaded and cooperative:
//!
//! ```text
//! For each tick t (while t < tick_budget):
//!   For each channel, in creation order:
//!     For each node attached to it, in attachment order:
//!       node.step(t, channel)      -- at most one transition
//!   Advance time
//! ```
//!
//! No step is ever interleaved with another, so a node's "is the channel
//! free? then occupy it" decision is atomic with respect to every other node.
//! That is what keeps the at-most-one-occupant invariant without any lock.
//! Running steps in parallel would need a compare-and-swap acquisition
//! instead. Visiting order is fixed, so a run is reproducible from its seed.
//!
//! # Example
//!
//! ```rust
//! use lbt_simulator_core_rs::orchestrator::{ChannelConfig, Simulation, SimulationConfig};
//! use lbt_simulator_core_rs::models::NodeConfig;
//!
//! let config = SimulationConfig {
//!     rng_seed: 12345,
//!     tick_budget: 10_000,
//!     channels: vec![ChannelConfig {
//!         label: "Channel 1".to_string(),
//!         nodes: vec![NodeConfig::new(0, 2_000, 100), NodeConfig::new(1, 2_000, 100)],
//!     }],
//!     ..Default::default()
//! };
//!
//! let mut simulation = Simulation::new(config).unwrap();
//! let report = simulation.run();
//!
//! assert_eq!(report.ticks_elapsed, 10_000);
//! assert_eq!(report.nodes.len(), 2);
//! ```

use std::collections::HashMap;

use log::{debug, trace};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::time::{Tick, TimeManager};
use crate::models::channel::{Channel, ChannelId};
use crate::models::event::{Event, EventLog};
use crate::models::node::{LbtParams, Node, NodeConfig, NodeId, NodeState, Transition};
use crate::orchestrator::report::{NodeReport, RunReport};
use crate::rng::RngManager;

// ============================================================================
// Configuration Types
// ============================================================================

/// Complete simulation configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Seed for jitter and backoff draws
    pub rng_seed: u64,

    /// Number of ticks to execute
    pub tick_budget: Tick,

    /// LBT parameters applied to every node
    pub lbt: LbtParams,

    /// Keep a log of every node transition
    pub record_events: bool,

    /// Channels, each with the nodes attached to it
    pub channels: Vec<ChannelConfig>,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            rng_seed: 0,
            tick_budget: 600_000,
            lbt: LbtParams::default(),
            record_events: false,
            channels: Vec::new(),
        }
    }
}

/// One channel and its nodes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub label: String,

    #[serde(default)]
    pub nodes: Vec<NodeConfig>,
}

/// Configuration error raised before any tick runs
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SimulationError {
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("This device id already exists: {0}")]
    DuplicateNodeId(NodeId),

    #[error("Channel not found: {0}")]
    UnknownChannel(ChannelId),

    #[error("Node not found: {0}")]
    UnknownNode(NodeId),
}

/// Broken occupancy invariant
///
/// Unreachable under the single-threaded scheduling contract; seeing one means
/// the contract was violated.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum InvariantViolation {
    #[error("{count} nodes sending on {channel} at tick {tick}")]
    MultipleSenders {
        tick: Tick,
        channel: ChannelId,
        count: usize,
    },

    #[error("{channel} occupied by {occupant:?} but sending node is {sending:?} at tick {tick}")]
    OccupantMismatch {
        tick: Tick,
        channel: ChannelId,
        occupant: Option<NodeId>,
        sending: Option<NodeId>,
    },
}

/// Counts of transitions made during one tick
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickResult {
    pub tick: Tick,
    pub cycles_started: usize,
    pub acquisitions: usize,
    pub suspensions: usize,
    pub hard_fails: usize,
    pub releases: usize,
}

impl TickResult {
    fn record(&mut self, transition: Transition) {
        match transition {
            Transition::CycleStarted => self.cycles_started += 1,
            Transition::Acquired => self.acquisitions += 1,
            Transition::Suspended { .. } => self.suspensions += 1,
            Transition::HardFail { .. } => self.hard_fails += 1,
            Transition::Released { .. } => self.releases += 1,
        }
    }
}

// ============================================================================
// Simulation
// ============================================================================

/// One simulation run: channels, nodes, clock and RNG
///
/// Node ids are unique per run; the run itself is the registry.
pub struct Simulation {
    time_manager: TimeManager,
    rng_manager: RngManager,
    rng_seed: u64,
    lbt: LbtParams,
    channels: Vec<Channel>,
    nodes: HashMap<NodeId, Node>,
    record_events: bool,
    event_log: EventLog,
}

impl Simulation {
    /// Build a run from configuration, seeding the RNG from `config.rng_seed`
    ///
    /// # Errors
    ///
    /// * `InvalidConfig` - zero tick budget, zero retry limit, inverted
    ///   backoff bounds, zero period or occupy duration
    /// * `DuplicateNodeId` - two nodes share an id
    pub fn new(config: SimulationConfig) -> Result<Self, SimulationError> {
        let seed = config.rng_seed;
        Self::build(config, RngManager::new(seed), seed)
    }

    /// Build a run drawing from a caller-supplied RNG
    ///
    /// `config.rng_seed` is ignored; the report carries the RNG's state at
    /// hand-over as its seed.
    pub fn with_rng(config: SimulationConfig, rng: RngManager) -> Result<Self, SimulationError> {
        let seed = rng.get_state();
        Self::build(config, rng, seed)
    }

    fn build(
        config: SimulationConfig,
        rng: RngManager,
        rng_seed: u64,
    ) -> Result<Self, SimulationError> {
        Self::validate_config(&config)?;

        let mut simulation = Self {
            time_manager: TimeManager::new(config.tick_budget),
            rng_seed,
            rng_manager: rng,
            lbt: config.lbt,
            channels: Vec::new(),
            nodes: HashMap::new(),
            record_events: config.record_events,
            event_log: EventLog::new(),
        };

        for channel_config in config.channels {
            let channel = simulation.add_channel(channel_config.label);
            for node_config in channel_config.nodes {
                simulation.add_node(channel, node_config)?;
            }
        }

        debug!(
            "Simulation ready: {} channel(s), {} node(s), budget {} ticks, seed {}",
            simulation.channels.len(),
            simulation.nodes.len(),
            config.tick_budget,
            simulation.rng_seed
        );

        Ok(simulation)
    }

    fn validate_config(config: &SimulationConfig) -> Result<(), SimulationError> {
        if config.tick_budget == 0 {
            return Err(SimulationError::InvalidConfig(
                "tick_budget must be > 0".to_string(),
            ));
        }

        config.lbt.validate().map_err(SimulationError::InvalidConfig)?;

        Ok(())
    }

    fn validate_node(config: &NodeConfig) -> Result<(), SimulationError> {
        if config.period_ticks == 0 {
            return Err(SimulationError::InvalidConfig(format!(
                "{}: period_ticks must be > 0",
                config.id
            )));
        }
        if config.occupy_ticks == 0 {
            return Err(SimulationError::InvalidConfig(format!(
                "{}: occupy_ticks must be > 0",
                config.id
            )));
        }
        Ok(())
    }

    // ========================================================================
    // Construction
    // ========================================================================

    /// Create an empty channel
    pub fn add_channel(&mut self, label: impl Into<String>) -> ChannelId {
        self.channels.push(Channel::new(label));
        ChannelId(self.channels.len() - 1)
    }

    /// Create a node and attach it to `channel`
    ///
    /// The node starts in `Wait` at the current tick and draws its jitter
    /// offset now.
    pub fn add_node(
        &mut self,
        channel: ChannelId,
        config: NodeConfig,
    ) -> Result<NodeId, SimulationError> {
        Self::validate_node(&config)?;

        if channel.0 >= self.channels.len() {
            return Err(SimulationError::UnknownChannel(channel));
        }
        if self.nodes.contains_key(&config.id) {
            return Err(SimulationError::DuplicateNodeId(config.id));
        }

        let node = Node::new(
            config,
            channel,
            self.lbt,
            self.time_manager.current_tick(),
            &mut self.rng_manager,
        );
        trace!("{} attached to {} with jitter {}", config.id, channel, node.jitter_ticks());

        self.channels[channel.0].attach(config.id);
        self.nodes.insert(config.id, node);
        Ok(config.id)
    }

    /// Remove a node from its channel and from the run
    ///
    /// Frees the channel if the node was occupying it. The id can be reused
    /// afterwards.
    pub fn detach_node(&mut self, id: NodeId) -> Result<Node, SimulationError> {
        let node = self.nodes.remove(&id).ok_or(SimulationError::UnknownNode(id))?;

        let channel = &mut self.channels[node.channel().0];
        channel.detach(id);
        channel.release(id);

        if self.record_events {
            self.event_log.log(Event::NodeDetached {
                tick: self.time_manager.current_tick(),
                node_id: id,
                channel: node.channel(),
            });
        }

        Ok(node)
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn current_tick(&self) -> Tick {
        self.time_manager.current_tick()
    }

    pub fn tick_budget(&self) -> Tick {
        self.time_manager.tick_budget()
    }

    pub fn is_finished(&self) -> bool {
        self.time_manager.is_exhausted()
    }

    pub fn rng_seed(&self) -> u64 {
        self.rng_seed
    }

    pub fn lbt_params(&self) -> &LbtParams {
        &self.lbt
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    /// Nodes in scheduler visiting order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.channels
            .iter()
            .flat_map(|channel| channel.members().iter())
            .filter_map(move |id| self.nodes.get(id))
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn channel(&self, id: ChannelId) -> Option<&Channel> {
        self.channels.get(id.0)
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn event_log(&self) -> &EventLog {
        &self.event_log
    }

    // ========================================================================
    // Tick loop
    // ========================================================================

    /// Execute one scheduler pass
    ///
    /// Returns `None` without doing anything once the budget is exhausted.
    pub fn tick(&mut self) -> Option<TickResult> {
        if self.time_manager.is_exhausted() {
            return None;
        }

        let tick = self.time_manager.current_tick();
        let mut result = TickResult {
            tick,
            ..Default::default()
        };

        for (index, channel) in self.channels.iter_mut().enumerate() {
            let channel_id = ChannelId(index);

            for position in 0..channel.members().len() {
                let node_id = channel.members()[position];
                let Some(node) = self.nodes.get_mut(&node_id) else {
                    continue;
                };

                let Some(transition) = node.step(tick, channel, &mut self.rng_manager) else {
                    continue;
                };

                result.record(transition);
                log_transition(tick, node_id, channel.label(), transition);

                if self.record_events {
                    self.event_log
                        .log(Event::from_transition(tick, node_id, channel_id, transition));
                }
            }
        }

        self.time_manager.advance_tick();
        Some(result)
    }

    /// Execute up to `ticks` passes; returns how many ran
    pub fn run_for(&mut self, ticks: Tick) -> Tick {
        let mut executed = 0;
        while executed < ticks && self.tick().is_some() {
            executed += 1;
        }
        executed
    }

    /// Tick until the budget is exhausted and return every node's counters
    pub fn run(&mut self) -> RunReport {
        debug!(
            "Running from tick {} to {}",
            self.time_manager.current_tick(),
            self.time_manager.tick_budget()
        );

        while self.tick().is_some() {}

        let report = self.report();
        let totals = report.totals();
        debug!(
            "Run finished at tick {}: {} successes, {} hard fails, {} suspends",
            report.ticks_elapsed, totals.successes, totals.hard_fails, totals.suspends
        );
        report
    }

    /// Snapshot of every node's counters, in visiting order
    pub fn report(&self) -> RunReport {
        let nodes = self
            .channels
            .iter()
            .enumerate()
            .flat_map(|(index, channel)| {
                channel.members().iter().filter_map(move |id| {
                    self.nodes.get(id).map(|node| NodeReport {
                        id: *id,
                        channel: ChannelId(index),
                        channel_label: channel.label().to_string(),
                        jitter_ticks: node.jitter_ticks(),
                        counters: *node.counters(),
                    })
                })
            })
            .collect();

        RunReport {
            seed: self.rng_seed,
            ticks_elapsed: self.time_manager.current_tick(),
            nodes,
        }
    }

    /// Check the occupancy invariant on every channel
    ///
    /// At most one attached node is `Sending`, and the channel's occupant is
    /// exactly that node (or nobody).
    pub fn verify_invariants(&self) -> Result<(), InvariantViolation> {
        let tick = self.time_manager.current_tick();

        for (index, channel) in self.channels.iter().enumerate() {
            let channel_id = ChannelId(index);
            let sending: Vec<NodeId> = channel
                .members()
                .iter()
                .filter(|id| {
                    self.nodes
                        .get(id)
                        .is_some_and(|node| node.state() == NodeState::Sending)
                })
                .copied()
                .collect();

            if sending.len() > 1 {
                return Err(InvariantViolation::MultipleSenders {
                    tick,
                    channel: channel_id,
                    count: sending.len(),
                });
            }

            let sender = sending.first().copied();
            if channel.occupant() != sender {
                return Err(InvariantViolation::OccupantMismatch {
                    tick,
                    channel: channel_id,
                    occupant: channel.occupant(),
                    sending: sender,
                });
            }
        }

        Ok(())
    }
}

fn log_transition(tick: Tick, node_id: NodeId, channel: &str, transition: Transition) {
    match transition {
        Transition::CycleStarted => {
            trace!("Tick {}: {} starts sampling '{}'", tick, node_id, channel)
        }
        Transition::Acquired => {
            trace!("Tick {}: {} starts to send on '{}'", tick, node_id, channel)
        }
        Transition::Suspended { attempt, backoff } => trace!(
            "Tick {}: {} is stuck on '{}' (attempt {}), backing off {} ticks",
            tick,
            node_id,
            channel,
            attempt,
            backoff
        ),
        Transition::HardFail { attempts } => trace!(
            "Tick {}: {} gives up on '{}' after {} attempts",
            tick,
            node_id,
            channel,
            attempts
        ),
        Transition::Released { .. } => {
            trace!("Tick {}: {} ends sending on '{}'", tick, node_id, channel)
        }
    }
}
