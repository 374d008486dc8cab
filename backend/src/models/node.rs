//! Periodic LBT transmitter
//!
//! Each node is a four-state machine driven one step per tick:
//!
//! ```text
//! Wait       --period + jitter-->  Sampling
//! Sampling   --sample_ticks------>  Sending | Suspended | Wait
//! Suspended  --backoff----------->  Sending | Suspended | Wait
//! Sending    --occupy_ticks------>  Wait
//! ```
//!
//! Every guard compares the ticks elapsed since the node entered its current
//! state against a threshold. At most one transition happens per step.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::core::time::Tick;
use crate::models::backoff::BackoffConfig;
use crate::models::channel::{Channel, ChannelId};
use crate::rng::RngManager;

/// Device identifier, unique within one simulation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node {}", self.0)
    }
}

/// Node FSM state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeState {
    /// Idle until the next period elapses
    Wait,
    /// Sensing the channel before committing to transmit
    Sampling,
    /// Holding the channel
    Sending,
    /// Lost the channel; waiting out a backoff before sensing again
    Suspended,
}

/// LBT parameters shared by the nodes of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LbtParams {
    /// Channel sensing delay between leaving `Wait` and the first acquisition attempt
    pub sample_ticks: Tick,

    /// Busy observations allowed per cycle; the last one is a hard fail
    pub retry_limit: u32,

    /// Upper bound (inclusive) of the per-node jitter added to the period
    pub max_jitter_ticks: Tick,

    pub backoff: BackoffConfig,
}

impl Default for LbtParams {
    fn default() -> Self {
        Self {
            sample_ticks: 10,
            retry_limit: 5,
            max_jitter_ticks: 1000,
            backoff: BackoffConfig::default(),
        }
    }
}

impl LbtParams {
    pub fn validate(&self) -> Result<(), String> {
        if self.retry_limit == 0 {
            return Err("retry_limit must be >= 1".to_string());
        }
        self.backoff.validate()
    }
}

/// Per-node construction parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeConfig {
    pub id: NodeId,

    /// Ticks spent in `Wait` between cycles (before jitter)
    pub period_ticks: Tick,

    /// Ticks a successful transmission holds the channel
    pub occupy_ticks: Tick,
}

impl NodeConfig {
    pub fn new(id: u32, period_ticks: Tick, occupy_ticks: Tick) -> Self {
        Self {
            id: NodeId(id),
            period_ticks,
            occupy_ticks,
        }
    }
}

/// Cumulative outcome counters; never decrease
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeCounters {
    /// Channel acquisitions
    pub successes: u64,
    /// Cycles abandoned after reaching the retry limit
    pub hard_fails: u64,
    /// Transitions into `Suspended`
    pub suspends: u64,
    /// Busy observations over the node's lifetime
    pub retries: u64,
    /// Cycles started (Wait → Sampling)
    pub cycles: u64,
}

impl NodeCounters {
    /// Cycles that ended in either a success or a hard fail
    pub fn resolved_cycles(&self) -> u64 {
        self.successes + self.hard_fails
    }

    /// Fraction of resolved cycles that acquired the channel
    pub fn success_ratio(&self) -> Option<f64> {
        match self.resolved_cycles() {
            0 => None,
            resolved => Some(self.successes as f64 / resolved as f64),
        }
    }
}

/// What a step did, if anything
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Wait → Sampling
    CycleStarted,
    /// Sampling/Suspended → Sending
    Acquired,
    /// Sampling/Suspended → Suspended
    Suspended { attempt: u32, backoff: Tick },
    /// Sampling/Suspended → Wait after the last allowed busy observation
    HardFail { attempts: u32 },
    /// Sending → Wait; `freed` is false if the node no longer held the channel
    Released { freed: bool },
}

/// A periodic transmitter bound to one channel
#[derive(Debug, Clone)]
pub struct Node {
    id: NodeId,
    channel: ChannelId,
    period_ticks: Tick,
    occupy_ticks: Tick,
    jitter_ticks: Tick,
    params: LbtParams,

    state: NodeState,
    state_entered_at: Tick,
    cycle_retries: u32,
    current_backoff: Tick,

    counters: NodeCounters,
}

impl Node {
    /// Create a node in `Wait`, entered at `created_at`
    ///
    /// Draws the node's jitter offset from `rng`.
    pub fn new(
        config: NodeConfig,
        channel: ChannelId,
        params: LbtParams,
        created_at: Tick,
        rng: &mut RngManager,
    ) -> Self {
        let jitter_ticks = rng.uniform_inclusive(0, params.max_jitter_ticks);
        Self {
            id: config.id,
            channel,
            period_ticks: config.period_ticks,
            occupy_ticks: config.occupy_ticks,
            jitter_ticks,
            params,
            state: NodeState::Wait,
            state_entered_at: created_at,
            cycle_retries: 0,
            current_backoff: 0,
            counters: NodeCounters::default(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn channel(&self) -> ChannelId {
        self.channel
    }

    pub fn state(&self) -> NodeState {
        self.state
    }

    pub fn state_entered_at(&self) -> Tick {
        self.state_entered_at
    }

    pub fn period_ticks(&self) -> Tick {
        self.period_ticks
    }

    pub fn occupy_ticks(&self) -> Tick {
        self.occupy_ticks
    }

    pub fn jitter_ticks(&self) -> Tick {
        self.jitter_ticks
    }

    pub fn params(&self) -> &LbtParams {
        &self.params
    }

    /// Busy observations made in the current cycle
    pub fn cycle_retries(&self) -> u32 {
        self.cycle_retries
    }

    /// Backoff drawn at the most recent suspend
    pub fn current_backoff(&self) -> Tick {
        self.current_backoff
    }

    pub fn counters(&self) -> &NodeCounters {
        &self.counters
    }

    /// Advance the state machine for `tick`
    ///
    /// `channel` must be the channel this node is bound to.
    pub fn step(
        &mut self,
        tick: Tick,
        channel: &mut Channel,
        rng: &mut RngManager,
    ) -> Option<Transition> {
        let elapsed = tick.saturating_sub(self.state_entered_at);

        match self.state {
            NodeState::Wait => {
                if elapsed < self.period_ticks.saturating_add(self.jitter_ticks) {
                    return None;
                }
                self.cycle_retries = 0;
                self.counters.cycles += 1;
                self.enter(NodeState::Sampling, tick);
                Some(Transition::CycleStarted)
            }
            NodeState::Sampling => {
                if elapsed < self.params.sample_ticks {
                    return None;
                }
                Some(self.try_acquire(tick, channel, rng))
            }
            NodeState::Sending => {
                if elapsed < self.occupy_ticks {
                    return None;
                }
                let freed = channel.release(self.id);
                self.enter(NodeState::Wait, tick);
                Some(Transition::Released { freed })
            }
            NodeState::Suspended => {
                if elapsed < self.current_backoff {
                    return None;
                }
                Some(self.try_acquire(tick, channel, rng))
            }
        }
    }

    /// Listen before talk: take the channel if free, otherwise back off or give up
    fn try_acquire(
        &mut self,
        tick: Tick,
        channel: &mut Channel,
        rng: &mut RngManager,
    ) -> Transition {
        if !channel.is_occupied() {
            channel.occupy(self.id);
            self.counters.successes += 1;
            self.enter(NodeState::Sending, tick);
            return Transition::Acquired;
        }

        self.counters.retries += 1;
        self.cycle_retries += 1;

        if self.cycle_retries < self.params.retry_limit {
            self.counters.suspends += 1;
            self.current_backoff = self.params.backoff.sample(rng);
            self.enter(NodeState::Suspended, tick);
            Transition::Suspended {
                attempt: self.cycle_retries,
                backoff: self.current_backoff,
            }
        } else {
            self.counters.hard_fails += 1;
            self.enter(NodeState::Wait, tick);
            Transition::HardFail {
                attempts: self.cycle_retries,
            }
        }
    }

    fn enter(&mut self, state: NodeState, tick: Tick) {
        self.state = state;
        self.state_entered_at = tick;
    }
}
