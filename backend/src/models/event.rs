//! Event log of node transitions
//!
//! Every state change a node makes can be recorded as an [`Event`]. The log
//! is optional (see `SimulationConfig::record_events`) and is used for
//! debugging contention patterns and for checking per-cycle accounting in
//! tests.
//!
//! # Example
//!
//! ```rust
//! use lbt_simulator_core_rs::models::{ChannelId, Event, EventLog, NodeId};
//!
//! let mut log = EventLog::new();
//! log.log(Event::ChannelAcquired {
//!     tick: 60_010,
//!     node_id: NodeId(3),
//!     channel: ChannelId(0),
//! });
//!
//! assert_eq!(log.len(), 1);
//! assert_eq!(log.events()[0].event_type(), "ChannelAcquired");
//! ```

use serde::{Deserialize, Serialize};

use crate::core::time::Tick;
use crate::models::channel::ChannelId;
use crate::models::node::{NodeId, Transition};

/// Simulation event capturing a node state change.
///
/// Events are logged in scheduler visiting order, so within a tick they
/// appear in the order nodes observed the channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum Event {
    /// Node left `Wait` and started sensing
    CycleStarted {
        tick: Tick,
        node_id: NodeId,
        channel: ChannelId,
    },

    /// Node found the channel free and started sending
    ChannelAcquired {
        tick: Tick,
        node_id: NodeId,
        channel: ChannelId,
    },

    /// Node found the channel busy and backed off
    Suspended {
        tick: Tick,
        node_id: NodeId,
        channel: ChannelId,
        attempt: u32,
        backoff: Tick,
    },

    /// Node found the channel busy for the last allowed time and gave up the cycle
    HardFail {
        tick: Tick,
        node_id: NodeId,
        channel: ChannelId,
        attempts: u32,
    },

    /// Node finished its transmission
    TransmissionEnded {
        tick: Tick,
        node_id: NodeId,
        channel: ChannelId,
        freed: bool,
    },

    /// Node was removed from the run
    NodeDetached {
        tick: Tick,
        node_id: NodeId,
        channel: ChannelId,
    },
}

impl Event {
    pub fn from_transition(
        tick: Tick,
        node_id: NodeId,
        channel: ChannelId,
        transition: Transition,
    ) -> Self {
        match transition {
            Transition::CycleStarted => Event::CycleStarted { tick, node_id, channel },
            Transition::Acquired => Event::ChannelAcquired { tick, node_id, channel },
            Transition::Suspended { attempt, backoff } => Event::Suspended {
                tick,
                node_id,
                channel,
                attempt,
                backoff,
            },
            Transition::HardFail { attempts } => Event::HardFail {
                tick,
                node_id,
                channel,
                attempts,
            },
            Transition::Released { freed } => Event::TransmissionEnded {
                tick,
                node_id,
                channel,
                freed,
            },
        }
    }

    pub fn tick(&self) -> Tick {
        match self {
            Event::CycleStarted { tick, .. }
            | Event::ChannelAcquired { tick, .. }
            | Event::Suspended { tick, .. }
            | Event::HardFail { tick, .. }
            | Event::TransmissionEnded { tick, .. }
            | Event::NodeDetached { tick, .. } => *tick,
        }
    }

    pub fn node_id(&self) -> NodeId {
        match self {
            Event::CycleStarted { node_id, .. }
            | Event::ChannelAcquired { node_id, .. }
            | Event::Suspended { node_id, .. }
            | Event::HardFail { node_id, .. }
            | Event::TransmissionEnded { node_id, .. }
            | Event::NodeDetached { node_id, .. } => *node_id,
        }
    }

    pub fn channel(&self) -> ChannelId {
        match self {
            Event::CycleStarted { channel, .. }
            | Event::ChannelAcquired { channel, .. }
            | Event::Suspended { channel, .. }
            | Event::HardFail { channel, .. }
            | Event::TransmissionEnded { channel, .. }
            | Event::NodeDetached { channel, .. } => *channel,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            Event::CycleStarted { .. } => "CycleStarted",
            Event::ChannelAcquired { .. } => "ChannelAcquired",
            Event::Suspended { .. } => "Suspended",
            Event::HardFail { .. } => "HardFail",
            Event::TransmissionEnded { .. } => "TransmissionEnded",
            Event::NodeDetached { .. } => "NodeDetached",
        }
    }
}

/// Append-only event log
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn events_at_tick(&self, tick: Tick) -> Vec<&Event> {
        self.events.iter().filter(|e| e.tick() == tick).collect()
    }

    pub fn events_of_type(&self, event_type: &str) -> Vec<&Event> {
        self.events.iter().filter(|e| e.event_type() == event_type).collect()
    }

    pub fn events_for_node(&self, node_id: NodeId) -> Vec<&Event> {
        self.events.iter().filter(|e| e.node_id() == node_id).collect()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
