//! Run results handed to the aggregation layer

use serde::{Deserialize, Serialize};

use crate::core::time::Tick;
use crate::models::channel::ChannelId;
use crate::models::node::{NodeCounters, NodeId};

/// Counters of one node at the end of (or during) a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeReport {
    pub id: NodeId,
    pub channel: ChannelId,
    pub channel_label: String,
    pub jitter_ticks: Tick,
    pub counters: NodeCounters,
}

/// Per-node counters of a run, in scheduler visiting order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub seed: u64,
    pub ticks_elapsed: Tick,
    pub nodes: Vec<NodeReport>,
}

impl RunReport {
    pub fn node(&self, id: NodeId) -> Option<&NodeReport> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn nodes_on(&self, channel: ChannelId) -> impl Iterator<Item = &NodeReport> + '_ {
        self.nodes.iter().filter(move |n| n.channel == channel)
    }

    /// Sum of every node's counters
    pub fn totals(&self) -> NodeCounters {
        self.nodes.iter().fold(NodeCounters::default(), |mut acc, n| {
            acc.successes += n.counters.successes;
            acc.hard_fails += n.counters.hard_fails;
            acc.suspends += n.counters.suspends;
            acc.retries += n.counters.retries;
            acc.cycles += n.counters.cycles;
            acc
        })
    }
}
