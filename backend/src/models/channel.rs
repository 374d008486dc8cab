//! Shared radio channel
//!
//! A channel is a mutual-exclusion resource: at most one node occupies it at
//! any tick. The channel itself does no compare-and-set. Callers check
//! [`Channel::is_occupied`] before [`Channel::occupy`], which is sound only
//! because the scheduler steps one node at a time.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::node::NodeId;

/// Index of a channel within one simulation run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(pub usize);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ch{}", self.0)
    }
}

/// A shared channel and the nodes assigned to it
///
/// # Example
/// ```
/// use lbt_simulator_core_rs::models::{Channel, NodeId};
///
/// let mut channel = Channel::new("Channel 1");
/// channel.attach(NodeId(1));
/// channel.attach(NodeId(2));
///
/// channel.occupy(NodeId(1));
/// assert!(channel.is_occupied());
///
/// // Only the occupant can free it
/// assert!(!channel.release(NodeId(2)));
/// assert!(channel.release(NodeId(1)));
/// assert!(!channel.is_occupied());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    label: String,
    occupant: Option<NodeId>,
    /// Attachment order; the scheduler visits nodes in this order
    members: Vec<NodeId>,
}

impl Channel {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            occupant: None,
            members: Vec::new(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// Append a node to the membership list (no timing effect)
    pub fn attach(&mut self, node: NodeId) {
        self.members.push(node);
    }

    /// Remove a node from the membership list
    ///
    /// Returns `false` if the node was not a member.
    pub fn detach(&mut self, node: NodeId) -> bool {
        match self.members.iter().position(|&m| m == node) {
            Some(index) => {
                self.members.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn members(&self) -> &[NodeId] {
        &self.members
    }

    pub fn is_member(&self, node: NodeId) -> bool {
        self.members.contains(&node)
    }

    pub fn is_occupied(&self) -> bool {
        self.occupant.is_some()
    }

    pub fn occupant(&self) -> Option<NodeId> {
        self.occupant
    }

    /// Mark the channel as held by `node`
    ///
    /// Unconditional: the caller must have seen `is_occupied() == false` in
    /// the same step.
    pub fn occupy(&mut self, node: NodeId) {
        debug_assert!(
            self.occupant.is_none(),
            "channel '{}' already occupied by {:?}, {} tried to occupy it",
            self.label,
            self.occupant,
            node
        );
        self.occupant = Some(node);
    }

    /// Free the channel if `node` is the occupant
    ///
    /// A release from anyone else is a no-op. Returns whether the channel was
    /// freed.
    pub fn release(&mut self, node: NodeId) -> bool {
        if self.occupant == Some(node) {
            self.occupant = None;
            true
        } else {
            false
        }
    }
}
