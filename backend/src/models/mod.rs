//! Domain models for the LBT simulator

pub mod backoff;
pub mod channel;
pub mod event;
pub mod node;

// Re-exports
pub use backoff::BackoffConfig;
pub use channel::{Channel, ChannelId};
pub use event::{Event, EventLog};
pub use node::{LbtParams, Node, NodeConfig, NodeCounters, NodeId, NodeState, Transition};
