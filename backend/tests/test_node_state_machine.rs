//! Tests for the node LBT state machine, driven tick by tick by hand

use lbt_simulator_core_rs::models::{
    BackoffConfig, Channel, ChannelId, LbtParams, Node, NodeConfig, NodeId, NodeState, Transition,
};
use lbt_simulator_core_rs::{RngManager, Tick};

const FOREIGN: NodeId = NodeId(99);

fn lbt(retry_limit: u32) -> LbtParams {
    LbtParams {
        sample_ticks: 2,
        retry_limit,
        max_jitter_ticks: 0,
        backoff: BackoffConfig::Fixed { ticks: 3 },
    }
}

/// Step `node` on every tick in `from..to`, collecting (tick, transition)
fn drive(
    node: &mut Node,
    channel: &mut Channel,
    rng: &mut RngManager,
    from: Tick,
    to: Tick,
) -> Vec<(Tick, Transition)> {
    (from..to)
        .filter_map(|tick| node.step(tick, channel, rng).map(|t| (tick, t)))
        .collect()
}

#[test]
fn test_uncontended_cycle() {
    let mut rng = RngManager::new(1);
    let mut channel = Channel::new("Channel 1");
    let mut node = Node::new(NodeConfig::new(1, 10, 5), ChannelId(0), lbt(5), 0, &mut rng);
    assert_eq!(node.state(), NodeState::Wait);

    let transitions = drive(&mut node, &mut channel, &mut rng, 0, 30);
    assert_eq!(
        transitions,
        vec![
            (10, Transition::CycleStarted),
            (12, Transition::Acquired),
            (17, Transition::Released { freed: true }),
            (27, Transition::CycleStarted),
            (29, Transition::Acquired),
        ]
    );
    assert_eq!(node.state(), NodeState::Sending);
    assert_eq!(channel.occupant(), Some(NodeId(1)));

    let counters = node.counters();
    assert_eq!(counters.successes, 2);
    assert_eq!(counters.cycles, 2);
    assert_eq!(counters.hard_fails, 0);
    assert_eq!(counters.suspends, 0);
    assert_eq!(counters.retries, 0);
}

#[test]
fn test_busy_channel_hard_fails_after_retry_limit() {
    let mut rng = RngManager::new(1);
    let mut channel = Channel::new("Channel 1");
    channel.occupy(FOREIGN);
    let mut node = Node::new(NodeConfig::new(1, 10, 5), ChannelId(0), lbt(5), 0, &mut rng);

    let transitions = drive(&mut node, &mut channel, &mut rng, 0, 25);
    assert_eq!(
        transitions,
        vec![
            (10, Transition::CycleStarted),
            (12, Transition::Suspended { attempt: 1, backoff: 3 }),
            (15, Transition::Suspended { attempt: 2, backoff: 3 }),
            (18, Transition::Suspended { attempt: 3, backoff: 3 }),
            (21, Transition::Suspended { attempt: 4, backoff: 3 }),
            (24, Transition::HardFail { attempts: 5 }),
        ]
    );

    // retry_limit busy observations, retry_limit - 1 suspends
    let counters = node.counters();
    assert_eq!(counters.retries, 5);
    assert_eq!(counters.suspends, 4);
    assert_eq!(counters.hard_fails, 1);
    assert_eq!(counters.successes, 0);
    assert_eq!(node.state(), NodeState::Wait);
    assert_eq!(node.state_entered_at(), 24);

    // The channel is untouched by a losing node
    assert_eq!(channel.occupant(), Some(FOREIGN));
}

#[test]
fn test_next_cycle_after_hard_fail_starts_fresh() {
    let mut rng = RngManager::new(1);
    let mut channel = Channel::new("Channel 1");
    channel.occupy(FOREIGN);
    let mut node = Node::new(NodeConfig::new(1, 10, 5), ChannelId(0), lbt(5), 0, &mut rng);

    drive(&mut node, &mut channel, &mut rng, 0, 25);
    assert_eq!(node.cycle_retries(), 5);

    let transitions = drive(&mut node, &mut channel, &mut rng, 25, 37);
    assert_eq!(
        transitions,
        vec![
            (34, Transition::CycleStarted),
            (36, Transition::Suspended { attempt: 1, backoff: 3 }),
        ]
    );
}

#[test]
fn test_retry_count_resets_after_success_following_suspends() {
    let mut rng = RngManager::new(1);
    let mut channel = Channel::new("Channel 1");
    channel.occupy(FOREIGN);
    let mut node = Node::new(NodeConfig::new(1, 10, 5), ChannelId(0), lbt(5), 0, &mut rng);

    // Two suspends (ticks 12 and 15), then the channel frees up
    drive(&mut node, &mut channel, &mut rng, 0, 16);
    assert_eq!(node.counters().suspends, 2);
    channel.release(FOREIGN);

    assert_eq!(node.step(18, &mut channel, &mut rng), Some(Transition::Acquired));
    // Still counted against the cycle that just succeeded
    assert_eq!(node.cycle_retries(), 2);

    let transitions = drive(&mut node, &mut channel, &mut rng, 19, 34);
    assert_eq!(
        transitions,
        vec![
            (23, Transition::Released { freed: true }),
            (33, Transition::CycleStarted),
        ]
    );
    assert_eq!(node.cycle_retries(), 0);

    // A fresh cycle gets the full retry budget again
    channel.occupy(FOREIGN);
    let transitions = drive(&mut node, &mut channel, &mut rng, 34, 50);
    let attempts: Vec<Transition> = transitions.into_iter().map(|(_, t)| t).collect();
    assert_eq!(
        attempts,
        vec![
            Transition::Suspended { attempt: 1, backoff: 3 },
            Transition::Suspended { attempt: 2, backoff: 3 },
            Transition::Suspended { attempt: 3, backoff: 3 },
            Transition::Suspended { attempt: 4, backoff: 3 },
            Transition::HardFail { attempts: 5 },
        ]
    );
}

#[test]
fn test_jitter_extends_wait() {
    let mut rng = RngManager::new(31337);
    let mut channel = Channel::new("Channel 1");
    let params = LbtParams {
        max_jitter_ticks: 50,
        ..lbt(5)
    };
    let mut node = Node::new(NodeConfig::new(1, 10, 5), ChannelId(0), params, 0, &mut rng);
    let jitter = node.jitter_ticks();
    assert!(jitter <= 50);

    let first = drive(&mut node, &mut channel, &mut rng, 0, 100)
        .into_iter()
        .next()
        .unwrap();
    assert_eq!(first, (10 + jitter, Transition::CycleStarted));
}

#[test]
fn test_node_created_mid_run_waits_from_creation() {
    let mut rng = RngManager::new(1);
    let mut channel = Channel::new("Channel 1");
    let mut node = Node::new(NodeConfig::new(1, 10, 5), ChannelId(0), lbt(5), 100, &mut rng);

    assert_eq!(node.step(109, &mut channel, &mut rng), None);
    assert_eq!(node.step(110, &mut channel, &mut rng), Some(Transition::CycleStarted));
}

#[test]
fn test_uniform_backoff_drawn_per_suspend() {
    let mut rng = RngManager::new(4242);
    let mut channel = Channel::new("Channel 1");
    channel.occupy(FOREIGN);
    let params = LbtParams {
        retry_limit: 50,
        backoff: BackoffConfig::Uniform { min: 20, max: 40 },
        ..lbt(50)
    };
    let mut node = Node::new(NodeConfig::new(1, 10, 5), ChannelId(0), params, 0, &mut rng);

    let backoffs: Vec<Tick> = drive(&mut node, &mut channel, &mut rng, 0, 2_000)
        .into_iter()
        .filter_map(|(_, t)| match t {
            Transition::Suspended { backoff, .. } => Some(backoff),
            _ => None,
        })
        .collect();

    assert!(backoffs.len() > 10);
    assert!(backoffs.iter().all(|b| (20..=40).contains(b)));
    assert!(backoffs.windows(2).any(|w| w[0] != w[1]), "backoff should vary");
}

#[test]
fn test_sampling_sees_channel_freed_before_its_step() {
    let mut rng = RngManager::new(1);
    let mut channel = Channel::new("Channel 1");
    channel.occupy(FOREIGN);
    let mut node = Node::new(NodeConfig::new(1, 10, 5), ChannelId(0), lbt(5), 0, &mut rng);

    drive(&mut node, &mut channel, &mut rng, 0, 12);
    assert_eq!(node.state(), NodeState::Sampling);

    channel.release(FOREIGN);
    assert_eq!(node.step(12, &mut channel, &mut rng), Some(Transition::Acquired));
    assert_eq!(node.counters().suspends, 0);
}
