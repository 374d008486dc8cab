//! Per-cycle accounting checked against the recorded event trail
//!
//! Every cycle ends in exactly one outcome: the node either acquires the
//! channel or gives up after `retry_limit` busy observations.

use lbt_simulator_core_rs::models::{BackoffConfig, Event, LbtParams, NodeConfig, NodeId};
use lbt_simulator_core_rs::orchestrator::{ChannelConfig, Simulation, SimulationConfig};

const RETRY_LIMIT: u32 = 4;

fn contended_run() -> Simulation {
    let config = SimulationConfig {
        rng_seed: 4711,
        tick_budget: 60_000,
        lbt: LbtParams {
            sample_ticks: 10,
            retry_limit: RETRY_LIMIT,
            max_jitter_ticks: 200,
            backoff: BackoffConfig::Fixed { ticks: 60 },
        },
        record_events: true,
        channels: vec![ChannelConfig {
            label: "Channel 1".to_string(),
            nodes: (0..6).map(|id| NodeConfig::new(id, 1_500, 800)).collect(),
        }],
    };

    let mut sim = Simulation::new(config).unwrap();
    sim.run();
    sim
}

fn node_ids(sim: &Simulation) -> Vec<NodeId> {
    sim.nodes().map(|node| node.id()).collect()
}

#[test]
fn test_hard_fail_follows_limit_minus_one_suspends() {
    let sim = contended_run();
    let mut hard_fails_seen = 0;

    for id in node_ids(&sim) {
        let mut suspends_this_cycle = 0;

        for event in sim.event_log().events_for_node(id) {
            match event {
                Event::CycleStarted { .. } => suspends_this_cycle = 0,
                Event::Suspended { attempt, .. } => {
                    suspends_this_cycle += 1;
                    assert_eq!(*attempt, suspends_this_cycle, "{:?}", event);
                }
                Event::HardFail { attempts, .. } => {
                    assert_eq!(*attempts, RETRY_LIMIT, "{:?}", event);
                    assert_eq!(suspends_this_cycle, RETRY_LIMIT - 1, "{:?}", event);
                    hard_fails_seen += 1;
                }
                _ => {}
            }
        }
    }

    assert!(hard_fails_seen > 0, "scenario should produce hard fails");
}

#[test]
fn test_exactly_one_outcome_per_cycle() {
    let sim = contended_run();

    for id in node_ids(&sim) {
        let mut open_cycle = false;

        for event in sim.event_log().events_for_node(id) {
            match event {
                Event::CycleStarted { .. } => {
                    assert!(!open_cycle, "{} started a cycle without resolving the last", id);
                    open_cycle = true;
                }
                Event::ChannelAcquired { .. } | Event::HardFail { .. } => {
                    assert!(open_cycle, "{} resolved a cycle twice: {:?}", id, event);
                    open_cycle = false;
                }
                Event::Suspended { .. } => {
                    assert!(open_cycle, "{} suspended outside a cycle", id);
                }
                _ => {}
            }
        }
    }
}

#[test]
fn test_event_counts_match_counters() {
    let sim = contended_run();
    let report = sim.report();
    let log = sim.event_log();

    for node in &report.nodes {
        let events = log.events_for_node(node.id);
        let count = |kind: &str| events.iter().filter(|e| e.event_type() == kind).count() as u64;

        assert_eq!(count("CycleStarted"), node.counters.cycles);
        assert_eq!(count("ChannelAcquired"), node.counters.successes);
        assert_eq!(count("Suspended"), node.counters.suspends);
        assert_eq!(count("HardFail"), node.counters.hard_fails);
        assert_eq!(node.counters.retries, node.counters.suspends + node.counters.hard_fails);
    }
}

#[test]
fn test_every_release_frees_the_channel() {
    let sim = contended_run();
    let releases = sim.event_log().events_of_type("TransmissionEnded");

    assert!(!releases.is_empty());
    for event in releases {
        assert!(
            matches!(event, Event::TransmissionEnded { freed: true, .. }),
            "{:?}",
            event
        );
    }
}

#[test]
fn test_events_in_tick_order() {
    let sim = contended_run();
    let ticks: Vec<u64> = sim.event_log().events().iter().map(|e| e.tick()).collect();
    assert!(ticks.windows(2).all(|w| w[0] <= w[1]));
}
