//! Tests for deterministic RNG
//!
//! Same seed MUST produce same sequence; jitter and backoff draws depend on it.

use lbt_simulator_core_rs::RngManager;

#[test]
fn test_rng_new_with_seed() {
    let rng = RngManager::new(12345);
    assert_eq!(rng.get_state(), 12345);
}

#[test]
fn test_rng_next_deterministic() {
    let mut rng1 = RngManager::new(12345);
    let mut rng2 = RngManager::new(12345);

    for _ in 0..100 {
        assert_eq!(rng1.next(), rng2.next(), "RNG not deterministic!");
    }
}

#[test]
fn test_rng_different_seeds_different_sequences() {
    let mut rng1 = RngManager::new(12345);
    let mut rng2 = RngManager::new(54321);

    assert_ne!(
        rng1.next(),
        rng2.next(),
        "Different seeds should produce different values"
    );
}

#[test]
fn test_backoff_draws_deterministic() {
    let mut rng1 = RngManager::new(99999);
    let mut rng2 = RngManager::new(99999);

    for _ in 0..50 {
        let val1 = rng1.uniform_inclusive(5_000, 10_000);
        let val2 = rng2.uniform_inclusive(5_000, 10_000);
        assert_eq!(val1, val2, "uniform_inclusive() not deterministic!");
        assert!((5_000..=10_000).contains(&val1));
    }
}

#[test]
fn test_rng_replay_from_state() {
    let mut rng1 = RngManager::new(12345);

    for _ in 0..10 {
        rng1.next();
    }

    let saved_state = rng1.get_state();
    let val1_a = rng1.next();
    let val1_b = rng1.next();

    let mut rng2 = RngManager::new(saved_state);
    assert_eq!(val1_a, rng2.next());
    assert_eq!(val1_b, rng2.next());
}

#[test]
fn test_rng_produces_diverse_values() {
    let mut rng = RngManager::new(12345);
    let unique: std::collections::HashSet<u64> = (0..100).map(|_| rng.next()).collect();
    assert!(unique.len() > 95, "Expected diverse values, got {} unique", unique.len());
}
