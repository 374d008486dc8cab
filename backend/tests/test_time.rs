//! Tests for TimeManager

use lbt_simulator_core_rs::TimeManager;

#[test]
fn test_time_manager_new() {
    let time = TimeManager::new(600_000);
    assert_eq!(time.current_tick(), 0);
    assert_eq!(time.tick_budget(), 600_000);
    assert_eq!(time.remaining_ticks(), 600_000);
    assert!(!time.is_exhausted());
}

#[test]
fn test_advance_tick() {
    let mut time = TimeManager::new(100);

    time.advance_tick();
    assert_eq!(time.current_tick(), 1);

    time.advance_tick();
    assert_eq!(time.current_tick(), 2);
    assert_eq!(time.remaining_ticks(), 98);
}

#[test]
fn test_budget_boundary() {
    let mut time = TimeManager::new(10);

    for _ in 0..9 {
        time.advance_tick();
    }
    assert_eq!(time.current_tick(), 9);
    assert!(!time.is_exhausted(), "last tick of the budget still runs");

    time.advance_tick();
    assert_eq!(time.current_tick(), 10);
    assert!(time.is_exhausted());
}

#[test]
fn test_clock_never_decreases() {
    let mut time = TimeManager::new(1_000);
    let mut previous = time.current_tick();

    for _ in 0..1_000 {
        time.advance_tick();
        assert!(time.current_tick() > previous);
        previous = time.current_tick();
    }
}
