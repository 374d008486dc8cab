//! Deterministic random number generation
//!
//! All randomness in the simulator (jitter offsets, backoff draws) MUST go
//! through this module so runs replay under a fixed seed.

mod xorshift;

pub use xorshift::RngManager;
