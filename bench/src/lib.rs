//! Benchmark utilities for the sparse set storage.
//!
//! - **Microbenchmarks**: single storage operations (emplace, erase per policy, sort, iteration)
//! - **Scenario benchmarks**: world workloads with listeners and groups kept up to date
//!
//! # Running Benchmarks
//!
//! ```bash
//! # Run all benchmarks
//! cargo bench -p rusty_sparse_bench
//!
//! # Run specific benchmark group
//! cargo bench -p rusty_sparse_bench -- erase
//! ```
//!
//! Results are written to `target/criterion/` with HTML reports for visualization.

pub mod components;
pub mod scenarios;

use rand::{SeedableRng, seq::SliceRandom};
use rand_chacha::ChaCha8Rng;
use rusty_sparse::ecs::{Entity, storage::EntityStorage};

/// Seed shared by every benchmark so runs are comparable.
pub const SEED: u64 = 12345;

/// A reproducible random number generator.
pub fn rng() -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(SEED)
}

/// Hand out `count` identifiers from a fresh pool.
pub fn entities(count: usize) -> Vec<Entity> {
    EntityStorage::new().spawn_many(count)
}

/// `count` identifiers in a reproducible random order.
pub fn shuffled(count: usize) -> Vec<Entity> {
    let mut entities = entities(count);
    entities.shuffle(&mut rng());
    entities
}
