//! World workloads driven frame by frame.

mod particles;

pub use particles::{ParticleConfig, ParticleScenario};

/// A benchmark workload.
pub trait Scenario {
    /// Populate the world.
    fn setup(&mut self);

    /// Run one frame.
    fn update(&mut self);

    /// Number of live entities.
    fn entity_count(&self) -> usize;
}
