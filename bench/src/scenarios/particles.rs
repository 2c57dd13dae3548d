//! Particle system scenario.
//!
//! Particles are spawned with a position, a velocity and a lifetime. Every frame:
//! - the movement group (owns `Position`, observes `Velocity`, excludes `Frozen`) is walked;
//! - lifetimes decay and expired particles are despawned;
//! - a fraction of particles is frozen or thawed, moving them in and out of the group;
//! - new particles replace the dead ones.
//!
//! This stresses group maintenance under churn rather than raw iteration.

use rand::Rng;
use rand_chacha::ChaCha8Rng;
use rusty_sparse::ecs::{Entity, GroupId, GroupLayout, World};

use crate::components::{Frozen, Lifetime, Particle, Position, Velocity};
use crate::scenarios::Scenario;

/// Configuration for the particle benchmark.
pub struct ParticleConfig {
    /// Total number of particles to maintain.
    pub particle_count: usize,
    /// Simulated delta time per frame.
    pub delta_time: f32,
    /// Chance per frame that a particle toggles its `Frozen` marker.
    pub freeze_rate: f64,
    /// Random seed for reproducibility.
    pub seed: u64,
}

impl Default for ParticleConfig {
    fn default() -> Self {
        Self {
            particle_count: 100_000,
            delta_time: 1.0 / 60.0,
            freeze_rate: 0.01,
            seed: crate::SEED,
        }
    }
}

pub struct ParticleScenario {
    config: ParticleConfig,
    world: World,
    rng: ChaCha8Rng,
    moving: Option<GroupId>,
    spawned: u64,
}

impl ParticleScenario {
    pub fn new() -> Self {
        Self::with_config(ParticleConfig::default())
    }

    pub fn with_config(config: ParticleConfig) -> Self {
        use rand::SeedableRng;

        let rng = ChaCha8Rng::seed_from_u64(config.seed);
        Self {
            config,
            world: World::new(),
            rng,
            moving: None,
            spawned: 0,
        }
    }

    #[inline]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Particles spawned since setup, replacements included.
    #[inline]
    pub fn spawned(&self) -> u64 {
        self.spawned
    }

    fn spawn_particle(&mut self) -> Entity {
        let rng = &mut self.rng;
        let position = Position {
            x: rng.gen_range(-100.0..100.0),
            y: rng.gen_range(-100.0..100.0),
            z: rng.gen_range(-100.0..100.0),
        };
        let velocity = Velocity {
            x: rng.gen_range(-10.0..10.0),
            y: rng.gen_range(-10.0..10.0),
            z: rng.gen_range(-10.0..10.0),
        };
        let lifetime = Lifetime {
            remaining: rng.gen_range(0.1..2.0),
            total: 2.0,
        };

        let entity = self.world.spawn();
        self.world.emplace(entity, Particle);
        self.world.emplace(entity, position);
        self.world.emplace(entity, velocity);
        self.world.emplace(entity, lifetime);
        self.spawned += 1;
        entity
    }

    /// Integrate every moving particle.
    pub fn system_movement(&mut self) {
        let Some(moving) = self.moving else {
            return;
        };
        let dt = self.config.delta_time;
        let members = self.world.group_entities(moving).to_vec();
        for entity in members {
            let velocity = *self.world.get::<Velocity>(entity);
            let position = self.world.get_mut::<Position>(entity);
            position.x += velocity.x * dt;
            position.y += velocity.y * dt;
            position.z += velocity.z * dt;
        }
    }

    /// Decay lifetimes, despawn expired particles and return how many died.
    pub fn system_lifetime(&mut self) -> usize {
        let dt = self.config.delta_time;
        let alive: Vec<_> = self.world.alive().collect();
        let mut dead = Vec::new();
        for entity in alive {
            let lifetime = self.world.get_mut::<Lifetime>(entity);
            lifetime.remaining -= dt;
            if lifetime.remaining <= 0.0 {
                dead.push(entity);
            }
        }
        for &entity in &dead {
            self.world.despawn(entity);
        }
        dead.len()
    }

    /// Toggle `Frozen` on a random fraction of the particles.
    pub fn system_freeze(&mut self) {
        let alive: Vec<_> = self.world.alive().collect();
        for entity in alive {
            if !self.rng.gen_bool(self.config.freeze_rate) {
                continue;
            }
            if !self.world.remove::<Frozen>(entity) {
                self.world.emplace(entity, Frozen);
            }
        }
    }
}

impl Default for ParticleScenario {
    fn default() -> Self {
        Self::new()
    }
}

impl Scenario for ParticleScenario {
    fn setup(&mut self) {
        let layout = GroupLayout::new()
            .owned::<Position>()
            .get::<Velocity>()
            .exclude::<Frozen>();
        self.moving = self.world.group(layout).ok();

        for _ in 0..self.config.particle_count {
            self.spawn_particle();
        }
    }

    fn update(&mut self) {
        self.system_movement();
        let dead = self.system_lifetime();
        self.system_freeze();
        for _ in 0..dead {
            self.spawn_particle();
        }
    }

    fn entity_count(&self) -> usize {
        self.world.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn particle_count_is_maintained() {
        // Given
        let mut scenario = ParticleScenario::with_config(ParticleConfig {
            particle_count: 500,
            ..Default::default()
        });
        scenario.setup();

        // When
        for _ in 0..120 {
            scenario.update();
        }

        // Then
        assert_eq!(scenario.entity_count(), 500);
        assert!(scenario.spawned() > 500);
        let world = scenario.world();
        let moving = world.group_entities(scenario.moving.unwrap());
        assert!(moving.iter().all(|&e| !world.has::<Frozen>(e)));
        let frozen = world.storage::<Frozen>().map_or(0, |storage| storage.len());
        assert_eq!(moving.len() + frozen, 500);
    }
}
