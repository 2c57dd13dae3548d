//! Component types used across benchmarks.

use rusty_sparse::ecs::Component;

// =============================================================================
// Transform Components
// =============================================================================

/// 3D position component (12 bytes).
#[derive(Component, Clone, Copy, Debug, Default, PartialEq)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// 3D velocity component (12 bytes).
#[derive(Component, Clone, Copy, Debug, Default, PartialEq)]
pub struct Velocity {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// 4x4 transformation matrix (64 bytes). Deleted in place, so erasing never moves other rows.
#[derive(Component, Clone, Copy, Debug)]
#[component(in_place)]
pub struct Transform {
    pub matrix: [[f32; 4]; 4],
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            matrix: [
                [1.0, 0.0, 0.0, 0.0],
                [0.0, 1.0, 0.0, 0.0],
                [0.0, 0.0, 1.0, 0.0],
                [0.0, 0.0, 0.0, 1.0],
            ],
        }
    }
}

// =============================================================================
// Particle Components
// =============================================================================

/// Remaining lifetime in seconds.
#[derive(Component, Clone, Copy, Debug, Default)]
pub struct Lifetime {
    pub remaining: f32,
    pub total: f32,
}

/// Marker for particles (zero-sized).
#[derive(Component, Clone, Copy, Debug, Default)]
pub struct Particle;

/// Particles that stopped moving are excluded from movement.
#[derive(Component, Clone, Copy, Debug, Default)]
pub struct Frozen;
