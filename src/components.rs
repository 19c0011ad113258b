//! Gameplay components and the tick clock.

use bevy::prelude::{Component, ResMut, Resource};
use bevy_math::Vec2;
use serde::Serialize;

/// Monotonic tick counter, advanced once per schedule run.
#[derive(Resource, Default, Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickClock {
    /// Ticks completed since the world was created.
    pub ticks: u64,
}

/// Advances the tick clock. Runs first in the schedule.
pub fn advance_tick_clock_system(mut clock: ResMut<TickClock>) {
    clock.ticks += 1;
}

/// World-space position of an entity. Mirrored back onto the engine body
/// node whenever it changes.
#[derive(Component, Debug, Clone, Copy, PartialEq)]
pub struct Position(pub Vec2);

/// Movement speed in world units per second.
#[derive(Component, Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Speed(pub f32);

/// Hit points.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Health {
    /// Remaining hit points. The entity despawns when this reaches zero.
    pub current: i32,
    /// Hit point ceiling.
    pub max: i32,
}

impl Health {
    /// A full health pool of `max` points.
    #[must_use]
    pub const fn full(max: i32) -> Self {
        Self { current: max, max }
    }

    /// Whether the pool is exhausted.
    #[must_use]
    pub const fn is_dead(&self) -> bool {
        self.current <= 0
    }
}

/// Direction of the most recent movement step, for animation-facing
/// consumers. Zero when the entity has not moved.
#[derive(Component, Debug, Clone, Copy, PartialEq, Default)]
pub struct LastIntent {
    /// Unit direction of the last step, or zero.
    pub direction: Vec2,
}

/// Circular blocker. Movement that would end inside one fails.
#[derive(Component, Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Obstacle {
    /// Blocking radius in world units.
    pub radius: f32,
}
