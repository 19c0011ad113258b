//! Movement towards a target point.

use bevy::prelude::{Commands, Component, Entity, Query, ResMut, Without};
use bevy_math::Vec2;

use crate::command::{CommandComponent, CommandFailure, CommandLedger, Ticket};
use crate::components::{LastIntent, Obstacle, Position, Speed};
use crate::constants::{DEFAULT_ARRIVAL_RADIUS, DEFAULT_SPEED, TICK_SECONDS};

/// Request to walk the entity to a point. Succeeds when the entity comes
/// within the arrival radius; fails with `Collision` when the next step
/// would land inside an obstacle.
#[derive(Component, Debug, Clone, Copy)]
pub struct MoveCommand {
    target: Vec2,
    radius: f32,
    ticket: Ticket,
}

impl MoveCommand {
    /// A move with the default arrival radius.
    #[must_use]
    pub const fn new(ticket: Ticket, target: Vec2) -> Self {
        Self::with_radius(ticket, target, DEFAULT_ARRIVAL_RADIUS)
    }

    /// A move with an explicit arrival radius.
    #[must_use]
    pub const fn with_radius(ticket: Ticket, target: Vec2, radius: f32) -> Self {
        Self {
            target,
            radius,
            ticket,
        }
    }

    /// Destination point.
    #[must_use]
    pub const fn target(&self) -> Vec2 {
        self.target
    }

    /// Arrival radius.
    #[must_use]
    pub const fn radius(&self) -> f32 {
        self.radius
    }
}

impl CommandComponent for MoveCommand {
    fn ticket(&self) -> Ticket {
        self.ticket
    }
}

/// Steps every entity with a live move command towards its target.
pub fn apply_move_commands_system(
    mut movers: Query<(
        Entity,
        &MoveCommand,
        &mut Position,
        Option<&Speed>,
        Option<&mut LastIntent>,
    )>,
    obstacles: Query<(&Position, &Obstacle), Without<MoveCommand>>,
    mut ledger: ResMut<CommandLedger>,
    mut commands: Commands,
) {
    for (entity, command, mut position, speed, intent) in &mut movers {
        let to_target = command.target() - position.0;
        let distance = to_target.length();
        if distance <= command.radius() {
            ledger.resolve_success(command.ticket());
            commands.entity(entity).remove::<MoveCommand>();
            continue;
        }

        let step = speed.map_or(DEFAULT_SPEED, |s| s.0) * TICK_SECONDS;
        let direction = to_target / distance;
        let next = position.0 + direction * step.min(distance);

        let blocked = obstacles.iter().any(|(centre, obstacle)| {
            next.distance_squared(centre.0) < obstacle.radius * obstacle.radius
        });
        if blocked {
            ledger.resolve_failure(command.ticket(), CommandFailure::Collision);
            commands.entity(entity).remove::<MoveCommand>();
            continue;
        }

        position.0 = next;
        if let Some(mut intent) = intent {
            intent.direction = direction;
        }
        if next.distance_squared(command.target()) <= command.radius() * command.radius() {
            ledger.resolve_success(command.ticket());
            commands.entity(entity).remove::<MoveCommand>();
        }
    }
}

/// Fails move commands issued against entities that cannot move.
pub fn fail_unmovable_commands_system(
    stuck: Query<(Entity, &MoveCommand), Without<Position>>,
    mut ledger: ResMut<CommandLedger>,
    mut commands: Commands,
) {
    for (entity, command) in &stuck {
        ledger.resolve_failure(
            command.ticket(),
            CommandFailure::Message("entity has no position".into()),
        );
        commands.entity(entity).remove::<MoveCommand>();
    }
}
