//! Damage application.

use bevy::prelude::{Commands, Component, Entity, Query, ResMut, Without};
use log::debug;

use crate::command::{CommandComponent, CommandFailure, CommandLedger, Ticket};
use crate::components::Health;

/// Request to subtract hit points. The entity despawns when its pool
/// empties; the despawn cascades through the bridge, freeing its nodes.
#[derive(Component, Debug, Clone, Copy)]
pub struct DamageCommand {
    amount: i32,
    ticket: Ticket,
}

impl DamageCommand {
    /// A damage request of `amount` points.
    #[must_use]
    pub const fn new(ticket: Ticket, amount: i32) -> Self {
        Self { amount, ticket }
    }

    /// Points to subtract.
    #[must_use]
    pub const fn amount(&self) -> i32 {
        self.amount
    }
}

impl CommandComponent for DamageCommand {
    fn ticket(&self) -> Ticket {
        self.ticket
    }
}

/// Applies pending damage commands.
pub fn apply_damage_commands_system(
    mut victims: Query<(Entity, &DamageCommand, &mut Health)>,
    mut ledger: ResMut<CommandLedger>,
    mut commands: Commands,
) {
    for (entity, command, mut health) in &mut victims {
        health.current = (health.current - command.amount()).max(0);
        debug!(
            "{entity:?} took {} damage, {} left",
            command.amount(),
            health.current
        );
        ledger.resolve_success(command.ticket());
        commands.entity(entity).remove::<DamageCommand>();
        if health.is_dead() {
            commands.entity(entity).despawn();
        }
    }
}

/// Fails damage commands issued against entities without a health pool.
pub fn fail_unbacked_commands_system(
    unbacked: Query<(Entity, &DamageCommand), Without<Health>>,
    mut ledger: ResMut<CommandLedger>,
    mut commands: Commands,
) {
    for (entity, command) in &unbacked {
        ledger.resolve_failure(
            command.ticket(),
            CommandFailure::Message("entity has no health pool".into()),
        );
        commands.entity(entity).remove::<DamageCommand>();
    }
}
