//! Removal sweeps.
//!
//! A command whose component disappears without an effect system resolving
//! it (withdrawn by gameplay, or its entity despawned) must still complete,
//! with `Failed(Removed)`. One sweep system per registered command type
//! watches for removals and resolves the orphaned ticket.

use std::any::TypeId;

use bevy::prelude::{
    App, IntoScheduleConfigs, PostUpdate, Query, RemovedComponents, ResMut, Resource,
};
use hashbrown::HashSet;
use log::debug;

use super::{CommandComponent, CommandFailure, CommandLedger};
use crate::script::RegisterWatchableExt;
use crate::TandemSet;

/// Tracks which command types already have a sweep installed.
#[derive(Resource, Default)]
struct SweepRegistry(HashSet<TypeId>);

/// App extension registering a command component type.
pub trait RegisterCommandExt {
    /// Installs the removal sweep for `C` and makes it watchable by
    /// scripts. Idempotent per type.
    fn register_command<C: CommandComponent>(&mut self) -> &mut Self;
}

impl RegisterCommandExt for App {
    fn register_command<C: CommandComponent>(&mut self) -> &mut Self {
        self.init_resource::<SweepRegistry>();
        let fresh = self
            .world_mut()
            .resource_mut::<SweepRegistry>()
            .0
            .insert(TypeId::of::<C>());
        if fresh {
            self.add_systems(PostUpdate, sweep_removed::<C>.in_set(TandemSet::Sweep));
            self.register_watchable::<C>();
        }
        self
    }
}

/// Resolves `Failed(Removed)` for commands of type `C` whose component was
/// removed this tick while still running.
pub(crate) fn sweep_removed<C: CommandComponent>(
    mut removed: RemovedComponents<C>,
    live: Query<&C>,
    mut ledger: ResMut<CommandLedger>,
) {
    for entity in removed.read() {
        // A removal followed by a fresh insert in the same tick is a
        // replacement; the live instance owns the issue record now.
        if live.get(entity).is_ok() {
            continue;
        }
        if let Some(ticket) = ledger.clear_issued(entity, TypeId::of::<C>()) {
            if ledger.is_running(ticket) {
                debug!("command {ticket:?} on {entity:?} withdrawn while running");
                ledger.resolve_failure(ticket, CommandFailure::Removed);
            }
        }
    }
}
