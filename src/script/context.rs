//! Execution context handed to a script while it takes a step.

use std::any::TypeId;

use bevy::prelude::{Bundle, Component, Entity, World};

use crate::command::{CommandComponent, CommandFailure, CommandLedger, Ticket};
use crate::scene::SceneTree;

/// World access scoped to the script's own entity.
///
/// Liveness was checked just before the step started, so reads and writes
/// here hit a live entity unless the script itself despawned it.
pub struct ScriptCx<'w> {
    world: &'w mut World,
    entity: Entity,
}

impl<'w> ScriptCx<'w> {
    pub(crate) fn new(world: &'w mut World, entity: Entity) -> Self {
        Self { world, entity }
    }

    /// The entity this script is attached to.
    #[must_use]
    pub const fn entity(&self) -> Entity {
        self.entity
    }

    /// Issues a command on the script's entity and returns its ticket,
    /// ready to hand to [`Step::AwaitCommand`](crate::script::Step).
    ///
    /// If the entity died during this very step the command resolves
    /// `Failed(Removed)` immediately, waking the script at the next flush.
    pub fn issue<C: CommandComponent>(&mut self, make: impl FnOnce(Ticket) -> C) -> Ticket {
        let ticket = self
            .world
            .resource_mut::<CommandLedger>()
            .begin(self.entity, TypeId::of::<C>());
        if let Ok(mut entry) = self.world.get_entity_mut(self.entity) {
            entry.insert(make(ticket));
        } else {
            self.world
                .resource_mut::<CommandLedger>()
                .resolve_failure(ticket, CommandFailure::Removed);
        }
        ticket
    }

    /// A component on the script's entity.
    #[must_use]
    pub fn get<C: Component>(&self) -> Option<&C> {
        self.world.get::<C>(self.entity)
    }

    /// Whether the script's entity has a component of type `C`.
    #[must_use]
    pub fn has<C: Component>(&self) -> bool {
        self.get::<C>().is_some()
    }

    /// Inserts `bundle` on the script's entity.
    pub fn insert(&mut self, bundle: impl Bundle) {
        if let Ok(mut entry) = self.world.get_entity_mut(self.entity) {
            entry.insert(bundle);
        }
    }

    /// Removes the bundle `B` from the script's entity.
    pub fn remove<B: Bundle>(&mut self) {
        if let Ok(mut entry) = self.world.get_entity_mut(self.entity) {
            entry.remove::<B>();
        }
    }

    /// Read-only view of the host scene tree.
    #[must_use]
    pub fn scene(&self) -> &SceneTree {
        self.world.resource::<SceneTree>()
    }
}
