//! Component watches.
//!
//! Scripts can wait for a component to be set on or removed from their
//! entity. Each watchable type gets one recorder system that appends change
//! and removal notices to a tick-scoped log, drained by the flush.

use std::any::TypeId;

use bevy::prelude::{
    App, Changed, Component, Entity, IntoScheduleConfigs, PostUpdate, Query, RemovedComponents,
    ResMut, Resource,
};
use hashbrown::HashSet;

use crate::TandemSet;

/// Direction of a watched change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WatchKind {
    /// Component inserted or mutated.
    Set,
    /// Component removed.
    Removed,
}

/// One recorded change notice.
#[derive(Debug, Clone, Copy)]
pub(crate) struct WatchEvent {
    pub(crate) entity: Entity,
    pub(crate) type_id: TypeId,
    pub(crate) kind: WatchKind,
}

/// Tick-scoped log of watched changes. Drained once per flush.
#[derive(Resource, Default)]
pub struct WatchEvents {
    events: Vec<WatchEvent>,
}

impl WatchEvents {
    pub(crate) fn take(&mut self) -> Vec<WatchEvent> {
        std::mem::take(&mut self.events)
    }
}

/// Which types already have a recorder installed.
#[derive(Resource, Default)]
pub struct WatchRegistry(HashSet<TypeId>);

impl WatchRegistry {
    pub(crate) fn is_watchable(&self, type_id: TypeId) -> bool {
        self.0.contains(&type_id)
    }
}

/// App extension making a component type watchable by scripts.
pub trait RegisterWatchableExt {
    /// Installs the change recorder for `C`. Idempotent per type.
    fn register_watchable<C: Component>(&mut self) -> &mut Self;
}

impl RegisterWatchableExt for App {
    fn register_watchable<C: Component>(&mut self) -> &mut Self {
        self.init_resource::<WatchEvents>();
        self.init_resource::<WatchRegistry>();
        let fresh = self
            .world_mut()
            .resource_mut::<WatchRegistry>()
            .0
            .insert(TypeId::of::<C>());
        if fresh {
            self.add_systems(
                PostUpdate,
                record_watch_events::<C>.in_set(TandemSet::Watch),
            );
        }
        self
    }
}

fn record_watch_events<C: Component>(
    changed: Query<Entity, Changed<C>>,
    mut removed: RemovedComponents<C>,
    mut log: ResMut<WatchEvents>,
) {
    let type_id = TypeId::of::<C>();
    for entity in &changed {
        log.events.push(WatchEvent {
            entity,
            type_id,
            kind: WatchKind::Set,
        });
    }
    for entity in removed.read() {
        log.events.push(WatchEvent {
            entity,
            type_id,
            kind: WatchKind::Removed,
        });
    }
}
