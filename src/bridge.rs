//! Node ⇄ entity synchronisation.
//!
//! Discovery turns engine notifications into entities and components;
//! mirroring propagates ECS-side changes back onto the engine tree. Both
//! directions share one rule: the ECS store is authoritative for gameplay
//! state, the engine tree for node structure, and each side learns of the
//! other's changes at fixed points in the tick.

mod discover;
mod mirror;

use std::any::TypeId;

use bevy::prelude::{
    App, Event, First, IntoScheduleConfigs, Last, On, Plugin, PostUpdate, PreUpdate, ResMut,
};
use log::error;

use crate::components::{advance_tick_clock_system, TickClock};
use crate::liveness::NodeEntityMap;
use crate::registry::{ComponentRegistry, NodeComponent};
use crate::scene::SceneTree;
use crate::script::RegisterWatchableExt;
use crate::TandemSet;

pub use discover::pump_scene_events_system;
pub use mirror::sync_body_translation_system;

/// Non-fatal bridge fault, reported as an event so tests can assert on it.
/// The default observer logs at error level.
#[derive(Event, Debug, Clone)]
pub struct BridgeIssue {
    /// Which part of the bridge raised the issue.
    pub context: &'static str,
    /// Human-readable description.
    pub detail: String,
}

impl BridgeIssue {
    /// Builds an issue event.
    #[must_use]
    pub fn new(context: &'static str, detail: impl Into<String>) -> Self {
        Self {
            context,
            detail: detail.into(),
        }
    }
}

#[expect(
    clippy::needless_pass_by_value,
    reason = "Observer systems must take On<T> by value."
)]
fn log_bridge_issue(issue: On<BridgeIssue>) {
    let event = issue.event();
    error!("bridge {}: {}", event.context, event.detail);
}

/// App extension wiring a [`NodeComponent`] into the bridge: dispatch
/// registry entry, mirror systems and script watchability.
pub trait RegisterNodeComponentExt {
    /// Registers `C` for its node class. Idempotent per component type.
    fn register_node_component<C: NodeComponent>(&mut self) -> &mut Self;
}

impl RegisterNodeComponentExt for App {
    fn register_node_component<C: NodeComponent>(&mut self) -> &mut Self {
        self.init_resource::<ComponentRegistry>();
        let fresh = {
            let mut registry = self.world_mut().resource_mut::<ComponentRegistry>();
            let already = registry.entry(C::CLASS).map(|entry| entry.type_id())
                == Ok(TypeId::of::<C>());
            registry.register::<C>();
            !already
        };
        if fresh {
            self.add_systems(
                PostUpdate,
                (
                    mirror::attach_inserted_system::<C>.in_set(TandemSet::Mirror),
                    mirror::free_removed_system::<C>.in_set(TandemSet::Sweep),
                ),
            );
            self.register_watchable::<C>();
        }
        self
    }
}

fn apply_queued_free_system(mut scene: ResMut<SceneTree>) {
    scene.apply_queued_free();
}

/// Plugin installing the scene stand-in, the discovery pump and the mirror
/// plumbing. Node component types register separately through
/// [`RegisterNodeComponentExt`].
#[derive(Default)]
pub struct BridgePlugin;

impl Plugin for BridgePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SceneTree>()
            .init_resource::<NodeEntityMap>()
            .init_resource::<ComponentRegistry>()
            .init_resource::<TickClock>();

        app.configure_sets(
            PostUpdate,
            (TandemSet::Mirror, TandemSet::Sweep, TandemSet::Watch).chain(),
        );
        app.configure_sets(
            Last,
            (TandemSet::Flush, TandemSet::SceneMaintenance).chain(),
        );

        app.add_systems(First, advance_tick_clock_system);
        app.add_systems(PreUpdate, pump_scene_events_system);
        app.add_systems(
            PostUpdate,
            (
                sync_body_translation_system.in_set(TandemSet::Mirror),
                mirror::free_removed_primary_system.in_set(TandemSet::Sweep),
            ),
        );
        app.add_systems(
            Last,
            apply_queued_free_system.in_set(TandemSet::SceneMaintenance),
        );
        app.add_observer(log_bridge_issue);
    }
}
