//! ECS → scene mirroring.
//!
//! Gameplay may insert or remove node-wrapper components directly; these
//! systems keep the engine tree consistent with that. They run late in the
//! tick, after gameplay, so each tick's net change is mirrored once.

use std::any::TypeId;

use bevy::prelude::{
    Added, Changed, ChildOf, Commands, Entity, Query, RemovedComponents, ResMut,
};

use super::BridgeIssue;
use crate::components::Position;
use crate::liveness::NodeEntityMap;
use crate::nodes::{BodyNode, PrimaryNode};
use crate::registry::NodeComponent;
use crate::scene::SceneTree;

/// Attaches the engine node behind a freshly inserted wrapper beneath the
/// entity's primary node, unless discovery already placed it.
pub(crate) fn attach_inserted_system<C: NodeComponent>(
    fresh: Query<(Entity, &C), Added<C>>,
    primaries: Query<&PrimaryNode>,
    parents: Query<&ChildOf>,
    mut scene: ResMut<SceneTree>,
    mut map: ResMut<NodeEntityMap>,
    mut commands: Commands,
) {
    for (entity, component) in &fresh {
        let node = component.node();
        if !scene.is_valid(node) {
            commands.trigger(BridgeIssue::new(
                "mirror",
                format!("{entity:?} wraps freed node {node:?}"),
            ));
            continue;
        }
        // A wrapper swapped in over an old one orphans the old engine
        // object; tear it down like an engine-side replacement would.
        if let Some(old) = map.attachment(entity, TypeId::of::<C>()) {
            if old != node && scene.is_valid(old) {
                scene.queue_free(old);
            }
        }
        map.record_attachment(entity, TypeId::of::<C>(), node);
        if scene.parent(node).is_some() {
            // Already in the tree: this is the discovery path.
            continue;
        }
        let anchor = primaries.get(entity).ok().map(|primary| primary.0).or_else(|| {
            parents
                .get(entity)
                .ok()
                .and_then(|child_of| primaries.get(child_of.parent()).ok())
                .map(|primary| primary.0)
        });
        match anchor {
            Some(anchor) if scene.is_valid(anchor) => scene.add_child(anchor, node),
            _ => commands.trigger(BridgeIssue::new(
                "mirror",
                format!("no primary node to attach {node:?} beneath for {entity:?}"),
            )),
        }
    }
}

/// Frees the engine node a removed wrapper was holding. Covers explicit
/// removal and entity despawn alike; the attachment ledger survives the
/// component value, which is already gone when this runs.
pub(crate) fn free_removed_system<C: NodeComponent>(
    mut removed: RemovedComponents<C>,
    live: Query<&C>,
    mut scene: ResMut<SceneTree>,
    mut map: ResMut<NodeEntityMap>,
) {
    for entity in removed.read() {
        let current = live.get(entity).ok().map(C::node);
        let Some(recorded) = map.attachment(entity, TypeId::of::<C>()) else {
            continue;
        };
        if current == Some(recorded) {
            // Removed and re-inserted in the same tick; the ledger already
            // tracks the live node and the old one was freed at insert.
            continue;
        }
        map.take_attachment(entity, TypeId::of::<C>());
        if scene.is_valid(recorded) {
            scene.queue_free(recorded);
        }
    }
}

/// Frees the whole engine subtree of an entity that lost its primary node
/// (normally by despawning).
pub(crate) fn free_removed_primary_system(
    mut removed: RemovedComponents<PrimaryNode>,
    mut scene: ResMut<SceneTree>,
    mut map: ResMut<NodeEntityMap>,
) {
    for entity in removed.read() {
        if let Some(node) = map.primary_node(entity) {
            if scene.is_valid(node) {
                scene.queue_free(node);
            }
        }
        map.forget_entity(entity);
    }
}

/// Writes changed positions back onto the engine body node.
pub fn sync_body_translation_system(
    moved: Query<(&BodyNode, &Position), Changed<Position>>,
    mut scene: ResMut<SceneTree>,
) {
    for (body, position) in &moved {
        scene.set_translation(body.node(), position.0);
    }
}
