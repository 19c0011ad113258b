//! Scene → ECS discovery.
//!
//! Drains the tree's pending notifications once per tick, before any
//! gameplay system runs. A node entering the tree is bridged according to
//! its class: entity roots spawn a fresh entity, component classes land on
//! the owning entity found by walking ancestors, and everything else is
//! recursed into unchanged. Exits tear the ECS side down symmetrically.

use bevy::prelude::{ChildOf, Entity, Mut, World};
use log::debug;

use super::BridgeIssue;
use crate::liveness::NodeEntityMap;
use crate::nodes::PrimaryNode;
use crate::registry::{dispatch_get, dispatch_remove, dispatch_set, ComponentKind, ComponentRegistry};
use crate::scene::{NodeClass, NodeId, SceneEvent, SceneTree};

/// Drains and applies this tick's scene notifications. Exclusive: discovery
/// must observe the world between two system batches, never during one.
pub fn pump_scene_events_system(world: &mut World) {
    let events = world.resource_mut::<SceneTree>().drain_events();
    for event in events {
        match event {
            SceneEvent::ChildEntered { node, .. } => handle_entered(world, node),
            SceneEvent::Exiting {
                node,
                class,
                parent,
                entity_tag,
            } => handle_exiting(world, node, class, parent, entity_tag),
        }
    }
}

fn handle_entered(world: &mut World, node: NodeId) {
    // The node may have left the tree again before the pump ran.
    {
        let scene = world.resource::<SceneTree>();
        if !scene.is_valid(node) || !scene.in_tree(node) {
            return;
        }
    }
    let owner = {
        let scene = world.resource::<SceneTree>();
        scene
            .parent(node)
            .and_then(|parent| NodeEntityMap::find_owning_entity(scene, parent))
            .filter(|&entity| world.get_entity(entity).is_ok())
    };
    attach_node(world, node, owner);
}

/// Bridges `node` and recurses into its children. `owner` is the entity the
/// node's state belongs to, when one exists above it.
fn attach_node(world: &mut World, node: NodeId, owner: Option<Entity>) {
    let Some(class) = world.resource::<SceneTree>().class(node) else {
        return;
    };

    if class.is_entity_root() {
        let entity = bridged_entity(world, node).unwrap_or_else(|| create_entity(world, node));
        attach_children(world, node, Some(entity));
        return;
    }

    let Some(owner) = owner else {
        // Plain structure outside any entity; entity roots deeper down are
        // still picked up by the recursion.
        attach_children(world, node, None);
        return;
    };

    match world.resource::<ComponentRegistry>().kind(class) {
        ComponentKind::None => attach_children(world, node, Some(owner)),
        ComponentKind::Singleton => {
            let current = dispatch_get(world, owner, class).unwrap_or(None);
            if current != Some(node) {
                if let Err(err) = dispatch_set(world, owner, class, node) {
                    world.trigger(BridgeIssue::new("discovery", err.to_string()));
                }
            }
            attach_children(world, node, Some(owner));
        }
        ComponentKind::Many => {
            let child = bridged_entity(world, node)
                .unwrap_or_else(|| create_child_entity(world, node, class, owner));
            attach_children(world, node, Some(child));
        }
    }
}

fn attach_children(world: &mut World, node: NodeId, owner: Option<Entity>) {
    let children = world.resource::<SceneTree>().children(node);
    for child in children {
        attach_node(world, child, owner);
    }
}

/// The live entity already bridged to `node`, if any. A stale tag (entity
/// despawned since) reads as unbridged.
fn bridged_entity(world: &World, node: NodeId) -> Option<Entity> {
    NodeEntityMap::lookup(world.resource::<SceneTree>(), node)
        .filter(|&entity| world.get_entity(entity).is_ok())
}

fn create_entity(world: &mut World, node: NodeId) -> Entity {
    let entity = world.spawn(PrimaryNode(node)).id();
    world.resource_scope(|world, mut map: Mut<NodeEntityMap>| {
        let mut scene = world.resource_mut::<SceneTree>();
        map.associate(&mut scene, node, entity);
    });
    debug!("bridged {node:?} as {entity:?}");
    entity
}

/// Spawns the child entity mirroring one instance of a "many" class node.
fn create_child_entity(world: &mut World, node: NodeId, class: NodeClass, owner: Entity) -> Entity {
    let child = world.spawn((PrimaryNode(node), ChildOf(owner))).id();
    world.resource_scope(|world, mut map: Mut<NodeEntityMap>| {
        let mut scene = world.resource_mut::<SceneTree>();
        map.associate(&mut scene, node, child);
    });
    if let Err(err) = dispatch_set(world, child, class, node) {
        world.trigger(BridgeIssue::new("discovery", err.to_string()));
    }
    debug!("bridged {node:?} as {child:?} under {owner:?}");
    child
}

fn handle_exiting(
    world: &mut World,
    node: NodeId,
    class: NodeClass,
    parent: Option<NodeId>,
    entity_tag: Option<u64>,
) {
    // A tagged node mirrors a whole entity; its exit despawns the entity
    // (and, through the child-of relationship, any trigger children).
    if let Some(bits) = entity_tag {
        if let Some(entity) = Entity::try_from_bits(bits) {
            if world.get_entity(entity).is_ok() {
                debug!("{node:?} left the tree, despawning {entity:?}");
                world.despawn(entity);
                world.resource_mut::<NodeEntityMap>().forget_entity(entity);
            }
        }
        return;
    }

    // Untagged: at most a singleton component of the owning entity.
    let Some(parent) = parent else {
        return;
    };
    let owner = {
        let scene = world.resource::<SceneTree>();
        NodeEntityMap::find_owning_entity(scene, parent)
    };
    let Some(owner) = owner else {
        return;
    };
    if world.get_entity(owner).is_err() {
        return;
    }
    if world.resource::<ComponentRegistry>().kind(class) == ComponentKind::Singleton
        && dispatch_get(world, owner, class) == Ok(Some(node))
    {
        debug!("{node:?} left the tree, clearing its component on {owner:?}");
        if let Err(err) = dispatch_remove(world, owner, class) {
            world.trigger(BridgeIssue::new("teardown", err.to_string()));
        }
    }
}
