//! Runtime-type component dispatch.
//!
//! The engine reports nodes by their concrete class at runtime; gameplay
//! components are compile-time types. This registry bridges the two with an
//! explicit table: each registered [`NodeComponent`] contributes a vtable of
//! monomorphised function pointers for "set", "get" and "remove", keyed by
//! its [`NodeClass`]. The table is built once at startup, so dispatch is a
//! single hash lookup afterwards.

use std::any::TypeId;

use bevy::prelude::{Component, Entity, Resource, World};
use hashbrown::HashMap;
use log::debug;
use thiserror::Error;

use crate::liveness::NodeEntityMap;
use crate::scene::{NodeClass, NodeId, SceneTree};

/// Cardinality of a node component on an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentKind {
    /// The class has no component mapping; its nodes are plain structure.
    None,
    /// At most one live instance per entity. A second attach replaces and
    /// frees the first.
    Singleton,
    /// Unbounded instances per entity, each modelled as a child entity.
    Many,
}

/// A component that wraps a scene node of a fixed class.
pub trait NodeComponent: Component + Sized {
    /// Node class this component mirrors.
    const CLASS: NodeClass;
    /// Cardinality of the component on an entity.
    const KIND: ComponentKind;

    /// Wraps a node handle.
    fn from_node(node: NodeId) -> Self;

    /// The wrapped node handle.
    fn node(&self) -> NodeId;
}

/// Dispatch failure: the runtime class has no registered mapping. Treated
/// as a programming error by callers; the operation is aborted and logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// No [`NodeComponent`] was registered for the class.
    #[error("no component mapping registered for node class {0:?}")]
    UnknownClass(NodeClass),
}

/// One registered class: cardinality plus the typed operation thunks.
#[derive(Clone, Copy)]
pub struct DispatchEntry {
    kind: ComponentKind,
    type_id: TypeId,
    set: fn(&mut World, Entity, NodeId),
    get: fn(&World, Entity) -> Option<NodeId>,
    remove: fn(&mut World, Entity),
}

impl DispatchEntry {
    /// Cardinality of the mapped component.
    #[must_use]
    pub const fn kind(&self) -> ComponentKind {
        self.kind
    }

    /// `TypeId` of the mapped component type.
    #[must_use]
    pub const fn type_id(&self) -> TypeId {
        self.type_id
    }
}

/// The dispatch table. Populated once during plugin build via
/// [`ComponentRegistry::register`]; read-only afterwards.
#[derive(Resource, Default)]
pub struct ComponentRegistry {
    entries: HashMap<NodeClass, DispatchEntry>,
}

impl ComponentRegistry {
    /// Registers the mapping for `C::CLASS`. Re-registering a class
    /// replaces the previous mapping.
    pub fn register<C: NodeComponent>(&mut self) {
        self.entries.insert(
            C::CLASS,
            DispatchEntry {
                kind: C::KIND,
                type_id: TypeId::of::<C>(),
                set: set_node::<C>,
                get: get_node::<C>,
                remove: remove_node::<C>,
            },
        );
    }

    /// The entry for `class`, or [`DispatchError::UnknownClass`].
    pub fn entry(&self, class: NodeClass) -> Result<DispatchEntry, DispatchError> {
        self.entries
            .get(&class)
            .copied()
            .ok_or(DispatchError::UnknownClass(class))
    }

    /// Cardinality table lookup; unregistered classes are plain structure.
    #[must_use]
    pub fn kind(&self, class: NodeClass) -> ComponentKind {
        self.entries
            .get(&class)
            .map_or(ComponentKind::None, |e| e.kind)
    }
}

/// Sets the component mapped to `class` on `entity`, wrapping `node`.
///
/// For singleton classes the previously wrapped engine object, if any and
/// different, is queued for teardown before the insert, so no system can
/// observe two live instances.
///
/// # Errors
/// [`DispatchError::UnknownClass`] when the class has no mapping.
pub fn dispatch_set(
    world: &mut World,
    entity: Entity,
    class: NodeClass,
    node: NodeId,
) -> Result<(), DispatchError> {
    let entry = world.resource::<ComponentRegistry>().entry(class)?;
    (entry.set)(world, entity, node);
    Ok(())
}

/// Node currently wrapped by the component mapped to `class` on `entity`.
///
/// # Errors
/// [`DispatchError::UnknownClass`] when the class has no mapping.
pub fn dispatch_get(
    world: &World,
    entity: Entity,
    class: NodeClass,
) -> Result<Option<NodeId>, DispatchError> {
    let entry = world.resource::<ComponentRegistry>().entry(class)?;
    Ok((entry.get)(world, entity))
}

/// Removes the component mapped to `class` from `entity`.
///
/// # Errors
/// [`DispatchError::UnknownClass`] when the class has no mapping.
pub fn dispatch_remove(
    world: &mut World,
    entity: Entity,
    class: NodeClass,
) -> Result<(), DispatchError> {
    let entry = world.resource::<ComponentRegistry>().entry(class)?;
    (entry.remove)(world, entity);
    Ok(())
}

fn set_node<C: NodeComponent>(world: &mut World, entity: Entity, node: NodeId) {
    let Ok(entry) = world.get_entity(entity) else {
        // Benign teardown race; nothing may be recorded for a dead entity.
        debug!("set of {node:?} skipped, entity {entity:?} is gone");
        return;
    };
    let previous = entry.get::<C>().map(C::node);
    if matches!(C::KIND, ComponentKind::Singleton) {
        if let Some(old) = previous {
            if old != node {
                // The replaced engine object is torn down here, before the
                // insert, keeping the at-most-one invariant airtight.
                world.resource_mut::<SceneTree>().queue_free(old);
                debug!("replacing {old:?} with {node:?} on {entity:?}");
            }
        }
    }
    world
        .resource_mut::<NodeEntityMap>()
        .record_attachment(entity, TypeId::of::<C>(), node);
    if let Ok(mut entry) = world.get_entity_mut(entity) {
        entry.insert(C::from_node(node));
    }
}

fn get_node<C: NodeComponent>(world: &World, entity: Entity) -> Option<NodeId> {
    world.get::<C>(entity).map(C::node)
}

fn remove_node<C: NodeComponent>(world: &mut World, entity: Entity) {
    if let Ok(mut entry) = world.get_entity_mut(entity) {
        entry.remove::<C>();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[derive(Component)]
    struct SpriteRef(NodeId);

    impl NodeComponent for SpriteRef {
        const CLASS: NodeClass = NodeClass::Sprite;
        const KIND: ComponentKind = ComponentKind::Singleton;

        fn from_node(node: NodeId) -> Self {
            Self(node)
        }

        fn node(&self) -> NodeId {
            self.0
        }
    }

    fn world_with_registry() -> World {
        let mut world = World::new();
        world.init_resource::<SceneTree>();
        world.init_resource::<NodeEntityMap>();
        let mut registry = ComponentRegistry::default();
        registry.register::<SpriteRef>();
        world.insert_resource(registry);
        world
    }

    #[rstest]
    fn unknown_class_is_an_error() {
        let world = world_with_registry();
        let registry = world.resource::<ComponentRegistry>();
        assert_eq!(
            registry.entry(NodeClass::Trigger).map(|e| e.kind()),
            Err(DispatchError::UnknownClass(NodeClass::Trigger))
        );
        assert_eq!(registry.kind(NodeClass::Trigger), ComponentKind::None);
    }

    #[rstest]
    fn set_then_get_round_trips_by_runtime_class() {
        let mut world = world_with_registry();
        let node = world
            .resource_mut::<SceneTree>()
            .spawn(NodeClass::Sprite, "sprite");
        let entity = world.spawn_empty().id();

        dispatch_set(&mut world, entity, NodeClass::Sprite, node).expect("registered class");
        assert_eq!(
            dispatch_get(&world, entity, NodeClass::Sprite).expect("registered class"),
            Some(node)
        );

        dispatch_remove(&mut world, entity, NodeClass::Sprite).expect("registered class");
        assert_eq!(
            dispatch_get(&world, entity, NodeClass::Sprite).expect("registered class"),
            None
        );
    }

    #[rstest]
    fn set_on_a_dead_entity_records_nothing() {
        let mut world = world_with_registry();
        let node = world
            .resource_mut::<SceneTree>()
            .spawn(NodeClass::Sprite, "sprite");
        let entity = world.spawn_empty().id();
        world.despawn(entity);

        dispatch_set(&mut world, entity, NodeClass::Sprite, node).expect("registered class");

        // No ledger entry may outlive the entity; only forget_entity would
        // ever clean one up.
        let map = world.resource::<NodeEntityMap>();
        assert_eq!(map.attachment(entity, TypeId::of::<SpriteRef>()), None);
    }

    #[rstest]
    fn singleton_replacement_frees_the_previous_node() {
        let mut world = world_with_registry();
        let (first, second) = {
            let mut scene = world.resource_mut::<SceneTree>();
            (
                scene.spawn(NodeClass::Sprite, "first"),
                scene.spawn(NodeClass::Sprite, "second"),
            )
        };
        let entity = world.spawn_empty().id();

        dispatch_set(&mut world, entity, NodeClass::Sprite, first).expect("registered class");
        dispatch_set(&mut world, entity, NodeClass::Sprite, second).expect("registered class");

        assert_eq!(
            world.get::<SpriteRef>(entity).map(SpriteRef::node),
            Some(second)
        );
        let mut scene = world.resource_mut::<SceneTree>();
        scene.apply_queued_free();
        assert_eq!(scene.freed_count(first), 1);
        assert!(scene.is_valid(second));
    }
}
