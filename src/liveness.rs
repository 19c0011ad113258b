//! Advisory node ⇄ entity association.
//!
//! The ECS store stays authoritative for entity liveness and the scene tree
//! for node liveness; this registry only records which one mirrors which.
//! The node → entity direction is stashed as metadata on the engine object
//! itself (so it survives independently of this resource), the entity → node
//! direction and the per-entity attachment ledger live here.

use std::any::TypeId;

use bevy::prelude::{Entity, Resource};
use hashbrown::HashMap;

use crate::scene::{NodeId, SceneTree};

/// Metadata key under which the entity id is stashed on a node.
pub const ENTITY_META_KEY: &str = "entity";

/// Bidirectional association plus the attachment ledger used for teardown.
#[derive(Resource, Default, Debug)]
pub struct NodeEntityMap {
    primary: HashMap<Entity, NodeId>,
    attachments: HashMap<Entity, Vec<(TypeId, NodeId)>>,
}

impl NodeEntityMap {
    /// Associates `node` as the primary node of `entity`. Idempotent;
    /// overwrites any previous mapping for the node.
    pub fn associate(&mut self, scene: &mut SceneTree, node: NodeId, entity: Entity) {
        scene.set_meta(node, ENTITY_META_KEY, entity.to_bits());
        self.primary.insert(entity, node);
    }

    /// Entity associated with `node`, if any. The caller must still verify
    /// the entity is alive; absence is a normal result.
    #[must_use]
    pub fn lookup(scene: &SceneTree, node: NodeId) -> Option<Entity> {
        scene
            .meta(node, ENTITY_META_KEY)
            .and_then(Entity::try_from_bits)
    }

    /// Walks `node` and its ancestors until an associated entity is found.
    /// Supports nodes that are components of a parent entity rather than
    /// entities themselves.
    #[must_use]
    pub fn find_owning_entity(scene: &SceneTree, node: NodeId) -> Option<Entity> {
        let mut current = Some(node);
        while let Some(id) = current {
            if let Some(entity) = Self::lookup(scene, id) {
                return Some(entity);
            }
            current = scene.parent(id);
        }
        None
    }

    /// Primary node recorded for `entity`.
    #[must_use]
    pub fn primary_node(&self, entity: Entity) -> Option<NodeId> {
        self.primary.get(&entity).copied()
    }

    /// Records that `entity` currently owns `node` under the component type
    /// `type_id`. Replaces any previous record for that type.
    pub fn record_attachment(&mut self, entity: Entity, type_id: TypeId, node: NodeId) {
        let slots = self.attachments.entry(entity).or_default();
        if let Some(slot) = slots.iter_mut().find(|(t, _)| *t == type_id) {
            slot.1 = node;
        } else {
            slots.push((type_id, node));
        }
    }

    /// Node recorded for `(entity, type_id)`, if any.
    #[must_use]
    pub fn attachment(&self, entity: Entity, type_id: TypeId) -> Option<NodeId> {
        self.attachments
            .get(&entity)
            .and_then(|slots| slots.iter().find(|(t, _)| *t == type_id))
            .map(|(_, node)| *node)
    }

    /// Removes and returns the record for `(entity, type_id)`. Used by the
    /// teardown sweeps, which fire after the component value is gone.
    pub fn take_attachment(&mut self, entity: Entity, type_id: TypeId) -> Option<NodeId> {
        let slots = self.attachments.get_mut(&entity)?;
        let index = slots.iter().position(|(t, _)| *t == type_id)?;
        Some(slots.swap_remove(index).1)
    }

    /// Drops every record held for `entity`.
    pub fn forget_entity(&mut self, entity: Entity) {
        self.primary.remove(&entity);
        self.attachments.remove(&entity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::NodeClass;
    use rstest::rstest;

    #[rstest]
    fn lookup_reads_the_metadata_tag() {
        let mut scene = SceneTree::default();
        let mut map = NodeEntityMap::default();
        let root = scene.root();
        let actor = scene.spawn_child(root, NodeClass::Actor, "hero");
        let entity = Entity::from_raw_u32(7).unwrap();

        assert_eq!(NodeEntityMap::lookup(&scene, actor), None);
        map.associate(&mut scene, actor, entity);
        assert_eq!(NodeEntityMap::lookup(&scene, actor), Some(entity));
        assert_eq!(map.primary_node(entity), Some(actor));
    }

    #[rstest]
    fn find_owning_entity_walks_ancestors() {
        let mut scene = SceneTree::default();
        let mut map = NodeEntityMap::default();
        let root = scene.root();
        let actor = scene.spawn_child(root, NodeClass::Actor, "hero");
        let body = scene.spawn_child(actor, NodeClass::Body, "body");
        let decoration = scene.spawn_child(body, NodeClass::Plain, "shine");
        let entity = Entity::from_raw_u32(3).unwrap();
        map.associate(&mut scene, actor, entity);

        assert_eq!(
            NodeEntityMap::find_owning_entity(&scene, decoration),
            Some(entity)
        );
        assert_eq!(NodeEntityMap::find_owning_entity(&scene, root), None);
    }

    #[rstest]
    fn attachment_ledger_replaces_per_type() {
        let mut map = NodeEntityMap::default();
        let mut scene = SceneTree::default();
        let entity = Entity::from_raw_u32(1).unwrap();
        let first = scene.spawn(NodeClass::Sprite, "a");
        let second = scene.spawn(NodeClass::Sprite, "b");
        let type_id = TypeId::of::<u32>();

        map.record_attachment(entity, type_id, first);
        map.record_attachment(entity, type_id, second);
        assert_eq!(map.attachment(entity, type_id), Some(second));
        assert_eq!(map.take_attachment(entity, type_id), Some(second));
        assert_eq!(map.take_attachment(entity, type_id), None);
    }
}
