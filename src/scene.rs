//! In-memory stand-in for the host engine's scene tree.
//!
//! The bridge consumes exactly the engine surface described here: node
//! handles, parent/child structure, child-entered and exiting
//! notifications, per-object metadata tags, and deferred frees. Rendering,
//! physics and input stay outside this crate; nodes carry only the state the
//! gameplay layer mirrors (a class discriminant, tags, and a translation).

use std::collections::VecDeque;

use bevy::prelude::Resource;
use bevy_math::Vec2;
use hashbrown::HashMap;
use serde::Serialize;

/// Handle to a scene node. Identifiers are never reused, so a stale handle
/// can always be detected with [`SceneTree::is_valid`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct NodeId(u64);

impl NodeId {
    /// Raw identifier, mainly for logging.
    #[must_use]
    pub const fn into_inner(self) -> u64 {
        self.0
    }
}

/// Concrete node class, the runtime type discriminant the dispatch registry
/// is keyed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum NodeClass {
    /// Pure structure or decoration; never mapped to a component.
    Plain,
    /// Independent entity root. Discovery spawns a fresh entity for it.
    Actor,
    /// Physics body. Mirrored as a singleton component carrying position.
    Body,
    /// Visual sprite. Singleton component.
    Sprite,
    /// Health display. Singleton component.
    HealthBar,
    /// Collision trigger. A "many" class: each instance becomes a child
    /// entity of the owning actor.
    Trigger,
    /// Behaviour marker. Singleton component that hosts a script.
    Brain,
}

impl NodeClass {
    /// Whether discovery treats nodes of this class as independent entity
    /// roots.
    #[must_use]
    pub const fn is_entity_root(self) -> bool {
        matches!(self, Self::Actor)
    }
}

/// Notification emitted by the tree, consumed once per tick by the bridge.
///
/// `Exiting` carries a snapshot of the node's identity because the record
/// itself may already be gone by the time the event is pumped.
#[derive(Debug, Clone, PartialEq)]
pub enum SceneEvent {
    /// A node entered the tree under `parent`.
    ChildEntered {
        /// Parent the node was attached beneath.
        parent: NodeId,
        /// The node that entered.
        node: NodeId,
    },
    /// A node is leaving the tree (explicit removal or a queued free).
    Exiting {
        /// The departing node.
        node: NodeId,
        /// Class of the departing node.
        class: NodeClass,
        /// Parent at the moment of departure, if any.
        parent: Option<NodeId>,
        /// Value of the `entity` metadata tag, if one was stashed.
        entity_tag: Option<u64>,
    },
}

#[derive(Debug)]
struct SceneNode {
    class: NodeClass,
    name: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    meta: HashMap<String, u64>,
    translation: Vec2,
    queued_free: bool,
}

impl SceneNode {
    fn new(class: NodeClass, name: &str) -> Self {
        Self {
            class,
            name: name.to_owned(),
            parent: None,
            children: Vec::new(),
            meta: HashMap::new(),
            translation: Vec2::ZERO,
            queued_free: false,
        }
    }
}

/// The node tree. One instance per simulation world, stored as a resource.
#[derive(Resource, Debug)]
pub struct SceneTree {
    nodes: HashMap<NodeId, SceneNode>,
    root: NodeId,
    next_id: u64,
    events: VecDeque<SceneEvent>,
    free_queue: Vec<NodeId>,
    /// How often each node has been torn down. Frees are expected to happen
    /// exactly once; the counter makes double-free bugs observable in tests.
    freed: HashMap<NodeId, u32>,
}

impl Default for SceneTree {
    fn default() -> Self {
        let root = NodeId(1);
        let mut nodes = HashMap::new();
        nodes.insert(root, SceneNode::new(NodeClass::Plain, "root"));
        Self {
            nodes,
            root,
            next_id: 2,
            events: VecDeque::new(),
            free_queue: Vec::new(),
            freed: HashMap::new(),
        }
    }
}

impl SceneTree {
    /// Handle of the tree root.
    #[must_use]
    pub const fn root(&self) -> NodeId {
        self.root
    }

    /// Creates a detached node. It enters the tree when attached with
    /// [`SceneTree::add_child`].
    pub fn spawn(&mut self, class: NodeClass, name: &str) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, SceneNode::new(class, name));
        id
    }

    /// Creates a node and immediately attaches it under `parent`.
    pub fn spawn_child(&mut self, parent: NodeId, class: NodeClass, name: &str) -> NodeId {
        let id = self.spawn(class, name);
        self.add_child(parent, id);
        id
    }

    /// Attaches `child` under `parent`. Emits [`SceneEvent::ChildEntered`]
    /// when the child thereby enters the tree. Attaching an invalid handle
    /// or forming a cycle is ignored.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) {
        if parent == child || !self.nodes.contains_key(&parent) || self.is_ancestor(child, parent)
        {
            return;
        }
        let entering = self.in_tree(parent);
        if let Some(node) = self.nodes.get_mut(&child) {
            if node.parent.is_some() {
                return;
            }
            node.parent = Some(parent);
        } else {
            return;
        }
        if let Some(p) = self.nodes.get_mut(&parent) {
            p.children.push(child);
        }
        if entering {
            self.events
                .push_back(SceneEvent::ChildEntered { parent, node: child });
        }
    }

    /// Detaches `child` from its parent without freeing it. Emits
    /// [`SceneEvent::Exiting`] for the node and its subtree if it was in the
    /// tree.
    pub fn remove_child(&mut self, child: NodeId) {
        let was_in_tree = self.in_tree(child);
        if was_in_tree {
            self.emit_exiting_subtree(child);
        }
        self.detach(child);
    }

    /// Marks a node for freeing at the end of the current tick. Idempotent;
    /// invalid handles are ignored.
    pub fn queue_free(&mut self, node: NodeId) {
        if let Some(record) = self.nodes.get_mut(&node) {
            if !record.queued_free {
                record.queued_free = true;
                self.free_queue.push(node);
            }
        }
    }

    /// Frees every queued node and its descendants, emitting exit events.
    /// Called once per tick after the completion flush.
    pub fn apply_queued_free(&mut self) {
        let queue = std::mem::take(&mut self.free_queue);
        for node in queue {
            if !self.nodes.contains_key(&node) {
                continue;
            }
            if self.in_tree(node) {
                self.emit_exiting_subtree(node);
            }
            self.detach(node);
            self.free_subtree(node);
        }
    }

    /// Whether the handle refers to a live node.
    #[must_use]
    pub fn is_valid(&self, node: NodeId) -> bool {
        self.nodes.contains_key(&node)
    }

    /// Whether the node is reachable from the root.
    #[must_use]
    pub fn in_tree(&self, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == self.root {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// Parent handle, if the node is valid and attached.
    #[must_use]
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes.get(&node).and_then(|n| n.parent)
    }

    /// Child handles in attach order. Empty for invalid handles.
    #[must_use]
    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        self.nodes
            .get(&node)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    /// Node class, if the handle is valid.
    #[must_use]
    pub fn class(&self, node: NodeId) -> Option<NodeClass> {
        self.nodes.get(&node).map(|n| n.class)
    }

    /// Node name, if the handle is valid.
    #[must_use]
    pub fn name(&self, node: NodeId) -> Option<&str> {
        self.nodes.get(&node).map(|n| n.name.as_str())
    }

    /// Stashes an arbitrary tag on the node, engine metadata style.
    pub fn set_meta(&mut self, node: NodeId, key: &str, value: u64) {
        if let Some(record) = self.nodes.get_mut(&node) {
            record.meta.insert(key.to_owned(), value);
        }
    }

    /// Reads a tag previously stashed with [`SceneTree::set_meta`].
    #[must_use]
    pub fn meta(&self, node: NodeId, key: &str) -> Option<u64> {
        self.nodes.get(&node).and_then(|n| n.meta.get(key).copied())
    }

    /// Removes a tag, if present.
    pub fn clear_meta(&mut self, node: NodeId, key: &str) {
        if let Some(record) = self.nodes.get_mut(&node) {
            record.meta.remove(key);
        }
    }

    /// Node translation in world units.
    #[must_use]
    pub fn translation(&self, node: NodeId) -> Vec2 {
        self.nodes
            .get(&node)
            .map(|n| n.translation)
            .unwrap_or(Vec2::ZERO)
    }

    /// Moves the node. The bridge uses this to mirror ECS positions back
    /// onto the engine object.
    pub fn set_translation(&mut self, node: NodeId, translation: Vec2) {
        if let Some(record) = self.nodes.get_mut(&node) {
            record.translation = translation;
        }
    }

    /// How many times the node has been freed. Anything above one is a bug.
    #[must_use]
    pub fn freed_count(&self, node: NodeId) -> u32 {
        self.freed.get(&node).copied().unwrap_or(0)
    }

    /// Drains the pending notifications for this tick.
    pub fn drain_events(&mut self) -> Vec<SceneEvent> {
        self.events.drain(..).collect()
    }

    fn is_ancestor(&self, candidate: NodeId, of: NodeId) -> bool {
        let mut current = self.parent(of);
        while let Some(id) = current {
            if id == candidate {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    fn detach(&mut self, node: NodeId) {
        let parent = match self.nodes.get_mut(&node) {
            Some(record) => record.parent.take(),
            None => return,
        };
        if let Some(p) = parent {
            if let Some(record) = self.nodes.get_mut(&p) {
                record.children.retain(|&c| c != node);
            }
        }
    }

    /// Emits `Exiting` for `node` and its subtree, parent before children.
    fn emit_exiting_subtree(&mut self, node: NodeId) {
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            let Some(record) = self.nodes.get(&id) else {
                continue;
            };
            self.events.push_back(SceneEvent::Exiting {
                node: id,
                class: record.class,
                parent: record.parent,
                entity_tag: record.meta.get(crate::liveness::ENTITY_META_KEY).copied(),
            });
            // Reverse so the left-most child is processed first.
            for &child in record.children.iter().rev() {
                stack.push(child);
            }
        }
    }

    fn free_subtree(&mut self, node: NodeId) {
        let mut stack = vec![node];
        while let Some(id) = stack.pop() {
            if let Some(record) = self.nodes.remove(&id) {
                stack.extend(record.children);
                *self.freed.entry(id).or_insert(0) += 1;
            }
        }
    }
}
