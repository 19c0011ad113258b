//! Node-wrapper components and their hydration.
//!
//! Each wrapper pairs one engine node class with a typed component. The
//! bridge inserts them during discovery and tears the engine object down
//! when they are removed; hydration systems then derive the gameplay state
//! each wrapper implies.

use bevy::prelude::{Added, Commands, Component, Entity, Query, RemovedComponents, Res, With};

use crate::components::{Health, LastIntent, Position, Speed};
use crate::constants::{DEFAULT_HEALTH, DEFAULT_SPEED, DEFAULT_WANDER_RADIUS};
use crate::registry::{ComponentKind, NodeComponent};
use crate::scene::{NodeClass, NodeId, SceneTree};
use crate::script::{ScriptCommandsExt, ScriptHost};
use crate::scripts::WanderScript;

/// Meta tag read off health-bar nodes at hydration.
pub const HEALTH_META_KEY: &str = "health";

/// Meta tag read off brain nodes at hydration.
pub const WANDER_RADIUS_META_KEY: &str = "wander_radius";

/// The engine node an entity was discovered from. Every bridged entity
/// carries exactly one; removing it frees the whole engine subtree.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrimaryNode(pub NodeId);

macro_rules! node_wrapper {
    ($(#[$meta:meta])* $name:ident, $class:ident, $kind:ident) => {
        $(#[$meta])*
        #[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
        pub struct $name(NodeId);

        impl NodeComponent for $name {
            const CLASS: NodeClass = NodeClass::$class;
            const KIND: ComponentKind = ComponentKind::$kind;

            fn from_node(node: NodeId) -> Self {
                Self(node)
            }

            fn node(&self) -> NodeId {
                self.0
            }
        }
    };
}

node_wrapper!(
    /// Physics body of an actor. Carries the actor's translation.
    BodyNode,
    Body,
    Singleton
);

node_wrapper!(
    /// Visual sprite of an actor.
    SpriteNode,
    Sprite,
    Singleton
);

node_wrapper!(
    /// Health display of an actor.
    HealthBarNode,
    HealthBar,
    Singleton
);

node_wrapper!(
    /// One collision trigger. Actors may carry any number, each mirrored as
    /// a child entity.
    TriggerNode,
    Trigger,
    Many
);

node_wrapper!(
    /// Behaviour marker. Hydration attaches a wander script to its owner.
    BrainNode,
    Brain,
    Singleton
);

/// Derives movement state for freshly mirrored bodies.
pub fn hydrate_bodies_system(
    scene: Res<SceneTree>,
    fresh: Query<(Entity, &BodyNode), Added<BodyNode>>,
    mut commands: Commands,
) {
    for (entity, body) in &fresh {
        let translation = scene.translation(body.node());
        commands.entity(entity).insert((
            Position(translation),
            Speed(DEFAULT_SPEED),
            LastIntent::default(),
        ));
    }
}

/// Derives a health pool for freshly mirrored health bars, sized by the
/// node's `health` tag when present.
pub fn hydrate_health_bars_system(
    scene: Res<SceneTree>,
    fresh: Query<(Entity, &HealthBarNode), Added<HealthBarNode>>,
    mut commands: Commands,
) {
    for (entity, bar) in &fresh {
        let max = scene
            .meta(bar.node(), HEALTH_META_KEY)
            .and_then(|tag| i32::try_from(tag).ok())
            .unwrap_or(DEFAULT_HEALTH);
        commands.entity(entity).insert(Health::full(max));
    }
}

/// Attaches a wander script to the owner of a freshly mirrored brain. The
/// entity id seeds the wander sequence so two brains never walk in step.
pub fn hydrate_brains_system(
    scene: Res<SceneTree>,
    fresh: Query<(Entity, &BrainNode), Added<BrainNode>>,
    mut commands: Commands,
) {
    for (entity, brain) in &fresh {
        #[expect(
            clippy::cast_precision_loss,
            reason = "wander radii are small integers"
        )]
        let radius = scene
            .meta(brain.node(), WANDER_RADIUS_META_KEY)
            .map_or(DEFAULT_WANDER_RADIUS, |tag| tag as f32);
        commands.attach_script(entity, WanderScript::new(radius, entity.to_bits()));
    }
}

/// The behaviour dies with its brain: when the brain wrapper goes, the
/// hosted script is detached and cancels at the flush.
pub fn cancel_brainless_scripts_system(
    mut removed: RemovedComponents<BrainNode>,
    brains: Query<(), With<BrainNode>>,
    hosts: Query<(), With<ScriptHost>>,
    mut commands: Commands,
) {
    for entity in removed.read() {
        // A removal followed by a fresh insert in the same tick is a
        // replacement; its own hydration re-attaches the script.
        if brains.get(entity).is_ok() {
            continue;
        }
        if hosts.get(entity).is_ok() {
            commands.entity(entity).remove::<ScriptHost>();
        }
    }
}
