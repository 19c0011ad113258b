//! A small scripted scene for the demo binary and smoke tests.

use bevy::prelude::World;
use bevy_math::Vec2;

use crate::components::{Obstacle, Position};
use crate::liveness::NodeEntityMap;
use crate::nodes::{HEALTH_META_KEY, WANDER_RADIUS_META_KEY};
use crate::scene::{NodeClass, NodeId, SceneTree};
use crate::script::attach_script;
use crate::scripts::PatrolScript;

/// Node handles of the demo actors.
pub struct DemoScene {
    /// Patrolling actor.
    pub hero: NodeId,
    /// Wandering actor.
    pub raider: NodeId,
}

/// Patrol loop walked by the demo hero.
pub const HERO_PATROL: [Vec2; 3] = [
    Vec2::new(-200.0, 0.0),
    Vec2::new(200.0, 0.0),
    Vec2::new(0.0, -150.0),
];

/// Builds the demo actors in the tree. Discovery bridges them at the next
/// tick's pump.
pub fn build_demo_scene(scene: &mut SceneTree) -> DemoScene {
    let root = scene.root();

    let hero = scene.spawn_child(root, NodeClass::Actor, "hero");
    let hero_body = scene.spawn_child(hero, NodeClass::Body, "body");
    scene.set_translation(hero_body, Vec2::new(-200.0, 0.0));
    scene.spawn_child(hero, NodeClass::Sprite, "sprite");
    let hero_bar = scene.spawn_child(hero, NodeClass::HealthBar, "health");
    scene.set_meta(hero_bar, HEALTH_META_KEY, 20);
    scene.spawn_child(hero, NodeClass::Trigger, "hurtbox");

    let raider = scene.spawn_child(root, NodeClass::Actor, "raider");
    let raider_body = scene.spawn_child(raider, NodeClass::Body, "body");
    scene.set_translation(raider_body, Vec2::new(250.0, 100.0));
    scene.spawn_child(raider, NodeClass::Sprite, "sprite");
    scene.spawn_child(raider, NodeClass::HealthBar, "health");
    let brain = scene.spawn_child(raider, NodeClass::Brain, "brain");
    scene.set_meta(brain, WANDER_RADIUS_META_KEY, 150);

    DemoScene { hero, raider }
}

/// Builds the demo scene plus a free-standing obstacle in the middle of
/// the hero's patrol route.
pub fn setup_demo(world: &mut World) -> DemoScene {
    let handles = {
        let mut scene = world.resource_mut::<SceneTree>();
        build_demo_scene(&mut scene)
    };
    world.spawn((Position(Vec2::new(0.0, 120.0)), Obstacle { radius: 40.0 }));
    handles
}

/// Attaches the patrol behaviour to the entity bridged from `node`.
/// Only meaningful after discovery has run, i.e. after one update.
pub fn attach_hero_patrol(world: &mut World, node: NodeId) -> bool {
    let entity = NodeEntityMap::lookup(world.resource::<SceneTree>(), node);
    match entity {
        Some(entity) if world.get_entity(entity).is_ok() => {
            attach_script(world, entity, PatrolScript::looping(HERO_PATROL.to_vec()));
            true
        }
        _ => false,
    }
}
