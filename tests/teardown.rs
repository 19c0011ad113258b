//! Symmetric teardown across the bridge.

use std::any::TypeId;

use bevy_math::Vec2;
use test_utils::{build_app, run_ticks, CapturedCompletions, CapturedFinishes};

use tandem::components::Position;
use tandem::liveness::NodeEntityMap;
use tandem::nodes::{SpriteNode, TriggerNode};
use tandem::registry::NodeComponent;
use tandem::scene::{NodeClass, NodeId, SceneTree};
use tandem::systems::timer::TimerCommand;
use tandem::{
    attach_script, CommandFailure, CommandLedger, Script, ScriptCx, ScriptError, ScriptHost, Step,
    Wake,
};

struct SleeperScript;

impl Script for SleeperScript {
    fn resume(&mut self, cx: &mut ScriptCx<'_>, _wake: Wake) -> Result<Step, ScriptError> {
        let ticket = cx.issue(|ticket| TimerCommand::for_ticks(ticket, 10_000));
        Ok(Step::AwaitCommand(ticket))
    }
}

fn bridged_actor(app: &mut bevy::prelude::App) -> (NodeId, NodeId, bevy::prelude::Entity) {
    let (actor, sprite) = {
        let mut scene = app.world_mut().resource_mut::<SceneTree>();
        let root = scene.root();
        let actor = scene.spawn_child(root, NodeClass::Actor, "doomed");
        let body = scene.spawn_child(actor, NodeClass::Body, "body");
        scene.set_translation(body, Vec2::ZERO);
        let sprite = scene.spawn_child(actor, NodeClass::Sprite, "sprite");
        (actor, sprite)
    };
    app.update();
    let entity = {
        let scene = app.world().resource::<SceneTree>();
        NodeEntityMap::lookup(scene, actor).expect("actor is bridged")
    };
    (actor, sprite, entity)
}

#[test]
fn freeing_the_actor_node_despawns_the_entity_and_settles_its_waiters() {
    let mut app = build_app();
    let (actor, _, entity) = bridged_actor(&mut app);

    attach_script(app.world_mut(), entity, SleeperScript);
    let ticket = app
        .world_mut()
        .resource_mut::<CommandLedger>()
        .begin(entity, TypeId::of::<Position>());
    app.update();

    app.world_mut()
        .resource_mut::<SceneTree>()
        .queue_free(actor);
    // Tick A: the free applies at end of tick. Tick B: the exit event is
    // pumped and the entity despawned. Tick C: sweeps and the flush settle
    // the command and the script.
    run_ticks(&mut app, 3);

    assert!(app.world().get_entity(entity).is_err());

    let finishes = &app.world().resource::<CapturedFinishes>().0;
    assert_eq!(finishes.len(), 1);
    assert_eq!(finishes[0].outcome, Err(ScriptError::EntityDead));

    // The script's own timer failed as removed once the entity died.
    let completions = &app.world().resource::<CapturedCompletions>().0;
    assert!(completions
        .iter()
        .any(|(_, outcome)| *outcome == Err(CommandFailure::Removed)));

    // The dangling manual ticket is still running; it was never tied to a
    // component. It must not have been delivered.
    assert!(app.world().resource::<CommandLedger>().is_running(ticket));
}

#[test]
fn despawning_the_entity_frees_its_whole_subtree_once() {
    let mut app = build_app();
    let (actor, sprite, entity) = bridged_actor(&mut app);

    app.world_mut().despawn(entity);
    run_ticks(&mut app, 3);

    let scene = app.world().resource::<SceneTree>();
    assert!(!scene.is_valid(actor));
    assert!(!scene.is_valid(sprite));
    assert_eq!(scene.freed_count(actor), 1);
    assert_eq!(scene.freed_count(sprite), 1);
}

#[test]
fn freeing_one_trigger_leaves_its_sibling_bridged() {
    let mut app = build_app();
    let (actor, first, second) = {
        let mut scene = app.world_mut().resource_mut::<SceneTree>();
        let root = scene.root();
        let actor = scene.spawn_child(root, NodeClass::Actor, "hero");
        let first = scene.spawn_child(actor, NodeClass::Trigger, "hurtbox");
        let second = scene.spawn_child(actor, NodeClass::Trigger, "sensor");
        (actor, first, second)
    };
    app.update();
    let (owner, first_child, second_child) = {
        let scene = app.world().resource::<SceneTree>();
        (
            NodeEntityMap::lookup(scene, actor).expect("actor is bridged"),
            NodeEntityMap::lookup(scene, first).expect("first trigger is bridged"),
            NodeEntityMap::lookup(scene, second).expect("second trigger is bridged"),
        )
    };

    app.world_mut().resource_mut::<SceneTree>().queue_free(first);
    run_ticks(&mut app, 2);

    let world = app.world();
    assert!(world.get_entity(first_child).is_err());
    // The sibling instance and its owner are untouched.
    assert!(world.get_entity(owner).is_ok());
    assert_eq!(
        world.get::<TriggerNode>(second_child).map(TriggerNode::node),
        Some(second)
    );
    let scene = world.resource::<SceneTree>();
    assert!(scene.is_valid(second));
    assert_eq!(scene.freed_count(second), 0);
    assert_eq!(scene.freed_count(first), 1);
}

#[test]
fn detaching_the_brain_node_cancels_its_behaviour() {
    let mut app = build_app();
    let (actor, brain) = {
        let mut scene = app.world_mut().resource_mut::<SceneTree>();
        let root = scene.root();
        let actor = scene.spawn_child(root, NodeClass::Actor, "roamer");
        let body = scene.spawn_child(actor, NodeClass::Body, "body");
        scene.set_translation(body, Vec2::ZERO);
        let brain = scene.spawn_child(actor, NodeClass::Brain, "brain");
        (actor, brain)
    };
    app.update();
    let entity = {
        let scene = app.world().resource::<SceneTree>();
        NodeEntityMap::lookup(scene, actor).expect("actor is bridged")
    };
    assert!(app.world().get::<ScriptHost>(entity).is_some());

    app.world_mut()
        .resource_mut::<SceneTree>()
        .remove_child(brain);
    run_ticks(&mut app, 2);

    // The actor lives on, but its behaviour died with the brain.
    assert!(app.world().get_entity(entity).is_ok());
    assert!(app.world().get::<ScriptHost>(entity).is_none());
    let finishes = &app.world().resource::<CapturedFinishes>().0;
    assert!(finishes
        .iter()
        .any(|finish| finish.entity == entity
            && finish.outcome == Err(ScriptError::ScriptRemoved)));
}

#[test]
fn an_engine_side_node_exit_clears_the_mirrored_component() {
    let mut app = build_app();
    let (_, sprite, entity) = bridged_actor(&mut app);

    app.world_mut()
        .resource_mut::<SceneTree>()
        .remove_child(sprite);
    run_ticks(&mut app, 2);

    assert!(app.world().get::<SpriteNode>(entity).is_none());
    // The detached node is ownerless now; the bridge reclaims it.
    let scene = app.world().resource::<SceneTree>();
    assert!(!scene.is_valid(sprite));
}
