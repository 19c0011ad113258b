//! The at-most-one rule for singleton node classes.

use test_utils::build_app;

use tandem::liveness::NodeEntityMap;
use tandem::nodes::SpriteNode;
use tandem::registry::NodeComponent;
use tandem::scene::{NodeClass, NodeId, SceneTree};

fn bridged_actor(app: &mut bevy::prelude::App) -> (NodeId, NodeId, bevy::prelude::Entity) {
    let (actor, sprite) = {
        let mut scene = app.world_mut().resource_mut::<SceneTree>();
        let root = scene.root();
        let actor = scene.spawn_child(root, NodeClass::Actor, "hero");
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
fn an_engine_side_second_node_wins_and_the_first_is_freed_once() {
    let mut app = build_app();
    let (actor, first, entity) = bridged_actor(&mut app);

    let second = {
        let mut scene = app.world_mut().resource_mut::<SceneTree>();
        scene.spawn_child(actor, NodeClass::Sprite, "fancier")
    };
    app.update();

    {
        let world = app.world();
        assert_eq!(
            world.get::<SpriteNode>(entity).map(SpriteNode::node),
            Some(second)
        );
        let scene = world.resource::<SceneTree>();
        assert!(!scene.is_valid(first));
        assert_eq!(scene.freed_count(first), 1);
        assert!(scene.is_valid(second));
    }

    // Nothing left to do: further ticks must not free anything else.
    app.update();
    app.update();
    let scene = app.world().resource::<SceneTree>();
    assert_eq!(scene.freed_count(first), 1);
    assert_eq!(scene.freed_count(second), 0);
}

#[test]
fn an_ecs_side_swap_attaches_the_new_node_and_frees_the_old() {
    let mut app = build_app();
    let (actor, first, entity) = bridged_actor(&mut app);

    let replacement = {
        let mut scene = app.world_mut().resource_mut::<SceneTree>();
        scene.spawn(NodeClass::Sprite, "swapped")
    };
    app.world_mut()
        .entity_mut(entity)
        .insert(SpriteNode::from_node(replacement));
    app.update();

    let scene = app.world().resource::<SceneTree>();
    // The replacement was adopted into the actor's subtree.
    assert_eq!(scene.parent(replacement), Some(actor));
    assert_eq!(scene.freed_count(first), 1);

    // The adoption raises a child-entered event; the next pump must
    // recognise the node as already mirrored.
    app.update();
    let world = app.world();
    assert_eq!(
        world.get::<SpriteNode>(entity).map(SpriteNode::node),
        Some(replacement)
    );
    let scene = world.resource::<SceneTree>();
    assert_eq!(scene.freed_count(replacement), 0);
}

#[test]
fn removing_the_wrapper_frees_its_node() {
    let mut app = build_app();
    let (_, sprite, entity) = bridged_actor(&mut app);

    app.world_mut().entity_mut(entity).remove::<SpriteNode>();
    app.update();

    let scene = app.world().resource::<SceneTree>();
    assert!(!scene.is_valid(sprite));
    assert_eq!(scene.freed_count(sprite), 1);
}
