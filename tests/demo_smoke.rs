//! The demo scene runs for a while without faults.

use test_utils::{build_app, run_ticks, CapturedFinishes, CapturedIssues};

use tandem::components::Position;
use tandem::demo;
use tandem::liveness::NodeEntityMap;
use tandem::scene::SceneTree;

#[test]
fn the_demo_scene_runs_clean_for_ten_seconds() {
    let mut app = build_app();
    let handles = demo::setup_demo(app.world_mut());
    app.update();
    assert!(demo::attach_hero_patrol(app.world_mut(), handles.hero));

    let raider_start = {
        let world = app.world();
        let scene = world.resource::<SceneTree>();
        let raider = NodeEntityMap::lookup(scene, handles.raider).expect("raider is bridged");
        world.get::<Position>(raider).expect("raider has a body").0
    };

    run_ticks(&mut app, 600);

    let world = app.world();
    assert!(world.resource::<CapturedIssues>().0.is_empty());
    // Cancellations are fine; unexpected script failures are not.
    assert!(world
        .resource::<CapturedFinishes>()
        .0
        .iter()
        .all(|finish| match &finish.outcome {
            Ok(()) => true,
            Err(err) => err.is_cancellation(),
        }));

    // Both actors are alive and the wanderer has gone somewhere.
    let scene = world.resource::<SceneTree>();
    let hero = NodeEntityMap::lookup(scene, handles.hero).expect("hero survives");
    let raider = NodeEntityMap::lookup(scene, handles.raider).expect("raider survives");
    assert!(world.get_entity(hero).is_ok());
    assert!(world.get_entity(raider).is_ok());
    let raider_now = world.get::<Position>(raider).expect("raider keeps moving").0;
    assert!(raider_now.distance(raider_start) > 1.0);
}
