//! Demo binary: builds a small scene, bridges it and runs the simulation
//! for a fixed number of ticks.

use anyhow::{bail, Result};
use bevy::prelude::App;
use clap::Parser;
use log::info;

use tandem::components::{Health, Position, TickClock};
use tandem::demo;
use tandem::liveness::NodeEntityMap;
use tandem::scene::{NodeId, SceneTree};
use tandem::TandemPlugin;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Enable debug logging.
    #[arg(short, long)]
    verbose: bool,

    /// Number of simulation ticks to run.
    #[arg(long, default_value_t = 600)]
    ticks: u64,
}

fn main() -> Result<()> {
    let args = Args::parse();
    tandem::logging::init(args.verbose);

    let mut app = App::new();
    app.add_plugins(TandemPlugin);

    let handles = demo::setup_demo(app.world_mut());
    app.update();
    if !demo::attach_hero_patrol(app.world_mut(), handles.hero) {
        bail!("demo hero was not bridged");
    }

    for _ in 1..args.ticks {
        app.update();
    }

    let world = app.world();
    info!("ran {} ticks", world.resource::<TickClock>().ticks);
    report(world, "hero", handles.hero);
    report(world, "raider", handles.raider);
    Ok(())
}

fn report(world: &bevy::prelude::World, name: &str, node: NodeId) {
    let scene = world.resource::<SceneTree>();
    let Some(entity) = NodeEntityMap::lookup(scene, node) else {
        info!("{name}: no longer bridged");
        return;
    };
    if world.get_entity(entity).is_err() {
        info!("{name}: despawned");
        return;
    }
    let position = world.get::<Position>(entity).map(|p| p.0);
    let health = world.get::<Health>(entity).map(|h| h.current);
    info!("{name}: position {position:?}, health {health:?}");
}
