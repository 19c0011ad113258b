//! Gameplay effect systems and their plugin.

pub mod damage;
pub mod movement;
pub mod timer;

use bevy::prelude::{App, IntoScheduleConfigs, Plugin, PostUpdate, Update};

use crate::bridge::RegisterNodeComponentExt;
use crate::command::RegisterCommandExt;
use crate::components::Health;
use crate::nodes::{
    cancel_brainless_scripts_system, hydrate_bodies_system, hydrate_brains_system,
    hydrate_health_bars_system, BodyNode, BrainNode, HealthBarNode, SpriteNode, TriggerNode,
};
use crate::script::RegisterWatchableExt;
use crate::TandemSet;

/// Plugin registering the stock node classes, commands and effect systems.
#[derive(Default)]
pub struct GameplayPlugin;

impl Plugin for GameplayPlugin {
    fn build(&self, app: &mut App) {
        app.register_node_component::<BodyNode>()
            .register_node_component::<SpriteNode>()
            .register_node_component::<HealthBarNode>()
            .register_node_component::<TriggerNode>()
            .register_node_component::<BrainNode>();

        app.register_command::<movement::MoveCommand>()
            .register_command::<damage::DamageCommand>()
            .register_command::<timer::TimerCommand>();

        app.register_watchable::<Health>();

        app.add_systems(
            PostUpdate,
            cancel_brainless_scripts_system.in_set(TandemSet::Sweep),
        );

        app.add_systems(
            Update,
            (
                (
                    hydrate_bodies_system,
                    hydrate_health_bars_system,
                    hydrate_brains_system,
                ),
                (
                    movement::fail_unmovable_commands_system,
                    movement::apply_move_commands_system,
                ),
                (
                    damage::fail_unbacked_commands_system,
                    damage::apply_damage_commands_system,
                ),
                timer::tick_timer_commands_system,
            )
                .chain(),
        );
    }
}
