//! Keeps a host engine's scene tree and a `bevy_ecs` world in lockstep.
//!
//! Nodes entering the tree are discovered into entities and typed
//! components; entities mutating or dying are mirrored back onto their
//! nodes. On top of the bridge sit one-shot commands with end-of-tick
//! completion delivery, and cooperative scripts that chain commands into
//! behaviours without ever running concurrently with systems.

pub mod bridge;
pub mod command;
pub mod components;
pub mod constants;
pub mod demo;
pub mod liveness;
pub mod logging;
pub mod nodes;
pub mod registry;
pub mod scene;
pub mod script;
pub mod scripts;
pub mod systems;

use bevy::prelude::{App, Plugin, SystemSet};

pub use bridge::{BridgeIssue, BridgePlugin, RegisterNodeComponentExt};
pub use command::{
    CommandCompleted, CommandComponent, CommandFailure, CommandLedger, CommandOutcome,
    CommandPlugin, CommandState, RegisterCommandExt, Ticket,
};
pub use script::{
    attach_script, RegisterWatchableExt, Script, ScriptCommandsExt, ScriptCx, ScriptError,
    ScriptFinished, ScriptHost, ScriptId, ScriptPlugin, Step, Wake,
};
pub use systems::GameplayPlugin;

/// Ordering labels for the bridge's fixed points in the tick.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TandemSet {
    /// ECS → scene attachment of freshly inserted node wrappers.
    Mirror,
    /// Teardown sweeps for removed components and commands.
    Sweep,
    /// Recording of watched component changes.
    Watch,
    /// The end-of-tick completion flush.
    Flush,
    /// Deferred node frees.
    SceneMaintenance,
}

/// The full stack: bridge, commands, scripts and the stock gameplay layer.
#[derive(Default)]
pub struct TandemPlugin;

impl Plugin for TandemPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins((
            BridgePlugin,
            CommandPlugin,
            ScriptPlugin,
            GameplayPlugin,
        ));
    }
}
