//! Cooperative scripts.
//!
//! A script is a resumable behaviour attached to one entity. It never runs
//! concurrently with systems: it takes a step only inside the end-of-tick
//! flush, when woken by a command completion or a watched component change,
//! and each step ends by declaring what it waits for next. Liveness is
//! re-checked before every step, so a script body can assume its entity and
//! its attachment are intact whenever it executes.

pub(crate) mod context;
pub(crate) mod runner;
pub(crate) mod watch;

use std::any::TypeId;

use bevy::prelude::{App, Commands, Component, Entity, Event, On, Plugin, World};
use log::{debug, error};
use thiserror::Error;

use crate::command::{CommandFailure, CommandOutcome, Ticket};

pub use context::ScriptCx;
pub use runner::ScriptRunner;
pub use watch::{RegisterWatchableExt, WatchKind};

/// Identity of one script attachment. A re-attached script gets a fresh id,
/// so stale wakes can never reach the wrong instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScriptId(u64);

impl ScriptId {
    /// Raw identifier, mainly for logging.
    #[must_use]
    pub const fn into_inner(self) -> u64 {
        self.0
    }
}

/// Why a script stopped without returning [`Step::Done`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScriptError {
    /// The entity the script was attached to was despawned.
    #[error("the script's entity was despawned")]
    EntityDead,
    /// The script was detached (or replaced by another script).
    #[error("the script was detached from its entity")]
    ScriptRemoved,
    /// A component the script depended on was withdrawn mid-wait.
    #[error("a component the script depended on was removed")]
    ComponentRemoved,
    /// Script-specific failure.
    #[error("{0}")]
    Unexpected(String),
}

impl ScriptError {
    /// Cancellations are the expected way scripts die in a live game; only
    /// [`ScriptError::Unexpected`] indicates a bug.
    #[must_use]
    pub const fn is_cancellation(&self) -> bool {
        !matches!(self, Self::Unexpected(_))
    }
}

impl From<CommandFailure> for ScriptError {
    fn from(failure: CommandFailure) -> Self {
        match failure {
            CommandFailure::Removed => Self::ComponentRemoved,
            other => Self::Unexpected(other.to_string()),
        }
    }
}

/// What woke the script up.
#[derive(Debug, Clone)]
pub enum Wake {
    /// First step after attachment.
    Start,
    /// The command the script was waiting on completed.
    Command(CommandOutcome),
    /// The watched component was inserted or mutated.
    ComponentSet,
    /// The watched component was removed.
    ComponentRemoved,
}

/// What the script waits for next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Sleep until the given command completes.
    AwaitCommand(Ticket),
    /// Sleep until a component of this type is set on the script's entity.
    /// The type must be registered watchable.
    AwaitSet(TypeId),
    /// Sleep until a component of this type is removed from the script's
    /// entity. The type must be registered watchable.
    AwaitRemoved(TypeId),
    /// The script is finished.
    Done,
}

impl Step {
    /// Typed shorthand for [`Step::AwaitSet`].
    #[must_use]
    pub fn await_set<C: Component>() -> Self {
        Self::AwaitSet(TypeId::of::<C>())
    }

    /// Typed shorthand for [`Step::AwaitRemoved`].
    #[must_use]
    pub fn await_removed<C: Component>() -> Self {
        Self::AwaitRemoved(TypeId::of::<C>())
    }
}

/// A resumable behaviour. Each call advances the script by one step.
///
/// Returning an error finishes the script; [`ScriptError::Unexpected`] is
/// logged at error level, cancellations at debug.
pub trait Script: Send + Sync + 'static {
    /// Advances the script. `wake` says why it was resumed.
    ///
    /// # Errors
    /// Any [`ScriptError`] finishes the script.
    fn resume(&mut self, cx: &mut ScriptCx<'_>, wake: Wake) -> Result<Step, ScriptError>;
}

/// Marker component tying an entity to its live script instance. Removing
/// it cancels the script at the next flush.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScriptHost {
    id: ScriptId,
}

impl ScriptHost {
    /// The attached script instance.
    #[must_use]
    pub const fn id(&self) -> ScriptId {
        self.id
    }
}

/// Event raised at flush when a script finishes, for any reason.
#[derive(Event, Debug, Clone)]
pub struct ScriptFinished {
    /// Entity the script was attached to (it may already be despawned).
    pub entity: Entity,
    /// The finished instance.
    pub id: ScriptId,
    /// `Ok` for a script that ran to completion.
    pub outcome: Result<(), ScriptError>,
}

/// Attaches `script` to `entity`, replacing any script already attached.
/// The first step runs at the next flush.
pub fn attach_script(world: &mut World, entity: Entity, script: impl Script) -> ScriptId {
    let id = runner::attach(world, entity, Box::new(script));
    if let Ok(mut entry) = world.get_entity_mut(entity) {
        entry.insert(ScriptHost { id });
    }
    id
}

/// Deferred variant of [`attach_script`] for use from ordinary systems.
pub trait ScriptCommandsExt {
    /// Queues a script attachment.
    fn attach_script(&mut self, entity: Entity, script: impl Script);
}

impl ScriptCommandsExt for Commands<'_, '_> {
    fn attach_script(&mut self, entity: Entity, script: impl Script) {
        self.queue(move |world: &mut World| {
            attach_script(world, entity, script);
        });
    }
}

#[expect(
    clippy::needless_pass_by_value,
    reason = "Observer systems must take On<T> by value."
)]
fn log_script_finished(finished: On<ScriptFinished>) {
    let event = finished.event();
    match &event.outcome {
        Ok(()) => debug!("script {:?} on {:?} finished", event.id, event.entity),
        Err(err) if err.is_cancellation() => {
            debug!("script {:?} on {:?} cancelled: {err}", event.id, event.entity);
        }
        Err(err) => error!("script {:?} on {:?} failed: {err}", event.id, event.entity),
    }
}

/// Plugin installing the script runner and watch log.
#[derive(Default)]
pub struct ScriptPlugin;

impl Plugin for ScriptPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<runner::ScriptRunner>()
            .init_resource::<watch::WatchEvents>()
            .init_resource::<watch::WatchRegistry>();
        app.add_observer(log_script_finished);
    }
}
