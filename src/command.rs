//! Command/task subsystem.
//!
//! Gameplay requests an effect by attaching a typed command component to an
//! entity; an effect system elsewhere observes it, performs the effect and
//! resolves the command. Resolution is recorded in a tick-scoped queue that
//! is flushed exactly once per simulation tick, after every system has run,
//! so waiters are never woken while the scheduler is still iterating.

mod flush;
mod sweep;

use std::any::TypeId;

use bevy::prelude::{
    App, Commands, Component, Entity, Event, IntoScheduleConfigs, Last, Plugin, Resource,
};
use hashbrown::HashMap;
use log::debug;
use serde::Serialize;
use thiserror::Error;

use crate::TandemSet;

pub use flush::flush_completions_system;
pub use sweep::RegisterCommandExt;

/// Identity of one issued command. Allocated by [`CommandLedger::begin`];
/// never reused within a world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct Ticket(u64);

impl Ticket {
    /// Raw identifier, mainly for logging.
    #[must_use]
    pub const fn into_inner(self) -> u64 {
        self.0
    }
}

/// Why a command failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommandFailure {
    /// The command component was withdrawn (or its entity despawned)
    /// before an effect system resolved it.
    #[error("command component was removed before it resolved")]
    Removed,
    /// Movement was blocked by an obstacle.
    #[error("movement was blocked")]
    Collision,
    /// Effect-specific failure.
    #[error("{0}")]
    Message(String),
}

/// Lifecycle state of a command. Transitions are monotonic: once terminal,
/// a command never changes again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandState {
    /// Issued and awaiting an effect system.
    Running,
    /// Effect completed.
    Success,
    /// Effect failed.
    Failed(CommandFailure),
}

/// Outcome delivered to a command's waiter at flush.
pub type CommandOutcome = Result<(), CommandFailure>;

/// A component representing a one-shot imperative request.
///
/// Implementors embed the [`Ticket`] handed out at issue time so effect
/// systems can resolve the right completion.
pub trait CommandComponent: Component + Sized {
    /// Ticket this command instance was issued under.
    fn ticket(&self) -> Ticket;
}

/// Event raised once per completed command when the tick's queue is
/// flushed. Observers may rely on it firing after all systems of the tick.
#[derive(Event, Debug, Clone)]
pub struct CommandCompleted {
    /// The resolved command.
    pub ticket: Ticket,
    /// Success or failure.
    pub outcome: CommandOutcome,
}

/// Book-keeping for issued commands and the tick-scoped completion queue.
#[derive(Resource, Default)]
pub struct CommandLedger {
    next: u64,
    states: HashMap<Ticket, CommandState>,
    issued: HashMap<(Entity, TypeId), Ticket>,
    queue: Vec<(Ticket, CommandOutcome)>,
}

impl CommandLedger {
    /// Allocates a ticket for a command of type `type_id` on `entity` and
    /// marks it `Running`. Callers insert the component themselves.
    pub fn begin(&mut self, entity: Entity, type_id: TypeId) -> Ticket {
        self.next += 1;
        let ticket = Ticket(self.next);
        self.states.insert(ticket, CommandState::Running);
        if let Some(previous) = self.issued.insert((entity, type_id), ticket) {
            // A fresh issue supersedes a still-running one of the same type.
            if self.is_running(previous) {
                debug!("{previous:?} superseded by {ticket:?} on {entity:?}");
                self.resolve(previous, Err(CommandFailure::Removed));
            }
        }
        debug!("issued {ticket:?} on {entity:?}");
        ticket
    }

    /// Issues a command: allocates a ticket, builds the component with it
    /// and queues the insert through `commands`.
    pub fn issue<C: CommandComponent>(
        &mut self,
        commands: &mut Commands,
        entity: Entity,
        make: impl FnOnce(Ticket) -> C,
    ) -> Ticket {
        let ticket = self.begin(entity, TypeId::of::<C>());
        commands.entity(entity).insert(make(ticket));
        ticket
    }

    /// Transitions the command to `Success`. A no-op when the ticket is
    /// already terminal or unknown.
    pub fn resolve_success(&mut self, ticket: Ticket) {
        self.resolve(ticket, Ok(()));
    }

    /// Transitions the command to `Failed`. A no-op when the ticket is
    /// already terminal or unknown.
    pub fn resolve_failure(&mut self, ticket: Ticket, failure: CommandFailure) {
        self.resolve(ticket, Err(failure));
    }

    fn resolve(&mut self, ticket: Ticket, outcome: CommandOutcome) {
        match self.states.get_mut(&ticket) {
            Some(state @ CommandState::Running) => {
                *state = match &outcome {
                    Ok(()) => CommandState::Success,
                    Err(failure) => CommandState::Failed(failure.clone()),
                };
                // Enqueued exactly once: only the Running -> terminal edge
                // reaches this point.
                self.queue.push((ticket, outcome));
            }
            Some(_) => debug!("duplicate resolution of {ticket:?} ignored"),
            None => debug!("resolution of unknown {ticket:?} ignored"),
        }
    }

    /// Current state of a ticket. `None` once its completion has been
    /// flushed (or if it was never issued).
    #[must_use]
    pub fn state(&self, ticket: Ticket) -> Option<&CommandState> {
        self.states.get(&ticket)
    }

    /// Whether the ticket is known and still running.
    #[must_use]
    pub fn is_running(&self, ticket: Ticket) -> bool {
        matches!(self.states.get(&ticket), Some(CommandState::Running))
    }

    /// Ticket most recently issued for `(entity, type_id)`, if any.
    #[must_use]
    pub fn ticket_for(&self, entity: Entity, type_id: TypeId) -> Option<Ticket> {
        self.issued.get(&(entity, type_id)).copied()
    }

    /// Removes the issue record for `(entity, type_id)`. Used by the
    /// removal sweeps once the component is gone.
    pub(crate) fn clear_issued(&mut self, entity: Entity, type_id: TypeId) -> Option<Ticket> {
        self.issued.remove(&(entity, type_id))
    }

    /// Drains the tick's completions in resolution order and forgets their
    /// terminal states.
    pub(crate) fn take_queue(&mut self) -> Vec<(Ticket, CommandOutcome)> {
        let queue = std::mem::take(&mut self.queue);
        for (ticket, _) in &queue {
            self.states.remove(ticket);
        }
        queue
    }
}

/// Plugin installing the command ledger and the once-per-tick flush.
#[derive(Default)]
pub struct CommandPlugin;

impl Plugin for CommandPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<CommandLedger>();
        app.add_systems(Last, flush_completions_system.in_set(TandemSet::Flush));
    }
}
