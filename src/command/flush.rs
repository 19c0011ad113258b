//! End-of-tick completion flush.
//!
//! Runs in `Last`, after effect systems and the removal sweeps, so every
//! resolution recorded during the tick is delivered here and nowhere else.

use bevy::prelude::World;

use super::{CommandCompleted, CommandLedger};
use crate::script::runner;

/// Drains the tick's completion queue in resolution order.
///
/// Ordering within the flush: scripts whose entity or host vanished are
/// cancelled first, freshly attached scripts take their first step, then
/// each drained completion raises [`CommandCompleted`] and wakes its waiting
/// script, then component-watch wakes are delivered, and finally finished
/// scripts are detached and reported.
pub fn flush_completions_system(world: &mut World) {
    runner::cancel_stale(world);
    runner::start_pending(world);

    let completions = world.resource_mut::<CommandLedger>().take_queue();
    for (ticket, outcome) in completions {
        world.trigger(CommandCompleted {
            ticket,
            outcome: outcome.clone(),
        });
        runner::wake_command(world, ticket, outcome);
    }

    runner::wake_watches(world);
    runner::finalize(world);
}
