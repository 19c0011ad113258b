//! Tick-counted delays.

use std::time::Duration;

use bevy::prelude::{Commands, Component, Entity, Query, ResMut};

use crate::command::{CommandComponent, CommandLedger, Ticket};
use crate::constants::TICK_RATE;

/// One-shot delay, counted in simulation ticks. Resolution always takes at
/// least one tick, so a zero-length timer still completes at a flush.
#[derive(Component, Debug, Clone, Copy)]
pub struct TimerCommand {
    remaining: u32,
    ticket: Ticket,
}

impl TimerCommand {
    /// A delay of `duration`, rounded up to whole ticks.
    #[must_use]
    pub fn new(ticket: Ticket, duration: Duration) -> Self {
        let ticks = duration
            .as_millis()
            .saturating_mul(u128::from(TICK_RATE))
            .div_ceil(1000);
        Self::for_ticks(ticket, u32::try_from(ticks).unwrap_or(u32::MAX))
    }

    /// A delay of exactly `ticks` ticks.
    #[must_use]
    pub const fn for_ticks(ticket: Ticket, ticks: u32) -> Self {
        Self {
            remaining: ticks,
            ticket,
        }
    }

    /// Ticks left before the timer fires.
    #[must_use]
    pub const fn remaining(&self) -> u32 {
        self.remaining
    }
}

impl CommandComponent for TimerCommand {
    fn ticket(&self) -> Ticket {
        self.ticket
    }
}

/// Counts timers down and resolves the ones that reach zero.
pub fn tick_timer_commands_system(
    mut timers: Query<(Entity, &mut TimerCommand)>,
    mut ledger: ResMut<CommandLedger>,
    mut commands: Commands,
) {
    for (entity, mut timer) in &mut timers {
        timer.remaining = timer.remaining.saturating_sub(1);
        if timer.remaining == 0 {
            ledger.resolve_success(timer.ticket());
            commands.entity(entity).remove::<TimerCommand>();
        }
    }
}
