//! Waypoint patrol.

use bevy_math::Vec2;

use crate::command::CommandFailure;
use crate::script::{Script, ScriptCx, ScriptError, Step, Wake};
use crate::systems::movement::MoveCommand;

/// Walks a fixed loop of waypoints. A blocked step retries the same
/// waypoint next wake; any other movement failure finishes the script.
pub struct PatrolScript {
    waypoints: Vec<Vec2>,
    cursor: usize,
    laps_left: Option<u32>,
}

impl PatrolScript {
    /// Patrols the waypoints forever.
    #[must_use]
    pub const fn looping(waypoints: Vec<Vec2>) -> Self {
        Self {
            waypoints,
            cursor: 0,
            laps_left: None,
        }
    }

    /// Patrols the waypoints for a fixed number of laps, then finishes.
    #[must_use]
    pub const fn laps(waypoints: Vec<Vec2>, laps: u32) -> Self {
        Self {
            waypoints,
            cursor: 0,
            laps_left: Some(laps),
        }
    }

    fn issue_current(&self, cx: &mut ScriptCx<'_>) -> Step {
        let Some(&target) = self.waypoints.get(self.cursor) else {
            return Step::Done;
        };
        let ticket = cx.issue(|ticket| MoveCommand::new(ticket, target));
        Step::AwaitCommand(ticket)
    }

    /// Advances the cursor past a reached waypoint. `None` when the last
    /// lap is complete.
    fn advance(&mut self) -> Option<()> {
        self.cursor += 1;
        if self.cursor < self.waypoints.len() {
            return Some(());
        }
        self.cursor = 0;
        match self.laps_left.as_mut() {
            None => Some(()),
            Some(laps) => {
                *laps = laps.saturating_sub(1);
                (*laps > 0).then_some(())
            }
        }
    }
}

impl Script for PatrolScript {
    fn resume(&mut self, cx: &mut ScriptCx<'_>, wake: Wake) -> Result<Step, ScriptError> {
        if self.waypoints.is_empty() || self.laps_left == Some(0) {
            return Ok(Step::Done);
        }
        match wake {
            Wake::Start => Ok(self.issue_current(cx)),
            Wake::Command(Ok(())) => match self.advance() {
                Some(()) => Ok(self.issue_current(cx)),
                None => Ok(Step::Done),
            },
            Wake::Command(Err(CommandFailure::Collision)) => Ok(self.issue_current(cx)),
            Wake::Command(Err(failure)) => Err(failure.into()),
            Wake::ComponentSet | Wake::ComponentRemoved => Ok(self.issue_current(cx)),
        }
    }
}
