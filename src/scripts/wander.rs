//! Aimless wandering.

use std::f32::consts::TAU;
use std::time::Duration;

use bevy_math::Vec2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::command::CommandFailure;
use crate::components::Position;
use crate::script::{Script, ScriptCx, ScriptError, Step, Wake};
use crate::systems::movement::MoveCommand;
use crate::systems::timer::TimerCommand;

enum Phase {
    Moving,
    Resting,
}

/// Drifts between random points near the entity's starting position,
/// pausing briefly after each leg. Blocked legs are abandoned and a new
/// point is picked after the pause.
pub struct WanderScript {
    origin: Option<Vec2>,
    radius: f32,
    rng: StdRng,
    phase: Phase,
}

impl WanderScript {
    /// A wanderer roaming up to `radius` from its starting position. The
    /// seed makes the walk deterministic for a given entity.
    #[must_use]
    pub fn new(radius: f32, seed: u64) -> Self {
        Self {
            origin: None,
            radius,
            rng: StdRng::seed_from_u64(seed),
            phase: Phase::Moving,
        }
    }

    /// Random point in the outer half of the roam disc, so legs are never
    /// trivially short.
    fn pick_target(&mut self, origin: Vec2) -> Vec2 {
        let angle = self.rng.gen_range(0.0..TAU);
        let distance = self.rng.gen_range(self.radius * 0.5..=self.radius);
        origin + Vec2::new(angle.cos(), angle.sin()) * distance
    }

    fn start_leg(&mut self, cx: &mut ScriptCx<'_>, origin: Vec2) -> Step {
        let target = self.pick_target(origin);
        self.phase = Phase::Moving;
        let ticket = cx.issue(|ticket| MoveCommand::new(ticket, target));
        Step::AwaitCommand(ticket)
    }

    fn start_rest(&mut self, cx: &mut ScriptCx<'_>) -> Step {
        let millis = self.rng.gen_range(500..=1500);
        self.phase = Phase::Resting;
        let ticket = cx.issue(|ticket| TimerCommand::new(ticket, Duration::from_millis(millis)));
        Step::AwaitCommand(ticket)
    }
}

impl Script for WanderScript {
    fn resume(&mut self, cx: &mut ScriptCx<'_>, wake: Wake) -> Result<Step, ScriptError> {
        let origin = match self.origin {
            Some(origin) => origin,
            None => {
                let Some(position) = cx.get::<Position>() else {
                    return Err(ScriptError::Unexpected(
                        "wanderer has no position".to_owned(),
                    ));
                };
                let origin = position.0;
                self.origin = Some(origin);
                origin
            }
        };
        match wake {
            Wake::Start => Ok(self.start_leg(cx, origin)),
            Wake::Command(outcome) => {
                if let Err(failure) = outcome {
                    if failure != CommandFailure::Collision {
                        return Err(failure.into());
                    }
                }
                match self.phase {
                    Phase::Moving => Ok(self.start_rest(cx)),
                    Phase::Resting => Ok(self.start_leg(cx, origin)),
                }
            }
            Wake::ComponentSet | Wake::ComponentRemoved => Ok(self.start_leg(cx, origin)),
        }
    }
}
