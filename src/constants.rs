//! Fixed gameplay constants shared between systems and tests.

/// Simulation ticks per second. The demo binary and the tests drive the
/// schedule at this fixed rate.
pub const TICK_RATE: u32 = 60;

/// Seconds advanced by a single simulation tick.
#[expect(clippy::cast_precision_loss, reason = "TICK_RATE is far below 2^23")]
pub const TICK_SECONDS: f32 = 1.0 / TICK_RATE as f32;

/// Arrival radius used by movement commands that do not specify one.
pub const DEFAULT_ARRIVAL_RADIUS: f32 = 10.0;

/// Movement speed applied to bodies that carry no explicit `Speed`.
pub const DEFAULT_SPEED: f32 = 90.0;

/// Starting health for hydrated health bars without a `health` tag.
pub const DEFAULT_HEALTH: i32 = 10;

/// Wander radius used when a brain node carries no `wander_radius` tag.
pub const DEFAULT_WANDER_RADIUS: f32 = 200.0;
