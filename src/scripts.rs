//! Stock behaviours.

pub mod patrol;
pub mod wander;

pub use patrol::PatrolScript;
pub use wander::WanderScript;
