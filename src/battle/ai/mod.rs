//! Per-unit decision rules, invoked once per tick
//!
//! - Troops walk to the nearest building they prefer and hit it.
//! - Defenses shoot the nearest troop they can reach.
//!
//! Both rules are deterministic: ties resolve by lowest id, never by RNG.

pub mod defense;
pub mod troop;

pub use defense::{select_defense_target, step_defense, DefenseShot};
pub use troop::{select_troop_target, step_troop, TroopAction};
