//! Battle clock constants
//!
//! Replays are only reproducible while these stay fixed, so they are not
//! part of the runtime config.

// Time
pub const TICKS_PER_SECOND: u32 = 10;
pub const TICK_INTERVAL_SECS: f32 = 1.0 / TICKS_PER_SECOND as f32;
pub const BATTLE_DURATION_SECS: u32 = 180;
pub const BATTLE_DURATION_TICKS: u32 = BATTLE_DURATION_SECS * TICKS_PER_SECOND;

// Levels scale hit points and damage additively per level above 1
pub const LEVEL_SCALING: f32 = 0.20;

// Stars
pub const MAX_STARS: u8 = 3;

/// Per-tick amount of a per-second rate.
///
/// Divides instead of multiplying by `TICK_INTERVAL_SECS` so whole-number
/// rates stay exact in f32.
pub fn per_tick(rate_per_second: f32) -> f32 {
    rate_per_second / TICKS_PER_SECOND as f32
}

/// Multiplier for a building or troop level (level 1 = 1.0)
pub fn level_multiplier(level: u8) -> f32 {
    1.0 + LEVEL_SCALING * f32::from(level.max(1) - 1)
}
