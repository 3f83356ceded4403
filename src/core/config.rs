//! Raid configuration with documented defaults
//!
//! Balance values live here so they can be tuned from `data/raid.toml`
//! without touching the simulation. The tick rate and battle length are
//! fixed in `battle::constants` because replays depend on them.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::{RaidError, Result};

/// Top-level configuration, one section per subsystem
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RaidConfig {
    #[serde(default)]
    pub battle: BattleConfig,
    #[serde(default)]
    pub matchmaking: MatchmakingConfig,
    #[serde(default)]
    pub loot: LootConfig,
    #[serde(default)]
    pub trophies: TrophyConfig,
    #[serde(default)]
    pub arena: ArenaConfig,
}

/// Arena geometry and scoring thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BattleConfig {
    /// Side length of the square arena in tiles
    pub arena_size: f32,
    /// Destruction added to the displayed result when the town hall falls
    pub town_hall_bonus: f32,
    /// Destruction needed for one star
    pub one_star_threshold: f32,
    /// Destruction needed for two stars
    pub two_star_threshold: f32,
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self {
            arena_size: 44.0,
            town_hall_bonus: 25.0,
            one_star_threshold: 50.0,
            two_star_threshold: 75.0,
        }
    }
}

/// Opponent search tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchmakingConfig {
    /// Trophy window searched first
    pub preferred_window: u32,
    /// Widest trophy window before falling back to the catalog
    pub max_window: u32,
    /// Candidates closest in trophies that the final pick is drawn from
    pub nearest_pool: usize,
    /// Re-rolls per sitting that cost nothing
    pub free_rerolls: u32,
    /// Gold charged per paid re-roll step
    pub reroll_fee_step: u64,
    /// Relative jitter applied to synthetic resource reserves
    pub resource_jitter: f32,
    /// Absolute jitter applied to synthetic trophy counts
    pub trophy_jitter: i32,
    /// Seconds an online-player snapshot stays valid
    pub cache_ttl_secs: u64,
    /// Fixed RNG seed; entropy when absent
    pub seed: Option<u64>,
}

impl Default for MatchmakingConfig {
    fn default() -> Self {
        Self {
            preferred_window: 200,
            max_window: 500,
            nearest_pool: 3,
            free_rerolls: 3,
            reroll_fee_step: 100,
            resource_jitter: 0.2,
            trophy_jitter: 50,
            cache_ttl_secs: 30,
            seed: None,
        }
    }
}

/// One row of the loot table
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LootBracket {
    /// Lowest destruction (inclusive) this bracket applies to
    pub min_destruction: f32,
    /// Share of the defender's reserve that becomes lootable
    pub fraction: f32,
}

/// Loot fraction by destruction bracket
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LootConfig {
    pub brackets: Vec<LootBracket>,
}

impl Default for LootConfig {
    fn default() -> Self {
        let bracket = |min_destruction, fraction| LootBracket { min_destruction, fraction };
        Self {
            brackets: vec![
                bracket(0.0, 0.10),
                bracket(40.0, 0.40),
                bracket(60.0, 0.60),
                bracket(80.0, 0.80),
                bracket(100.0, 1.00),
            ],
        }
    }
}

impl LootConfig {
    /// Fraction of the reserve available at the given destruction
    pub fn available_fraction(&self, destruction: f32) -> f32 {
        self.brackets
            .iter()
            .filter(|b| destruction >= b.min_destruction)
            .max_by(|a, b| a.min_destruction.total_cmp(&b.min_destruction))
            .map(|b| b.fraction)
            .unwrap_or(0.0)
    }
}

/// Zero-sum trophy exchange constants
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrophyConfig {
    /// Offer when both players have equal trophies
    pub base_offer: i32,
    /// Offer change per trophy of difference
    pub difference_scale: f32,
    pub min_offer: i32,
    pub max_offer: i32,
}

impl Default for TrophyConfig {
    fn default() -> Self {
        Self {
            base_offer: 30,
            difference_scale: 0.05,
            min_offer: 1,
            max_offer: 59,
        }
    }
}

/// Arena scheduling and lifecycle
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArenaConfig {
    /// Wall-clock milliseconds between ticks; 0 runs as fast as possible
    pub tick_cadence_ms: u64,
    /// Emit a state update every N ticks
    pub update_every_ticks: u32,
    /// Seconds a finished battle waits for the client before teardown
    pub return_timeout_secs: u64,
    /// Buffered client commands per battle
    pub command_buffer: usize,
    /// Arena events kept for slow subscribers
    pub event_buffer: usize,
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            tick_cadence_ms: 100,
            update_every_ticks: 1,
            return_timeout_secs: 60,
            command_buffer: 256,
            event_buffer: 1024,
        }
    }
}

impl RaidConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a TOML document; missing sections fall back to defaults
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: RaidConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&contents)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(RaidError::InvalidConfig(msg));

        if self.battle.arena_size <= 0.0 {
            return invalid(format!("arena_size ({}) must be positive", self.battle.arena_size));
        }

        if self.battle.one_star_threshold >= self.battle.two_star_threshold
            || self.battle.two_star_threshold > 100.0
        {
            return invalid(format!(
                "star thresholds must satisfy one ({}) < two ({}) <= 100",
                self.battle.one_star_threshold, self.battle.two_star_threshold
            ));
        }

        if self.matchmaking.preferred_window > self.matchmaking.max_window {
            return invalid(format!(
                "preferred_window ({}) should be <= max_window ({})",
                self.matchmaking.preferred_window, self.matchmaking.max_window
            ));
        }

        if self.matchmaking.nearest_pool == 0 {
            return invalid("nearest_pool must be at least 1".into());
        }

        if !(0.0..1.0).contains(&self.matchmaking.resource_jitter) {
            return invalid("resource_jitter must be in [0, 1)".into());
        }

        if self.loot.brackets.is_empty() {
            return invalid("loot table needs at least one bracket".into());
        }

        if self
            .loot
            .brackets
            .iter()
            .any(|b| !(0.0..=1.0).contains(&b.fraction))
        {
            return invalid("loot fractions must be in [0, 1]".into());
        }

        if self.trophies.min_offer > self.trophies.max_offer {
            return invalid(format!(
                "min_offer ({}) should be <= max_offer ({})",
                self.trophies.min_offer, self.trophies.max_offer
            ));
        }

        if self.arena.update_every_ticks == 0
            || self.arena.command_buffer == 0
            || self.arena.event_buffer == 0
        {
            return invalid("arena buffers and update interval must be positive".into());
        }

        Ok(())
    }
}
