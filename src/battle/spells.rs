//! Spells and their per-tick effect functions
//!
//! Each spell type maps elapsed ticks to a [`SpellEffect`]. The simulator
//! applies effects by kind and never inspects the spell type itself.

use serde::{Deserialize, Serialize};

use crate::battle::constants::{per_tick, TICKS_PER_SECOND};
use crate::core::types::{SpellId, Vec2};

/// Type of spell
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SpellType {
    Lightning,
    Heal,
    Rage,
    Freeze,
}

/// What a spell does to everything inside its radius this tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SpellEffect {
    None,
    DamageBuildings(f32),
    HealUnits(f32),
    Boost { damage: f32, speed: f32 },
    FreezeDefenses,
}

/// Input to a spell's effect function
#[derive(Debug, Clone, Copy)]
pub struct SpellContext {
    /// Ticks since the spell was cast (0 on the casting tick)
    pub elapsed_ticks: u32,
}

pub type EffectFn = fn(&SpellContext) -> SpellEffect;

/// Static description of a spell type
#[derive(Debug, Clone, Copy)]
pub struct SpellDefinition {
    pub radius: f32,
    pub duration_ticks: u32,
    pub housing: u32,
    pub effect: EffectFn,
}

fn lightning(ctx: &SpellContext) -> SpellEffect {
    // Three bolts, one per tick
    if ctx.elapsed_ticks < 3 {
        SpellEffect::DamageBuildings(150.0)
    } else {
        SpellEffect::None
    }
}

fn heal(_ctx: &SpellContext) -> SpellEffect {
    SpellEffect::HealUnits(per_tick(30.0))
}

fn rage(_ctx: &SpellContext) -> SpellEffect {
    SpellEffect::Boost { damage: 1.5, speed: 1.3 }
}

fn freeze(_ctx: &SpellContext) -> SpellEffect {
    SpellEffect::FreezeDefenses
}

impl SpellType {
    pub const ALL: [SpellType; 4] =
        [SpellType::Lightning, SpellType::Heal, SpellType::Rage, SpellType::Freeze];

    pub fn definition(&self) -> SpellDefinition {
        match self {
            SpellType::Lightning => SpellDefinition {
                radius: 2.0,
                duration_ticks: 3,
                housing: 1,
                effect: lightning,
            },
            SpellType::Heal => SpellDefinition {
                radius: 4.0,
                duration_ticks: 4 * TICKS_PER_SECOND,
                housing: 2,
                effect: heal,
            },
            SpellType::Rage => SpellDefinition {
                radius: 4.0,
                duration_ticks: 6 * TICKS_PER_SECOND,
                housing: 2,
                effect: rage,
            },
            SpellType::Freeze => SpellDefinition {
                radius: 3.0,
                duration_ticks: 4 * TICKS_PER_SECOND,
                housing: 1,
                effect: freeze,
            },
        }
    }

    pub fn housing(&self) -> u32 {
        self.definition().housing
    }
}

/// A spell that has been cast and is still running
#[derive(Debug, Clone)]
pub struct ActiveSpell {
    pub id: SpellId,
    pub kind: SpellType,
    pub origin: Vec2,
    pub radius: f32,
    pub remaining_ticks: u32,
    pub elapsed_ticks: u32,
    pub effect: EffectFn,
}

impl ActiveSpell {
    pub fn new(id: SpellId, kind: SpellType, origin: Vec2) -> Self {
        let def = kind.definition();
        Self {
            id,
            kind,
            origin,
            radius: def.radius,
            remaining_ticks: def.duration_ticks,
            elapsed_ticks: 0,
            effect: def.effect,
        }
    }

    /// Effect for the current tick
    pub fn current_effect(&self) -> SpellEffect {
        (self.effect)(&SpellContext { elapsed_ticks: self.elapsed_ticks })
    }

    pub fn covers(&self, point: Vec2) -> bool {
        self.origin.distance(&point) <= self.radius
    }

    /// Advance one tick; returns true once the spell has run out
    pub fn advance(&mut self) -> bool {
        self.elapsed_ticks += 1;
        self.remaining_ticks = self.remaining_ticks.saturating_sub(1);
        self.remaining_ticks == 0
    }

    pub fn is_expired(&self) -> bool {
        self.remaining_ticks == 0
    }
}
