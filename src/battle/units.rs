//! Deployed attacker units and the army they are drawn from

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::battle::spells::SpellType;
use crate::battle::unit_type::{TroopStats, TroopType};
use crate::core::types::{BuildingId, UnitId, Vec2};

/// Troop behaviour state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UnitState {
    #[default]
    Seeking,
    Attacking,
    Dead,
}

/// Transient spell modifiers, rebuilt every tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UnitModifiers {
    pub damage: f32,
    pub speed: f32,
}

impl Default for UnitModifiers {
    fn default() -> Self {
        Self { damage: 1.0, speed: 1.0 }
    }
}

/// A troop on the battlefield. Always belongs to the attacker.
#[derive(Debug, Clone)]
pub struct DeployedUnit {
    pub id: UnitId,
    pub troop: TroopType,
    pub position: Vec2,
    pub hp: f32,
    pub max_hp: f32,
    pub dps: f32,
    pub speed: f32,
    pub range: f32,
    pub is_air: bool,
    /// Weak reference, re-resolved against the building list every tick
    pub target: Option<BuildingId>,
    pub state: UnitState,
    pub modifiers: UnitModifiers,
    /// Building revision at which the unit found nothing to attack
    pub idle_at_revision: Option<u64>,
}

impl DeployedUnit {
    pub fn new(id: UnitId, troop: TroopType, position: Vec2) -> Self {
        let TroopStats { hp, dps, speed, range, is_air, .. } = troop.stats();
        Self {
            id,
            troop,
            position,
            hp,
            max_hp: hp,
            dps,
            speed,
            range,
            is_air,
            target: None,
            state: UnitState::Seeking,
            modifiers: UnitModifiers::default(),
            idle_at_revision: None,
        }
    }

    pub fn is_alive(&self) -> bool {
        self.state != UnitState::Dead
    }

    /// Apply damage; a unit reaching zero hp dies immediately.
    /// Returns true if this call killed the unit.
    pub fn take_damage(&mut self, amount: f32) -> bool {
        if !self.is_alive() || amount <= 0.0 {
            return false;
        }
        self.hp -= amount;
        if self.hp <= 0.0 {
            self.hp = 0.0;
            self.state = UnitState::Dead;
            self.target = None;
            return true;
        }
        false
    }

    pub fn heal(&mut self, amount: f32) {
        if self.is_alive() {
            self.hp = (self.hp + amount).min(self.max_hp);
        }
    }

    pub fn effective_dps(&self) -> f32 {
        self.dps * self.modifiers.damage
    }

    pub fn effective_speed(&self) -> f32 {
        self.speed * self.modifiers.speed
    }
}

/// Troops and spells an attacker brings into battle
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArmyComposition {
    pub troops: BTreeMap<TroopType, u32>,
    pub spells: BTreeMap<SpellType, u32>,
    pub housing_capacity: u32,
    pub spell_capacity: u32,
}

impl ArmyComposition {
    pub fn new(housing_capacity: u32, spell_capacity: u32) -> Self {
        Self { housing_capacity, spell_capacity, ..Self::default() }
    }

    pub fn with_troops(mut self, troop: TroopType, count: u32) -> Self {
        *self.troops.entry(troop).or_insert(0) += count;
        self
    }

    pub fn with_spells(mut self, spell: SpellType, count: u32) -> Self {
        *self.spells.entry(spell).or_insert(0) += count;
        self
    }

    pub fn troop_count(&self, troop: TroopType) -> u32 {
        self.troops.get(&troop).copied().unwrap_or(0)
    }

    pub fn spell_count(&self, spell: SpellType) -> u32 {
        self.spells.get(&spell).copied().unwrap_or(0)
    }

    pub fn total_troops(&self) -> u32 {
        self.troops.values().sum()
    }
}
