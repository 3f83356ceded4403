//! Deployment commands
//!
//! Commands are buffered by the battle and applied at the start of the
//! next tick. A rejected command leaves the battle untouched.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::battle::execution::{BattleEventType, BattleState};
use crate::battle::spells::{ActiveSpell, SpellType};
use crate::battle::unit_type::TroopType;
use crate::battle::units::DeployedUnit;
use crate::core::types::{SpellId, UnitId, Vec2};

/// Attacker input
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DeployCommand {
    Troop { troop: TroopType, position: Vec2 },
    Spell { spell: SpellType, position: Vec2 },
}

impl DeployCommand {
    pub fn troop(troop: TroopType, position: Vec2) -> Self {
        DeployCommand::Troop { troop, position }
    }

    pub fn spell(spell: SpellType, position: Vec2) -> Self {
        DeployCommand::Spell { spell, position }
    }

    pub fn position(&self) -> Vec2 {
        match self {
            DeployCommand::Troop { position, .. } | DeployCommand::Spell { position, .. } => {
                *position
            }
        }
    }
}

/// Why a deployment did not register
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeployRejection {
    #[error("battle is not accepting deployments")]
    BattleNotActive,
    #[error("no troops of that type remain")]
    NoTroopsRemaining,
    #[error("not enough housing left")]
    InsufficientHousing,
    #[error("no spells of that type remain")]
    NoSpellsRemaining,
    #[error("not enough spell capacity left")]
    InsufficientSpellCapacity,
    #[error("position is outside the arena")]
    OutOfBounds,
}

/// What an accepted deployment created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Deployed {
    Unit(UnitId),
    Spell(SpellId),
}

/// Outcome of one buffered command
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentOutcome {
    pub command: DeployCommand,
    pub result: Result<Deployed, DeployRejection>,
}

impl DeploymentOutcome {
    pub fn accepted(&self) -> bool {
        self.result.is_ok()
    }
}

/// Validate and apply one command to the battle.
///
/// All checks run before anything is mutated.
pub fn apply_deployment(
    state: &mut BattleState,
    command: &DeployCommand,
) -> Result<Deployed, DeployRejection> {
    let position = command.position().snapped();
    if !state.map.contains(position) {
        return Err(DeployRejection::OutOfBounds);
    }

    match *command {
        DeployCommand::Troop { troop, .. } => {
            if state.army.troop_count(troop) == 0 {
                return Err(DeployRejection::NoTroopsRemaining);
            }
            let housing = troop.housing();
            if state.housing_used + housing > state.army.housing_capacity {
                return Err(DeployRejection::InsufficientHousing);
            }

            if let Some(count) = state.army.troops.get_mut(&troop) {
                *count -= 1;
            }
            state.housing_used += housing;

            let id = UnitId(state.next_unit_id);
            state.next_unit_id += 1;
            state.units.push(DeployedUnit::new(id, troop, position));
            state.log_event(
                BattleEventType::TroopDeployed { unit_id: id, troop },
                format!("{:?} {} deployed at ({}, {})", troop, id, position.x, position.y),
            );
            Ok(Deployed::Unit(id))
        }
        DeployCommand::Spell { spell, .. } => {
            if state.army.spell_count(spell) == 0 {
                return Err(DeployRejection::NoSpellsRemaining);
            }
            let housing = spell.housing();
            if state.spell_housing_used + housing > state.army.spell_capacity {
                return Err(DeployRejection::InsufficientSpellCapacity);
            }

            if let Some(count) = state.army.spells.get_mut(&spell) {
                *count -= 1;
            }
            state.spell_housing_used += housing;

            let id = SpellId(state.next_spell_id);
            state.next_spell_id += 1;
            state.spells.push(ActiveSpell::new(id, spell, position));
            state.log_event(
                BattleEventType::SpellCast { spell_id: id, spell },
                format!("{:?} {} cast at ({}, {})", spell, id, position.x, position.y),
            );
            Ok(Deployed::Spell(id))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::profile::{AttackerProfile, OpponentProfile};
    use crate::battle::units::ArmyComposition;
    use crate::core::config::RaidConfig;
    use crate::core::types::{BattleId, PlayerId};
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn state_with(army: ArmyComposition) -> BattleState {
        let defender = OpponentProfile {
            id: PlayerId(-1),
            name: "Empty".into(),
            trophies: 0,
            base_level: 1,
            resources: BTreeMap::new(),
            buildings: Vec::new(),
        };
        let mut state = BattleState::new(
            BattleId::new(),
            AttackerProfile::new(PlayerId(1), 0),
            army,
            defender,
            Arc::new(RaidConfig::default()),
        );
        state.start();
        state
    }

    #[test]
    fn test_deploy_consumes_troop_and_housing() {
        let mut state = state_with(ArmyComposition::new(10, 0).with_troops(TroopType::Giant, 2));
        let result = apply_deployment(&mut state, &DeployCommand::troop(TroopType::Giant, Vec2::new(1.2, 3.7)));
        assert_eq!(result, Ok(Deployed::Unit(UnitId(1))));
        assert_eq!(state.army.troop_count(TroopType::Giant), 1);
        assert_eq!(state.housing_used, 5);
        assert_eq!(state.units[0].position, Vec2::new(1.0, 4.0));
    }

    #[test]
    fn test_housing_exhausted() {
        let mut state = state_with(ArmyComposition::new(6, 0).with_troops(TroopType::Giant, 2));
        let cmd = DeployCommand::troop(TroopType::Giant, Vec2::new(1.0, 1.0));
        assert!(apply_deployment(&mut state, &cmd).is_ok());
        assert_eq!(apply_deployment(&mut state, &cmd), Err(DeployRejection::InsufficientHousing));
        assert_eq!(state.units.len(), 1);
        assert_eq!(state.army.troop_count(TroopType::Giant), 1);
        assert_eq!(state.housing_used, 5);
    }

    #[test]
    fn test_out_of_bounds_rejected_without_mutation() {
        let mut state = state_with(ArmyComposition::new(10, 0).with_troops(TroopType::Barbarian, 1));
        let cmd = DeployCommand::troop(TroopType::Barbarian, Vec2::new(-3.0, 10.0));
        assert_eq!(apply_deployment(&mut state, &cmd), Err(DeployRejection::OutOfBounds));
        assert!(state.units.is_empty());
        assert_eq!(state.army.troop_count(TroopType::Barbarian), 1);
    }

    #[test]
    fn test_missing_troop_type() {
        let mut state = state_with(ArmyComposition::new(10, 0));
        let cmd = DeployCommand::troop(TroopType::Dragon, Vec2::new(1.0, 1.0));
        assert_eq!(apply_deployment(&mut state, &cmd), Err(DeployRejection::NoTroopsRemaining));
    }

    #[test]
    fn test_spell_capacity() {
        let mut state = state_with(ArmyComposition::new(0, 2).with_spells(SpellType::Heal, 2));
        let cmd = DeployCommand::spell(SpellType::Heal, Vec2::new(5.0, 5.0));
        assert_eq!(apply_deployment(&mut state, &cmd), Ok(Deployed::Spell(SpellId(1))));
        assert_eq!(apply_deployment(&mut state, &cmd), Err(DeployRejection::InsufficientSpellCapacity));
        assert_eq!(state.spells.len(), 1);
    }
}
