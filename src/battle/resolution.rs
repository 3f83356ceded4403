//! Battle result calculation
//!
//! Pure functions from a finished [`BattleState`] to a [`BattleResult`].
//! Nothing here reads the clock or any RNG.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::battle::constants::MAX_STARS;
use crate::battle::execution::{BattleState, TerminationReason};
use crate::core::config::{BattleConfig, LootConfig, TrophyConfig};
use crate::core::types::{BattleId, PlayerId, ResourceType};

/// Final, immutable outcome of one battle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleResult {
    pub battle_id: BattleId,
    pub attacker_id: PlayerId,
    pub defender_id: PlayerId,
    pub victory: bool,
    /// Displayed destruction, town hall bonus included
    pub destruction: f32,
    pub stars: u8,
    pub loot: BTreeMap<ResourceType, u64>,
    pub trophy_delta: i32,
    pub defender_trophy_delta: i32,
    pub troops_lost: u32,
    pub buildings_destroyed: u32,
    pub town_hall_destroyed: bool,
    /// Simulated seconds played
    pub duration_secs: f32,
    pub abandoned: bool,
}

/// Stars earned for a destruction level
pub fn star_tier(destruction: f32, town_hall_destroyed: bool, config: &BattleConfig) -> u8 {
    if town_hall_destroyed || destruction >= 100.0 {
        MAX_STARS
    } else if destruction >= config.two_star_threshold {
        2
    } else if destruction >= config.one_star_threshold {
        1
    } else {
        0
    }
}

/// Destruction shown to players: the town hall adds a flat bonus
pub fn displayed_destruction(
    destruction: f32,
    town_hall_destroyed: bool,
    config: &BattleConfig,
) -> f32 {
    let shown = if town_hall_destroyed {
        destruction + config.town_hall_bonus
    } else {
        destruction
    };
    shown.clamp(0.0, 100.0)
}

/// Loot taken from each resource in the defender's reserve
pub fn calculate_loot(
    reserve: &BTreeMap<ResourceType, u64>,
    destruction: f32,
    config: &LootConfig,
) -> BTreeMap<ResourceType, u64> {
    let fraction = f64::from(config.available_fraction(destruction));
    reserve
        .iter()
        .map(|(&resource, &amount)| (resource, (amount as f64 * fraction).floor() as u64))
        .collect()
}

/// Trophies won (positive) or lost (negative) by the attacker.
///
/// Offers grow when the defender out-ranks the attacker and shrink when
/// the attacker punches down. The defender receives the negation.
pub fn trophy_exchange(
    attacker_trophies: i32,
    defender_trophies: i32,
    stars: u8,
    config: &TrophyConfig,
) -> i32 {
    let diff = (i64::from(defender_trophies) - i64::from(attacker_trophies)) as f32;
    let shift = (diff * config.difference_scale).round() as i32;

    if stars == 0 {
        let loss_offer = (config.base_offer - shift).clamp(config.min_offer, config.max_offer);
        return -loss_offer;
    }

    let win_offer = (config.base_offer + shift).clamp(config.min_offer, config.max_offer);
    (win_offer as f32 * f32::from(stars.min(MAX_STARS)) / f32::from(MAX_STARS)).round() as i32
}

/// Convert a concluded battle into its result
pub fn calculate_results(state: &BattleState) -> BattleResult {
    let rules = &state.rules;
    let town_hall_destroyed = state.town_hall_destroyed();
    let destruction =
        displayed_destruction(state.destruction, town_hall_destroyed, &rules.battle);
    let stars = state.stars;
    let trophy_delta =
        trophy_exchange(state.attacker.trophies, state.defender.trophies, stars, &rules.trophies);

    BattleResult {
        battle_id: state.id,
        attacker_id: state.attacker.id,
        defender_id: state.defender.id,
        victory: stars >= 1,
        destruction,
        stars,
        loot: calculate_loot(&state.defender.resources, destruction, &rules.loot),
        trophy_delta,
        defender_trophy_delta: -trophy_delta,
        troops_lost: state.troops_lost,
        buildings_destroyed: state.buildings_destroyed(),
        town_hall_destroyed,
        duration_secs: state.elapsed_secs(),
        abandoned: state.termination == Some(TerminationReason::Abandoned),
    }
}

/// Result for a battle abandoned before it started
pub fn defeat_result(state: &BattleState) -> BattleResult {
    let trophy_delta =
        trophy_exchange(state.attacker.trophies, state.defender.trophies, 0, &state.rules.trophies);

    BattleResult {
        battle_id: state.id,
        attacker_id: state.attacker.id,
        defender_id: state.defender.id,
        victory: false,
        destruction: 0.0,
        stars: 0,
        loot: ResourceType::ALL.iter().map(|&r| (r, 0)).collect(),
        trophy_delta,
        defender_trophy_delta: -trophy_delta,
        troops_lost: 0,
        buildings_destroyed: 0,
        town_hall_destroyed: false,
        duration_secs: 0.0,
        abandoned: true,
    }
}
