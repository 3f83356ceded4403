//! Battle execution loop
//!
//! Each tick: deploy -> troops -> defenses -> spells -> destruction ->
//! termination -> clock. The order is part of the replay contract.

use std::collections::VecDeque;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::battle::ai::{step_defense, step_troop, TroopAction};
use crate::battle::battle_map::BattleMap;
use crate::battle::buildings::{BuildingSnapshot, BuildingType};
use crate::battle::constants::{BATTLE_DURATION_TICKS, MAX_STARS, TICKS_PER_SECOND};
use crate::battle::orders::{apply_deployment, DeployCommand, DeployRejection, DeploymentOutcome};
use crate::battle::profile::{AttackerProfile, OpponentProfile};
use crate::battle::replay::RecordedDeployment;
use crate::battle::resolution::{calculate_results, defeat_result, star_tier, BattleResult};
use crate::battle::spells::{ActiveSpell, SpellEffect, SpellType};
use crate::battle::unit_type::TroopType;
use crate::battle::units::{ArmyComposition, DeployedUnit, UnitModifiers};
use crate::core::config::RaidConfig;
use crate::core::types::{BattleId, BuildingId, SpellId, Tick, UnitId};

/// Battle phases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BattlePhase {
    #[default]
    Initializing,
    Active,
    Concluding,
    Terminal,
}

/// Why a battle stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TerminationReason {
    AllBuildingsDestroyed,
    AttackerExhausted,
    TimeExpired,
    Abandoned,
}

/// Log entry for battle events
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BattleEvent {
    pub tick: Tick,
    pub event_type: BattleEventType,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BattleEventType {
    BattleStarted,
    TroopDeployed { unit_id: UnitId, troop: TroopType },
    SpellCast { spell_id: SpellId, spell: SpellType },
    DeploymentRejected { reason: DeployRejection },
    BuildingDestroyed { building_id: BuildingId, kind: BuildingType },
    UnitDied { unit_id: UnitId },
    StarEarned { stars: u8 },
    BattleConcluded { reason: TerminationReason },
}

/// Log of events from a single tick
#[derive(Debug, Clone, Default)]
pub struct BattleEventLog {
    pub events: Vec<BattleEvent>,
}

impl BattleEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event_type: BattleEventType, description: String, tick: Tick) {
        self.events.push(BattleEvent { tick, event_type, description });
    }
}

/// Everything one call to [`BattleState::run_tick`] produced
#[derive(Debug, Clone, Default)]
pub struct TickReport {
    pub tick: Tick,
    pub deployments: Vec<DeploymentOutcome>,
    pub events: BattleEventLog,
    /// Set on the tick the battle concluded
    pub result: Option<BattleResult>,
}

/// Complete, authoritative battle state
#[derive(Debug, Clone)]
pub struct BattleState {
    pub id: BattleId,
    pub attacker: AttackerProfile,
    pub defender: OpponentProfile,
    pub map: BattleMap,
    pub rules: Arc<RaidConfig>,

    // Attacker resources left to deploy
    pub army: ArmyComposition,
    pub housing_used: u32,
    pub spell_housing_used: u32,

    // Time
    pub phase: BattlePhase,
    pub tick: Tick,
    pub remaining_ticks: u32,

    // Score, both monotonic
    pub destruction: f32,
    pub stars: u8,

    // Live collections
    pub buildings: Vec<BuildingSnapshot>,
    pub units: Vec<DeployedUnit>,
    pub spells: Vec<ActiveSpell>,

    // Bookkeeping
    pub next_unit_id: u32,
    pub next_spell_id: u32,
    pub building_revision: u64,
    pub troops_lost: u32,
    pub termination: Option<TerminationReason>,
    /// Phase the attacker left in, for abandoned battles
    pub abandoned_in: Option<BattlePhase>,
    pub result: Option<BattleResult>,
    pub accepted: Vec<RecordedDeployment>,
    pending: VecDeque<DeployCommand>,
    tick_events: BattleEventLog,

    // Log
    pub battle_log: Vec<BattleEvent>,
}

impl BattleState {
    pub fn new(
        id: BattleId,
        attacker: AttackerProfile,
        army: ArmyComposition,
        defender: OpponentProfile,
        rules: Arc<RaidConfig>,
    ) -> Self {
        let mut buildings = defender.buildings.clone();
        buildings.sort_by_key(|b| b.id);
        let map = BattleMap::new(rules.battle.arena_size);

        Self {
            id,
            attacker,
            defender,
            map,
            rules,
            army,
            housing_used: 0,
            spell_housing_used: 0,
            phase: BattlePhase::Initializing,
            tick: 0,
            remaining_ticks: BATTLE_DURATION_TICKS,
            destruction: 0.0,
            stars: 0,
            buildings,
            units: Vec::new(),
            spells: Vec::new(),
            next_unit_id: 1,
            next_spell_id: 1,
            building_revision: 0,
            troops_lost: 0,
            termination: None,
            abandoned_in: None,
            result: None,
            accepted: Vec::new(),
            pending: VecDeque::new(),
            tick_events: BattleEventLog::new(),
            battle_log: Vec::new(),
        }
    }

    /// Is the battle finished?
    pub fn is_finished(&self) -> bool {
        matches!(self.phase, BattlePhase::Terminal)
    }

    pub fn is_active(&self) -> bool {
        matches!(self.phase, BattlePhase::Active)
    }

    /// Simulated seconds left on the clock
    pub fn time_remaining_secs(&self) -> f32 {
        self.remaining_ticks as f32 / TICKS_PER_SECOND as f32
    }

    /// Simulated seconds played so far
    pub fn elapsed_secs(&self) -> f32 {
        self.tick as f32 / TICKS_PER_SECOND as f32
    }

    pub fn town_hall_destroyed(&self) -> bool {
        self.buildings
            .iter()
            .any(|b| b.kind == BuildingType::TownHall && b.destroyed)
    }

    pub fn buildings_destroyed(&self) -> u32 {
        self.buildings.iter().filter(|b| b.destroyed).count() as u32
    }

    pub fn live_units(&self) -> usize {
        self.units.iter().filter(|u| u.is_alive()).count()
    }

    pub fn get_building(&self, id: BuildingId) -> Option<&BuildingSnapshot> {
        self.buildings
            .binary_search_by_key(&id, |b| b.id)
            .ok()
            .map(|idx| &self.buildings[idx])
    }

    pub fn get_unit(&self, id: UnitId) -> Option<&DeployedUnit> {
        self.units.iter().find(|u| u.id == id)
    }

    /// Start the battle: set the clock and clear live collections
    pub fn start(&mut self) {
        if self.phase != BattlePhase::Initializing {
            return;
        }
        self.remaining_ticks = BATTLE_DURATION_TICKS;
        self.tick = 0;
        self.units.clear();
        self.spells.clear();
        self.pending.clear();
        self.phase = BattlePhase::Active;
        self.log_event(
            BattleEventType::BattleStarted,
            format!("Battle {} against {} begins", self.id, self.defender.name),
        );
        tracing::info!(
            battle_id = %self.id,
            attacker = %self.attacker.id,
            defender = %self.defender.id,
            buildings = self.buildings.len(),
            "Battle started"
        );
    }

    /// Buffer a deployment for the next tick boundary
    pub fn queue_deployment(&mut self, command: DeployCommand) -> Result<(), DeployRejection> {
        if !self.is_active() {
            tracing::warn!(battle_id = %self.id, phase = ?self.phase, "Deployment after battle end dropped");
            return Err(DeployRejection::BattleNotActive);
        }
        self.pending.push_back(command);
        Ok(())
    }

    /// Log a battle event
    pub fn log_event(&mut self, event_type: BattleEventType, description: String) {
        let event = BattleEvent { tick: self.tick, event_type, description };
        self.tick_events.events.push(event.clone());
        self.battle_log.push(event);
    }

    /// Can the attacker still put anything on the field?
    pub fn can_deploy_more(&self) -> bool {
        let housing_left = self.army.housing_capacity.saturating_sub(self.housing_used);
        let spell_room = self.army.spell_capacity.saturating_sub(self.spell_housing_used);

        let troop_fits = self
            .army
            .troops
            .iter()
            .any(|(troop, &count)| count > 0 && troop.housing() <= housing_left);
        let spell_fits = self
            .army
            .spells
            .iter()
            .any(|(spell, &count)| count > 0 && spell.housing() <= spell_room);

        troop_fits || spell_fits
    }

    /// Run a complete battle tick
    pub fn run_tick(&mut self) -> TickReport {
        if !self.is_active() {
            return TickReport { tick: self.tick, ..TickReport::default() };
        }

        let tick = self.tick;

        // ===== 1: DEPLOY =====
        let deployments = self.phase_deploy();

        // ===== 2: TROOPS =====
        self.phase_troops();

        // ===== 3: DEFENSES =====
        self.phase_defenses();

        // ===== 4: SPELLS =====
        self.phase_spells();

        // ===== 5: DESTRUCTION =====
        self.phase_destruction();

        // ===== 6: TERMINATION =====
        self.phase_termination();

        // ===== 7: CLOCK =====
        self.remaining_ticks = self.remaining_ticks.saturating_sub(1);
        self.tick += 1;

        let result = if self.phase == BattlePhase::Concluding {
            Some(self.finalize())
        } else {
            None
        };

        TickReport {
            tick,
            deployments,
            events: std::mem::take(&mut self.tick_events),
            result,
        }
    }

    /// Tick until the battle produces its result
    pub fn run_to_completion(&mut self) -> BattleResult {
        if self.phase == BattlePhase::Initializing {
            self.start();
        }
        loop {
            if let Some(result) = &self.result {
                return result.clone();
            }
            self.run_tick();
        }
    }

    /// Surrender or disconnect.
    ///
    /// A battle that never started is a full defeat; otherwise the result
    /// reflects the last state reached.
    pub fn abandon(&mut self) -> BattleResult {
        if let Some(result) = &self.result {
            return result.clone();
        }

        self.termination = Some(TerminationReason::Abandoned);
        self.abandoned_in = Some(self.phase);
        self.pending.clear();
        let result = if self.phase == BattlePhase::Initializing {
            defeat_result(self)
        } else {
            self.phase = BattlePhase::Concluding;
            calculate_results(self)
        };

        self.log_event(
            BattleEventType::BattleConcluded { reason: TerminationReason::Abandoned },
            "Attacker left the battle".into(),
        );
        tracing::info!(battle_id = %self.id, destruction = result.destruction, "Battle abandoned");

        self.phase = BattlePhase::Terminal;
        self.result = Some(result.clone());
        result
    }

    fn phase_deploy(&mut self) -> Vec<DeploymentOutcome> {
        let mut outcomes = Vec::with_capacity(self.pending.len());

        while let Some(command) = self.pending.pop_front() {
            let result = apply_deployment(self, &command);
            match &result {
                Ok(_) => {
                    tracing::debug!(battle_id = %self.id, tick = self.tick, ?command, "Deployment accepted");
                    self.accepted.push(RecordedDeployment { tick: self.tick, command });
                }
                Err(reason) => {
                    tracing::warn!(battle_id = %self.id, tick = self.tick, ?command, %reason, "Deployment rejected");
                    self.log_event(
                        BattleEventType::DeploymentRejected { reason: *reason },
                        format!("Deployment rejected: {}", reason),
                    );
                }
            }
            outcomes.push(DeploymentOutcome { command, result });
        }

        outcomes
    }

    fn phase_troops(&mut self) {
        let revision = self.building_revision;
        let mut destroyed = Vec::new();

        for unit in self.units.iter_mut().filter(|u| u.is_alive()) {
            if let TroopAction::Attacked { target, destroyed: true } =
                step_troop(unit, &mut self.buildings, revision)
            {
                destroyed.push(target);
            }
        }

        for id in destroyed {
            self.on_building_destroyed(id);
        }
    }

    fn phase_defenses(&mut self) {
        let mut killed = Vec::new();

        for building in self.buildings.iter().filter(|b| b.is_alive() && b.is_defense()) {
            if let Some(shot) = step_defense(building, &mut self.units) {
                killed.extend(shot.killed);
            }
        }

        for id in killed {
            self.troops_lost += 1;
            self.log_event(BattleEventType::UnitDied { unit_id: id }, format!("{} died", id));
        }
    }

    fn phase_spells(&mut self) {
        for unit in &mut self.units {
            unit.modifiers = UnitModifiers::default();
        }
        for building in &mut self.buildings {
            building.frozen = false;
        }

        let mut destroyed = Vec::new();

        for spell in &mut self.spells {
            match spell.current_effect() {
                SpellEffect::None => {}
                SpellEffect::DamageBuildings(amount) => {
                    for building in self.buildings.iter_mut().filter(|b| b.is_alive()) {
                        if building.edge_distance(spell.origin) <= spell.radius
                            && building.take_damage(amount)
                        {
                            destroyed.push(building.id);
                        }
                    }
                }
                SpellEffect::HealUnits(amount) => {
                    for unit in self.units.iter_mut().filter(|u| u.is_alive()) {
                        if spell.covers(unit.position) {
                            unit.heal(amount);
                        }
                    }
                }
                SpellEffect::Boost { damage, speed } => {
                    for unit in self.units.iter_mut().filter(|u| u.is_alive()) {
                        if spell.covers(unit.position) {
                            // Overlapping boosts don't stack
                            unit.modifiers.damage = unit.modifiers.damage.max(damage);
                            unit.modifiers.speed = unit.modifiers.speed.max(speed);
                        }
                    }
                }
                SpellEffect::FreezeDefenses => {
                    for building in self.buildings.iter_mut().filter(|b| b.is_alive()) {
                        if building.is_defense() && building.edge_distance(spell.origin) <= spell.radius {
                            building.frozen = true;
                        }
                    }
                }
            }
            spell.advance();
        }

        self.spells.retain(|s| !s.is_expired());

        for id in destroyed {
            self.on_building_destroyed(id);
        }
    }

    fn phase_destruction(&mut self) {
        let total: f32 = self.buildings.iter().map(|b| b.max_hp).sum();
        let lost: f32 = self.buildings.iter().map(|b| b.hp_lost()).sum();

        let computed = if total > 0.0 { (lost / total * 100.0).clamp(0.0, 100.0) } else { 100.0 };
        self.destruction = self.destruction.max(computed);
        self.update_stars();
    }

    fn phase_termination(&mut self) {
        let reason = if self.buildings.iter().all(|b| b.destroyed) {
            self.destruction = 100.0;
            self.update_stars();
            Some(TerminationReason::AllBuildingsDestroyed)
        } else if self.live_units() == 0 && self.spells.is_empty() && !self.can_deploy_more() {
            Some(TerminationReason::AttackerExhausted)
        } else if self.remaining_ticks <= 1 {
            // This tick consumes the last interval on the clock
            Some(TerminationReason::TimeExpired)
        } else {
            None
        };

        if let Some(reason) = reason {
            self.termination = Some(reason);
            self.phase = BattlePhase::Concluding;
            self.pending.clear();
            self.log_event(
                BattleEventType::BattleConcluded { reason },
                format!("Battle concluding: {:?}", reason),
            );
        }
    }

    fn finalize(&mut self) -> BattleResult {
        let result = calculate_results(self);
        tracing::info!(
            battle_id = %self.id,
            destruction = result.destruction,
            stars = result.stars,
            victory = result.victory,
            reason = ?self.termination,
            "Battle concluded"
        );
        self.phase = BattlePhase::Terminal;
        self.result = Some(result.clone());
        result
    }

    fn on_building_destroyed(&mut self, id: BuildingId) {
        self.building_revision += 1;
        if let Some(kind) = self.get_building(id).map(|b| b.kind) {
            tracing::debug!(battle_id = %self.id, building = %id, ?kind, "Building destroyed");
            self.log_event(
                BattleEventType::BuildingDestroyed { building_id: id, kind },
                format!("{:?} {} destroyed", kind, id),
            );
        }
    }

    fn update_stars(&mut self) {
        let tier = star_tier(self.destruction, self.town_hall_destroyed(), &self.rules.battle);
        if tier > self.stars {
            self.stars = tier.min(MAX_STARS);
            let stars = self.stars;
            self.log_event(BattleEventType::StarEarned { stars }, format!("Star {} earned", stars));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::{PlayerId, Vec2};
    use std::collections::BTreeMap;

    fn lone_town_hall() -> OpponentProfile {
        OpponentProfile {
            id: PlayerId(-1),
            name: "Test Base".into(),
            trophies: 100,
            base_level: 1,
            resources: BTreeMap::new(),
            buildings: vec![BuildingSnapshot::new(
                BuildingId(1),
                BuildingType::TownHall,
                1,
                Vec2::new(22.0, 22.0),
            )],
        }
    }

    fn new_state(army: ArmyComposition) -> BattleState {
        BattleState::new(
            BattleId::new(),
            AttackerProfile::new(PlayerId(1), 100),
            army,
            lone_town_hall(),
            Arc::new(RaidConfig::default()),
        )
    }

    #[test]
    fn test_starts_initializing() {
        let state = new_state(ArmyComposition::new(10, 0));
        assert_eq!(state.phase, BattlePhase::Initializing);
        assert_eq!(state.time_remaining_secs(), 180.0);
    }

    #[test]
    fn test_queue_rejected_before_start() {
        let mut state = new_state(ArmyComposition::new(10, 0).with_troops(TroopType::Barbarian, 1));
        let cmd = DeployCommand::troop(TroopType::Barbarian, Vec2::new(1.0, 1.0));
        assert_eq!(state.queue_deployment(cmd), Err(DeployRejection::BattleNotActive));
    }

    #[test]
    fn test_tick_before_start_is_noop() {
        let mut state = new_state(ArmyComposition::new(10, 0));
        let report = state.run_tick();
        assert!(report.result.is_none());
        assert_eq!(state.tick, 0);
    }

    #[test]
    fn test_clock_counts_down_by_whole_ticks() {
        let mut state =
            new_state(ArmyComposition::new(10, 0).with_troops(TroopType::Barbarian, 1));
        state.start();
        for _ in 0..25 {
            state.run_tick();
        }
        assert_eq!(state.remaining_ticks, BATTLE_DURATION_TICKS - 25);
        assert_eq!(state.tick, 25);
    }

    #[test]
    fn test_empty_army_concludes_immediately() {
        let mut state = new_state(ArmyComposition::new(10, 0));
        state.start();
        let report = state.run_tick();
        let result = report.result.expect("exhausted attacker should conclude");
        assert_eq!(state.termination, Some(TerminationReason::AttackerExhausted));
        assert_eq!(result.stars, 0);
        assert!(state.is_finished());
    }

    #[test]
    fn test_abandon_before_start_is_full_defeat() {
        let mut state = new_state(ArmyComposition::new(10, 0).with_troops(TroopType::Giant, 1));
        let result = state.abandon();
        assert!(!result.victory);
        assert!(result.abandoned);
        assert_eq!(result.destruction, 0.0);
        assert!(result.trophy_delta < 0);
        assert_eq!(state.phase, BattlePhase::Terminal);
    }

    #[test]
    fn test_result_produced_once() {
        let mut state = new_state(ArmyComposition::new(10, 0).with_troops(TroopType::Giant, 1));
        state.start();
        state
            .queue_deployment(DeployCommand::troop(TroopType::Giant, Vec2::new(19.0, 22.0)))
            .expect("active battle accepts deployments");
        let first = state.run_to_completion();
        let report = state.run_tick();
        assert!(report.result.is_none());
        assert_eq!(state.abandon(), first);
    }

    #[test]
    fn test_rage_boosts_units_in_radius() {
        let mut state = new_state(
            ArmyComposition::new(10, 2)
                .with_troops(TroopType::Barbarian, 1)
                .with_spells(SpellType::Rage, 1),
        );
        state.start();
        state
            .queue_deployment(DeployCommand::troop(TroopType::Barbarian, Vec2::new(2.0, 2.0)))
            .expect("deploy");
        state
            .queue_deployment(DeployCommand::spell(SpellType::Rage, Vec2::new(2.0, 2.0)))
            .expect("cast");
        state.run_tick();
        assert!(state.units[0].modifiers.damage > 1.0);
        assert!(state.units[0].modifiers.speed > 1.0);
    }

    #[test]
    fn test_lightning_damages_buildings() {
        let mut state = new_state(ArmyComposition::new(0, 1).with_spells(SpellType::Lightning, 1));
        state.start();
        state
            .queue_deployment(DeployCommand::spell(SpellType::Lightning, Vec2::new(22.0, 22.0)))
            .expect("cast");
        for _ in 0..3 {
            state.run_tick();
        }
        let th = state.get_building(BuildingId(1)).expect("town hall present");
        assert_eq!(th.hp, 500.0 - 450.0);
        assert!(state.destruction > 0.0);
        assert!(state.spells.is_empty());
    }
}
