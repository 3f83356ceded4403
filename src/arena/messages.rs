//! Messages between the arena and its clients

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::battle::buildings::{BuildingSnapshot, BuildingType};
use crate::battle::execution::BattleState;
use crate::battle::orders::{DeployCommand, DeploymentOutcome};
use crate::battle::resolution::BattleResult;
use crate::battle::unit_type::TroopType;
use crate::battle::units::{DeployedUnit, UnitState};
use crate::core::types::{BattleId, BuildingId, Tick, UnitId, Vec2};

/// Sent once a battle request is accepted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleArenaReady {
    pub battle_id: BattleId,
    pub arena_center: Vec2,
    pub arena_size: f32,
    pub buildings: Vec<BuildingSnapshot>,
    pub defender_name: String,
    pub defender_level: u8,
}

impl BattleArenaReady {
    pub fn from_state(state: &BattleState) -> Self {
        Self {
            battle_id: state.id,
            arena_center: state.map.center(),
            arena_size: state.map.size,
            buildings: state.buildings.clone(),
            defender_name: state.defender.name.clone(),
            defender_level: state.defender.base_level,
        }
    }
}

/// An accepted request plus the event stream for it.
///
/// The receiver is subscribed before the battle starts ticking, so no
/// event is missed.
#[derive(Debug)]
pub struct BattleTicket {
    pub ready: BattleArenaReady,
    pub events: broadcast::Receiver<ArenaEvent>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TroopView {
    pub id: UnitId,
    pub troop: TroopType,
    pub position: Vec2,
    pub hp: f32,
    pub state: UnitState,
}

impl From<&DeployedUnit> for TroopView {
    fn from(unit: &DeployedUnit) -> Self {
        Self {
            id: unit.id,
            troop: unit.troop,
            position: unit.position,
            hp: unit.hp,
            state: unit.state,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingView {
    pub id: BuildingId,
    pub kind: BuildingType,
    pub hp: f32,
    pub destroyed: bool,
}

impl From<&BuildingSnapshot> for BuildingView {
    fn from(building: &BuildingSnapshot) -> Self {
        Self {
            id: building.id,
            kind: building.kind,
            hp: building.hp,
            destroyed: building.destroyed,
        }
    }
}

/// Periodic view of a running battle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleStateUpdate {
    pub battle_id: BattleId,
    pub tick: Tick,
    pub destruction: f32,
    pub stars: u8,
    /// Simulated seconds
    pub time_remaining: f32,
    pub troops: Vec<TroopView>,
    pub buildings: Vec<BuildingView>,
    /// Deployments that did not register since the previous update
    pub rejected: Vec<DeploymentOutcome>,
}

impl BattleStateUpdate {
    pub fn capture(state: &BattleState, rejected: Vec<DeploymentOutcome>) -> Self {
        Self {
            battle_id: state.id,
            tick: state.tick,
            destruction: state.destruction,
            stars: state.stars,
            time_remaining: state.time_remaining_secs(),
            troops: state.units.iter().filter(|u| u.is_alive()).map(TroopView::from).collect(),
            buildings: state.buildings.iter().map(BuildingView::from).collect(),
            rejected,
        }
    }
}

/// Everything a battle publishes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ArenaEvent {
    StateUpdate(BattleStateUpdate),
    /// Sent exactly once per battle
    BattleComplete(BattleResult),
}

/// Client input, buffered until the next tick boundary
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ArenaCommand {
    Deploy(DeployCommand),
    Surrender,
    Disconnect,
    ReturnToOverworld,
}
