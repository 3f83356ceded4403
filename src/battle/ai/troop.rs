//! Troop targeting, movement and attack

use ordered_float::OrderedFloat;

use crate::battle::buildings::BuildingSnapshot;
use crate::battle::constants::per_tick;
use crate::battle::units::{DeployedUnit, UnitState};
use crate::core::types::BuildingId;

/// Gaps smaller than this count as "in range", so float error can't
/// leave a troop creeping toward its target forever.
const RANGE_EPSILON: f32 = 1e-3;

/// What a troop did this tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TroopAction {
    /// Dead, or nothing left to attack
    Idle,
    Moved { target: BuildingId },
    Attacked { target: BuildingId, destroyed: bool },
}

fn nearest<'a>(
    unit: &DeployedUnit,
    candidates: impl Iterator<Item = &'a BuildingSnapshot>,
) -> Option<BuildingId> {
    candidates
        .min_by_key(|b| (OrderedFloat(b.edge_distance(unit.position)), b.id))
        .map(|b| b.id)
}

/// Nearest live building matching the troop's preference.
///
/// Falls back to the nearest live building of any kind once nothing of
/// the preferred category is left standing.
pub fn select_troop_target(
    unit: &DeployedUnit,
    buildings: &[BuildingSnapshot],
) -> Option<BuildingId> {
    let preference = unit.troop.stats().preference;
    nearest(
        unit,
        buildings
            .iter()
            .filter(|b| b.is_alive() && preference.matches(b.category())),
    )
    .or_else(|| nearest(unit, buildings.iter().filter(|b| b.is_alive())))
}

fn live_index(buildings: &[BuildingSnapshot], id: BuildingId) -> Option<usize> {
    buildings
        .binary_search_by_key(&id, |b| b.id)
        .ok()
        .filter(|&idx| buildings[idx].is_alive())
}

/// Run one tick of troop AI.
///
/// `buildings` must be sorted by id. `revision` changes whenever the set
/// of live buildings changes; an idle troop skips its scan until then.
pub fn step_troop(
    unit: &mut DeployedUnit,
    buildings: &mut [BuildingSnapshot],
    revision: u64,
) -> TroopAction {
    if !unit.is_alive() {
        return TroopAction::Idle;
    }

    let idx = match unit.target.and_then(|id| live_index(buildings, id)) {
        Some(idx) => idx,
        None => {
            unit.target = None;
            unit.state = UnitState::Seeking;
            if unit.idle_at_revision == Some(revision) {
                return TroopAction::Idle;
            }
            let found = select_troop_target(unit, buildings)
                .and_then(|id| live_index(buildings, id));
            match found {
                Some(idx) => {
                    unit.target = Some(buildings[idx].id);
                    unit.idle_at_revision = None;
                    idx
                }
                None => {
                    unit.idle_at_revision = Some(revision);
                    return TroopAction::Idle;
                }
            }
        }
    };

    let building = &mut buildings[idx];
    let gap = building.edge_distance(unit.position) - unit.range;

    if gap > RANGE_EPSILON {
        unit.state = UnitState::Seeking;
        let step = per_tick(unit.effective_speed()).min(gap);
        let direction = (building.position - unit.position).normalize();
        unit.position = unit.position + direction * step;
        return TroopAction::Moved { target: building.id };
    }

    unit.state = UnitState::Attacking;
    let destroyed = building.take_damage(per_tick(unit.effective_dps()));
    if destroyed {
        unit.target = None;
        unit.state = UnitState::Seeking;
    }
    TroopAction::Attacked { target: building.id, destroyed }
}
