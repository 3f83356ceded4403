//! Defense targeting and fire

use ordered_float::OrderedFloat;

use crate::battle::buildings::BuildingSnapshot;
use crate::battle::constants::per_tick;
use crate::battle::units::DeployedUnit;
use crate::core::types::{BuildingId, UnitId};

/// One defense's fire for one tick
#[derive(Debug, Clone, PartialEq)]
pub struct DefenseShot {
    pub building: BuildingId,
    pub target: UnitId,
    /// Units killed by this shot, primary target included
    pub killed: Vec<UnitId>,
}

/// Index of the nearest live troop this defense can hit, if any.
/// Ties go to the lowest unit id.
pub fn select_defense_target(
    building: &BuildingSnapshot,
    units: &[DeployedUnit],
) -> Option<usize> {
    let profile = building.defense_stats()?;
    let reach = profile.range + building.half_extent();

    units
        .iter()
        .enumerate()
        .filter(|(_, u)| u.is_alive() && profile.domain.can_hit(u.is_air))
        .map(|(idx, u)| (idx, u, building.position.distance(&u.position)))
        .filter(|(_, _, d)| *d <= reach && *d >= profile.min_range)
        .min_by_key(|(_, u, d)| (OrderedFloat(*d), u.id))
        .map(|(idx, _, _)| idx)
}

/// Run one tick of defense AI. Returns `None` when the defense is idle.
pub fn step_defense(building: &BuildingSnapshot, units: &mut [DeployedUnit]) -> Option<DefenseShot> {
    if !building.is_alive() || building.frozen {
        return None;
    }
    let profile = building.defense_stats()?;
    let primary = select_defense_target(building, units)?;

    let damage = per_tick(profile.dps);
    let impact = units[primary].position;
    let target = units[primary].id;
    let mut killed = Vec::new();

    if units[primary].take_damage(damage) {
        killed.push(target);
    }

    if profile.has_splash() {
        let splash = damage * profile.splash_factor;
        for (idx, unit) in units.iter_mut().enumerate() {
            if idx == primary || !unit.is_alive() || !profile.domain.can_hit(unit.is_air) {
                continue;
            }
            if unit.position.distance(&impact) <= profile.splash_radius && unit.take_damage(splash)
            {
                killed.push(unit.id);
            }
        }
    }

    Some(DefenseShot { building: building.id, target, killed })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::buildings::BuildingType;
    use crate::battle::unit_type::TroopType;
    use crate::core::types::Vec2;

    fn unit(id: u32, troop: TroopType, x: f32) -> DeployedUnit {
        DeployedUnit::new(UnitId(id), troop, Vec2::new(x, 0.0))
    }

    fn defense(kind: BuildingType) -> BuildingSnapshot {
        BuildingSnapshot::new(BuildingId(1), kind, 1, Vec2::new(0.0, 0.0))
    }

    #[test]
    fn test_cannon_ignores_air() {
        let cannon = defense(BuildingType::Cannon);
        let units = vec![unit(1, TroopType::Balloon, 3.0), unit(2, TroopType::Barbarian, 6.0)];
        assert_eq!(select_defense_target(&cannon, &units), Some(1));
    }

    #[test]
    fn test_air_defense_ignores_ground() {
        let ad = defense(BuildingType::AirDefense);
        let units = vec![unit(1, TroopType::Barbarian, 2.0)];
        assert_eq!(select_defense_target(&ad, &units), None);
    }

    #[test]
    fn test_out_of_range_is_idle() {
        let cannon = defense(BuildingType::Cannon);
        let mut units = vec![unit(1, TroopType::Barbarian, 30.0)];
        assert!(step_defense(&cannon, &mut units).is_none());
        assert_eq!(units[0].hp, units[0].max_hp);
    }

    #[test]
    fn test_mortar_minimum_range() {
        let mortar = defense(BuildingType::Mortar);
        let units = vec![unit(1, TroopType::Barbarian, 2.0), unit(2, TroopType::Barbarian, 8.0)];
        assert_eq!(select_defense_target(&mortar, &units), Some(1));
    }

    #[test]
    fn test_frozen_defense_holds_fire() {
        let mut cannon = defense(BuildingType::Cannon);
        cannon.frozen = true;
        let mut units = vec![unit(1, TroopType::Barbarian, 3.0)];
        assert!(step_defense(&cannon, &mut units).is_none());
    }

    #[test]
    fn test_splash_hits_neighbours_for_less() {
        let wizard = defense(BuildingType::WizardTower);
        let mut units = vec![
            unit(1, TroopType::Giant, 3.0),
            unit(2, TroopType::Giant, 3.5),
            unit(3, TroopType::Giant, 6.0),
        ];
        let shot = step_defense(&wizard, &mut units).expect("wizard tower should fire");
        assert_eq!(shot.target, UnitId(1));
        let primary_loss = units[0].max_hp - units[0].hp;
        let splash_loss = units[1].max_hp - units[1].hp;
        assert!(primary_loss > splash_loss);
        assert!(splash_loss > 0.0);
        assert_eq!(units[2].hp, units[2].max_hp);
    }

    #[test]
    fn test_kill_reported() {
        let cannon = defense(BuildingType::Cannon);
        let mut units = vec![unit(1, TroopType::Archer, 3.0)];
        units[0].hp = 1.0;
        let shot = step_defense(&cannon, &mut units).expect("cannon should fire");
        assert_eq!(shot.killed, vec![UnitId(1)]);
        assert!(!units[0].is_alive());
    }
}
