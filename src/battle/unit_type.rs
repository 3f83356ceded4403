//! Troop types and their default stats

use serde::{Deserialize, Serialize};

use crate::battle::buildings::BuildingCategory;

/// Type of attacking troop
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TroopType {
    Barbarian,
    Archer,
    Giant,
    Goblin,
    Balloon,
    Dragon,
}

/// What a troop walks to first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetPreference {
    Any,
    Defenses,
    Resources,
}

impl TargetPreference {
    pub fn matches(&self, category: BuildingCategory) -> bool {
        match self {
            TargetPreference::Any => true,
            TargetPreference::Defenses => category == BuildingCategory::Defense,
            TargetPreference::Resources => category == BuildingCategory::Resource,
        }
    }
}

/// Default stats for a troop type
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TroopStats {
    pub hp: f32,
    pub dps: f32,
    /// Tiles per second
    pub speed: f32,
    /// Attack range in tiles, measured to the target's footprint edge
    pub range: f32,
    pub housing: u32,
    pub preference: TargetPreference,
    pub is_air: bool,
}

impl TroopType {
    pub const ALL: [TroopType; 6] = [
        TroopType::Barbarian,
        TroopType::Archer,
        TroopType::Giant,
        TroopType::Goblin,
        TroopType::Balloon,
        TroopType::Dragon,
    ];

    pub fn stats(&self) -> TroopStats {
        match self {
            TroopType::Barbarian => TroopStats {
                hp: 100.0,
                dps: 10.0,
                speed: 2.0,
                range: 0.5,
                housing: 1,
                preference: TargetPreference::Any,
                is_air: false,
            },
            TroopType::Archer => TroopStats {
                hp: 40.0,
                dps: 8.0,
                speed: 2.5,
                range: 3.5,
                housing: 1,
                preference: TargetPreference::Any,
                is_air: false,
            },
            TroopType::Giant => TroopStats {
                hp: 1000.0,
                dps: 50.0,
                speed: 1.5,
                range: 1.0,
                housing: 5,
                preference: TargetPreference::Defenses,
                is_air: false,
            },
            TroopType::Goblin => TroopStats {
                hp: 60.0,
                dps: 12.0,
                speed: 4.0,
                range: 0.5,
                housing: 1,
                preference: TargetPreference::Resources,
                is_air: false,
            },
            TroopType::Balloon => TroopStats {
                hp: 400.0,
                dps: 60.0,
                speed: 1.25,
                range: 0.5,
                housing: 5,
                preference: TargetPreference::Defenses,
                is_air: true,
            },
            TroopType::Dragon => TroopStats {
                hp: 1500.0,
                dps: 70.0,
                speed: 2.0,
                range: 2.0,
                housing: 20,
                preference: TargetPreference::Any,
                is_air: true,
            },
        }
    }

    pub fn housing(&self) -> u32 {
        self.stats().housing
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_giant_stats() {
        let giant = TroopType::Giant.stats();
        assert_eq!(giant.hp, 1000.0);
        assert_eq!(giant.dps, 50.0);
        assert_eq!(giant.preference, TargetPreference::Defenses);
    }

    #[test]
    fn test_air_troops() {
        assert!(TroopType::Balloon.stats().is_air);
        assert!(TroopType::Dragon.stats().is_air);
        assert!(!TroopType::Barbarian.stats().is_air);
    }

    #[test]
    fn test_preference_matching() {
        assert!(TargetPreference::Any.matches(BuildingCategory::Other));
        assert!(TargetPreference::Defenses.matches(BuildingCategory::Defense));
        assert!(!TargetPreference::Defenses.matches(BuildingCategory::TownHall));
        assert!(TargetPreference::Resources.matches(BuildingCategory::Resource));
    }

    #[test]
    fn test_all_troops_take_housing() {
        for troop in TroopType::ALL {
            assert!(troop.housing() > 0);
        }
    }
}
