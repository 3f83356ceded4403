//! Defender buildings and their per-type stats

use serde::{Deserialize, Serialize};

use crate::battle::constants::level_multiplier;
use crate::core::types::{BuildingId, Vec2};

/// Type of building
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BuildingType {
    TownHall,

    // Defenses
    Cannon,
    ArcherTower,
    Mortar,
    AirDefense,
    WizardTower,

    // Resources
    GoldMine,
    ElixirCollector,
    GoldStorage,
    ElixirStorage,

    // Everything else
    ArmyCamp,
    Barracks,
}

/// Coarse grouping used by troop target preferences
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuildingCategory {
    TownHall,
    Defense,
    Resource,
    Other,
}

/// Which troops a defense can shoot at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetDomain {
    Ground,
    Air,
    Both,
}

impl TargetDomain {
    pub fn can_hit(&self, is_air: bool) -> bool {
        match self {
            TargetDomain::Ground => !is_air,
            TargetDomain::Air => is_air,
            TargetDomain::Both => true,
        }
    }
}

/// Combat stats of a defensive building at level 1
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DefenseProfile {
    pub range: f32,
    pub min_range: f32,
    pub dps: f32,
    pub domain: TargetDomain,
    /// Radius around the primary target that also takes damage
    pub splash_radius: f32,
    /// Share of the primary damage dealt to splashed troops
    pub splash_factor: f32,
}

impl DefenseProfile {
    fn single(range: f32, dps: f32, domain: TargetDomain) -> Self {
        Self { range, min_range: 0.0, dps, domain, splash_radius: 0.0, splash_factor: 0.0 }
    }

    pub fn has_splash(&self) -> bool {
        self.splash_radius > 0.0 && self.splash_factor > 0.0
    }
}

impl BuildingType {
    pub const ALL: [BuildingType; 12] = [
        BuildingType::TownHall,
        BuildingType::Cannon,
        BuildingType::ArcherTower,
        BuildingType::Mortar,
        BuildingType::AirDefense,
        BuildingType::WizardTower,
        BuildingType::GoldMine,
        BuildingType::ElixirCollector,
        BuildingType::GoldStorage,
        BuildingType::ElixirStorage,
        BuildingType::ArmyCamp,
        BuildingType::Barracks,
    ];

    pub fn category(&self) -> BuildingCategory {
        match self {
            BuildingType::TownHall => BuildingCategory::TownHall,
            BuildingType::Cannon
            | BuildingType::ArcherTower
            | BuildingType::Mortar
            | BuildingType::AirDefense
            | BuildingType::WizardTower => BuildingCategory::Defense,
            BuildingType::GoldMine
            | BuildingType::ElixirCollector
            | BuildingType::GoldStorage
            | BuildingType::ElixirStorage => BuildingCategory::Resource,
            BuildingType::ArmyCamp | BuildingType::Barracks => BuildingCategory::Other,
        }
    }

    /// Hit points at level 1
    pub fn base_hp(&self) -> f32 {
        match self {
            BuildingType::TownHall => 500.0,
            BuildingType::Cannon => 400.0,
            BuildingType::ArcherTower => 380.0,
            BuildingType::Mortar => 400.0,
            BuildingType::AirDefense => 800.0,
            BuildingType::WizardTower => 620.0,
            BuildingType::GoldMine => 400.0,
            BuildingType::ElixirCollector => 400.0,
            BuildingType::GoldStorage => 600.0,
            BuildingType::ElixirStorage => 600.0,
            BuildingType::ArmyCamp => 250.0,
            BuildingType::Barracks => 250.0,
        }
    }

    /// Footprint edge length in tiles (footprints are square)
    pub fn footprint(&self) -> f32 {
        match self {
            BuildingType::TownHall => 4.0,
            BuildingType::ArmyCamp => 5.0,
            _ => 3.0,
        }
    }

    pub fn defense(&self) -> Option<DefenseProfile> {
        match self {
            BuildingType::Cannon => Some(DefenseProfile::single(9.0, 20.0, TargetDomain::Ground)),
            BuildingType::ArcherTower => {
                Some(DefenseProfile::single(10.0, 15.0, TargetDomain::Both))
            }
            BuildingType::Mortar => Some(DefenseProfile {
                range: 11.0,
                min_range: 4.0,
                dps: 10.0,
                domain: TargetDomain::Ground,
                splash_radius: 1.5,
                splash_factor: 0.5,
            }),
            BuildingType::AirDefense => Some(DefenseProfile::single(10.0, 60.0, TargetDomain::Air)),
            BuildingType::WizardTower => Some(DefenseProfile {
                range: 7.0,
                min_range: 0.0,
                dps: 18.0,
                domain: TargetDomain::Both,
                splash_radius: 1.0,
                splash_factor: 0.6,
            }),
            _ => None,
        }
    }

    /// Lowest base level at which this building appears in a generated base
    pub fn unlock_level(&self) -> u8 {
        match self {
            BuildingType::Mortar => 3,
            BuildingType::AirDefense => 4,
            BuildingType::WizardTower => 5,
            _ => 1,
        }
    }
}

/// A defender building as captured for one battle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildingSnapshot {
    pub id: BuildingId,
    pub kind: BuildingType,
    pub level: u8,
    /// Footprint center
    pub position: Vec2,
    pub hp: f32,
    pub max_hp: f32,
    pub destroyed: bool,
    /// Set each tick by freeze effects
    #[serde(skip)]
    pub frozen: bool,
}

impl BuildingSnapshot {
    /// Fresh, undamaged building with hit points derived from its level
    pub fn new(id: BuildingId, kind: BuildingType, level: u8, position: Vec2) -> Self {
        let max_hp = kind.base_hp() * level_multiplier(level);
        Self {
            id,
            kind,
            level: level.max(1),
            position,
            hp: max_hp,
            max_hp,
            destroyed: false,
            frozen: false,
        }
    }

    pub fn is_alive(&self) -> bool {
        !self.destroyed
    }

    pub fn category(&self) -> BuildingCategory {
        self.kind.category()
    }

    pub fn is_defense(&self) -> bool {
        self.kind.defense().is_some()
    }

    /// Half the footprint, i.e. distance from center to edge
    pub fn half_extent(&self) -> f32 {
        self.kind.footprint() / 2.0
    }

    /// Distance from a point to this building's footprint edge
    pub fn edge_distance(&self, from: Vec2) -> f32 {
        (self.position.distance(&from) - self.half_extent()).max(0.0)
    }

    /// Level-scaled defense stats
    pub fn defense_stats(&self) -> Option<DefenseProfile> {
        self.kind.defense().map(|mut d| {
            d.dps *= level_multiplier(self.level);
            d
        })
    }

    /// Hit points removed so far
    pub fn hp_lost(&self) -> f32 {
        (self.max_hp - self.hp).clamp(0.0, self.max_hp)
    }

    /// Apply damage; returns true if this call destroyed the building
    pub fn take_damage(&mut self, amount: f32) -> bool {
        if self.destroyed || amount <= 0.0 {
            return false;
        }
        self.hp -= amount;
        if self.hp <= 0.0 {
            self.hp = 0.0;
            self.destroyed = true;
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_town_hall_level_one_hp() {
        let th = BuildingSnapshot::new(BuildingId(1), BuildingType::TownHall, 1, Vec2::default());
        assert_eq!(th.max_hp, 500.0);
        assert_eq!(th.hp, 500.0);
    }

    #[test]
    fn test_hp_scales_with_level() {
        let low = BuildingSnapshot::new(BuildingId(1), BuildingType::Cannon, 1, Vec2::default());
        let high = BuildingSnapshot::new(BuildingId(2), BuildingType::Cannon, 3, Vec2::default());
        assert!(high.max_hp > low.max_hp);
    }

    #[test]
    fn test_take_damage_destroys_once() {
        let mut b = BuildingSnapshot::new(BuildingId(1), BuildingType::Barracks, 1, Vec2::default());
        assert!(!b.take_damage(100.0));
        assert!(b.take_damage(200.0));
        assert!(b.destroyed);
        assert_eq!(b.hp, 0.0);
        assert!(!b.take_damage(50.0));
        assert_eq!(b.hp_lost(), b.max_hp);
    }

    #[test]
    fn test_edge_distance_inside_footprint_is_zero() {
        let b = BuildingSnapshot::new(BuildingId(1), BuildingType::TownHall, 1, Vec2::new(10.0, 10.0));
        assert_eq!(b.edge_distance(Vec2::new(11.0, 10.0)), 0.0);
        assert!((b.edge_distance(Vec2::new(15.0, 10.0)) - 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_domain_filter() {
        assert!(TargetDomain::Air.can_hit(true));
        assert!(!TargetDomain::Air.can_hit(false));
        assert!(TargetDomain::Both.can_hit(false));
        assert!(!TargetDomain::Ground.can_hit(true));
    }

    #[test]
    fn test_only_defenses_have_profiles() {
        for kind in BuildingType::ALL {
            assert_eq!(
                kind.defense().is_some(),
                kind.category() == BuildingCategory::Defense,
                "{:?}",
                kind
            );
        }
    }
}
