//! Synthetic opponents
//!
//! Templates give a synthetic opponent its identity and reserve; the base
//! itself is generated fresh for every match from the template's level.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::battle::buildings::{BuildingSnapshot, BuildingType};
use crate::core::error::{RaidError, Result};
use crate::core::types::{BuildingId, ResourceType, Vec2};

/// Highest base level the generator knows how to lay out
pub const MAX_BASE_LEVEL: u8 = 10;

/// Distance between neighbouring building slots. Wide enough for the
/// largest footprint.
const SLOT_SPACING: f32 = 5.0;

/// Slots on each side of the town hall
const SLOT_RADIUS: i32 = 3;

/// One synthetic opponent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpponentTemplate {
    /// Negative player id
    pub id: i64,
    pub name: String,
    pub trophies: i32,
    pub base_level: u8,
    #[serde(default)]
    pub gold: u64,
    #[serde(default)]
    pub elixir: u64,
    #[serde(default)]
    pub dark_elixir: u64,
}

impl OpponentTemplate {
    pub fn reserve(&self) -> BTreeMap<ResourceType, u64> {
        BTreeMap::from([
            (ResourceType::Gold, self.gold),
            (ResourceType::Elixir, self.elixir),
            (ResourceType::DarkElixir, self.dark_elixir),
        ])
    }
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    opponents: Vec<OpponentTemplate>,
}

/// Every synthetic opponent the matchmaker can fall back to
#[derive(Debug, Clone)]
pub struct OpponentCatalog {
    templates: Vec<OpponentTemplate>,
}

impl Default for OpponentCatalog {
    fn default() -> Self {
        let template = |id, name: &str, trophies, base_level, gold, dark_elixir| OpponentTemplate {
            id,
            name: name.to_string(),
            trophies,
            base_level,
            gold,
            elixir: gold,
            dark_elixir,
        };
        Self {
            templates: vec![
                template(-1, "Goblin Outpost", 0, 1, 1_500, 0),
                template(-2, "Bandit Camp", 400, 2, 4_000, 0),
                template(-3, "Mercenary Fort", 800, 3, 9_000, 200),
                template(-4, "Warlord Keep", 1_200, 4, 20_000, 600),
                template(-5, "Iron Bastion", 1_800, 5, 45_000, 1_500),
                template(-6, "Dragon Citadel", 2_600, 6, 90_000, 4_000),
            ],
        }
    }
}

impl OpponentCatalog {
    pub fn new(templates: Vec<OpponentTemplate>) -> Result<Self> {
        if templates.is_empty() {
            return Err(RaidError::InvalidConfig("opponent catalog is empty".into()));
        }
        if let Some(bad) = templates.iter().find(|t| t.id >= 0) {
            return Err(RaidError::InvalidConfig(format!(
                "synthetic opponent '{}' needs a negative id, got {}",
                bad.name, bad.id
            )));
        }
        if let Some(bad) = templates
            .iter()
            .find(|t| t.base_level == 0 || t.base_level > MAX_BASE_LEVEL)
        {
            return Err(RaidError::InvalidConfig(format!(
                "synthetic opponent '{}' has base level {} outside 1..={}",
                bad.name, bad.base_level, MAX_BASE_LEVEL
            )));
        }
        Ok(Self { templates })
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let file: CatalogFile = toml::from_str(contents)?;
        Self::new(file.opponents)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&contents)
    }

    pub fn templates(&self) -> &[OpponentTemplate] {
        &self.templates
    }

    pub fn get(&self, id: i64) -> Option<&OpponentTemplate> {
        self.templates.iter().find(|t| t.id == id)
    }

    /// Template closest in trophies; ties go to the lower trophy count
    pub fn nearest(&self, trophies: i32) -> Option<&OpponentTemplate> {
        self.templates
            .iter()
            .min_by_key(|t| ((t.trophies - trophies).unsigned_abs(), t.trophies, t.id))
    }
}

/// How many of each building a base of `level` has
fn building_counts(level: u8) -> Vec<(BuildingType, usize)> {
    let l = usize::from(level);
    vec![
        (BuildingType::Cannon, 1 + l / 2),
        (BuildingType::ArcherTower, (l + 1) / 2),
        (BuildingType::Mortar, l / 3),
        (BuildingType::AirDefense, l / 4),
        (BuildingType::WizardTower, l / 5),
        (BuildingType::GoldMine, 1 + l / 3),
        (BuildingType::ElixirCollector, 1 + l / 3),
        (BuildingType::GoldStorage, 1 + l / 5),
        (BuildingType::ElixirStorage, 1 + l / 5),
        (BuildingType::ArmyCamp, 1),
        (BuildingType::Barracks, 1),
    ]
}

/// Lay out a fresh base around a centered town hall.
///
/// Buildings sit on a square slot grid so footprints never overlap.
/// Defenses only appear from their unlock level. Ids start at 1 with the
/// town hall.
pub fn generate_base<R: Rng + ?Sized>(level: u8, arena_size: f32, rng: &mut R) -> Vec<BuildingSnapshot> {
    let level = level.clamp(1, MAX_BASE_LEVEL);
    let center = Vec2::new(arena_size / 2.0, arena_size / 2.0);

    let mut slots: Vec<Vec2> = (-SLOT_RADIUS..=SLOT_RADIUS)
        .flat_map(|dx| (-SLOT_RADIUS..=SLOT_RADIUS).map(move |dy| (dx, dy)))
        .filter(|&(dx, dy)| (dx, dy) != (0, 0))
        .map(|(dx, dy)| {
            Vec2::new(center.x + dx as f32 * SLOT_SPACING, center.y + dy as f32 * SLOT_SPACING)
        })
        .filter(|p| {
            let margin = SLOT_SPACING / 2.0;
            p.x - margin >= 0.0 && p.y - margin >= 0.0 && p.x + margin <= arena_size && p.y + margin <= arena_size
        })
        .collect();
    slots.shuffle(rng);

    let mut buildings = vec![BuildingSnapshot::new(BuildingId(1), BuildingType::TownHall, level, center)];
    let mut slots = slots.into_iter();

    for (kind, count) in building_counts(level) {
        if kind.unlock_level() > level {
            continue;
        }
        for _ in 0..count {
            let Some(position) = slots.next() else {
                tracing::warn!(level, ?kind, "Base generator ran out of slots");
                return buildings;
            };
            let id = BuildingId(buildings.len() as u32 + 1);
            buildings.push(BuildingSnapshot::new(id, kind, level, position));
        }
    }

    buildings
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_default_catalog_is_valid() {
        let catalog = OpponentCatalog::default();
        assert!(OpponentCatalog::new(catalog.templates().to_vec()).is_ok());
    }

    #[test]
    fn test_shipped_catalog_loads() {
        let catalog = OpponentCatalog::load("data/opponents.toml").expect("Should load data/opponents.toml");
        assert_eq!(catalog.templates().len(), 6);
        assert!(catalog.templates().iter().all(|t| t.id < 0));
    }

    #[test]
    fn test_positive_ids_rejected() {
        let result = OpponentCatalog::from_toml_str(
            r#"
            [[opponents]]
            id = 5
            name = "Impostor"
            trophies = 0
            base_level = 1
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_nearest_template() {
        let catalog = OpponentCatalog::default();
        assert_eq!(catalog.nearest(0).map(|t| t.id), Some(-1));
        assert_eq!(catalog.nearest(1_100).map(|t| t.id), Some(-4));
        assert_eq!(catalog.nearest(99_999).map(|t| t.id), Some(-6));
        // Equidistant from 400 and 800
        assert_eq!(catalog.nearest(600).map(|t| t.id), Some(-2));
    }

    #[test]
    fn test_generated_base_layout() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let base = generate_base(6, 44.0, &mut rng);

        assert_eq!(base[0].kind, BuildingType::TownHall);
        assert_eq!(base[0].position, Vec2::new(22.0, 22.0));
        for (i, b) in base.iter().enumerate() {
            assert_eq!(b.id, BuildingId(i as u32 + 1));
            assert_eq!(b.level, 6);
        }
        for (i, a) in base.iter().enumerate() {
            for b in &base[i + 1..] {
                let gap = a.position.distance(&b.position);
                assert!(gap >= a.half_extent() + b.half_extent(), "{} overlaps {}", a.id, b.id);
            }
        }
    }

    #[test]
    fn test_defenses_gated_by_level() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let low = generate_base(1, 44.0, &mut rng);
        assert!(low.iter().all(|b| b.kind.unlock_level() <= 1));
        assert!(low.iter().any(|b| b.kind == BuildingType::Cannon));

        let high = generate_base(5, 44.0, &mut rng);
        assert!(high.iter().any(|b| b.kind == BuildingType::WizardTower));
    }

    #[test]
    fn test_generation_is_seeded() {
        let a = generate_base(4, 44.0, &mut ChaCha8Rng::seed_from_u64(3));
        let b = generate_base(4, 44.0, &mut ChaCha8Rng::seed_from_u64(3));
        assert_eq!(a, b);
    }
}
