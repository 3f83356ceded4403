//! Battle participants as captured at battle start

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::battle::buildings::{BuildingSnapshot, BuildingType};
use crate::core::types::{PlayerId, ResourceType};

/// The defending side, frozen for the duration of one battle.
///
/// Built from a copy of the player's data; later changes to the live
/// player never reach a battle that already captured this profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpponentProfile {
    pub id: PlayerId,
    pub name: String,
    pub trophies: i32,
    /// Gates defense strength
    pub base_level: u8,
    /// Loot source
    pub resources: BTreeMap<ResourceType, u64>,
    pub buildings: Vec<BuildingSnapshot>,
}

impl OpponentProfile {
    pub fn is_synthetic(&self) -> bool {
        self.id.is_synthetic()
    }

    pub fn reserve(&self, resource: ResourceType) -> u64 {
        self.resources.get(&resource).copied().unwrap_or(0)
    }

    pub fn town_hall(&self) -> Option<&BuildingSnapshot> {
        self.buildings.iter().find(|b| b.kind == BuildingType::TownHall)
    }
}

/// The attacking side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackerProfile {
    pub id: PlayerId,
    pub trophies: i32,
}

impl AttackerProfile {
    pub fn new(id: PlayerId, trophies: i32) -> Self {
        Self { id, trophies }
    }
}
