//! Player data as seen by the raid server
//!
//! Storage lives elsewhere; the raid server only reads snapshots and
//! applies resource and trophy changes through [`PlayerDataProvider`].

use std::collections::BTreeMap;

use dashmap::{DashMap, DashSet};
use serde::{Deserialize, Serialize};

use crate::battle::buildings::BuildingSnapshot;
use crate::battle::profile::OpponentProfile;
use crate::core::types::{PlayerId, ResourceType};
use crate::matchmaking::MatchmakingError;

/// Copy of a player's state at the time it was read
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerData {
    pub id: PlayerId,
    pub name: String,
    pub trophies: i32,
    pub town_hall_level: u8,
    pub resources: BTreeMap<ResourceType, u64>,
    pub buildings: Vec<BuildingSnapshot>,
    /// Unix seconds; the shield holds while this is in the future
    pub shield_expires_at: Option<u64>,
}

impl PlayerData {
    pub fn new(id: PlayerId, name: impl Into<String>, trophies: i32, town_hall_level: u8) -> Self {
        Self {
            id,
            name: name.into(),
            trophies,
            town_hall_level,
            resources: BTreeMap::new(),
            buildings: Vec::new(),
            shield_expires_at: None,
        }
    }

    pub fn with_resource(mut self, resource: ResourceType, amount: u64) -> Self {
        self.resources.insert(resource, amount);
        self
    }

    pub fn with_buildings(mut self, buildings: Vec<BuildingSnapshot>) -> Self {
        self.buildings = buildings;
        self
    }

    pub fn with_shield_until(mut self, expires_at: u64) -> Self {
        self.shield_expires_at = Some(expires_at);
        self
    }

    pub fn resource(&self, resource: ResourceType) -> u64 {
        self.resources.get(&resource).copied().unwrap_or(0)
    }

    pub fn is_shielded(&self, now_secs: u64) -> bool {
        self.shield_expires_at.is_some_and(|expiry| expiry > now_secs)
    }

    /// Freeze this player as a battle defender
    pub fn to_profile(&self) -> OpponentProfile {
        OpponentProfile {
            id: self.id,
            name: self.name.clone(),
            trophies: self.trophies,
            base_level: self.town_hall_level,
            resources: self.resources.clone(),
            buildings: self.buildings.clone(),
        }
    }
}

/// Access to persistent player data
pub trait PlayerDataProvider: Send + Sync {
    fn get_player_data(&self, id: PlayerId) -> Option<PlayerData>;

    /// Players currently eligible for matchmaking
    fn online_players(&self) -> Vec<PlayerData>;

    fn can_afford(&self, id: PlayerId, resource: ResourceType, amount: u64) -> bool;

    fn deduct_resources(
        &self,
        id: PlayerId,
        resource: ResourceType,
        amount: u64,
    ) -> Result<(), MatchmakingError>;

    fn grant_resources(
        &self,
        id: PlayerId,
        resources: &BTreeMap<ResourceType, u64>,
    ) -> Result<(), MatchmakingError>;

    /// Remove up to `resources` from the player in one step and return
    /// what was actually removed. Balances never go negative.
    fn take_resources(
        &self,
        id: PlayerId,
        resources: &BTreeMap<ResourceType, u64>,
    ) -> Result<BTreeMap<ResourceType, u64>, MatchmakingError>;

    /// Trophy counts never go below zero
    fn adjust_trophies(&self, id: PlayerId, delta: i32) -> Result<(), MatchmakingError>;
}

/// Process-local player store for tests and the headless runner
#[derive(Debug, Default)]
pub struct InMemoryPlayerStore {
    players: DashMap<PlayerId, PlayerData>,
    online: DashSet<PlayerId>,
}

impl InMemoryPlayerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, player: PlayerData) {
        self.players.insert(player.id, player);
    }

    /// Insert a player and mark them online
    pub fn insert_online(&self, player: PlayerData) {
        self.online.insert(player.id);
        self.insert(player);
    }

    pub fn set_online(&self, id: PlayerId, online: bool) {
        if online {
            self.online.insert(id);
        } else {
            self.online.remove(&id);
        }
    }

    pub fn set_shield(&self, id: PlayerId, expires_at: Option<u64>) {
        if let Some(mut player) = self.players.get_mut(&id) {
            player.shield_expires_at = expires_at;
        }
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }
}

impl PlayerDataProvider for InMemoryPlayerStore {
    fn get_player_data(&self, id: PlayerId) -> Option<PlayerData> {
        self.players.get(&id).map(|p| p.value().clone())
    }

    fn online_players(&self) -> Vec<PlayerData> {
        let mut online: Vec<PlayerData> = self
            .online
            .iter()
            .filter_map(|id| self.get_player_data(*id))
            .collect();
        online.sort_by_key(|p| p.id);
        online
    }

    fn can_afford(&self, id: PlayerId, resource: ResourceType, amount: u64) -> bool {
        self.players
            .get(&id)
            .is_some_and(|p| p.resource(resource) >= amount)
    }

    fn deduct_resources(
        &self,
        id: PlayerId,
        resource: ResourceType,
        amount: u64,
    ) -> Result<(), MatchmakingError> {
        let mut player = self
            .players
            .get_mut(&id)
            .ok_or(MatchmakingError::PlayerNotFound(id))?;
        let available = player.resource(resource);
        if available < amount {
            return Err(MatchmakingError::InsufficientFunds { required: amount, available });
        }
        player.resources.insert(resource, available - amount);
        Ok(())
    }

    fn grant_resources(
        &self,
        id: PlayerId,
        resources: &BTreeMap<ResourceType, u64>,
    ) -> Result<(), MatchmakingError> {
        let mut player = self
            .players
            .get_mut(&id)
            .ok_or(MatchmakingError::PlayerNotFound(id))?;
        for (&resource, &amount) in resources {
            *player.resources.entry(resource).or_insert(0) += amount;
        }
        Ok(())
    }

    fn take_resources(
        &self,
        id: PlayerId,
        resources: &BTreeMap<ResourceType, u64>,
    ) -> Result<BTreeMap<ResourceType, u64>, MatchmakingError> {
        let mut player = self
            .players
            .get_mut(&id)
            .ok_or(MatchmakingError::PlayerNotFound(id))?;
        let mut taken = BTreeMap::new();
        for (&resource, &amount) in resources {
            let available = player.resource(resource);
            let removed = amount.min(available);
            player.resources.insert(resource, available - removed);
            taken.insert(resource, removed);
        }
        Ok(taken)
    }

    fn adjust_trophies(&self, id: PlayerId, delta: i32) -> Result<(), MatchmakingError> {
        let mut player = self
            .players
            .get_mut(&id)
            .ok_or(MatchmakingError::PlayerNotFound(id))?;
        player.trophies = player.trophies.saturating_add(delta).max(0);
        Ok(())
    }
}
