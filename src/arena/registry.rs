//! Registry of live battles

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::{broadcast, mpsc, watch};

use crate::arena::messages::{ArenaCommand, ArenaEvent};
use crate::arena::ArenaError;
use crate::battle::resolution::BattleResult;
use crate::core::types::{BattleId, PlayerId};

/// Handle to a running battle task
#[derive(Debug, Clone)]
pub struct BattleHandle {
    pub battle_id: BattleId,
    pub attacker_id: PlayerId,
    pub defender_id: PlayerId,
    pub commands: mpsc::Sender<ArenaCommand>,
    pub events: broadcast::Sender<ArenaEvent>,
    pub result: watch::Receiver<Option<BattleResult>>,
}

/// All battles in flight, plus which attacker is in which battle
#[derive(Debug, Default)]
pub struct BattleRegistry {
    battles: DashMap<BattleId, BattleHandle>,
    attackers: DashMap<PlayerId, BattleId>,
}

impl BattleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the attacker for a battle; fails if they already hold one
    pub fn reserve(&self, attacker_id: PlayerId, battle_id: BattleId) -> Result<(), ArenaError> {
        match self.attackers.entry(attacker_id) {
            Entry::Occupied(_) => Err(ArenaError::AlreadyInBattle(attacker_id)),
            Entry::Vacant(slot) => {
                slot.insert(battle_id);
                Ok(())
            }
        }
    }

    pub fn insert(&self, handle: BattleHandle) {
        self.battles.insert(handle.battle_id, handle);
    }

    pub fn get(&self, battle_id: BattleId) -> Option<BattleHandle> {
        self.battles.get(&battle_id).map(|h| h.value().clone())
    }

    /// Tear down a battle and free its attacker
    pub fn remove(&self, battle_id: BattleId) -> Option<BattleHandle> {
        let removed = self.battles.remove(&battle_id).map(|(_, h)| h);
        if let Some(handle) = &removed {
            self.attackers.remove_if(&handle.attacker_id, |_, id| *id == battle_id);
        }
        removed
    }

    /// Release a reservation that never turned into a battle
    pub fn release(&self, attacker_id: PlayerId, battle_id: BattleId) {
        self.attackers.remove_if(&attacker_id, |_, id| *id == battle_id);
    }

    pub fn battle_for(&self, attacker_id: PlayerId) -> Option<BattleId> {
        self.attackers.get(&attacker_id).map(|id| *id.value())
    }

    pub fn is_in_battle(&self, attacker_id: PlayerId) -> bool {
        self.attackers.contains_key(&attacker_id)
    }

    pub fn active_battles(&self) -> usize {
        self.battles.len()
    }
}
