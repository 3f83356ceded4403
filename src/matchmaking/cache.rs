//! Read-through TTL cache of online players
//!
//! Every matchmaking call reads one immutable snapshot; the provider is
//! only asked again once the snapshot is older than the TTL.

use std::sync::{Arc, RwLock};

use crate::core::clock::Clock;
use crate::matchmaking::provider::{PlayerData, PlayerDataProvider};

#[derive(Debug)]
struct Snapshot {
    fetched_at: u64,
    players: Arc<Vec<PlayerData>>,
}

pub struct OnlinePlayersCache {
    ttl_secs: u64,
    clock: Arc<dyn Clock>,
    current: RwLock<Option<Snapshot>>,
}

impl OnlinePlayersCache {
    pub fn new(ttl_secs: u64, clock: Arc<dyn Clock>) -> Self {
        Self { ttl_secs, clock, current: RwLock::new(None) }
    }

    /// Current snapshot, refreshed from `provider` when stale
    pub fn snapshot(&self, provider: &dyn PlayerDataProvider) -> Arc<Vec<PlayerData>> {
        let now = self.clock.now_secs();

        {
            let current = self.current.read().unwrap_or_else(|e| e.into_inner());
            if let Some(snapshot) = current.as_ref() {
                if now.saturating_sub(snapshot.fetched_at) < self.ttl_secs {
                    return Arc::clone(&snapshot.players);
                }
            }
        }

        let players = Arc::new(provider.online_players());
        tracing::debug!(players = players.len(), "Online player cache refreshed");

        let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
        *current = Some(Snapshot { fetched_at: now, players: Arc::clone(&players) });
        players
    }

    /// Drop the snapshot so the next read goes to the provider
    pub fn invalidate(&self) {
        let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
        *current = None;
    }
}
