//! Opponent search
//!
//! Search order:
//! 1. Online players within the preferred trophy window
//! 2. Online players within the maximum window
//! 3. A synthetic opponent from the catalog, with jittered reserve and
//!    trophies and a freshly generated base

use std::sync::{Arc, Mutex};

use ahash::AHashMap;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::battle::profile::OpponentProfile;
use crate::core::clock::Clock;
use crate::core::config::{MatchmakingConfig, RaidConfig};
use crate::core::types::{PlayerId, ResourceType};
use crate::matchmaking::cache::OnlinePlayersCache;
use crate::matchmaking::catalog::{generate_base, OpponentCatalog, OpponentTemplate};
use crate::matchmaking::provider::{PlayerData, PlayerDataProvider};
use crate::matchmaking::MatchmakingError;

/// Currency re-roll fees are charged in
pub const REROLL_CURRENCY: ResourceType = ResourceType::Gold;

pub struct Matchmaker {
    config: MatchmakingConfig,
    arena_size: f32,
    provider: Arc<dyn PlayerDataProvider>,
    cache: OnlinePlayersCache,
    catalog: OpponentCatalog,
    clock: Arc<dyn Clock>,
    rng: Mutex<ChaCha8Rng>,
    /// Synthetic profiles shown to an attacker, keyed by (attacker, opponent)
    issued: Mutex<AHashMap<(PlayerId, PlayerId), OpponentProfile>>,
}

impl Matchmaker {
    pub fn new(
        rules: &RaidConfig,
        provider: Arc<dyn PlayerDataProvider>,
        catalog: OpponentCatalog,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let config = rules.matchmaking.clone();
        let rng = match config.seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self {
            cache: OnlinePlayersCache::new(config.cache_ttl_secs, Arc::clone(&clock)),
            config,
            arena_size: rules.battle.arena_size,
            provider,
            catalog,
            clock,
            rng: Mutex::new(rng),
            issued: Mutex::new(AHashMap::new()),
        }
    }

    pub fn cache(&self) -> &OnlinePlayersCache {
        &self.cache
    }

    /// Pick a defender for `attacker_id`. Never fails.
    pub fn find_opponent(&self, attacker_id: PlayerId, attacker_trophies: i32) -> OpponentProfile {
        let now = self.clock.now_secs();
        let online = self.cache.snapshot(self.provider.as_ref());

        for window in [self.config.preferred_window, self.config.max_window] {
            let mut candidates: Vec<&PlayerData> = online
                .iter()
                .filter(|p| p.id != attacker_id && !p.id.is_synthetic())
                .filter(|p| !p.is_shielded(now))
                .filter(|p| (p.trophies - attacker_trophies).unsigned_abs() <= window)
                .collect();

            if candidates.is_empty() {
                continue;
            }

            candidates.sort_by_key(|p| ((p.trophies - attacker_trophies).unsigned_abs(), p.id));

            // The snapshot may be stale; shields granted since must hold
            let fresh: Vec<PlayerData> = candidates
                .into_iter()
                .filter_map(|p| self.provider.get_player_data(p.id))
                .filter(|p| !p.is_shielded(now))
                .take(self.config.nearest_pool)
                .collect();

            if fresh.is_empty() {
                continue;
            }

            let pick = self.lock_rng().gen_range(0..fresh.len());
            let chosen = &fresh[pick];
            tracing::info!(
                attacker = %attacker_id,
                defender = %chosen.id,
                window,
                pool = fresh.len(),
                "Matched online opponent"
            );
            return chosen.to_profile();
        }

        self.synthesize(attacker_id, attacker_trophies)
    }

    /// Re-roll the opponent. The first few searches are free; later ones
    /// are charged before searching.
    pub fn next_opponent(
        &self,
        attacker_id: PlayerId,
        search_count: u32,
    ) -> Result<(OpponentProfile, u64), MatchmakingError> {
        let attacker = self
            .provider
            .get_player_data(attacker_id)
            .ok_or(MatchmakingError::PlayerNotFound(attacker_id))?;

        let cost = self.reroll_fee(search_count);
        if cost > 0 {
            if !self.provider.can_afford(attacker_id, REROLL_CURRENCY, cost) {
                return Err(MatchmakingError::InsufficientFunds {
                    required: cost,
                    available: attacker.resource(REROLL_CURRENCY),
                });
            }
            self.provider.deduct_resources(attacker_id, REROLL_CURRENCY, cost)?;
            tracing::debug!(attacker = %attacker_id, search_count, cost, "Re-roll fee charged");
        }

        Ok((self.find_opponent(attacker_id, attacker.trophies), cost))
    }

    /// Fee for the `search_count`-th re-roll
    pub fn reroll_fee(&self, search_count: u32) -> u64 {
        u64::from(search_count.saturating_sub(self.config.free_rerolls)) * self.config.reroll_fee_step
    }

    /// False only for a human defender whose shield has not expired
    pub fn can_be_attacked(&self, defender_id: PlayerId) -> bool {
        if defender_id.is_synthetic() {
            return true;
        }
        let now = self.clock.now_secs();
        self.provider
            .get_player_data(defender_id)
            .map_or(true, |p| !p.is_shielded(now))
    }

    /// The synthetic base most recently shown to `attacker_id`
    pub fn issued_profile(&self, attacker_id: PlayerId, opponent_id: PlayerId) -> Option<OpponentProfile> {
        self.issued
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&(attacker_id, opponent_id))
            .cloned()
    }

    /// Capture the defender a battle will be fought against.
    ///
    /// Humans are read fresh from the provider; synthetic opponents must
    /// have been shown to this attacker first.
    pub fn resolve_defender(&self, attacker_id: PlayerId, defender_id: PlayerId) -> Option<OpponentProfile> {
        if defender_id.is_synthetic() {
            self.issued_profile(attacker_id, defender_id)
        } else {
            self.provider.get_player_data(defender_id).map(|p| p.to_profile())
        }
    }

    fn synthesize(&self, attacker_id: PlayerId, attacker_trophies: i32) -> OpponentProfile {
        let template = self
            .catalog
            .nearest(attacker_trophies)
            .cloned()
            .unwrap_or_else(|| OpponentTemplate {
                id: -1,
                name: "Abandoned Camp".into(),
                trophies: attacker_trophies,
                base_level: 1,
                gold: 0,
                elixir: 0,
                dark_elixir: 0,
            });

        let profile = {
            let mut rng = self.lock_rng();
            let jitter = self.config.resource_jitter;
            let resources = template
                .reserve()
                .into_iter()
                .map(|(resource, amount)| {
                    let scale = 1.0 + rng.gen_range(-jitter..=jitter);
                    (resource, (amount as f64 * f64::from(scale)).floor() as u64)
                })
                .collect();
            let trophy_jitter = self.config.trophy_jitter.abs();
            let trophies = (template.trophies + rng.gen_range(-trophy_jitter..=trophy_jitter)).max(0);

            OpponentProfile {
                id: PlayerId(template.id),
                name: template.name.clone(),
                trophies,
                base_level: template.base_level,
                resources,
                buildings: generate_base(template.base_level, self.arena_size, &mut *rng),
            }
        };

        tracing::info!(
            attacker = %attacker_id,
            opponent = %profile.id,
            name = %profile.name,
            level = profile.base_level,
            "No online opponent in range, using synthetic base"
        );

        self.issued
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert((attacker_id, profile.id), profile.clone());
        profile
    }

    fn lock_rng(&self) -> std::sync::MutexGuard<'_, ChaCha8Rng> {
        self.rng.lock().unwrap_or_else(|e| e.into_inner())
    }
}
