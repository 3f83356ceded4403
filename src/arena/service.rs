//! Arena entry points
//!
//! Requests are validated before any battle state exists. Once accepted,
//! a battle lives in its own task and the service only forwards commands.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, watch};

use crate::arena::messages::{ArenaCommand, ArenaEvent, BattleArenaReady, BattleTicket};
use crate::arena::registry::{BattleHandle, BattleRegistry};
use crate::arena::session::BattleSession;
use crate::arena::ArenaError;
use crate::battle::execution::BattleState;
use crate::battle::orders::DeployCommand;
use crate::battle::profile::AttackerProfile;
use crate::battle::resolution::BattleResult;
use crate::battle::spells::SpellType;
use crate::battle::unit_type::TroopType;
use crate::battle::units::ArmyComposition;
use crate::core::config::RaidConfig;
use crate::core::types::{BattleId, PlayerId, Vec2};
use crate::matchmaking::matchmaker::Matchmaker;
use crate::matchmaking::provider::PlayerDataProvider;

pub struct ArenaService {
    rules: Arc<RaidConfig>,
    matchmaker: Arc<Matchmaker>,
    provider: Arc<dyn PlayerDataProvider>,
    registry: Arc<BattleRegistry>,
}

impl ArenaService {
    pub fn new(
        rules: Arc<RaidConfig>,
        matchmaker: Arc<Matchmaker>,
        provider: Arc<dyn PlayerDataProvider>,
    ) -> Self {
        Self {
            rules,
            matchmaker,
            provider,
            registry: Arc::new(BattleRegistry::new()),
        }
    }

    pub fn matchmaker(&self) -> &Matchmaker {
        &self.matchmaker
    }

    pub fn registry(&self) -> &BattleRegistry {
        &self.registry
    }

    /// Start a battle. Must be called from inside a tokio runtime.
    pub fn request_battle(
        &self,
        attacker_id: PlayerId,
        defender_id: PlayerId,
        army: ArmyComposition,
    ) -> Result<BattleTicket, ArenaError> {
        if self.registry.is_in_battle(attacker_id) {
            return Err(ArenaError::AlreadyInBattle(attacker_id));
        }
        if attacker_id == defender_id || !self.matchmaker.can_be_attacked(defender_id) {
            tracing::info!(attacker = %attacker_id, defender = %defender_id, "Battle request refused");
            return Err(ArenaError::TargetUnreachable(defender_id));
        }

        let attacker = self
            .provider
            .get_player_data(attacker_id)
            .ok_or(ArenaError::UnknownAttacker(attacker_id))?;
        let defender = self
            .matchmaker
            .resolve_defender(attacker_id, defender_id)
            .ok_or(ArenaError::OpponentNotFound(defender_id))?;

        let battle_id = BattleId::new();
        self.registry.reserve(attacker_id, battle_id)?;

        let state = BattleState::new(
            battle_id,
            AttackerProfile::new(attacker_id, attacker.trophies),
            army,
            defender,
            Arc::clone(&self.rules),
        );
        let ready = BattleArenaReady::from_state(&state);

        let arena = &self.rules.arena;
        let (command_tx, command_rx) = mpsc::channel(arena.command_buffer);
        let (event_tx, event_rx) = broadcast::channel(arena.event_buffer);
        let (result_tx, result_rx) = watch::channel(None);

        self.registry.insert(BattleHandle {
            battle_id,
            attacker_id,
            defender_id,
            commands: command_tx,
            events: event_tx.clone(),
            result: result_rx,
        });

        let session = BattleSession::new(
            state,
            command_rx,
            event_tx,
            result_tx,
            Arc::clone(&self.provider),
            Arc::clone(&self.registry),
        );
        tokio::spawn(session.run());

        tracing::info!(
            %battle_id,
            attacker = %attacker_id,
            defender = %defender_id,
            defender_name = %ready.defender_name,
            "Battle arena ready"
        );
        Ok(BattleTicket { ready, events: event_rx })
    }

    /// Fire-and-forget; a deployment that does not register is reported
    /// in the next state update
    pub async fn deploy_troop(
        &self,
        battle_id: BattleId,
        troop: TroopType,
        position: Vec2,
    ) -> Result<(), ArenaError> {
        self.send(battle_id, ArenaCommand::Deploy(DeployCommand::troop(troop, position)))
            .await
    }

    pub async fn deploy_spell(
        &self,
        battle_id: BattleId,
        spell: SpellType,
        position: Vec2,
    ) -> Result<(), ArenaError> {
        self.send(battle_id, ArenaCommand::Deploy(DeployCommand::spell(spell, position)))
            .await
    }

    pub async fn surrender(&self, battle_id: BattleId) -> Result<(), ArenaError> {
        self.send(battle_id, ArenaCommand::Surrender).await
    }

    pub async fn disconnect(&self, battle_id: BattleId) -> Result<(), ArenaError> {
        self.send(battle_id, ArenaCommand::Disconnect).await
    }

    /// Leave the arena; frees the battle id
    pub async fn return_to_overworld(&self, battle_id: BattleId) -> Result<(), ArenaError> {
        self.send(battle_id, ArenaCommand::ReturnToOverworld).await
    }

    /// Another receiver for a running battle's events
    pub fn subscribe(&self, battle_id: BattleId) -> Result<broadcast::Receiver<ArenaEvent>, ArenaError> {
        self.registry
            .get(battle_id)
            .map(|h| h.events.subscribe())
            .ok_or(ArenaError::BattleNotFound(battle_id))
    }

    /// Wait until the battle has produced its result
    pub async fn wait_for_result(&self, battle_id: BattleId) -> Result<BattleResult, ArenaError> {
        let mut result = self
            .registry
            .get(battle_id)
            .map(|h| h.result)
            .ok_or(ArenaError::BattleNotFound(battle_id))?;

        let done = result
            .wait_for(|r| r.is_some())
            .await
            .map_err(|_| ArenaError::BattleClosed(battle_id))?;
        (*done).clone().ok_or(ArenaError::BattleClosed(battle_id))
    }

    pub fn active_battles(&self) -> usize {
        self.registry.active_battles()
    }

    async fn send(&self, battle_id: BattleId, command: ArenaCommand) -> Result<(), ArenaError> {
        let handle = self
            .registry
            .get(battle_id)
            .ok_or(ArenaError::BattleNotFound(battle_id))?;
        handle
            .commands
            .send(command)
            .await
            .map_err(|_| ArenaError::BattleClosed(battle_id))
    }
}
