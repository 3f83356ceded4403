//! Authoritative battle task
//!
//! Drains client commands at each tick boundary, advances the battle one
//! tick, and publishes what happened. After the result is out it applies
//! rewards and waits for the client to return before tearing down.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::arena::messages::{ArenaCommand, ArenaEvent, BattleStateUpdate};
use crate::arena::registry::BattleRegistry;
use crate::battle::execution::BattleState;
use crate::battle::orders::DeploymentOutcome;
use crate::battle::resolution::BattleResult;
use crate::core::config::ArenaConfig;
use crate::matchmaking::provider::PlayerDataProvider;

/// What the client asked for between two ticks
enum Interrupt {
    Abandon,
    Return,
}

pub(crate) struct BattleSession {
    state: BattleState,
    commands: mpsc::Receiver<ArenaCommand>,
    events: broadcast::Sender<ArenaEvent>,
    result: watch::Sender<Option<BattleResult>>,
    provider: Arc<dyn PlayerDataProvider>,
    registry: Arc<BattleRegistry>,
    config: ArenaConfig,
    rejected: Vec<DeploymentOutcome>,
}

impl BattleSession {
    pub(crate) fn new(
        state: BattleState,
        commands: mpsc::Receiver<ArenaCommand>,
        events: broadcast::Sender<ArenaEvent>,
        result: watch::Sender<Option<BattleResult>>,
        provider: Arc<dyn PlayerDataProvider>,
        registry: Arc<BattleRegistry>,
    ) -> Self {
        let config = state.rules.arena.clone();
        Self {
            state,
            commands,
            events,
            result,
            provider,
            registry,
            config,
            rejected: Vec::new(),
        }
    }

    /// Run the battle to completion, then wait for the client to leave
    pub(crate) async fn run(mut self) {
        let battle_id = self.state.id;
        self.state.start();
        info!(%battle_id, cadence_ms = self.config.tick_cadence_ms, "Arena battle running");

        let mut ticker = (self.config.tick_cadence_ms > 0).then(|| {
            let mut ticker = interval(Duration::from_millis(self.config.tick_cadence_ms));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            ticker
        });

        let mut returned = false;
        let result = loop {
            match ticker.as_mut() {
                Some(ticker) => {
                    ticker.tick().await;
                }
                None => tokio::task::yield_now().await,
            }

            match self.drain_commands() {
                Some(Interrupt::Return) => {
                    returned = true;
                    break self.state.abandon();
                }
                Some(Interrupt::Abandon) => break self.state.abandon(),
                None => {}
            }

            let report = self.state.run_tick();
            self.rejected
                .extend(report.deployments.into_iter().filter(|o| !o.accepted()));

            if let Some(result) = report.result {
                break result;
            }

            if report.tick % u64::from(self.config.update_every_ticks) == 0 {
                let update = BattleStateUpdate::capture(&self.state, std::mem::take(&mut self.rejected));
                // No subscribers is fine; the client may have gone away
                let _ = self.events.send(ArenaEvent::StateUpdate(update));
            }
        };

        self.result.send_replace(Some(result.clone()));
        let _ = self.events.send(ArenaEvent::BattleComplete(result.clone()));
        info!(
            %battle_id,
            stars = result.stars,
            destruction = result.destruction,
            abandoned = result.abandoned,
            "Arena battle complete"
        );

        self.apply_rewards(&result);

        if !returned {
            self.await_return().await;
        }
        self.registry.remove(battle_id);
        info!(%battle_id, "Arena battle torn down");
    }

    /// Buffer everything the client sent since the last tick
    fn drain_commands(&mut self) -> Option<Interrupt> {
        loop {
            match self.commands.try_recv() {
                Ok(ArenaCommand::Deploy(command)) => {
                    if let Err(reason) = self.state.queue_deployment(command) {
                        self.rejected.push(DeploymentOutcome { command, result: Err(reason) });
                    }
                }
                Ok(ArenaCommand::Surrender) => {
                    info!(battle_id = %self.state.id, "Attacker surrendered");
                    return Some(Interrupt::Abandon);
                }
                Ok(ArenaCommand::Disconnect) => {
                    info!(battle_id = %self.state.id, "Attacker disconnected");
                    return Some(Interrupt::Abandon);
                }
                Ok(ArenaCommand::ReturnToOverworld) => {
                    info!(battle_id = %self.state.id, "Attacker returned mid-battle");
                    return Some(Interrupt::Return);
                }
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Disconnected) => return Some(Interrupt::Abandon),
            }
        }
    }

    /// Loot moves from defender to attacker; trophies change hands.
    ///
    /// A human defender is charged first and the attacker receives only
    /// what was actually removed, so loot is never created. The defender
    /// may have lost resources elsewhere since the snapshot was taken.
    /// Synthetic defenders have no account to update.
    fn apply_rewards(&self, result: &BattleResult) {
        let battle_id = result.battle_id;
        let attacker = result.attacker_id;
        let defender = result.defender_id;

        let loot = if defender.is_synthetic() {
            result.loot.clone()
        } else {
            match self.provider.take_resources(defender, &result.loot) {
                Ok(taken) => {
                    if taken != result.loot {
                        info!(
                            %battle_id,
                            %defender,
                            earned = ?result.loot,
                            paid = ?taken,
                            "Defender could not cover full loot"
                        );
                    }
                    taken
                }
                Err(e) => {
                    warn!(%battle_id, %defender, error = %e, "Could not take loot, attacker gets none");
                    BTreeMap::new()
                }
            }
        };

        if let Err(e) = self.provider.grant_resources(attacker, &loot) {
            warn!(%battle_id, %attacker, error = %e, "Could not grant loot");
        }
        if let Err(e) = self.provider.adjust_trophies(attacker, result.trophy_delta) {
            warn!(%battle_id, %attacker, error = %e, "Could not adjust trophies");
        }
        if !defender.is_synthetic() {
            if let Err(e) = self.provider.adjust_trophies(defender, result.defender_trophy_delta) {
                warn!(%battle_id, %defender, error = %e, "Could not adjust trophies");
            }
        }
        debug!(%battle_id, "Rewards applied");
    }

    async fn await_return(&mut self) {
        let timeout = sleep(Duration::from_secs(self.config.return_timeout_secs));
        tokio::pin!(timeout);

        loop {
            tokio::select! {
                _ = &mut timeout => {
                    info!(battle_id = %self.state.id, "Client never returned, tearing down");
                    return;
                }
                command = self.commands.recv() => match command {
                    Some(ArenaCommand::ReturnToOverworld) | None => return,
                    Some(other) => {
                        warn!(battle_id = %self.state.id, command = ?other, "Command after battle end dropped");
                    }
                },
            }
        }
    }
}
