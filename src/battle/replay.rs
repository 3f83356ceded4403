//! Battle replays
//!
//! A replay is the defender snapshot, the attacker's army and every
//! accepted deployment with the tick it landed on. Re-running it must
//! reproduce the original result exactly, which is how a reported result
//! is verified.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::battle::execution::{BattlePhase, BattleState};
use crate::battle::orders::DeployCommand;
use crate::battle::profile::{AttackerProfile, OpponentProfile};
use crate::battle::resolution::BattleResult;
use crate::battle::units::ArmyComposition;
use crate::core::config::RaidConfig;
use crate::core::types::{BattleId, Tick};

/// A deployment and the tick it was applied on
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RecordedDeployment {
    pub tick: Tick,
    pub command: DeployCommand,
}

/// Where and when the attacker left
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Abandonment {
    pub tick: Tick,
    pub phase: BattlePhase,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BattleReplay {
    pub battle_id: BattleId,
    pub attacker: AttackerProfile,
    pub army: ArmyComposition,
    pub defender: OpponentProfile,
    pub deployments: Vec<RecordedDeployment>,
    pub abandoned: Option<Abandonment>,
}

impl BattleReplay {
    /// Capture a replay from a battle.
    ///
    /// `army` must be the composition the battle started with; the state
    /// only keeps what is left of it.
    pub fn capture(state: &BattleState, army: ArmyComposition) -> Self {
        let abandoned = state
            .abandoned_in
            .map(|phase| Abandonment { tick: state.tick, phase });
        Self {
            battle_id: state.id,
            attacker: state.attacker,
            army,
            defender: state.defender.clone(),
            deployments: state.accepted.clone(),
            abandoned,
        }
    }

    /// Re-simulate from scratch
    pub fn run(&self, rules: Arc<RaidConfig>) -> BattleResult {
        let mut state = BattleState::new(
            self.battle_id,
            self.attacker,
            self.army.clone(),
            self.defender.clone(),
            rules,
        );
        // A battle left during setup never started
        if let Some(Abandonment { phase: BattlePhase::Initializing, .. }) = self.abandoned {
            return state.abandon();
        }
        state.start();

        let abandoned_at = self.abandoned.map(|a| a.tick);
        let mut next = 0;
        loop {
            if let Some(result) = &state.result {
                return result.clone();
            }
            if abandoned_at == Some(state.tick) {
                return state.abandon();
            }
            while let Some(recorded) = self.deployments.get(next) {
                if recorded.tick != state.tick {
                    break;
                }
                // Recorded commands were accepted once; a rejection here
                // shows up as a mismatched result.
                if let Err(reason) = state.queue_deployment(recorded.command) {
                    tracing::warn!(
                        battle_id = %self.battle_id,
                        tick = recorded.tick,
                        command = ?recorded.command,
                        %reason,
                        "Recorded deployment rejected during replay"
                    );
                }
                next += 1;
            }
            let report = state.run_tick();
            for outcome in report.deployments.iter().filter(|o| !o.accepted()) {
                tracing::warn!(
                    battle_id = %self.battle_id,
                    tick = report.tick,
                    command = ?outcome.command,
                    result = ?outcome.result,
                    "Recorded deployment did not apply during replay"
                );
            }
        }
    }

    /// Does re-simulating reproduce `reported` bit for bit?
    pub fn verify(&self, rules: Arc<RaidConfig>, reported: &BattleResult) -> bool {
        let replayed = self.run(rules);
        let matches = &replayed == reported;
        if !matches {
            tracing::warn!(battle_id = %self.battle_id, "Replay does not reproduce reported result");
        }
        matches
    }
}
