//! Live battles for untrusted clients
//!
//! Each battle runs as its own tokio task. Clients only ever send
//! deployment intents; everything they see comes back as [`ArenaEvent`]s.
//!
//! Lifecycle: request -> ready -> state updates -> complete -> return.

pub mod messages;
pub mod registry;
pub mod service;
pub mod session;

use thiserror::Error;

use crate::core::types::{BattleId, PlayerId};

pub use messages::{
    ArenaCommand, ArenaEvent, BattleArenaReady, BattleStateUpdate, BattleTicket, BuildingView,
    TroopView,
};
pub use registry::{BattleHandle, BattleRegistry};
pub use service::ArenaService;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ArenaError {
    #[error("player {0} is already in a battle")]
    AlreadyInBattle(PlayerId),

    #[error("player {0} cannot be attacked right now")]
    TargetUnreachable(PlayerId),

    #[error("opponent {0} not found")]
    OpponentNotFound(PlayerId),

    #[error("attacker {0} not found")]
    UnknownAttacker(PlayerId),

    #[error("battle {0} not found")]
    BattleNotFound(BattleId),

    #[error("battle {0} is no longer accepting commands")]
    BattleClosed(BattleId),
}
