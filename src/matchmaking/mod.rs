//! Opponent selection
//!
//! Finds a defender for an attacker: an online player close in trophies
//! when one exists, otherwise a synthetic base from the catalog. Search
//! never fails; only paid re-rolls can.

pub mod cache;
pub mod catalog;
pub mod matchmaker;
pub mod provider;

use thiserror::Error;

use crate::core::types::PlayerId;

pub use cache::OnlinePlayersCache;
pub use catalog::{generate_base, OpponentCatalog, OpponentTemplate, MAX_BASE_LEVEL};
pub use matchmaker::Matchmaker;
pub use provider::{InMemoryPlayerStore, PlayerData, PlayerDataProvider};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MatchmakingError {
    #[error("insufficient funds: need {required} gold, have {available}")]
    InsufficientFunds { required: u64, available: u64 },

    #[error("player {0} not found")]
    PlayerNotFound(PlayerId),
}
