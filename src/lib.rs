//! Citadel Raid - server-authoritative raid combat
//!
//! Matchmaking picks a defender, the battle module simulates the raid on a
//! fixed tick, and the arena drives live battles for untrusted clients.

pub mod arena;
pub mod battle;
pub mod core;
pub mod matchmaking;
