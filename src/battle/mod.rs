//! Battle system - deterministic raid simulation against a base snapshot
//!
//! The attacker drops troops and spells; buildings fight back on their
//! own. Nothing the client sends can do more than queue a deployment.
//!
//! Key properties:
//! - Fixed 0.1s tick, 180s clock, integer tick countdown
//! - Deployments only land on tick boundaries
//! - Ties in targeting break on ids, never on randomness
//! - Identical inputs replay to an identical result

pub mod ai;
pub mod battle_map;
pub mod buildings;
pub mod constants;
pub mod execution;
pub mod orders;
pub mod profile;
pub mod replay;
pub mod resolution;
pub mod spells;
pub mod unit_type;
pub mod units;

// Re-exports for convenient access
pub use ai::{select_defense_target, select_troop_target, step_defense, step_troop, TroopAction};
pub use battle_map::BattleMap;
pub use buildings::{BuildingCategory, BuildingSnapshot, BuildingType, DefenseProfile, TargetDomain};
pub use constants::*;
pub use execution::{
    BattleEvent, BattleEventLog, BattleEventType, BattlePhase, BattleState, TerminationReason,
    TickReport,
};
pub use orders::{apply_deployment, DeployCommand, DeployRejection, Deployed, DeploymentOutcome};
pub use profile::{AttackerProfile, OpponentProfile};
pub use replay::{Abandonment, BattleReplay, RecordedDeployment};
pub use resolution::{
    calculate_loot, calculate_results, displayed_destruction, star_tier, trophy_exchange,
    BattleResult,
};
pub use spells::{ActiveSpell, SpellEffect, SpellType};
pub use unit_type::{TargetPreference, TroopStats, TroopType};
pub use units::{ArmyComposition, DeployedUnit, UnitState};
