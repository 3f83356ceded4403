//! Arena lifecycle integration tests

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::broadcast::Receiver;
use tokio::time::timeout;

use citadel_raid::arena::*;
use citadel_raid::battle::{ArmyComposition, BuildingSnapshot, BuildingType, DeployRejection, TroopType};
use citadel_raid::core::clock::FixedClock;
use citadel_raid::core::types::{BuildingId, PlayerId, ResourceType, Vec2};
use citadel_raid::core::RaidConfig;
use citadel_raid::matchmaking::{InMemoryPlayerStore, Matchmaker, OpponentCatalog, PlayerData, PlayerDataProvider};

const NOW: u64 = 1_700_000_000;
const ATTACKER: PlayerId = PlayerId(1);
const DEFENDER: PlayerId = PlayerId(2);
const LIMIT: Duration = Duration::from_secs(10);

fn arena(return_timeout_secs: u64) -> (Arc<InMemoryPlayerStore>, ArenaService) {
    let mut rules = RaidConfig::default();
    rules.arena.tick_cadence_ms = 0;
    rules.arena.return_timeout_secs = return_timeout_secs;
    rules.matchmaking.seed = Some(1);
    let rules = Arc::new(rules);

    let store = Arc::new(InMemoryPlayerStore::new());
    store.insert_online(
        PlayerData::new(ATTACKER, "Attacker", 1000, 3).with_resource(ResourceType::Gold, 500),
    );
    store.insert_online(
        PlayerData::new(DEFENDER, "Defender", 1000, 1)
            .with_resource(ResourceType::Gold, 10_000)
            .with_buildings(vec![BuildingSnapshot::new(
                BuildingId(1),
                BuildingType::TownHall,
                1,
                Vec2::new(22.0, 22.0),
            )]),
    );

    let matchmaker = Arc::new(Matchmaker::new(
        &rules,
        store.clone(),
        OpponentCatalog::default(),
        Arc::new(FixedClock::new(NOW)),
    ));
    let service = ArenaService::new(rules, matchmaker, store.clone());
    (store, service)
}

fn giants(count: u32) -> ArmyComposition {
    ArmyComposition::new(5 * count, 0).with_troops(TroopType::Giant, count)
}

async fn next_event(events: &mut Receiver<ArenaEvent>) -> Option<ArenaEvent> {
    loop {
        match events.recv().await {
            Ok(event) => return Some(event),
            Err(RecvError::Lagged(_)) => continue,
            Err(RecvError::Closed) => return None,
        }
    }
}

/// Drain events until the channel closes; returns every completion seen
async fn drain(events: &mut Receiver<ArenaEvent>) -> Vec<ArenaEvent> {
    let mut completions = Vec::new();
    while let Some(event) = next_event(events).await {
        if matches!(event, ArenaEvent::BattleComplete(_)) {
            completions.push(event);
        }
    }
    completions
}

#[tokio::test]
async fn test_shielded_target_is_unreachable() {
    let (store, service) = arena(60);
    store.set_shield(DEFENDER, Some(NOW + 600));

    let err = service.request_battle(ATTACKER, DEFENDER, giants(1)).unwrap_err();

    assert_eq!(err, ArenaError::TargetUnreachable(DEFENDER));
    assert_eq!(service.active_battles(), 0);
    assert!(!service.registry().is_in_battle(ATTACKER));
}

#[tokio::test]
async fn test_cannot_attack_self() {
    let (_, service) = arena(60);
    assert_eq!(
        service.request_battle(ATTACKER, ATTACKER, giants(1)).unwrap_err(),
        ArenaError::TargetUnreachable(ATTACKER)
    );
}

#[tokio::test]
async fn test_one_battle_at_a_time() {
    let (_, service) = arena(60);
    let ticket = service.request_battle(ATTACKER, DEFENDER, giants(1)).expect("first request");

    assert_eq!(
        service.request_battle(ATTACKER, DEFENDER, giants(1)).unwrap_err(),
        ArenaError::AlreadyInBattle(ATTACKER)
    );

    service.surrender(ticket.ready.battle_id).await.expect("battle running");
}

#[tokio::test]
async fn test_unknown_opponents() {
    let (_, service) = arena(60);
    assert_eq!(
        service.request_battle(ATTACKER, PlayerId(99), giants(1)).unwrap_err(),
        ArenaError::OpponentNotFound(PlayerId(99))
    );
    // Synthetic ids must have been offered by the matchmaker first
    assert_eq!(
        service.request_battle(ATTACKER, PlayerId(-3), giants(1)).unwrap_err(),
        ArenaError::OpponentNotFound(PlayerId(-3))
    );
    assert_eq!(service.active_battles(), 0);
}

#[tokio::test]
async fn test_full_lifecycle() {
    let (store, service) = arena(60);
    let BattleTicket { ready, mut events } =
        service.request_battle(ATTACKER, DEFENDER, giants(1)).expect("request accepted");

    assert_eq!(ready.arena_center, Vec2::new(22.0, 22.0));
    assert_eq!(ready.arena_size, 44.0);
    assert_eq!(ready.buildings.len(), 1);
    assert_eq!(ready.defender_name, "Defender");
    assert_eq!(ready.defender_level, 1);

    let battle_id = ready.battle_id;
    service
        .deploy_troop(battle_id, TroopType::Giant, Vec2::new(19.0, 22.0))
        .await
        .expect("deploy sent");

    let result = timeout(LIMIT, service.wait_for_result(battle_id))
        .await
        .expect("battle finished in time")
        .expect("result available");

    assert!(result.victory);
    assert_eq!(result.stars, 3);
    assert_eq!(result.destruction, 100.0);
    assert_eq!(result.duration_secs, 10.0);
    assert!(!result.abandoned);

    // Result stays available until the client leaves
    assert_eq!(service.registry().battle_for(ATTACKER), Some(battle_id));

    let mut saw_update = false;
    loop {
        match timeout(LIMIT, next_event(&mut events)).await.expect("event in time") {
            Some(ArenaEvent::StateUpdate(update)) => {
                assert_eq!(update.battle_id, battle_id);
                saw_update = true;
            }
            Some(ArenaEvent::BattleComplete(done)) => {
                assert_eq!(done, result);
                break;
            }
            None => panic!("channel closed before completion"),
        }
    }
    assert!(saw_update);

    service.return_to_overworld(battle_id).await.expect("battle still registered");
    let extra = timeout(LIMIT, drain(&mut events)).await.expect("teardown in time");
    assert!(extra.is_empty(), "BattleComplete must be sent once");

    assert_eq!(service.active_battles(), 0);
    assert!(!service.registry().is_in_battle(ATTACKER));
    assert_eq!(service.subscribe(battle_id).unwrap_err(), ArenaError::BattleNotFound(battle_id));

    let attacker = store.get_player_data(ATTACKER).expect("attacker");
    let defender = store.get_player_data(DEFENDER).expect("defender");
    assert_eq!(attacker.resource(ResourceType::Gold), 10_500);
    assert_eq!(defender.resource(ResourceType::Gold), 0);
    assert_eq!(attacker.trophies, 1000 + result.trophy_delta);
    assert_eq!(defender.trophies, 1000 - result.trophy_delta);
}

#[tokio::test]
async fn test_rejected_deployment_reported() {
    let (_, service) = arena(0);
    let BattleTicket { ready, mut events } =
        service.request_battle(ATTACKER, DEFENDER, giants(1)).expect("request accepted");

    service
        .deploy_troop(ready.battle_id, TroopType::Giant, Vec2::new(60.0, 60.0))
        .await
        .expect("deploy sent");

    let rejected = loop {
        match timeout(LIMIT, next_event(&mut events)).await.expect("event in time") {
            Some(ArenaEvent::StateUpdate(update)) if !update.rejected.is_empty() => {
                break update.rejected;
            }
            Some(_) => continue,
            None => panic!("battle ended before reporting"),
        }
    };

    assert_eq!(rejected[0].result, Err(DeployRejection::OutOfBounds));
    service.surrender(ready.battle_id).await.expect("battle running");
}

#[tokio::test]
async fn test_surrender_then_timeout_teardown() {
    let (store, service) = arena(0);
    let BattleTicket { ready, mut events } =
        service.request_battle(ATTACKER, DEFENDER, giants(2)).expect("request accepted");

    service.surrender(ready.battle_id).await.expect("battle running");
    let completions = timeout(LIMIT, drain(&mut events)).await.expect("teardown in time");

    assert_eq!(completions.len(), 1);
    let ArenaEvent::BattleComplete(result) = &completions[0] else {
        panic!("expected completion");
    };
    assert!(result.abandoned);
    assert!(!result.victory);
    assert_eq!(result.stars, 0);
    assert_eq!(service.active_battles(), 0);

    // Loss still costs trophies
    let attacker = store.get_player_data(ATTACKER).expect("attacker");
    assert_eq!(attacker.trophies, 1000 + result.trophy_delta);
    assert!(result.trophy_delta < 0);
}

#[tokio::test]
async fn test_battle_against_synthetic_opponent() {
    let (store, service) = arena(0);
    store.set_online(DEFENDER, false);

    let offered = service.matchmaker().find_opponent(ATTACKER, 1000);
    assert!(offered.is_synthetic());

    let BattleTicket { ready, mut events } =
        service.request_battle(ATTACKER, offered.id, giants(2)).expect("request accepted");
    assert_eq!(ready.buildings, offered.buildings);
    assert_eq!(ready.defender_name, offered.name);

    service.disconnect(ready.battle_id).await.expect("battle running");
    let completions = timeout(LIMIT, drain(&mut events)).await.expect("teardown in time");
    assert_eq!(completions.len(), 1);
}

#[tokio::test]
async fn test_commands_to_unknown_battle() {
    let (_, service) = arena(0);
    let id = citadel_raid::core::types::BattleId::new();
    assert_eq!(
        service.deploy_troop(id, TroopType::Giant, Vec2::new(1.0, 1.0)).await,
        Err(ArenaError::BattleNotFound(id))
    );
    assert_eq!(service.wait_for_result(id).await, Err(ArenaError::BattleNotFound(id)));
}

#[tokio::test]
async fn test_shared_defender_loot_is_conserved() {
    let (store, service) = arena(60);
    let raider = PlayerId(3);
    store.insert_online(PlayerData::new(raider, "Raider", 1000, 3));
    let gold = |id| store.get_player_data(id).map_or(0, |p| p.resource(ResourceType::Gold));
    let before = gold(ATTACKER) + gold(DEFENDER) + gold(raider);

    let mut first = service.request_battle(ATTACKER, DEFENDER, giants(1)).expect("first raid");
    let mut second = service.request_battle(raider, DEFENDER, giants(1)).expect("second raid");

    for ticket in [&first, &second] {
        service
            .deploy_troop(ticket.ready.battle_id, TroopType::Giant, Vec2::new(19.0, 22.0))
            .await
            .expect("deploy sent");
    }
    for ticket in [&first, &second] {
        let result = timeout(LIMIT, service.wait_for_result(ticket.ready.battle_id))
            .await
            .expect("battle finished in time")
            .expect("result available");
        // Both raids earned the full reserve from the same snapshot
        assert_eq!(result.loot.get(&ResourceType::Gold), Some(&10_000));
        service
            .return_to_overworld(ticket.ready.battle_id)
            .await
            .expect("battle still registered");
    }
    timeout(LIMIT, drain(&mut first.events)).await.expect("first teardown in time");
    timeout(LIMIT, drain(&mut second.events)).await.expect("second teardown in time");

    assert_eq!(gold(DEFENDER), 0);
    assert_eq!(gold(ATTACKER) + gold(raider), 10_000 + 500);
    assert_eq!(gold(ATTACKER) + gold(DEFENDER) + gold(raider), before);
}
