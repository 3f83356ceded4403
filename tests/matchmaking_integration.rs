//! Matchmaking integration tests

use std::sync::Arc;

use citadel_raid::core::clock::FixedClock;
use citadel_raid::core::types::{PlayerId, ResourceType};
use citadel_raid::core::RaidConfig;
use citadel_raid::matchmaking::*;

const NOW: u64 = 1_700_000_000;

fn rules(seed: u64) -> RaidConfig {
    let mut rules = RaidConfig::default();
    rules.matchmaking.seed = Some(seed);
    rules
}

fn setup(seed: u64) -> (Arc<InMemoryPlayerStore>, Matchmaker) {
    let store = Arc::new(InMemoryPlayerStore::new());
    let mm = Matchmaker::new(
        &rules(seed),
        store.clone(),
        OpponentCatalog::default(),
        Arc::new(FixedClock::new(NOW)),
    );
    (store, mm)
}

#[test]
fn test_never_matches_self_or_shielded() {
    for seed in 0..50 {
        let (store, mm) = setup(seed);
        store.insert_online(PlayerData::new(PlayerId(1), "Attacker", 1000, 4));
        store.insert_online(PlayerData::new(PlayerId(2), "Shielded", 1010, 4).with_shield_until(NOW + 3600));
        store.insert_online(PlayerData::new(PlayerId(3), "Open", 1100, 4));
        store.insert_online(PlayerData::new(PlayerId(4), "Expired", 950, 4).with_shield_until(NOW));
        store.insert_online(PlayerData::new(PlayerId(5), "Also open", 1180, 4));

        let found = mm.find_opponent(PlayerId(1), 1000);
        assert_ne!(found.id, PlayerId(1));
        assert_ne!(found.id, PlayerId(2));
        assert!([PlayerId(3), PlayerId(4), PlayerId(5)].contains(&found.id));
    }
}

#[test]
fn test_pick_is_among_nearest_three() {
    let (store, mm) = setup(3);
    for (id, trophies) in [(2, 1010), (3, 1020), (4, 1030), (5, 1040), (6, 1050)] {
        store.insert_online(PlayerData::new(PlayerId(id), format!("P{}", id), trophies, 4));
    }

    for _ in 0..30 {
        let found = mm.find_opponent(PlayerId(1), 1000);
        assert!([PlayerId(2), PlayerId(3), PlayerId(4)].contains(&found.id));
    }
}

#[test]
fn test_falls_back_to_catalog() {
    let (store, mm) = setup(9);
    store.insert_online(PlayerData::new(PlayerId(1), "Attacker", 2000, 5));
    store.insert_online(PlayerData::new(PlayerId(2), "Too strong", 2600, 6));
    store.insert_online(PlayerData::new(PlayerId(3), "Shielded", 2000, 5).with_shield_until(NOW + 1));

    let found = mm.find_opponent(PlayerId(1), 2000);

    assert!(found.is_synthetic());
    assert_eq!(found.id, PlayerId(-5));
    assert!(!found.buildings.is_empty());
    assert!(found.town_hall().is_some());
    assert!((found.trophies - 1800).abs() <= 50);
    assert!(mm.can_be_attacked(found.id));
}

#[test]
fn test_same_seed_same_opponents() {
    let run = || {
        let (_, mm) = setup(21);
        (0..5).map(|_| mm.find_opponent(PlayerId(1), 700)).collect::<Vec<_>>()
    };
    assert_eq!(run(), run());
}

#[test]
fn test_reroll_fees_charged_in_gold() {
    let (store, mm) = setup(4);
    store.insert(
        PlayerData::new(PlayerId(1), "Attacker", 1000, 4)
            .with_resource(ResourceType::Gold, 250)
            .with_resource(ResourceType::Elixir, 10_000),
    );

    for search in 1..=3 {
        let (_, cost) = mm.next_opponent(PlayerId(1), search).expect("free");
        assert_eq!(cost, 0);
    }

    let (_, cost) = mm.next_opponent(PlayerId(1), 4).expect("affordable");
    assert_eq!(cost, 100);
    let gold = |store: &InMemoryPlayerStore| {
        store.get_player_data(PlayerId(1)).map(|p| p.resource(ResourceType::Gold))
    };
    assert_eq!(gold(&store), Some(150));

    // 200 gold needed, 150 left: nothing changes
    assert_eq!(
        mm.next_opponent(PlayerId(1), 5),
        Err(MatchmakingError::InsufficientFunds { required: 200, available: 150 })
    );
    assert_eq!(gold(&store), Some(150));
    assert_eq!(
        store.get_player_data(PlayerId(1)).map(|p| p.resource(ResourceType::Elixir)),
        Some(10_000)
    );
}

#[test]
fn test_unknown_attacker_cannot_reroll() {
    let (_, mm) = setup(1);
    assert_eq!(
        mm.next_opponent(PlayerId(77), 1),
        Err(MatchmakingError::PlayerNotFound(PlayerId(77)))
    );
}

#[test]
fn test_cache_hides_players_until_refresh() {
    let store = Arc::new(InMemoryPlayerStore::new());
    let clock = Arc::new(FixedClock::new(NOW));
    let mm = Matchmaker::new(&rules(2), store.clone(), OpponentCatalog::default(), clock.clone());

    assert!(mm.find_opponent(PlayerId(1), 1000).is_synthetic());

    store.insert_online(PlayerData::new(PlayerId(2), "Late", 1000, 4));
    assert!(mm.find_opponent(PlayerId(1), 1000).is_synthetic());

    clock.advance(30);
    assert_eq!(mm.find_opponent(PlayerId(1), 1000).id, PlayerId(2));
}

#[test]
fn test_shield_applies_before_cache_refresh() {
    let clock = Arc::new(FixedClock::new(NOW));
    let store = Arc::new(InMemoryPlayerStore::new());
    let mm = Matchmaker::new(&rules(5), store.clone(), OpponentCatalog::default(), clock.clone());
    for (id, trophies) in [(2, 1005), (3, 1010), (4, 1020), (5, 1030)] {
        store.insert_online(PlayerData::new(PlayerId(id), format!("P{}", id), trophies, 4));
    }
    mm.find_opponent(PlayerId(1), 1000);

    store.set_shield(PlayerId(2), Some(NOW + 3600));
    clock.advance(1);

    for _ in 0..30 {
        let found = mm.find_opponent(PlayerId(1), 1000);
        assert_ne!(found.id, PlayerId(2));
        // The next-nearest player takes the shielded one's place in the pool
        assert!([PlayerId(3), PlayerId(4), PlayerId(5)].contains(&found.id));
        assert!(mm.can_be_attacked(found.id));
    }
}
