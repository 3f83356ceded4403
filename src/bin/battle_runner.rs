//! Headless Battle Runner
//!
//! Generates a synthetic base, plays a scripted raid against it and prints
//! the result. With `--runs N` the same raid is simulated N times in
//! parallel and every run must agree.

use std::sync::Arc;

use citadel_raid::battle::{
    ArmyComposition, AttackerProfile, BattleReplay, BattleResult, BattleState, DeployCommand,
    OpponentProfile, SpellType, TroopType,
};
use citadel_raid::core::types::{BattleId, PlayerId, ResourceType, Tick, Vec2};
use citadel_raid::core::RaidConfig;
use citadel_raid::matchmaking::{generate_base, MAX_BASE_LEVEL};
use clap::Parser;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::Serialize;
use uuid::Uuid;

/// Headless Battle Runner - scripted raids against generated bases
#[derive(Parser, Debug)]
#[command(name = "battle_runner")]
#[command(about = "Simulate a scripted raid and print the battle result")]
struct Args {
    /// Defender base level
    #[arg(long, default_value_t = 3)]
    level: u8,

    /// Army preset: giants, mixed or air
    #[arg(long, default_value = "mixed")]
    army: String,

    /// Config file (defaults are used when absent)
    #[arg(long)]
    config: Option<String>,

    /// Random seed for the generated base
    #[arg(long)]
    seed: Option<u64>,

    /// Simulate this many copies in parallel and check they agree
    #[arg(long, default_value_t = 1)]
    runs: usize,

    /// Output format: json or text
    #[arg(long, default_value = "json")]
    format: String,

    /// Print the battle log to stderr
    #[arg(long, short = 'v')]
    verbose: bool,
}

/// JSON output structure
#[derive(Serialize)]
struct RunnerOutput {
    seed: u64,
    level: u8,
    army: String,
    runs: usize,
    consistent: bool,
    replay_verified: bool,
    ticks: Tick,
    result: BattleResult,
}

type Script = Vec<(Tick, DeployCommand)>;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let rules = match &args.config {
        Some(path) => RaidConfig::load(path).unwrap_or_else(|e| {
            eprintln!("Warning: Failed to load config '{}': {}", path, e);
            eprintln!("Using default config");
            RaidConfig::default()
        }),
        None => RaidConfig::default(),
    };
    let rules = Arc::new(rules);

    let seed = args.seed.unwrap_or_else(rand::random);
    let level = args.level.clamp(1, MAX_BASE_LEVEL);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let defender = OpponentProfile {
        id: PlayerId(-1),
        name: format!("Generated Base L{}", level),
        trophies: 400 * i32::from(level),
        base_level: level,
        resources: ResourceType::ALL
            .iter()
            .map(|&r| (r, 10_000 * u64::from(level)))
            .collect(),
        buildings: generate_base(level, rules.battle.arena_size, &mut rng),
    };
    let attacker = AttackerProfile::new(PlayerId(1), defender.trophies);

    let Some((army, script)) = preset(&args.army, rules.battle.arena_size) else {
        eprintln!("Unknown army preset '{}' (expected giants, mixed or air)", args.army);
        std::process::exit(2);
    };

    let battle_id = BattleId(Uuid::from_u64_pair(seed, u64::from(level)));
    let runs = args.runs.max(1);

    let outcomes: Vec<(BattleResult, BattleState)> = (0..runs)
        .into_par_iter()
        .map(|_| {
            play(
                battle_id,
                attacker,
                army.clone(),
                defender.clone(),
                &script,
                Arc::clone(&rules),
            )
        })
        .collect();

    let (result, state) = &outcomes[0];
    let consistent = outcomes.iter().all(|(r, _)| r == result);
    let replay_verified = BattleReplay::capture(state, army.clone()).verify(Arc::clone(&rules), result);

    if args.verbose {
        for event in &state.battle_log {
            eprintln!("  [{}] {:?}: {}", event.tick, event.event_type, event.description);
        }
        eprintln!();
    }

    let output = RunnerOutput {
        seed,
        level,
        army: args.army.clone(),
        runs,
        consistent,
        replay_verified,
        ticks: state.tick,
        result: result.clone(),
    };

    match args.format.as_str() {
        "text" => print_text(&output),
        "json" => print_json(&output),
        _ => {
            eprintln!("Unknown format '{}', defaulting to json", args.format);
            print_json(&output);
        }
    }

    if !consistent || !replay_verified {
        std::process::exit(1);
    }
}

fn play(
    battle_id: BattleId,
    attacker: AttackerProfile,
    army: ArmyComposition,
    defender: OpponentProfile,
    script: &[(Tick, DeployCommand)],
    rules: Arc<RaidConfig>,
) -> (BattleResult, BattleState) {
    let mut state = BattleState::new(battle_id, attacker, army, defender, rules);
    state.start();

    let mut next = 0;
    while state.result.is_none() {
        while let Some((tick, command)) = script.get(next) {
            if *tick > state.tick {
                break;
            }
            if let Err(reason) = state.queue_deployment(*command) {
                tracing::warn!(%reason, "Scripted deployment refused");
            }
            next += 1;
        }
        state.run_tick();
    }

    let result = state.run_to_completion();
    (result, state)
}

/// Army and deployment script for a preset
fn preset(name: &str, arena_size: f32) -> Option<(ArmyComposition, Script)> {
    let mid = arena_size / 2.0;
    let west = Vec2::new(1.0, mid);
    let east = Vec2::new(arena_size - 1.0, mid);
    let north = Vec2::new(mid, 1.0);
    let south = Vec2::new(mid, arena_size - 1.0);

    let troop = |tick, troop, position| (tick, DeployCommand::troop(troop, position));
    let spell = |tick, spell, position| (tick, DeployCommand::spell(spell, position));

    match name {
        "giants" => {
            let army = ArmyComposition::new(40, 0).with_troops(TroopType::Giant, 8);
            let script = [west, east, north, south, west, east, north, south]
                .into_iter()
                .enumerate()
                .map(|(i, pos)| troop(i as Tick * 5, TroopType::Giant, pos))
                .collect();
            Some((army, script))
        }
        "mixed" => {
            let army = ArmyComposition::new(60, 4)
                .with_troops(TroopType::Giant, 4)
                .with_troops(TroopType::Barbarian, 20)
                .with_troops(TroopType::Archer, 20)
                .with_spells(SpellType::Rage, 1)
                .with_spells(SpellType::Heal, 1);
            let mut script: Script = (0..4).map(|i| troop(i * 3, TroopType::Giant, west)).collect();
            script.extend((0..20).map(|i| troop(30 + i, TroopType::Barbarian, west)));
            script.extend((0..20).map(|i| troop(60 + i, TroopType::Archer, west)));
            script.push(spell(150, SpellType::Rage, Vec2::new(mid - 8.0, mid)));
            script.push(spell(300, SpellType::Heal, Vec2::new(mid - 6.0, mid)));
            Some((army, script))
        }
        "air" => {
            let army = ArmyComposition::new(60, 2)
                .with_troops(TroopType::Dragon, 2)
                .with_troops(TroopType::Balloon, 4)
                .with_spells(SpellType::Freeze, 2);
            let script = vec![
                troop(0, TroopType::Dragon, north),
                troop(0, TroopType::Dragon, south),
                troop(20, TroopType::Balloon, north),
                troop(20, TroopType::Balloon, south),
                troop(40, TroopType::Balloon, east),
                troop(40, TroopType::Balloon, west),
                spell(100, SpellType::Freeze, Vec2::new(mid, mid - 5.0)),
                spell(100, SpellType::Freeze, Vec2::new(mid, mid + 5.0)),
            ];
            Some((army, script))
        }
        _ => None,
    }
}

fn print_json(output: &RunnerOutput) {
    match serde_json::to_string_pretty(output) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize result: {}", e),
    }
}

fn print_text(output: &RunnerOutput) {
    let result = &output.result;
    println!("Battle Result");
    println!("=============");
    println!("Victory: {}", result.victory);
    println!("Stars: {}", result.stars);
    println!("Destruction: {:.1}%", result.destruction);
    println!("Town hall destroyed: {}", result.town_hall_destroyed);
    println!("Buildings destroyed: {}", result.buildings_destroyed);
    println!("Troops lost: {}", result.troops_lost);
    println!("Duration: {:.1}s ({} ticks)", result.duration_secs, output.ticks);
    for (resource, amount) in &result.loot {
        println!("Loot {:?}: {}", resource, amount);
    }
    println!("Trophies: {:+}", result.trophy_delta);
    println!();
    println!("Base level {} / army '{}'", output.level, output.army);
    println!("Runs: {} (consistent: {}, replay verified: {})", output.runs, output.consistent, output.replay_verified);
    println!("Seed: {}", output.seed);
}
