//! Whole-session behaviour through [`Simulation::tick`].

use glam::Vec2;
use visage_common::EntityId;
use visage_gameplay::{
    Archetype, ChannelPresentation, Damageable, DamageOutcome, EnemyTemplate, InitialState,
    LocalAuthority, LocalLifecycle, PlayerCommand, PresentationEvent, SimEvent, Simulation,
    SimulationSettings, TemplateRegistry, WaveScript, WaveSegment,
};

fn template(name: &str, archetype: Archetype, health: f32) -> EnemyTemplate {
    let mut template = EnemyTemplate::new(name, archetype).with_vitals(health, 10.0);
    template.agent.initial_state = InitialState::Idle;
    template
}

fn settings(script: Vec<WaveSegment>) -> SimulationSettings {
    SimulationSettings {
        seed: 42,
        templates: TemplateRegistry::from_templates([
            template("biter", Archetype::Angry, 50.0),
            template("sponge", Archetype::Sad, 10.0),
        ]),
        script: WaveScript::new(script),
        ..SimulationSettings::default()
    }
}

fn hits_on(events: &[SimEvent], target: EntityId) -> Vec<f32> {
    events
        .iter()
        .filter_map(|e| match e {
            SimEvent::Hit(hit) if hit.target == target => Some(hit.damage),
            _ => None,
        })
        .collect()
}

#[test]
fn test_enemy_attacks_nearby_player() {
    let mut sim = Simulation::host(settings(Vec::new())).unwrap();
    let player = sim.add_player(Archetype::Neutral, Vec2::ZERO);
    sim.spawn_enemy("biter", Vec2::new(1.0, 0.0), 1.0).unwrap();

    sim.run_for(4.0);
    let events = sim.take_events();
    let hits = hits_on(&events, player);
    assert!(!hits.is_empty());
    // Angry attacker on a Neutral defender: 10 * 1.5
    assert!(hits.iter().all(|d| (d - 15.0).abs() < 1e-3));

    let health = sim.arena().get(player).unwrap().current_health();
    assert!((health - (100.0 - 15.0 * hits.len() as f32)).abs() < 1e-3);
}

#[test]
fn test_kill_drop_and_collect() {
    let mut sim = Simulation::host(settings(Vec::new())).unwrap();
    let player = sim.add_player(Archetype::Angry, Vec2::ZERO);
    let enemy = sim.spawn_enemy("sponge", Vec2::new(1.0, 0.0), 1.0).unwrap();

    // Angry on Sad with advantage: 10 * (1 + 0.5 - 0.4 + 0.3 - 0.2) = 12
    let outcome = sim
        .apply_player_command(player, PlayerCommand::Attack(Vec2::X))
        .unwrap();
    assert!(matches!(
        outcome,
        visage_gameplay::PlayerOutcome::Attacked(ref hits)
            if matches!(hits[..], [ref hit] if matches!(hit.outcome, DamageOutcome::Killed { .. }))
    ));

    let drop = *sim.pickups().iter().next().unwrap();
    assert!(drop.position.distance(Vec2::new(1.0, 0.0)) <= 0.5 + 1e-4);
    assert!((5..=15).contains(&drop.amount));

    sim.arena_mut().get_mut(player).unwrap().position = drop.position;
    sim.tick();
    assert_eq!(sim.player(player).unwrap().money(), drop.amount);
    assert!(sim.pickups().is_empty());

    sim.run_for(2.5);
    assert!(sim.agent(enemy).is_none());
    assert!(sim.arena().get(enemy).is_none());
}

#[test]
fn test_shop_purchase_after_collecting() {
    let mut sim = Simulation::host(settings(Vec::new())).unwrap();
    let player = sim.add_player(Archetype::Angry, Vec2::ZERO);
    sim.spawn_enemy("sponge", Vec2::new(1.0, 0.0), 1.0).unwrap();
    sim.apply_player_command(player, PlayerCommand::Attack(Vec2::X))
        .unwrap();
    let drop = *sim.pickups().iter().next().unwrap();
    sim.arena_mut().get_mut(player).unwrap().position = drop.position;
    sim.tick();

    let money = sim.player(player).unwrap().money();
    let outcome = sim
        .apply_player_command(player, PlayerCommand::BuyPotion { slot: 0, price: 5 })
        .unwrap();
    assert_eq!(
        outcome,
        visage_gameplay::PlayerOutcome::Purchased { money: money - 5 }
    );
    assert!(sim
        .apply_player_command(player, PlayerCommand::BuyPotion { slot: 0, price: 1000 })
        .is_err());
    assert_eq!(sim.player(player).unwrap().potions(), [1, 0, 0]);
}

#[test]
fn test_waves_spawn_scaled_enemies() {
    let script = vec![
        WaveSegment::SpawnBurst {
            template: "biter".to_string(),
            point: Vec2::new(20.0, 20.0),
            spread: 1.0,
            quantity: 1,
        },
        WaveSegment::Wait {
            duration: 1.0,
            increment_wave: true,
            activate_npc: true,
            deactivate_after: true,
        },
        WaveSegment::SpawnBurst {
            template: "biter".to_string(),
            point: Vec2::new(-20.0, 20.0),
            spread: 1.0,
            quantity: 1,
        },
    ];
    let presentation = ChannelPresentation::new(1024);
    let receiver = presentation.receiver();
    let mut sim = Simulation::new(
        settings(script),
        Box::new(LocalAuthority::Host),
        Box::new(presentation),
        Box::new(LocalLifecycle::new()),
    )
    .unwrap();
    sim.add_player(Archetype::Neutral, Vec2::ZERO);
    sim.add_player(Archetype::Neutral, Vec2::new(0.0, -3.0));

    sim.run_for(2.0);
    assert!(sim.script_finished());
    assert_eq!(sim.wave(), 2);

    let events = sim.take_events();
    let spawned: Vec<EntityId> = events
        .iter()
        .filter_map(|e| match e {
            SimEvent::EnemySpawned { entity, .. } => Some(*entity),
            _ => None,
        })
        .collect();
    // One per segment per connected client.
    assert_eq!(spawned.len(), 4);
    let first = sim.arena().get(spawned[0]).unwrap().max_health();
    let last = sim.arena().get(spawned[3]).unwrap().max_health();
    assert_eq!(first, 50.0);
    assert!((last - 65.0).abs() < 1e-3);

    assert!(events.contains(&SimEvent::WaveStarted(2)));
    assert!(events.contains(&SimEvent::ScriptFinished));
    let npc: Vec<bool> = receiver
        .try_iter()
        .filter_map(|e| match e {
            PresentationEvent::NpcVisibility { visible } => Some(visible),
            _ => None,
        })
        .collect();
    assert_eq!(npc, vec![true, false]);
}

#[test]
fn test_client_context_spawns_nothing() {
    let script = vec![WaveSegment::SpawnBurst {
        template: "biter".to_string(),
        point: Vec2::ZERO,
        spread: 0.0,
        quantity: 3,
    }];
    let mut sim = Simulation::new(
        settings(script),
        Box::new(LocalAuthority::client_owning(EntityId::from_raw(1))),
        Box::new(visage_gameplay::NullPresentation),
        Box::new(LocalLifecycle::new()),
    )
    .unwrap();
    sim.run_for(1.0);
    assert_eq!(sim.live_enemies(), 0);
    assert!(!sim.script_finished());
}

#[test]
fn test_same_seed_same_run() {
    let script = vec![WaveSegment::SpawnRepeating {
        template: "biter".to_string(),
        point: Vec2::new(4.0, 0.0),
        spread: 2.0,
        interval: 0.5,
        repeat: 4,
    }];
    let run = || {
        let mut sim = Simulation::host(settings(script.clone())).unwrap();
        sim.add_player(Archetype::Happy, Vec2::ZERO);
        sim.run_for(5.0);
        sim.snapshot()
    };
    let a = run();
    let b = run();
    assert_eq!(a.len(), 4);
    assert_eq!(a, b);
}
