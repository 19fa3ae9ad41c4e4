//! Headless симуляция: один агент патрулирует, замечает игрока, атакует.
//!
//! Детерминировано (seed), без рендера. Difficulty растёт по ходу прогона.

use bevy::prelude::*;
use bevy_rapier3d::prelude::Collider;

use stalker_simulation::ai::{AgentStateChanged, AttackExecuted};
use stalker_simulation::audio::{AgentAudio, AudioRequest, ClipSet};
use stalker_simulation::config::DifficultyTable;
use stalker_simulation::difficulty::EscalationAccrual;
use stalker_simulation::movement::HeadlessMover;
use stalker_simulation::{
    actor_collision_groups, create_headless_app, log_error, log_info, obstacle_collision_groups, run_fixed_ticks,
    Agent, EscalationStimulus, Health, Obstacle, PatrolAnchor, Perception, SimulationPlugin, SimulationSet,
    TierChanged,
};

const DIFFICULTY: &str = r#"
[accrual]
base_rate = 2.0

[[tier]]
rank = 0
baseline = 0.0
[tier.profile]
name = "wary"
move_speed = 2.5
detection_range = 10.0

[[tier]]
rank = 1
baseline = 40.0
[tier.profile]
name = "hunting"
move_speed = 3.5
detection_range = 16.0
detection_angle = 140.0
attack_damage = 25.0
"#;

fn main() {
    let seed = 42;
    let mut app = create_headless_app(seed);
    log_info(&format!("Starting stalker headless simulation (seed: {})", seed));

    let (escalation, accrual) = match DifficultyTable::from_toml_str(DIFFICULTY).and_then(|t| t.into_escalation()) {
        Ok(loaded) => loaded,
        Err(error) => {
            log_error(&format!("Difficulty table rejected: {}", error));
            return;
        }
    };
    app.insert_resource(escalation)
        .add_plugins(SimulationPlugin)
        .add_systems(FixedUpdate, report_events.after(SimulationSet::Cleanup));
    if let Some(accrual) = accrual {
        app.insert_resource::<EscalationAccrual>(accrual);
    }

    let world = app.world_mut();

    // Стена между маршрутом и игроком
    world.spawn((
        Obstacle,
        Transform::from_xyz(0.0, 0.0, -6.0),
        Collider::cuboid(3.0, 2.0, 0.25),
        obstacle_collision_groups(),
    ));

    let player = world
        .spawn((
            Transform::from_xyz(8.0, 0.0, -12.0),
            Collider::ball(0.5),
            actor_collision_groups(),
            Health::new(100.0),
        ))
        .id();

    world.spawn((
        Agent,
        Transform::from_xyz(0.0, 0.0, 0.0),
        Collider::ball(0.4),
        actor_collision_groups(),
        Perception::default().with_eye_height(1.6),
        HeadlessMover,
        PatrolAnchor::new(
            Vec3::ZERO,
            vec![Vec3::new(6.0, 0.0, 0.0), Vec3::new(6.0, 0.0, -10.0), Vec3::new(-6.0, 0.0, -10.0)],
        ),
        AgentAudio {
            spotted: Some(ClipSet::random(&["spotted_01", "spotted_02"])),
            chase: Some(ClipSet::random(&["chase_loop"]).looping()),
            attack: Some(ClipSet::sequential(&["swing", "grunt"], 0.3)),
            ..default()
        },
    ));

    // 30 секунд симуляции
    for second in 0..30 {
        if second == 10 {
            app.world_mut().send_event(EscalationStimulus::AddPoints(15.0));
        }

        run_fixed_ticks(&mut app, 60);

        let hp = app.world().get::<Health>(player).map(|h| h.current).unwrap_or(0.0);
        if hp <= 0.0 {
            log_info(&format!("Player down at t={}s", second));
            break;
        }
    }

    log_info("Simulation complete!");
}

/// Система: лог того, что произошло за тик (state, удары, tier, аудио)
fn report_events(
    time: Res<Time<Fixed>>,
    mut changes: EventReader<AgentStateChanged>,
    mut attacks: EventReader<AttackExecuted>,
    mut tiers: EventReader<TierChanged>,
    mut audio: EventReader<AudioRequest>,
) {
    let t = time.elapsed_secs();

    for change in changes.read() {
        log_info(&format!("t={:.2}s {:?}: {:?} → {:?}", t, change.agent, change.from, change.to));
    }
    for attack in attacks.read() {
        log_info(&format!("t={:.2}s attack on {:?}: {:.1} damage", t, attack.target, attack.damage_dealt));
    }
    for change in tiers.read() {
        log_info(&format!("t={:.2}s difficulty → '{}'", t, change.tier.profile.name));
    }
    for request in audio.read() {
        log_info(&format!("t={:.2}s 🔊 {:?}", t, request));
    }
}
