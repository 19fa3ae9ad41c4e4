//! Tests for AgentController transition rules (без App, mock WorldView).

use std::collections::HashMap;

use bevy::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use super::components::*;
use super::controller::*;
use super::events::{AnimationIntent, CueKind};
use crate::components::MotionBinding;
use crate::stats::StatProfile;

const DT: f32 = 0.25;

fn target() -> Entity {
    Entity::from_raw(77)
}

/// Мир-заглушка: кого видит scan, где кто стоит, есть ли LOS
#[derive(Default)]
struct MockWorld {
    in_cone: Option<Entity>,
    positions: HashMap<Entity, Vec3>,
    line_of_sight: bool,
}

impl MockWorld {
    fn with_target(position: Vec3) -> Self {
        let mut positions = HashMap::new();
        positions.insert(target(), position);
        Self {
            in_cone: Some(target()),
            positions,
            line_of_sight: true,
        }
    }

    fn move_target(&mut self, position: Vec3) {
        self.positions.insert(target(), position);
    }
}

impl WorldView for MockWorld {
    fn scan(&self, _origin: Vec3, _forward: Vec3) -> Option<Entity> {
        self.in_cone
    }

    fn position_of(&self, entity: Entity) -> Option<Vec3> {
        self.positions.get(&entity).copied()
    }

    fn has_line_of_sight(&self, _origin: Vec3, target: Entity) -> bool {
        self.line_of_sight && self.positions.contains_key(&target)
    }
}

struct Harness {
    controller: AgentController,
    stats: StatProfile,
    config: AgentConfig,
    route: Option<PatrolRoute>,
    motion: MotionBinding,
    rng: ChaCha8Rng,
    effects: Vec<AgentEffect>,
    position: Vec3,
}

impl Harness {
    fn new(route: Option<PatrolRoute>) -> Self {
        Self {
            controller: AgentController::default(),
            stats: StatProfile::default(),
            config: AgentConfig::default(),
            route,
            motion: MotionBinding::default(),
            rng: ChaCha8Rng::seed_from_u64(42),
            effects: Vec::new(),
            position: Vec3::ZERO,
        }
    }

    /// Агент сразу в заданном состоянии с запомненной целью
    fn in_state(state: AgentState, world: &MockWorld) -> Self {
        let mut harness = Self::new(None);
        harness.controller.initialized = true;
        harness.controller.state = state;
        if let Some(position) = world.position_of(target()) {
            harness.controller.memory.acquire(target(), position);
        }
        harness
    }

    fn run(&mut self, world: &MockWorld, initialize: bool) {
        let mut ctx = AgentTick {
            delta: DT,
            position: self.position,
            eye: self.position,
            forward: Vec3::NEG_Z,
            stats: &self.stats,
            config: &self.config,
            world,
            route: self.route.as_mut(),
            motion: &mut self.motion,
            rng: &mut self.rng,
            effects: &mut self.effects,
        };

        if initialize {
            self.controller.initialize(&mut ctx);
        } else {
            self.controller.tick(&mut ctx);
        }
    }

    fn init(&mut self, world: &MockWorld) {
        self.run(world, true);
    }

    fn tick(&mut self, world: &MockWorld) {
        self.run(world, false);
    }

    fn state(&self) -> AgentStateKind {
        self.controller.current_state()
    }

    fn attacks(&self) -> usize {
        self.effects
            .iter()
            .filter(|effect| matches!(effect, AgentEffect::Attack { .. }))
            .count()
    }
}

fn square_route() -> PatrolRoute {
    PatrolRoute::new(
        vec![
            Vec3::new(10.0, 0.0, 0.0),
            Vec3::new(10.0, 0.0, 10.0),
            Vec3::new(0.0, 0.0, 10.0),
        ],
        true,
    )
}

#[test]
fn test_initialize_without_route_forces_idle() {
    let mut harness = Harness::new(None);
    harness.config.idle_chance = 0.0;
    harness.init(&MockWorld::default());

    assert!(harness.controller.is_initialized());
    assert_eq!(harness.state(), AgentStateKind::Idle);

    let AgentState::Idle { duration, .. } = *harness.controller.state() else {
        panic!("expected Idle");
    };
    assert!((2.0..=5.0).contains(&duration));
}

#[test]
fn test_uninitialized_controller_does_not_tick() {
    let mut harness = Harness::new(None);
    harness.tick(&MockWorld::with_target(Vec3::new(0.0, 0.0, -5.0)));

    assert_eq!(harness.state(), AgentStateKind::Idle);
    assert!(harness.effects.is_empty());
}

#[test]
fn test_idle_spots_target_and_enters_seen() {
    let world = MockWorld::with_target(Vec3::new(0.0, 0.0, -5.0));
    let mut harness = Harness::new(None);
    harness.init(&MockWorld::default());
    harness.effects.clear();

    harness.tick(&world);

    assert_eq!(harness.state(), AgentStateKind::Seen);
    assert_eq!(harness.controller.target(), Some(target()));
    assert!(harness.effects.contains(&AgentEffect::Cue(CueKind::Spotted)));
    // Exit старого состояния прерывает loop/sequence, но не глушит агента целиком
    assert!(harness.effects.contains(&AgentEffect::Cue(CueKind::Interrupt)));
    assert!(!harness.effects.contains(&AgentEffect::Cue(CueKind::Silence)));
}

#[test]
fn test_idle_expires_into_default_behavior() {
    let mut harness = Harness::new(Some(square_route()));
    harness.config.idle_chance = 1.0;
    harness.config.idle_min = 1.0;
    harness.config.idle_max = 1.0;
    harness.init(&MockWorld::default());
    harness.effects.clear();

    for _ in 0..4 {
        harness.tick(&MockWorld::default());
    }

    // Re-roll: idle_chance 1.0 → снова Idle (повторный вход)
    assert_eq!(harness.state(), AgentStateKind::Idle);
    assert!(harness.effects.contains(&AgentEffect::StateChanged {
        from: AgentStateKind::Idle,
        to: AgentStateKind::Idle,
    }));
}

#[test]
fn test_patrol_follows_route_and_advances() {
    let mut harness = Harness::new(Some(square_route()));
    harness.config.idle_chance = 0.0;
    harness.init(&MockWorld::default());

    assert_eq!(harness.state(), AgentStateKind::Patrol);
    assert_eq!(harness.motion.destination, Some(Vec3::new(10.0, 0.0, 0.0)));

    harness.position = Vec3::new(9.8, 0.0, 0.0);
    harness.tick(&MockWorld::default());

    assert_eq!(harness.route.as_ref().unwrap().current_index(), 1);
    assert_eq!(harness.motion.destination, Some(Vec3::new(10.0, 0.0, 10.0)));
    assert_eq!(harness.motion.max_speed, harness.stats.move_speed);
}

#[test]
fn test_patrol_end_of_path_counts_as_reached() {
    let mut harness = Harness::new(Some(square_route()));
    harness.config.idle_chance = 0.0;
    harness.init(&MockWorld::default());

    harness.motion.reached_end_of_path = true;
    harness.tick(&MockWorld::default());

    assert_eq!(harness.route.as_ref().unwrap().current_index(), 1);
}

#[test]
fn test_patrol_stuck_forces_next_waypoint_on_threshold_tick() {
    let mut harness = Harness::new(Some(square_route()));
    harness.config.idle_chance = 0.0;
    harness.init(&MockWorld::default());

    // Стоим на месте: 0.25 × 19 = 4.75 сек
    for _ in 0..19 {
        harness.tick(&MockWorld::default());
    }
    assert_eq!(harness.route.as_ref().unwrap().current_index(), 0);

    // Тик 20: ровно 5 сек без движения
    harness.tick(&MockWorld::default());
    assert_eq!(harness.route.as_ref().unwrap().current_index(), 1);
    assert_eq!(harness.state(), AgentStateKind::Patrol);
}

#[test]
fn test_one_way_route_finish_rerolls_default() {
    let route = PatrolRoute::new(vec![Vec3::new(0.1, 0.0, 0.0)], false);
    let mut harness = Harness::new(Some(route));
    harness.config.idle_chance = 0.0;
    harness.init(&MockWorld::default());
    harness.effects.clear();

    harness.tick(&MockWorld::default());

    // Маршрут закончился → default (idle_chance 0 → снова Patrol)
    assert_eq!(harness.state(), AgentStateKind::Patrol);
    assert!(harness.effects.contains(&AgentEffect::StateChanged {
        from: AgentStateKind::Patrol,
        to: AgentStateKind::Patrol,
    }));
}

#[test]
fn test_seen_slow_phase_then_chase() {
    let world = MockWorld::with_target(Vec3::new(0.0, 0.0, -8.0));
    let mut harness = Harness::in_state(
        AgentState::Seen {
            elapsed: 0.0,
            phase: SeenPhase::Slow,
        },
        &world,
    );

    for _ in 0..3 {
        harness.tick(&world);
        assert_eq!(harness.state(), AgentStateKind::Seen);
    }
    assert_eq!(harness.motion.max_speed, harness.stats.move_speed * 0.5);
    assert_eq!(harness.motion.destination, Some(Vec3::new(0.0, 0.0, -8.0)));

    // elapsed = 1.0 → Evaluate, 8 ≤ chase_radius
    harness.tick(&world);
    assert_eq!(harness.state(), AgentStateKind::Chase);
    assert_eq!(harness.motion.max_speed, harness.stats.chase_speed());
}

#[test]
fn test_seen_times_out_when_target_stays_far() {
    let world = MockWorld::with_target(Vec3::new(0.0, 0.0, -14.0));
    let mut harness = Harness::in_state(
        AgentState::Seen {
            elapsed: 0.0,
            phase: SeenPhase::Slow,
        },
        &world,
    );

    // 6.0 сек — ещё ждём (timeout строго больше)
    for _ in 0..24 {
        harness.tick(&world);
    }
    assert_eq!(harness.state(), AgentStateKind::Seen);

    harness.tick(&world);
    assert_eq!(harness.state(), AgentStateKind::Idle);
    assert_eq!(harness.controller.target(), None);
}

#[test]
fn test_seen_lost_countdown_abandons() {
    let mut world = MockWorld::with_target(Vec3::new(0.0, 0.0, -14.0));
    let mut harness = Harness::in_state(
        AgentState::Seen {
            elapsed: 0.0,
            phase: SeenPhase::Slow,
        },
        &world,
    );
    world.line_of_sight = false;

    // lost_elapsed 2.0 — не больше lost_countdown
    for _ in 0..8 {
        harness.tick(&world);
    }
    assert_eq!(harness.state(), AgentStateKind::Seen);

    harness.tick(&world);
    assert_eq!(harness.state(), AgentStateKind::Idle);
}

#[test]
fn test_chase_abandons_beyond_leash() {
    let mut world = MockWorld::with_target(Vec3::new(0.0, 0.0, -10.0));
    let mut harness = Harness::in_state(AgentState::Chase, &world);

    world.move_target(Vec3::new(0.0, 0.0, -17.9));
    harness.tick(&world);
    assert_eq!(harness.state(), AgentStateKind::Chase);
    assert_eq!(harness.motion.destination, Some(Vec3::new(0.0, 0.0, -17.9)));

    // 12 × 1.5 = 18
    world.move_target(Vec3::new(0.0, 0.0, -18.1));
    harness.tick(&world);
    assert_eq!(harness.state(), AgentStateKind::Idle);
    assert_eq!(harness.controller.target(), None);
}

#[test]
fn test_chase_enters_attack_only_with_line_of_sight() {
    let mut world = MockWorld::with_target(Vec3::new(0.0, 0.0, -1.5));
    world.line_of_sight = false;
    let mut harness = Harness::in_state(AgentState::Chase, &world);

    harness.tick(&world);
    assert_eq!(harness.state(), AgentStateKind::Chase);

    world.line_of_sight = true;
    harness.tick(&world);
    assert_eq!(harness.state(), AgentStateKind::Attack);
    assert!(!harness.motion.can_move);
}

#[test]
fn test_chase_lost_target_abandons_at_last_known_position() {
    let mut world = MockWorld::with_target(Vec3::new(0.0, 0.0, -6.0));
    let mut harness = Harness::in_state(AgentState::Chase, &world);

    harness.tick(&world);
    world.line_of_sight = false;
    world.move_target(Vec3::new(5.0, 0.0, -10.0));

    // Далеко от last-known: lost > 3 сек, но продолжаем идти к точке
    for _ in 0..16 {
        harness.tick(&world);
    }
    assert_eq!(harness.state(), AgentStateKind::Chase);
    assert_eq!(harness.motion.destination, Some(Vec3::new(0.0, 0.0, -6.0)));

    // Дошли до last-known → бросаем
    harness.position = Vec3::new(0.0, 0.0, -5.0);
    harness.tick(&world);
    assert_eq!(harness.state(), AgentStateKind::Idle);
}

#[test]
fn test_attack_executes_then_always_flees() {
    let world = MockWorld::with_target(Vec3::new(0.0, 0.0, -1.5));
    let mut harness = Harness::in_state(AgentState::Attack, &world);

    harness.tick(&world);

    assert_eq!(harness.attacks(), 1);
    assert!(harness.effects.contains(&AgentEffect::Attack {
        target: target(),
        kind: harness.stats.damage_kind,
        amount: harness.stats.attack_damage,
    }));
    assert_eq!(harness.state(), AgentStateKind::Flee);
    assert_eq!(harness.controller.attack_cooldown, harness.stats.attack_cooldown);
    assert!(harness.effects.contains(&AgentEffect::Animation(AnimationIntent::Float {
        name: "flee_duration",
        value: harness.config.flee_duration,
    })));
}

#[test]
fn test_attack_waits_for_cooldown() {
    let world = MockWorld::with_target(Vec3::new(0.0, 0.0, -1.5));
    let mut harness = Harness::in_state(AgentState::Attack, &world);
    harness.controller.attack_cooldown = 0.6;

    harness.tick(&world);
    harness.tick(&world);
    assert_eq!(harness.attacks(), 0);
    assert_eq!(harness.state(), AgentStateKind::Attack);
    assert!(harness.effects.contains(&AgentEffect::Face(Vec3::new(0.0, 0.0, -1.5))));

    harness.tick(&world);
    assert_eq!(harness.attacks(), 1);
    assert_eq!(harness.state(), AgentStateKind::Flee);
}

#[test]
fn test_attack_returns_to_chase() {
    // 2 × 1.2 = 2.4
    let mut world = MockWorld::with_target(Vec3::new(0.0, 0.0, -2.5));
    let mut harness = Harness::in_state(AgentState::Attack, &world);
    harness.tick(&world);
    assert_eq!(harness.state(), AgentStateKind::Chase);

    world.move_target(Vec3::new(0.0, 0.0, -1.0));
    world.line_of_sight = false;
    let mut harness = Harness::in_state(AgentState::Attack, &world);
    harness.tick(&world);
    assert_eq!(harness.state(), AgentStateKind::Chase);
    assert_eq!(harness.attacks(), 0);
}

#[test]
fn test_flee_expiry_returns_to_chase_or_abandons() {
    let mut world = MockWorld::with_target(Vec3::new(0.0, 0.0, -3.0));
    let mut harness = Harness::in_state(AgentState::Flee { elapsed: 0.0 }, &world);

    for _ in 0..7 {
        harness.tick(&world);
    }
    assert_eq!(harness.state(), AgentStateKind::Flee);
    harness.tick(&world);
    assert_eq!(harness.state(), AgentStateKind::Chase);

    world.line_of_sight = false;
    let mut harness = Harness::in_state(AgentState::Flee { elapsed: 1.9 }, &world);
    harness.tick(&world);
    assert_eq!(harness.state(), AgentStateKind::Idle);
    assert_eq!(harness.controller.target(), None);
}

#[test]
fn test_missing_target_abandons_from_any_state() {
    let world = MockWorld::with_target(Vec3::new(0.0, 0.0, -3.0));
    let gone = MockWorld::default();

    for state in [
        AgentState::Seen {
            elapsed: 0.0,
            phase: SeenPhase::Evaluate,
        },
        AgentState::Chase,
        AgentState::Attack,
        AgentState::Flee { elapsed: 0.0 },
    ] {
        let mut harness = Harness::in_state(state, &world);
        harness.tick(&gone);
        assert_eq!(harness.state(), AgentStateKind::Idle);
        assert_eq!(harness.controller.target(), None);
    }
}

#[test]
fn test_silence_only_once() {
    let mut controller = AgentController::default();
    assert!(controller.silence());
    assert!(!controller.silence());
    assert!(controller.is_silenced());
}

#[test]
fn test_default_behavior_distribution() {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let trials = 10_000;
    let idle_chance = 0.3;

    let idle = (0..trials)
        .filter(|_| choose_default_behavior(&mut rng, idle_chance, true) == AgentStateKind::Idle)
        .count();

    let ratio = idle as f32 / trials as f32;
    assert!((ratio - idle_chance).abs() < 0.02, "idle ratio {ratio}");

    assert_eq!(choose_default_behavior(&mut rng, 0.0, false), AgentStateKind::Idle);
}
