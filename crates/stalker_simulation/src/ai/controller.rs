//! AgentController — логика FSM без ECS
//!
//! Один тик = cooldown → update текущего состояния → (опционально) exit + enter.
//! Exit шлёт CueKind::Interrupt (loop/sequence), полная тишина — только смерть и re-init.
//! Мир агент видит только через WorldView, наружу пишет только AgentEffect:
//! так логика тестируется без App (см. controller_tests.rs).
//!
//! Переходы:
//! - Idle/Patrol: цель в scan → Seen
//! - Seen: дистанция ≤ chase_radius (после медленной фазы) → Chase
//! - Chase: дистанция ≤ attack_range + LOS → Attack
//! - Attack: удар → Flee; LOS потерян / цель дальше leash → Chase
//! - Flee: по таймеру → Chase (видим и близко) или default
//! - Любое "бросить цель" → default behavior (Idle/Patrol)

use bevy::prelude::*;
use rand::Rng;

use crate::components::{DamageKind, MotionBinding};
use crate::stats::StatProfile;

use super::components::{
    AgentConfig, AgentController, AgentState, AgentStateKind, PatrolRoute, RouteStep, SeenPhase,
};
use super::events::{AnimationIntent, CueKind};

/// Что агент видит о мире (perception + позиции)
///
/// Observer зашит в реализацию: scan исключает самого агента.
pub trait WorldView {
    /// Ближайшая видимая цель в конусе
    fn scan(&self, origin: Vec3, forward: Vec3) -> Option<Entity>;
    /// Позиция цели (None — цель исчезла)
    fn position_of(&self, entity: Entity) -> Option<Vec3>;
    /// Occlusion-only проверка
    fn has_line_of_sight(&self, origin: Vec3, target: Entity) -> bool;
}

/// Side effects тика (система превращает их в события)
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEffect {
    StateChanged {
        from: AgentStateKind,
        to: AgentStateKind,
    },
    Attack {
        target: Entity,
        kind: DamageKind,
        amount: f32,
    },
    Cue(CueKind),
    Animation(AnimationIntent),
    /// Повернуться к точке (ограничено rotation_speed)
    Face(Vec3),
}

/// Вход одного тика агента
pub struct AgentTick<'a, W: WorldView, R: Rng> {
    pub delta: f32,
    pub position: Vec3,
    /// Точка глаз (origin для scan/LOS)
    pub eye: Vec3,
    pub forward: Vec3,
    pub stats: &'a StatProfile,
    pub config: &'a AgentConfig,
    pub world: &'a W,
    pub route: Option<&'a mut PatrolRoute>,
    pub motion: &'a mut MotionBinding,
    pub rng: &'a mut R,
    pub effects: &'a mut Vec<AgentEffect>,
}

impl<W: WorldView, R: Rng> AgentTick<'_, W, R> {
    fn has_route(&self) -> bool {
        self.route.as_ref().is_some_and(|route| !route.is_empty())
    }
}

/// Выбор поведения по умолчанию
///
/// Без непустого маршрута — всегда Idle.
pub fn choose_default_behavior(rng: &mut impl Rng, idle_chance: f32, has_route: bool) -> AgentStateKind {
    if !has_route {
        return AgentStateKind::Idle;
    }

    if rng.gen::<f32>() < idle_chance {
        AgentStateKind::Idle
    } else {
        AgentStateKind::Patrol
    }
}

/// Наблюдение за текущей целью на этом тике
struct Observation {
    target: Entity,
    position: Vec3,
    visible: bool,
    distance: f32,
}

impl AgentController {
    /// Инициализация (первый тик или InitializeAgent)
    pub fn initialize<W: WorldView, R: Rng>(&mut self, ctx: &mut AgentTick<'_, W, R>) {
        let from = self.state.kind();
        self.memory.forget();
        self.attack_cooldown = 0.0;
        self.silenced = false;
        self.initialized = true;

        let next = choose_default_behavior(ctx.rng, ctx.config.idle_chance, ctx.has_route());
        self.state = self.enter(next, ctx);
        ctx.effects.push(AgentEffect::StateChanged { from, to: next });
    }

    /// Один тик FSM
    pub fn tick<W: WorldView, R: Rng>(&mut self, ctx: &mut AgentTick<'_, W, R>) {
        if !self.initialized {
            return;
        }

        self.attack_cooldown = (self.attack_cooldown - ctx.delta).max(0.0);

        let next = match self.state.clone() {
            AgentState::Idle { elapsed, duration } => self.update_idle(elapsed, duration, ctx),
            AgentState::Patrol => self.update_patrol(ctx),
            AgentState::Seen { elapsed, phase } => self.update_seen(elapsed, phase, ctx),
            AgentState::Chase => self.update_chase(ctx),
            AgentState::Attack => self.update_attack(ctx),
            AgentState::Flee { elapsed } => self.update_flee(elapsed, ctx),
        };

        if let Some(next) = next {
            self.transition(next, ctx);
        }
    }

    /// Смерть агента: заглушить один раз, дальше не тикаем
    pub fn silence(&mut self) -> bool {
        if self.silenced {
            return false;
        }
        self.silenced = true;
        true
    }

    pub fn is_silenced(&self) -> bool {
        self.silenced
    }

    fn transition<W: WorldView, R: Rng>(&mut self, next: AgentStateKind, ctx: &mut AgentTick<'_, W, R>) {
        let from = self.state.kind();
        Self::exit(ctx);
        self.state = self.enter(next, ctx);
        ctx.effects.push(AgentEffect::StateChanged { from, to: next });
    }

    /// Бросить цель → поведение по умолчанию
    fn abandon<W: WorldView, R: Rng>(&mut self, ctx: &mut AgentTick<'_, W, R>) -> Option<AgentStateKind> {
        self.memory.forget();
        ctx.effects.push(AgentEffect::Animation(AnimationIntent::Bool {
            name: "alerted",
            value: false,
        }));
        Some(choose_default_behavior(ctx.rng, ctx.config.idle_chance, ctx.has_route()))
    }

    fn default_behavior<W: WorldView, R: Rng>(&mut self, ctx: &mut AgentTick<'_, W, R>) -> Option<AgentStateKind> {
        Some(choose_default_behavior(ctx.rng, ctx.config.idle_chance, ctx.has_route()))
    }

    // === Enter / Exit ===

    fn enter<W: WorldView, R: Rng>(&mut self, kind: AgentStateKind, ctx: &mut AgentTick<'_, W, R>) -> AgentState {
        match kind {
            AgentStateKind::Idle => {
                let (min, max) = ctx.config.idle_range();
                let duration = if max > min { ctx.rng.gen_range(min..=max) } else { min };

                ctx.motion.clear();
                ctx.effects.push(AgentEffect::Animation(AnimationIntent::Walk { speed: 0.0 }));
                AgentState::Idle {
                    elapsed: 0.0,
                    duration,
                }
            }
            AgentStateKind::Patrol => {
                self.stuck.reset(ctx.position);
                ctx.motion.max_speed = ctx.stats.move_speed;
                if let Some(waypoint) = ctx.route.as_ref().and_then(|route| route.current()) {
                    ctx.motion.set_destination(waypoint);
                }
                ctx.effects.push(AgentEffect::Animation(AnimationIntent::Walk {
                    speed: ctx.stats.move_speed,
                }));
                AgentState::Patrol
            }
            AgentStateKind::Seen => {
                self.memory.lost_elapsed = 0.0;
                let speed = ctx.stats.move_speed * ctx.config.seen_slow_multiplier;
                ctx.motion.max_speed = speed;
                ctx.effects.push(AgentEffect::Cue(CueKind::Spotted));
                ctx.effects.push(AgentEffect::Animation(AnimationIntent::Bool {
                    name: "alerted",
                    value: true,
                }));
                ctx.effects.push(AgentEffect::Animation(AnimationIntent::Walk { speed }));
                AgentState::Seen {
                    elapsed: 0.0,
                    phase: SeenPhase::Slow,
                }
            }
            AgentStateKind::Chase => {
                self.memory.lost_elapsed = 0.0;
                ctx.motion.max_speed = ctx.stats.chase_speed();
                ctx.effects.push(AgentEffect::Cue(CueKind::Chase));
                ctx.effects.push(AgentEffect::Animation(AnimationIntent::Walk {
                    speed: ctx.stats.chase_speed(),
                }));
                AgentState::Chase
            }
            AgentStateKind::Attack => {
                ctx.motion.halt();
                ctx.effects.push(AgentEffect::Cue(CueKind::Attack));
                ctx.effects.push(AgentEffect::Animation(AnimationIntent::Walk { speed: 0.0 }));
                AgentState::Attack
            }
            AgentStateKind::Flee => {
                ctx.motion.halt();
                ctx.effects.push(AgentEffect::Cue(CueKind::Flee));
                ctx.effects.push(AgentEffect::Animation(AnimationIntent::Trigger { name: "flee" }));
                ctx.effects.push(AgentEffect::Animation(AnimationIntent::Float {
                    name: "flee_duration",
                    value: ctx.config.flee_duration,
                }));
                AgentState::Flee { elapsed: 0.0 }
            }
        }
    }

    /// Любой exit: стоп looping audio + отмена текущей sequence
    fn exit<W: WorldView, R: Rng>(ctx: &mut AgentTick<'_, W, R>) {
        ctx.effects.push(AgentEffect::Cue(CueKind::Interrupt));
    }

    // === Update ===

    fn update_idle<W: WorldView, R: Rng>(
        &mut self,
        elapsed: f32,
        duration: f32,
        ctx: &mut AgentTick<'_, W, R>,
    ) -> Option<AgentStateKind> {
        if self.try_spot(ctx) {
            return Some(AgentStateKind::Seen);
        }

        let elapsed = elapsed + ctx.delta;
        self.state = AgentState::Idle { elapsed, duration };

        if elapsed >= duration {
            return self.default_behavior(ctx);
        }
        None
    }

    fn update_patrol<W: WorldView, R: Rng>(&mut self, ctx: &mut AgentTick<'_, W, R>) -> Option<AgentStateKind> {
        if self.try_spot(ctx) {
            return Some(AgentStateKind::Seen);
        }

        let position = ctx.position;
        let threshold = ctx.config.waypoint_reach_threshold;
        ctx.motion.max_speed = ctx.stats.move_speed;

        let Some(route) = ctx.route.as_deref_mut().filter(|route| !route.is_empty()) else {
            return Some(AgentStateKind::Idle);
        };
        let Some(waypoint) = route.current() else {
            return Some(AgentStateKind::Idle);
        };

        let reached = position.distance(waypoint) <= threshold || ctx.motion.reached_end_of_path;
        if reached {
            match route.advance() {
                RouteStep::Next | RouteStep::Looped => {
                    if let Some(next) = route.current() {
                        ctx.motion.set_destination(next);
                    }
                    self.stuck.reset(position);
                    return None;
                }
                RouteStep::Finished => return self.default_behavior(ctx),
            }
        }

        if self.stuck.update(position, ctx.delta, ctx.config) {
            route.force_advance();
            crate::log(&format!(
                "🧱 Patrol stuck for {:.1}s, skipping to waypoint {}",
                ctx.config.stuck_duration,
                route.current_index()
            ));
        }

        if let Some(waypoint) = route.current() {
            ctx.motion.set_destination(waypoint);
        }
        None
    }

    fn update_seen<W: WorldView, R: Rng>(
        &mut self,
        elapsed: f32,
        phase: SeenPhase,
        ctx: &mut AgentTick<'_, W, R>,
    ) -> Option<AgentStateKind> {
        let Some(observation) = self.observe(ctx) else {
            return self.abandon(ctx);
        };

        if !observation.visible && self.memory.lost_elapsed > ctx.config.lost_countdown {
            return self.abandon(ctx);
        }

        let elapsed = elapsed + ctx.delta;
        let phase = match phase {
            SeenPhase::Slow if elapsed >= ctx.config.seen_slow_duration => SeenPhase::Evaluate,
            phase => phase,
        };
        self.state = AgentState::Seen { elapsed, phase };

        ctx.motion.max_speed = ctx.stats.move_speed * ctx.config.seen_slow_multiplier;
        ctx.motion.set_destination(self.pursuit_point(&observation));

        if phase == SeenPhase::Evaluate {
            if observation.distance <= ctx.config.chase_radius {
                return Some(AgentStateKind::Chase);
            }
            if elapsed > ctx.config.seen_timeout {
                return self.abandon(ctx);
            }
        }
        None
    }

    fn update_chase<W: WorldView, R: Rng>(&mut self, ctx: &mut AgentTick<'_, W, R>) -> Option<AgentStateKind> {
        let Some(observation) = self.observe(ctx) else {
            return self.abandon(ctx);
        };

        if observation.distance > ctx.config.chase_radius * ctx.config.chase_leash_multiplier {
            return self.abandon(ctx);
        }

        ctx.motion.max_speed = ctx.stats.chase_speed();
        ctx.motion.set_destination(self.pursuit_point(&observation));

        if observation.visible {
            if observation.distance <= ctx.stats.attack_range {
                return Some(AgentStateKind::Attack);
            }
            return None;
        }

        let at_last_known = self
            .memory
            .last_known_position
            .is_some_and(|last| ctx.position.distance(last) <= ctx.config.last_known_reach_distance);

        if self.memory.lost_elapsed > ctx.config.chase_lost_threshold && at_last_known {
            return self.abandon(ctx);
        }
        None
    }

    fn update_attack<W: WorldView, R: Rng>(&mut self, ctx: &mut AgentTick<'_, W, R>) -> Option<AgentStateKind> {
        let Some(observation) = self.observe(ctx) else {
            return self.abandon(ctx);
        };

        ctx.motion.halt();
        ctx.effects.push(AgentEffect::Face(observation.position));

        if !observation.visible {
            return Some(AgentStateKind::Chase);
        }
        if observation.distance > ctx.stats.attack_range * ctx.config.attack_leash_multiplier {
            return Some(AgentStateKind::Chase);
        }

        if self.attack_cooldown > 0.0 {
            return None;
        }

        ctx.effects.push(AgentEffect::Attack {
            target: observation.target,
            kind: ctx.stats.damage_kind,
            amount: ctx.stats.attack_damage,
        });
        ctx.effects.push(AgentEffect::Animation(AnimationIntent::Attack));
        self.attack_cooldown = ctx.stats.attack_cooldown.max(0.0);

        Some(AgentStateKind::Flee)
    }

    fn update_flee<W: WorldView, R: Rng>(
        &mut self,
        elapsed: f32,
        ctx: &mut AgentTick<'_, W, R>,
    ) -> Option<AgentStateKind> {
        let Some(observation) = self.observe(ctx) else {
            return self.abandon(ctx);
        };

        ctx.motion.halt();
        ctx.effects.push(AgentEffect::Face(observation.position));

        let elapsed = elapsed + ctx.delta;
        self.state = AgentState::Flee { elapsed };

        if elapsed < ctx.config.flee_duration {
            return None;
        }

        if observation.visible && observation.distance <= ctx.config.chase_radius {
            Some(AgentStateKind::Chase)
        } else {
            self.abandon(ctx)
        }
    }

    // === Helpers ===

    /// Idle/Patrol scan: нашли цель → запоминаем
    fn try_spot<W: WorldView, R: Rng>(&mut self, ctx: &mut AgentTick<'_, W, R>) -> bool {
        let Some(target) = ctx.world.scan(ctx.eye, ctx.forward) else {
            return false;
        };
        let Some(position) = ctx.world.position_of(target) else {
            return false;
        };

        self.memory.acquire(target, position);
        true
    }

    /// Live позиция + LOS текущей цели, обновляет last-known / lost timer
    fn observe<W: WorldView, R: Rng>(&mut self, ctx: &mut AgentTick<'_, W, R>) -> Option<Observation> {
        let target = self.memory.target?;
        let position = ctx.world.position_of(target)?;
        let visible = ctx.world.has_line_of_sight(ctx.eye, target);

        if visible {
            self.memory.last_known_position = Some(position);
            self.memory.lost_elapsed = 0.0;
        } else {
            self.memory.lost_elapsed += ctx.delta;
        }

        Some(Observation {
            target,
            position,
            visible,
            distance: ctx.position.distance(position),
        })
    }

    /// Куда идти: live позиция если видим, иначе last-known
    fn pursuit_point(&self, observation: &Observation) -> Vec3 {
        if observation.visible {
            observation.position
        } else {
            self.memory.last_known_position.unwrap_or(observation.position)
        }
    }
}
