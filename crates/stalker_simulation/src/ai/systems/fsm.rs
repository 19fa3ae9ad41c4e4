//! FSM AI systems (init, re-init, tick).

use bevy::ecs::system::SystemParam;
use bevy::prelude::*;

use crate::ai::controller::{AgentEffect, AgentTick, WorldView};
use crate::ai::{
    Agent, AgentConfig, AgentController, AgentCue, AgentDisabled, AgentStateChanged, AnimationCue, AttackIntent,
    CueKind, InitializeAgent, PatrolAnchor, PatrolRoute,
};
use crate::components::{Health, MotionBinding};
use crate::difficulty::{DifficultyEscalation, EscalationSubscriber};
use crate::error::ConfigurationError;
use crate::movement::rotate_towards;
use crate::perception::{Perception, SpatialSnapshot};
use crate::stats::ActiveStats;
use crate::DeterministicRng;

/// WorldView поверх SpatialSnapshot + Perception агента
pub struct SnapshotView<'a> {
    pub snapshot: &'a SpatialSnapshot,
    pub perception: &'a Perception,
    pub observer: Entity,
}

impl WorldView for SnapshotView<'_> {
    fn scan(&self, origin: Vec3, forward: Vec3) -> Option<Entity> {
        self.perception.scan(self.snapshot, self.observer, origin, forward)
    }

    fn position_of(&self, entity: Entity) -> Option<Vec3> {
        self.snapshot.position_of(entity)
    }

    fn has_line_of_sight(&self, origin: Vec3, target: Entity) -> bool {
        self.perception.has_line_of_sight(self.snapshot, self.observer, origin, target)
    }
}

/// Выход FSM: AgentEffect → Bevy events
#[derive(SystemParam)]
pub struct AgentOutput<'w> {
    state_changed: EventWriter<'w, AgentStateChanged>,
    attacks: EventWriter<'w, AttackIntent>,
    cues: EventWriter<'w, AgentCue>,
    animations: EventWriter<'w, AnimationCue>,
}

impl AgentOutput<'_> {
    pub fn cue(&mut self, agent: Entity, kind: CueKind) {
        self.cues.write(AgentCue { agent, kind });
    }

    /// Face обрабатывается в тике (нужен Transform), остальное уходит событиями
    fn dispatch(&mut self, agent: Entity, effects: &mut Vec<AgentEffect>) {
        for effect in effects.drain(..) {
            match effect {
                AgentEffect::StateChanged { from, to } => {
                    crate::log(&format!("🧠 AI: {:?} {:?} → {:?}", agent, from, to));
                    self.state_changed.write(AgentStateChanged { agent, from, to });
                }
                AgentEffect::Attack { target, kind, amount } => {
                    self.attacks.write(AttackIntent {
                        attacker: agent,
                        target,
                        kind,
                        amount,
                    });
                }
                AgentEffect::Cue(kind) => self.cue(agent, kind),
                AgentEffect::Animation(intent) => {
                    self.animations.write(AnimationCue { agent, intent });
                }
                AgentEffect::Face(_) => {}
            }
        }
    }
}

/// Система: InitializeAgent → сброс контроллера (и маршрута, если пришёл новый anchor)
///
/// Сам init делает initialize_agents (после apply_deferred в цепочке).
pub fn handle_initialize_requests(
    mut commands: Commands,
    mut requests: EventReader<InitializeAgent>,
    mut agents: Query<&mut AgentController, With<Agent>>,
    mut output: AgentOutput,
) {
    for request in requests.read() {
        let Ok(mut controller) = agents.get_mut(request.agent) else {
            crate::log_warning(&format!("InitializeAgent: {:?} is not an agent", request.agent));
            continue;
        };

        if let Some(anchor) = &request.anchor {
            commands
                .entity(request.agent)
                .insert(anchor.clone())
                .remove::<PatrolRoute>();
        }

        if controller.initialized {
            output.cue(request.agent, CueKind::Silence);
        }
        controller.initialized = false;
    }
}

/// Проверка обязательных зависимостей агента
fn resolve_profile(
    entity: Entity,
    has_perception: bool,
    has_motion: bool,
    stats: Option<&ActiveStats>,
    escalation: Option<&DifficultyEscalation>,
) -> Result<ActiveStats, ConfigurationError> {
    if !has_perception {
        return Err(ConfigurationError::MissingPerception(entity));
    }
    if !has_motion {
        return Err(ConfigurationError::MissingMotionBinding(entity));
    }

    match (stats, escalation) {
        (Some(stats), _) => Ok(stats.clone()),
        (None, Some(escalation)) => Ok(ActiveStats::from_tier(escalation.current_tier())),
        (None, None) => Err(ConfigurationError::MissingStatProfile(entity)),
    }
}

/// Система: инициализация агентов (первый тик после спавна / после InitializeAgent)
///
/// Ошибка конфигурации → log_error + AgentDisabled (агент больше не тикает).
pub fn initialize_agents(
    mut commands: Commands,
    mut agents: Query<
        (
            Entity,
            &Transform,
            &AgentConfig,
            &mut AgentController,
            Option<&mut Perception>,
            Option<&mut MotionBinding>,
            Option<&ActiveStats>,
            Option<&mut Health>,
            Option<&PatrolAnchor>,
            Option<&mut PatrolRoute>,
        ),
        (With<Agent>, Without<AgentDisabled>),
    >,
    escalation: Option<Res<DifficultyEscalation>>,
    snapshot: Res<SpatialSnapshot>,
    mut rng: ResMut<DeterministicRng>,
    mut output: AgentOutput,
) {
    let mut effects = Vec::new();

    for (entity, transform, config, mut controller, perception, motion, stats, health, anchor, route) in
        agents.iter_mut()
    {
        if controller.initialized {
            continue;
        }

        let resolved = resolve_profile(
            entity,
            perception.is_some(),
            motion.is_some(),
            stats,
            escalation.as_deref(),
        );
        let stats = match resolved {
            Ok(stats) => stats,
            Err(error) => {
                crate::log_error(&format!("❌ Agent {:?} disabled: {}", entity, error));
                commands.entity(entity).insert(AgentDisabled);
                continue;
            }
        };
        let (Some(mut perception), Some(mut motion)) = (perception, motion) else {
            continue;
        };
        let profile = stats.profile.clone();

        perception.configure_from(&profile);
        motion.apply_profile(&profile);

        match health {
            Some(mut health) => health.rescale_max(profile.max_health),
            None => {
                commands.entity(entity).insert(Health::new(profile.max_health));
            }
        }

        // Маршрут захватывается один раз из anchor
        let mut captured_route = None;
        let route = match (route, anchor) {
            (Some(route), _) => Some(route.into_inner()),
            (None, Some(anchor)) => {
                captured_route = Some(PatrolRoute::from_anchor(anchor));
                captured_route.as_mut()
            }
            (None, None) => None,
        };

        let position = transform.translation;
        let view = SnapshotView {
            snapshot: &*snapshot,
            perception: &*perception,
            observer: entity,
        };
        let mut ctx = AgentTick {
            delta: 0.0,
            position,
            eye: perception.eye_position(position),
            forward: *transform.forward(),
            stats: profile.as_ref(),
            config,
            world: &view,
            route,
            motion: &mut *motion,
            rng: &mut rng.rng,
            effects: &mut effects,
        };
        controller.initialize(&mut ctx);

        let mut agent = commands.entity(entity);
        if stats.tier.is_some() {
            agent.insert(EscalationSubscriber);
        }
        agent.insert(stats);
        if let Some(route) = captured_route {
            agent.insert(route);
        }

        crate::log_info(&format!(
            "🤖 Agent {:?} initialized (profile '{}', state {:?})",
            entity,
            profile.name,
            controller.current_state()
        ));
        output.dispatch(entity, &mut effects);
    }
}

/// Система: один тик FSM каждого живого инициализированного агента
pub fn agent_fsm_tick(
    mut agents: Query<
        (
            Entity,
            &mut Transform,
            &AgentConfig,
            &mut AgentController,
            &Perception,
            &mut MotionBinding,
            &ActiveStats,
            Option<&mut PatrolRoute>,
            Option<&Health>,
        ),
        (With<Agent>, Without<AgentDisabled>),
    >,
    snapshot: Res<SpatialSnapshot>,
    mut rng: ResMut<DeterministicRng>,
    time: Res<Time<Fixed>>,
    mut output: AgentOutput,
) {
    let delta = time.delta_secs();
    let mut effects = Vec::new();

    for (entity, mut transform, config, mut controller, perception, mut motion, stats, route, health) in
        agents.iter_mut()
    {
        if !controller.initialized || health.is_some_and(|h| !h.is_alive()) {
            continue;
        }

        let position = transform.translation;
        let view = SnapshotView {
            snapshot: &*snapshot,
            perception,
            observer: entity,
        };
        let mut ctx = AgentTick {
            delta,
            position,
            eye: perception.eye_position(position),
            forward: *transform.forward(),
            stats: stats.profile.as_ref(),
            config,
            world: &view,
            route: route.map(|route| route.into_inner()),
            motion: &mut *motion,
            rng: &mut rng.rng,
            effects: &mut effects,
        };
        controller.tick(&mut ctx);

        for effect in &effects {
            if let AgentEffect::Face(point) = effect {
                rotate_towards(&mut transform, *point, stats.profile.rotation_speed, delta);
            }
        }
        output.dispatch(entity, &mut effects);
    }
}
