//! FSM AI components (state, config, target memory).

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::patrol::StuckDetector;

/// Маркер агента (враждебный AI)
///
/// Perception и MotionBinding спавнер добавляет сам: без них init падает с ConfigurationError.
#[derive(Component, Debug, Clone, Copy, Default)]
#[require(AgentConfig, AgentController)]
pub struct Agent;

/// Агент выключен (ошибка конфигурации), больше не тикает
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct AgentDisabled;

/// Фаза состояния Seen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Reflect)]
pub enum SeenPhase {
    /// Медленное сближение, пока идёт seen_slow_duration
    Slow,
    /// Ждём: дистанция ≤ chase_radius → Chase
    Evaluate,
}

/// AI FSM состояния
///
/// Таймеры — накопительные счётчики внутри варианта (per-tick, без корутин).
#[derive(Debug, Clone, PartialEq, Reflect)]
pub enum AgentState {
    /// Стоим на месте `duration` секунд, потом заново выбираем поведение
    Idle { elapsed: f32, duration: f32 },

    /// Обход PatrolRoute
    Patrol,

    /// Цель замечена, решаем преследовать ли
    Seen { elapsed: f32, phase: SeenPhase },

    /// Преследование (chase_speed)
    Chase,

    /// Стоим, смотрим на цель, бьём по cooldown
    Attack,

    /// Пауза после удара
    Flee { elapsed: f32 },
}

impl Default for AgentState {
    fn default() -> Self {
        Self::Idle {
            elapsed: 0.0,
            duration: 0.0,
        }
    }
}

impl AgentState {
    pub fn kind(&self) -> AgentStateKind {
        match self {
            Self::Idle { .. } => AgentStateKind::Idle,
            Self::Patrol => AgentStateKind::Patrol,
            Self::Seen { .. } => AgentStateKind::Seen,
            Self::Chase => AgentStateKind::Chase,
            Self::Attack => AgentStateKind::Attack,
            Self::Flee { .. } => AgentStateKind::Flee,
        }
    }
}

/// Тег состояния без данных (для events, логов, тестов)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Reflect, Serialize, Deserialize)]
pub enum AgentStateKind {
    Idle,
    Patrol,
    Seen,
    Chase,
    Attack,
    Flee,
}

/// Параметры AI (тюнинг поведения, не зависит от difficulty tier)
#[derive(Component, Debug, Clone, PartialEq, Reflect, Serialize, Deserialize)]
#[reflect(Component)]
#[serde(default)]
pub struct AgentConfig {
    /// Вероятность выбрать Idle вместо Patrol (0..1)
    pub idle_chance: f32,
    /// Границы длительности Idle (секунды)
    pub idle_min: f32,
    pub idle_max: f32,

    /// Patrol: waypoint достигнут на этой дистанции
    pub waypoint_reach_threshold: f32,
    /// Patrol: период сэмплирования позиции для stuck detection
    pub stuck_sample_interval: f32,
    /// Patrol: столько секунд без движения → принудительно следующий waypoint
    pub stuck_duration: f32,
    /// Patrol: смещение меньше этого за сэмпл = не двигаемся
    pub stuck_epsilon: f32,

    /// Seen: длительность медленной фазы
    pub seen_slow_duration: f32,
    /// Seen: множитель move_speed в медленной фазе
    pub seen_slow_multiplier: f32,
    /// Seen: максимум времени в состоянии
    pub seen_timeout: f32,
    /// Seen: столько секунд без LOS → бросаем цель
    pub lost_countdown: f32,

    /// Chase начинается на этой дистанции, Flee возвращается в Chase в её пределах
    pub chase_radius: f32,
    /// Chase бросаем дальше chase_radius × leash
    pub chase_leash_multiplier: f32,
    /// Chase: столько секунд без LOS (и у last-known позиции) → бросаем
    pub chase_lost_threshold: f32,
    /// Chase: "дошли до last-known позиции"
    pub last_known_reach_distance: f32,

    /// Attack → Chase дальше attack_range × leash
    pub attack_leash_multiplier: f32,
    /// Длительность Flee после удара
    pub flee_duration: f32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            idle_chance: 0.5,
            idle_min: 2.0,
            idle_max: 5.0,
            waypoint_reach_threshold: 0.5,
            stuck_sample_interval: 0.5,
            stuck_duration: 5.0,
            stuck_epsilon: 0.05,
            seen_slow_duration: 1.0,
            seen_slow_multiplier: 0.5,
            seen_timeout: 6.0,
            lost_countdown: 2.0,
            chase_radius: 12.0,
            chase_leash_multiplier: 1.5,
            chase_lost_threshold: 3.0,
            last_known_reach_distance: 2.0,
            attack_leash_multiplier: 1.2,
            flee_duration: 2.0,
        }
    }
}

impl AgentConfig {
    /// Диапазон Idle с защитой от перевёрнутых/отрицательных границ
    pub fn idle_range(&self) -> (f32, f32) {
        let min = self.idle_min.max(0.0);
        let max = self.idle_max.max(0.0);
        if min <= max {
            (min, max)
        } else {
            (max, min)
        }
    }
}

/// Память о цели
///
/// `target` — слабая ссылка (только lookup по Entity, цель может исчезнуть).
#[derive(Debug, Clone, PartialEq, Default, Reflect)]
pub struct TargetMemory {
    pub target: Option<Entity>,
    /// Последняя позиция цели, когда она была в LOS
    pub last_known_position: Option<Vec3>,
    /// Сколько секунд подряд цель вне LOS
    pub lost_elapsed: f32,
}

impl TargetMemory {
    pub fn acquire(&mut self, target: Entity, position: Vec3) {
        self.target = Some(target);
        self.last_known_position = Some(position);
        self.lost_elapsed = 0.0;
    }

    pub fn forget(&mut self) {
        *self = Self::default();
    }
}

/// Состояние контроллера агента (FSM + служебные счётчики)
#[derive(Component, Debug, Clone, Default)]
pub struct AgentController {
    pub(crate) state: AgentState,
    pub(crate) memory: TargetMemory,
    pub(crate) stuck: StuckDetector,
    /// Оставшийся cooldown атаки (секунды)
    pub(crate) attack_cooldown: f32,
    /// Мёртв и заглушен (Silence уже отправлен)
    pub(crate) silenced: bool,
    pub(crate) initialized: bool,
}

impl AgentController {
    pub fn current_state(&self) -> AgentStateKind {
        self.state.kind()
    }

    pub fn state(&self) -> &AgentState {
        &self.state
    }

    pub fn target(&self) -> Option<Entity> {
        self.memory.target
    }

    pub fn memory(&self) -> &TargetMemory {
        &self.memory
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }
}
