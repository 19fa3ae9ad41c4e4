//! Patrol components: anchor (спавн-данные) → route (owned waypoints) + stuck detection.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::fsm::AgentConfig;

/// Точки патруля, заданные при спавне
///
/// Читается один раз на init: waypoints = origin + offset. Дальше агент
/// владеет своей копией (PatrolRoute), anchor можно удалять/двигать.
#[derive(Component, Debug, Clone, PartialEq, Reflect, Serialize, Deserialize)]
#[reflect(Component)]
pub struct PatrolAnchor {
    pub origin: Vec3,
    pub offsets: Vec<Vec3>,
    pub looping: bool,
}

impl PatrolAnchor {
    pub fn new(origin: Vec3, offsets: Vec<Vec3>) -> Self {
        Self {
            origin,
            offsets,
            looping: true,
        }
    }

    pub fn one_way(mut self) -> Self {
        self.looping = false;
        self
    }

    pub fn waypoints(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.offsets.iter().map(|offset| self.origin + *offset)
    }
}

/// Результат перехода к следующему waypoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteStep {
    Next,
    /// Прошли последний, маршрут зациклен — снова с 0
    Looped,
    /// Прошли последний, маршрут не зациклен (индекс тоже вернулся на 0)
    Finished,
}

/// Маршрут патруля агента
///
/// Инвариант: current_index ∈ [0, len) если маршрут непустой.
#[derive(Component, Debug, Clone, PartialEq, Default, Reflect)]
#[reflect(Component)]
pub struct PatrolRoute {
    waypoints: Vec<Vec3>,
    looping: bool,
    current_index: usize,
}

impl PatrolRoute {
    pub fn new(waypoints: Vec<Vec3>, looping: bool) -> Self {
        Self {
            waypoints,
            looping,
            current_index: 0,
        }
    }

    pub fn from_anchor(anchor: &PatrolAnchor) -> Self {
        Self::new(anchor.waypoints().collect(), anchor.looping)
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn waypoints(&self) -> &[Vec3] {
        &self.waypoints
    }

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current(&self) -> Option<Vec3> {
        self.waypoints.get(self.current_index).copied()
    }

    /// Waypoint достигнут → следующий
    pub fn advance(&mut self) -> RouteStep {
        if self.waypoints.is_empty() {
            return RouteStep::Finished;
        }

        self.current_index += 1;
        if self.current_index < self.waypoints.len() {
            return RouteStep::Next;
        }

        self.current_index = 0;
        if self.looping {
            RouteStep::Looped
        } else {
            RouteStep::Finished
        }
    }

    /// Застряли → следующий waypoint, всегда по модулю длины (даже не зацикленный маршрут)
    pub fn force_advance(&mut self) {
        if !self.waypoints.is_empty() {
            self.current_index = (self.current_index + 1) % self.waypoints.len();
        }
    }
}

/// Детектор застревания в Patrol
///
/// Позиция сэмплируется раз в stuck_sample_interval; смещение < stuck_epsilon
/// копит stuck time, любое движение его обнуляет.
#[derive(Debug, Clone, PartialEq, Default, Reflect)]
pub struct StuckDetector {
    last_sample: Option<Vec3>,
    sample_elapsed: f32,
    stuck_elapsed: f32,
}

impl StuckDetector {
    pub fn reset(&mut self, position: Vec3) {
        self.last_sample = Some(position);
        self.sample_elapsed = 0.0;
        self.stuck_elapsed = 0.0;
    }

    pub fn stuck_elapsed(&self) -> f32 {
        self.stuck_elapsed
    }

    /// true — порог stuck_duration достигнут на этом тике (счётчики сброшены)
    pub fn update(&mut self, position: Vec3, delta: f32, config: &AgentConfig) -> bool {
        let Some(last) = self.last_sample else {
            self.reset(position);
            return false;
        };

        self.sample_elapsed += delta;
        if self.sample_elapsed < config.stuck_sample_interval {
            return false;
        }

        let interval = self.sample_elapsed;
        self.sample_elapsed = 0.0;
        self.last_sample = Some(position);

        if position.distance(last) < config.stuck_epsilon {
            self.stuck_elapsed += interval;
        } else {
            self.stuck_elapsed = 0.0;
        }

        if self.stuck_elapsed >= config.stuck_duration {
            self.stuck_elapsed = 0.0;
            return true;
        }

        false
    }
}
