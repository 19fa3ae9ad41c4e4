//! Perception — cone vision с occlusion
//!
//! Scan: range → исключение self/иерархии → конус → occlusion raycast → ближайший.
//! HasLineOfSight: только occlusion, без range/angle фильтров.
//!
//! Чистые queries по SpatialSnapshot: никаких мутаций и side effects.

use bevy::prelude::*;
use bevy_rapier3d::prelude::Group;

pub mod geometry;


pub use geometry::{refresh_spatial_snapshot, SpatialBody, SpatialSnapshot};

use crate::components::{LAYER_ACTORS, LAYER_ENVIRONMENT};
use crate::stats::StatProfile;
use crate::SimulationSet;

/// Perception Plugin: SpatialSnapshot пересобирается первым в тике (SimulationSet::Sense)
pub struct PerceptionPlugin;

impl Plugin for PerceptionPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SpatialSnapshot>()
            .add_systems(FixedUpdate, refresh_spatial_snapshot.in_set(SimulationSet::Sense));
    }
}

/// Результат восприятия за тик
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PerceptionResult {
    pub target: Option<Entity>,
    pub line_of_sight: bool,
}

/// Параметры конуса зрения агента
///
/// До `initialize` scan всегда возвращает None.
#[derive(Component, Debug, Clone, PartialEq)]
pub struct Perception {
    /// Дальность (метры)
    pub range: f32,
    /// Полный угол конуса (градусы)
    pub angle: f32,
    /// Слои целей
    pub layer_mask: Group,
    /// Слои, перекрывающие line-of-sight
    pub obstacle_mask: Group,
    /// Высота глаз над pivot агента
    pub eye_height: f32,
    initialized: bool,
}

impl Default for Perception {
    fn default() -> Self {
        Self {
            range: 0.0,
            angle: 0.0,
            layer_mask: LAYER_ACTORS,
            obstacle_mask: LAYER_ENVIRONMENT,
            eye_height: 0.0,
            initialized: false,
        }
    }
}

impl Perception {
    /// Обязательная инициализация перед первым scan
    pub fn initialize(&mut self, range: f32, angle: f32, layer_mask: Group) {
        self.range = range.max(0.0);
        self.angle = angle.clamp(0.0, 360.0);
        self.layer_mask = layer_mask;
        self.initialized = true;
    }

    /// Перенастройка из StatProfile (init + смена tier)
    pub fn configure_from(&mut self, profile: &StatProfile) {
        self.initialize(profile.detection_range, profile.detection_angle, profile.detection_mask());
    }

    pub fn with_eye_height(mut self, eye_height: f32) -> Self {
        self.eye_height = eye_height;
        self
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Точка глаз для pivot позиции агента
    pub fn eye_position(&self, position: Vec3) -> Vec3 {
        position + Vec3::Y * self.eye_height
    }

    /// Cone + range + occlusion scan, ближайшая видимая цель
    pub fn scan(
        &self,
        snapshot: &SpatialSnapshot,
        observer: Entity,
        origin: Vec3,
        forward: Vec3,
    ) -> Option<Entity> {
        if !self.initialized {
            return None;
        }

        let forward = forward.normalize_or_zero();
        if forward == Vec3::ZERO {
            return None;
        }

        let half_angle = self.angle * 0.5;

        snapshot
            .bodies()
            .iter()
            .filter(|body| body.memberships.intersects(self.layer_mask))
            .filter(|body| !snapshot.related(observer, body.entity))
            .filter(|body| body.distance_to(origin) <= self.range)
            .filter_map(|body| {
                let to_target = body.position - origin;
                let distance = to_target.length();

                // Цель в точке глаз — считаем в конусе
                if distance > f32::EPSILON && forward.angle_between(to_target).to_degrees() > half_angle {
                    return None;
                }

                Some((body.entity, distance))
            })
            .filter(|&(candidate, distance)| !self.occluded(snapshot, observer, origin, candidate, distance))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(entity, _)| entity)
    }

    /// Standalone occlusion test (без range/angle)
    pub fn has_line_of_sight(
        &self,
        snapshot: &SpatialSnapshot,
        observer: Entity,
        origin: Vec3,
        target: Entity,
    ) -> bool {
        let Some(target_position) = snapshot.position_of(target) else {
            return false;
        };
        let distance = origin.distance(target_position);
        !self.occluded(snapshot, observer, origin, target, distance)
    }

    /// Scan + LOS одним вызовом
    pub fn perceive(
        &self,
        snapshot: &SpatialSnapshot,
        observer: Entity,
        origin: Vec3,
        forward: Vec3,
    ) -> PerceptionResult {
        match self.scan(snapshot, observer, origin, forward) {
            // scan уже проверил occlusion
            Some(target) => PerceptionResult {
                target: Some(target),
                line_of_sight: true,
            },
            None => PerceptionResult::default(),
        }
    }

    fn occluded(
        &self,
        snapshot: &SpatialSnapshot,
        observer: Entity,
        origin: Vec3,
        target: Entity,
        distance: f32,
    ) -> bool {
        if distance <= f32::EPSILON {
            return false;
        }

        let Some(target_position) = snapshot.position_of(target) else {
            return true;
        };

        snapshot
            .raycast(
                origin,
                target_position - origin,
                distance,
                self.obstacle_mask,
                |entity| snapshot.related(observer, entity) || snapshot.related(target, entity),
            )
            .is_some()
    }
}
