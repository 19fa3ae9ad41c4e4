//! Headless mover — MotionBinding → Transform без навигационного провайдера
//!
//! Архитектура:
//! - AI пишет intent в MotionBinding (destination, can_move, max_speed)
//! - Реальная навигация (navmesh, внешний движок) читает тот же компонент
//! - Для headless тестов и demo: HeadlessMover двигает по прямой с ускорением,
//!   упирается в тела слоя окружения, выставляет reached_end_of_path
//!
//! Детерминизм: только Time<Fixed>, без rapier pipeline (raycast по SpatialSnapshot).

use bevy::prelude::*;

use crate::components::{MotionBinding, LAYER_ENVIRONMENT};
use crate::perception::SpatialSnapshot;
use crate::SimulationSet;

/// Радиус тела агента для остановки перед препятствием
pub const AGENT_BODY_RADIUS: f32 = 0.4;

/// Дистанция, на которой destination считается достигнутой
pub const ARRIVAL_TOLERANCE: f32 = 0.1;

/// Маркер: MotionBinding исполняет встроенный mover (а не внешняя навигация)
#[derive(Component, Debug, Clone, Copy, Default)]
#[require(MotionBinding)]
pub struct HeadlessMover;

/// Movement Plugin (SimulationSet::Move)
pub struct MovementPlugin;

impl Plugin for MovementPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(FixedUpdate, drive_motion_bindings.in_set(SimulationSet::Move));
    }
}

/// Система: интеграция MotionBinding в Transform
pub fn drive_motion_bindings(
    mut movers: Query<(Entity, &mut Transform, &mut MotionBinding), With<HeadlessMover>>,
    snapshot: Res<SpatialSnapshot>,
    time: Res<Time<Fixed>>,
) {
    let delta = time.delta_secs();

    for (entity, mut transform, mut motion) in movers.iter_mut() {
        let Some(destination) = motion.destination.filter(|_| motion.can_move) else {
            motion.current_speed = 0.0;
            continue;
        };

        // Движение только в горизонтальной плоскости
        let mut offset = destination - transform.translation;
        offset.y = 0.0;
        let distance = offset.length();

        if distance <= ARRIVAL_TOLERANCE {
            motion.reached_end_of_path = true;
            motion.current_speed = 0.0;
            continue;
        }

        let direction = offset / distance;
        let speed = (motion.current_speed + motion.acceleration * delta).min(motion.max_speed.max(0.0));
        let mut step = (speed * delta).min(distance);

        let blocked = snapshot.raycast(
            transform.translation,
            direction,
            step + AGENT_BODY_RADIUS,
            LAYER_ENVIRONMENT,
            |other| snapshot.related(entity, other),
        );
        if let Some((_, hit_distance)) = blocked {
            step = step.min((hit_distance - AGENT_BODY_RADIUS).max(0.0));
        }

        if step <= f32::EPSILON {
            motion.current_speed = 0.0;
            rotate_towards(&mut transform, destination, motion.rotation_speed, delta);
            continue;
        }

        transform.translation += direction * step;
        motion.current_speed = speed;
        rotate_towards(&mut transform, destination, motion.rotation_speed, delta);
    }
}

/// Поворот к точке (по горизонтали) не быстрее rotation_speed градусов/сек
pub fn rotate_towards(transform: &mut Transform, point: Vec3, rotation_speed: f32, delta: f32) {
    let mut direction = point - transform.translation;
    direction.y = 0.0;
    if direction.length_squared() < 1e-6 {
        return;
    }

    let target = Transform::IDENTITY.looking_to(direction, Vec3::Y).rotation;
    let max_angle = rotation_speed.max(0.0).to_radians() * delta;
    let angle = transform.rotation.angle_between(target);

    transform.rotation = if angle <= max_angle {
        target
    } else {
        transform.rotation.slerp(target, max_angle / angle)
    };
}
