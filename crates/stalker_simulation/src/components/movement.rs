//! Movement компоненты: MotionBinding (контракт с навигацией)
//!
//! Архитектура:
//! - AI пишет high-level intent: destination, can_move, скорости из StatProfile
//! - Навигация (внешняя или headless mover) двигает Transform и выставляет reached_end_of_path
//! - Pathfinding алгоритм здесь не живёт

use bevy::prelude::*;

use crate::stats::StatProfile;

/// Привязка агента к навигации
#[derive(Component, Debug, Clone, PartialEq, Reflect)]
#[reflect(Component)]
pub struct MotionBinding {
    /// Текущая цель навигации (None — стоим)
    pub destination: Option<Vec3>,
    /// false — остановиться немедленно (Attack/Flee)
    pub can_move: bool,
    /// Максимальная скорость (m/s), пишется AI каждый тик по состоянию
    pub max_speed: f32,
    /// Ускорение (m/s²) из StatProfile
    pub acceleration: f32,
    /// Скорость поворота (градусы/сек) из StatProfile
    pub rotation_speed: f32,
    /// Навигация дошла до конца пути (пишет навигация, не AI)
    pub reached_end_of_path: bool,
    /// Текущая фактическая скорость (пишет навигация)
    pub current_speed: f32,
}

impl Default for MotionBinding {
    fn default() -> Self {
        Self {
            destination: None,
            can_move: true,
            max_speed: 0.0,
            acceleration: 8.0,
            rotation_speed: 270.0,
            reached_end_of_path: false,
            current_speed: 0.0,
        }
    }
}

impl MotionBinding {
    /// Новая цель навигации
    ///
    /// Сбрасывает reached_end_of_path только при смене точки, иначе
    /// флаг от навигации пропадал бы каждый тик (Patrol пишет destination каждый тик).
    pub fn set_destination(&mut self, point: Vec3) {
        if self.destination != Some(point) {
            self.destination = Some(point);
            self.reached_end_of_path = false;
        }
        self.can_move = true;
    }

    /// Остановка на месте (destination сохраняется для навигации как есть)
    pub fn halt(&mut self) {
        self.can_move = false;
        self.current_speed = 0.0;
    }

    /// Полный сброс цели (Idle)
    pub fn clear(&mut self) {
        self.destination = None;
        self.reached_end_of_path = false;
        self.halt();
    }

    /// Переписать параметры из активного профиля
    pub fn apply_profile(&mut self, profile: &StatProfile) {
        self.max_speed = profile.move_speed;
        self.acceleration = profile.acceleration;
        self.rotation_speed = profile.rotation_speed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_destination_resets_reached_only_on_change() {
        let mut motion = MotionBinding::default();
        motion.set_destination(Vec3::X);
        motion.reached_end_of_path = true;

        motion.set_destination(Vec3::X);
        assert!(motion.reached_end_of_path);

        motion.set_destination(Vec3::Z);
        assert!(!motion.reached_end_of_path);
        assert!(motion.can_move);
    }

    #[test]
    fn test_apply_profile() {
        let mut motion = MotionBinding::default();
        let profile = StatProfile {
            move_speed: 6.0,
            acceleration: 12.0,
            rotation_speed: 180.0,
            ..Default::default()
        };

        motion.apply_profile(&profile);
        assert_eq!(motion.max_speed, 6.0);
        assert_eq!(motion.acceleration, 12.0);
        assert_eq!(motion.rotation_speed, 180.0);
    }

    #[test]
    fn test_halt_keeps_destination() {
        let mut motion = MotionBinding::default();
        motion.set_destination(Vec3::ONE);
        motion.halt();

        assert!(!motion.can_move);
        assert_eq!(motion.destination, Some(Vec3::ONE));

        motion.clear();
        assert_eq!(motion.destination, None);
    }
}
