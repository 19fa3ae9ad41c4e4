//! Stat profiles — числовые параметры агента для одного difficulty tier
//!
//! Архитектура:
//! - StatProfile неизменяем после загрузки, шарится через Arc
//! - ActiveStats на агенте заменяется целиком при смене tier (никогда не мутируется на месте)
//! - Perception и MotionBinding переконфигурируются из активного профиля

use std::sync::Arc;

use bevy::prelude::*;
use bevy_rapier3d::prelude::Group;
use serde::{Deserialize, Serialize};

use crate::components::{DamageKind, LAYER_ACTORS};

/// Параметры движения, обнаружения и боя
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatProfile {
    /// Имя профиля (для логов и тестов)
    pub name: String,

    // === Движение ===
    /// Базовая скорость (m/s)
    pub move_speed: f32,
    /// Ускорение (m/s²)
    pub acceleration: f32,
    /// Скорость поворота (градусы/сек)
    pub rotation_speed: f32,

    // === Обнаружение ===
    /// Дальность конуса зрения (метры)
    pub detection_range: f32,
    /// Полный угол конуса зрения (градусы)
    pub detection_angle: f32,
    /// Битовая маска слоёв, на которых ищем цели (rapier Group bits)
    pub detection_layers: u32,

    // === Бой ===
    /// Дистанция атаки (метры)
    pub attack_range: f32,
    /// Cooldown между атаками (секунды)
    pub attack_cooldown: f32,
    pub attack_damage: f32,
    pub damage_kind: DamageKind,
    pub max_health: f32,

    /// Множитель скорости в Chase (применяется дважды, см. chase_speed)
    pub chase_speed_multiplier: f32,
}

impl Default for StatProfile {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            move_speed: 3.5,
            acceleration: 8.0,
            rotation_speed: 270.0,
            detection_range: 15.0,
            detection_angle: 110.0,
            detection_layers: LAYER_ACTORS.bits(),
            attack_range: 2.0,
            attack_cooldown: 1.5,
            attack_damage: 20.0,
            damage_kind: DamageKind::Melee,
            max_health: 100.0,
            chase_speed_multiplier: 1.5,
        }
    }
}

impl StatProfile {
    pub fn detection_mask(&self) -> Group {
        Group::from_bits_truncate(self.detection_layers)
    }

    /// Скорость преследования
    ///
    /// Множитель применяется дважды (base × m × m) — так ведут себя агенты
    /// в исходном балансе, не исправляем.
    pub fn chase_speed(&self) -> f32 {
        self.move_speed * self.chase_speed_multiplier * self.chase_speed_multiplier
    }
}

/// Активный профиль агента
///
/// Arc: смена tier = замена указателя, сам профиль иммутабелен.
#[derive(Component, Debug, Clone)]
pub struct ActiveStats {
    pub profile: Arc<StatProfile>,
    /// Rank tier, из которого взят профиль (None — профиль задан вручную)
    pub tier: Option<u32>,
}

impl ActiveStats {
    pub fn new(profile: Arc<StatProfile>) -> Self {
        Self { profile, tier: None }
    }

    pub fn from_tier(tier: &DifficultyTier) -> Self {
        Self {
            profile: tier.profile.clone(),
            tier: Some(tier.rank),
        }
    }
}

/// Уровень сложности: rank + порог очков + профиль
#[derive(Debug, Clone, PartialEq)]
pub struct DifficultyTier {
    pub rank: u32,
    /// Минимальный score, с которого tier активен
    pub baseline: f32,
    pub profile: Arc<StatProfile>,
}

impl DifficultyTier {
    pub fn new(rank: u32, baseline: f32, profile: StatProfile) -> Self {
        Self {
            rank,
            baseline,
            profile: Arc::new(profile),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chase_speed_applies_multiplier_twice() {
        let profile = StatProfile {
            move_speed: 4.0,
            chase_speed_multiplier: 1.5,
            ..default()
        };

        assert_eq!(profile.chase_speed(), 9.0);
    }

    #[test]
    fn test_detection_mask_from_bits() {
        let profile = StatProfile::default();
        assert_eq!(profile.detection_mask(), LAYER_ACTORS);
    }

    #[test]
    fn test_active_stats_from_tier_shares_profile() {
        let tier = DifficultyTier::new(2, 300.0, StatProfile::default());
        let stats = ActiveStats::from_tier(&tier);

        assert_eq!(stats.tier, Some(2));
        assert!(Arc::ptr_eq(&stats.profile, &tier.profile));
    }
}
