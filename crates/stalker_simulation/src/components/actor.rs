//! Базовые компоненты живых сущностей: Health, DamageKind

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Тип урона (передаётся в damage capability цели)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Reflect, Serialize, Deserialize)]
pub enum DamageKind {
    #[default]
    Melee,
    Ranged,
    Environmental,
}

/// Здоровье сущности — damage capability цели атаки
///
/// Инвариант: 0 ≤ current ≤ max
/// Цель без Health атаку переживает (warning в логе, урон не применяется).
#[derive(Component, Debug, Clone, Copy, PartialEq, Reflect)]
#[reflect(Component)]
pub struct Health {
    pub current: f32,
    pub max: f32,
}

impl Default for Health {
    fn default() -> Self {
        Self::new(100.0)
    }
}

impl Health {
    pub fn new(max: f32) -> Self {
        let max = max.max(0.0);
        Self { current: max, max }
    }

    pub fn is_alive(&self) -> bool {
        self.current > 0.0
    }

    /// Доля здоровья 0.0..=1.0 (0 если max == 0)
    pub fn percentage(&self) -> f32 {
        if self.max <= 0.0 {
            return 0.0;
        }
        (self.current / self.max).clamp(0.0, 1.0)
    }

    /// Применить урон, вернуть фактически снятое здоровье
    pub fn take_damage(&mut self, _kind: DamageKind, amount: f32) -> f32 {
        if !amount.is_finite() || amount <= 0.0 {
            return 0.0;
        }
        let before = self.current;
        self.current = (self.current - amount).max(0.0);
        before - self.current
    }

    /// Сменить максимум, сохранив процент (tier swap меняет max_health)
    pub fn rescale_max(&mut self, max: f32) {
        let percentage = self.percentage();
        self.max = max.max(0.0);
        self.current = self.max * percentage;
    }
}
