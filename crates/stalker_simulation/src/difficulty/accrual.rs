//! Накопление очков escalation со временем
//!
//! points/sec = base + per_item × items + scarcity × (1 − resource_level)
//! Сэмплируется раз в тик, результат × dt идёт через add_points.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Внешние сигналы для accrual (пишет геймплей: подобранные предметы, уровень ресурса)
#[derive(Resource, Debug, Clone, PartialEq, Default)]
pub struct EscalationSignals {
    pub items_collected: u32,
    /// Нормализованный уровень ресурса (1.0 — полный, 0.0 — пусто)
    pub resource_level: f32,
}

/// Параметры accrual (ресурс присутствует → accrual включён)
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EscalationAccrual {
    /// Базовые очки в секунду
    pub base_rate: f32,
    /// Очки в секунду за каждый собранный предмет
    pub per_item_rate: f32,
    /// Очки в секунду при полностью пустом ресурсе
    pub scarcity_rate: f32,
    /// Потолок скорости
    pub max_rate: f32,
}

impl Default for EscalationAccrual {
    fn default() -> Self {
        Self {
            base_rate: 0.5,
            per_item_rate: 1.0,
            scarcity_rate: 2.0,
            max_rate: 25.0,
        }
    }
}

impl EscalationAccrual {
    pub fn points_per_second(&self, signals: &EscalationSignals) -> f32 {
        let scarcity = 1.0 - signals.resource_level.clamp(0.0, 1.0);
        let rate = self.base_rate
            + self.per_item_rate * signals.items_collected as f32
            + self.scarcity_rate * scarcity;

        rate.clamp(0.0, self.max_rate.max(0.0))
    }
}
