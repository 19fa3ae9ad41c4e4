//! Ошибки конфигурации
//!
//! Единственный класс ошибок, который поднимается наружу. Потеря цели,
//! отсутствие Health у цели или аудио-провайдера — не ошибки (логируем и идём дальше).

use bevy::prelude::Entity;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// У агента нет Perception компонента (обязательная зависимость)
    #[error("agent {0:?} has no Perception component")]
    MissingPerception(Entity),

    /// У агента нет MotionBinding компонента (обязательная зависимость)
    #[error("agent {0:?} has no MotionBinding component")]
    MissingMotionBinding(Entity),

    /// Нет ни ActiveStats на агенте, ни DifficultyEscalation ресурса
    #[error("agent {0:?} has no stat profile and no difficulty escalation is configured")]
    MissingStatProfile(Entity),

    #[error("difficulty table has no tiers")]
    NoTiers,

    #[error("tier rank {rank} has invalid baseline {baseline}")]
    InvalidBaseline { rank: u32, baseline: f32 },

    #[error("tier rank {0} is declared more than once")]
    DuplicateRank(u32),

    #[error("failed to parse difficulty table: {0}")]
    Parse(#[from] toml::de::Error),
}
