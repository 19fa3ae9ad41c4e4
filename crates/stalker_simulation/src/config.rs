//! Difficulty table — загрузка tiers из TOML
//!
//! ```toml
//! [accrual]
//! base_rate = 0.5
//!
//! [[tier]]
//! rank = 0
//! baseline = 0.0
//! [tier.profile]
//! name = "calm"
//! move_speed = 3.0
//! ```

use serde::{Deserialize, Serialize};

use crate::difficulty::{DifficultyEscalation, EscalationAccrual};
use crate::error::ConfigurationError;
use crate::stats::{DifficultyTier, StatProfile};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierEntry {
    pub rank: u32,
    pub baseline: f32,
    #[serde(default)]
    pub profile: StatProfile,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DifficultyTable {
    #[serde(default, rename = "tier")]
    pub tiers: Vec<TierEntry>,
    /// Отсутствует → accrual по времени выключен
    #[serde(default)]
    pub accrual: Option<EscalationAccrual>,
}

impl DifficultyTable {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigurationError> {
        Ok(toml::from_str(source)?)
    }

    /// Validated escalation + опциональный accrual
    pub fn into_escalation(
        self,
    ) -> Result<(DifficultyEscalation, Option<EscalationAccrual>), ConfigurationError> {
        let tiers = self
            .tiers
            .into_iter()
            .map(|entry| DifficultyTier::new(entry.rank, entry.baseline, entry.profile))
            .collect();

        Ok((DifficultyEscalation::new(tiers)?, self.accrual))
    }
}
