//! DifficultyEscalation — score → tier → уведомления
//!
//! Инварианты:
//! - score монотонно не убывает (кроме явных set_points/reset)
//! - текущий tier — наивысший с baseline ≤ score (самый нижний, если таких нет)
//! - каждая смена tier = ровно одно уведомление listeners + один TierChanged в канал

use std::fmt;
use std::sync::Arc;

use bevy::prelude::*;

use crate::error::ConfigurationError;
use crate::stats::{DifficultyTier, StatProfile};

/// Событие: tier сменился (app-scoped канал)
#[derive(Event, Debug, Clone, PartialEq)]
pub struct TierChanged {
    /// Rank предыдущего tier
    pub previous_rank: u32,
    /// Новый tier (с профилем)
    pub tier: DifficultyTier,
}

/// Listener смены tier
///
/// Получает только &TierChanged: изменить escalation синхронно из listener нельзя
/// (второй переход tier из колбэка исключён на уровне borrow).
pub type TierListener = Box<dyn FnMut(&TierChanged) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Escalation ресурс (один на симуляцию)
#[derive(Resource)]
pub struct DifficultyEscalation {
    /// Отсортированы по baseline (возрастание)
    tiers: Vec<DifficultyTier>,
    score: f32,
    current: usize,
    listeners: Vec<(ListenerId, TierListener)>,
    next_listener_id: u64,
    /// Смены tier, ещё не отправленные в Events<TierChanged>
    pending: Vec<TierChanged>,
}

impl fmt::Debug for DifficultyEscalation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DifficultyEscalation")
            .field("tiers", &self.tiers)
            .field("score", &self.score)
            .field("current", &self.current)
            .field("listeners", &self.listeners.len())
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl DifficultyEscalation {
    pub fn new(mut tiers: Vec<DifficultyTier>) -> Result<Self, ConfigurationError> {
        if tiers.is_empty() {
            return Err(ConfigurationError::NoTiers);
        }

        for (i, tier) in tiers.iter().enumerate() {
            if !tier.baseline.is_finite() || tier.baseline < 0.0 {
                return Err(ConfigurationError::InvalidBaseline {
                    rank: tier.rank,
                    baseline: tier.baseline,
                });
            }
            if tiers[..i].iter().any(|other| other.rank == tier.rank) {
                return Err(ConfigurationError::DuplicateRank(tier.rank));
            }
        }

        tiers.sort_by(|a, b| a.baseline.total_cmp(&b.baseline));

        let mut escalation = Self {
            tiers,
            score: 0.0,
            current: 0,
            listeners: Vec::new(),
            next_listener_id: 0,
            pending: Vec::new(),
        };
        escalation.current = escalation.tier_index_for(0.0);
        Ok(escalation)
    }

    /// Добавить очки (amount ≤ 0 — no-op)
    pub fn add_points(&mut self, amount: f32) -> Option<TierChanged> {
        if !(amount > 0.0) || !amount.is_finite() {
            return None;
        }
        self.score += amount;
        self.recompute_tier()
    }

    /// Выставить score (clamp ≥ 0)
    pub fn set_points(&mut self, amount: f32) -> Option<TierChanged> {
        self.score = if amount.is_nan() { 0.0 } else { amount.clamp(0.0, f32::MAX) };
        self.recompute_tier()
    }

    /// Обнулить score, вернуться на самый нижний tier
    pub fn reset(&mut self) -> Option<TierChanged> {
        self.score = 0.0;
        self.switch_to(0)
    }

    pub fn score(&self) -> f32 {
        self.score
    }

    pub fn current_tier(&self) -> &DifficultyTier {
        &self.tiers[self.current]
    }

    pub fn current_stats(&self) -> Arc<StatProfile> {
        self.current_tier().profile.clone()
    }

    /// Профиль tier по rank (pure lookup)
    pub fn stats_for_level(&self, rank: u32) -> Option<Arc<StatProfile>> {
        self.tiers
            .iter()
            .find(|tier| tier.rank == rank)
            .map(|tier| tier.profile.clone())
    }

    pub fn tiers(&self) -> &[DifficultyTier] {
        &self.tiers
    }

    /// Подписать listener (синхронный fan-out, порядок вызова не гарантирован)
    pub fn subscribe(&mut self, listener: TierListener) -> ListenerId {
        let id = ListenerId(self.next_listener_id);
        self.next_listener_id += 1;
        self.listeners.push((id, listener));
        id
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        before != self.listeners.len()
    }

    /// Забрать смены tier для отправки в Events<TierChanged>
    pub fn drain_pending(&mut self) -> Vec<TierChanged> {
        std::mem::take(&mut self.pending)
    }

    fn recompute_tier(&mut self) -> Option<TierChanged> {
        let index = self.tier_index_for(self.score);
        self.switch_to(index)
    }

    /// Линейный скан сверху вниз: наивысший tier с baseline ≤ score
    fn tier_index_for(&self, score: f32) -> usize {
        self.tiers
            .iter()
            .rposition(|tier| tier.baseline <= score)
            .unwrap_or(0)
    }

    fn switch_to(&mut self, index: usize) -> Option<TierChanged> {
        if index == self.current {
            return None;
        }

        let previous_rank = self.tiers[self.current].rank;
        self.current = index;

        let change = TierChanged {
            previous_rank,
            tier: self.tiers[index].clone(),
        };

        crate::log_info(&format!(
            "📈 Difficulty tier {} → {} ('{}', score {:.1})",
            previous_rank, change.tier.rank, change.tier.profile.name, self.score
        ));

        for (_, listener) in self.listeners.iter_mut() {
            listener(&change);
        }
        self.pending.push(change.clone());

        Some(change)
    }
}
