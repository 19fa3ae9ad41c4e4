//! Difficulty escalation module
//!
//! Score копится из внешних стимулов (EscalationStimulus) и accrual по времени,
//! мапится в tier, смена tier рассылается:
//! - listeners, зарегистрированным на ресурсе (синхронно)
//! - Events<TierChanged> (app-scoped канал, живёт столько же сколько App)
//!
//! Агент подписан пока у него есть EscalationSubscriber (подписка = lifetime entity).

use bevy::prelude::*;

pub mod accrual;
pub mod escalation;
pub mod systems;

#[cfg(test)]
mod escalation_tests;

pub use accrual::{EscalationAccrual, EscalationSignals};
pub use escalation::{DifficultyEscalation, ListenerId, TierChanged, TierListener};

use crate::SimulationSet;

/// Внешний стимул escalation
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub enum EscalationStimulus {
    AddPoints(f32),
    SetPoints(f32),
    Reset,
}

/// Маркер: агент получает профили из DifficultyEscalation
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct EscalationSubscriber;

/// Difficulty Plugin
///
/// Порядок (SimulationSet::Escalate):
/// 1. process_escalation_stimuli — стимулы → score
/// 2. accrue_escalation_points — очки за время
/// 3. broadcast_tier_changes — pending → Events<TierChanged>
/// 4. apply_tier_to_agents — замена профилей у подписчиков
pub struct DifficultyPlugin;

impl Plugin for DifficultyPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<EscalationStimulus>()
            .add_event::<TierChanged>()
            .add_systems(
                FixedUpdate,
                (
                    systems::process_escalation_stimuli,
                    systems::accrue_escalation_points,
                    systems::broadcast_tier_changes,
                    systems::apply_tier_to_agents,
                )
                    .chain()
                    .in_set(SimulationSet::Escalate),
            );
    }
}
