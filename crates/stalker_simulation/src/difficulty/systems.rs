//! Difficulty systems: stimuli → escalation → TierChanged → агенты

use bevy::prelude::*;

use super::{
    DifficultyEscalation, EscalationAccrual, EscalationSignals, EscalationStimulus,
    EscalationSubscriber, TierChanged,
};
use crate::components::{Health, MotionBinding};
use crate::perception::Perception;
use crate::stats::ActiveStats;

/// Система: внешние стимулы → DifficultyEscalation
pub fn process_escalation_stimuli(
    mut stimuli: EventReader<EscalationStimulus>,
    escalation: Option<ResMut<DifficultyEscalation>>,
) {
    let Some(mut escalation) = escalation else {
        if !stimuli.is_empty() {
            crate::log_warning("EscalationStimulus received but no DifficultyEscalation is configured");
            stimuli.clear();
        }
        return;
    };

    for stimulus in stimuli.read() {
        match *stimulus {
            EscalationStimulus::AddPoints(amount) => {
                escalation.add_points(amount);
            }
            EscalationStimulus::SetPoints(amount) => {
                escalation.set_points(amount);
            }
            EscalationStimulus::Reset => {
                escalation.reset();
            }
        }
    }
}

/// Система: accrual очков по времени (если EscalationAccrual задан)
pub fn accrue_escalation_points(
    accrual: Option<Res<EscalationAccrual>>,
    signals: Option<Res<EscalationSignals>>,
    escalation: Option<ResMut<DifficultyEscalation>>,
    time: Res<Time<Fixed>>,
) {
    let (Some(accrual), Some(mut escalation)) = (accrual, escalation) else {
        return;
    };

    let signals = signals.as_deref().cloned().unwrap_or_default();
    let points = accrual.points_per_second(&signals) * time.delta_secs();
    escalation.add_points(points);
}

/// Система: pending смены tier → Events<TierChanged>
pub fn broadcast_tier_changes(
    escalation: Option<ResMut<DifficultyEscalation>>,
    mut tier_events: EventWriter<TierChanged>,
) {
    let Some(mut escalation) = escalation else {
        return;
    };

    for change in escalation.drain_pending() {
        tier_events.write(change);
    }
}

/// Система: подписанные агенты меняют профиль целиком
///
/// Профиль → ActiveStats, Perception (range/angle/mask), MotionBinding (скорости), Health.max.
pub fn apply_tier_to_agents(
    mut tier_events: EventReader<TierChanged>,
    mut agents: Query<
        (Entity, &mut ActiveStats, Option<&mut Perception>, Option<&mut MotionBinding>, Option<&mut Health>),
        With<EscalationSubscriber>,
    >,
) {
    for change in tier_events.read() {
        for (entity, mut stats, perception, motion, health) in agents.iter_mut() {
            *stats = ActiveStats::from_tier(&change.tier);
            let profile = &change.tier.profile;

            if let Some(mut perception) = perception {
                perception.configure_from(profile);
            }
            if let Some(mut motion) = motion {
                motion.apply_profile(profile);
            }
            if let Some(mut health) = health {
                health.rescale_max(profile.max_health);
            }

            crate::log(&format!(
                "{:?} switched to profile '{}' (tier {})",
                entity, profile.name, change.tier.rank
            ));
        }
    }
}
