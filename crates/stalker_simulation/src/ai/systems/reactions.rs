//! AI reactions: исполнение атак, смерть и despawn агентов.

use bevy::prelude::*;

use crate::ai::{Agent, AgentController, AttackExecuted, AttackIntent, CueKind};
use crate::audio::{AudioRequest, AudioScheduler};
use crate::components::{Health, MotionBinding};

use super::fsm::AgentOutput;

/// Система: AttackIntent → урон по Health цели
///
/// Нет Health у цели — не ошибка: warning, AttackExecuted { applied: false }.
pub fn resolve_attacks(
    mut intents: EventReader<AttackIntent>,
    mut targets: Query<&mut Health>,
    mut executed: EventWriter<AttackExecuted>,
) {
    for intent in intents.read() {
        let Ok(mut health) = targets.get_mut(intent.target) else {
            crate::log_warning(&format!(
                "⚠️ {:?} attacked {:?}, but target has no Health",
                intent.attacker, intent.target
            ));
            executed.write(AttackExecuted {
                attacker: intent.attacker,
                target: intent.target,
                applied: false,
                damage_dealt: 0.0,
            });
            continue;
        };

        let dealt = health.take_damage(intent.kind, intent.amount);
        crate::log(&format!(
            "⚔️ {:?} hit {:?} for {:.1} ({:?}), hp {:.1}/{:.1}",
            intent.attacker, intent.target, dealt, intent.kind, health.current, health.max
        ));
        if !health.is_alive() {
            crate::log_info(&format!("💀 {:?} killed by {:?}", intent.target, intent.attacker));
        }

        executed.write(AttackExecuted {
            attacker: intent.attacker,
            target: intent.target,
            applied: true,
            damage_dealt: dealt,
        });
    }
}

/// Система: мёртвый агент глушится один раз и больше не двигается
pub fn silence_dead_agents(
    mut agents: Query<(Entity, &Health, &mut AgentController, Option<&mut MotionBinding>), With<Agent>>,
    mut output: AgentOutput,
) {
    for (entity, health, mut controller, motion) in agents.iter_mut() {
        if health.is_alive() || !controller.is_initialized() {
            continue;
        }
        if !controller.silence() {
            continue;
        }

        if let Some(mut motion) = motion {
            motion.clear();
        }
        output.cue(entity, CueKind::Silence);
        crate::log_info(&format!("🔇 Agent {:?} is dead, silenced", entity));
    }
}

/// Система: despawn агента → отмена задач + стоп looping audio
///
/// AgentAudio уже удалён вместе с entity: StopLooping шлём безусловно.
pub fn cleanup_despawned_agents(
    mut removed: RemovedComponents<Agent>,
    mut scheduler: ResMut<AudioScheduler>,
    mut requests: EventWriter<AudioRequest>,
) {
    for agent in removed.read() {
        let cancelled = scheduler.cancel_agent(agent);
        requests.write(AudioRequest::StopLooping { agent });
        crate::log(&format!("🧹 Agent {:?} removed, {} scheduled tasks cancelled", agent, cancelled));
    }
}
