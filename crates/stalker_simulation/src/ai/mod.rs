//! AI decision-making module
//!
//! FSM враждебного агента: Idle / Patrol / Seen / Chase / Attack / Flee.
//! Логика переходов — controller.rs (чистая, без ECS),
//! системы — обвязка: snapshot → тик → события.

use bevy::prelude::*;

pub mod components;
pub mod controller;
pub mod events;
pub mod systems;

#[cfg(test)]
mod controller_tests;

// Re-export основных типов
pub use components::*;
pub use controller::{choose_default_behavior, AgentEffect, AgentTick, WorldView};
pub use events::*;

use crate::SimulationSet;

/// AI Plugin
///
/// Регистрирует AI системы в FixedUpdate для детерминизма.
/// Порядок выполнения:
/// 1. handle_initialize_requests — InitializeAgent → сброс контроллера
/// 2. initialize_agents — профиль, perception, маршрут, default behavior
/// 3. silence_dead_agents — мёртвые глушатся и выпадают из тика
/// 4. agent_fsm_tick — один тик FSM (SimulationSet::Decide)
/// 5. resolve_attacks — урон (SimulationSet::Resolve)
/// 6. cleanup_despawned_agents — задачи/loop audio удалённых агентов (SimulationSet::Cleanup)
pub struct AIPlugin;

impl Plugin for AIPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<AgentStateChanged>()
            .add_event::<AttackIntent>()
            .add_event::<AttackExecuted>()
            .add_event::<AgentCue>()
            .add_event::<AnimationCue>()
            .add_event::<InitializeAgent>()
            .add_systems(
                FixedUpdate,
                (
                    systems::handle_initialize_requests,
                    systems::initialize_agents,
                    systems::silence_dead_agents,
                    systems::agent_fsm_tick,
                )
                    .chain() // Последовательное выполнение для детерминизма
                    .in_set(SimulationSet::Decide),
            )
            .add_systems(FixedUpdate, systems::resolve_attacks.in_set(SimulationSet::Resolve))
            .add_systems(
                FixedUpdate,
                systems::cleanup_despawned_agents.in_set(SimulationSet::Cleanup),
            );
    }
}
