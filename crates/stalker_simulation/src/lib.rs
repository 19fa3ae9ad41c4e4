//! Stalker Simulation Core
//!
//! ECS-симуляция враждебных агентов на Bevy 0.16 (headless, детерминированная)
//!
//! Подсистемы:
//! - perception: конус зрения + occlusion по SpatialSnapshot
//! - difficulty: score → tier → смена StatProfile у агентов
//! - ai: FSM агента (Idle / Patrol / Seen / Chase / Attack / Flee)
//! - audio, movement: исполнители намерений FSM (звук, headless навигация)
//!
//! Tick (FixedUpdate, 60Hz): Sense → Escalate → Decide → Resolve → Notify → Move → Cleanup

use std::time::Duration;

use bevy::ecs::event::event_update_system;
use bevy::ecs::system::RunSystemOnce;
use bevy::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

// Публичные модули
pub mod ai;
pub mod audio;
pub mod components;
pub mod config;
pub mod difficulty;
pub mod error;
pub mod logger;
pub mod movement;
pub mod perception;
pub mod schedule;
pub mod stats;

// Re-export базовых компонентов для удобства
pub use ai::{AIPlugin, Agent, AgentConfig, AgentController, AgentStateKind, PatrolAnchor};
pub use components::*;
pub use difficulty::{DifficultyEscalation, DifficultyPlugin, EscalationStimulus, TierChanged};
pub use error::ConfigurationError;
pub use logger::{init_logger, log, log_error, log_info, log_warning, set_log_level, set_logger, LogLevel, LogPrinter};
pub use perception::{Perception, PerceptionPlugin};
pub use stats::{ActiveStats, DifficultyTier, StatProfile};

/// Фазы тика симуляции (FixedUpdate, строго по порядку)
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SimulationSet {
    /// Пересборка SpatialSnapshot
    Sense,
    /// Стимулы/accrual → tier → профили агентов
    Escalate,
    /// Init + тик FSM
    Decide,
    /// Урон
    Resolve,
    /// Аудио (cues, scheduler)
    Notify,
    /// Headless mover
    Move,
    /// Despawn агентов
    Cleanup,
}

/// Главный plugin симуляции (объединяет все подсистемы)
pub struct SimulationPlugin;

impl Plugin for SimulationPlugin {
    fn build(&self, app: &mut App) {
        // Seed мог задать create_headless_app — не перезаписываем
        if !app.world().contains_resource::<DeterministicRng>() {
            app.insert_resource(DeterministicRng::new(42));
        }

        app
            // Fixed timestep 60Hz для simulation tick (легче считать интервалы)
            .insert_resource(Time::<Fixed>::from_hz(60.0))
            .configure_sets(
                FixedUpdate,
                (
                    SimulationSet::Sense,
                    SimulationSet::Escalate,
                    SimulationSet::Decide,
                    SimulationSet::Resolve,
                    SimulationSet::Notify,
                    SimulationSet::Move,
                    SimulationSet::Cleanup,
                )
                    .chain(),
            )
            .add_plugins((
                PerceptionPlugin,
                DifficultyPlugin,
                AIPlugin,
                audio::AudioPlugin,
                movement::MovementPlugin,
            ));
    }
}

/// Детерминистичный RNG resource (seeded)
#[derive(Resource)]
pub struct DeterministicRng {
    pub rng: ChaCha8Rng,
    pub seed: u64,
}

impl DeterministicRng {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }
}

/// Создаёт minimal Bevy App для headless симуляции
pub fn create_headless_app(seed: u64) -> App {
    let mut app = App::new();
    init_logger();
    app.add_plugins(MinimalPlugins)
        .insert_resource(DeterministicRng::new(seed))
        .insert_resource(Time::<Fixed>::from_hz(60.0)); // 60Hz FixedUpdate

    app
}

/// Прогнать `ticks` фиксированных тиков без wall-clock
///
/// Time<Fixed> сдвигается ровно на timestep, затем выполняется FixedUpdate.
/// После тика — то же, что App::update делает в First/в конце кадра:
/// swap буферов всех Events и RemovedComponents (иначе буферы растут бесконечно).
/// Событие живёт два тика: читатели следующего тика его ещё видят.
pub fn run_fixed_ticks(app: &mut App, ticks: usize) {
    for _ in 0..ticks {
        let world = app.world_mut();
        let timestep: Duration = world.resource::<Time<Fixed>>().timestep();
        world.resource_mut::<Time<Fixed>>().advance_by(timestep);
        world.run_schedule(FixedUpdate);

        if let Err(error) = world.run_system_once(event_update_system) {
            log_error(&format!("Event buffers update failed: {}", error));
        }
        world.clear_trackers();
    }
}

/// Snapshot мира для сравнения детерминизма
pub fn world_snapshot<T: Component>(world: &mut World) -> Vec<u8>
where
    T: std::fmt::Debug,
{
    // Собираем все компоненты в детерминированный формат
    let mut snapshot = Vec::new();

    let mut query = world.query::<(Entity, &T)>();
    let mut entities: Vec<_> = query.iter(world).collect();

    // Сортируем по Entity ID для детерминизма
    entities.sort_by_key(|(entity, _)| entity.index());

    // Сериализуем в байты через Debug (простейший способ)
    for (entity, component) in entities {
        snapshot.extend_from_slice(&entity.index().to_le_bytes());
        snapshot.extend_from_slice(format!("{:?}", component).as_bytes());
    }

    snapshot
}
