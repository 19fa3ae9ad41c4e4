//! ECS Components для сущностей симуляции
//!
//! Организация по доменам:
//! - actor: живые сущности (Health, DamageKind)
//! - movement: контракт с навигацией (MotionBinding)
//! - world: collision layers, препятствия (LAYER_*, Obstacle)
//!
//! AI компоненты (AgentController, AgentConfig, PatrolRoute) живут в crate::ai.

pub mod actor;
pub mod movement;
pub mod world;

// Re-exports для удобного импорта
pub use actor::*;
pub use movement::*;
pub use world::*;
