//! AI Events — выход FSM для остального мира (бой, аудио, анимация, телеметрия)
//!
//! Контроллер не знает про плееры и аниматоры: только пишет события,
//! политика (какой клип, как играть) — данные на стороне получателя.

use bevy::prelude::*;

use crate::components::DamageKind;

use super::components::{AgentStateKind, PatrolAnchor};

/// Агент сменил состояние (включая повторный вход в то же состояние)
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct AgentStateChanged {
    pub agent: Entity,
    pub from: AgentStateKind,
    pub to: AgentStateKind,
}

/// Агент бьёт цель (Decide → Resolve)
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct AttackIntent {
    pub attacker: Entity,
    pub target: Entity,
    pub kind: DamageKind,
    pub amount: f32,
}

/// Результат атаки
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct AttackExecuted {
    pub attacker: Entity,
    pub target: Entity,
    /// false — у цели нет Health (урон некуда применить)
    pub applied: bool,
    /// Фактически снятое здоровье
    pub damage_dealt: f32,
}

/// Какой звуковой момент произошёл у агента
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CueKind {
    /// Вход в Seen
    Spotted,
    /// Вход в Chase
    Chase,
    /// Вход в Attack
    Attack,
    /// Вход в Flee
    Flee,
    /// Выход из состояния: стоп loop + отмена sequence (pitch chain живёт дальше)
    Interrupt,
    /// Смерть / повторный init: отменить все задачи агента, заглушить loop, сбросить pitch
    Silence,
}

/// Аудио-уведомление от контроллера
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct AgentCue {
    pub agent: Entity,
    pub kind: CueKind,
}

/// Намерение для аниматора
#[derive(Debug, Clone, PartialEq)]
pub enum AnimationIntent {
    /// Скорость ходьбы (0 — стоим)
    Walk { speed: f32 },
    Attack,
    Bool { name: &'static str, value: bool },
    Float { name: &'static str, value: f32 },
    Trigger { name: &'static str },
}

#[derive(Event, Debug, Clone, PartialEq)]
pub struct AnimationCue {
    pub agent: Entity,
    pub intent: AnimationIntent,
}

/// Повторная инициализация агента (новый patrol anchor)
///
/// anchor: None — маршрут сохраняется, Some — пересобирается из нового anchor.
#[derive(Event, Debug, Clone, PartialEq)]
pub struct InitializeAgent {
    pub agent: Entity,
    pub anchor: Option<PatrolAnchor>,
}
