//! TaskScheduler — отложенные/периодические задачи агентов
//!
//! Вместо корутин: задача = (agent, key) → оставшееся время + payload.
//! Повторный schedule того же ключа заменяет задачу (cancel + reschedule).
//! Exit состояния, смерть и despawn агента снимают все его задачи (cancel_agent).
//!
//! BTreeMap: порядок срабатывания детерминирован (Entity, key).

use std::collections::BTreeMap;

use bevy::prelude::*;

/// Ключ задачи в пределах агента
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TaskKey {
    /// Следующий клип последовательного набора
    Sequence,
    /// Сброс pitch chain
    PitchReset,
}

#[derive(Debug, Clone, PartialEq)]
struct ScheduledTask<A> {
    remaining: f32,
    action: A,
}

/// Сработавшая задача
#[derive(Debug, Clone, PartialEq)]
pub struct DueTask<A> {
    pub agent: Entity,
    pub key: TaskKey,
    pub action: A,
}

#[derive(Resource, Debug)]
pub struct TaskScheduler<A: Send + Sync + 'static> {
    tasks: BTreeMap<(Entity, TaskKey), ScheduledTask<A>>,
}

impl<A: Send + Sync + 'static> Default for TaskScheduler<A> {
    fn default() -> Self {
        Self {
            tasks: BTreeMap::new(),
        }
    }
}

impl<A: Send + Sync + 'static> TaskScheduler<A> {
    /// Запланировать (или заменить) задачу через `delay` секунд
    pub fn schedule(&mut self, agent: Entity, key: TaskKey, delay: f32, action: A) {
        self.tasks.insert(
            (agent, key),
            ScheduledTask {
                remaining: delay.max(0.0),
                action,
            },
        );
    }

    pub fn cancel(&mut self, agent: Entity, key: TaskKey) -> bool {
        self.tasks.remove(&(agent, key)).is_some()
    }

    /// Снять все задачи агента, вернуть сколько снято
    pub fn cancel_agent(&mut self, agent: Entity) -> usize {
        let before = self.tasks.len();
        self.tasks.retain(|(owner, _), _| *owner != agent);
        before - self.tasks.len()
    }

    pub fn contains(&self, agent: Entity, key: TaskKey) -> bool {
        self.tasks.contains_key(&(agent, key))
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Продвинуть время, забрать сработавшие задачи (удаляются из планировщика)
    pub fn tick(&mut self, delta: f32) -> Vec<DueTask<A>> {
        let mut due_keys = Vec::new();
        for (key, task) in self.tasks.iter_mut() {
            task.remaining -= delta;
            if task.remaining <= 0.0 {
                due_keys.push(*key);
            }
        }

        due_keys
            .into_iter()
            .filter_map(|(agent, key)| {
                self.tasks
                    .remove(&(agent, key))
                    .map(|task| DueTask {
                        agent,
                        key,
                        action: task.action,
                    })
            })
            .collect()
    }
}
