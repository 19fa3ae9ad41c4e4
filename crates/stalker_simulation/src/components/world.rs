//! Collision layers — общие константы слоёв для perception и headless mover
//!
//! Слои = rapier `Group` (memberships в `CollisionGroups`):
//! - GROUP_1: Reserved
//! - GROUP_2: Actors (агенты, игрок, всё что можно заметить)
//! - GROUP_3: Environment (стены, препятствия — перекрывают line-of-sight)
//!
//! Тело без CollisionGroups считается членом всех групп (как в rapier по умолчанию).

use bevy::prelude::*;
use bevy_rapier3d::prelude::{CollisionGroups, Group};

/// Layer 2: Actors
pub const LAYER_ACTORS: Group = Group::GROUP_2;

/// Layer 3: Environment (obstacles/walls)
pub const LAYER_ENVIRONMENT: Group = Group::GROUP_3;

/// CollisionGroups для актора (видим perception, блокируется environment)
pub fn actor_collision_groups() -> CollisionGroups {
    CollisionGroups::new(LAYER_ACTORS, LAYER_ACTORS | LAYER_ENVIRONMENT)
}

/// CollisionGroups для препятствия (перекрывает LOS)
pub fn obstacle_collision_groups() -> CollisionGroups {
    CollisionGroups::new(LAYER_ENVIRONMENT, Group::ALL)
}

/// Маркер: препятствие уровня (стена, ящик)
///
/// Не обязателен для perception (там важны только CollisionGroups), удобен для спавна/запросов.
#[derive(Component, Debug, Clone, Copy, Default)]
pub struct Obstacle;
