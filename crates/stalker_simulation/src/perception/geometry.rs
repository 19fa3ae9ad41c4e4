//! Spatial snapshot — тела мира для perception queries
//!
//! Архитектура:
//! - Тела описываются rapier компонентами (Collider + CollisionGroups)
//! - Physics pipeline не запускаем: раз в тик собираем snapshot (Collider + world pose + слои)
//! - Ray/distance запросы идут в сам Collider (parry shape queries), форма любая

use std::collections::HashMap;
use std::fmt;

use bevy::prelude::*;
use bevy_rapier3d::prelude::{Collider, CollisionGroups, Group};

use crate::components::Health;

/// Лимит глубины иерархии (защита от циклов ChildOf)
const MAX_HIERARCHY_DEPTH: usize = 64;

/// Subdivisions для scale ball/capsule при неравномерном scale
const SCALE_SUBDIVISIONS: u32 = 10;

/// Тело в snapshot
#[derive(Clone)]
pub struct SpatialBody {
    pub entity: Entity,
    /// World position центра
    pub position: Vec3,
    pub rotation: Quat,
    /// Collider уже с world scale
    pub collider: Collider,
    /// Слои, в которых состоит тело
    pub memberships: Group,
}

impl SpatialBody {
    /// Тело из world transform (scale запекается в копию collider)
    pub fn new(entity: Entity, world: Transform, collider: &Collider, memberships: Group) -> Self {
        let mut collider = collider.clone();
        if world.scale != Vec3::ONE {
            collider.set_scale(world.scale, SCALE_SUBDIVISIONS);
        }

        Self {
            entity,
            position: world.translation,
            rotation: world.rotation,
            collider,
            memberships,
        }
    }

    /// Расстояние от точки до поверхности (0 если точка внутри)
    pub fn distance_to(&self, point: Vec3) -> f32 {
        self.collider
            .distance_to_point(self.position, self.rotation, point, true)
    }

    /// Попадание луча: distance вдоль нормализованного `direction`
    pub fn cast_ray(&self, origin: Vec3, direction: Vec3, max_distance: f32) -> Option<f32> {
        self.collider
            .cast_ray(self.position, self.rotation, origin, direction, max_distance, true)
    }
}

impl fmt::Debug for SpatialBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpatialBody")
            .field("entity", &self.entity)
            .field("position", &self.position)
            .field("rotation", &self.rotation)
            .field("memberships", &self.memberships)
            .finish_non_exhaustive()
    }
}

/// Snapshot всех тел мира на текущий тик
///
/// Пересобирается системой refresh_spatial_snapshot в начале каждого тика.
/// Хранит также ChildOf связи для проверки ancestor/descendant.
#[derive(Resource, Debug, Default)]
pub struct SpatialSnapshot {
    bodies: Vec<SpatialBody>,
    index: HashMap<Entity, usize>,
    parents: HashMap<Entity, Entity>,
}

impl SpatialSnapshot {
    pub fn clear(&mut self) {
        self.bodies.clear();
        self.index.clear();
        self.parents.clear();
    }

    /// Добавить (или заменить) тело
    pub fn insert(&mut self, body: SpatialBody) {
        match self.index.get(&body.entity) {
            Some(&i) => self.bodies[i] = body,
            None => {
                self.index.insert(body.entity, self.bodies.len());
                self.bodies.push(body);
            }
        }
    }

    pub fn set_parent(&mut self, child: Entity, parent: Entity) {
        self.parents.insert(child, parent);
    }

    pub fn bodies(&self) -> &[SpatialBody] {
        &self.bodies
    }

    pub fn body(&self, entity: Entity) -> Option<&SpatialBody> {
        self.index.get(&entity).map(|&i| &self.bodies[i])
    }

    pub fn position_of(&self, entity: Entity) -> Option<Vec3> {
        self.body(entity).map(|b| b.position)
    }

    /// `ancestor` — предок `entity` (по цепочке ChildOf)
    pub fn is_ancestor(&self, ancestor: Entity, entity: Entity) -> bool {
        let mut current = entity;
        for _ in 0..MAX_HIERARCHY_DEPTH {
            match self.parents.get(&current) {
                Some(&parent) if parent == ancestor => return true,
                Some(&parent) => current = parent,
                None => return false,
            }
        }
        false
    }

    /// Одна и та же сущность, предок или потомок
    pub fn related(&self, a: Entity, b: Entity) -> bool {
        a == b || self.is_ancestor(a, b) || self.is_ancestor(b, a)
    }

    /// Ближайшее попадание луча по телам из `mask`
    ///
    /// `ignore` — фильтр сущностей (self, цель и их иерархии).
    pub fn raycast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        mask: Group,
        ignore: impl Fn(Entity) -> bool,
    ) -> Option<(Entity, f32)> {
        let direction = direction.normalize_or_zero();
        if direction == Vec3::ZERO {
            return None;
        }

        self.bodies
            .iter()
            .filter(|body| body.memberships.intersects(mask) && !ignore(body.entity))
            .filter_map(|body| {
                body.cast_ray(origin, direction, max_distance)
                    .map(|t| (body.entity, t))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }
}

/// Система: пересборка SpatialSnapshot из Collider + Transform
///
/// World position = композиция Transform вверх по ChildOf (TransformPlugin в headless не нужен).
/// Мёртвые тела (Health == 0) в snapshot не попадают: не видны и не перекрывают.
pub fn refresh_spatial_snapshot(
    mut snapshot: ResMut<SpatialSnapshot>,
    bodies: Query<(Entity, &Transform, &Collider, Option<&CollisionGroups>, Option<&Health>)>,
    transforms: Query<&Transform>,
    hierarchy: Query<(Entity, &ChildOf)>,
) {
    snapshot.clear();

    for (child, child_of) in hierarchy.iter() {
        snapshot.set_parent(child, child_of.parent());
    }

    for (entity, transform, collider, groups, health) in bodies.iter() {
        if health.is_some_and(|h| !h.is_alive()) {
            continue;
        }

        let world = world_transform(entity, transform, &snapshot, &transforms);
        let memberships = groups.map(|g| g.memberships).unwrap_or(Group::ALL);

        snapshot.insert(SpatialBody::new(entity, world, collider, memberships));
    }
}

fn world_transform(
    entity: Entity,
    local: &Transform,
    snapshot: &SpatialSnapshot,
    transforms: &Query<&Transform>,
) -> Transform {
    let mut world = *local;
    let mut current = entity;

    for _ in 0..MAX_HIERARCHY_DEPTH {
        let Some(&parent) = snapshot.parents.get(&current) else {
            break;
        };
        if let Ok(parent_transform) = transforms.get(parent) {
            world = parent_transform.mul_transform(world);
        }
        current = parent;
    }

    world
}
