use glam::Vec3;

use crate::api::host::{HostWorld, ProbeHit, SpawnDesc};
use crate::api::types::{EntityId, Pose};
use crate::components::entity::Entity;

/// Called with the id of every entity the world destroys.
pub type DespawnHook = Box<dyn FnMut(EntityId)>;

/// In-memory host world using a flat Vec.
/// Designed for small entity counts (a scene's bodies, tiles and helpers).
///
/// Stands in for the real host in tests and in the browser bridge.
pub struct SimWorld {
    entities: Vec<Entity>,
    next_id: u32,
    player: EntityId,
    seated: Option<EntityId>,
    ragdolled: bool,
    dead: bool,
    gravity: Option<f32>,
    despawn_hook: Option<DespawnHook>,
}

impl SimWorld {
    /// An empty world containing only the player at the origin.
    pub fn new() -> Self {
        let player = EntityId(1);
        Self {
            entities: vec![Entity::new(player).with_tag("player")],
            next_id: 2,
            player,
            seated: None,
            ragdolled: false,
            dead: false,
            gravity: None,
            despawn_hook: None,
        }
    }

    /// Get a reference to an entity by ID.
    pub fn get(&self, id: EntityId) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id == id)
    }

    /// Get a mutable reference to an entity by ID.
    pub fn get_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.iter_mut().find(|e| e.id == id)
    }

    /// Iterate over all entities.
    pub fn iter(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    /// Find the first entity with the given tag.
    pub fn find_by_tag(&self, tag: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.tag == tag)
    }

    /// Find all entities with the given tag.
    pub fn find_all_by_tag(&self, tag: &str) -> Vec<&Entity> {
        self.entities.iter().filter(|e| e.tag == tag).collect()
    }

    /// Number of entities, the player included.
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn gravity(&self) -> Option<f32> {
        self.gravity
    }

    pub fn set_player_ragdolled(&mut self, ragdolled: bool) {
        self.ragdolled = ragdolled;
    }

    pub fn set_player_dead(&mut self, dead: bool) {
        self.dead = dead;
    }

    /// Subtract health from a damageable entity.
    pub fn damage(&mut self, id: EntityId, amount: f32) -> bool {
        match self.get_mut(id).and_then(|e| e.health.as_mut()) {
            Some((health, _)) => {
                *health = (*health - amount).max(0.0);
                true
            }
            None => false,
        }
    }

    /// Install a callback run synchronously inside every successful despawn.
    pub fn set_despawn_hook(&mut self, hook: DespawnHook) {
        self.despawn_hook = Some(hook);
    }

    fn index_of(&self, id: EntityId) -> Option<usize> {
        self.entities.iter().position(|e| e.id == id)
    }

    fn is_ancestor(&self, candidate: EntityId, of: EntityId) -> bool {
        let mut cursor = self.get(of).and_then(|e| e.parent).map(|(p, _)| p);
        // bounded walk: a cycle can't exist, but don't trust that blindly
        for _ in 0..self.entities.len() {
            match cursor {
                Some(p) if p == candidate => return true,
                Some(p) => cursor = self.get(p).and_then(|e| e.parent).map(|(pp, _)| pp),
                None => return false,
            }
        }
        false
    }

    /// Re-seat every attached descendant of `root` on its parent.
    fn propagate(&mut self, root: EntityId) {
        let mut stack = vec![root];
        while let Some(parent_id) = stack.pop() {
            let Some(parent) = self.get(parent_id).map(|e| e.pose()) else {
                continue;
            };
            for child in self.entities.iter_mut() {
                if let Some((p, offset)) = child.parent {
                    if p == parent_id {
                        child.pos = parent.transform_point(offset);
                        child.rotation = parent.rotation;
                        stack.push(child.id);
                    }
                }
            }
        }
    }

    fn attached_to_any(&self, entity: &Entity, ignore: &[EntityId]) -> bool {
        let mut cursor = entity.parent.map(|(p, _)| p);
        for _ in 0..self.entities.len() {
            match cursor {
                Some(p) if ignore.contains(&p) => return true,
                Some(p) => cursor = self.get(p).and_then(|e| e.parent).map(|(pp, _)| pp),
                None => return false,
            }
        }
        false
    }
}

impl Default for SimWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl HostWorld for SimWorld {
    fn spawn(&mut self, desc: SpawnDesc) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        let mut entity = Entity::new(id)
            .with_tag(desc.tag)
            .with_model(desc.model)
            .with_pose(desc.pose)
            .with_visible(desc.visible)
            .with_radius(desc.radius)
            .with_mineable(desc.mineable);
        if let Some(max) = desc.max_health {
            entity = entity.with_health(max);
        }
        self.entities.push(entity);
        id
    }

    fn despawn(&mut self, id: EntityId) -> bool {
        if id == self.player {
            return false;
        }
        let Some(idx) = self.index_of(id) else {
            return false;
        };
        self.entities.swap_remove(idx);
        for e in self.entities.iter_mut() {
            if matches!(e.parent, Some((p, _)) if p == id) {
                e.parent = None;
            }
        }
        if self.seated == Some(id) {
            self.seated = None;
        }
        if let Some(hook) = self.despawn_hook.as_mut() {
            hook(id);
        }
        true
    }

    fn exists(&self, id: EntityId) -> bool {
        self.index_of(id).is_some()
    }

    fn pose(&self, id: EntityId) -> Option<Pose> {
        self.get(id).map(|e| e.pose())
    }

    fn set_pose(&mut self, id: EntityId, pose: Pose) -> bool {
        match self.get_mut(id) {
            Some(e) => {
                e.pos = pose.position;
                e.rotation = pose.rotation;
            }
            None => return false,
        }
        self.propagate(id);
        true
    }

    fn attach(&mut self, child: EntityId, parent: EntityId, offset: Vec3) -> bool {
        if child == parent || !self.exists(parent) || self.is_ancestor(child, parent) {
            return false;
        }
        match self.get_mut(child) {
            Some(e) => e.parent = Some((parent, offset)),
            None => return false,
        }
        self.propagate(parent);
        true
    }

    fn detach(&mut self, child: EntityId) -> bool {
        match self.get_mut(child) {
            Some(e) => {
                e.parent = None;
                true
            }
            None => false,
        }
    }

    fn probe(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        ignore: &[EntityId],
    ) -> Option<ProbeHit> {
        let dir = direction.try_normalize()?;
        let mut best: Option<ProbeHit> = None;
        for e in &self.entities {
            if e.radius <= 0.0 || ignore.contains(&e.id) || self.attached_to_any(e, ignore) {
                continue;
            }
            let oc = origin - e.pos;
            let b = oc.dot(dir);
            let c = oc.length_squared() - e.radius * e.radius;
            let t = if c <= 0.0 {
                0.0
            } else {
                let disc = b * b - c;
                if disc < 0.0 || b > 0.0 {
                    continue;
                }
                -b - disc.sqrt()
            };
            if t > max_distance || best.is_some_and(|h| h.distance <= t) {
                continue;
            }
            let point = origin + dir * t;
            let normal = (point - e.pos).try_normalize().unwrap_or(-dir);
            best = Some(ProbeHit {
                entity: e.id,
                point,
                normal,
                distance: t,
            });
        }
        best
    }

    fn health(&self, id: EntityId) -> Option<f32> {
        self.get(id).and_then(|e| e.health).map(|(h, _)| h)
    }

    fn max_health(&self, id: EntityId) -> Option<f32> {
        self.get(id).and_then(|e| e.health).map(|(_, max)| max)
    }

    fn set_health(&mut self, id: EntityId, health: f32) -> bool {
        match self.get_mut(id).and_then(|e| e.health.as_mut()) {
            Some((h, max)) => {
                *h = health.clamp(0.0, *max);
                true
            }
            None => false,
        }
    }

    fn is_mineable(&self, id: EntityId) -> bool {
        self.get(id).is_some_and(|e| e.mineable)
    }

    fn player(&self) -> EntityId {
        self.player
    }

    fn seated_vehicle(&self) -> Option<EntityId> {
        self.seated.filter(|v| self.exists(*v))
    }

    fn seat_player(&mut self, vehicle: EntityId) -> bool {
        if !self.attach(self.player, vehicle, Vec3::ZERO) {
            return false;
        }
        self.seated = Some(vehicle);
        true
    }

    fn unseat_player(&mut self) -> bool {
        if self.seated.take().is_none() {
            return false;
        }
        self.detach(self.player)
    }

    fn is_player_ragdolled(&self) -> bool {
        self.ragdolled
    }

    fn is_player_dead(&self) -> bool {
        self.dead
    }

    fn set_gravity(&mut self, level: Option<f32>) {
        self.gravity = level;
    }
}
