//! Narrow contracts the simulation consumes from the host game.
//!
//! The core never renders, streams models or solves collisions itself. It asks
//! the host through these traits and treats every answer as possibly stale.

use glam::{Quat, Vec3};

use crate::api::types::{AssetHandle, EntityId, ModelId, Pose};

/// Model streaming. Requests are polled, never awaited.
pub trait AssetGate {
    /// Start (or re-use) a request for `model`.
    fn request(&mut self, model: &ModelId) -> AssetHandle;

    /// Whether the requested model can be spawned now.
    fn is_ready(&mut self, handle: AssetHandle) -> bool;

    /// Tell the host the request is no longer needed.
    fn release(&mut self, _handle: AssetHandle) {}
}

/// Everything needed to create an object in the host world.
#[derive(Debug, Clone)]
pub struct SpawnDesc {
    pub model: Option<ModelId>,
    pub tag: String,
    pub pose: Pose,
    pub visible: bool,
    /// Collision radius used by probes. Zero means "not probe-able".
    pub radius: f32,
    pub mineable: bool,
    /// `Some` for damageable objects (vehicles).
    pub max_health: Option<f32>,
}

impl SpawnDesc {
    pub fn model(model: ModelId, pose: Pose) -> Self {
        Self {
            model: Some(model),
            tag: String::new(),
            pose,
            visible: true,
            radius: 0.0,
            mineable: false,
            max_health: None,
        }
    }

    /// An invisible, massless helper object (locomotion proxy, markers).
    pub fn invisible(pose: Pose) -> Self {
        Self {
            model: None,
            tag: String::new(),
            pose,
            visible: false,
            radius: 0.0,
            mineable: false,
            max_health: None,
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    pub fn with_radius(mut self, radius: f32) -> Self {
        self.radius = radius;
        self
    }

    pub fn with_mineable(mut self, mineable: bool) -> Self {
        self.mineable = mineable;
        self
    }

    pub fn with_health(mut self, max_health: f32) -> Self {
        self.max_health = Some(max_health);
        self
    }
}

/// Result of a forward probe against the host world.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProbeHit {
    pub entity: EntityId,
    pub point: Vec3,
    pub normal: Vec3,
    pub distance: f32,
}

/// Entity spawn/destroy/attach plus the player queries the locomotion model needs.
///
/// Every mutating call reports whether the target still existed so callers can
/// fall back instead of acting on a dead handle.
pub trait HostWorld {
    fn spawn(&mut self, desc: SpawnDesc) -> EntityId;
    fn despawn(&mut self, id: EntityId) -> bool;
    fn exists(&self, id: EntityId) -> bool;

    fn pose(&self, id: EntityId) -> Option<Pose>;
    fn set_pose(&mut self, id: EntityId, pose: Pose) -> bool;

    /// Rigidly lock `child` to `parent` at `offset` (parent-local).
    fn attach(&mut self, child: EntityId, parent: EntityId, offset: Vec3) -> bool;
    fn detach(&mut self, child: EntityId) -> bool;

    /// Cast a ray of `max_distance` from `origin` along `direction`.
    fn probe(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        ignore: &[EntityId],
    ) -> Option<ProbeHit>;

    fn health(&self, id: EntityId) -> Option<f32>;
    fn max_health(&self, id: EntityId) -> Option<f32>;
    fn set_health(&mut self, id: EntityId, health: f32) -> bool;
    fn is_mineable(&self, id: EntityId) -> bool;

    fn player(&self) -> EntityId;
    fn seated_vehicle(&self) -> Option<EntityId>;
    fn seat_player(&mut self, vehicle: EntityId) -> bool;
    fn unseat_player(&mut self) -> bool;
    fn is_player_ragdolled(&self) -> bool;
    fn is_player_dead(&self) -> bool;

    /// `None` switches host gravity back to its default.
    fn set_gravity(&mut self, level: Option<f32>);

    fn orientation(&self, id: EntityId) -> Option<Quat> {
        self.pose(id).map(|p| p.rotation)
    }

    fn position(&self, id: EntityId) -> Option<Vec3> {
        self.pose(id).map(|p| p.position)
    }
}

/// The host collaborators bundled for one call.
pub struct Host<'a> {
    pub world: &'a mut dyn HostWorld,
    pub assets: &'a mut dyn AssetGate,
}

impl<'a> Host<'a> {
    pub fn new(world: &'a mut dyn HostWorld, assets: &'a mut dyn AssetGate) -> Self {
        Self { world, assets }
    }
}
