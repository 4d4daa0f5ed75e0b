use glam::{Quat, Vec3};

use crate::api::types::{EntityId, ModelId, Pose};

/// A single struct with optional parts.
/// Backs the in-memory host world; real hosts keep their own objects.
#[derive(Debug, Clone)]
pub struct Entity {
    /// Unique identifier.
    pub id: EntityId,
    /// String tag for finding entities by name.
    pub tag: String,
    /// Model the entity was spawned from (`None` for helper objects).
    pub model: Option<ModelId>,
    /// Whether the entity is drawn.
    pub visible: bool,
    /// Position in world space.
    pub pos: Vec3,
    /// Orientation in world space.
    pub rotation: Quat,
    /// Probe radius; zero keeps the entity out of probes.
    pub radius: f32,
    pub mineable: bool,
    /// Current and maximum health for damageable objects.
    pub health: Option<(f32, f32)>,
    /// Rigid attachment: parent and parent-local offset.
    pub parent: Option<(EntityId, Vec3)>,
}

impl Entity {
    /// Create a new entity with the given ID at the origin.
    pub fn new(id: EntityId) -> Self {
        Self {
            id,
            tag: String::new(),
            model: None,
            visible: true,
            pos: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            radius: 0.0,
            mineable: false,
            health: None,
            parent: None,
        }
    }

    // -- Builder pattern --

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    pub fn with_model(mut self, model: Option<ModelId>) -> Self {
        self.model = model;
        self
    }

    pub fn with_pose(mut self, pose: Pose) -> Self {
        self.pos = pose.position;
        self.rotation = pose.rotation;
        self
    }

    pub fn with_radius(mut self, radius: f32) -> Self {
        self.radius = radius;
        self
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }

    pub fn with_mineable(mut self, mineable: bool) -> Self {
        self.mineable = mineable;
        self
    }

    pub fn with_health(mut self, max_health: f32) -> Self {
        self.health = Some((max_health, max_health));
        self
    }

    pub fn pose(&self) -> Pose {
        Pose::new(self.pos, self.rotation)
    }
}
