use std::fmt;

use bytemuck::{Pod, Zeroable};
use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Handle to an object living in the host world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u32);

/// Handle returned by an [`AssetGate`](crate::api::host::AssetGate) request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AssetHandle(pub u32);

/// Identifier of a scene description (e.g. `"earth_orbit"`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SceneId(pub String);

impl SceneId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SceneId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SceneId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Identifier of a model the host knows how to stream in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelId(pub String);

impl ModelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModelId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

fn identity() -> Quat {
    Quat::IDENTITY
}

/// Position + orientation. +Y is forward, +Z is up.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec3,
    #[serde(default = "identity")]
    pub rotation: Quat,
}

impl Pose {
    pub const IDENTITY: Pose = Pose {
        position: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    /// Pose at `position` with identity rotation.
    pub fn at(position: Vec3) -> Self {
        Self {
            position,
            rotation: Quat::IDENTITY,
        }
    }

    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Z
    }

    /// World-space point for an offset expressed in this pose's local frame.
    pub fn transform_point(&self, local: Vec3) -> Vec3 {
        self.position + self.rotation * local
    }

    pub fn is_finite(&self) -> bool {
        self.position.is_finite() && self.rotation.is_finite()
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// A flat event record handed to the host through the shared buffer.
/// `kind` identifies the event (see the `EVENT_*` constants), `a/b/c` carry payload.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct GameEvent {
    pub kind: f32,
    pub a: f32,
    pub b: f32,
    pub c: f32,
}

impl GameEvent {
    pub const FLOATS: usize = 4;

    pub fn new(kind: f32, a: f32, b: f32, c: f32) -> Self {
        Self { kind, a, b, c }
    }
}

pub const EVENT_SCENE_LOADED: f32 = 1.0;
pub const EVENT_SCENE_LOAD_FAILED: f32 = 2.0;
/// a = locomotion state code before, b = after.
pub const EVENT_LOCOMOTION_CHANGED: f32 = 3.0;
/// a = entity id.
pub const EVENT_OBJECT_MINED: f32 = 4.0;
/// a = vehicle entity id.
pub const EVENT_VEHICLE_REPAIRED: f32 = 5.0;
/// a = feedback intensity in [0, 1].
pub const EVENT_WORMHOLE_FEEDBACK: f32 = 6.0;
/// a = 1 entered, 0 left; b = new nesting depth.
pub const EVENT_SUB_AREA: f32 = 7.0;
pub const EVENT_TELEPORTED: f32 = 8.0;
/// a = task kind code (1 mining, 2 repairing).
pub const EVENT_TASK_ABORTED: f32 = 9.0;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pose_forward_follows_rotation() {
        let pose = Pose::new(Vec3::ZERO, Quat::from_rotation_z(std::f32::consts::FRAC_PI_2));
        let f = pose.forward();
        assert!((f - Vec3::new(-1.0, 0.0, 0.0)).length() < 1e-5, "forward = {f}");
    }

    #[test]
    fn pose_parses_without_rotation() {
        let pose: Pose = serde_json::from_str(r#"{ "position": [1.0, 2.0, 3.0] }"#).unwrap();
        assert_eq!(pose.position, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(pose.rotation, Quat::IDENTITY);
    }

    #[test]
    fn game_event_is_four_floats() {
        assert_eq!(std::mem::size_of::<GameEvent>(), GameEvent::FLOATS * 4);
        let ev = GameEvent::new(EVENT_OBJECT_MINED, 7.0, 0.0, 0.0);
        let floats: &[f32] = bytemuck::cast_slice(std::slice::from_ref(&ev));
        assert_eq!(floats, &[EVENT_OBJECT_MINED, 7.0, 0.0, 0.0]);
    }
}
