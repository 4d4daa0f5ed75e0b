use glam::{Quat, Vec3};

use crate::api::capability::{Attachable, Damageable, Handle, Rotatable};
use crate::api::host::{HostWorld, SpawnDesc};
use crate::api::types::{EntityId, Pose};

pub const PROXY_TAG: &str = "locomotion_proxy";

/// Invisible, massless carrier the drifting player is attached to.
#[derive(Debug, Clone, PartialEq)]
pub struct LocomotionProxy {
    entity: EntityId,
    rotation: Quat,
}

impl LocomotionProxy {
    pub fn spawn(world: &mut dyn HostWorld, pose: Pose) -> Self {
        let entity = world.spawn(SpawnDesc::invisible(pose).with_tag(PROXY_TAG));
        Self {
            entity,
            rotation: pose.rotation,
        }
    }

    pub fn pose(&self, world: &dyn HostWorld) -> Option<Pose> {
        world.pose(self.entity)
    }

    /// Move the proxy; the attached player follows.
    pub fn place(&mut self, world: &mut dyn HostWorld, pose: Pose) -> bool {
        self.set_orientation(pose.rotation);
        world.set_pose(self.entity, pose)
    }

    /// Detach `passenger` and remove the proxy.
    pub fn release(self, world: &mut dyn HostWorld, passenger: EntityId) -> bool {
        world.detach(passenger);
        world.despawn(self.entity)
    }
}

impl Handle for LocomotionProxy {
    fn entity(&self) -> EntityId {
        self.entity
    }
}

impl Attachable for LocomotionProxy {}

impl Rotatable for LocomotionProxy {
    fn orientation(&self) -> Quat {
        self.rotation
    }

    fn set_orientation(&mut self, rotation: Quat) {
        self.rotation = rotation;
    }
}

/// The vehicle the player last sat in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vehicle {
    entity: EntityId,
}

impl Vehicle {
    pub fn new(entity: EntityId) -> Self {
        Self { entity }
    }

    /// World position of the door, `door_offset` being vehicle-local.
    pub fn door_point(&self, world: &dyn HostWorld, door_offset: Vec3) -> Option<Vec3> {
        world.pose(self.entity).map(|p| p.transform_point(door_offset))
    }
}

impl Handle for Vehicle {
    fn entity(&self) -> EntityId {
        self.entity
    }
}

impl Attachable for Vehicle {}

impl Damageable for Vehicle {}
