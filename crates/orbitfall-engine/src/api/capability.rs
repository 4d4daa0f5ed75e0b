//! Capability traits shared by orbital bodies, locomotion proxies and vehicles.
//!
//! Each concrete type is a plain handle/transform struct; behavior is composed
//! by implementing only the capabilities it actually has.

use glam::{Quat, Vec3};

use crate::api::host::HostWorld;
use crate::api::types::EntityId;

/// Anything backed by a host entity.
pub trait Handle {
    fn entity(&self) -> EntityId;

    fn is_alive(&self, world: &dyn HostWorld) -> bool {
        world.exists(self.entity())
    }
}

/// Objects that carry their own orientation.
pub trait Rotatable {
    fn orientation(&self) -> Quat;
    fn set_orientation(&mut self, rotation: Quat);

    /// Compose a local-space incremental rotation onto the current orientation.
    fn rotate_by(&mut self, delta: Quat) {
        let rotation = (self.orientation() * delta).normalize();
        self.set_orientation(rotation);
    }
}

/// Objects that can be rigidly locked to another entity.
pub trait Attachable: Handle {
    fn attach_to(&self, world: &mut dyn HostWorld, parent: EntityId, offset: Vec3) -> bool {
        world.attach(self.entity(), parent, offset)
    }

    fn detach(&self, world: &mut dyn HostWorld) -> bool {
        world.detach(self.entity())
    }

    /// Lock `child` onto this object.
    fn carry(&self, world: &mut dyn HostWorld, child: EntityId, offset: Vec3) -> bool {
        world.attach(child, self.entity(), offset)
    }
}

/// Objects with host-side health.
pub trait Damageable: Handle {
    fn health(&self, world: &dyn HostWorld) -> Option<f32> {
        world.health(self.entity())
    }

    fn is_damaged(&self, world: &dyn HostWorld) -> bool {
        match (world.health(self.entity()), world.max_health(self.entity())) {
            (Some(health), Some(max)) => health < max - f32::EPSILON,
            _ => false,
        }
    }

    /// Restore full health. False if the object is gone or not damageable.
    fn restore(&self, world: &mut dyn HostWorld) -> bool {
        match world.max_health(self.entity()) {
            Some(max) => world.set_health(self.entity(), max),
            None => false,
        }
    }
}
