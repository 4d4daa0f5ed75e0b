use glam::{Quat, Vec3};

use crate::api::capability::{Handle, Rotatable};
use crate::api::host::{HostWorld, SpawnDesc};
use crate::api::types::{EntityId, ModelId, Pose, SceneId};
use crate::assets::definition::OrbitalBodyDefinition;
use crate::core::math::wrap_angle;
use crate::scene::ledger::stable_id;

pub const BODY_TAG: &str = "orbital_body";

/// Circular motion about a pivot.
///
/// The orbit tracks its phase angle and derives the position from it, instead
/// of rotating the previous position by each step. Elapsed time only enters
/// through the phase sum, so the path stays exactly circular no matter how the
/// time was sliced into frames.
#[derive(Debug, Clone, PartialEq)]
pub struct Orbit {
    pivot: Vec3,
    axis: Vec3,
    /// Radians per second.
    angular_velocity: f32,
    radial: Vec3,
    phase: f32,
}

impl Orbit {
    pub fn new(pivot: Vec3, axis: Vec3, angular_velocity: f32, start: Vec3) -> Self {
        Self {
            pivot,
            axis: axis.try_normalize().unwrap_or(Vec3::Z),
            angular_velocity,
            radial: start - pivot,
            phase: 0.0,
        }
    }

    pub fn advance(&mut self, dt: f32) {
        self.phase = wrap_angle(self.phase + self.angular_velocity * dt);
    }

    pub fn position(&self) -> Vec3 {
        self.pivot + Quat::from_axis_angle(self.axis, self.phase) * self.radial
    }

    /// Angle travelled since spawn, in [0, 2π).
    pub fn phase(&self) -> f32 {
        self.phase
    }

    pub fn pivot(&self) -> Vec3 {
        self.pivot
    }

    pub fn radius(&self) -> f32 {
        self.radial.length()
    }
}

/// Scene transition attached to a body.
#[derive(Debug, Clone, PartialEq)]
pub struct ExitTrigger {
    pub radius: f32,
    pub scene: SceneId,
    pub pose: Option<Pose>,
}

/// A spawned orbital body.
#[derive(Debug, Clone)]
pub struct OrbitalBody {
    pub name: String,
    pub model: ModelId,
    /// Ledger key, stable across sessions.
    pub stable_id: String,
    entity: EntityId,
    position: Vec3,
    rotation: Quat,
    spin_axis: Vec3,
    /// Radians per second.
    spin_rate: f32,
    orbit: Option<Orbit>,
    wormhole: bool,
    exit: Option<ExitTrigger>,
    mineable: bool,
    radius: f32,
}

impl OrbitalBody {
    /// Spawn the body for `def`, placed relative to the scene `origin`.
    pub fn spawn(world: &mut dyn HostWorld, scene: &SceneId, def: &OrbitalBodyDefinition, origin: Vec3) -> Self {
        let position = origin + def.offset;
        let pose = Pose::at(position);
        let entity = world.spawn(
            SpawnDesc::model(def.model.clone(), pose)
                .with_tag(BODY_TAG)
                .with_radius(def.radius)
                .with_mineable(def.mineable),
        );
        let orbit = def.orbit.as_ref().map(|o| {
            Orbit::new(
                origin + o.pivot,
                o.axis,
                o.angular_velocity.to_radians(),
                position,
            )
        });
        let exit = match (&def.next_scene, def.exit_radius > 0.0) {
            (Some(scene), true) => Some(ExitTrigger {
                radius: def.exit_radius,
                scene: scene.clone(),
                pose: def.next_pose,
            }),
            _ => None,
        };
        Self {
            name: def.name.clone(),
            model: def.model.clone(),
            stable_id: stable_id(scene, &def.name),
            entity,
            position,
            rotation: Quat::IDENTITY,
            spin_axis: def.spin_axis.try_normalize().unwrap_or(Vec3::Z),
            spin_rate: def.rotation_speed.to_radians(),
            orbit,
            wormhole: def.is_wormhole,
            exit,
            mineable: def.mineable,
            radius: def.radius,
        }
    }

    /// Advance orbit and spin by `dt`. Does not touch the host.
    pub fn step(&mut self, dt: f32) {
        if let Some(orbit) = self.orbit.as_mut() {
            orbit.advance(dt);
            self.position = orbit.position();
        }
        if self.spin_rate != 0.0 {
            self.rotate_by(Quat::from_axis_angle(self.spin_axis, self.spin_rate * dt));
        }
    }

    /// Push the current pose to the host. False if the entity is gone.
    pub fn sync(&self, world: &mut dyn HostWorld) -> bool {
        world.set_pose(self.entity, self.pose())
    }

    pub fn pose(&self) -> Pose {
        Pose::new(self.position, self.rotation)
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn orbit(&self) -> Option<&Orbit> {
        self.orbit.as_ref()
    }

    pub fn is_wormhole(&self) -> bool {
        self.wormhole
    }

    pub fn exit(&self) -> Option<&ExitTrigger> {
        self.exit.as_ref()
    }

    pub fn is_mineable(&self) -> bool {
        self.mineable
    }

    pub fn radius(&self) -> f32 {
        self.radius
    }
}

impl Handle for OrbitalBody {
    fn entity(&self) -> EntityId {
        self.entity
    }
}

impl Rotatable for OrbitalBody {
    fn orientation(&self) -> Quat {
        self.rotation
    }

    fn set_orientation(&mut self, rotation: Quat) {
        self.rotation = rotation;
    }
}
