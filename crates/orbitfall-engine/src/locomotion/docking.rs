// locomotion/docking.rs
//
// The approach-then-hold choreography shared by mining and repairing. The dock
// point is stored in the target's local frame so it follows a moving target.

use glam::{Quat, Vec3};

use crate::api::config::LocomotionTuning;
use crate::api::host::{HostWorld, ProbeHit};
use crate::api::types::{EntityId, Pose};
use crate::core::math::{approach_factor, is_valid_position, look_rotation, move_toward};
use crate::core::time::Deadline;
use crate::locomotion::proxy::LocomotionProxy;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DockingPhase {
    Approach,
    Hold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    /// Target despawned or its position became unusable.
    TargetLost,
    /// Approach did not reach the dock point in time.
    Timeout,
    /// Player input cancelled the task.
    Cancelled,
    /// The carrier proxy disappeared.
    ProxyLost,
    /// The player died, ragdolled or left zero gravity.
    Interrupted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DockingStatus {
    InProgress,
    Complete,
    Aborted(AbortReason),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DockingTask {
    target: EntityId,
    local_dock: Vec3,
    local_facing: Quat,
    phase: DockingPhase,
    approach_deadline: Deadline,
    hold_deadline: Option<Deadline>,
    hold_duration: f32,
}

impl DockingTask {
    /// Plan a dock in front of `hit`, facing the surface. `None` if the target
    /// has no pose.
    pub fn begin(world: &dyn HostWorld, hit: &ProbeHit, tuning: &LocomotionTuning, now: f64) -> Option<Self> {
        let target = world.pose(hit.entity).filter(Pose::is_finite)?;
        let dock = hit.point + hit.normal * tuning.dock_distance;
        let facing = look_rotation(-hit.normal, Vec3::Z);
        let inverse = target.rotation.inverse();
        Some(Self {
            target: hit.entity,
            local_dock: inverse * (dock - target.position),
            local_facing: (inverse * facing).normalize(),
            phase: DockingPhase::Approach,
            approach_deadline: Deadline::after(now, tuning.approach_timeout),
            hold_deadline: None,
            hold_duration: tuning.task_duration,
        })
    }

    pub fn target(&self) -> EntityId {
        self.target
    }

    pub fn phase(&self) -> DockingPhase {
        self.phase
    }

    /// Seconds left in the hold, if holding.
    pub fn hold_remaining(&self, now: f64) -> Option<f32> {
        self.hold_deadline.map(|d| d.remaining(now))
    }

    /// Current dock pose in world space. `None` once the target is unusable.
    pub fn dock_pose(&self, world: &dyn HostWorld) -> Option<Pose> {
        let target = world.pose(self.target)?;
        if !is_valid_position(target.position) || !target.rotation.is_finite() {
            return None;
        }
        Some(Pose::new(
            target.transform_point(self.local_dock),
            (target.rotation * self.local_facing).normalize(),
        ))
    }

    /// Advance the task by one tick, moving `proxy`.
    pub fn step(
        &mut self,
        world: &mut dyn HostWorld,
        proxy: &mut LocomotionProxy,
        tuning: &LocomotionTuning,
        dt: f32,
        now: f64,
    ) -> DockingStatus {
        let Some(dock) = self.dock_pose(world) else {
            return DockingStatus::Aborted(AbortReason::TargetLost);
        };
        let Some(current) = proxy.pose(world) else {
            return DockingStatus::Aborted(AbortReason::ProxyLost);
        };

        match self.phase {
            DockingPhase::Approach => {
                if self.approach_deadline.expired(now) {
                    return DockingStatus::Aborted(AbortReason::Timeout);
                }
                let position = move_toward(current.position, dock.position, tuning.dock_speed * dt);
                let rotation = current
                    .rotation
                    .slerp(dock.rotation, approach_factor(tuning.dock_speed, dt))
                    .normalize();
                proxy.place(world, Pose::new(position, rotation));
                if position.distance(dock.position) <= tuning.dock_tolerance {
                    self.phase = DockingPhase::Hold;
                    self.hold_deadline = Some(Deadline::after(now, self.hold_duration));
                }
                DockingStatus::InProgress
            }
            DockingPhase::Hold => {
                proxy.place(world, dock);
                if self.hold_deadline.is_some_and(|d| d.expired(now)) {
                    DockingStatus::Complete
                } else {
                    DockingStatus::InProgress
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::capability::Handle;
    use crate::api::host::SpawnDesc;
    use crate::core::world::SimWorld;

    fn setup() -> (SimWorld, LocomotionProxy, ProbeHit) {
        let mut world = SimWorld::new();
        let rock = world.spawn(
            SpawnDesc::model("rock".into(), Pose::at(Vec3::new(0.0, 5.0, 0.0)))
                .with_radius(1.0)
                .with_mineable(true),
        );
        let proxy = LocomotionProxy::spawn(&mut world, Pose::IDENTITY);
        let hit = world.probe(Vec3::ZERO, Vec3::Y, 10.0, &[proxy.entity()]).unwrap();
        assert_eq!(hit.entity, rock);
        (world, proxy, hit)
    }

    #[test]
    fn approaches_then_holds_then_completes() {
        let (mut world, mut proxy, hit) = setup();
        let tuning = LocomotionTuning::default();
        let mut task = DockingTask::begin(&world, &hit, &tuning, 0.0).unwrap();

        let mut now = 0.0;
        let dt = 0.1;
        while task.phase() == DockingPhase::Approach {
            now += dt as f64;
            assert_eq!(task.step(&mut world, &mut proxy, &tuning, dt, now), DockingStatus::InProgress);
            assert!(now < 5.0, "approach stalled");
        }
        let docked = proxy.pose(&world).unwrap();
        // hit at y = 4, stand-off 1.2 back toward the player
        assert!((docked.position - Vec3::new(0.0, 2.8, 0.0)).length() <= tuning.dock_tolerance + 1e-4);

        let hold_start = now;
        let mut status = DockingStatus::InProgress;
        while status == DockingStatus::InProgress {
            now += dt as f64;
            status = task.step(&mut world, &mut proxy, &tuning, dt, now);
        }
        assert_eq!(status, DockingStatus::Complete);
        assert!(now - hold_start >= 5.0 - 1e-6);
        assert!((proxy.pose(&world).unwrap().forward() - Vec3::Y).length() < 1e-4);
    }

    #[test]
    fn target_loss_aborts_at_once() {
        let (mut world, mut proxy, hit) = setup();
        let tuning = LocomotionTuning::default();
        let mut task = DockingTask::begin(&world, &hit, &tuning, 0.0).unwrap();
        task.step(&mut world, &mut proxy, &tuning, 0.1, 0.1);
        world.despawn(hit.entity);
        assert_eq!(
            task.step(&mut world, &mut proxy, &tuning, 0.1, 0.2),
            DockingStatus::Aborted(AbortReason::TargetLost)
        );
    }

    #[test]
    fn invalid_target_position_aborts() {
        let (mut world, mut proxy, hit) = setup();
        let tuning = LocomotionTuning::default();
        let mut task = DockingTask::begin(&world, &hit, &tuning, 0.0).unwrap();
        world.set_pose(hit.entity, Pose::at(Vec3::new(f32::NAN, 0.0, 0.0)));
        assert_eq!(
            task.step(&mut world, &mut proxy, &tuning, 0.1, 0.1),
            DockingStatus::Aborted(AbortReason::TargetLost)
        );
    }

    #[test]
    fn slow_approach_times_out() {
        let (mut world, mut proxy, hit) = setup();
        let tuning = LocomotionTuning {
            dock_speed: 0.01,
            ..LocomotionTuning::default()
        };
        let mut task = DockingTask::begin(&world, &hit, &tuning, 0.0).unwrap();
        assert_eq!(task.step(&mut world, &mut proxy, &tuning, 0.1, 1.0), DockingStatus::InProgress);
        assert_eq!(
            task.step(&mut world, &mut proxy, &tuning, 0.1, 8.5),
            DockingStatus::Aborted(AbortReason::Timeout)
        );
    }
}
