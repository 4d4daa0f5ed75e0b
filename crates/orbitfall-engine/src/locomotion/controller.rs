// locomotion/controller.rs
//
// Per-player locomotion state machine. One `Mode` value holds the active state
// and its payload, so two states can never be active together. Each tick the
// controller checks, in order:
//
//   1. player dead or ragdolled          -> Grounded (passive), proxy released
//   2. surface scene                     -> Grounded
//   3. seated in a vehicle               -> Piloting
//   4. otherwise                         -> Drifting / Mining / Repairing

use glam::Vec3;

use crate::api::capability::{Attachable, Damageable, Handle};
use crate::api::config::{EngineConfig, LocomotionTuning};
use crate::api::context::FrameContext;
use crate::api::host::{HostWorld, ProbeHit};
use crate::api::types::{EntityId, Pose};
use crate::core::math::{clip_velocity, move_toward};
use crate::core::time::Deadline;
use crate::input::queue::{Action, FrameInput};
use crate::locomotion::docking::{AbortReason, DockingPhase, DockingStatus, DockingTask};
use crate::locomotion::flight::FlightModel;
use crate::locomotion::proxy::{LocomotionProxy, Vehicle};
use crate::locomotion::state::LocomotionState;

/// The one drifting interaction currently available, by priority.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Armed {
    Reenter,
    Repair(ProbeHit),
    Mine(ProbeHit),
}

#[derive(Debug, Clone, PartialEq)]
pub enum LocomotionEvent {
    StateChanged {
        from: LocomotionState,
        to: LocomotionState,
    },
    ObjectMined(EntityId),
    VehicleRepaired(EntityId),
    TaskAborted {
        state: LocomotionState,
        reason: AbortReason,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Seek {
    vehicle: Vehicle,
    deadline: Deadline,
}

#[derive(Debug, Clone, PartialEq)]
enum Mode {
    Grounded,
    Piloting(Vehicle),
    Drifting { seek: Option<Seek> },
    Mining(DockingTask),
    Repairing(DockingTask),
}

impl Mode {
    fn state(&self) -> LocomotionState {
        match self {
            Mode::Grounded => LocomotionState::Grounded,
            Mode::Piloting(_) => LocomotionState::Piloting,
            Mode::Drifting { .. } => LocomotionState::Drifting,
            Mode::Mining(_) => LocomotionState::Mining,
            Mode::Repairing(_) => LocomotionState::Repairing,
        }
    }
}

pub struct LocomotionController {
    mode: Mode,
    proxy: Option<LocomotionProxy>,
    last_vehicle: Option<Vehicle>,
    armed: Option<Armed>,
    piloting: FlightModel,
    drifting: FlightModel,
    external_velocity: Option<Vec3>,
    events: Vec<LocomotionEvent>,
}

impl LocomotionController {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            mode: Mode::Grounded,
            proxy: None,
            last_vehicle: None,
            armed: None,
            piloting: FlightModel::new(config.flight),
            drifting: FlightModel::new(config.drift),
            external_velocity: None,
            events: Vec::new(),
        }
    }

    pub fn state(&self) -> LocomotionState {
        self.mode.state()
    }

    pub fn armed(&self) -> Option<Armed> {
        self.armed
    }

    pub fn proxy(&self) -> Option<&LocomotionProxy> {
        self.proxy.as_ref()
    }

    pub fn last_vehicle(&self) -> Option<Vehicle> {
        self.last_vehicle
    }

    pub fn set_last_vehicle(&mut self, vehicle: Option<Vehicle>) {
        self.last_vehicle = vehicle;
    }

    pub fn is_seeking(&self) -> bool {
        matches!(self.mode, Mode::Drifting { seek: Some(_) })
    }

    pub fn task(&self) -> Option<&DockingTask> {
        match &self.mode {
            Mode::Mining(task) | Mode::Repairing(task) => Some(task),
            _ => None,
        }
    }

    /// Velocity of whatever the player is flying, zero otherwise.
    pub fn velocity(&self) -> Vec3 {
        match self.mode {
            Mode::Piloting(_) => self.piloting.velocity(),
            Mode::Drifting { seek: None } => self.drifting.velocity(),
            _ => Vec3::ZERO,
        }
    }

    /// Impose a velocity on the next flight step (wormhole pull).
    pub fn apply_external_velocity(&mut self, velocity: Vec3) {
        if velocity.is_finite() {
            self.external_velocity = Some(velocity);
        }
    }

    pub fn update(&mut self, ctx: &mut FrameContext<'_>, surface: bool) -> Vec<LocomotionEvent> {
        let world: &mut dyn HostWorld = &mut *ctx.world;
        let input = ctx.input;
        let tuning = ctx.config.locomotion;
        let (dt, now) = (ctx.dt, ctx.now);

        if world.is_player_dead() || world.is_player_ragdolled() || surface {
            self.fall_back(world, Mode::Grounded, AbortReason::Interrupted);
        } else if let Some(seated) = world.seated_vehicle() {
            self.update_seated(world, Vehicle::new(seated), input, &tuning, dt);
        } else {
            self.update_unseated(world, input, &tuning, dt, now);
        }
        std::mem::take(&mut self.events)
    }

    /// Move the player to `pose`, through whatever currently carries them.
    pub fn relocate(&mut self, world: &mut dyn HostWorld, pose: Pose) -> bool {
        if let Some(vehicle) = world.seated_vehicle() {
            return world.set_pose(vehicle, pose);
        }
        if let Some(proxy) = self.proxy.as_mut() {
            if world.exists(proxy.entity()) {
                return proxy.place(world, pose);
            }
        }
        let player = world.player();
        world.set_pose(player, pose)
    }

    /// Drop the proxy and return to Grounded. Used on scene teardown.
    /// Returns how many entities were despawned.
    pub fn release(&mut self, world: &mut dyn HostWorld) -> usize {
        let despawned = self.release_proxy(world);
        self.armed = None;
        self.external_velocity = None;
        self.mode = Mode::Grounded;
        despawned
    }

    fn set_mode(&mut self, mode: Mode) {
        let from = self.mode.state();
        self.mode = mode;
        let to = self.mode.state();
        if from != to {
            log::debug!("locomotion {from} -> {to}");
            self.events.push(LocomotionEvent::StateChanged { from, to });
        }
    }

    /// Leave whatever is running for `mode`, aborting a task if one is active.
    fn fall_back(&mut self, world: &mut dyn HostWorld, mode: Mode, reason: AbortReason) {
        let state = self.mode.state();
        if state.is_task() {
            log::warn!("{state} aborted: {reason:?}");
            self.events.push(LocomotionEvent::TaskAborted { state, reason });
        }
        self.release_proxy(world);
        self.armed = None;
        self.set_mode(mode);
    }

    fn release_proxy(&mut self, world: &mut dyn HostWorld) -> usize {
        let Some(proxy) = self.proxy.take() else {
            return 0;
        };
        // a seated player hangs off the vehicle, not the proxy
        if world.seated_vehicle().is_some() {
            return world.despawn(proxy.entity()) as usize;
        }
        let player = world.player();
        proxy.release(world, player) as usize
    }

    /// Make sure a live proxy carries the player, respawning a stale one.
    fn ensure_proxy(&mut self, world: &mut dyn HostWorld) {
        if let Some(proxy) = &self.proxy {
            if proxy.is_alive(world) {
                return;
            }
            log::warn!("locomotion proxy {:?} vanished, respawning", proxy.entity());
            self.proxy = None;
        }
        let player = world.player();
        let pose = world.pose(player).unwrap_or_default();
        let proxy = LocomotionProxy::spawn(world, pose);
        if !proxy.carry(world, player, Vec3::ZERO) {
            log::warn!("could not attach player to locomotion proxy");
        }
        self.proxy = Some(proxy);
    }

    fn enter_drifting(&mut self, world: &mut dyn HostWorld) {
        self.ensure_proxy(world);
        self.drifting.reset();
        self.armed = None;
        self.set_mode(Mode::Drifting { seek: None });
    }

    fn update_seated(
        &mut self,
        world: &mut dyn HostWorld,
        vehicle: Vehicle,
        input: &FrameInput,
        tuning: &LocomotionTuning,
        dt: f32,
    ) {
        if self.mode != Mode::Piloting(vehicle) {
            self.fall_back(world, Mode::Piloting(vehicle), AbortReason::Interrupted);
            self.piloting.reset();
            self.last_vehicle = Some(vehicle);
        }

        if input.just_pressed(Action::EnterExitVehicle) {
            self.exit_vehicle(world, vehicle, tuning);
            return;
        }

        let Some(pose) = world.pose(vehicle.entity()) else {
            return;
        };
        if let Some(velocity) = self.external_velocity.take() {
            self.piloting.set_velocity(velocity);
        }
        let next = self.piloting.step(pose, &input.axes, dt);
        world.set_pose(vehicle.entity(), next);
    }

    fn exit_vehicle(&mut self, world: &mut dyn HostWorld, vehicle: Vehicle, tuning: &LocomotionTuning) {
        world.unseat_player();
        if let (Some(door), Some(pose)) = (vehicle.door_point(world, tuning.door_offset), world.pose(vehicle.entity())) {
            let player = world.player();
            world.set_pose(player, Pose::new(door, pose.rotation));
        }
        self.last_vehicle = Some(vehicle);
        self.enter_drifting(world);
    }

    fn update_unseated(
        &mut self,
        world: &mut dyn HostWorld,
        input: &FrameInput,
        tuning: &LocomotionTuning,
        dt: f32,
        now: f64,
    ) {
        match self.mode {
            // arrived in space on foot, or the host took the player out of the seat
            Mode::Grounded | Mode::Piloting(_) => self.enter_drifting(world),
            _ => self.ensure_proxy(world),
        }

        match self.mode {
            Mode::Drifting { seek: Some(seek) } => self.run_seek(world, input, tuning, seek, dt, now),
            Mode::Drifting { seek: None } => self.drift(world, input, tuning, dt, now),
            Mode::Mining(_) | Mode::Repairing(_) => self.run_task(world, input, tuning, dt, now),
            _ => {}
        }
    }

    fn drift(&mut self, world: &mut dyn HostWorld, input: &FrameInput, tuning: &LocomotionTuning, dt: f32, now: f64) {
        let Some(proxy_id) = self.proxy.as_ref().map(|p| p.entity()) else {
            return;
        };
        let Some(pose) = world.pose(proxy_id) else {
            return;
        };
        self.armed = self.evaluate_arming(world, proxy_id, pose, tuning);

        match self.armed {
            Some(Armed::Reenter) if input.just_pressed(Action::EnterExitVehicle) => {
                if let Some(vehicle) = self.last_vehicle {
                    log::debug!("re-entry seek toward {:?}", vehicle.entity());
                    self.mode = Mode::Drifting {
                        seek: Some(Seek {
                            vehicle,
                            deadline: Deadline::after(now, tuning.seek_timeout),
                        }),
                    };
                    return;
                }
            }
            Some(Armed::Repair(hit)) if input.just_pressed(Action::Interact) => {
                if let Some(task) = DockingTask::begin(world, &hit, tuning, now) {
                    self.armed = None;
                    self.set_mode(Mode::Repairing(task));
                    return;
                }
            }
            Some(Armed::Mine(hit)) if input.just_pressed(Action::Interact) => {
                if let Some(task) = DockingTask::begin(world, &hit, tuning, now) {
                    self.armed = None;
                    self.set_mode(Mode::Mining(task));
                    return;
                }
            }
            _ => {}
        }

        if let Some(velocity) = self.external_velocity.take() {
            self.drifting.set_velocity(velocity);
        }
        let next = self.drifting.step(pose, &input.axes, dt);
        let next = self.sweep(world, proxy_id, pose.position, next, tuning);
        if let Some(proxy) = self.proxy.as_mut() {
            proxy.place(world, next);
        }
    }

    /// Re-entry first, then repair of our own damaged vehicle, then mining.
    fn evaluate_arming(
        &self,
        world: &dyn HostWorld,
        proxy: EntityId,
        pose: Pose,
        tuning: &LocomotionTuning,
    ) -> Option<Armed> {
        let player = world.player();
        let player_pos = world.position(player).unwrap_or(pose.position);
        let vehicle = self.last_vehicle.filter(|v| v.is_alive(world));

        if let Some(door) = vehicle.and_then(|v| v.door_point(world, tuning.door_offset)) {
            if door.distance(player_pos) <= tuning.reentry_radius {
                return Some(Armed::Reenter);
            }
        }

        let hit = world.probe(pose.position, pose.forward(), tuning.probe_range, &[proxy, player])?;
        if vehicle.is_some_and(|v| v.entity() == hit.entity && v.is_damaged(world)) {
            return Some(Armed::Repair(hit));
        }
        if world.is_mineable(hit.entity) {
            return Some(Armed::Mine(hit));
        }
        None
    }

    /// Capsule sweep along the motion: three probes spread along the body axis.
    /// Stops short of the first surface moved into and clips the velocity.
    fn sweep(
        &mut self,
        world: &dyn HostWorld,
        proxy: EntityId,
        from: Vec3,
        next: Pose,
        tuning: &LocomotionTuning,
    ) -> Pose {
        let motion = next.position - from;
        let distance = motion.length();
        if distance < 1e-6 {
            return next;
        }
        let dir = motion / distance;
        let axis = next.up() * tuning.capsule_half_height;
        let ignore = [proxy, world.player()];
        let blocking = [from, from + axis, from - axis]
            .into_iter()
            .filter_map(|origin| world.probe(origin, dir, distance + tuning.capsule_radius, &ignore))
            .filter(|hit| dir.dot(hit.normal) < 0.0)
            .min_by(|a, b| a.distance.total_cmp(&b.distance));

        match blocking {
            None => next,
            Some(hit) => {
                let allowed = (hit.distance - tuning.capsule_radius).clamp(0.0, distance);
                self.drifting
                    .set_velocity(clip_velocity(self.drifting.velocity(), hit.normal));
                Pose::new(from + dir * allowed, next.rotation)
            }
        }
    }

    fn run_seek(
        &mut self,
        world: &mut dyn HostWorld,
        input: &FrameInput,
        tuning: &LocomotionTuning,
        seek: Seek,
        dt: f32,
        now: f64,
    ) {
        let door = if seek.vehicle.is_alive(world) {
            seek.vehicle.door_point(world, tuning.door_offset)
        } else {
            None
        };
        let abandoned = input.just_pressed(Action::Cancel) || seek.deadline.expired(now);
        let Some(door) = door.filter(|_| !abandoned) else {
            log::warn!("re-entry seek abandoned");
            self.mode = Mode::Drifting { seek: None };
            return;
        };

        let Some(proxy) = self.proxy.as_mut() else {
            return;
        };
        let Some(pose) = proxy.pose(world) else {
            return;
        };
        let position = move_toward(pose.position, door, tuning.seek_speed * dt);
        proxy.place(world, Pose::new(position, pose.rotation));

        if position.distance(door) <= tuning.attach_distance && world.seat_player(seek.vehicle.entity()) {
            self.release_proxy(world);
            self.piloting.reset();
            self.last_vehicle = Some(seek.vehicle);
            self.set_mode(Mode::Piloting(seek.vehicle));
        }
    }

    fn run_task(&mut self, world: &mut dyn HostWorld, input: &FrameInput, tuning: &LocomotionTuning, dt: f32, now: f64) {
        let state = self.mode.state();
        let (Mode::Mining(task) | Mode::Repairing(task)) = &mut self.mode else {
            return;
        };
        let cancelled = input.just_pressed(Action::Cancel)
            || (state == LocomotionState::Repairing
                && task.phase() == DockingPhase::Approach
                && input.override_active(tuning.override_deadzone));
        let status = if cancelled {
            DockingStatus::Aborted(AbortReason::Cancelled)
        } else {
            match self.proxy.as_mut() {
                Some(proxy) => task.step(world, proxy, tuning, dt, now),
                None => DockingStatus::Aborted(AbortReason::ProxyLost),
            }
        };
        let target = task.target();

        match status {
            DockingStatus::InProgress => {}
            DockingStatus::Complete => {
                if state == LocomotionState::Mining {
                    log::debug!("mined {target:?}");
                    self.events.push(LocomotionEvent::ObjectMined(target));
                } else if Vehicle::new(target).restore(world) {
                    log::debug!("repaired {target:?}");
                    self.events.push(LocomotionEvent::VehicleRepaired(target));
                } else {
                    log::warn!("repair target {target:?} has no health to restore");
                    self.events.push(LocomotionEvent::TaskAborted {
                        state,
                        reason: AbortReason::TargetLost,
                    });
                }
                self.set_mode(Mode::Drifting { seek: None });
            }
            DockingStatus::Aborted(reason) => {
                log::warn!("{state} aborted: {reason:?}");
                self.events.push(LocomotionEvent::TaskAborted { state, reason });
                self.set_mode(Mode::Drifting { seek: None });
            }
        }
    }
}
