use glam::{Quat, Vec3};

use crate::api::config::FlightTuning;
use crate::api::types::Pose;
use crate::core::math::{approach_factor, blend_toward, smooth_toward};
use crate::input::queue::FlightAxes;

/// Six-degree-of-freedom flight shared by piloting and drifting.
///
/// Axis input is smoothed before it turns the craft; thrust blends the
/// velocity toward `forward * max_speed * throttle` instead of setting it.
/// With no throttle the craft coasts.
#[derive(Debug, Clone, PartialEq)]
pub struct FlightModel {
    tuning: FlightTuning,
    yaw: f32,
    pitch: f32,
    roll: f32,
    velocity: Vec3,
}

impl FlightModel {
    pub fn new(tuning: FlightTuning) -> Self {
        Self {
            tuning,
            yaw: 0.0,
            pitch: 0.0,
            roll: 0.0,
            velocity: Vec3::ZERO,
        }
    }

    pub fn tuning(&self) -> &FlightTuning {
        &self.tuning
    }

    pub fn velocity(&self) -> Vec3 {
        self.velocity
    }

    pub fn set_velocity(&mut self, velocity: Vec3) {
        if velocity.is_finite() {
            self.velocity = velocity;
        }
    }

    /// Smoothed (yaw, pitch, roll) input currently applied.
    pub fn rates(&self) -> (f32, f32, f32) {
        (self.yaw, self.pitch, self.roll)
    }

    pub fn reset(&mut self) {
        self.yaw = 0.0;
        self.pitch = 0.0;
        self.roll = 0.0;
        self.velocity = Vec3::ZERO;
    }

    /// Integrate one step. Returns the new pose; velocity is kept internally.
    pub fn step(&mut self, pose: Pose, axes: &FlightAxes, dt: f32) -> Pose {
        if dt <= 0.0 || !dt.is_finite() {
            return pose;
        }
        let t = &self.tuning;
        self.yaw = smooth_toward(self.yaw, axes.yaw, t.input_response, dt);
        self.pitch = smooth_toward(self.pitch, axes.pitch, t.input_response, dt);
        self.roll = smooth_toward(self.roll, axes.roll, t.input_response, dt);

        // yaw about local up, pitch about local right, roll about local forward
        let delta = Quat::from_rotation_z(-self.yaw * t.yaw_rate * dt)
            * Quat::from_rotation_x(self.pitch * t.pitch_rate * dt)
            * Quat::from_rotation_y(self.roll * t.roll_rate * dt);
        let rotation = (pose.rotation * delta).normalize();

        if axes.throttle.abs() > 1e-3 {
            let target = rotation * Vec3::Y * t.max_speed * axes.throttle;
            self.velocity = blend_toward(self.velocity, target, t.velocity_response, dt);
        }
        if axes.brake > 0.0 {
            self.velocity *= 1.0 - approach_factor(t.brake_response * axes.brake, dt);
        }

        Pose::new(pose.position + self.velocity * dt, rotation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::input::queue::Axis;

    fn model() -> FlightModel {
        FlightModel::new(FlightTuning::piloting())
    }

    #[test]
    fn throttle_accelerates_forward_without_jumping() {
        let mut m = model();
        let axes = FlightAxes::default().with(Axis::Throttle, 1.0);
        let pose = m.step(Pose::IDENTITY, &axes, 0.1);
        let v = m.velocity();
        assert!(v.y > 0.0 && v.y < FlightTuning::piloting().max_speed * 0.5, "v = {v}");
        assert!(pose.position.y > 0.0);
        for _ in 0..200 {
            m.step(pose, &axes, 0.1);
        }
        assert!((m.velocity().y - FlightTuning::piloting().max_speed).abs() < 0.5);
    }

    #[test]
    fn coasts_without_throttle() {
        let mut m = model();
        m.set_velocity(Vec3::new(0.0, 10.0, 0.0));
        m.step(Pose::IDENTITY, &FlightAxes::default(), 0.5);
        assert_eq!(m.velocity(), Vec3::new(0.0, 10.0, 0.0));
    }

    #[test]
    fn brake_slows_down() {
        let mut m = model();
        m.set_velocity(Vec3::new(0.0, 10.0, 0.0));
        m.step(Pose::IDENTITY, &FlightAxes::default().with(Axis::Brake, 1.0), 0.5);
        assert!(m.velocity().y < 10.0 && m.velocity().y > 0.0);
    }

    #[test]
    fn yaw_input_is_smoothed() {
        let mut m = model();
        let axes = FlightAxes::default().with(Axis::Yaw, 1.0);
        m.step(Pose::IDENTITY, &axes, 0.05);
        let (yaw, _, _) = m.rates();
        assert!(yaw > 0.0 && yaw < 1.0, "yaw = {yaw}");
    }

    #[test]
    fn positive_yaw_turns_right() {
        let mut m = model();
        let axes = FlightAxes::default().with(Axis::Yaw, 1.0);
        let mut pose = Pose::IDENTITY;
        for _ in 0..30 {
            pose = m.step(pose, &axes, 0.05);
        }
        let f = pose.forward();
        assert!(f.x > 0.1, "forward = {f}");
        assert!((pose.rotation.length() - 1.0).abs() < 1e-4);
    }
}
