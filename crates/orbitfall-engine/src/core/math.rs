// core/math.rs
//
// Small vector/quaternion helpers shared by the orbital and locomotion code.
// Pure functions, no host access.

use std::f32::consts::TAU;

use glam::{Mat3, Quat, Vec3};

/// Rotate `point` about the line through `pivot` along `axis` by `angle` radians.
pub fn rotate_about_pivot(point: Vec3, pivot: Vec3, axis: Vec3, angle: f32) -> Vec3 {
    let axis = axis.try_normalize().unwrap_or(Vec3::Z);
    pivot + Quat::from_axis_angle(axis, angle) * (point - pivot)
}

/// Wrap an angle into [0, 2π).
pub fn wrap_angle(angle: f32) -> f32 {
    let wrapped = angle.rem_euclid(TAU);
    // rem_euclid can return TAU itself for tiny negative inputs
    if wrapped >= TAU {
        0.0
    } else {
        wrapped
    }
}

/// Smallest signed difference between two angles, in (-π, π].
pub fn angle_delta(a: f32, b: f32) -> f32 {
    let d = wrap_angle(a - b);
    if d > std::f32::consts::PI {
        d - TAU
    } else {
        d
    }
}

/// Fraction of the gap closed by an exponential approach at `rate` over `dt`.
/// Frame-rate independent: two half steps close the same gap as one full step.
#[inline]
pub fn approach_factor(rate: f32, dt: f32) -> f32 {
    if rate <= 0.0 || dt <= 0.0 {
        return 0.0;
    }
    1.0 - (-rate * dt).exp()
}

/// Exponentially approach `target` from `current`.
#[inline]
pub fn smooth_toward(current: f32, target: f32, rate: f32, dt: f32) -> f32 {
    current + (target - current) * approach_factor(rate, dt)
}

/// Blend a velocity toward a target velocity instead of setting it outright.
#[inline]
pub fn blend_toward(current: Vec3, target: Vec3, rate: f32, dt: f32) -> Vec3 {
    current + (target - current) * approach_factor(rate, dt)
}

/// Move `current` toward `target` by at most `max_step`.
pub fn move_toward(current: Vec3, target: Vec3, max_step: f32) -> Vec3 {
    let delta = target - current;
    let dist = delta.length();
    if dist <= max_step || dist < 1e-6 {
        target
    } else {
        current + delta / dist * max_step
    }
}

/// Orientation whose forward (+Y) axis points along `forward`, keeping `up` as
/// close to +Z as the forward direction allows.
pub fn look_rotation(forward: Vec3, up: Vec3) -> Quat {
    let Some(fwd) = forward.try_normalize() else {
        return Quat::IDENTITY;
    };
    let mut right = fwd.cross(up);
    if right.length_squared() < 1e-8 {
        // forward parallel to up: pick any perpendicular
        right = fwd.any_orthonormal_vector();
    }
    let right = right.normalize();
    let true_up = right.cross(fwd);
    Quat::from_mat3(&Mat3::from_cols(right, fwd, true_up)).normalize()
}

/// Remove the component of `velocity` pointing into a surface with `normal`.
pub fn clip_velocity(velocity: Vec3, normal: Vec3) -> Vec3 {
    let into = velocity.dot(normal);
    if into < 0.0 {
        velocity - normal * into
    } else {
        velocity
    }
}

/// Usable world position: finite and not absurdly far out.
pub fn is_valid_position(p: Vec3) -> bool {
    p.is_finite() && p.length_squared() < 1.0e16
}
