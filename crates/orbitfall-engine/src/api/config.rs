use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Engine configuration. Every section falls back to its defaults, so a host
/// only needs to send the values it wants to change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Fixed timestep in seconds (default: 1/60).
    pub fixed_dt: f32,
    /// How long a scene load may wait for its required models, in seconds.
    pub asset_timeout: f32,
    /// World position of the scene origin for non-surface scenes.
    pub space_origin: Vec3,
    /// Maximum number of events exported per frame (default: 64).
    pub max_events: usize,
    /// Maximum number of body poses exported per frame (default: 128).
    pub max_bodies: usize,
    /// Flight model while piloting a vehicle.
    pub flight: FlightTuning,
    /// Flight model of the drifting proxy.
    pub drift: FlightTuning,
    pub locomotion: LocomotionTuning,
    pub wormhole: WormholeTuning,
    pub terrain: TerrainTuning,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fixed_dt: 1.0 / 60.0,
            asset_timeout: 10.0,
            space_origin: Vec3::new(0.0, 0.0, 2500.0),
            max_events: 64,
            max_bodies: 128,
            flight: FlightTuning::piloting(),
            drift: FlightTuning::drifting(),
            locomotion: LocomotionTuning::default(),
            wormhole: WormholeTuning::default(),
            terrain: TerrainTuning::default(),
        }
    }
}

impl EngineConfig {
    /// Parse a (possibly partial) configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Six-degree-of-freedom flight tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlightTuning {
    /// Speed at full throttle, units/s.
    pub max_speed: f32,
    /// Turn rates at full deflection, rad/s.
    pub yaw_rate: f32,
    pub pitch_rate: f32,
    pub roll_rate: f32,
    /// How fast smoothed axes approach raw input, 1/s.
    pub input_response: f32,
    /// How fast velocity approaches the thrust target, 1/s.
    pub velocity_response: f32,
    /// How fast braking bleeds velocity, 1/s.
    pub brake_response: f32,
}

impl FlightTuning {
    pub fn piloting() -> Self {
        Self {
            max_speed: 120.0,
            yaw_rate: 1.2,
            pitch_rate: 1.0,
            roll_rate: 1.6,
            input_response: 4.0,
            velocity_response: 1.5,
            brake_response: 3.0,
        }
    }

    pub fn drifting() -> Self {
        Self {
            max_speed: 6.0,
            yaw_rate: 0.8,
            pitch_rate: 0.7,
            roll_rate: 0.9,
            input_response: 3.0,
            velocity_response: 1.0,
            brake_response: 2.0,
        }
    }
}

impl Default for FlightTuning {
    fn default() -> Self {
        Self::piloting()
    }
}

/// Distances, speeds and timeouts of the drifting sub-interactions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocomotionTuning {
    /// Door point in vehicle-local space.
    pub door_offset: Vec3,
    /// Distance to the door point at which re-entry may start.
    pub reentry_radius: f32,
    /// Distance at which the seek snaps the player into the seat.
    pub attach_distance: f32,
    pub seek_speed: f32,
    pub seek_timeout: f32,
    /// Length of the forward interaction probe.
    pub probe_range: f32,
    /// Stand-off distance from the docking surface.
    pub dock_distance: f32,
    pub dock_speed: f32,
    pub dock_tolerance: f32,
    pub approach_timeout: f32,
    /// How long the mining/repair animation holds, seconds.
    pub task_duration: f32,
    /// Synthetic capsule of the drifting body.
    pub capsule_radius: f32,
    pub capsule_half_height: f32,
    /// Axis magnitude above which input counts as an override.
    pub override_deadzone: f32,
}

impl Default for LocomotionTuning {
    fn default() -> Self {
        Self {
            door_offset: Vec3::new(-1.6, 0.0, 0.0),
            reentry_radius: 4.0,
            attach_distance: 0.6,
            seek_speed: 3.0,
            seek_timeout: 6.0,
            probe_range: 6.0,
            dock_distance: 1.2,
            dock_speed: 2.5,
            dock_tolerance: 0.25,
            approach_timeout: 8.0,
            task_duration: 5.0,
            capsule_radius: 0.4,
            capsule_half_height: 0.9,
            override_deadzone: 0.15,
        }
    }
}

/// Wormhole regimes are multiples of each body's capture radius.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WormholeTuning {
    pub pull_ratio: f32,
    pub escape_ratio: f32,
    /// Length of the scripted spiral before the exit is forced, seconds.
    pub pull_duration: f32,
    /// Angular increment of the spiral target, rad/s.
    pub spiral_rate: f32,
    /// Fraction of the remaining radius the spiral target closes per second.
    pub spiral_inward: f32,
    pub spiral_speed: f32,
    /// Speed of the straight pull between pull and escape radius.
    pub approach_speed: f32,
    /// Rate at which the feedback effect relaxes to ambient, 1/s.
    pub feedback_relax: f32,
}

impl Default for WormholeTuning {
    fn default() -> Self {
        Self {
            pull_ratio: 15.0,
            escape_ratio: 20.0,
            pull_duration: 7.0,
            spiral_rate: 0.9,
            spiral_inward: 0.12,
            spiral_speed: 60.0,
            approach_speed: 25.0,
            feedback_relax: 1.5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TerrainTuning {
    pub tile_size: f32,
    /// Tiles kept on each side of the player's tile.
    pub ring: u32,
    /// Horizontal distance the player must move before the window is re-evaluated.
    pub move_threshold: f32,
}

impl Default for TerrainTuning {
    fn default() -> Self {
        Self {
            tile_size: 500.0,
            ring: 1,
            move_threshold: 500.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = EngineConfig::from_json(r#"{ "asset_timeout": 3.0, "wormhole": { "pull_duration": 4.0 } }"#)
            .unwrap();
        assert_eq!(config.asset_timeout, 3.0);
        assert_eq!(config.wormhole.pull_duration, 4.0);
        assert_eq!(config.wormhole.pull_ratio, 15.0);
        assert_eq!(config.locomotion.task_duration, 5.0);
        assert_eq!(config.fixed_dt, 1.0 / 60.0);
    }

    #[test]
    fn drifting_is_slower_than_piloting() {
        let config = EngineConfig::default();
        assert!(config.drift.max_speed < config.flight.max_speed);
        assert!(config.drift.yaw_rate < config.flight.yaw_rate);
    }
}
