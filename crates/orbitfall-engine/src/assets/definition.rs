//! Declarative scene descriptions.
//!
//! Produced by external tooling as JSON. The header (id, anchor model, flags)
//! must be valid for the scene to load at all; list entries are parsed one by
//! one and a malformed entry is skipped with a warning instead of failing the
//! whole scene.

use glam::{EulerRot, Quat, Vec3};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::api::error::DefinitionError;
use crate::api::types::{ModelId, Pose, SceneId};

fn unit_z() -> Vec3 {
    Vec3::Z
}

fn default_teleport_radius() -> f32 {
    2.0
}

fn default_exit_altitude() -> f32 {
    1500.0
}

/// Circular orbit around a pivot, angular velocity in degrees per second.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrbitDefinition {
    /// Pivot, relative to the scene origin.
    pub pivot: Vec3,
    pub angular_velocity: f32,
    #[serde(default = "unit_z")]
    pub axis: Vec3,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrbitalBodyDefinition {
    pub model: ModelId,
    pub name: String,
    /// Offset from the scene origin.
    pub offset: Vec3,
    /// Self-rotation in degrees per second.
    #[serde(default)]
    pub rotation_speed: f32,
    #[serde(default = "unit_z")]
    pub spin_axis: Vec3,
    #[serde(default)]
    pub orbit: Option<OrbitDefinition>,
    #[serde(default)]
    pub is_wormhole: bool,
    /// Capture radius for wormholes, trigger radius otherwise. Zero disables.
    #[serde(default)]
    pub exit_radius: f32,
    #[serde(default)]
    pub next_scene: Option<SceneId>,
    #[serde(default)]
    pub next_pose: Option<Pose>,
    #[serde(default)]
    pub mineable: bool,
    /// Probe radius for mining / docking.
    #[serde(default)]
    pub radius: f32,
}

impl OrbitalBodyDefinition {
    fn validate(&self) -> Result<(), String> {
        if self.model.is_empty() {
            return Err("empty model".into());
        }
        if self.name.trim().is_empty() {
            return Err("empty name".into());
        }
        if !self.offset.is_finite() || !self.rotation_speed.is_finite() {
            return Err(format!("body `{}` has non-finite values", self.name));
        }
        if self.exit_radius < 0.0 || self.radius < 0.0 {
            return Err(format!("body `{}` has a negative radius", self.name));
        }
        if self.is_wormhole && (self.exit_radius <= 0.0 || self.next_scene.is_none()) {
            return Err(format!(
                "wormhole `{}` needs an exit radius and a destination",
                self.name
            ));
        }
        if let Some(orbit) = &self.orbit {
            if !orbit.pivot.is_finite() || !orbit.angular_velocity.is_finite() {
                return Err(format!("body `{}` has a non-finite orbit", self.name));
            }
        }
        Ok(())
    }

    /// Whether reaching `exit_radius` sends the player somewhere.
    pub fn has_exit(&self) -> bool {
        self.exit_radius > 0.0 && self.next_scene.is_some()
    }
}

/// Objects rigidly locked to the anchor (backdrop planets, nebulae).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttachedOrbitalDefinition {
    pub model: ModelId,
    #[serde(default)]
    pub name: String,
    pub offset: Vec3,
    /// Euler angles in degrees (Z, X, Y order).
    #[serde(default)]
    pub rotation: Vec3,
}

impl AttachedOrbitalDefinition {
    fn validate(&self) -> Result<(), String> {
        if self.model.is_empty() {
            return Err("empty model".into());
        }
        if !self.offset.is_finite() || !self.rotation.is_finite() {
            return Err(format!("attached `{}` has non-finite values", self.name));
        }
        Ok(())
    }

    pub fn orientation(&self) -> Quat {
        let r = self.rotation * (std::f32::consts::PI / 180.0);
        Quat::from_euler(EulerRot::ZXY, r.z, r.x, r.y)
    }
}

/// A named trigger volume that leaves the scene without a visible body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneLinkDefinition {
    pub name: String,
    pub offset: Vec3,
    pub radius: f32,
    pub next_scene: SceneId,
    #[serde(default)]
    pub next_pose: Option<Pose>,
}

impl SceneLinkDefinition {
    fn validate(&self) -> Result<(), String> {
        if self.radius <= 0.0 || !self.offset.is_finite() {
            return Err(format!("link `{}` needs a finite offset and positive radius", self.name));
        }
        Ok(())
    }
}

/// Paired points for short-range relocation. Works in both directions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeleportPointDefinition {
    pub name: String,
    pub start: Vec3,
    pub end: Vec3,
    #[serde(default = "default_teleport_radius")]
    pub radius: f32,
}

impl TeleportPointDefinition {
    fn validate(&self) -> Result<(), String> {
        if self.radius <= 0.0 || !self.start.is_finite() || !self.end.is_finite() {
            return Err(format!("teleport `{}` is degenerate", self.name));
        }
        if self.start.distance(self.end) <= self.radius * 2.0 {
            return Err(format!("teleport `{}` endpoints overlap", self.name));
        }
        Ok(())
    }
}

/// An enterable sub-area (interior / map section) inside the scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteriorDefinition {
    pub id: String,
    pub offset: Vec3,
    pub radius: f32,
    /// Enclosing interior for nested areas.
    #[serde(default)]
    pub parent: Option<String>,
}

impl InteriorDefinition {
    fn validate(&self) -> Result<(), String> {
        if self.id.trim().is_empty() {
            return Err("empty interior id".into());
        }
        if self.radius <= 0.0 || !self.offset.is_finite() {
            return Err(format!("interior `{}` needs a finite offset and positive radius", self.id));
        }
        Ok(())
    }
}

/// Ground tiles for surface scenes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerrainDefinition {
    pub tile_model: ModelId,
    /// Overrides the configured tile size.
    #[serde(default)]
    pub tile_size: Option<f32>,
    #[serde(default)]
    pub ground_height: f32,
}

/// Immutable description of one scene.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneDefinition {
    pub id: SceneId,
    pub anchor_model: ModelId,
    pub bodies: Vec<OrbitalBodyDefinition>,
    pub attached: Vec<AttachedOrbitalDefinition>,
    pub links: Vec<SceneLinkDefinition>,
    pub teleports: Vec<TeleportPointDefinition>,
    pub interiors: Vec<InteriorDefinition>,
    pub is_surface: bool,
    pub uses_gravity: bool,
    pub gravity_level: f32,
    pub next_scene_off_surface: Option<SceneId>,
    /// Height above the surface origin at which `next_scene_off_surface` fires.
    pub surface_exit_altitude: f32,
    /// Where the player lands when an exit names no pose.
    pub default_entry: Option<Pose>,
    /// Scene origin override; otherwise surface scenes use the world origin and
    /// space scenes the configured space origin.
    pub origin: Option<Vec3>,
    pub terrain: Option<TerrainDefinition>,
}

/// Header fields are typed; list entries stay raw until validated one by one.
#[derive(Deserialize)]
struct RawSceneDefinition {
    #[serde(default)]
    id: Option<SceneId>,
    #[serde(default)]
    anchor_model: Option<ModelId>,
    #[serde(default)]
    bodies: Vec<serde_json::Value>,
    #[serde(default)]
    attached: Vec<serde_json::Value>,
    #[serde(default)]
    links: Vec<serde_json::Value>,
    #[serde(default)]
    teleports: Vec<serde_json::Value>,
    #[serde(default)]
    interiors: Vec<serde_json::Value>,
    #[serde(default)]
    is_surface: bool,
    #[serde(default)]
    uses_gravity: bool,
    #[serde(default)]
    gravity_level: f32,
    #[serde(default)]
    next_scene_off_surface: Option<SceneId>,
    #[serde(default = "default_exit_altitude")]
    surface_exit_altitude: f32,
    #[serde(default)]
    default_entry: Option<Pose>,
    #[serde(default)]
    origin: Option<Vec3>,
    #[serde(default)]
    terrain: Option<TerrainDefinition>,
}

fn parse_entries<T, F>(scene: &SceneId, kind: &str, raw: Vec<serde_json::Value>, validate: F) -> Vec<T>
where
    T: DeserializeOwned,
    F: Fn(&T) -> Result<(), String>,
{
    let mut out = Vec::with_capacity(raw.len());
    for (index, value) in raw.into_iter().enumerate() {
        match serde_json::from_value::<T>(value) {
            Ok(entry) => match validate(&entry) {
                Ok(()) => out.push(entry),
                Err(reason) => log::warn!("{scene}: skipping {kind}[{index}]: {reason}"),
            },
            Err(err) => log::warn!("{scene}: skipping malformed {kind}[{index}]: {err}"),
        }
    }
    out
}

impl SceneDefinition {
    /// Parse a scene description from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, DefinitionError> {
        let raw: RawSceneDefinition = serde_json::from_str(json)?;

        let id = raw
            .id
            .filter(|id| !id.as_str().trim().is_empty())
            .ok_or(DefinitionError::MissingField("id"))?;
        let anchor_model = raw
            .anchor_model
            .filter(|m| !m.is_empty())
            .ok_or(DefinitionError::MissingField("anchor_model"))?;
        if !raw.gravity_level.is_finite() || raw.gravity_level < 0.0 {
            return Err(DefinitionError::Invalid(format!(
                "gravity_level {} must be a non-negative number",
                raw.gravity_level
            )));
        }
        if let Some(terrain) = &raw.terrain {
            if terrain.tile_model.is_empty() || terrain.tile_size.is_some_and(|s| s <= 0.0) {
                return Err(DefinitionError::Invalid("terrain needs a tile model and positive size".into()));
            }
        }

        let bodies = parse_entries(&id, "bodies", raw.bodies, OrbitalBodyDefinition::validate);
        let attached = parse_entries(&id, "attached", raw.attached, AttachedOrbitalDefinition::validate);
        let links = parse_entries(&id, "links", raw.links, SceneLinkDefinition::validate);
        let teleports = parse_entries(&id, "teleports", raw.teleports, TeleportPointDefinition::validate);
        let interiors = parse_entries(&id, "interiors", raw.interiors, InteriorDefinition::validate);

        Ok(Self {
            id,
            anchor_model,
            bodies,
            attached,
            links,
            teleports,
            interiors,
            is_surface: raw.is_surface,
            uses_gravity: raw.uses_gravity,
            gravity_level: raw.gravity_level,
            next_scene_off_surface: raw.next_scene_off_surface,
            surface_exit_altitude: raw.surface_exit_altitude,
            default_entry: raw.default_entry,
            origin: raw.origin,
            terrain: raw.terrain,
        })
    }

    /// Minimal definition with just an anchor; handy for hosts building scenes in code.
    pub fn new(id: impl Into<String>, anchor_model: impl Into<String>) -> Self {
        Self {
            id: SceneId::new(id),
            anchor_model: ModelId::new(anchor_model),
            bodies: Vec::new(),
            attached: Vec::new(),
            links: Vec::new(),
            teleports: Vec::new(),
            interiors: Vec::new(),
            is_surface: false,
            uses_gravity: false,
            gravity_level: 0.0,
            next_scene_off_surface: None,
            surface_exit_altitude: default_exit_altitude(),
            default_entry: None,
            origin: None,
            terrain: None,
        }
    }

    /// Every model the scene wants, anchor first.
    pub fn models(&self) -> Vec<ModelId> {
        let mut models = vec![self.anchor_model.clone()];
        for m in self
            .bodies
            .iter()
            .map(|b| &b.model)
            .chain(self.attached.iter().map(|a| &a.model))
            .chain(self.terrain.iter().map(|t| &t.tile_model))
        {
            if !models.contains(m) {
                models.push(m.clone());
            }
        }
        models
    }

    /// Gravity the host should apply while this scene is active.
    pub fn gravity(&self) -> Option<f32> {
        self.uses_gravity.then_some(self.gravity_level)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORBIT_SCENE: &str = r#"{
        "id": "earth_orbit",
        "anchor_model": "skydome",
        "bodies": [
            { "model": "moon", "name": "Moon", "offset": [400.0, 0.0, 0.0],
              "rotation_speed": 2.0,
              "orbit": { "pivot": [0.0, 0.0, 0.0], "angular_velocity": 1.5 } },
            { "model": "wormhole", "name": "Rift", "offset": [0.0, 900.0, 0.0],
              "is_wormhole": true, "exit_radius": 10.0, "next_scene": "deep_space" },
            { "model": "wormhole", "name": "Broken", "offset": [0.0, 0.0, 0.0], "is_wormhole": true },
            { "name": "NoModel", "offset": [1.0, 2.0, 3.0] },
            "not even an object"
        ],
        "links": [
            { "name": "station", "offset": [0.0, -50.0, 0.0], "radius": 8.0, "next_scene": "station_interior" }
        ],
        "teleports": [
            { "name": "lift", "start": [0.0, 0.0, 0.0], "end": [0.0, 0.0, 30.0] }
        ]
    }"#;

    #[test]
    fn parses_valid_entries_and_skips_broken_ones() {
        let def = SceneDefinition::from_json(ORBIT_SCENE).unwrap();
        assert_eq!(def.id, SceneId::new("earth_orbit"));
        let names: Vec<_> = def.bodies.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["Moon", "Rift"]);
        assert_eq!(def.links.len(), 1);
        assert_eq!(def.teleports[0].radius, 2.0);
        assert_eq!(def.surface_exit_altitude, 1500.0);
        assert!(!def.is_surface);
    }

    #[test]
    fn missing_anchor_is_an_error() {
        let err = SceneDefinition::from_json(r#"{ "id": "x", "bodies": [] }"#).unwrap_err();
        assert!(matches!(err, DefinitionError::MissingField("anchor_model")));
    }

    #[test]
    fn corrupt_json_is_an_error() {
        let err = SceneDefinition::from_json("{ \"id\": ").unwrap_err();
        assert!(matches!(err, DefinitionError::Json(_)));
    }

    #[test]
    fn negative_gravity_is_rejected() {
        let err = SceneDefinition::from_json(
            r#"{ "id": "x", "anchor_model": "dome", "uses_gravity": true, "gravity_level": -2.0 }"#,
        )
        .unwrap_err();
        assert!(matches!(err, DefinitionError::Invalid(_)));
    }

    #[test]
    fn models_are_deduplicated_anchor_first() {
        let def = SceneDefinition::from_json(ORBIT_SCENE).unwrap();
        let models = def.models();
        assert_eq!(models[0], ModelId::new("skydome"));
        assert_eq!(models.len(), 3);
    }

    #[test]
    fn overlapping_teleport_is_skipped() {
        let def = SceneDefinition::from_json(
            r#"{ "id": "x", "anchor_model": "dome",
                 "teleports": [ { "name": "tiny", "start": [0,0,0], "end": [1,0,0] } ] }"#,
        )
        .unwrap();
        assert!(def.teleports.is_empty());
    }

    #[test]
    fn gravity_only_when_enabled() {
        let mut def = SceneDefinition::new("x", "dome");
        def.gravity_level = 0.3;
        assert_eq!(def.gravity(), None);
        def.uses_gravity = true;
        assert_eq!(def.gravity(), Some(0.3));
    }
}
