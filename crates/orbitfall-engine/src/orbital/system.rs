use std::collections::HashSet;

use glam::{Quat, Vec3};

use crate::api::capability::Handle;
use crate::api::host::{HostWorld, SpawnDesc};
use crate::api::types::{EntityId, ModelId, Pose};
use crate::assets::definition::SceneDefinition;
use crate::orbital::body::OrbitalBody;
use crate::scene::ledger::MinedLedger;

pub const ANCHOR_TAG: &str = "orbital_anchor";
pub const ATTACHED_TAG: &str = "orbital_attached";

/// Object locked to the anchor.
#[derive(Debug, Clone)]
struct AttachedObject {
    entity: EntityId,
    offset: Vec3,
    rotation: Quat,
}

/// The anchor (sky dome), the objects locked to it, and the moving bodies of
/// one scene.
///
/// Bodies live at fixed scene coordinates. The anchor follows the player's
/// reference origin every tick, so the backdrop never falls behind.
#[derive(Debug, Default)]
pub struct OrbitalSystem {
    anchor: Option<EntityId>,
    attached: Vec<AttachedObject>,
    bodies: Vec<OrbitalBody>,
    torn_down: bool,
}

impl OrbitalSystem {
    /// Spawn everything `def` names whose model is in `ready`.
    ///
    /// Bodies whose asset never became ready, and bodies the ledger records as
    /// mined, are left out entirely.
    pub fn build(
        world: &mut dyn HostWorld,
        def: &SceneDefinition,
        origin: Vec3,
        reference: Vec3,
        ready: &HashSet<ModelId>,
        ledger: &MinedLedger,
    ) -> Self {
        let anchor = if ready.contains(&def.anchor_model) {
            Some(world.spawn(
                SpawnDesc::model(def.anchor_model.clone(), Pose::at(reference)).with_tag(ANCHOR_TAG),
            ))
        } else {
            log::warn!("{}: anchor `{}` not ready, scene has no backdrop", def.id, def.anchor_model);
            None
        };

        let mut attached = Vec::with_capacity(def.attached.len());
        for a in &def.attached {
            if !ready.contains(&a.model) {
                log::warn!("{}: skipping attached `{}`, model `{}` not ready", def.id, a.name, a.model);
                continue;
            }
            let rotation = a.orientation();
            let entity = world.spawn(
                SpawnDesc::model(a.model.clone(), Pose::new(reference + a.offset, rotation)).with_tag(ATTACHED_TAG),
            );
            attached.push(AttachedObject {
                entity,
                offset: a.offset,
                rotation,
            });
        }

        let mut bodies = Vec::with_capacity(def.bodies.len());
        for b in &def.bodies {
            if ledger.is_mined(&def.id, &b.name) {
                log::debug!("{}: `{}` already mined", def.id, b.name);
                continue;
            }
            if !ready.contains(&b.model) {
                log::warn!("{}: skipping body `{}`, model `{}` not ready", def.id, b.name, b.model);
                continue;
            }
            bodies.push(OrbitalBody::spawn(world, &def.id, b, origin));
        }

        log::debug!(
            "{}: orbital system built with {} bodies, {} attached",
            def.id,
            bodies.len(),
            attached.len()
        );

        Self {
            anchor,
            attached,
            bodies,
            torn_down: false,
        }
    }

    /// Move every body by `dt` and re-center the anchor on `reference`.
    pub fn advance(&mut self, world: &mut dyn HostWorld, dt: f32, reference: Vec3) {
        if self.torn_down {
            return;
        }
        if let Some(anchor) = self.anchor {
            world.set_pose(anchor, Pose::at(reference));
        }
        for a in &self.attached {
            world.set_pose(a.entity, Pose::new(reference + a.offset, a.rotation));
        }
        for body in self.bodies.iter_mut() {
            body.step(dt);
            if !body.sync(world) {
                log::debug!("body `{}` has no live entity", body.name);
            }
        }
    }

    pub fn bodies(&self) -> &[OrbitalBody] {
        &self.bodies
    }

    pub fn body(&self, name: &str) -> Option<&OrbitalBody> {
        self.bodies.iter().find(|b| b.name == name)
    }

    pub fn body_by_entity(&self, entity: EntityId) -> Option<&OrbitalBody> {
        self.bodies.iter().find(|b| b.entity() == entity)
    }

    pub fn wormholes(&self) -> impl Iterator<Item = &OrbitalBody> {
        self.bodies.iter().filter(|b| b.is_wormhole())
    }

    pub fn anchor(&self) -> Option<EntityId> {
        self.anchor
    }

    /// Drop the body backed by `entity` and despawn it.
    pub fn remove_entity(&mut self, world: &mut dyn HostWorld, entity: EntityId) -> Option<OrbitalBody> {
        let idx = self.bodies.iter().position(|b| b.entity() == entity)?;
        let body = self.bodies.remove(idx);
        world.despawn(entity);
        Some(body)
    }

    /// Entities this system currently owns.
    pub fn entity_count(&self) -> usize {
        self.anchor.iter().count() + self.attached.len() + self.bodies.len()
    }

    /// Despawn everything. Safe to call twice; the second call does nothing.
    pub fn teardown(&mut self, world: &mut dyn HostWorld) -> usize {
        if self.torn_down {
            return 0;
        }
        self.torn_down = true;
        let mut despawned = 0;
        for body in self.bodies.drain(..) {
            despawned += world.despawn(body.entity()) as usize;
        }
        for a in self.attached.drain(..) {
            despawned += world.despawn(a.entity) as usize;
        }
        if let Some(anchor) = self.anchor.take() {
            despawned += world.despawn(anchor) as usize;
        }
        despawned
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::world::SimWorld;

    const SCENE: &str = r#"{
        "id": "belt",
        "anchor_model": "dome",
        "attached": [ { "model": "nebula", "offset": [0, 5000, 0] } ],
        "bodies": [
            { "model": "rock", "name": "rock_1", "offset": [10, 0, 0], "mineable": true, "radius": 2 },
            { "model": "rock", "name": "rock_2", "offset": [20, 0, 0], "mineable": true, "radius": 2 },
            { "model": "station", "name": "station", "offset": [0, 300, 0],
              "orbit": { "pivot": [0, 0, 0], "angular_velocity": 5 } }
        ]
    }"#;

    fn all_ready(def: &SceneDefinition) -> HashSet<ModelId> {
        def.models().into_iter().collect()
    }

    #[test]
    fn unready_and_mined_bodies_are_skipped() {
        let def = SceneDefinition::from_json(SCENE).unwrap();
        let mut world = SimWorld::new();
        let mut ready = all_ready(&def);
        ready.remove(&ModelId::new("station"));
        let mut ledger = MinedLedger::new();
        ledger.record("belt/rock_2");

        let system = OrbitalSystem::build(&mut world, &def, Vec3::ZERO, Vec3::ZERO, &ready, &ledger);
        let names: Vec<_> = system.bodies().iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["rock_1"]);
        assert_eq!(system.entity_count(), 3);
    }

    #[test]
    fn anchor_follows_reference() {
        let def = SceneDefinition::from_json(SCENE).unwrap();
        let mut world = SimWorld::new();
        let mut system =
            OrbitalSystem::build(&mut world, &def, Vec3::ZERO, Vec3::ZERO, &all_ready(&def), &MinedLedger::new());
        let player = Vec3::new(40.0, -12.0, 7.0);
        system.advance(&mut world, 0.016, player);

        let anchor = system.anchor().unwrap();
        assert_eq!(world.position(anchor), Some(player));
        let nebula = world.find_by_tag(ATTACHED_TAG).unwrap();
        assert_eq!(nebula.pos, player + Vec3::new(0.0, 5000.0, 0.0));
        // rocks stay at scene coordinates
        let rock = system.body("rock_1").unwrap();
        assert_eq!(world.position(rock.entity()), Some(Vec3::new(10.0, 0.0, 0.0)));
    }

    #[test]
    fn remove_entity_despawns_body() {
        let def = SceneDefinition::from_json(SCENE).unwrap();
        let mut world = SimWorld::new();
        let mut system =
            OrbitalSystem::build(&mut world, &def, Vec3::ZERO, Vec3::ZERO, &all_ready(&def), &MinedLedger::new());
        let rock = system.body("rock_1").unwrap().entity();
        let removed = system.remove_entity(&mut world, rock).unwrap();
        assert_eq!(removed.stable_id, "belt/rock_1");
        assert!(!world.exists(rock));
        assert!(system.remove_entity(&mut world, rock).is_none());
    }

    #[test]
    fn teardown_is_idempotent() {
        let def = SceneDefinition::from_json(SCENE).unwrap();
        let mut world = SimWorld::new();
        let mut system =
            OrbitalSystem::build(&mut world, &def, Vec3::ZERO, Vec3::ZERO, &all_ready(&def), &MinedLedger::new());
        assert_eq!(world.len(), 6);
        assert_eq!(system.teardown(&mut world), 5);
        assert_eq!(system.teardown(&mut world), 0);
        assert_eq!(world.len(), 1);
    }
}
