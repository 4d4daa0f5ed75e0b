// scene/scene.rs
//
// One loaded location. Each update runs, in order:
//
//   orbital system -> locomotion -> wormholes -> terrain -> triggers
//
// Components only push into the outbox; the manager reacts once the pass
// is over.

use std::collections::HashSet;

use glam::Vec3;

use crate::api::capability::Handle;
use crate::api::config::EngineConfig;
use crate::api::context::FrameContext;
use crate::api::host::HostWorld;
use crate::api::types::{ModelId, Pose, SceneId};
use crate::assets::definition::{SceneDefinition, TeleportPointDefinition};
use crate::locomotion::controller::{LocomotionController, LocomotionEvent};
use crate::locomotion::proxy::Vehicle;
use crate::locomotion::state::LocomotionState;
use crate::orbital::system::OrbitalSystem;
use crate::orbital::wormhole::WormholeAttractor;
use crate::scene::ledger::MinedLedger;
use crate::scene::outbox::{ExitRequest, Signal};
use crate::scene::subarea::SubAreaStack;
use crate::terrain::tiler::TerrainTiler;

/// Smallest feedback change worth telling the host about.
const FEEDBACK_STEP: f32 = 0.05;

/// A teleport pair plus its re-arm latch.
#[derive(Debug, Clone)]
struct Teleport {
    name: String,
    start: Vec3,
    end: Vec3,
    radius: f32,
    armed: bool,
}

impl Teleport {
    fn new(def: &TeleportPointDefinition, origin: Vec3) -> Self {
        Self {
            name: def.name.clone(),
            start: origin + def.start,
            end: origin + def.end,
            radius: def.radius,
            armed: true,
        }
    }

    /// Where to send a player standing at `p`, if anywhere.
    fn destination(&mut self, p: Vec3) -> Option<Vec3> {
        let at_start = p.distance(self.start) <= self.radius;
        let at_end = p.distance(self.end) <= self.radius;
        if !self.armed {
            // re-arm only once the player has stepped off both pads
            self.armed = !at_start && !at_end;
            return None;
        }
        let to = if at_start {
            self.end
        } else if at_end {
            self.start
        } else {
            return None;
        };
        self.armed = false;
        Some(to)
    }
}

pub struct Scene {
    definition: SceneDefinition,
    origin: Vec3,
    orbital: OrbitalSystem,
    locomotion: LocomotionController,
    wormhole: WormholeAttractor,
    tiler: Option<TerrainTiler>,
    teleports: Vec<Teleport>,
    sub_area: SubAreaStack,
    reported_feedback: f32,
    started: bool,
    deleted: bool,
}

impl Scene {
    /// Spawn the scene's objects. Models missing from `ready` are left out.
    ///
    /// `carry` is the vehicle the player arrived in, so re-entry and repair
    /// keep working across the transition.
    pub fn build(
        world: &mut dyn HostWorld,
        definition: SceneDefinition,
        config: &EngineConfig,
        ready: &HashSet<ModelId>,
        ledger: &MinedLedger,
        carry: Option<Vehicle>,
    ) -> Self {
        let origin = match definition.origin {
            Some(origin) => origin,
            None if definition.is_surface => Vec3::ZERO,
            None => config.space_origin,
        };
        let player = world.player();
        let reference = world.position(player).unwrap_or(origin);
        let orbital = OrbitalSystem::build(world, &definition, origin, reference, ready, ledger);

        let mut locomotion = LocomotionController::new(config);
        locomotion.set_last_vehicle(carry.filter(|v| v.is_alive(world)));

        let tiler = match (&definition.terrain, definition.is_surface) {
            (Some(terrain), true) if ready.contains(&terrain.tile_model) => {
                Some(TerrainTiler::new(terrain, &config.terrain, origin))
            }
            (Some(terrain), true) => {
                log::warn!("{}: tile model `{}` not ready, no terrain", definition.id, terrain.tile_model);
                None
            }
            (Some(_), false) => {
                log::debug!("{}: terrain ignored outside surface scenes", definition.id);
                None
            }
            (None, _) => None,
        };

        let teleports = definition
            .teleports
            .iter()
            .map(|t| Teleport::new(t, origin))
            .collect();

        Self {
            origin,
            orbital,
            locomotion,
            wormhole: WormholeAttractor::new(config.wormhole),
            tiler,
            teleports,
            sub_area: SubAreaStack::new(),
            reported_feedback: 0.0,
            started: false,
            deleted: false,
            definition,
        }
    }

    /// Apply the scene's host settings. Idempotent.
    pub fn start(&mut self, world: &mut dyn HostWorld) {
        if self.started || self.deleted {
            return;
        }
        self.started = true;
        world.set_gravity(self.definition.gravity());
        log::info!(
            "scene `{}` started ({} entities, surface: {})",
            self.definition.id,
            self.entity_count(),
            self.definition.is_surface
        );
    }

    pub fn update(&mut self, ctx: &mut FrameContext<'_>, ledger: &mut MinedLedger) {
        if self.deleted {
            return;
        }
        let surface = self.definition.is_surface;
        let player = ctx.world.player();
        let reference = ctx.world.position(player).unwrap_or(self.origin);

        self.orbital.advance(ctx.world, ctx.dt, reference);

        let events = self.locomotion.update(ctx, surface);
        for event in events {
            self.on_locomotion(ctx, ledger, event);
        }

        let position = ctx.world.position(player).unwrap_or(reference);

        if !surface {
            self.update_wormholes(ctx, position);
        }

        if let Some(tiler) = self.tiler.as_mut() {
            tiler.update(ctx.world, position);
        }

        self.check_triggers(ctx, position);
    }

    fn on_locomotion(&mut self, ctx: &mut FrameContext<'_>, ledger: &mut MinedLedger, event: LocomotionEvent) {
        let signal = match event {
            LocomotionEvent::StateChanged { from, to } => Signal::LocomotionChanged { from, to },
            LocomotionEvent::ObjectMined(entity) => {
                let stable_id = self.orbital.remove_entity(ctx.world, entity).map(|body| {
                    ledger.record(body.stable_id.clone());
                    body.stable_id
                });
                log::info!("{}: mined {:?} ({:?})", self.definition.id, entity, stable_id);
                Signal::ObjectMined {
                    scene: self.definition.id.clone(),
                    entity,
                    stable_id,
                }
            }
            LocomotionEvent::VehicleRepaired(entity) => Signal::VehicleRepaired { entity },
            LocomotionEvent::TaskAborted { state, reason } => Signal::TaskAborted { state, reason },
        };
        ctx.outbox.push(signal);
    }

    fn update_wormholes(&mut self, ctx: &mut FrameContext<'_>, position: Vec3) {
        let outcome = self
            .wormhole
            .update(self.orbital.bodies(), position, ctx.dt, ctx.now);

        if let Some(velocity) = outcome.velocity {
            if matches!(
                self.locomotion.state(),
                LocomotionState::Piloting | LocomotionState::Drifting
            ) {
                self.locomotion.apply_external_velocity(velocity);
            }
        }
        if let Some(exit) = outcome.exit {
            ctx.outbox.request_exit(exit);
        }

        let feedback = self.wormhole.feedback();
        let settled = feedback == 0.0 && self.reported_feedback != 0.0;
        if settled || (feedback - self.reported_feedback).abs() >= FEEDBACK_STEP {
            self.reported_feedback = feedback;
            ctx.outbox.push(Signal::WormholeFeedback(feedback));
        }
    }

    fn check_triggers(&mut self, ctx: &mut FrameContext<'_>, position: Vec3) {
        let id = &self.definition.id;

        for body in self.orbital.bodies().iter().filter(|b| !b.is_wormhole()) {
            if let Some(exit) = body.exit() {
                if body.position().distance(position) <= exit.radius {
                    ctx.outbox
                        .request_exit(ExitRequest::new(exit.scene.clone(), exit.pose, body.name.clone()));
                }
            }
        }

        for link in &self.definition.links {
            if (self.origin + link.offset).distance(position) <= link.radius {
                ctx.outbox
                    .request_exit(ExitRequest::new(link.next_scene.clone(), link.next_pose, link.name.clone()));
            }
        }

        if self.definition.is_surface {
            if let Some(next) = &self.definition.next_scene_off_surface {
                if position.z - self.origin.z >= self.definition.surface_exit_altitude {
                    ctx.outbox
                        .request_exit(ExitRequest::new(next.clone(), None, format!("{id} surface")));
                }
            }
        }

        // nothing local matters once the player is on the way out
        if ctx.outbox.exit_pending() {
            return;
        }

        for teleport in self.teleports.iter_mut() {
            if let Some(to) = teleport.destination(position) {
                let rotation = ctx.world.orientation(ctx.world.player()).unwrap_or_default();
                if self.locomotion.relocate(ctx.world, Pose::new(to, rotation)) {
                    log::info!("{id}: teleport `{}` to {to}", teleport.name);
                    ctx.outbox.push(Signal::Teleported {
                        name: teleport.name.clone(),
                        to,
                    });
                }
                // one relocation per tick
                break;
            }
        }

        self.update_sub_area(ctx, position);
    }

    fn update_sub_area(&mut self, ctx: &mut FrameContext<'_>, position: Vec3) {
        let inside = |area: &str| {
            self.definition
                .interiors
                .iter()
                .find(|i| i.id == area)
                .is_some_and(|i| (self.origin + i.offset).distance(position) <= i.radius)
        };

        if let Some(current) = self.sub_area.current() {
            if !inside(current) {
                let left = self.sub_area.exit();
                log::debug!("{}: left sub-area {:?}", self.definition.id, left);
                ctx.outbox.push(Signal::SubAreaChanged {
                    area: self.sub_area.current().map(str::to_owned),
                    depth: self.sub_area.depth(),
                });
                return;
            }
        }

        if self.sub_area.depth() >= 2 {
            return;
        }
        let current = self.sub_area.current();
        let entered = self.definition.interiors.iter().find(|i| {
            i.parent.as_deref() == current
                && Some(i.id.as_str()) != current
                && (self.origin + i.offset).distance(position) <= i.radius
        });
        if let Some(interior) = entered {
            let area = interior.id.clone();
            if self.sub_area.enter(area.clone()) {
                log::debug!("{}: entered sub-area `{area}`", self.definition.id);
                ctx.outbox.push(Signal::SubAreaChanged {
                    area: Some(area),
                    depth: self.sub_area.depth(),
                });
            }
        }
    }

    /// Despawn everything the scene owns and restore host gravity.
    /// A second call does nothing and returns 0.
    pub fn delete(&mut self, world: &mut dyn HostWorld) -> usize {
        if self.deleted {
            log::debug!("scene `{}` already deleted", self.definition.id);
            return 0;
        }
        self.deleted = true;
        let mut despawned = self.locomotion.release(world);
        despawned += self.orbital.teardown(world);
        if let Some(tiler) = self.tiler.as_mut() {
            despawned += tiler.clear(world);
        }
        self.sub_area.clear();
        if self.started {
            world.set_gravity(None);
        }
        log::info!("scene `{}` deleted, {despawned} entities removed", self.definition.id);
        despawned
    }

    pub fn id(&self) -> &SceneId {
        &self.definition.id
    }

    pub fn definition(&self) -> &SceneDefinition {
        &self.definition
    }

    pub fn origin(&self) -> Vec3 {
        self.origin
    }

    pub fn orbital(&self) -> &OrbitalSystem {
        &self.orbital
    }

    pub fn locomotion(&self) -> &LocomotionController {
        &self.locomotion
    }

    pub fn locomotion_mut(&mut self) -> &mut LocomotionController {
        &mut self.locomotion
    }

    pub fn state(&self) -> LocomotionState {
        self.locomotion.state()
    }

    pub fn wormhole(&self) -> &WormholeAttractor {
        &self.wormhole
    }

    pub fn tiler(&self) -> Option<&TerrainTiler> {
        self.tiler.as_ref()
    }

    pub fn sub_area(&self) -> &SubAreaStack {
        &self.sub_area
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// Entities this scene spawned and still owns.
    pub fn entity_count(&self) -> usize {
        self.orbital.entity_count()
            + self.tiler.as_ref().map_or(0, TerrainTiler::len)
            + self.locomotion.proxy().is_some() as usize
    }

    /// Put the player at `pose` through whatever carries them.
    pub fn place_player(&mut self, world: &mut dyn HostWorld, pose: Pose) -> bool {
        self.locomotion.relocate(world, pose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::world::SimWorld;
    use crate::input::queue::FrameInput;
    use crate::orbital::body::BODY_TAG;
    use crate::scene::outbox::Outbox;
    use crate::terrain::tiler::TILE_TAG;

    const DT: f32 = 0.1;

    struct Rig {
        world: SimWorld,
        config: EngineConfig,
        outbox: Outbox,
        ledger: MinedLedger,
        scene: Scene,
        now: f64,
    }

    impl Rig {
        fn new(json: &str) -> Self {
            let config = EngineConfig::default();
            let def = SceneDefinition::from_json(json).unwrap();
            let ready: HashSet<ModelId> = def.models().into_iter().collect();
            let ledger = MinedLedger::new();
            let mut world = SimWorld::new();
            let mut scene = Scene::build(&mut world, def, &config, &ready, &ledger, None);
            scene.start(&mut world);
            Self {
                world,
                config,
                outbox: Outbox::new(),
                ledger,
                scene,
                now: 0.0,
            }
        }

        fn tick(&mut self) {
            self.now += DT as f64;
            let input = FrameInput::default();
            let mut ctx = FrameContext {
                world: &mut self.world,
                input: &input,
                outbox: &mut self.outbox,
                config: &self.config,
                dt: DT,
                now: self.now,
            };
            self.scene.update(&mut ctx, &mut self.ledger);
        }

        fn put_player(&mut self, at: Vec3) {
            self.scene.place_player(&mut self.world, Pose::at(at));
        }
    }

    const SPACE: &str = r#"{
        "id": "orbit",
        "anchor_model": "dome",
        "origin": [0, 0, 0],
        "bodies": [
            { "model": "moon", "name": "moon", "offset": [400, 0, 0],
              "exit_radius": 50, "next_scene": "moon_surface" },
            { "model": "rift", "name": "rift", "offset": [0, 5000, 0],
              "is_wormhole": true, "exit_radius": 10, "next_scene": "deep" }
        ],
        "links": [ { "name": "dock", "offset": [0, -100, 0], "radius": 5, "next_scene": "station" } ],
        "teleports": [ { "name": "lift", "start": [0, 30, 0], "end": [0, 30, 40], "radius": 2 } ],
        "interiors": [
            { "id": "hall", "offset": [0, 30, 0], "radius": 60 },
            { "id": "vault", "offset": [0, 30, 40], "radius": 5, "parent": "hall" }
        ]
    }"#;

    const SURFACE: &str = r#"{
        "id": "moon_surface",
        "anchor_model": "sky",
        "is_surface": true,
        "uses_gravity": true,
        "gravity_level": 0.16,
        "next_scene_off_surface": "orbit",
        "surface_exit_altitude": 300,
        "terrain": { "tile_model": "regolith" }
    }"#;

    #[test]
    fn space_scene_drifts_and_applies_no_gravity() {
        let mut rig = Rig::new(SPACE);
        rig.tick();
        assert_eq!(rig.scene.state(), LocomotionState::Drifting);
        assert_eq!(rig.world.gravity(), None);
        assert!(rig
            .outbox
            .iter()
            .any(|s| matches!(s, Signal::LocomotionChanged { to: LocomotionState::Drifting, .. })));
    }

    #[test]
    fn body_trigger_requests_exit() {
        let mut rig = Rig::new(SPACE);
        rig.tick();
        rig.put_player(Vec3::new(380.0, 0.0, 0.0));
        rig.tick();
        let exit = rig.outbox.take_exit().unwrap();
        assert_eq!(exit.scene, SceneId::new("moon_surface"));
        assert_eq!(exit.source, "moon");
    }

    #[test]
    fn link_requests_exit() {
        let mut rig = Rig::new(SPACE);
        rig.tick();
        rig.put_player(Vec3::new(0.0, -98.0, 0.0));
        rig.tick();
        assert_eq!(rig.outbox.take_exit().unwrap().scene, SceneId::new("station"));
    }

    #[test]
    fn wormhole_capture_requests_exit() {
        let mut rig = Rig::new(SPACE);
        rig.tick();
        rig.put_player(Vec3::new(0.0, 4995.0, 0.0));
        rig.tick();
        let exit = rig.outbox.take_exit().unwrap();
        assert_eq!(exit.scene, SceneId::new("deep"));
        assert!(rig.outbox.iter().any(|s| matches!(s, Signal::WormholeFeedback(f) if *f == 1.0)));
    }

    #[test]
    fn teleport_fires_once_until_rearmed() {
        let mut rig = Rig::new(SPACE);
        rig.tick();
        rig.put_player(Vec3::new(0.0, 30.0, 0.0));
        rig.tick();
        let p = rig.world.position(rig.world.player()).unwrap();
        assert!((p - Vec3::new(0.0, 30.0, 40.0)).length() < 1.0, "p = {p}");

        // standing on the far pad does not bounce back
        rig.tick();
        rig.tick();
        let p = rig.world.position(rig.world.player()).unwrap();
        assert!((p - Vec3::new(0.0, 30.0, 40.0)).length() < 1.0);

        rig.put_player(Vec3::new(0.0, 30.0, 20.0));
        rig.tick();
        rig.put_player(Vec3::new(0.0, 30.0, 40.0));
        rig.tick();
        let p = rig.world.position(rig.world.player()).unwrap();
        assert!((p - Vec3::new(0.0, 30.0, 0.0)).length() < 1.0, "p = {p}");
        let teleports = rig
            .outbox
            .iter()
            .filter(|s| matches!(s, Signal::Teleported { .. }))
            .count();
        assert_eq!(teleports, 2);
    }

    #[test]
    fn interiors_nest_one_level() {
        let mut rig = Rig::new(SPACE);
        rig.tick();
        rig.put_player(Vec3::new(10.0, 30.0, 0.0));
        rig.tick();
        assert_eq!(rig.scene.sub_area().current(), Some("hall"));

        // relocating onto the lift pad would teleport, so walk to the vault edge
        rig.put_player(Vec3::new(3.0, 30.0, 40.0));
        rig.tick();
        assert_eq!(rig.scene.sub_area().current(), Some("vault"));
        assert_eq!(rig.scene.sub_area().depth(), 2);

        rig.put_player(Vec3::new(30.0, 30.0, 0.0));
        rig.tick();
        assert_eq!(rig.scene.sub_area().current(), Some("hall"));

        rig.put_player(Vec3::new(500.0, 500.0, 0.0));
        rig.tick();
        assert_eq!(rig.scene.sub_area().current(), None);
    }

    #[test]
    fn surface_scene_tiles_and_leaves_by_altitude() {
        let mut rig = Rig::new(SURFACE);
        assert_eq!(rig.world.gravity(), Some(0.16));
        rig.tick();
        assert_eq!(rig.scene.state(), LocomotionState::Grounded);
        assert_eq!(rig.world.find_all_by_tag(TILE_TAG).len(), 9);
        assert!(rig.outbox.take_exit().is_none());

        rig.put_player(Vec3::new(0.0, 0.0, 310.0));
        rig.tick();
        assert_eq!(rig.outbox.take_exit().unwrap().scene, SceneId::new("orbit"));
    }

    #[test]
    fn mining_a_body_records_it_in_the_ledger() {
        let json = r#"{
            "id": "belt",
            "anchor_model": "dome",
            "origin": [0, 0, 0],
            "bodies": [ { "model": "rock", "name": "rock_1", "offset": [0, 4, 0], "mineable": true, "radius": 1 } ]
        }"#;
        let mut rig = Rig::new(json);
        rig.tick();
        let rock = rig.scene.orbital().body("rock_1").unwrap().entity();

        let press = FrameInput::default().with_pressed(crate::input::queue::Action::Interact);
        for i in 0..200 {
            rig.now += DT as f64;
            let input = if i == 0 { press.clone() } else { FrameInput::default() };
            let mut ctx = FrameContext {
                world: &mut rig.world,
                input: &input,
                outbox: &mut rig.outbox,
                config: &rig.config,
                dt: DT,
                now: rig.now,
            };
            rig.scene.update(&mut ctx, &mut rig.ledger);
            if rig.ledger.len() == 1 {
                break;
            }
        }
        assert!(rig.ledger.is_mined(&SceneId::new("belt"), "rock_1"));
        assert!(!rig.world.exists(rock));
        assert!(rig.scene.orbital().body("rock_1").is_none());
        assert!(rig.outbox.iter().any(|s| matches!(
            s,
            Signal::ObjectMined { stable_id: Some(id), .. } if id == "belt/rock_1"
        )));
    }

    #[test]
    fn delete_is_idempotent() {
        let mut rig = Rig::new(SURFACE);
        rig.tick();
        let before = rig.world.len();
        let removed = rig.scene.delete(&mut rig.world);
        assert_eq!(removed, 10);
        assert_eq!(rig.world.len(), before - removed);
        assert_eq!(rig.world.gravity(), None);
        assert_eq!(rig.scene.delete(&mut rig.world), 0);
        assert_eq!(rig.world.len(), before - removed);
        assert!(rig.world.find_all_by_tag(BODY_TAG).is_empty());

        // a deleted scene ignores updates
        rig.tick();
        assert!(rig.world.find_all_by_tag(TILE_TAG).is_empty());
    }
}
