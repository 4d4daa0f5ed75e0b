// scene/manager.rs
//
// Owns the active scene and the one load that may be in flight. A load is a
// bounded wait on the asset gate; the previous scene keeps running until the
// new one is ready and is only torn down at commit time, so every failure
// leaves the last good scene in place.

use glam::Vec3;

use crate::api::capability::Handle;
use crate::api::config::EngineConfig;
use crate::api::context::FrameContext;
use crate::api::error::SceneLoadError;
use crate::api::host::Host;
use crate::api::types::{Pose, SceneId};
use crate::assets::catalog::SceneCatalog;
use crate::assets::definition::SceneDefinition;
use crate::assets::gate::{AssetBatch, BatchState};
use crate::core::time::SimClock;
use crate::input::queue::FrameInput;
use crate::locomotion::proxy::Vehicle;
use crate::locomotion::state::LocomotionState;
use crate::scene::ledger::MinedLedger;
use crate::scene::outbox::{ExitRequest, Outbox, Signal};
use crate::scene::scene::Scene;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadProgress {
    /// The scene is active now.
    Loaded,
    /// Waiting on models; finished (or failed) by a later tick.
    Pending,
}

struct PendingLoad {
    definition: SceneDefinition,
    entry: Option<Pose>,
    batch: AssetBatch,
    /// Set when the load was started by an exit trigger.
    trigger: Option<FailedExit>,
}

/// A trigger whose transition failed. Identical requests are dropped until a
/// tick passes without one, i.e. until the player has left the trigger.
#[derive(Debug, Clone, PartialEq)]
struct FailedExit {
    scene: SceneId,
    source: String,
}

impl FailedExit {
    fn of(exit: &ExitRequest) -> Self {
        Self {
            scene: exit.scene.clone(),
            source: exit.source.clone(),
        }
    }

    fn matches(&self, exit: &ExitRequest) -> bool {
        self.scene == exit.scene && self.source == exit.source
    }
}

/// Summary of one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub frame: u64,
    pub scene: Option<SceneId>,
    pub state: LocomotionState,
    /// Destination of an exit consumed this tick.
    pub transition: Option<SceneId>,
    pub loading: bool,
}

pub struct SceneManager {
    config: EngineConfig,
    catalog: SceneCatalog,
    ledger: MinedLedger,
    clock: SimClock,
    outbox: Outbox,
    active: Option<Scene>,
    pending: Option<PendingLoad>,
    failed_exit: Option<FailedExit>,
    frame: u64,
}

impl SceneManager {
    pub fn new(config: EngineConfig, catalog: SceneCatalog) -> Self {
        Self {
            config,
            catalog,
            ledger: MinedLedger::new(),
            clock: SimClock::new(),
            outbox: Outbox::new(),
            active: None,
            pending: None,
            failed_exit: None,
            frame: 0,
        }
    }

    pub fn with_ledger(mut self, ledger: MinedLedger) -> Self {
        self.ledger = ledger;
        self
    }

    /// Resolve `id` from the catalog and load it.
    pub fn load_scene(
        &mut self,
        host: &mut Host<'_>,
        id: &SceneId,
        entry: Option<Pose>,
    ) -> Result<LoadProgress, SceneLoadError> {
        if self.pending.is_some() {
            return Err(SceneLoadError::Busy(id.clone()));
        }
        let definition = self.catalog.resolve(id)?;
        self.load_definition(host, definition, entry)
    }

    /// Start loading `definition`. Completes at once when every model is
    /// already available, otherwise on a later tick.
    pub fn load_definition(
        &mut self,
        host: &mut Host<'_>,
        definition: SceneDefinition,
        entry: Option<Pose>,
    ) -> Result<LoadProgress, SceneLoadError> {
        if self.pending.is_some() {
            return Err(SceneLoadError::Busy(definition.id.clone()));
        }
        log::info!("loading scene `{}`", definition.id);

        // only the anchor is required; a missing body model just drops the body
        let models = definition.models();
        let batch = AssetBatch::start(
            host.assets,
            &models[..1],
            &models[1..],
            self.clock.now(),
            self.config.asset_timeout,
        );
        self.pending = Some(PendingLoad {
            definition,
            entry,
            batch,
            trigger: None,
        });
        match self.poll_pending(host) {
            Some(Ok(())) => Ok(LoadProgress::Loaded),
            Some(Err(err)) => Err(err),
            None => Ok(LoadProgress::Pending),
        }
    }

    /// Advance the simulation by one step.
    pub fn tick(&mut self, host: &mut Host<'_>, input: &FrameInput, dt: f32) -> TickReport {
        self.frame += 1;
        let now = self.clock.advance(dt);

        if let Some(Err(err)) = self.poll_pending(host) {
            log::error!("{err}");
            if let Some(scene) = err.scene().cloned() {
                self.outbox.push(Signal::SceneLoadFailed { scene, error: err });
            }
        }

        if let Some(scene) = self.active.as_mut() {
            let mut ctx = FrameContext {
                world: &mut *host.world,
                input,
                outbox: &mut self.outbox,
                config: &self.config,
                dt,
                now,
            };
            scene.update(&mut ctx, &mut self.ledger);
        }

        // exits are consumed only once the update pass is over
        let mut transition = None;
        match self.outbox.take_exit() {
            Some(exit) if self.failed_exit.as_ref().is_some_and(|f| f.matches(&exit)) => {}
            Some(exit) if self.pending.is_some() => {
                log::debug!("exit to `{}` ignored, a load is already in flight", exit.scene);
            }
            Some(exit) => {
                self.failed_exit = None;
                transition = Some(exit.scene.clone());
                match self.load_scene(host, &exit.scene, exit.pose) {
                    Ok(LoadProgress::Loaded) => {}
                    Ok(LoadProgress::Pending) => {
                        if let Some(pending) = self.pending.as_mut() {
                            pending.trigger = Some(FailedExit::of(&exit));
                        }
                    }
                    Err(err) => {
                        log::error!("transition from `{}` failed: {err}", exit.source);
                        self.failed_exit = Some(FailedExit::of(&exit));
                        self.outbox.push(Signal::SceneLoadFailed {
                            scene: exit.scene,
                            error: err,
                        });
                    }
                }
            }
            None => self.failed_exit = None,
        }

        TickReport {
            frame: self.frame,
            scene: self.active.as_ref().map(|s| s.id().clone()),
            state: self.state(),
            transition,
            loading: self.pending.is_some(),
        }
    }

    /// `None` while nothing is pending.
    fn poll_pending(&mut self, host: &mut Host<'_>) -> Option<Result<(), SceneLoadError>> {
        let pending = self.pending.as_mut()?;
        match pending.batch.poll(host.assets, self.clock.now()) {
            BatchState::Pending => None,
            BatchState::Failed(model) => {
                let mut pending = self.pending.take()?;
                pending.batch.release_all(host.assets);
                self.failed_exit = pending.trigger.take();
                Some(Err(SceneLoadError::AssetTimeout {
                    scene: pending.definition.id,
                    model,
                }))
            }
            BatchState::Complete => {
                let pending = self.pending.take()?;
                self.commit(host, pending);
                Some(Ok(()))
            }
        }
    }

    /// Swap the ready scene in for the active one.
    fn commit(&mut self, host: &mut Host<'_>, pending: PendingLoad) {
        let ready = pending.batch.ready_models();
        let mut carry = None;
        if let Some(mut old) = self.active.take() {
            carry = old.locomotion().last_vehicle();
            old.delete(host.world);
        }
        // the vehicle the player is sitting in comes along too
        if let Some(seated) = host.world.seated_vehicle() {
            carry = Some(Vehicle::new(seated));
        }
        let carry = carry.filter(|v| v.is_alive(host.world));

        let mut scene = Scene::build(
            host.world,
            pending.definition,
            &self.config,
            &ready,
            &self.ledger,
            carry,
        );
        scene.start(host.world);

        let entry = pending
            .entry
            .or(scene.definition().default_entry)
            .map_or_else(|| Pose::at(scene.origin()), |p| offset_pose(p, scene.origin()));
        if !scene.place_player(host.world, entry) {
            log::warn!("could not place the player in `{}`", scene.id());
        }

        log::info!("scene `{}` active", scene.id());
        self.outbox.push(Signal::SceneLoaded {
            scene: scene.id().clone(),
        });
        self.active = Some(scene);
    }

    /// Tear down the active scene and drop any pending load.
    pub fn unload(&mut self, host: &mut Host<'_>) -> usize {
        if let Some(mut pending) = self.pending.take() {
            pending.batch.release_all(host.assets);
        }
        self.active.take().map_or(0, |mut scene| scene.delete(host.world))
    }

    pub fn drain_signals(&mut self) -> Vec<Signal> {
        self.outbox.drain()
    }

    pub fn active(&self) -> Option<&Scene> {
        self.active.as_ref()
    }

    pub fn state(&self) -> LocomotionState {
        self.active.as_ref().map_or(LocomotionState::Grounded, Scene::state)
    }

    pub fn is_loading(&self) -> bool {
        self.pending.is_some()
    }

    /// Scene the in-flight load is for.
    pub fn loading_scene(&self) -> Option<&SceneId> {
        self.pending.as_ref().map(|p| &p.definition.id)
    }

    pub fn ledger(&self) -> &MinedLedger {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut MinedLedger {
        &mut self.ledger
    }

    pub fn catalog(&self) -> &SceneCatalog {
        &self.catalog
    }

    pub fn catalog_mut(&mut self) -> &mut SceneCatalog {
        &mut self.catalog
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn now(&self) -> f64 {
        self.clock.now()
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }
}

/// Entry poses are relative to the destination's origin.
fn offset_pose(pose: Pose, origin: Vec3) -> Pose {
    Pose::new(origin + pose.position, pose.rotation)
}
