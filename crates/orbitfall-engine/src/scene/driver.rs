use std::cell::RefCell;

use crate::api::error::SceneLoadError;
use crate::api::host::Host;
use crate::api::types::{Pose, SceneId};
use crate::core::guard::ReentryGuard;
use crate::input::queue::FrameInput;
use crate::scene::manager::{LoadProgress, SceneManager, TickReport};

#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    Ran(TickReport),
    /// Another tick was already running further up the stack.
    Skipped,
}

/// Host-facing entry point around a [`SceneManager`].
///
/// Host callbacks fired during teardown may call back into the driver while
/// the outer tick still holds the manager. Those nested calls are dropped,
/// not queued.
pub struct SceneDriver {
    manager: RefCell<SceneManager>,
    guard: ReentryGuard,
}

impl SceneDriver {
    pub fn new(manager: SceneManager) -> Self {
        Self {
            manager: RefCell::new(manager),
            guard: ReentryGuard::new(),
        }
    }

    pub fn tick(&self, host: &mut Host<'_>, input: &FrameInput, dt: f32) -> TickOutcome {
        let Some(_token) = self.guard.try_enter() else {
            log::warn!("nested tick skipped");
            return TickOutcome::Skipped;
        };
        let Ok(mut manager) = self.manager.try_borrow_mut() else {
            log::warn!("scene manager borrowed elsewhere, tick skipped");
            return TickOutcome::Skipped;
        };
        TickOutcome::Ran(manager.tick(host, input, dt))
    }

    pub fn load_scene(
        &self,
        host: &mut Host<'_>,
        id: &SceneId,
        entry: Option<Pose>,
    ) -> Result<LoadProgress, SceneLoadError> {
        let Some(_token) = self.guard.try_enter() else {
            return Err(SceneLoadError::Busy(id.clone()));
        };
        let mut manager = self
            .manager
            .try_borrow_mut()
            .map_err(|_| SceneLoadError::Busy(id.clone()))?;
        manager.load_scene(host, id, entry)
    }

    /// Run `f` on the manager unless a tick or load is in progress.
    pub fn with_manager<R>(&self, f: impl FnOnce(&mut SceneManager) -> R) -> Option<R> {
        let _token = self.guard.try_enter()?;
        let mut manager = self.manager.try_borrow_mut().ok()?;
        Some(f(&mut manager))
    }

    pub fn is_busy(&self) -> bool {
        self.guard.is_busy()
    }

    pub fn into_inner(self) -> SceneManager {
        self.manager.into_inner()
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::api::config::EngineConfig;
    use crate::api::host::HostWorld;
    use crate::assets::catalog::SceneCatalog;
    use crate::assets::gate::MemoryAssetGate;
    use crate::core::world::SimWorld;
    use crate::scene::outbox::Signal;

    fn driver() -> SceneDriver {
        let mut catalog = SceneCatalog::new();
        // the player spawns inside the link, so the first tick transitions
        catalog.insert_source(
            "hangar",
            r#"{ "id": "hangar", "anchor_model": "dome", "origin": [0, 0, 0],
                 "links": [ { "name": "door", "offset": [0, 0, 0], "radius": 5, "next_scene": "yard" } ] }"#,
        );
        catalog.insert_source(
            "yard",
            r#"{ "id": "yard", "anchor_model": "sky", "is_surface": true, "default_entry": { "position": [0, 50, 0] } }"#,
        );
        SceneDriver::new(SceneManager::new(EngineConfig::default(), catalog))
    }

    #[test]
    fn teardown_callback_cannot_reenter() {
        let driver = Rc::new(driver());
        let outcomes = Rc::new(RefCell::new(Vec::new()));

        let mut world = SimWorld::new();
        let mut gate = MemoryAssetGate::new();
        {
            let driver = Rc::clone(&driver);
            let outcomes = Rc::clone(&outcomes);
            world.set_despawn_hook(Box::new(move |_| {
                let mut inner_world = SimWorld::new();
                let mut inner_gate = MemoryAssetGate::new();
                let mut host = Host::new(&mut inner_world, &mut inner_gate);
                let ticked = driver.tick(&mut host, &FrameInput::default(), 0.1);
                let loaded = driver.load_scene(&mut host, &SceneId::new("yard"), None);
                outcomes.borrow_mut().push((ticked, loaded));
            }));
        }

        let mut host = Host::new(&mut world, &mut gate);
        assert_eq!(
            driver.load_scene(&mut host, &SceneId::new("hangar"), None),
            Ok(LoadProgress::Loaded)
        );

        let outcome = driver.tick(&mut host, &FrameInput::default(), 0.1);
        match outcome {
            TickOutcome::Ran(report) => {
                assert_eq!(report.transition, Some(SceneId::new("yard")));
                assert_eq!(report.scene, Some(SceneId::new("yard")));
            }
            TickOutcome::Skipped => panic!("outer tick was skipped"),
        }

        let outcomes = outcomes.borrow();
        assert!(!outcomes.is_empty(), "teardown despawned nothing");
        for (ticked, loaded) in outcomes.iter() {
            assert_eq!(*ticked, TickOutcome::Skipped);
            assert!(matches!(loaded, Err(SceneLoadError::Busy(_))));
        }
        assert!(!driver.is_busy());

        let signals = driver.with_manager(|m| m.drain_signals()).unwrap();
        let loaded: Vec<_> = signals
            .iter()
            .filter_map(|s| match s {
                Signal::SceneLoaded { scene } => Some(scene.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(loaded, vec!["hangar", "yard"]);
        assert_eq!(world.position(world.player()), Some(glam::Vec3::new(0.0, 50.0, 0.0)));
    }

    #[test]
    fn with_manager_is_refused_mid_tick() {
        let driver = driver();
        let _token = driver.guard.try_enter();
        assert!(driver.with_manager(|m| m.frame()).is_none());
    }
}
