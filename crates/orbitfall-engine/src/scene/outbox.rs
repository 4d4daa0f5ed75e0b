use glam::Vec3;

use crate::api::error::SceneLoadError;
use crate::api::types::{EntityId, Pose, SceneId};
use crate::locomotion::docking::AbortReason;
use crate::locomotion::state::LocomotionState;

/// A request to leave the current scene.
#[derive(Debug, Clone, PartialEq)]
pub struct ExitRequest {
    pub scene: SceneId,
    /// Entry pose in the destination; `None` uses the destination's default.
    pub pose: Option<Pose>,
    /// Name of the body, link or flag that raised the request.
    pub source: String,
}

impl ExitRequest {
    pub fn new(scene: SceneId, pose: Option<Pose>, source: impl Into<String>) -> Self {
        Self {
            scene,
            pose,
            source: source.into(),
        }
    }
}

/// Notifications for the host and for content built on top of the core.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    SceneLoaded {
        scene: SceneId,
    },
    SceneLoadFailed {
        scene: SceneId,
        error: SceneLoadError,
    },
    LocomotionChanged {
        from: LocomotionState,
        to: LocomotionState,
    },
    ObjectMined {
        scene: SceneId,
        entity: EntityId,
        /// Ledger key when the mined object was a scene body.
        stable_id: Option<String>,
    },
    VehicleRepaired {
        entity: EntityId,
    },
    TaskAborted {
        state: LocomotionState,
        reason: AbortReason,
    },
    SubAreaChanged {
        area: Option<String>,
        depth: usize,
    },
    Teleported {
        name: String,
        to: Vec3,
    },
    WormholeFeedback(f32),
}

/// Signals raised during one update pass, plus the single pending-exit slot.
///
/// Components push while the scene updates; the manager drains after the pass
/// completes, so nothing reacts to a signal mid-iteration.
#[derive(Debug, Default)]
pub struct Outbox {
    signals: Vec<Signal>,
    exit: Option<ExitRequest>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, signal: Signal) {
        self.signals.push(signal);
    }

    /// Fill the exit slot. The first request of a pass wins; later ones are dropped.
    pub fn request_exit(&mut self, request: ExitRequest) -> bool {
        if let Some(pending) = &self.exit {
            log::debug!(
                "exit to `{}` from `{}` dropped, `{}` already pending",
                request.scene,
                request.source,
                pending.scene
            );
            return false;
        }
        log::info!("exit requested to `{}` by `{}`", request.scene, request.source);
        self.exit = Some(request);
        true
    }

    pub fn exit_pending(&self) -> bool {
        self.exit.is_some()
    }

    pub fn take_exit(&mut self) -> Option<ExitRequest> {
        self.exit.take()
    }

    pub fn drain(&mut self) -> Vec<Signal> {
        std::mem::take(&mut self.signals)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Signal> {
        self.signals.iter()
    }

    pub fn len(&self) -> usize {
        self.signals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }
}
