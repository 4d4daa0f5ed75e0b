// assets/gate.rs
//
// Non-blocking model readiness. A request is a bounded-retry state polled once
// per tick until the host reports ready or the deadline passes.

use std::collections::{HashMap, HashSet};

use crate::api::host::AssetGate;
use crate::api::types::{AssetHandle, ModelId};
use crate::core::time::Deadline;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetStatus {
    Pending,
    Ready,
    TimedOut,
}

/// One model request under a deadline.
#[derive(Debug, Clone)]
pub struct AssetRequest {
    pub model: ModelId,
    /// Required models fail the whole batch when they time out.
    pub required: bool,
    handle: AssetHandle,
    deadline: Deadline,
    status: AssetStatus,
}

impl AssetRequest {
    pub fn start(gate: &mut dyn AssetGate, model: ModelId, required: bool, now: f64, timeout: f32) -> Self {
        let handle = gate.request(&model);
        Self {
            model,
            required,
            handle,
            deadline: Deadline::after(now, timeout),
            status: AssetStatus::Pending,
        }
    }

    /// Poll the host once. Terminal states are sticky.
    pub fn poll(&mut self, gate: &mut dyn AssetGate, now: f64) -> AssetStatus {
        if self.status != AssetStatus::Pending {
            return self.status;
        }
        if gate.is_ready(self.handle) {
            self.status = AssetStatus::Ready;
        } else if self.deadline.expired(now) {
            log::warn!("model `{}` not ready after deadline", self.model);
            gate.release(self.handle);
            self.status = AssetStatus::TimedOut;
        }
        self.status
    }

    pub fn status(&self) -> AssetStatus {
        self.status
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchState {
    Pending,
    /// Every request settled and no required model failed.
    Complete,
    /// A required model timed out.
    Failed(ModelId),
}

/// The set of models a scene needs before it can be built.
#[derive(Debug, Clone, Default)]
pub struct AssetBatch {
    requests: Vec<AssetRequest>,
}

impl AssetBatch {
    pub fn start(
        gate: &mut dyn AssetGate,
        required: &[ModelId],
        optional: &[ModelId],
        now: f64,
        timeout: f32,
    ) -> Self {
        let mut requests = Vec::with_capacity(required.len() + optional.len());
        for model in required {
            requests.push(AssetRequest::start(gate, model.clone(), true, now, timeout));
        }
        for model in optional {
            if !required.contains(model) {
                requests.push(AssetRequest::start(gate, model.clone(), false, now, timeout));
            }
        }
        Self { requests }
    }

    pub fn poll(&mut self, gate: &mut dyn AssetGate, now: f64) -> BatchState {
        let mut pending = false;
        for request in self.requests.iter_mut() {
            match request.poll(gate, now) {
                AssetStatus::TimedOut if request.required => {
                    return BatchState::Failed(request.model.clone());
                }
                AssetStatus::Pending => pending = true,
                _ => {}
            }
        }
        if pending {
            BatchState::Pending
        } else {
            BatchState::Complete
        }
    }

    pub fn is_ready(&self, model: &ModelId) -> bool {
        self.requests
            .iter()
            .any(|r| &r.model == model && r.status == AssetStatus::Ready)
    }

    pub fn ready_models(&self) -> HashSet<ModelId> {
        self.requests
            .iter()
            .filter(|r| r.status == AssetStatus::Ready)
            .map(|r| r.model.clone())
            .collect()
    }

    /// Give every outstanding request back to the host.
    pub fn release_all(&mut self, gate: &mut dyn AssetGate) {
        for request in self.requests.drain(..) {
            if request.status == AssetStatus::Pending {
                gate.release(request.handle);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}

/// In-memory asset gate. Models become ready after a configurable number of
/// unsuccessful polls, or never.
#[derive(Debug, Clone)]
pub struct MemoryAssetGate {
    handles: Vec<(ModelId, u32)>,
    delays: HashMap<ModelId, Option<u32>>,
    default_delay: Option<u32>,
    released: usize,
}

impl MemoryAssetGate {
    /// Every model is ready on its first poll.
    pub fn new() -> Self {
        Self {
            handles: Vec::new(),
            delays: HashMap::new(),
            default_delay: Some(0),
            released: 0,
        }
    }

    /// Unknown models never become ready; only models marked ready do.
    pub fn strict() -> Self {
        Self {
            default_delay: None,
            ..Self::new()
        }
    }

    pub fn with_delay(mut self, model: impl Into<String>, polls: u32) -> Self {
        self.delays.insert(ModelId::new(model), Some(polls));
        self
    }

    pub fn never_ready(mut self, model: impl Into<String>) -> Self {
        self.delays.insert(ModelId::new(model), None);
        self
    }

    pub fn set_ready(&mut self, model: &ModelId) {
        self.delays.insert(model.clone(), Some(0));
    }

    pub fn released(&self) -> usize {
        self.released
    }
}

impl Default for MemoryAssetGate {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetGate for MemoryAssetGate {
    fn request(&mut self, model: &ModelId) -> AssetHandle {
        self.handles.push((model.clone(), 0));
        AssetHandle((self.handles.len() - 1) as u32)
    }

    fn is_ready(&mut self, handle: AssetHandle) -> bool {
        let Some((model, polls)) = self.handles.get_mut(handle.0 as usize) else {
            return false;
        };
        *polls += 1;
        let delay = self.delays.get(model).copied().unwrap_or(self.default_delay);
        match delay {
            Some(d) => *polls > d,
            None => false,
        }
    }

    fn release(&mut self, _handle: AssetHandle) {
        self.released += 1;
    }
}
