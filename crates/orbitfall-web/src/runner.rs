use orbitfall_engine::api::types::{
    EVENT_LOCOMOTION_CHANGED, EVENT_OBJECT_MINED, EVENT_SCENE_LOADED, EVENT_SCENE_LOAD_FAILED,
    EVENT_SUB_AREA, EVENT_TASK_ABORTED, EVENT_TELEPORTED, EVENT_VEHICLE_REPAIRED,
    EVENT_WORMHOLE_FEEDBACK,
};
use orbitfall_engine::bridge::protocol::*;
use orbitfall_engine::locomotion::docking::AbortReason;
use orbitfall_engine::{
    EngineConfig, FixedTimestep, FlightAxes, FrameInput, GameEvent, Handle, Host, HostWorld,
    InputEvent, InputQueue, LoadProgress, LocomotionState, MemoryAssetGate, ModelId, Pose,
    ProtocolLayout, SceneDriver, SceneId, SceneLoadError, SceneManager, SceneCatalog, Signal,
    SimWorld, TickOutcome,
};

/// Drives one play session for a browser host.
///
/// The host feeds frame time, input and asset readiness; the runner steps the
/// scene driver at a fixed rate and packs the result into one flat buffer
/// laid out by [`ProtocolLayout`].
pub struct SessionRunner {
    driver: SceneDriver,
    world: SimWorld,
    gate: MemoryAssetGate,
    input: InputQueue,
    held: FlightAxes,
    timestep: FixedTimestep,
    layout: ProtocolLayout,
    buffer: Vec<f32>,
    events: Vec<GameEvent>,
    last_scene: Option<SceneId>,
    last_error: Option<String>,
    steps: u32,
    frame: u32,
}

impl SessionRunner {
    pub fn new(config: EngineConfig) -> Self {
        let timestep = FixedTimestep::new(config.fixed_dt);
        let layout = ProtocolLayout::from_config(&config);
        let buffer = layout.allocate();
        let events = Vec::with_capacity(config.max_events);

        Self {
            driver: SceneDriver::new(SceneManager::new(config, SceneCatalog::new())),
            world: SimWorld::new(),
            // the host announces every model it has streamed in
            gate: MemoryAssetGate::strict(),
            input: InputQueue::new(),
            held: FlightAxes::default(),
            timestep,
            layout,
            buffer,
            events,
            last_scene: None,
            last_error: None,
            steps: 0,
            frame: 0,
        }
    }

    /// Use a different asset gate (tests, hosts with everything preloaded).
    pub fn with_gate(mut self, gate: MemoryAssetGate) -> Self {
        self.gate = gate;
        self
    }

    /// Register a scene description. Returns its id.
    pub fn add_scene(&mut self, json: &str) -> Option<SceneId> {
        let id = self
            .driver
            .with_manager(|m| m.catalog_mut().insert_document(json))
            .flatten();
        if id.is_none() {
            log::warn!("scene description without a usable id ignored");
        }
        id
    }

    /// Load the first scene, or jump to another one.
    pub fn start(&mut self, scene: &str, entry: Option<Pose>) -> Result<LoadProgress, SceneLoadError> {
        let mut host = Host::new(&mut self.world, &mut self.gate);
        let result = self.driver.load_scene(&mut host, &SceneId::new(scene), entry);
        if let Err(err) = &result {
            log::error!("{err}");
            self.last_error = Some(err.to_string());
        }
        result
    }

    pub fn asset_ready(&mut self, model: &str) {
        self.gate.set_ready(&ModelId::new(model));
    }

    /// Push an input event into the queue.
    pub fn push_input(&mut self, event: InputEvent) {
        self.input.push(event);
    }

    /// Run one host frame: fixed steps, signal flattening, buffer packing.
    pub fn tick(&mut self, dt: f32) {
        self.events.clear();

        let steps = self.timestep.accumulate(dt);
        let first = FrameInput::collect(&mut self.held, self.input.drain());
        let later = first.without_edges();
        let step_dt = self.timestep.dt();
        for step in 0..steps {
            // edges belong to the first step only
            let input = if step == 0 { &first } else { &later };
            let mut host = Host::new(&mut self.world, &mut self.gate);
            if let TickOutcome::Skipped = self.driver.tick(&mut host, input, step_dt) {
                log::warn!("session step skipped");
            }
        }
        self.steps = steps;
        self.frame = self.frame.wrapping_add(1);

        let signals = self.driver.with_manager(|m| m.drain_signals()).unwrap_or_default();
        for signal in &signals {
            self.record(signal);
        }
        self.pack();
    }

    fn record(&mut self, signal: &Signal) {
        let event = match signal {
            Signal::SceneLoaded { scene } => {
                self.last_scene = Some(scene.clone());
                GameEvent::new(EVENT_SCENE_LOADED, 0.0, 0.0, 0.0)
            }
            Signal::SceneLoadFailed { error, .. } => {
                self.last_error = Some(error.to_string());
                GameEvent::new(EVENT_SCENE_LOAD_FAILED, 0.0, 0.0, 0.0)
            }
            Signal::LocomotionChanged { from, to } => {
                GameEvent::new(EVENT_LOCOMOTION_CHANGED, from.code() as f32, to.code() as f32, 0.0)
            }
            Signal::ObjectMined { entity, .. } => GameEvent::new(EVENT_OBJECT_MINED, entity.0 as f32, 0.0, 0.0),
            Signal::VehicleRepaired { entity } => {
                GameEvent::new(EVENT_VEHICLE_REPAIRED, entity.0 as f32, 0.0, 0.0)
            }
            Signal::TaskAborted { state, reason } => {
                let kind = match state {
                    LocomotionState::Mining => 1.0,
                    LocomotionState::Repairing => 2.0,
                    _ => 0.0,
                };
                GameEvent::new(EVENT_TASK_ABORTED, kind, abort_code(*reason), 0.0)
            }
            Signal::SubAreaChanged { area, depth } => {
                GameEvent::new(EVENT_SUB_AREA, area.is_some() as u8 as f32, *depth as f32, 0.0)
            }
            Signal::Teleported { to, .. } => GameEvent::new(EVENT_TELEPORTED, to.x, to.y, to.z),
            Signal::WormholeFeedback(level) => GameEvent::new(EVENT_WORMHOLE_FEEDBACK, *level, 0.0, 0.0),
        };
        if self.events.len() < self.layout.max_events {
            self.events.push(event);
        } else {
            log::warn!("event buffer full, dropping {signal:?}");
        }
    }

    /// Write header, body poses and events into the shared buffer.
    fn pack(&mut self) {
        let snapshot = self.driver.with_manager(|m| {
            let scene = m.active();
            let bodies: Vec<_> = scene
                .map(|s| s.orbital().bodies().iter().map(|b| b.entity()).collect())
                .unwrap_or_default();
            let anchor = scene.and_then(|s| s.orbital().anchor());
            let feedback = scene.map_or(0.0, |s| s.wormhole().feedback());
            let depth = scene.map_or(0, |s| s.sub_area().depth());
            (m.state(), m.is_loading(), bodies, anchor, feedback, depth)
        });
        let Some((state, loading, bodies, anchor, feedback, depth)) = snapshot else {
            return;
        };

        let buf = &mut self.buffer;
        buf[HEADER_LOCK] = 1.0;
        buf[HEADER_FRAME_COUNTER] = self.frame as f32;
        buf[HEADER_LOCOMOTION_STATE] = state.code() as f32;

        let player = self.world.pose(self.world.player()).unwrap_or_default();
        buf[HEADER_PLAYER_POS..HEADER_PLAYER_POS + 3].copy_from_slice(&player.position.to_array());
        buf[HEADER_PLAYER_ROT..HEADER_PLAYER_ROT + 4].copy_from_slice(&player.rotation.to_array());
        buf[HEADER_FEEDBACK] = feedback;
        buf[HEADER_LOADING] = loading as u8 as f32;
        buf[HEADER_ANCHOR_ID] = anchor.map_or(0.0, |a| a.0 as f32);
        buf[HEADER_STEPS] = self.steps as f32;
        buf[HEADER_SUB_AREA_DEPTH] = depth as f32;

        let mut count = 0;
        for entity in bodies {
            let Some(offset) = self.layout.body_offset(count) else {
                break;
            };
            let Some(pose) = self.world.pose(entity) else {
                continue;
            };
            buf[offset] = entity.0 as f32;
            buf[offset + 1..offset + 4].copy_from_slice(&pose.position.to_array());
            buf[offset + 4..offset + 8].copy_from_slice(&pose.rotation.to_array());
            count += 1;
        }
        buf[HEADER_BODY_COUNT] = count as f32;

        let floats: &[f32] = bytemuck::cast_slice(&self.events);
        let start = self.layout.event_data_offset;
        buf[start..start + floats.len()].copy_from_slice(floats);
        buf[HEADER_EVENT_COUNT] = self.events.len() as f32;
        buf[HEADER_LOCK] = 0.0;
    }

    // ---- Pointer accessors for shared-buffer reads ----

    pub fn buffer_ptr(&self) -> *const f32 {
        self.buffer.as_ptr()
    }

    pub fn buffer(&self) -> &[f32] {
        &self.buffer
    }

    pub fn events(&self) -> &[GameEvent] {
        &self.events
    }

    pub fn game_events_ptr(&self) -> *const f32 {
        self.events.as_ptr() as *const f32
    }

    pub fn game_events_len(&self) -> u32 {
        self.events.len() as u32
    }

    pub fn player_pose(&self) -> Pose {
        self.world.pose(self.world.player()).unwrap_or_default()
    }

    pub fn scene_id(&self) -> Option<&SceneId> {
        self.last_scene.as_ref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn world_mut(&mut self) -> &mut SimWorld {
        &mut self.world
    }

    // ---- Capacity accessors (read by the host via wasm_bindgen exports) ----

    pub fn max_bodies(&self) -> u32 {
        self.layout.max_bodies as u32
    }

    pub fn max_events(&self) -> u32 {
        self.layout.max_events as u32
    }

    pub fn buffer_total_floats(&self) -> u32 {
        self.layout.buffer_total_floats as u32
    }
}

fn abort_code(reason: AbortReason) -> f32 {
    match reason {
        AbortReason::TargetLost => 1.0,
        AbortReason::Timeout => 2.0,
        AbortReason::Cancelled => 3.0,
        AbortReason::ProxyLost => 4.0,
        AbortReason::Interrupted => 5.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orbitfall_engine::{Action, Axis};

    const BELT: &str = r#"{
        "id": "belt",
        "anchor_model": "dome",
        "origin": [0, 0, 0],
        "bodies": [
            { "model": "rock", "name": "rock_1", "offset": [0, 40, 0], "mineable": true, "radius": 2 },
            { "model": "station", "name": "station", "offset": [300, 0, 0],
              "orbit": { "pivot": [0, 0, 0], "angular_velocity": 10 } }
        ]
    }"#;

    fn runner() -> SessionRunner {
        let mut runner = SessionRunner::new(EngineConfig::default()).with_gate(MemoryAssetGate::new());
        assert_eq!(runner.add_scene(BELT), Some(SceneId::new("belt")));
        runner
    }

    #[test]
    fn start_and_tick_fill_the_buffer() {
        let mut r = runner();
        assert_eq!(r.start("belt", None), Ok(LoadProgress::Loaded));
        r.tick(1.0 / 60.0);

        let buf = r.buffer();
        assert_eq!(buf[HEADER_PROTOCOL_VERSION], PROTOCOL_VERSION);
        assert_eq!(buf[HEADER_MAX_BODIES], 128.0);
        assert_eq!(buf[HEADER_BODY_COUNT], 2.0);
        assert_eq!(buf[HEADER_LOCOMOTION_STATE], LocomotionState::Drifting.code() as f32);
        assert_eq!(buf[HEADER_LOCK], 0.0);
        assert_eq!(buf[HEADER_STEPS], 1.0);
        assert_eq!(r.scene_id(), Some(&SceneId::new("belt")));

        let kinds: Vec<f32> = r.events().iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![EVENT_SCENE_LOADED, EVENT_LOCOMOTION_CHANGED]);
        let event_start = r.layout.event_data_offset;
        assert_eq!(buf[HEADER_EVENT_COUNT], 2.0);
        assert_eq!(buf[event_start], EVENT_SCENE_LOADED);
        assert_eq!(buf[event_start + 4], EVENT_LOCOMOTION_CHANGED);
        assert_eq!(buf[event_start + 6], LocomotionState::Drifting.code() as f32);
    }

    #[test]
    fn held_throttle_moves_the_player() {
        let mut r = runner();
        r.start("belt", None).unwrap();
        r.tick(1.0 / 60.0);
        r.push_input(InputEvent::Axis { axis: Axis::Throttle, value: 1.0 });
        for _ in 0..60 {
            r.tick(1.0 / 60.0);
        }
        assert!(r.player_pose().position.y > 0.1);
        let buf = r.buffer();
        assert_eq!(buf[HEADER_PLAYER_POS + 1], r.player_pose().position.y);
    }

    #[test]
    fn edges_fire_once_per_frame() {
        let mut r = runner();
        let crag = r#"{ "id": "crag", "anchor_model": "dome", "origin": [0, 0, 0],
            "bodies": [ { "model": "rock", "name": "crag", "offset": [0, 4, 0], "mineable": true, "radius": 1 } ] }"#;
        r.add_scene(crag).unwrap();
        r.start("crag", None).unwrap();
        r.tick(1.0 / 60.0);

        // Interact starts mining on the first step; Cancel would abort it on a
        // second step if the presses leaked past the first one
        r.push_input(InputEvent::Pressed(Action::Interact));
        r.push_input(InputEvent::Pressed(Action::Cancel));
        r.tick(3.0 / 60.0 + 0.001);

        assert_eq!(r.buffer()[HEADER_STEPS], 3.0);
        assert_eq!(r.buffer()[HEADER_LOCOMOTION_STATE], LocomotionState::Mining.code() as f32);
        let kinds: Vec<f32> = r.events().iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![EVENT_LOCOMOTION_CHANGED]);
    }

    #[test]
    fn strict_gate_waits_for_the_host() {
        let mut r = SessionRunner::new(EngineConfig::default());
        r.add_scene(BELT).unwrap();
        assert_eq!(r.start("belt", None), Ok(LoadProgress::Pending));
        r.tick(1.0 / 60.0);
        assert_eq!(r.buffer()[HEADER_LOADING], 1.0);

        r.asset_ready("dome");
        r.asset_ready("rock");
        r.asset_ready("station");
        r.tick(1.0 / 60.0);
        assert_eq!(r.buffer()[HEADER_LOADING], 0.0);
        assert_eq!(r.scene_id(), Some(&SceneId::new("belt")));
    }

    #[test]
    fn unknown_scene_reports_an_error() {
        let mut r = runner();
        assert!(matches!(r.start("nowhere", None), Err(SceneLoadError::NotFound(_))));
        assert!(r.last_error().unwrap().contains("nowhere"));
    }
}
