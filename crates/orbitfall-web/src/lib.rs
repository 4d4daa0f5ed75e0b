pub mod runner;

pub use runner::SessionRunner;

use std::cell::RefCell;

use glam::{Quat, Vec3};
use orbitfall_engine::{Action, Axis, EngineConfig, InputEvent, LoadProgress, Pose};
use wasm_bindgen::prelude::*;

thread_local! {
    static RUNNER: RefCell<Option<SessionRunner>> = const { RefCell::new(None) };
}

/// Run `f` on the session. `None` before `session_init`, or when a call
/// arrives while another one is still running (a host callback re-entering).
fn with_runner<R>(f: impl FnOnce(&mut SessionRunner) -> R) -> Option<R> {
    RUNNER.with(|cell| {
        let Ok(mut borrow) = cell.try_borrow_mut() else {
            log::warn!("session call re-entered, ignored");
            return None;
        };
        match borrow.as_mut() {
            Some(runner) => Some(f(runner)),
            None => {
                log::warn!("session not initialized. Call session_init() first.");
                None
            }
        }
    })
}

/// Create the session. `config_json` may be empty or a partial `EngineConfig`.
#[wasm_bindgen]
pub fn session_init(config_json: &str) -> bool {
    console_error_panic_hook::set_once();
    let _ = console_log::init_with_level(log::Level::Info);

    let config = if config_json.trim().is_empty() {
        EngineConfig::default()
    } else {
        match EngineConfig::from_json(config_json) {
            Ok(config) => config,
            Err(err) => {
                log::error!("bad engine config, using defaults: {err}");
                EngineConfig::default()
            }
        }
    };

    let runner = SessionRunner::new(config);
    RUNNER.with(|cell| match cell.try_borrow_mut() {
        Ok(mut slot) => {
            *slot = Some(runner);
            log::info!("orbitfall: session initialized");
            true
        }
        Err(_) => false,
    })
}

/// Register a scene description. Returns its id, or an empty string.
#[wasm_bindgen]
pub fn session_add_scene(json: &str) -> String {
    with_runner(|r| r.add_scene(json))
        .flatten()
        .map(|id| id.as_str().to_string())
        .unwrap_or_default()
}

/// Load a scene with the player at its default entry.
/// Returns 1 when loaded, 0 while pending, -1 on error.
#[wasm_bindgen]
pub fn session_start(scene: &str) -> i32 {
    with_runner(|r| progress_code(r.start(scene, None))).unwrap_or(-1)
}

/// Load a scene with the player at an explicit position (scene-relative).
#[wasm_bindgen]
pub fn session_start_at(scene: &str, x: f32, y: f32, z: f32) -> i32 {
    let entry = Pose::new(Vec3::new(x, y, z), Quat::IDENTITY);
    with_runner(|r| progress_code(r.start(scene, Some(entry)))).unwrap_or(-1)
}

fn progress_code(result: Result<LoadProgress, orbitfall_engine::SceneLoadError>) -> i32 {
    match result {
        Ok(LoadProgress::Loaded) => 1,
        Ok(LoadProgress::Pending) => 0,
        Err(_) => -1,
    }
}

#[wasm_bindgen]
pub fn session_tick(dt: f32) {
    with_runner(|r| r.tick(dt));
}

#[wasm_bindgen]
pub fn input_axis(code: u32, value: f32) {
    let Some(axis) = Axis::from_code(code) else {
        log::warn!("unknown axis code {code}");
        return;
    };
    with_runner(|r| r.push_input(InputEvent::Axis { axis, value }));
}

#[wasm_bindgen]
pub fn input_action(code: u32) {
    let Some(action) = Action::from_code(code) else {
        log::warn!("unknown action code {code}");
        return;
    };
    with_runner(|r| r.push_input(InputEvent::Pressed(action)));
}

/// The host finished streaming `model`.
#[wasm_bindgen]
pub fn asset_ready(model: &str) {
    with_runner(|r| r.asset_ready(model));
}

// ---- Data accessors ----

#[wasm_bindgen]
pub fn get_buffer_ptr() -> *const f32 {
    with_runner(|r| r.buffer_ptr()).unwrap_or(std::ptr::null())
}

#[wasm_bindgen]
pub fn get_buffer_total_floats() -> u32 {
    with_runner(|r| r.buffer_total_floats()).unwrap_or(0)
}

#[wasm_bindgen]
pub fn get_game_events_ptr() -> *const f32 {
    with_runner(|r| r.game_events_ptr()).unwrap_or(std::ptr::null())
}

#[wasm_bindgen]
pub fn get_game_events_len() -> u32 {
    with_runner(|r| r.game_events_len()).unwrap_or(0)
}

/// Player position and rotation: x, y, z, qx, qy, qz, qw.
#[wasm_bindgen]
pub fn get_player_pose() -> js_sys::Float32Array {
    let pose = with_runner(|r| r.player_pose()).unwrap_or_default();
    let mut floats = [0.0f32; 7];
    floats[..3].copy_from_slice(&pose.position.to_array());
    floats[3..].copy_from_slice(&pose.rotation.to_array());
    js_sys::Float32Array::from(&floats[..])
}

#[wasm_bindgen]
pub fn get_scene_id() -> String {
    with_runner(|r| r.scene_id().map(|id| id.as_str().to_string()))
        .flatten()
        .unwrap_or_default()
}

#[wasm_bindgen]
pub fn get_last_error() -> String {
    with_runner(|r| r.last_error().map(str::to_string))
        .flatten()
        .unwrap_or_default()
}

// ---- Capacity accessors ----

#[wasm_bindgen]
pub fn get_max_bodies() -> u32 {
    with_runner(|r| r.max_bodies()).unwrap_or(0)
}

#[wasm_bindgen]
pub fn get_max_events() -> u32 {
    with_runner(|r| r.max_events()).unwrap_or(0)
}
