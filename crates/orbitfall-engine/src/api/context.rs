use crate::api::config::EngineConfig;
use crate::api::host::HostWorld;
use crate::input::queue::FrameInput;
use crate::scene::outbox::Outbox;

/// Everything a component may touch during one update pass.
///
/// Built fresh by the scene manager every tick; nothing in the engine keeps a
/// global handle to the current scene or host.
pub struct FrameContext<'a> {
    pub world: &'a mut dyn HostWorld,
    pub input: &'a FrameInput,
    pub outbox: &'a mut Outbox,
    pub config: &'a EngineConfig,
    /// Step length in seconds.
    pub dt: f32,
    /// Simulation clock after this step, seconds.
    pub now: f64,
}
