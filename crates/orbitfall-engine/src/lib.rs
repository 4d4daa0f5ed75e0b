pub mod api;
pub mod core;
pub mod components;
pub mod bridge;
pub mod input;
pub mod assets;
pub mod orbital;
pub mod locomotion;
pub mod terrain;
pub mod scene;

// Re-export key types at crate root for convenience
pub use api::config::{EngineConfig, FlightTuning, LocomotionTuning, TerrainTuning, WormholeTuning};
pub use api::context::FrameContext;
pub use api::error::{DefinitionError, SceneLoadError};
pub use api::host::{AssetGate, Host, HostWorld, ProbeHit, SpawnDesc};
pub use api::capability::{Attachable, Damageable, Handle, Rotatable};
pub use api::types::{AssetHandle, EntityId, GameEvent, ModelId, Pose, SceneId};
pub use components::entity::Entity;
pub use core::time::{Deadline, FixedTimestep, SimClock};
pub use core::world::SimWorld;
pub use input::queue::{Action, Axis, FlightAxes, FrameInput, InputEvent, InputQueue};
pub use assets::catalog::SceneCatalog;
pub use assets::definition::SceneDefinition;
pub use assets::gate::{AssetBatch, MemoryAssetGate};
pub use bridge::protocol::ProtocolLayout;
pub use orbital::body::OrbitalBody;
pub use orbital::system::OrbitalSystem;
pub use orbital::wormhole::{WormholeAttractor, WormholePhase};
pub use locomotion::controller::LocomotionController;
pub use locomotion::state::LocomotionState;
pub use terrain::tiler::{TerrainTiler, TileCoord};
pub use scene::driver::{SceneDriver, TickOutcome};
pub use scene::ledger::MinedLedger;
pub use scene::manager::{LoadProgress, SceneManager, TickReport};
pub use scene::outbox::{ExitRequest, Outbox, Signal};
pub use scene::scene::Scene;
