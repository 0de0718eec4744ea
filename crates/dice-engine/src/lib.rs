pub mod api;
pub mod assets;
pub mod bridge;
pub mod core;
pub mod error;
pub mod renderer;
pub mod systems;

// Re-export key types at crate root for convenience
pub use api::config::{EngineConfig, ImpactTuning, LaunchTuning, SettleTuning};
pub use api::types::{
    face_label, DieKind, DieSpec, DisplayMode, RollEvent, RollRequest, SoundCue, SoundEvent,
};
pub use assets::color::Color;
pub use assets::context::RendererContext;
pub use assets::geometry::{DieFace, DieMesh, DieModel};
pub use assets::models::ModelCache;
pub use assets::texture::{TextureAsset, TextureCache, TextureHandle, TextureId, TextureKey};
pub use assets::theme::{DiceTheme, DieFlair, ThemeConfig};
pub use bridge::protocol::{FrameBuffer, ProtocolLayout};
pub use core::physics::{
    BodyHandle, ColliderMaterial, ContactEvent, DieBodyDesc, HeadlessWorld, PhysicsService, Pose,
    TrayDesc,
};
pub use core::scene::DiceScene;
pub use core::time::FixedTimestep;
pub use error::EngineError;
pub use renderer::camera::{Camera3D, CameraUniform};
pub use renderer::instance::{DieInstance, FlairInstance, LabelInstance, RenderFrame, RingInstance};
pub use systems::impact::{CameraShake, ImpactEvent, ImpactPipeline};
pub use systems::layout::{CameraRig, TrayLayout};
pub use systems::lifecycle::{DieLifecycle, DiePhase, LifecycleAction, MotionSample};
pub use systems::lighting::{LightState, PointLight};
pub use systems::orchestrator::{DieSlot, Highlight, RollOrchestrator};
pub use systems::quality::{DeviceCapabilities, PerformanceTier, PowerPreference, QualityProfile};

#[cfg(feature = "physics")]
pub use core::physics::RapierWorld;
