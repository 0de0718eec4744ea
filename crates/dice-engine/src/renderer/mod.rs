pub mod camera;
pub mod instance;

pub use camera::{Camera3D, CameraUniform};
pub use instance::{DieInstance, FlairInstance, LabelInstance, RenderFrame, RingInstance};
