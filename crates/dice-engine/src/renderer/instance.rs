use bytemuck::{Pod, Zeroable};
use glam::{Quat, Vec3};

use crate::assets::texture::TextureHandle;
use crate::renderer::camera::CameraUniform;
use crate::systems::lighting::PointLight;

/// Texture reference on the wire: the texture id, or `-1` with a flat color.
pub fn texture_slot(handle: TextureHandle) -> (f32, [f32; 4]) {
    match handle {
        TextureHandle::Image(id) => (id.0 as f32, [1.0; 4]),
        TextureHandle::Flat(color) => (-1.0, color.to_f32()),
    }
}

/// One die body. 16 floats.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, Pod, Zeroable)]
pub struct DieInstance {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub qx: f32,
    pub qy: f32,
    pub qz: f32,
    pub qw: f32,
    pub scale: f32,
    /// Side count; selects the mesh.
    pub sides: f32,
    /// Emissive strength after the idle pulse.
    pub emissive: f32,
    pub bloom_opacity: f32,
    pub edge_opacity: f32,
    /// Number of sparkle particles around the die.
    pub sparkles: f32,
    /// 0 none, 1 critical, 2 fumble.
    pub highlight: f32,
    /// Bloom sprite texture id, `-1` when flat.
    pub bloom_texture: f32,
    pub _pad: f32,
}

impl DieInstance {
    pub const FLOATS: usize = 16;

    pub fn set_pose(&mut self, position: Vec3, rotation: Quat) {
        [self.x, self.y, self.z] = position.to_array();
        [self.qx, self.qy, self.qz, self.qw] = rotation.to_array();
    }
}

/// One face decal, already placed in world space. 16 floats.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, Pod, Zeroable)]
pub struct LabelInstance {
    /// Index of the owning die.
    pub die: f32,
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub qx: f32,
    pub qy: f32,
    pub qz: f32,
    pub qw: f32,
    pub size: f32,
    pub texture: f32,
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
    /// Face value the decal sits on.
    pub value: f32,
    pub _pad: f32,
}

impl LabelInstance {
    pub const FLOATS: usize = 16;
}

/// Ring and sigil hovering over one die. 12 floats.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, Pod, Zeroable)]
pub struct FlairInstance {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub ring_yaw: f32,
    pub ring_tilt: f32,
    pub ring_scale: f32,
    pub ring_opacity: f32,
    pub ring_count: f32,
    pub glyph_scale: f32,
    pub glyph_opacity: f32,
    pub texture: f32,
    pub _pad: f32,
}

impl FlairInstance {
    pub const FLOATS: usize = 12;
}

/// Expanding impact ring on the tray floor. 8 floats.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, Pod, Zeroable)]
pub struct RingInstance {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub scale: f32,
    pub opacity: f32,
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl RingInstance {
    pub const FLOATS: usize = 8;
}

/// Everything the host renderer needs for one frame.
pub struct RenderFrame {
    pub dice: Vec<DieInstance>,
    pub labels: Vec<LabelInstance>,
    pub flair: Vec<FlairInstance>,
    pub rings: Vec<RingInstance>,
    pub lights: Vec<PointLight>,
    pub ambient: [f32; 3],
    pub camera: CameraUniform,
    /// Ambient glow under the tray, when the quality profile allows it.
    pub bloom_field: Option<TextureHandle>,
    /// Current camera shake scalar.
    pub shake: f32,
}

impl RenderFrame {
    pub fn new() -> Self {
        Self {
            dice: Vec::with_capacity(24),
            labels: Vec::with_capacity(24 * 20),
            flair: Vec::with_capacity(24),
            rings: Vec::with_capacity(8),
            lights: Vec::with_capacity(8),
            ambient: [0.0; 3],
            camera: CameraUniform::zeroed(),
            bloom_field: None,
            shake: 0.0,
        }
    }

    pub fn clear(&mut self) {
        self.dice.clear();
        self.labels.clear();
        self.flair.clear();
        self.rings.clear();
        self.lights.clear();
        self.bloom_field = None;
        self.shake = 0.0;
    }

    pub fn die_count(&self) -> u32 {
        self.dice.len() as u32
    }
}

impl Default for RenderFrame {
    fn default() -> Self {
        Self::new()
    }
}
