//! Point lights for the dice tray.
//!
//! The theme contributes persistent fill lights; impact flashes are added
//! on top each frame and cleared by [`LightState::begin_frame`].

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

use crate::assets::theme::ThemeConfig;

/// A 3D point light.
///
/// Wire format (8 floats / 32 bytes):
/// `[x, y, z, r, g, b, intensity, radius]`. A radius of zero means no falloff.
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
#[repr(C)]
pub struct PointLight {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub intensity: f32,
    pub radius: f32,
}

impl PointLight {
    pub const FLOATS: usize = 8;

    /// Create a new point light at the given position.
    ///
    /// - `color`: RGB color (typically [0..1] but can exceed 1.0 for HDR)
    /// - `radius`: Falloff distance in world units
    pub fn new(pos: Vec3, color: [f32; 3], intensity: f32, radius: f32) -> Self {
        Self {
            x: pos.x,
            y: pos.y,
            z: pos.z,
            r: color[0],
            g: color[1],
            b: color[2],
            intensity,
            radius,
        }
    }

    pub fn position(&self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }
}

/// Lights for one frame plus the ambient term.
pub struct LightState {
    base: Vec<PointLight>,
    lights: Vec<PointLight>,
    ambient: [f32; 3],
    capacity: usize,
}

impl LightState {
    pub fn new(capacity: usize) -> Self {
        Self {
            base: Vec::new(),
            lights: Vec::with_capacity(capacity),
            ambient: [0.4, 0.4, 0.4],
            capacity,
        }
    }

    /// Theme fill lights: a particle-tinted point and an accent rim.
    pub fn themed(theme: &ThemeConfig, capacity: usize) -> Self {
        let mut state = Self::new(capacity);
        state.base = vec![
            PointLight::new(Vec3::new(6.0, 7.0, -8.0), theme.particle.rgb_f32(), 0.6, 0.0),
            PointLight::new(Vec3::new(-8.0, 12.0, -6.0), theme.accent.rgb_f32(), 0.7, 0.0),
        ];
        state.base.truncate(capacity);
        state.begin_frame();
        state
    }

    /// Reset to the persistent lights.
    pub fn begin_frame(&mut self) {
        self.lights.clear();
        self.lights.extend_from_slice(&self.base);
    }

    /// Add a transient light. Returns `false` when the frame is full.
    pub fn add(&mut self, light: PointLight) -> bool {
        if self.lights.len() >= self.capacity {
            return false;
        }
        self.lights.push(light);
        true
    }

    pub fn lights(&self) -> &[PointLight] {
        &self.lights
    }

    /// Number of active lights.
    pub fn count(&self) -> usize {
        self.lights.len()
    }

    pub fn set_ambient(&mut self, r: f32, g: f32, b: f32) {
        self.ambient = [r, g, b];
    }

    pub fn ambient(&self) -> [f32; 3] {
        self.ambient
    }
}
