use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec3};

use crate::systems::layout::CameraRig;

/// Fraction of the remaining distance back to the resting pose covered per
/// 60 Hz frame once shake has died out.
const RETURN_RATE: f32 = 0.12;

/// Perspective camera looking into the tray.
///
/// The resting pose comes from the tray layout. Shake perturbs the eye
/// position around that pose and the camera eases back when shake ends.
pub struct Camera3D {
    /// Current eye position in world space.
    pub position: Vec3,
    /// Point the camera looks at.
    pub target: Vec3,
    /// Vertical field of view in degrees.
    pub fov_degrees: f32,
    /// Viewport width / height.
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
    /// Orbit distance limits (min, max).
    pub distance_limits: (f32, f32),
    rest: Vec3,
}

/// GPU-side uniform data for the camera.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct CameraUniform {
    pub view_projection: [[f32; 4]; 4],
    /// Eye position; `w` is the field of view in degrees.
    pub eye: [f32; 4],
}

impl CameraUniform {
    pub const FLOATS: usize = 20;
}

impl Camera3D {
    pub fn new(aspect: f32) -> Self {
        let rest = Vec3::new(0.0, 4.6, 8.0);
        Self {
            position: rest,
            target: Vec3::ZERO,
            fov_degrees: 48.0,
            aspect: aspect.max(1e-3),
            near: 0.1,
            far: 100.0,
            distance_limits: (5.0, 12.8),
            rest,
        }
    }

    pub fn from_rig(rig: &CameraRig, aspect: f32) -> Self {
        let mut camera = Self::new(aspect);
        camera.set_rig(rig);
        camera
    }

    /// Adopt a new resting pose. Snaps immediately.
    pub fn set_rig(&mut self, rig: &CameraRig) {
        self.rest = rig.position;
        self.position = rig.position;
        self.target = rig.target;
        self.fov_degrees = rig.fov_degrees;
        self.distance_limits = (rig.min_distance, rig.max_distance);
    }

    /// Resting eye position.
    pub fn rest(&self) -> Vec3 {
        self.rest
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, Vec3::Y)
    }

    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_degrees.to_radians(), self.aspect, self.near, self.far)
    }

    pub fn uniform(&self) -> CameraUniform {
        let view_projection = self.projection_matrix() * self.view_matrix();
        CameraUniform {
            view_projection: view_projection.to_cols_array_2d(),
            eye: self.position.extend(self.fov_degrees).to_array(),
        }
    }

    /// Update the aspect ratio on viewport resize.
    pub fn resize(&mut self, viewport_width: f32, viewport_height: f32) {
        if viewport_width > 0.0 && viewport_height > 0.0 {
            self.aspect = viewport_width / viewport_height;
        }
    }

    /// Place the eye at `rest + offset` while shaking, otherwise ease back
    /// toward the resting pose.
    pub fn apply_shake(&mut self, offset: Vec3, shaking: bool, dt: f32) {
        if shaking {
            self.position = self.rest + offset;
        } else {
            let t = 1.0 - (1.0 - RETURN_RATE).powf(dt * 60.0);
            self.position += (self.rest - self.position) * t;
        }
    }

    /// Move the resting eye to `distance` from the target, clamped to the
    /// orbit limits.
    pub fn set_orbit_distance(&mut self, distance: f32) {
        let (min, max) = self.distance_limits;
        let dir = (self.rest - self.target).normalize_or(Vec3::Z);
        self.rest = self.target + dir * distance.clamp(min, max);
        self.position = self.rest;
    }

    pub fn orbit_distance(&self) -> f32 {
        (self.rest - self.target).length()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::systems::layout::TrayLayout;

    #[test]
    fn projection_is_perspective() {
        let cam = Camera3D::new(16.0 / 9.0);
        let cols = cam.projection_matrix().to_cols_array_2d();
        assert!((cols[2][3] + 1.0).abs() < 1e-6);
        assert!(cols[3][3].abs() < 1e-6);
    }

    #[test]
    fn target_projects_to_screen_center() {
        let cam = Camera3D::from_rig(&TrayLayout::for_count(6).camera(), 1.5);
        let clip = Mat4::from_cols_array_2d(&cam.uniform().view_projection)
            * cam.target.extend(1.0);
        let ndc = clip / clip.w;
        assert!(ndc.x.abs() < 1e-4 && ndc.y.abs() < 1e-4);
        assert!(ndc.z > 0.0 && ndc.z < 1.0);
    }

    #[test]
    fn rig_sets_pose_and_limits() {
        let rig = TrayLayout::for_count(12).camera();
        let cam = Camera3D::from_rig(&rig, 1.0);
        assert_eq!(cam.position, rig.position);
        assert_eq!(cam.fov_degrees, rig.fov_degrees);
        assert_eq!(cam.distance_limits, (rig.min_distance, rig.max_distance));
    }

    #[test]
    fn resize_updates_aspect() {
        let mut cam = Camera3D::new(1.0);
        cam.resize(1920.0, 1080.0);
        assert!((cam.aspect - 1920.0 / 1080.0).abs() < 1e-6);
        cam.resize(0.0, 100.0);
        assert!((cam.aspect - 1920.0 / 1080.0).abs() < 1e-6);
    }

    #[test]
    fn shake_offsets_then_eases_back() {
        let mut cam = Camera3D::new(1.0);
        let rest = cam.rest();
        cam.apply_shake(Vec3::new(0.2, -0.1, 0.05), true, 1.0 / 60.0);
        assert!((cam.position - rest - Vec3::new(0.2, -0.1, 0.05)).length() < 1e-6);

        cam.apply_shake(Vec3::ZERO, false, 1.0 / 60.0);
        let after_one = (cam.position - rest).length();
        assert!(after_one < 0.23 && after_one > 0.15);

        for _ in 0..120 {
            cam.apply_shake(Vec3::ZERO, false, 1.0 / 60.0);
        }
        assert!((cam.position - rest).length() < 1e-4);
    }

    #[test]
    fn orbit_distance_is_clamped() {
        let rig = TrayLayout::for_count(1).camera();
        let mut cam = Camera3D::from_rig(&rig, 1.0);
        cam.set_orbit_distance(0.5);
        assert!((cam.orbit_distance() - rig.min_distance).abs() < 1e-4);
        cam.set_orbit_distance(1000.0);
        assert!((cam.orbit_distance() - rig.max_distance).abs() < 1e-4);
    }
}
