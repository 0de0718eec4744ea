//! Rigid-body service consumed by the roll orchestrator.
//!
//! The orchestrator never talks to a solver directly. It drives dice through
//! [`PhysicsService`], which the rapier-backed [`RapierWorld`] implements for
//! real rolls and [`HeadlessWorld`] implements for tests and headless hosts.

use std::sync::Arc;

use glam::{Quat, Vec3};

pub mod headless;
#[cfg(feature = "physics")]
pub mod rapier;

pub use headless::HeadlessWorld;
#[cfg(feature = "physics")]
pub use rapier::RapierWorld;

/// Opaque id of a die body inside a physics service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BodyHandle(pub u32);

/// World-space position and orientation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Pose {
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::new(Vec3::ZERO, Quat::IDENTITY)
    }
}

/// Physical material properties for a collider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColliderMaterial {
    pub restitution: f32,
    pub friction: f32,
    pub density: f32,
}

impl ColliderMaterial {
    pub fn new(restitution: f32, friction: f32) -> Self {
        Self {
            restitution,
            friction,
            density: 1.0,
        }
    }
}

impl Default for ColliderMaterial {
    fn default() -> Self {
        Self {
            restitution: 0.3,
            friction: 0.5,
            density: 1.0,
        }
    }
}

/// Builder for describing a die body before creation.
#[derive(Debug, Clone)]
pub struct DieBodyDesc {
    /// Convex hull points in body space.
    pub hull: Arc<[Vec3]>,
    pub pose: Pose,
    pub material: ColliderMaterial,
    pub linear_damping: f32,
    pub angular_damping: f32,
}

impl DieBodyDesc {
    pub fn new(hull: Arc<[Vec3]>) -> Self {
        Self {
            hull,
            pose: Pose::default(),
            material: ColliderMaterial::default(),
            linear_damping: 0.0,
            angular_damping: 0.0,
        }
    }

    pub fn with_pose(mut self, pose: Pose) -> Self {
        self.pose = pose;
        self
    }

    pub fn with_material(mut self, material: ColliderMaterial) -> Self {
        self.material = material;
        self
    }

    pub fn with_damping(mut self, linear: f32, angular: f32) -> Self {
        self.linear_damping = linear;
        self.angular_damping = angular;
        self
    }
}

/// Static tray the dice are thrown into: a floor at `y = 0`, four walls and
/// an invisible lid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrayDesc {
    pub half_width: f32,
    pub half_depth: f32,
    /// Visible wall height.
    pub wall_height: f32,
    /// Underside of the lid. Walls collide all the way up to it.
    pub ceiling: f32,
    pub material: ColliderMaterial,
}

/// A die touched something this step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContactEvent {
    pub body: BodyHandle,
    pub position: Vec3,
    /// Closing speed along the contact, before the solver resolved it.
    pub linear_speed: f32,
    pub angular_speed: f32,
}

/// Operations the orchestrator needs from a rigid-body simulation.
///
/// Calls on a handle that no longer exists are ignored; reads return `None`
/// or zero.
pub trait PhysicsService {
    fn create_die_body(&mut self, desc: &DieBodyDesc) -> BodyHandle;
    fn remove_body(&mut self, body: BodyHandle);

    fn pose(&self, body: BodyHandle) -> Option<Pose>;
    fn set_pose(&mut self, body: BodyHandle, pose: Pose);
    /// Overwrite orientation only, leaving position untouched.
    fn set_rotation(&mut self, body: BodyHandle, rotation: Quat);

    fn linear_velocity(&self, body: BodyHandle) -> Vec3;
    fn angular_velocity(&self, body: BodyHandle) -> Vec3;
    fn set_velocities(&mut self, body: BodyHandle, linear: Vec3, angular: Vec3);

    /// Impulses act as on a body of unit mass and inertia: the velocity
    /// change is the same for every die whatever its size.
    fn apply_impulse(&mut self, body: BodyHandle, impulse: Vec3);
    fn apply_torque_impulse(&mut self, body: BodyHandle, torque: Vec3);

    /// Freeze or release every degree of freedom of a body.
    fn set_locked(&mut self, body: BodyHandle, locked: bool);

    /// Replace the tray colliders.
    fn build_tray(&mut self, tray: &TrayDesc);

    /// Advance by `dt` seconds and append contacts that started during it.
    fn step(&mut self, dt: f32, contacts: &mut Vec<ContactEvent>);

    /// Remove every body, tray included.
    fn clear(&mut self);

    /// Number of die bodies.
    fn body_count(&self) -> usize;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_pattern() {
        let hull: Arc<[Vec3]> = Arc::from(vec![Vec3::X, Vec3::Y, Vec3::Z]);
        let desc = DieBodyDesc::new(hull)
            .with_pose(Pose::new(Vec3::new(1.0, 2.0, 3.0), Quat::IDENTITY))
            .with_material(ColliderMaterial::new(0.4, 0.65))
            .with_damping(0.5, 0.25);

        assert_eq!(desc.hull.len(), 3);
        assert_eq!(desc.pose.position, Vec3::new(1.0, 2.0, 3.0));
        assert!((desc.material.restitution - 0.4).abs() < 0.001);
        assert!((desc.material.density - 1.0).abs() < 0.001);
        assert!((desc.linear_damping - 0.5).abs() < 0.001);
        assert!((desc.angular_damping - 0.25).abs() < 0.001);
    }

    #[test]
    fn collider_material_defaults() {
        let mat = ColliderMaterial::default();
        assert!((mat.restitution - 0.3).abs() < 0.001);
        assert!((mat.friction - 0.5).abs() < 0.001);
        assert!((mat.density - 1.0).abs() < 0.001);
    }
}
