use glam::{Quat, Vec3};

use super::{BodyHandle, ContactEvent, DieBodyDesc, PhysicsService, Pose, TrayDesc};

/// Damping applied on top of each body's own, per second.
const DEFAULT_EXTRA_DAMPING: f32 = 2.5;

#[derive(Debug, Clone)]
struct HeadlessBody {
    pose: Pose,
    linvel: Vec3,
    angvel: Vec3,
    linear_damping: f32,
    angular_damping: f32,
    locked: bool,
}

/// Solver-less physics service.
///
/// Bodies have unit mass and inertia, feel no gravity and never collide.
/// Velocities decay exponentially so a launched die calms down on its own.
/// Contacts are only produced by [`HeadlessWorld::inject_contact`].
pub struct HeadlessWorld {
    bodies: Vec<Option<HeadlessBody>>,
    extra_damping: f32,
    pending: Vec<ContactEvent>,
    tray: Option<TrayDesc>,
    steps: u64,
}

impl HeadlessWorld {
    pub fn new() -> Self {
        Self {
            bodies: Vec::new(),
            extra_damping: DEFAULT_EXTRA_DAMPING,
            pending: Vec::new(),
            tray: None,
            steps: 0,
        }
    }

    /// Override the damping added to every body. Zero keeps bodies moving
    /// forever unless their own damping is nonzero.
    pub fn with_extra_damping(mut self, damping: f32) -> Self {
        self.extra_damping = damping;
        self
    }

    /// Queue a contact to be reported by the next step.
    pub fn inject_contact(&mut self, event: ContactEvent) {
        self.pending.push(event);
    }

    pub fn tray(&self) -> Option<&TrayDesc> {
        self.tray.as_ref()
    }

    pub fn is_locked(&self, body: BodyHandle) -> bool {
        self.body(body).map(|b| b.locked).unwrap_or(false)
    }

    /// Number of completed steps.
    pub fn steps(&self) -> u64 {
        self.steps
    }

    fn body(&self, handle: BodyHandle) -> Option<&HeadlessBody> {
        self.bodies.get(handle.0 as usize)?.as_ref()
    }

    fn body_mut(&mut self, handle: BodyHandle) -> Option<&mut HeadlessBody> {
        self.bodies.get_mut(handle.0 as usize)?.as_mut()
    }
}

impl Default for HeadlessWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsService for HeadlessWorld {
    fn create_die_body(&mut self, desc: &DieBodyDesc) -> BodyHandle {
        let body = HeadlessBody {
            pose: desc.pose,
            linvel: Vec3::ZERO,
            angvel: Vec3::ZERO,
            linear_damping: desc.linear_damping,
            angular_damping: desc.angular_damping,
            locked: false,
        };
        match self.bodies.iter().position(Option::is_none) {
            Some(free) => {
                self.bodies[free] = Some(body);
                BodyHandle(free as u32)
            }
            None => {
                self.bodies.push(Some(body));
                BodyHandle(self.bodies.len() as u32 - 1)
            }
        }
    }

    fn remove_body(&mut self, body: BodyHandle) {
        if let Some(slot) = self.bodies.get_mut(body.0 as usize) {
            *slot = None;
        }
    }

    fn pose(&self, body: BodyHandle) -> Option<Pose> {
        self.body(body).map(|b| b.pose)
    }

    fn set_pose(&mut self, body: BodyHandle, pose: Pose) {
        if let Some(b) = self.body_mut(body) {
            b.pose = pose;
        }
    }

    fn set_rotation(&mut self, body: BodyHandle, rotation: Quat) {
        if let Some(b) = self.body_mut(body) {
            b.pose.rotation = rotation.normalize();
        }
    }

    fn linear_velocity(&self, body: BodyHandle) -> Vec3 {
        self.body(body).map(|b| b.linvel).unwrap_or(Vec3::ZERO)
    }

    fn angular_velocity(&self, body: BodyHandle) -> Vec3 {
        self.body(body).map(|b| b.angvel).unwrap_or(Vec3::ZERO)
    }

    fn set_velocities(&mut self, body: BodyHandle, linear: Vec3, angular: Vec3) {
        if let Some(b) = self.body_mut(body) {
            b.linvel = linear;
            b.angvel = angular;
        }
    }

    fn apply_impulse(&mut self, body: BodyHandle, impulse: Vec3) {
        if let Some(b) = self.body_mut(body) {
            if !b.locked {
                b.linvel += impulse;
            }
        }
    }

    fn apply_torque_impulse(&mut self, body: BodyHandle, torque: Vec3) {
        if let Some(b) = self.body_mut(body) {
            if !b.locked {
                b.angvel += torque;
            }
        }
    }

    fn set_locked(&mut self, body: BodyHandle, locked: bool) {
        if let Some(b) = self.body_mut(body) {
            b.locked = locked;
            if locked {
                b.linvel = Vec3::ZERO;
                b.angvel = Vec3::ZERO;
            }
        }
    }

    fn build_tray(&mut self, tray: &TrayDesc) {
        self.tray = Some(*tray);
    }

    fn step(&mut self, dt: f32, contacts: &mut Vec<ContactEvent>) {
        let extra = self.extra_damping;
        for body in self.bodies.iter_mut().flatten() {
            if body.locked {
                continue;
            }
            body.linvel *= (-(body.linear_damping + extra) * dt).exp();
            body.angvel *= (-(body.angular_damping + extra) * dt).exp();
            body.pose.position += body.linvel * dt;
            let spin = Quat::from_scaled_axis(body.angvel * dt);
            body.pose.rotation = (spin * body.pose.rotation).normalize();
        }
        contacts.append(&mut self.pending);
        self.steps += 1;
    }

    fn clear(&mut self) {
        self.bodies.clear();
        self.pending.clear();
        self.tray = None;
    }

    fn body_count(&self) -> usize {
        self.bodies.iter().flatten().count()
    }
}
