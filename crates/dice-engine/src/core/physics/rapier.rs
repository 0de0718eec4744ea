use glam::{Quat, Vec3};
use rapier3d::prelude::*;
use std::sync::{Mutex, PoisonError};

use super::{BodyHandle, ContactEvent, DieBodyDesc, PhysicsService, Pose, TrayDesc};
use crate::core::time::FixedTimestep;

/// Solver substep length in seconds.
pub const SUBSTEP: f32 = 1.0 / 120.0;
const FLOOR_THICKNESS: f32 = 0.2;
const WALL_THICKNESS: f32 = 0.4;

// ---------------------------------------------------------------------------
// Conversion helpers: glam to nalgebra and back
// ---------------------------------------------------------------------------

fn vec3_to_na(v: Vec3) -> nalgebra::Vector3<f32> {
    nalgebra::Vector3::new(v.x, v.y, v.z)
}

fn na_to_vec3(v: &nalgebra::Vector3<f32>) -> Vec3 {
    Vec3::new(v.x, v.y, v.z)
}

fn quat_to_na(q: Quat) -> nalgebra::UnitQuaternion<f32> {
    nalgebra::UnitQuaternion::from_quaternion(nalgebra::Quaternion::new(q.w, q.x, q.y, q.z))
}

fn na_to_quat(q: &nalgebra::UnitQuaternion<f32>) -> Quat {
    Quat::from_xyzw(q.i, q.j, q.k, q.w).normalize()
}

fn pose_to_iso(pose: Pose) -> nalgebra::Isometry3<f32> {
    nalgebra::Isometry3::from_parts(
        nalgebra::Translation3::new(pose.position.x, pose.position.y, pose.position.z),
        quat_to_na(pose.rotation),
    )
}

// ---------------------------------------------------------------------------
// WASM-safe event collector (no crossbeam)
// ---------------------------------------------------------------------------

struct DirectEventCollector {
    collisions: Mutex<Vec<CollisionEvent>>,
}

impl DirectEventCollector {
    fn new() -> Self {
        Self {
            collisions: Mutex::new(Vec::new()),
        }
    }

    fn drain_collisions(&self) -> Vec<CollisionEvent> {
        let mut guard = self.collisions.lock().unwrap_or_else(PoisonError::into_inner);
        std::mem::take(&mut *guard)
    }
}

impl EventHandler for DirectEventCollector {
    fn handle_collision_event(
        &self,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        event: CollisionEvent,
        _contact_pair: Option<&ContactPair>,
    ) {
        self.collisions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }

    fn handle_contact_force_event(
        &self,
        _dt: f32,
        _bodies: &RigidBodySet,
        _colliders: &ColliderSet,
        _contact_pair: &ContactPair,
        _total_force_magnitude: f32,
    ) {
    }
}

// ---------------------------------------------------------------------------
// RapierWorld
// ---------------------------------------------------------------------------

/// Rapier3D-backed physics service with a fixed substep.
pub struct RapierWorld {
    gravity: nalgebra::Vector3<f32>,
    integration_parameters: IntegrationParameters,
    physics_pipeline: PhysicsPipeline,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
    event_collector: DirectEventCollector,
    timestep: FixedTimestep,
    /// Die slots; `user_data` on each body is its index plus one.
    dice: Vec<Option<RigidBodyHandle>>,
    tray: Option<RigidBodyHandle>,
    /// Die velocities at the start of the current substep.
    pre_step: Vec<(Vec3, Vec3)>,
}

impl RapierWorld {
    /// Create a world with gravity along Y (negative is down).
    pub fn new(gravity_y: f32) -> Self {
        let mut integration_parameters = IntegrationParameters::default();
        integration_parameters.dt = SUBSTEP;
        Self {
            gravity: nalgebra::Vector3::new(0.0, gravity_y, 0.0),
            integration_parameters,
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies: RigidBodySet::new(),
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            event_collector: DirectEventCollector::new(),
            timestep: FixedTimestep::new(SUBSTEP),
            dice: Vec::new(),
            tray: None,
            pre_step: Vec::new(),
        }
    }

    fn rigid_body(&self, body: BodyHandle) -> Option<&RigidBody> {
        let handle = (*self.dice.get(body.0 as usize)?)?;
        self.bodies.get(handle)
    }

    fn rigid_body_mut(&mut self, body: BodyHandle) -> Option<&mut RigidBody> {
        let handle = (*self.dice.get(body.0 as usize)?)?;
        self.bodies.get_mut(handle)
    }

    fn remove_rigid_body(&mut self, handle: RigidBodyHandle) {
        self.bodies.remove(
            handle,
            &mut self.island_manager,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            true,
        );
    }

    fn collider_to_die(&self, collider_handle: ColliderHandle) -> Option<BodyHandle> {
        let collider = self.colliders.get(collider_handle)?;
        let body = self.bodies.get(collider.parent()?)?;
        match body.user_data {
            0 => None,
            id => Some(BodyHandle((id - 1) as u32)),
        }
    }

    fn snapshot_velocities(&mut self) {
        self.pre_step.clear();
        for slot in &self.dice {
            let velocities = slot
                .and_then(|h| self.bodies.get(h))
                .map(|rb| (na_to_vec3(rb.linvel()), na_to_vec3(rb.angvel())))
                .unwrap_or((Vec3::ZERO, Vec3::ZERO));
            self.pre_step.push(velocities);
        }
    }

    fn pre_step_velocity(&self, body: Option<BodyHandle>) -> (Vec3, Vec3) {
        body.and_then(|b| self.pre_step.get(b.0 as usize).copied())
            .unwrap_or((Vec3::ZERO, Vec3::ZERO))
    }

    fn substep(&mut self, contacts: &mut Vec<ContactEvent>) {
        self.snapshot_velocities();
        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &self.event_collector,
        );

        for event in self.event_collector.drain_collisions() {
            let CollisionEvent::Started(h1, h2, _) = event else {
                continue;
            };
            let (a, b) = (self.collider_to_die(h1), self.collider_to_die(h2));
            let (va, wa) = self.pre_step_velocity(a);
            let (vb, wb) = self.pre_step_velocity(b);
            let closing = (va - vb).length();
            for (die, spin) in [(a, wa), (b, wb)] {
                let Some(die) = die else { continue };
                let position = self.pose(die).map(|p| p.position).unwrap_or(Vec3::ZERO);
                contacts.push(ContactEvent {
                    body: die,
                    position,
                    linear_speed: closing,
                    angular_speed: spin.length(),
                });
            }
        }
    }
}

impl PhysicsService for RapierWorld {
    fn create_die_body(&mut self, desc: &DieBodyDesc) -> BodyHandle {
        let free = self.dice.iter().position(Option::is_none);
        let handle = BodyHandle(free.unwrap_or(self.dice.len()) as u32);
        let rb = RigidBodyBuilder::dynamic()
            .position(pose_to_iso(desc.pose))
            .ccd_enabled(true)
            .linear_damping(desc.linear_damping)
            .angular_damping(desc.angular_damping)
            .user_data(handle.0 as u128 + 1)
            .build();
        let body_handle = self.bodies.insert(rb);

        let points: Vec<nalgebra::Point3<f32>> = desc
            .hull
            .iter()
            .map(|p| nalgebra::Point3::new(p.x, p.y, p.z))
            .collect();
        let shape = ColliderBuilder::convex_hull(&points).unwrap_or_else(|| {
            log::warn!("degenerate die hull ({} points); using a unit cube", points.len());
            ColliderBuilder::cuboid(0.5, 0.5, 0.5)
        });
        let collider = shape
            .restitution(desc.material.restitution)
            .friction(desc.material.friction)
            .density(desc.material.density)
            .active_events(ActiveEvents::COLLISION_EVENTS)
            .build();
        self.colliders
            .insert_with_parent(collider, body_handle, &mut self.bodies);

        match free {
            Some(index) => self.dice[index] = Some(body_handle),
            None => self.dice.push(Some(body_handle)),
        }
        handle
    }

    fn remove_body(&mut self, body: BodyHandle) {
        let Some(slot) = self.dice.get_mut(body.0 as usize) else {
            return;
        };
        if let Some(handle) = slot.take() {
            self.remove_rigid_body(handle);
        }
    }

    fn pose(&self, body: BodyHandle) -> Option<Pose> {
        self.rigid_body(body)
            .map(|rb| Pose::new(na_to_vec3(rb.translation()), na_to_quat(rb.rotation())))
    }

    fn set_pose(&mut self, body: BodyHandle, pose: Pose) {
        if let Some(rb) = self.rigid_body_mut(body) {
            rb.set_position(pose_to_iso(pose), true);
        }
    }

    fn set_rotation(&mut self, body: BodyHandle, rotation: Quat) {
        if let Some(rb) = self.rigid_body_mut(body) {
            rb.set_rotation(quat_to_na(rotation), true);
        }
    }

    fn linear_velocity(&self, body: BodyHandle) -> Vec3 {
        self.rigid_body(body)
            .map(|rb| na_to_vec3(rb.linvel()))
            .unwrap_or(Vec3::ZERO)
    }

    fn angular_velocity(&self, body: BodyHandle) -> Vec3 {
        self.rigid_body(body)
            .map(|rb| na_to_vec3(rb.angvel()))
            .unwrap_or(Vec3::ZERO)
    }

    fn set_velocities(&mut self, body: BodyHandle, linear: Vec3, angular: Vec3) {
        if let Some(rb) = self.rigid_body_mut(body) {
            rb.set_linvel(vec3_to_na(linear), true);
            rb.set_angvel(vec3_to_na(angular), true);
        }
    }

    fn apply_impulse(&mut self, body: BodyHandle, impulse: Vec3) {
        if let Some(rb) = self.rigid_body_mut(body) {
            let linvel = *rb.linvel() + vec3_to_na(impulse);
            rb.set_linvel(linvel, true);
        }
    }

    fn apply_torque_impulse(&mut self, body: BodyHandle, torque: Vec3) {
        if let Some(rb) = self.rigid_body_mut(body) {
            let angvel = *rb.angvel() + vec3_to_na(torque);
            rb.set_angvel(angvel, true);
        }
    }

    fn set_locked(&mut self, body: BodyHandle, locked: bool) {
        if let Some(rb) = self.rigid_body_mut(body) {
            if locked {
                rb.set_linvel(nalgebra::Vector3::zeros(), false);
                rb.set_angvel(nalgebra::Vector3::zeros(), false);
                rb.set_locked_axes(LockedAxes::all(), true);
            } else {
                rb.set_locked_axes(LockedAxes::empty(), true);
            }
        }
    }

    fn build_tray(&mut self, tray: &TrayDesc) {
        if let Some(old) = self.tray.take() {
            self.remove_rigid_body(old);
        }
        let body = self.bodies.insert(RigidBodyBuilder::fixed().build());
        let top = tray.ceiling.max(tray.wall_height);
        let (hw, hd, hh) = (tray.half_width, tray.half_depth, top / 2.0);
        let half_wall = WALL_THICKNESS / 2.0;
        let (span_w, span_d) = (hw + WALL_THICKNESS, hd + WALL_THICKNESS);
        let parts = [
            // Floor, top face at y = 0.
            (vector![span_w, FLOOR_THICKNESS / 2.0, span_d], vector![0.0, -FLOOR_THICKNESS / 2.0, 0.0]),
            (vector![hw, hh, half_wall], vector![0.0, hh, -hd]),
            (vector![hw, hh, half_wall], vector![0.0, hh, hd]),
            (vector![half_wall, hh, hd], vector![-hw, hh, 0.0]),
            (vector![half_wall, hh, hd], vector![hw, hh, 0.0]),
            // Lid, underside at `top`.
            (vector![span_w, FLOOR_THICKNESS / 2.0, span_d], vector![0.0, top + FLOOR_THICKNESS / 2.0, 0.0]),
        ];
        for (half, at) in parts {
            let collider = ColliderBuilder::cuboid(half.x, half.y, half.z)
                .translation(at)
                .restitution(tray.material.restitution)
                .friction(tray.material.friction)
                .build();
            self.colliders
                .insert_with_parent(collider, body, &mut self.bodies);
        }
        self.tray = Some(body);
    }

    fn step(&mut self, dt: f32, contacts: &mut Vec<ContactEvent>) {
        let steps = self.timestep.accumulate(dt);
        for _ in 0..steps {
            self.substep(contacts);
        }
    }

    fn clear(&mut self) {
        let handles: Vec<RigidBodyHandle> = self
            .dice
            .drain(..)
            .flatten()
            .chain(self.tray.take())
            .collect();
        for handle in handles {
            self.remove_rigid_body(handle);
        }
        self.pre_step.clear();
        self.timestep.reset();
    }

    fn body_count(&self) -> usize {
        self.dice.iter().flatten().count()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::physics::ColliderMaterial;
    use std::sync::Arc;

    fn cube_desc(at: Vec3) -> DieBodyDesc {
        let mut hull = Vec::new();
        for x in [-0.5, 0.5] {
            for y in [-0.5, 0.5] {
                for z in [-0.5, 0.5] {
                    hull.push(Vec3::new(x, y, z));
                }
            }
        }
        let hull: Arc<[Vec3]> = Arc::from(hull);
        DieBodyDesc::new(hull).with_pose(Pose::new(at, Quat::IDENTITY))
    }

    fn tray() -> TrayDesc {
        TrayDesc {
            half_width: 5.0,
            half_depth: 4.0,
            wall_height: 1.6,
            ceiling: 8.0,
            material: ColliderMaterial::new(0.32, 0.75),
        }
    }

    #[test]
    fn create_and_remove_body() {
        let mut world = RapierWorld::new(-28.0);
        let body = world.create_die_body(&cube_desc(Vec3::ZERO));
        assert_eq!(world.body_count(), 1);
        world.remove_body(body);
        assert_eq!(world.body_count(), 0);
        assert!(world.pose(body).is_none());
        world.remove_body(body);
    }

    #[test]
    fn removed_slots_are_reused() {
        let mut world = RapierWorld::new(-28.0);
        let first = world.create_die_body(&cube_desc(Vec3::ZERO));
        let second = world.create_die_body(&cube_desc(Vec3::X * 2.0));
        for _ in 0..10 {
            world.remove_body(first);
            let again = world.create_die_body(&cube_desc(Vec3::ZERO));
            assert_eq!(again, first);
        }
        assert_eq!(world.dice.len(), 2);
        assert_eq!(world.bodies.len(), 2);
        assert!(world.pose(second).is_some());
        let rb = world.rigid_body(first).unwrap();
        assert_eq!(rb.user_data, first.0 as u128 + 1);
    }

    #[test]
    fn gravity_pulls_die_down() {
        let mut world = RapierWorld::new(-28.0);
        let body = world.create_die_body(&cube_desc(Vec3::new(0.0, 5.0, 0.0)));
        let mut contacts = Vec::new();
        for _ in 0..10 {
            world.step(1.0 / 60.0, &mut contacts);
        }
        let pose = world.pose(body).unwrap();
        assert!(pose.position.y < 5.0, "die should fall: y={}", pose.position.y);
    }

    #[test]
    fn die_lands_on_tray_and_reports_contact() {
        let mut world = RapierWorld::new(-28.0);
        world.build_tray(&tray());
        let body = world.create_die_body(&cube_desc(Vec3::new(0.0, 2.0, 0.0)));

        let mut contacts = Vec::new();
        for _ in 0..180 {
            world.step(1.0 / 60.0, &mut contacts);
        }
        let pose = world.pose(body).unwrap();
        assert!(
            (pose.position.y - 0.5).abs() < 0.1,
            "cube should rest on the floor: y={}",
            pose.position.y
        );
        assert!(!contacts.is_empty(), "landing should report a contact");
        assert!(contacts.iter().all(|c| c.body == body));
        assert!(contacts[0].linear_speed > 1.0, "{:?}", contacts[0]);
    }

    #[test]
    fn rebuilding_tray_replaces_it() {
        let mut world = RapierWorld::new(-28.0);
        world.build_tray(&tray());
        let colliders = world.colliders.len();
        world.build_tray(&tray());
        assert_eq!(world.colliders.len(), colliders);
        assert_eq!(world.body_count(), 0);
    }

    #[test]
    fn set_rotation_keeps_translation() {
        let mut world = RapierWorld::new(0.0);
        let body = world.create_die_body(&cube_desc(Vec3::new(1.0, 2.0, 3.0)));
        let target = Quat::from_rotation_z(0.7);
        world.set_rotation(body, target);
        let pose = world.pose(body).unwrap();
        assert!((pose.position - Vec3::new(1.0, 2.0, 3.0)).length() < 1e-5);
        assert!(pose.rotation.angle_between(target) < 1e-4);
    }

    #[test]
    fn locked_die_stays_put() {
        let mut world = RapierWorld::new(-28.0);
        let body = world.create_die_body(&cube_desc(Vec3::new(0.0, 3.0, 0.0)));
        world.set_locked(body, true);
        let mut contacts = Vec::new();
        for _ in 0..30 {
            world.step(1.0 / 60.0, &mut contacts);
        }
        assert!((world.pose(body).unwrap().position.y - 3.0).abs() < 1e-4);

        world.set_locked(body, false);
        for _ in 0..10 {
            world.step(1.0 / 60.0, &mut contacts);
        }
        assert!(world.pose(body).unwrap().position.y < 3.0);
    }

    #[test]
    fn impulses_change_velocity() {
        let mut world = RapierWorld::new(0.0);
        let body = world.create_die_body(&cube_desc(Vec3::ZERO));
        world.apply_impulse(body, Vec3::new(5.0, 0.0, 0.0));
        world.apply_torque_impulse(body, Vec3::new(0.0, 1.0, 0.0));
        world.step(1.0 / 60.0, &mut Vec::new());
        assert!(world.linear_velocity(body).x > 0.0);
        assert!(world.angular_velocity(body).y > 0.0);

        world.set_velocities(body, Vec3::ZERO, Vec3::ZERO);
        assert_eq!(world.linear_velocity(body), Vec3::ZERO);
    }

    #[test]
    fn impulse_ignores_body_size() {
        let mut world = RapierWorld::new(0.0);
        let small = world.create_die_body(&cube_desc(Vec3::new(-3.0, 0.0, 0.0)));
        let big_hull: Arc<[Vec3]> = cube_desc(Vec3::ZERO).hull.iter().map(|p| *p * 3.0).collect();
        let big = world.create_die_body(
            &DieBodyDesc::new(big_hull).with_pose(Pose::new(Vec3::new(3.0, 0.0, 0.0), Quat::IDENTITY)),
        );
        world.step(1.0 / 60.0, &mut Vec::new());
        for body in [small, big] {
            world.apply_impulse(body, Vec3::new(0.0, 4.0, 0.0));
            world.apply_torque_impulse(body, Vec3::new(2.0, 0.0, 0.0));
        }
        let (vs, vb) = (world.linear_velocity(small), world.linear_velocity(big));
        assert!((vs - vb).length() < 1e-4, "{:?} vs {:?}", vs, vb);
        assert!((vs.y - 4.0).abs() < 1e-4);
        assert!((world.angular_velocity(small).x - world.angular_velocity(big).x).abs() < 1e-4);
    }

    #[test]
    fn lid_and_walls_keep_a_hard_throw_inside() {
        let mut world = RapierWorld::new(-28.0);
        world.build_tray(&tray());
        let body = world.create_die_body(&cube_desc(Vec3::new(0.0, 2.0, 0.0)));
        world.set_velocities(body, Vec3::new(12.0, 40.0, -9.0), Vec3::new(3.0, 1.0, 2.0));

        let mut contacts = Vec::new();
        let mut highest = f32::MIN;
        for _ in 0..240 {
            world.step(1.0 / 60.0, &mut contacts);
            let p = world.pose(body).unwrap().position;
            highest = highest.max(p.y);
            assert!(p.x.abs() < 5.0 && p.z.abs() < 4.0, "escaped: {:?}", p);
        }
        assert!(highest < 8.0, "passed the lid: {}", highest);
        assert!(world.pose(body).unwrap().position.y > 0.0);
    }

    #[test]
    fn clear_removes_dice_and_tray() {
        let mut world = RapierWorld::new(-28.0);
        world.build_tray(&tray());
        world.create_die_body(&cube_desc(Vec3::Y));
        world.clear();
        assert_eq!(world.body_count(), 0);
        assert_eq!(world.bodies.len(), 0);
        assert_eq!(world.colliders.len(), 0);
    }
}
