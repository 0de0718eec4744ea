//! Launches dice, watches them settle and reconciles the shown face with the
//! authoritative value.

use std::collections::HashSet;
use std::f32::consts::{PI, TAU};
use std::sync::Arc;

use glam::{EulerRot, Quat, Vec2, Vec3};
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;

use super::layout::TrayLayout;
use super::lifecycle::{DieLifecycle, DiePhase, LifecycleAction, MotionSample};
use crate::api::config::{LaunchTuning, SettleTuning};
use crate::api::types::{DieKind, DieSpec, RollEvent, SoundCue, SoundEvent};
use crate::assets::geometry::DieModel;
use crate::assets::models::ModelCache;
use crate::core::physics::{BodyHandle, ColliderMaterial, DieBodyDesc, PhysicsService, Pose};
use crate::error::EngineError;

/// Intensity of the cue played when dice leave the hand.
const ROLL_CUE_INTENSITY: f32 = 0.8;
/// A die whose centre sinks this far below the floor has fallen out.
const FLOOR_TOLERANCE: f32 = 1.0;

/// How a finished die should be highlighted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Highlight {
    Critical,
    Fumble,
}

/// One die and the body it drives.
#[derive(Debug, Clone)]
pub struct DieSlot {
    pub spec: DieSpec,
    pub body: BodyHandle,
    pub model: Arc<DieModel>,
    pub lifecycle: DieLifecycle,
    /// Grid slot on the tray floor.
    pub home: Vec2,
    pub highlight: Option<Highlight>,
}

/// Per-scene roll driver.
pub struct RollOrchestrator {
    settle: SettleTuning,
    launch: LaunchTuning,
    rng: Pcg32,
    slots: Vec<DieSlot>,
    epoch: u64,
    events: Vec<RollEvent>,
    sounds: Vec<SoundEvent>,
    /// (sides, value) pairs whose correction fault has been logged.
    reported: HashSet<(u32, u32)>,
    /// Half extents of the tray the current roll was thrown into.
    tray: Vec2,
    /// Horizontal spawn region of the current roll.
    spawn_bounds: (Vec2, Vec2),
}

impl RollOrchestrator {
    pub fn new(settle: SettleTuning, launch: LaunchTuning, seed: u64) -> Self {
        Self {
            settle,
            launch,
            rng: Pcg32::seed_from_u64(seed),
            slots: Vec::new(),
            epoch: 0,
            events: Vec::new(),
            sounds: Vec::new(),
            reported: HashSet::new(),
            tray: Vec2::ZERO,
            spawn_bounds: (Vec2::ZERO, Vec2::ZERO),
        }
    }

    pub fn slots(&self) -> &[DieSlot] {
        &self.slots
    }

    /// Epoch of the most recent roll, `0` before the first.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Whether any die is still tumbling or waiting to report.
    pub fn is_busy(&self) -> bool {
        self.slots
            .iter()
            .any(|s| s.lifecycle.phase() != DiePhase::Idle)
    }

    /// Start a new roll epoch. Bodies are reused per slot when the side count
    /// matches, so a roll issued mid-flight supersedes the previous one.
    pub fn roll<P: PhysicsService>(
        &mut self,
        physics: &mut P,
        models: &mut ModelCache,
        dice: &[DieSpec],
        layout: &TrayLayout,
    ) -> u64 {
        self.epoch += 1;
        let epoch = self.epoch;
        self.tray = layout.half_extents();
        self.spawn_bounds = layout.spawn_bounds(self.launch.wall_margin);

        for stale in self.slots.drain(dice.len().min(self.slots.len())..) {
            physics.remove_body(stale.body);
        }
        for (index, spec) in dice.iter().enumerate() {
            let home = layout.slot(index);
            if let Some(slot) = self.slots.get_mut(index) {
                if slot.spec.sides() == spec.sides() {
                    slot.spec = spec.clone();
                    slot.home = home;
                    continue;
                }
            }

            let model = models.get_or_build(spec.sides());
            let desc = DieBodyDesc::new(Arc::from(model.hull()))
                .with_material(ColliderMaterial::new(
                    self.launch.die_restitution,
                    self.launch.die_friction,
                ))
                .with_damping(self.launch.linear_damping, self.launch.angular_damping);
            let slot = DieSlot {
                spec: spec.clone(),
                body: physics.create_die_body(&desc),
                model,
                lifecycle: DieLifecycle::new(),
                home,
                highlight: None,
            };
            if index < self.slots.len() {
                let old = std::mem::replace(&mut self.slots[index], slot);
                physics.remove_body(old.body);
            } else {
                self.slots.push(slot);
            }
        }

        for index in 0..self.slots.len() {
            self.launch_slot(physics, index, layout, epoch);
        }
        self.sounds.push(SoundEvent::new(
            SoundCue::Roll,
            ROLL_CUE_INTENSITY,
            Vec3::ZERO,
        ));
        log::info!("roll {}: {} dice", epoch, self.slots.len());
        epoch
    }

    fn launch_slot<P: PhysicsService>(
        &mut self,
        physics: &mut P,
        index: usize,
        layout: &TrayLayout,
        epoch: u64,
    ) {
        let t = &self.launch;
        let rng = &mut self.rng;
        let (min, max) = layout.spawn_bounds(t.wall_margin);
        let mass = t.launch_mass.max(f32::EPSILON);
        let inertia = t.launch_inertia.max(f32::EPSILON);
        let Some(slot) = self.slots.get_mut(index) else {
            return;
        };

        let jitter = Vec2::new(spread(rng, t.spawn_spread), spread(rng, t.spawn_spread));
        let xz = (slot.home + jitter).clamp(min, max);
        let y = t.spawn_height + rng.random::<f32>() * t.spawn_height_jitter.max(0.0);
        let yaw = Quat::from_rotation_y(rng.random::<f32>() * TAU);
        let tumble = Quat::from_euler(
            EulerRot::XYZ,
            rng.random::<f32>() * PI,
            rng.random::<f32>() * PI,
            rng.random::<f32>() * PI,
        );
        let [up_lo, up_hi] = t.upward_impulse;
        let impulse = Vec3::new(
            spread(rng, t.lateral_impulse),
            up_lo + rng.random::<f32>() * (up_hi - up_lo),
            spread(rng, t.lateral_impulse),
        );
        let torque = Vec3::new(
            spread(rng, t.torque_impulse),
            spread(rng, t.torque_impulse),
            spread(rng, t.torque_impulse),
        );

        physics.set_locked(slot.body, false);
        physics.set_pose(
            slot.body,
            Pose::new(Vec3::new(xz.x, y, xz.y), (yaw * tumble).normalize()),
        );
        physics.set_velocities(slot.body, Vec3::ZERO, Vec3::ZERO);
        physics.apply_impulse(slot.body, impulse / mass);
        physics.apply_torque_impulse(slot.body, torque / inertia);
        slot.lifecycle.launch(epoch);
        slot.highlight = None;
    }

    /// Read every body, advance its lifecycle and act on the result.
    pub fn update<P: PhysicsService>(&mut self, physics: &mut P, dt: f32) {
        for index in 0..self.slots.len() {
            let body = self.slots[index].body;
            if self.slots[index].lifecycle.is_rolling() {
                self.recover_if_lost(physics, index);
            }
            let sample = MotionSample::new(
                physics.linear_velocity(body).length(),
                physics.angular_velocity(body).length(),
            );
            let action = self.slots[index].lifecycle.advance(sample, dt, &self.settle);
            match action {
                Some(LifecycleAction::Correct { forced }) => {
                    self.correct(physics, index, forced);
                }
                Some(LifecycleAction::Notify) => self.complete(physics, index),
                None => {}
            }
        }
    }

    /// Drop a die that escaped the tray back above its grid slot. Orientation
    /// is kept, so the correction count is unaffected.
    fn recover_if_lost<P: PhysicsService>(&self, physics: &mut P, index: usize) {
        let slot = &self.slots[index];
        let Some(pose) = physics.pose(slot.body) else {
            return;
        };
        let p = pose.position;
        let inside = p.x.abs() <= self.tray.x
            && p.z.abs() <= self.tray.y
            && p.y >= -FLOOR_TOLERANCE;
        if inside {
            return;
        }
        let (min, max) = self.spawn_bounds;
        let home = slot.home.clamp(min, max);
        let at = Vec3::new(home.x, self.launch.spawn_height, home.y);
        log::debug!("die {} left the tray at {:?}; dropping it back at {:?}", index, p, at);
        physics.set_pose(slot.body, Pose::new(at, pose.rotation));
        physics.set_velocities(slot.body, Vec3::ZERO, Vec3::ZERO);
    }

    fn correct<P: PhysicsService>(&mut self, physics: &mut P, index: usize, forced: bool) {
        let slot = &self.slots[index];
        let (body, epoch) = (slot.body, slot.lifecycle.epoch());
        if forced {
            log::warn!(
                "die {} did not settle within {}s; forcing its result",
                index,
                self.settle.max_roll_time
            );
        }

        physics.set_velocities(body, Vec3::ZERO, Vec3::ZERO);
        let current = physics.pose(body).map(|p| p.rotation).unwrap_or(Quat::IDENTITY);
        let face_value = slot.spec.face_value();
        match face_value.and_then(|face| slot.model.corrected_rotation(face, current)) {
            Some(target) => {
                physics.set_rotation(body, target);
                log::debug!("die {} corrected to face {:?}", index, face_value);
            }
            None => {
                let (sides, value) = (slot.spec.sides(), slot.spec.value());
                let err = match slot.model.kind() {
                    Some(_) => EngineError::MissingFace { sides, value },
                    None => EngineError::UnsupportedSides(sides),
                };
                if self.reported.insert((sides, value)) {
                    log::warn!("{err}; leaving the die as it landed");
                }
            }
        }
        physics.set_locked(body, true);
        self.events.push(RollEvent::Settled {
            die: index,
            epoch,
            forced,
        });
    }

    fn complete<P: PhysicsService>(&mut self, physics: &P, index: usize) {
        let slot = &mut self.slots[index];
        let value = slot.spec.value();
        self.events.push(RollEvent::Completed {
            die: index,
            epoch: slot.lifecycle.epoch(),
            value,
        });

        if slot.spec.kind() == Some(DieKind::D20) {
            slot.highlight = match value {
                20 => Some(Highlight::Critical),
                1 => Some(Highlight::Fumble),
                _ => None,
            };
            let cue = match slot.highlight {
                Some(Highlight::Critical) => Some(SoundCue::Critical),
                Some(Highlight::Fumble) => Some(SoundCue::Fumble),
                None => None,
            };
            if let Some(cue) = cue {
                let position = physics.pose(slot.body).map(|p| p.position).unwrap_or(Vec3::ZERO);
                self.sounds.push(SoundEvent::new(cue, 1.0, position));
            }
        }
    }

    /// Take the lifecycle notifications produced since the last drain.
    pub fn drain_events(&mut self) -> Vec<RollEvent> {
        std::mem::take(&mut self.events)
    }

    /// Take the audio cues produced since the last drain.
    pub fn drain_sounds(&mut self) -> Vec<SoundEvent> {
        std::mem::take(&mut self.sounds)
    }

    /// Release every body. The epoch counter survives so later rolls stay
    /// distinguishable from anything still queued.
    pub fn teardown<P: PhysicsService>(&mut self, physics: &mut P) {
        for slot in self.slots.drain(..) {
            physics.remove_body(slot.body);
        }
        self.events.clear();
        self.sounds.clear();
    }
}

/// Uniform in `[-width / 2, width / 2)`.
fn spread(rng: &mut Pcg32, width: f32) -> f32 {
    (rng.random::<f32>() - 0.5) * width
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::DisplayMode;
    use crate::core::physics::{ContactEvent, HeadlessWorld, TrayDesc};
    use proptest::prelude::*;
    use std::collections::HashMap;

    const DT: f32 = 1.0 / 60.0;

    /// Headless physics that counts orientation writes per body.
    #[derive(Default)]
    struct CountingPhysics {
        inner: HeadlessWorld,
        rotation_writes: HashMap<BodyHandle, usize>,
    }

    impl PhysicsService for CountingPhysics {
        fn create_die_body(&mut self, desc: &DieBodyDesc) -> BodyHandle {
            self.inner.create_die_body(desc)
        }
        fn remove_body(&mut self, body: BodyHandle) {
            self.inner.remove_body(body)
        }
        fn pose(&self, body: BodyHandle) -> Option<Pose> {
            self.inner.pose(body)
        }
        fn set_pose(&mut self, body: BodyHandle, pose: Pose) {
            self.inner.set_pose(body, pose)
        }
        fn set_rotation(&mut self, body: BodyHandle, rotation: Quat) {
            *self.rotation_writes.entry(body).or_default() += 1;
            self.inner.set_rotation(body, rotation)
        }
        fn linear_velocity(&self, body: BodyHandle) -> Vec3 {
            self.inner.linear_velocity(body)
        }
        fn angular_velocity(&self, body: BodyHandle) -> Vec3 {
            self.inner.angular_velocity(body)
        }
        fn set_velocities(&mut self, body: BodyHandle, linear: Vec3, angular: Vec3) {
            self.inner.set_velocities(body, linear, angular)
        }
        fn apply_impulse(&mut self, body: BodyHandle, impulse: Vec3) {
            self.inner.apply_impulse(body, impulse)
        }
        fn apply_torque_impulse(&mut self, body: BodyHandle, torque: Vec3) {
            self.inner.apply_torque_impulse(body, torque)
        }
        fn set_locked(&mut self, body: BodyHandle, locked: bool) {
            self.inner.set_locked(body, locked)
        }
        fn build_tray(&mut self, tray: &TrayDesc) {
            self.inner.build_tray(tray)
        }
        fn step(&mut self, dt: f32, contacts: &mut Vec<ContactEvent>) {
            self.inner.step(dt, contacts)
        }
        fn clear(&mut self) {
            self.inner.clear()
        }
        fn body_count(&self) -> usize {
            self.inner.body_count()
        }
    }

    fn orchestrator(seed: u64) -> RollOrchestrator {
        RollOrchestrator::new(SettleTuning::default(), LaunchTuning::default(), seed)
    }

    /// Step physics and the orchestrator for `seconds`, collecting events.
    fn run<P: PhysicsService>(
        orch: &mut RollOrchestrator,
        physics: &mut P,
        seconds: f32,
        dt: f32,
    ) -> Vec<RollEvent> {
        let mut contacts = Vec::new();
        let mut events = Vec::new();
        for _ in 0..(seconds / dt).round() as usize {
            physics.step(dt, &mut contacts);
            orch.update(physics, dt);
            events.extend(orch.drain_events());
        }
        events
    }

    fn completions(events: &[RollEvent]) -> Vec<(usize, u64, u32)> {
        events
            .iter()
            .filter_map(|e| match *e {
                RollEvent::Completed { die, epoch, value } => Some((die, epoch, value)),
                _ => None,
            })
            .collect()
    }

    fn face_showing<P: PhysicsService>(physics: &P, slot: &DieSlot) -> Option<u32> {
        let rotation = physics.pose(slot.body)?.rotation;
        slot.model.face_up(rotation).map(|f| f.value)
    }

    fn mixed_roll() -> Vec<DieSpec> {
        vec![
            DieSpec::new(20, 17),
            DieSpec::new(6, 3),
            DieSpec::new(10, 7).with_display_mode(DisplayMode::PercentileTens),
            DieSpec::new(10, 0).with_display_mode(DisplayMode::PercentileOnes),
            DieSpec::new(100, 40),
            DieSpec::new(4, 2),
            DieSpec::new(8, 8),
            DieSpec::new(12, 11),
        ]
    }

    #[test]
    fn every_die_completes_with_its_value() {
        let mut physics = HeadlessWorld::new();
        let mut models = ModelCache::new();
        let mut orch = orchestrator(1);
        let dice = mixed_roll();
        let layout = TrayLayout::for_count(dice.len());
        let epoch = orch.roll(&mut physics, &mut models, &dice, &layout);
        assert_eq!(epoch, 1);
        assert_eq!(physics.body_count(), dice.len());

        let events = run(&mut orch, &mut physics, 6.0, DT);
        let mut done = completions(&events);
        done.sort();
        let expected: Vec<_> = dice
            .iter()
            .enumerate()
            .map(|(i, d)| (i, 1, d.value()))
            .collect();
        assert_eq!(done, expected);

        for slot in orch.slots() {
            assert_eq!(face_showing(&physics, slot), slot.spec.face_value(), "{:?}", slot.spec);
            assert!(physics.is_locked(slot.body));
        }
        assert!(!orch.is_busy());
    }

    #[test]
    fn spawn_stays_inside_tray() {
        let mut physics = HeadlessWorld::new();
        let mut models = ModelCache::new();
        let mut orch = orchestrator(99);
        let dice = vec![DieSpec::new(6, 1); 12];
        let layout = TrayLayout::for_count(dice.len());
        let (min, max) = layout.spawn_bounds(LaunchTuning::default().wall_margin);
        for _ in 0..20 {
            orch.roll(&mut physics, &mut models, &dice, &layout);
            for slot in orch.slots() {
                let p = physics.pose(slot.body).unwrap().position;
                assert!(p.x >= min.x && p.x <= max.x && p.z >= min.y && p.z <= max.y, "{:?}", p);
                assert!((5.0..=5.8).contains(&p.y), "{:?}", p);
                let up = physics.linear_velocity(slot.body).y;
                assert!((4.0..=6.0).contains(&up), "upward speed {}", up);
            }
        }
    }

    #[test]
    fn correction_happens_once_per_epoch() {
        let mut physics = CountingPhysics::default();
        let mut models = ModelCache::new();
        let mut orch = orchestrator(5);
        let dice = vec![DieSpec::new(20, 20), DieSpec::new(8, 1)];
        let layout = TrayLayout::for_count(2);
        orch.roll(&mut physics, &mut models, &dice, &layout);

        run(&mut orch, &mut physics, 5.0, DT);
        let rotations: Vec<Quat> = orch
            .slots()
            .iter()
            .map(|s| physics.pose(s.body).unwrap().rotation)
            .collect();
        run(&mut orch, &mut physics, 5.0, DT);
        for (slot, before) in orch.slots().iter().zip(rotations) {
            assert_eq!(physics.rotation_writes.get(&slot.body), Some(&1));
            assert_eq!(physics.pose(slot.body).unwrap().rotation, before);
        }

        orch.roll(&mut physics, &mut models, &dice, &layout);
        run(&mut orch, &mut physics, 5.0, DT);
        for slot in orch.slots() {
            assert_eq!(physics.rotation_writes.get(&slot.body), Some(&2));
        }
    }

    #[test]
    fn second_roll_supersedes_first() {
        let mut physics = HeadlessWorld::new();
        let mut models = ModelCache::new();
        let mut orch = orchestrator(11);
        let layout = TrayLayout::for_count(1);
        orch.roll(&mut physics, &mut models, &[DieSpec::new(20, 4)], &layout);
        let body = orch.slots()[0].body;

        // Run until the first roll has corrected but not yet reported.
        let mut contacts = Vec::new();
        let mut settled = false;
        for _ in 0..600 {
            physics.step(DT, &mut contacts);
            orch.update(&mut physics, DT);
            if orch
                .drain_events()
                .iter()
                .any(|e| matches!(e, RollEvent::Settled { .. }))
            {
                settled = true;
                break;
            }
        }
        assert!(settled);

        let epoch = orch.roll(&mut physics, &mut models, &[DieSpec::new(20, 15)], &layout);
        assert_eq!(epoch, 2);
        assert_eq!(orch.slots()[0].body, body, "same side count reuses the body");
        assert!(!physics.is_locked(body));

        let events = run(&mut orch, &mut physics, 6.0, DT);
        assert_eq!(completions(&events), vec![(0, 2, 15)]);
        assert_eq!(face_showing(&physics, &orch.slots()[0]), Some(15));
    }

    #[test]
    fn roll_during_flight_reports_once() {
        let mut physics = HeadlessWorld::new();
        let mut models = ModelCache::new();
        let mut orch = orchestrator(3);
        let layout = TrayLayout::for_count(2);
        let dice = vec![DieSpec::new(6, 2), DieSpec::new(12, 9)];
        orch.roll(&mut physics, &mut models, &dice, &layout);
        let early = run(&mut orch, &mut physics, 0.3, DT);
        assert!(completions(&early).is_empty());

        orch.roll(&mut physics, &mut models, &dice, &layout);
        let events = run(&mut orch, &mut physics, 8.0, DT);
        let done = completions(&events);
        assert_eq!(done.len(), 2);
        assert!(done.iter().all(|(_, epoch, _)| *epoch == 2));
    }

    #[test]
    fn changing_sides_replaces_bodies() {
        let mut physics = HeadlessWorld::new();
        let mut models = ModelCache::new();
        let mut orch = orchestrator(3);
        orch.roll(&mut physics, &mut models, &[DieSpec::new(6, 1), DieSpec::new(6, 2)], &TrayLayout::for_count(2));
        let first = orch.slots()[0].body;
        orch.roll(&mut physics, &mut models, &[DieSpec::new(20, 1)], &TrayLayout::for_count(1));
        assert_eq!(physics.body_count(), 1);
        assert_ne!(orch.slots()[0].body, first);

        for round in 0..30 {
            let sides = if round % 2 == 0 { 6 } else { 20 };
            orch.roll(&mut physics, &mut models, &[DieSpec::new(sides, 1)], &TrayLayout::for_count(1));
            assert!(orch.slots()[0].body.0 < 2, "handles are recycled: {:?}", orch.slots()[0].body);
        }
    }

    #[test]
    fn missing_face_still_completes() {
        let mut physics = CountingPhysics::default();
        let mut models = ModelCache::new();
        let mut orch = orchestrator(8);
        let dice = vec![DieSpec::new(6, 9), DieSpec::new(7, 3)];
        orch.roll(&mut physics, &mut models, &dice, &TrayLayout::for_count(2));
        let events = run(&mut orch, &mut physics, 6.0, DT);

        let mut done = completions(&events);
        done.sort();
        assert_eq!(done, vec![(0, 1, 9), (1, 1, 3)]);
        assert!(physics.rotation_writes.is_empty(), "faulty dice keep their landed face");
        assert_eq!(orch.reported.len(), 2);
    }

    #[test]
    fn restless_die_is_forced() {
        let mut physics = HeadlessWorld::new().with_extra_damping(0.0);
        let mut models = ModelCache::new();
        let launch = LaunchTuning {
            linear_damping: 0.0,
            angular_damping: 0.0,
            lateral_impulse: 0.0,
            ..LaunchTuning::default()
        };
        let mut orch = RollOrchestrator::new(SettleTuning::default(), launch, 21);
        orch.roll(&mut physics, &mut models, &[DieSpec::new(12, 5)], &TrayLayout::for_count(1));

        let early = run(&mut orch, &mut physics, 7.5, DT);
        assert!(completions(&early).is_empty());

        let events = run(&mut orch, &mut physics, 1.0, DT);
        assert!(events.contains(&RollEvent::Settled { die: 0, epoch: 1, forced: true }));
        assert_eq!(completions(&events), vec![(0, 1, 5)]);
        assert_eq!(face_showing(&physics, &orch.slots()[0]), Some(5));
    }

    #[test]
    fn d20_extremes_cue_sounds() {
        let mut physics = HeadlessWorld::new();
        let mut models = ModelCache::new();
        let mut orch = orchestrator(4);
        let dice = vec![DieSpec::new(20, 20), DieSpec::new(20, 1), DieSpec::new(20, 10)];
        orch.roll(&mut physics, &mut models, &dice, &TrayLayout::for_count(3));
        let roll = orch.drain_sounds();
        assert_eq!(roll.len(), 1);
        assert_eq!(roll[0].cue, SoundCue::Roll);

        run(&mut orch, &mut physics, 6.0, DT);
        let cues: Vec<SoundCue> = orch.drain_sounds().iter().map(|s| s.cue).collect();
        assert_eq!(cues.len(), 2);
        assert!(cues.contains(&SoundCue::Critical) && cues.contains(&SoundCue::Fumble));
        assert_eq!(orch.slots()[0].highlight, Some(Highlight::Critical));
        assert_eq!(orch.slots()[1].highlight, Some(Highlight::Fumble));
        assert_eq!(orch.slots()[2].highlight, None);
    }

    #[test]
    fn launch_speed_ignores_die_size() {
        let mut physics = HeadlessWorld::new();
        let mut models = ModelCache::new();
        let mut orch = orchestrator(17);
        let dice: Vec<DieSpec> = DieKind::ALL.iter().map(|k| DieSpec::new(k.sides(), 1)).collect();
        let layout = TrayLayout::for_count(dice.len());
        let launch = LaunchTuning::default();
        let lateral = launch.lateral_impulse / launch.launch_mass / 2.0;
        let spin = launch.torque_impulse / launch.launch_inertia / 2.0;
        orch.roll(&mut physics, &mut models, &dice, &layout);
        for slot in orch.slots() {
            let v = physics.linear_velocity(slot.body);
            let w = physics.angular_velocity(slot.body);
            assert!(v.x.abs() <= lateral && v.z.abs() <= lateral, "{:?}", v);
            assert!(w.abs().max_element() <= spin, "{:?}", w);
        }
    }

    #[test]
    fn escaped_die_is_dropped_back_in() {
        let mut physics = CountingPhysics::default();
        let mut models = ModelCache::new();
        let mut orch = orchestrator(2);
        let layout = TrayLayout::for_count(1);
        orch.roll(&mut physics, &mut models, &[DieSpec::new(4, 2)], &layout);
        let body = orch.slots()[0].body;
        let tilt = Quat::from_rotation_x(0.4);
        physics.set_pose(body, Pose::new(Vec3::new(-7.8, 1.4, -8.3), tilt));

        orch.update(&mut physics, DT);
        let pose = physics.pose(body).unwrap();
        let half = layout.half_extents();
        assert!(pose.position.x.abs() <= half.x && pose.position.z.abs() <= half.y, "{:?}", pose);
        assert!((pose.position.y - LaunchTuning::default().spawn_height).abs() < 1e-5);
        assert_eq!(pose.rotation, tilt);
        assert!(physics.rotation_writes.is_empty());

        physics.set_pose(body, Pose::new(Vec3::new(0.0, -260.0, 0.0), tilt));
        orch.update(&mut physics, DT);
        assert!(physics.pose(body).unwrap().position.y > 0.0);

        let events = run(&mut orch, &mut physics, 6.0, DT);
        assert_eq!(completions(&events), vec![(0, 1, 2)]);
        assert_eq!(face_showing(&physics, &orch.slots()[0]), Some(2));
    }

    #[test]
    fn d100_completes_with_the_number_shown() {
        let mut physics = CountingPhysics::default();
        let mut models = ModelCache::new();
        let mut orch = orchestrator(6);
        let dice = vec![DieSpec::new(100, 30), DieSpec::new(100, 100), DieSpec::new(100, 35)];
        orch.roll(&mut physics, &mut models, &dice, &TrayLayout::for_count(3));
        let events = run(&mut orch, &mut physics, 6.0, DT);

        let mut done = completions(&events);
        done.sort();
        assert_eq!(done, vec![(0, 1, 30), (1, 1, 100), (2, 1, 35)]);
        let slots = orch.slots();
        assert_eq!(face_showing(&physics, &slots[0]), Some(3));
        assert_eq!(face_showing(&physics, &slots[1]), Some(10));
        assert_eq!(physics.rotation_writes.get(&slots[2].body), None);
        assert!(orch.reported.contains(&(100, 35)));
    }

    #[test]
    fn teardown_releases_bodies() {
        let mut physics = HeadlessWorld::new();
        let mut models = ModelCache::new();
        let mut orch = orchestrator(4);
        orch.roll(&mut physics, &mut models, &mixed_roll(), &TrayLayout::for_count(8));
        orch.teardown(&mut physics);
        assert_eq!(physics.body_count(), 0);
        assert!(orch.slots().is_empty());
        assert_eq!(models.len(), 7, "models outlive the scene");
        let epoch = orch.roll(&mut physics, &mut models, &[DieSpec::new(6, 1)], &TrayLayout::for_count(1));
        assert_eq!(epoch, 2);
    }

    #[test]
    fn outcome_never_depends_on_seed() {
        let dice = vec![DieSpec::new(20, 13), DieSpec::new(12, 2)];
        let layout = TrayLayout::for_count(dice.len());
        let mut models = ModelCache::new();
        for seed in 0..1000 {
            let mut physics = HeadlessWorld::new();
            let mut orch = orchestrator(seed);
            orch.roll(&mut physics, &mut models, &dice, &layout);
            let events = run(&mut orch, &mut physics, 4.0, 1.0 / 30.0);
            let mut done = completions(&events);
            done.sort();
            assert_eq!(done, vec![(0, 1, 13), (1, 1, 2)], "seed {}", seed);
            for slot in orch.slots() {
                assert_eq!(face_showing(&physics, slot), Some(slot.spec.value()), "seed {}", seed);
            }
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn any_seed_shows_the_authoritative_face(
            seed in any::<u64>(),
            index in 0usize..7,
            pick in any::<u32>(),
        ) {
            let kind = DieKind::ALL[index];
            let face = pick % kind.face_count() as u32 + 1;
            let value = if kind == DieKind::D100 { face * 10 } else { face };
            let dice = vec![DieSpec::new(kind.sides(), value)];
            let mut physics = HeadlessWorld::new();
            let mut models = ModelCache::new();
            let mut orch = orchestrator(seed);
            orch.roll(&mut physics, &mut models, &dice, &TrayLayout::for_count(1));
            let events = run(&mut orch, &mut physics, 4.0, 1.0 / 30.0);
            prop_assert_eq!(completions(&events), vec![(0, 1, value)]);
            prop_assert_eq!(face_showing(&physics, &orch.slots()[0]), Some(face));
        }
    }
}
