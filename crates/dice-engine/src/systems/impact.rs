//! Collision feedback: rate-limited impacts, decaying rings and flashes,
//! audio cues and camera shake.

use std::collections::HashMap;

use glam::Vec3;

use crate::api::config::ImpactTuning;
use crate::api::types::{SoundCue, SoundEvent};
use crate::core::physics::{BodyHandle, ContactEvent};

/// Height of impact rings above the tray floor.
const RING_HEIGHT: f32 = 0.05;
/// Height of impact flashes above the tray floor.
const FLASH_HEIGHT: f32 = 0.9;
const FLASH_RADIUS: f32 = 5.0;
/// Shake below this is treated as zero.
const SHAKE_EPSILON: f32 = 0.001;

/// A registered impact. Visuals are derived from elapsed time, never frames.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImpactEvent {
    /// Point on the tray floor under the die.
    pub position: Vec3,
    pub intensity: f32,
    /// Pipeline clock at registration, in seconds.
    pub created_at: f32,
}

/// Expanding ring drawn on the floor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RingVisual {
    pub position: Vec3,
    pub scale: f32,
    pub opacity: f32,
}

/// Short-lived point light.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlashVisual {
    pub position: Vec3,
    pub intensity: f32,
    pub radius: f32,
}

impl ImpactEvent {
    fn progress(&self, now: f32, lifetime: f32) -> Option<f32> {
        let elapsed = now - self.created_at;
        if lifetime <= 0.0 || elapsed >= lifetime {
            return None;
        }
        Some((elapsed / lifetime).clamp(0.0, 1.0))
    }

    /// Ring state at `now`, or `None` once it has faded.
    pub fn ring(&self, now: f32, lifetime: f32) -> Option<RingVisual> {
        let p = self.progress(now, lifetime)?;
        Some(RingVisual {
            position: Vec3::new(self.position.x, RING_HEIGHT, self.position.z),
            scale: 0.35 + p * (1.8 + self.intensity),
            opacity: (1.0 - p) * 0.6 * self.intensity,
        })
    }

    /// Flash state at `now`, or `None` once it has faded.
    pub fn flash(&self, now: f32, lifetime: f32) -> Option<FlashVisual> {
        let p = self.progress(now, lifetime)?;
        Some(FlashVisual {
            position: Vec3::new(self.position.x, FLASH_HEIGHT, self.position.z),
            intensity: (1.0 - p) * (2.2 + self.intensity * 2.6),
            radius: FLASH_RADIUS,
        })
    }
}

/// Global shake scalar in `0..=1`, decaying exponentially.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CameraShake {
    value: f32,
}

impl CameraShake {
    pub fn value(&self) -> f32 {
        self.value
    }

    pub fn is_active(&self) -> bool {
        self.value > SHAKE_EPSILON
    }

    pub fn add(&mut self, amount: f32) {
        self.value = (self.value + amount).min(1.0);
    }

    pub fn decay(&mut self, dt: f32, rate: f32) {
        self.value *= (-rate * dt).exp();
        if self.value <= SHAKE_EPSILON {
            self.value = 0.0;
        }
    }

    /// Camera offset at time `t` for the current shake.
    pub fn offset(&self, t: f32, amplitude: f32) -> Vec3 {
        if !self.is_active() {
            return Vec3::ZERO;
        }
        let strength = self.value * amplitude;
        Vec3::new((t * 24.0).sin(), (t * 28.0).cos(), (t * 20.0).sin()) * strength
    }
}

/// Turns physics contacts into feedback.
pub struct ImpactPipeline {
    tuning: ImpactTuning,
    clock: f32,
    last_hit: HashMap<BodyHandle, f32>,
    events: Vec<ImpactEvent>,
    shake: CameraShake,
    sounds: Vec<SoundEvent>,
    reduced_motion: bool,
}

impl ImpactPipeline {
    pub fn new(tuning: ImpactTuning) -> Self {
        Self {
            tuning,
            clock: 0.0,
            last_hit: HashMap::new(),
            events: Vec::new(),
            shake: CameraShake::default(),
            sounds: Vec::new(),
            reduced_motion: false,
        }
    }

    /// Suppress shake and impact visuals. Audio cues are still forwarded.
    pub fn with_reduced_motion(mut self, reduced: bool) -> Self {
        self.reduced_motion = reduced;
        self
    }

    pub fn reduced_motion(&self) -> bool {
        self.reduced_motion
    }

    /// `(linear + w·angular) / normalization`, clamped to `[min_intensity, 1]`.
    pub fn intensity(&self, linear_speed: f32, angular_speed: f32) -> f32 {
        let t = &self.tuning;
        let raw = (linear_speed + t.angular_weight * angular_speed) / t.normalization.max(f32::EPSILON);
        raw.clamp(t.min_intensity, 1.0)
    }

    /// Register a contact. Returns the intensity when the contact was not
    /// coalesced into a recent impact of the same body.
    pub fn on_collision(&mut self, contact: &ContactEvent) -> Option<f32> {
        if let Some(&last) = self.last_hit.get(&contact.body) {
            if self.clock - last < self.tuning.min_interval {
                return None;
            }
        }
        self.last_hit.insert(contact.body, self.clock);

        let intensity = self.intensity(contact.linear_speed, contact.angular_speed);
        let position = Vec3::new(contact.position.x, 0.0, contact.position.z);
        self.sounds
            .push(SoundEvent::new(SoundCue::Impact, intensity, position));

        if !self.reduced_motion {
            self.shake.add(intensity * self.tuning.shake_gain);
            self.events.push(ImpactEvent {
                position,
                intensity,
                created_at: self.clock,
            });
            let max_live = self.tuning.max_live.max(1);
            if self.events.len() > max_live {
                let excess = self.events.len() - max_live;
                self.events.drain(..excess);
            }
        }
        Some(intensity)
    }

    /// Advance the clock, decay shake and expire faded impacts.
    pub fn advance(&mut self, dt: f32) {
        self.clock += dt;
        self.shake.decay(dt, self.tuning.shake_decay);
        let lifetime = self.tuning.ring_lifetime.max(self.tuning.flash_lifetime);
        let now = self.clock;
        self.events.retain(|e| now - e.created_at < lifetime);
    }

    pub fn clock(&self) -> f32 {
        self.clock
    }

    pub fn events(&self) -> &[ImpactEvent] {
        &self.events
    }

    pub fn rings(&self) -> impl Iterator<Item = RingVisual> + '_ {
        let (now, lifetime) = (self.clock, self.tuning.ring_lifetime);
        self.events.iter().filter_map(move |e| e.ring(now, lifetime))
    }

    pub fn flashes(&self) -> impl Iterator<Item = FlashVisual> + '_ {
        let (now, lifetime) = (self.clock, self.tuning.flash_lifetime);
        self.events.iter().filter_map(move |e| e.flash(now, lifetime))
    }

    pub fn shake(&self) -> CameraShake {
        self.shake
    }

    /// Current camera perturbation.
    pub fn shake_offset(&self) -> Vec3 {
        self.shake.offset(self.clock, self.tuning.shake_amplitude)
    }

    /// Take the audio cues produced since the last drain.
    pub fn drain_sounds(&mut self) -> Vec<SoundEvent> {
        std::mem::take(&mut self.sounds)
    }

    /// Forget rate-limit history for bodies not in `live`.
    pub fn retain_bodies(&mut self, live: &[BodyHandle]) {
        self.last_hit.retain(|body, _| live.contains(body));
    }

    /// Drop all scene-scoped state.
    pub fn reset(&mut self) {
        self.last_hit.clear();
        self.events.clear();
        self.sounds.clear();
        self.shake = CameraShake::default();
    }
}
