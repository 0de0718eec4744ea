use serde::{Deserialize, Serialize};

use crate::assets::theme::DiceTheme;
use crate::error::EngineError;

/// Settle detection and reconciliation timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SettleTuning {
    /// Linear speed below which a die counts as calm.
    pub linear_threshold: f32,
    /// Angular speed below which a die counts as calm.
    pub angular_threshold: f32,
    /// Seconds a die must stay calm before its face is corrected.
    pub dwell: f32,
    /// Seconds after launch at which a restless die is corrected anyway.
    pub max_roll_time: f32,
    /// Seconds between correction and the completion event.
    pub notify_delay: f32,
}

impl Default for SettleTuning {
    fn default() -> Self {
        Self {
            linear_threshold: 0.12,
            angular_threshold: 0.18,
            dwell: 0.45,
            max_roll_time: 8.0,
            notify_delay: 0.12,
        }
    }
}

/// Spawn placement, launch impulses and body materials.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LaunchTuning {
    /// Full width of the random offset around a die's grid slot.
    pub spawn_spread: f32,
    pub spawn_height: f32,
    pub spawn_height_jitter: f32,
    /// Distance kept between spawn points and the tray walls.
    pub wall_margin: f32,
    /// Full width of the random horizontal impulse.
    pub lateral_impulse: f32,
    /// Range of the upward impulse.
    pub upward_impulse: [f32; 2],
    /// Full width of the random torque impulse on each axis.
    pub torque_impulse: f32,
    /// Mass the launch impulse is tuned for. Every die receives the velocity
    /// change a body of this mass would, whatever its own size.
    pub launch_mass: f32,
    /// Rotational inertia the torque impulse is tuned for.
    pub launch_inertia: f32,
    pub gravity: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
    pub die_restitution: f32,
    pub die_friction: f32,
    pub tray_restitution: f32,
    pub tray_friction: f32,
}

impl Default for LaunchTuning {
    fn default() -> Self {
        Self {
            spawn_spread: 1.4,
            spawn_height: 5.0,
            spawn_height_jitter: 0.8,
            wall_margin: 0.9,
            lateral_impulse: 8.0,
            upward_impulse: [10.0, 15.0],
            torque_impulse: 7.0,
            launch_mass: 2.5,
            launch_inertia: 0.8,
            gravity: -28.0,
            linear_damping: 0.55,
            angular_damping: 0.55,
            die_restitution: 0.4,
            die_friction: 0.65,
            tray_restitution: 0.32,
            tray_friction: 0.75,
        }
    }
}

/// Impact feedback shaping.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImpactTuning {
    /// Minimum seconds between two registered impacts of one body.
    pub min_interval: f32,
    /// Speed that maps to full intensity.
    pub normalization: f32,
    /// Weight of angular speed in the intensity sum.
    pub angular_weight: f32,
    pub min_intensity: f32,
    pub ring_lifetime: f32,
    pub flash_lifetime: f32,
    /// Shake added per unit of intensity.
    pub shake_gain: f32,
    /// Exponential decay rate of the shake scalar, per second.
    pub shake_decay: f32,
    /// Camera offset at full shake, in world units.
    pub shake_amplitude: f32,
    /// Impact visuals kept alive at once.
    pub max_live: usize,
}

impl Default for ImpactTuning {
    fn default() -> Self {
        Self {
            min_interval: 0.08,
            normalization: 10.0,
            angular_weight: 0.35,
            min_intensity: 0.1,
            ring_lifetime: 0.45,
            flash_lifetime: 0.35,
            shake_gain: 0.35,
            shake_decay: 4.0,
            shake_amplitude: 0.25,
            max_live: 6,
        }
    }
}

/// Configuration for the engine, provided by the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub settle: SettleTuning,
    pub launch: LaunchTuning,
    pub impact: ImpactTuning,
    pub theme: DiceTheme,
    /// Seed for spawn jitter, impulses and torques.
    pub seed: u64,
    /// Largest roll the tray will lay out (default: 24).
    pub max_dice: usize,
    /// Maximum sound events per frame (default: 32).
    pub max_sounds: usize,
    /// Maximum roll events per frame (default: 32). Raised to two per die
    /// when `max_dice` needs more, see [`EngineConfig::event_capacity`].
    pub max_events: usize,
    /// Maximum point lights per frame (default: 8).
    pub max_lights: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            settle: SettleTuning::default(),
            launch: LaunchTuning::default(),
            impact: ImpactTuning::default(),
            theme: DiceTheme::default(),
            seed: 0x5EED_D1CE,
            max_dice: 24,
            max_sounds: 32,
            max_events: 32,
            max_lights: 8,
        }
    }
}

impl EngineConfig {
    /// Parse a config from JSON. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Number of face labels the frame can carry.
    pub fn max_labels(&self) -> usize {
        self.max_dice * 20
    }

    /// Event slots per frame. Every die can settle and complete within one
    /// frame, so a frame never holds fewer than two events per die.
    pub fn event_capacity(&self) -> usize {
        self.max_events.max(self.max_dice * 2)
    }
}
