use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Polyhedral die shapes the engine knows how to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DieKind {
    D4,
    D6,
    D8,
    D10,
    D12,
    D20,
    D100,
}

impl DieKind {
    pub const ALL: [DieKind; 7] = [
        DieKind::D4,
        DieKind::D6,
        DieKind::D8,
        DieKind::D10,
        DieKind::D12,
        DieKind::D20,
        DieKind::D100,
    ];

    pub fn from_sides(sides: u32) -> Option<Self> {
        match sides {
            4 => Some(DieKind::D4),
            6 => Some(DieKind::D6),
            8 => Some(DieKind::D8),
            10 => Some(DieKind::D10),
            12 => Some(DieKind::D12),
            20 => Some(DieKind::D20),
            100 => Some(DieKind::D100),
            _ => None,
        }
    }

    pub fn sides(self) -> u32 {
        match self {
            DieKind::D4 => 4,
            DieKind::D6 => 6,
            DieKind::D8 => 8,
            DieKind::D10 => 10,
            DieKind::D12 => 12,
            DieKind::D20 => 20,
            DieKind::D100 => 100,
        }
    }

    /// Number of physical faces. The d100 is a ten-faced die.
    pub fn face_count(self) -> usize {
        match self {
            DieKind::D100 => 10,
            other => other.sides() as usize,
        }
    }

    /// Edge length of a face decal relative to the model.
    pub fn label_size(self) -> f32 {
        match self {
            DieKind::D4 => 0.62,
            DieKind::D6 => 0.6,
            DieKind::D8 => 0.56,
            DieKind::D10 | DieKind::D100 => 0.54,
            DieKind::D12 => 0.52,
            DieKind::D20 => 0.46,
        }
    }

    /// Uniform scale applied to the unit-radius model.
    pub fn model_scale(self) -> f32 {
        match self {
            DieKind::D6 => 1.2,
            DieKind::D10 | DieKind::D100 => 1.05,
            _ => 1.0,
        }
    }
}

impl TryFrom<u32> for DieKind {
    type Error = EngineError;

    fn try_from(sides: u32) -> Result<Self, Self::Error> {
        DieKind::from_sides(sides).ok_or(EngineError::UnsupportedSides(sides))
    }
}

/// How a ten-faced die labels its faces.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DisplayMode {
    #[default]
    Standard,
    PercentileTens,
    PercentileOnes,
}

/// Label text for one face value.
///
/// Percentile tens read `00, 10, ..., 90`; percentile ones read `0..9`.
/// A d100 always labels its faces as tens.
pub fn face_label(kind: Option<DieKind>, value: u32, mode: DisplayMode) -> String {
    let mode = match kind {
        Some(DieKind::D100) => DisplayMode::PercentileTens,
        _ => mode,
    };
    match mode {
        DisplayMode::PercentileTens if value == 10 => "00".to_string(),
        DisplayMode::PercentileTens => (value * 10).to_string(),
        DisplayMode::PercentileOnes if value == 10 => "0".to_string(),
        _ => value.to_string(),
    }
}

/// One die in a roll request. Immutable for the lifetime of the roll.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DieSpec {
    sides: u32,
    #[serde(alias = "authoritativeValue")]
    value: u32,
    #[serde(default)]
    display_mode: DisplayMode,
}

impl DieSpec {
    pub fn new(sides: u32, value: u32) -> Self {
        Self {
            sides,
            value,
            display_mode: DisplayMode::Standard,
        }
    }

    pub fn with_display_mode(mut self, mode: DisplayMode) -> Self {
        self.display_mode = mode;
        self
    }

    pub fn sides(&self) -> u32 {
        self.sides
    }

    /// The value decided by game logic before the roll began.
    pub fn value(&self) -> u32 {
        self.value
    }

    pub fn display_mode(&self) -> DisplayMode {
        self.display_mode
    }

    pub fn kind(&self) -> Option<DieKind> {
        DieKind::from_sides(self.sides)
    }

    /// The face-index key for the authoritative value.
    ///
    /// A percentile `0` lives on the face numbered 10. A d100 value is the
    /// number it shows: `10..=90` sit on faces 1 to 9, and `0` or `100` on
    /// the face reading "00". `None` when no face can show the value.
    pub fn face_value(&self) -> Option<u32> {
        match self.kind() {
            Some(DieKind::D100) => match self.value {
                0 | 100 => Some(10),
                v if v % 10 == 0 && v < 100 => Some(v / 10),
                _ => None,
            },
            Some(DieKind::D10) if self.display_mode != DisplayMode::Standard && self.value == 0 => {
                Some(10)
            }
            _ => Some(self.value),
        }
    }

    /// Text printed on the face that must end up on top.
    pub fn label(&self) -> String {
        match self.face_value() {
            Some(face) => face_label(self.kind(), face, self.display_mode),
            None => self.value.to_string(),
        }
    }
}

/// An ordered list of dice with predetermined results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollRequest {
    pub dice: Vec<DieSpec>,
}

impl RollRequest {
    pub fn new(dice: Vec<DieSpec>) -> Self {
        Self { dice }
    }

    pub fn from_json(json: &str) -> Result<Self, EngineError> {
        Ok(serde_json::from_str(json)?)
    }

    /// A tens/ones pair of d10s showing a percentile result in `1..=100`.
    ///
    /// `100` shows as `00` + `0`.
    pub fn percentile(result: u32) -> Self {
        let result = result.clamp(1, 100) % 100;
        let tens = match result / 10 {
            0 => 10,
            t => t,
        };
        let ones = match result % 10 {
            0 => 10,
            o => o,
        };
        Self::new(vec![
            DieSpec::new(10, tens).with_display_mode(DisplayMode::PercentileTens),
            DieSpec::new(10, ones).with_display_mode(DisplayMode::PercentileOnes),
        ])
    }

    pub fn len(&self) -> usize {
        self.dice.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dice.is_empty()
    }

    /// Reject requests the scene cannot lay out.
    pub fn validate(&self, max_dice: usize) -> Result<(), EngineError> {
        if self.dice.is_empty() {
            return Err(EngineError::EmptyRoll);
        }
        if self.dice.len() > max_dice {
            return Err(EngineError::TooManyDice {
                requested: self.dice.len(),
                limit: max_dice,
            });
        }
        Ok(())
    }
}

/// Audio cue forwarded to the host's sound collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum SoundCue {
    Roll = 1,
    Impact = 2,
    Critical = 3,
    Fumble = 4,
}

/// A sound event emitted during a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SoundEvent {
    pub cue: SoundCue,
    pub intensity: f32,
    pub position: Vec3,
}

impl SoundEvent {
    pub const FLOATS: usize = 5;

    pub fn new(cue: SoundCue, intensity: f32, position: Vec3) -> Self {
        Self {
            cue,
            intensity,
            position,
        }
    }

    /// Wire format: `[cue, intensity, x, y, z]`.
    pub fn to_wire(&self) -> [f32; Self::FLOATS] {
        [
            self.cue as u32 as f32,
            self.intensity,
            self.position.x,
            self.position.y,
            self.position.z,
        ]
    }
}

/// Per-die lifecycle notifications for the enclosing game logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollEvent {
    /// The shown face was reconciled. `forced` when the die never calmed down.
    Settled { die: usize, epoch: u64, forced: bool },
    /// The authoritative value is on display. Fires once per die per epoch.
    Completed { die: usize, epoch: u64, value: u32 },
}

impl RollEvent {
    pub const FLOATS: usize = 4;

    pub fn die(&self) -> usize {
        match *self {
            RollEvent::Settled { die, .. } | RollEvent::Completed { die, .. } => die,
        }
    }

    pub fn epoch(&self) -> u64 {
        match *self {
            RollEvent::Settled { epoch, .. } | RollEvent::Completed { epoch, .. } => epoch,
        }
    }

    /// Wire format: `[kind, die, payload, epoch]`.
    pub fn to_wire(&self) -> [f32; Self::FLOATS] {
        match *self {
            RollEvent::Settled { die, epoch, forced } => {
                [1.0, die as f32, if forced { 1.0 } else { 0.0 }, epoch as f32]
            }
            RollEvent::Completed { die, epoch, value } => {
                [2.0, die as f32, value as f32, epoch as f32]
            }
        }
    }
}
