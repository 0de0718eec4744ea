use thiserror::Error;

/// Errors surfaced by the dice engine.
///
/// Configuration and resource faults are recoverable: the scene turns them
/// into visual fallbacks and keeps the roll going.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("unsupported die with {0} sides")]
    UnsupportedSides(u32),
    #[error("d{sides} has no face showing value {value}")]
    MissingFace { sides: u32, value: u32 },
    #[error("roll request contains no dice")]
    EmptyRoll,
    #[error("roll request has {requested} dice, limit is {limit}")]
    TooManyDice { requested: usize, limit: usize },
    #[error("raster surface unavailable")]
    RasterUnavailable,
    #[error("texture synthesis failed: {0}")]
    Synthesis(String),
    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

impl EngineError {
    /// Faults caused by a malformed `DieSpec` rather than by the runtime.
    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::UnsupportedSides(_) | Self::MissingFace { .. })
    }
}
