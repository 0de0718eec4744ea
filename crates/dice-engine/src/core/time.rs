/// Default cap on substeps per frame.
const DEFAULT_MAX_STEPS: u32 = 10;

/// Splits variable frame deltas into fixed solver substeps.
///
/// Leftover time carries over to the next frame. Frames longer than
/// `max_steps` substeps are truncated so a stalled tab does not replay
/// seconds of simulation in one go.
pub struct FixedTimestep {
    dt: f32,
    max_steps: u32,
    accumulator: f32,
}

impl FixedTimestep {
    pub fn new(dt: f32) -> Self {
        Self {
            dt,
            max_steps: DEFAULT_MAX_STEPS,
            accumulator: 0.0,
        }
    }

    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = max_steps.max(1);
        self
    }

    /// Add frame time. Returns the number of substeps to run now.
    pub fn accumulate(&mut self, frame_dt: f32) -> u32 {
        if frame_dt.is_finite() && frame_dt > 0.0 {
            self.accumulator += frame_dt;
        }
        self.accumulator = self.accumulator.min(self.dt * self.max_steps as f32);
        let steps = (self.accumulator / self.dt) as u32;
        self.accumulator -= steps as f32 * self.dt;
        steps
    }

    /// Drop any carried-over time.
    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }

    /// Time carried over to the next frame, in seconds.
    pub fn pending(&self) -> f32 {
        self.accumulator
    }

    pub fn dt(&self) -> f32 {
        self.dt
    }
}
