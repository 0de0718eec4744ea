//! Per-die roll lifecycle: `Idle → Launched → Settling → Corrected`.
//!
//! The state machine is pure: it consumes a motion sample and a time step and
//! tells the orchestrator what to do. It never touches the physics body
//! itself, so settle debounce and at-most-once correction can be tested
//! without a solver.

use crate::api::config::SettleTuning;

/// Speeds read from a die body this tick.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct MotionSample {
    pub linear_speed: f32,
    pub angular_speed: f32,
}

impl MotionSample {
    pub fn new(linear_speed: f32, angular_speed: f32) -> Self {
        Self {
            linear_speed,
            angular_speed,
        }
    }

    pub fn is_calm(&self, tuning: &SettleTuning) -> bool {
        self.linear_speed < tuning.linear_threshold && self.angular_speed < tuning.angular_threshold
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DiePhase {
    /// Not rolling. Either never rolled or showing a finished result.
    Idle,
    /// Tumbling; the die has not been calm since its last movement.
    Launched,
    /// Calm for `calm_for` seconds without interruption.
    Settling { calm_for: f32 },
    /// Orientation has been reconciled; completion fires in `notify_in` seconds.
    Corrected { notify_in: f32 },
}

/// What the orchestrator must do after a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleAction {
    /// Write the authoritative orientation now. `forced` when the roll timed
    /// out instead of settling.
    Correct { forced: bool },
    /// Report the authoritative value to the caller.
    Notify,
}

/// Roll state of one die slot.
#[derive(Debug, Clone)]
pub struct DieLifecycle {
    phase: DiePhase,
    epoch: u64,
    has_corrected: bool,
    /// Seconds since launch.
    elapsed: f32,
}

impl DieLifecycle {
    pub fn new() -> Self {
        Self {
            phase: DiePhase::Idle,
            epoch: 0,
            has_corrected: false,
            elapsed: 0.0,
        }
    }

    /// Enter `Launched` for a new roll epoch, discarding any pending settle
    /// or notification from the previous one.
    pub fn launch(&mut self, epoch: u64) {
        debug_assert!(epoch > self.epoch || self.epoch == 0);
        self.phase = DiePhase::Launched;
        self.epoch = epoch;
        self.has_corrected = false;
        self.elapsed = 0.0;
    }

    pub fn phase(&self) -> DiePhase {
        self.phase
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn has_corrected(&self) -> bool {
        self.has_corrected
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Whether the die is still moving under physics.
    pub fn is_rolling(&self) -> bool {
        matches!(self.phase, DiePhase::Launched | DiePhase::Settling { .. })
    }

    /// Advance by `dt` seconds.
    pub fn advance(
        &mut self,
        sample: MotionSample,
        dt: f32,
        tuning: &SettleTuning,
    ) -> Option<LifecycleAction> {
        match self.phase {
            DiePhase::Idle => None,
            DiePhase::Launched | DiePhase::Settling { .. } => {
                self.elapsed += dt;
                let calm_for = match (self.phase, sample.is_calm(tuning)) {
                    (DiePhase::Settling { calm_for }, true) => calm_for + dt,
                    (_, true) => dt,
                    (_, false) => 0.0,
                };
                self.phase = if calm_for > 0.0 {
                    DiePhase::Settling { calm_for }
                } else {
                    DiePhase::Launched
                };

                if self.has_corrected {
                    return None;
                }
                let forced = if calm_for >= tuning.dwell {
                    false
                } else if self.elapsed >= tuning.max_roll_time {
                    true
                } else {
                    return None;
                };
                self.has_corrected = true;
                self.phase = DiePhase::Corrected {
                    notify_in: tuning.notify_delay,
                };
                Some(LifecycleAction::Correct { forced })
            }
            DiePhase::Corrected { notify_in } => {
                self.elapsed += dt;
                let notify_in = notify_in - dt;
                if notify_in <= 0.0 {
                    self.phase = DiePhase::Idle;
                    Some(LifecycleAction::Notify)
                } else {
                    self.phase = DiePhase::Corrected { notify_in };
                    None
                }
            }
        }
    }
}

impl Default for DieLifecycle {
    fn default() -> Self {
        Self::new()
    }
}
