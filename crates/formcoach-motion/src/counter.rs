//! Repetition state machine.
//!
//! Tracks progress through a rep for one active exercise: raw metric →
//! exponential smoothing → threshold crossing detection. Two guards protect
//! against double counts from metric oscillation near a threshold boundary:
//!
//! - **Hysteresis**: a rep only completes once the metric has returned to
//!   within [`HYSTERESIS_UNITS`] of the start threshold.
//! - **Debounce**: completions closer than [`REP_DEBOUNCE_MS`] to the
//!   previous counted rep close the cycle without counting.
//!
//! The machine is driven purely by the exercise definition's threshold mode
//! and values; it has no per-exercise code.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use formcoach_core::{smoothing, Skeleton, Timestamp};

use crate::catalog::ExerciseDefinition;

/// Margin around the start threshold, in metric units, inside which the
/// metric counts as "returned".
pub const HYSTERESIS_UNITS: f64 = 10.0;

/// Minimum spacing between two counted reps.
pub const REP_DEBOUNCE_MS: i64 = 500;

/// Phase of the current rep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MachineState {
    /// At rest near the start threshold.
    Start,
    /// The end threshold has been crossed; waiting for the return.
    Middle,
}

/// Emitted when a rep is counted.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepEvent {
    pub exercise_id: String,
    /// Total reps for the session after this one.
    pub count: u32,
    pub timestamp: Timestamp,
}

/// Read-only projection of the counter for display layers.
#[derive(Debug, Clone, PartialEq)]
pub struct RepSnapshot {
    pub exercise_id: &'static str,
    pub rep_count: u32,
    pub state: MachineState,
    pub progress_percent: f64,
    pub feedback: &'static str,
    /// Normalized coordinate for on-screen feedback placement.
    pub focus: Option<Point2<f64>>,
}

/// Per-session repetition counter for one active exercise.
#[derive(Debug, Clone)]
pub struct RepCounter {
    definition: ExerciseDefinition,
    alpha: f64,
    hysteresis: f64,
    debounce_ms: i64,
    smoothed_metric: f64,
    state: MachineState,
    rep_count: u32,
    last_rep_at: Option<Timestamp>,
    last_feedback: &'static str,
    last_focus: Option<Point2<f64>>,
}

impl RepCounter {
    /// Create a counter seeded at the definition's start threshold, so the
    /// first frame cannot complete a rep.
    pub fn new(definition: ExerciseDefinition) -> Self {
        Self {
            smoothed_metric: definition.thresholds.start,
            definition,
            alpha: smoothing::DEFAULT_ALPHA,
            hysteresis: HYSTERESIS_UNITS,
            debounce_ms: REP_DEBOUNCE_MS,
            state: MachineState::Start,
            rep_count: 0,
            last_rep_at: None,
            last_feedback: "Ready",
            last_focus: None,
        }
    }

    /// Override the smoothing coefficient (1.0 disables smoothing).
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_hysteresis(mut self, units: f64) -> Self {
        self.hysteresis = units;
        self
    }

    pub fn with_debounce_ms(mut self, millis: i64) -> Self {
        self.debounce_ms = millis;
        self
    }

    /// Advance the machine with one landmark frame.
    ///
    /// Frames where a required landmark is missing or below the confidence
    /// floor are skipped entirely: no transition, no feedback change.
    pub fn process_frame(&mut self, skeleton: &Skeleton) -> Option<RepEvent> {
        let sample = (self.definition.metric)(skeleton)?;
        self.last_focus = sample.focus;
        self.process_metric(sample.value, skeleton.timestamp)
    }

    /// Advance the machine with a raw metric value.
    pub fn process_metric(&mut self, raw: f64, now: Timestamp) -> Option<RepEvent> {
        self.smoothed_metric = smoothing::ema(self.smoothed_metric, raw, self.alpha);
        self.step(now)
    }

    fn step(&mut self, now: Timestamp) -> Option<RepEvent> {
        match self.state {
            MachineState::Start => {
                if self.crossed_end() {
                    self.state = MachineState::Middle;
                } else if self.progress_percent() < 50.0 {
                    self.last_feedback = "Ready";
                } else {
                    self.last_feedback = "Lower...";
                }
                None
            }
            MachineState::Middle => {
                if !self.returned_to_start() {
                    return None;
                }
                // The cycle closes either way; a return inside the debounce
                // window is threshold noise and must not count.
                self.state = MachineState::Start;
                if !self.debounce_elapsed(now) {
                    return None;
                }
                self.rep_count += 1;
                self.last_rep_at = Some(now);
                self.last_feedback = "Rep Complete!";
                Some(RepEvent {
                    exercise_id: self.definition.id.to_string(),
                    count: self.rep_count,
                    timestamp: now,
                })
            }
        }
    }

    /// Progress toward the end threshold, monotonic 0→100 for both
    /// threshold families.
    pub fn progress_percent(&self) -> f64 {
        let t = self.definition.thresholds;
        let (span, travelled) = if t.mode.is_min() {
            (t.start - t.end, t.start - self.smoothed_metric)
        } else {
            (t.end - t.start, self.smoothed_metric - t.start)
        };
        if span.abs() < 1e-9 {
            return 0.0;
        }
        (travelled / span).clamp(0.0, 1.0) * 100.0
    }

    fn crossed_end(&self) -> bool {
        let t = self.definition.thresholds;
        if t.mode.is_min() {
            self.smoothed_metric < t.end
        } else {
            self.smoothed_metric > t.end
        }
    }

    fn returned_to_start(&self) -> bool {
        let t = self.definition.thresholds;
        if t.mode.is_min() {
            self.smoothed_metric >= t.start - self.hysteresis
        } else {
            self.smoothed_metric <= t.start + self.hysteresis
        }
    }

    fn debounce_elapsed(&self, now: Timestamp) -> bool {
        match self.last_rep_at {
            Some(prev) => now.millis_since(prev) >= self.debounce_ms,
            None => true,
        }
    }

    /// Switch to a different exercise. The machine returns to `Start` and
    /// the smoothed metric is re-seeded to the incoming start threshold so
    /// the first frame of the new exercise cannot complete a spurious rep.
    /// The rep count is deliberately kept; resetting it is the caller's call.
    pub fn switch_exercise(&mut self, definition: ExerciseDefinition) {
        self.smoothed_metric = definition.thresholds.start;
        self.definition = definition;
        self.state = MachineState::Start;
        self.last_feedback = "Ready";
        self.last_focus = None;
    }

    pub fn reset_count(&mut self) {
        self.rep_count = 0;
        self.last_rep_at = None;
    }

    pub fn rep_count(&self) -> u32 {
        self.rep_count
    }

    pub fn state(&self) -> MachineState {
        self.state
    }

    pub fn feedback(&self) -> &'static str {
        self.last_feedback
    }

    pub fn smoothed_metric(&self) -> f64 {
        self.smoothed_metric
    }

    pub fn exercise_id(&self) -> &'static str {
        self.definition.id
    }

    pub fn definition(&self) -> &ExerciseDefinition {
        &self.definition
    }

    pub fn snapshot(&self) -> RepSnapshot {
        RepSnapshot {
            exercise_id: self.definition.id,
            rep_count: self.rep_count,
            state: self.state,
            progress_percent: self.progress_percent(),
            feedback: self.last_feedback,
            focus: self.last_focus,
        }
    }
}
