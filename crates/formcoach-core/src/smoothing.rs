//! Exponential smoothing for per-frame scalar metrics.
//!
//! Landmark detectors jitter frame to frame; a single-pole low-pass filter
//! over the derived metric suppresses that noise while adding only a few
//! frames of lag at the default coefficient.

/// Default smoothing coefficient. Higher values track the raw signal faster.
pub const DEFAULT_ALPHA: f64 = 0.3;

/// Single-pole exponential smoothing step.
///
/// `smoothed' = previous*(1-alpha) + raw*alpha`. The caller owns the
/// persistent state; this function is pure.
pub fn ema(previous: f64, raw: f64, alpha: f64) -> f64 {
    previous * (1.0 - alpha) + raw * alpha
}

/// Stateful convenience wrapper for components that own their own smoothing
/// state. Seeds on the first sample.
#[derive(Debug, Clone)]
pub struct MetricSmoother {
    pub alpha: f64,
    state: Option<f64>,
}

impl MetricSmoother {
    pub fn new(alpha: f64) -> Self {
        Self { alpha, state: None }
    }

    /// Feed one raw sample and return the smoothed value.
    pub fn apply(&mut self, raw: f64) -> f64 {
        let next = match self.state {
            Some(prev) => ema(prev, raw, self.alpha),
            None => raw,
        };
        self.state = Some(next);
        next
    }

    /// Current smoothed value, if any sample has been seen.
    pub fn value(&self) -> Option<f64> {
        self.state
    }

    /// Forget all history; the next sample seeds the filter again.
    pub fn reset(&mut self) {
        self.state = None;
    }

    /// Overwrite the state with a known value (e.g. a neutral baseline).
    pub fn reseed(&mut self, value: f64) {
        self.state = Some(value);
    }
}

impl Default for MetricSmoother {
    fn default() -> Self {
        Self::new(DEFAULT_ALPHA)
    }
}
