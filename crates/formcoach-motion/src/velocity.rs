//! Frame-to-frame velocity tracking for HUD metrics.
//!
//! Tracks one point (the session uses the wrist midpoint) across frames and
//! reports a smoothed velocity magnitude in meters per second. Timing
//! anomalies are a reset condition, never an error: a non-positive or
//! oversized frame gap re-anchors the tracker and reports zero, so a lag
//! spike can never masquerade as an explosive movement.
//!
//! Power output would need an external mass estimate and is not computed.

use nalgebra::{Point2, Vector2};

use formcoach_core::{BodyPoint, MetricSmoother, Skeleton, Timestamp};

/// Frame gap (seconds) beyond which tracking restarts.
pub const MAX_FRAME_GAP_SECS: f64 = 1.0;

/// Smoothed velocity (m/s) above which a movement counts as explosive.
pub const EXPLOSIVE_VELOCITY_MPS: f64 = 1.0;

/// Default conversion from normalized-frame units to meters. A fixed
/// field-of-view heuristic, overridable per session; there is no camera
/// calibration.
pub const DEFAULT_SCALE_M_PER_UNIT: f64 = 2.0;

/// One velocity reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VelocityUpdate {
    /// Smoothed velocity magnitude (m/s).
    pub velocity_mps: f64,
    pub explosive: bool,
    /// Raw frame-to-frame displacement in normalized units, for
    /// direction-aware feedback.
    pub displacement: Vector2<f64>,
}

impl VelocityUpdate {
    pub fn zero() -> Self {
        Self {
            velocity_mps: 0.0,
            explosive: false,
            displacement: Vector2::zeros(),
        }
    }

    /// Qualitative movement intensity for HUD copy.
    pub fn description(&self) -> &'static str {
        if self.velocity_mps > EXPLOSIVE_VELOCITY_MPS {
            "Explosive - maximal intent"
        } else if self.velocity_mps > 0.5 {
            "Fast - powerful drive"
        } else if self.velocity_mps > 0.15 {
            "Controlled - steady tempo"
        } else {
            "Slow - grinding or holding"
        }
    }
}

/// Tracks one point's velocity across frames.
#[derive(Debug, Clone)]
pub struct VelocityTracker {
    scale_m_per_unit: f64,
    smoother: MetricSmoother,
    last: Option<(Point2<f64>, Timestamp)>,
}

impl VelocityTracker {
    pub fn new() -> Self {
        Self {
            scale_m_per_unit: DEFAULT_SCALE_M_PER_UNIT,
            smoother: MetricSmoother::default(),
            last: None,
        }
    }

    /// Override the normalized-units-to-meters scale.
    pub fn with_scale(mut self, scale_m_per_unit: f64) -> Self {
        self.scale_m_per_unit = scale_m_per_unit;
        self
    }

    /// Feed one position sample.
    pub fn update(&mut self, position: Point2<f64>, timestamp: Timestamp) -> VelocityUpdate {
        let Some((prev_position, prev_timestamp)) = self.last else {
            self.last = Some((position, timestamp));
            return VelocityUpdate::zero();
        };

        let dt = timestamp.secs_since(prev_timestamp);
        if dt <= 0.0 || dt > MAX_FRAME_GAP_SECS {
            // Stale or out-of-order frame: re-anchor, forget smoothing
            // history, report zero.
            self.last = Some((position, timestamp));
            self.smoother.reset();
            return VelocityUpdate::zero();
        }

        let displacement: Vector2<f64> = position - prev_position;
        let speed = displacement.norm() * self.scale_m_per_unit / dt;
        let smoothed = self.smoother.apply(speed);
        self.last = Some((position, timestamp));

        VelocityUpdate {
            velocity_mps: smoothed,
            explosive: smoothed > EXPLOSIVE_VELOCITY_MPS,
            displacement,
        }
    }

    /// Drop all tracking state; the next sample is a first frame.
    pub fn reset(&mut self) {
        self.last = None;
        self.smoother.reset();
    }
}

impl Default for VelocityTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Midpoint of the visible wrists, the default tracked point. Falls back to
/// a single wrist when only one is visible.
pub fn wrist_center(skeleton: &Skeleton) -> Option<Point2<f64>> {
    match (
        skeleton.point(BodyPoint::LeftWrist),
        skeleton.point(BodyPoint::RightWrist),
    ) {
        (Some(left), Some(right)) => Some(nalgebra::center(&left, &right)),
        (Some(left), None) => Some(left),
        (None, Some(right)) => Some(right),
        (None, None) => None,
    }
}
