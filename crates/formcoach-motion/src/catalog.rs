//! Declarative exercise catalog.
//!
//! Each exercise maps an id to a pure metric function over a landmark frame,
//! a pair of thresholds, and a threshold mode. The repetition state machine
//! is driven entirely by the mode and the two values, so adding an exercise
//! is a data change here, never a code change there.
//!
//! Unit convention: angle metrics are degrees; distance metrics are percent
//! of frame height, so the machine's shared hysteresis margin is meaningful
//! for both families.

use std::collections::HashMap;

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use formcoach_core::{geometry, BodyPoint, Skeleton};

/// Whether a rep completes when the metric falls below (`*Min`) or rises
/// above (`*Max`) the end threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThresholdMode {
    AngleMin,
    AngleMax,
    DistanceMin,
    DistanceMax,
}

impl ThresholdMode {
    /// True for modes where the rep is completed by a downward crossing.
    pub fn is_min(&self) -> bool {
        matches!(self, Self::AngleMin | Self::DistanceMin)
    }
}

/// Start/end thresholds for one exercise, in the metric's own units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    /// Resting value the metric returns to between reps.
    pub start: f64,
    /// Value whose crossing marks the working half of a rep.
    pub end: f64,
    pub mode: ThresholdMode,
}

/// One evaluation of an exercise metric on a frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricSample {
    /// Scalar progress metric (degrees, or percent of frame height).
    pub value: f64,
    /// The value a perfect rep reaches.
    pub target: f64,
    /// Normalized on-screen coordinate for feedback display, if meaningful.
    pub focus: Option<Point2<f64>>,
}

/// Pure metric function. `None` means a required landmark was missing or
/// below the confidence floor on this frame.
pub type MetricFn = fn(&Skeleton) -> Option<MetricSample>;

/// Immutable definition of one trackable exercise.
#[derive(Debug, Clone, Copy)]
pub struct ExerciseDefinition {
    pub id: &'static str,
    pub display_name: &'static str,
    pub metric: MetricFn,
    pub thresholds: Thresholds,
    /// Short form cue shown to the user while tracking.
    pub instructions: &'static str,
}

/// Registry of exercise definitions keyed by id, loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct ExerciseCatalog {
    exercises: HashMap<&'static str, ExerciseDefinition>,
}

impl ExerciseCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in exercise table.
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        catalog.register(ExerciseDefinition {
            id: "squat",
            display_name: "Squats",
            metric: squat_metric,
            thresholds: Thresholds {
                start: 160.0,
                end: 90.0,
                mode: ThresholdMode::AngleMin,
            },
            instructions: "Keep your chest up and sink until your thighs are parallel.",
        });
        catalog.register(ExerciseDefinition {
            id: "pushup",
            display_name: "Push-ups",
            metric: pushup_metric,
            thresholds: Thresholds {
                start: 160.0,
                end: 90.0,
                mode: ThresholdMode::AngleMin,
            },
            instructions: "Lower your chest until your elbows reach ninety degrees.",
        });
        catalog.register(ExerciseDefinition {
            id: "lunge",
            display_name: "Lunges",
            metric: lunge_metric,
            thresholds: Thresholds {
                start: 160.0,
                end: 100.0,
                mode: ThresholdMode::AngleMin,
            },
            instructions: "Step forward and drop the back knee toward the floor.",
        });
        catalog.register(ExerciseDefinition {
            id: "jumping_jack",
            display_name: "Jumping Jacks",
            metric: jumping_jack_metric,
            thresholds: Thresholds {
                start: -30.0,
                end: 30.0,
                mode: ThresholdMode::DistanceMax,
            },
            instructions: "Swing your hands together above your head.",
        });
        catalog.register(ExerciseDefinition {
            id: "crunch",
            display_name: "Crunches",
            metric: crunch_metric,
            thresholds: Thresholds {
                start: 130.0,
                end: 95.0,
                mode: ThresholdMode::AngleMin,
            },
            instructions: "Curl your shoulders toward your hips and squeeze.",
        });
        catalog
    }

    pub fn register(&mut self, definition: ExerciseDefinition) {
        self.exercises.insert(definition.id, definition);
    }

    pub fn get(&self, id: &str) -> Option<&ExerciseDefinition> {
        self.exercises.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.exercises.contains_key(id)
    }

    /// Registered ids in stable order.
    pub fn ids(&self) -> Vec<&'static str> {
        let mut ids: Vec<_> = self.exercises.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.exercises.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exercises.is_empty()
    }
}

/// Left and right variants of one joint angle; `None` if either side is
/// missing. The right side is derived by mirroring the left triple.
pub(crate) fn bilateral_angle(
    skeleton: &Skeleton,
    a: BodyPoint,
    vertex: BodyPoint,
    c: BodyPoint,
) -> Option<(f64, f64)> {
    let left = geometry::skeleton_angle(skeleton, a, vertex, c)?;
    let right = geometry::skeleton_angle(skeleton, a.mirror(), vertex.mirror(), c.mirror())?;
    Some((left, right))
}

pub(crate) fn knee_angles(skeleton: &Skeleton) -> Option<(f64, f64)> {
    bilateral_angle(
        skeleton,
        BodyPoint::LeftHip,
        BodyPoint::LeftKnee,
        BodyPoint::LeftAnkle,
    )
}

pub(crate) fn elbow_angles(skeleton: &Skeleton) -> Option<(f64, f64)> {
    bilateral_angle(
        skeleton,
        BodyPoint::LeftShoulder,
        BodyPoint::LeftElbow,
        BodyPoint::LeftWrist,
    )
}

pub(crate) fn hip_angles(skeleton: &Skeleton) -> Option<(f64, f64)> {
    bilateral_angle(
        skeleton,
        BodyPoint::LeftShoulder,
        BodyPoint::LeftHip,
        BodyPoint::LeftKnee,
    )
}

pub(crate) fn arm_raise_angles(skeleton: &Skeleton) -> Option<(f64, f64)> {
    bilateral_angle(
        skeleton,
        BodyPoint::LeftElbow,
        BodyPoint::LeftShoulder,
        BodyPoint::LeftHip,
    )
}

fn midpoint(skeleton: &Skeleton, a: BodyPoint, b: BodyPoint) -> Option<Point2<f64>> {
    Some(nalgebra::center(&skeleton.point(a)?, &skeleton.point(b)?))
}

/// Average bilateral knee angle (degrees).
fn squat_metric(skeleton: &Skeleton) -> Option<MetricSample> {
    let (left, right) = knee_angles(skeleton)?;
    Some(MetricSample {
        value: (left + right) / 2.0,
        target: 90.0,
        focus: midpoint(skeleton, BodyPoint::LeftKnee, BodyPoint::RightKnee),
    })
}

/// Average bilateral elbow angle (degrees).
fn pushup_metric(skeleton: &Skeleton) -> Option<MetricSample> {
    let (left, right) = elbow_angles(skeleton)?;
    Some(MetricSample {
        value: (left + right) / 2.0,
        target: 90.0,
        focus: midpoint(skeleton, BodyPoint::LeftElbow, BodyPoint::RightElbow),
    })
}

/// Minimum bilateral knee angle (degrees); the working leg drives the rep.
fn lunge_metric(skeleton: &Skeleton) -> Option<MetricSample> {
    let (left, right) = knee_angles(skeleton)?;
    let focus = if left <= right {
        skeleton.point(BodyPoint::LeftKnee)
    } else {
        skeleton.point(BodyPoint::RightKnee)
    };
    Some(MetricSample {
        value: left.min(right),
        target: 100.0,
        focus,
    })
}

/// Sum of vertical wrist-above-shoulder offsets, in percent of frame height.
/// Negative with arms at the sides, positive with hands overhead.
fn jumping_jack_metric(skeleton: &Skeleton) -> Option<MetricSample> {
    let left_shoulder = skeleton.visible(BodyPoint::LeftShoulder)?;
    let right_shoulder = skeleton.visible(BodyPoint::RightShoulder)?;
    let left_wrist = skeleton.visible(BodyPoint::LeftWrist)?;
    let right_wrist = skeleton.visible(BodyPoint::RightWrist)?;

    let offset_sum =
        (left_shoulder.y - left_wrist.y) + (right_shoulder.y - right_wrist.y);
    Some(MetricSample {
        value: offset_sum * 100.0,
        target: 30.0,
        focus: midpoint(skeleton, BodyPoint::LeftWrist, BodyPoint::RightWrist),
    })
}

/// Average bilateral hip angle, shoulder-hip-knee (degrees).
fn crunch_metric(skeleton: &Skeleton) -> Option<MetricSample> {
    let (left, right) = hip_angles(skeleton)?;
    Some(MetricSample {
        value: (left + right) / 2.0,
        target: 95.0,
        focus: midpoint(skeleton, BodyPoint::LeftHip, BodyPoint::RightHip),
    })
}
