//! Heuristic single-frame exercise classifier.
//!
//! Guesses the exercise being performed from one landmark frame, for
//! auto-detect suggestions and sanity checks. The result is advisory only:
//! it never replaces the user-selected exercise driving the rep counter.
//!
//! The rules are ordered and mutually exclusive; the first match wins.
//! Returned ids match the catalog where a definition exists.

use formcoach_core::{BodyPoint, Skeleton};

use crate::catalog::{arm_raise_angles, elbow_angles, hip_angles, knee_angles};

/// Shoulder-to-ankle vertical span below which the body is prone/plank.
const HORIZONTAL_SPAN_MAX: f64 = 0.3;

const BENT_ELBOW_MAX_DEG: f64 = 140.0;
const STRAIGHT_TORSO_MIN_DEG: f64 = 150.0;
const TUCKED_KNEE_MAX_DEG: f64 = 110.0;
const DEEP_KNEE_MAX_DEG: f64 = 120.0;
const SPLIT_STANCE_SPREAD_DEG: f64 = 25.0;
const UPRIGHT_TORSO_MIN_DEG: f64 = 100.0;
const OVERHEAD_ARM_MIN_DEG: f64 = 120.0;
const CURLED_ELBOW_MAX_DEG: f64 = 75.0;
const STRAIGHT_KNEE_MIN_DEG: f64 = 150.0;
const CRUNCHED_TORSO_MAX_DEG: f64 = 95.0;
const SITUP_KNEE_MAX_DEG: f64 = 130.0;

/// Joint-angle summary of one frame, the classifier's working set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseFeatures {
    /// Average bilateral knee angle (degrees).
    pub knee_avg: f64,
    /// Smaller of the two knee angles (degrees).
    pub knee_min: f64,
    /// Absolute left/right knee difference (degrees).
    pub knee_spread: f64,
    /// Average bilateral elbow angle (degrees).
    pub elbow_avg: f64,
    /// Average shoulder-hip-knee angle (degrees).
    pub torso_avg: f64,
    /// Average elbow-shoulder-hip angle (degrees).
    pub arm_raise_avg: f64,
    /// Prone/plank orientation (small shoulder-to-ankle vertical span).
    pub horizontal: bool,
}

/// Extract classifier features, or `None` if any required landmark is
/// missing or below the confidence floor.
pub fn pose_features(skeleton: &Skeleton) -> Option<PoseFeatures> {
    let (knee_l, knee_r) = knee_angles(skeleton)?;
    let (elbow_l, elbow_r) = elbow_angles(skeleton)?;
    let (torso_l, torso_r) = hip_angles(skeleton)?;
    let (arm_l, arm_r) = arm_raise_angles(skeleton)?;

    // The angle helpers above guarantee shoulders and ankles are visible.
    let shoulder_y = (skeleton.visible(BodyPoint::LeftShoulder)?.y
        + skeleton.visible(BodyPoint::RightShoulder)?.y)
        / 2.0;
    let ankle_y = (skeleton.visible(BodyPoint::LeftAnkle)?.y
        + skeleton.visible(BodyPoint::RightAnkle)?.y)
        / 2.0;

    Some(PoseFeatures {
        knee_avg: (knee_l + knee_r) / 2.0,
        knee_min: knee_l.min(knee_r),
        knee_spread: (knee_l - knee_r).abs(),
        elbow_avg: (elbow_l + elbow_r) / 2.0,
        torso_avg: (torso_l + torso_r) / 2.0,
        arm_raise_avg: (arm_l + arm_r) / 2.0,
        horizontal: (shoulder_y - ankle_y).abs() < HORIZONTAL_SPAN_MAX,
    })
}

/// Classify one frame. `None` means no rule matched (unknown).
pub fn classify(skeleton: &Skeleton) -> Option<&'static str> {
    let f = pose_features(skeleton)?;
    let standing = !f.horizontal;

    if f.horizontal && f.elbow_avg < BENT_ELBOW_MAX_DEG {
        Some("pushup")
    } else if f.horizontal && f.torso_avg > STRAIGHT_TORSO_MIN_DEG {
        Some("plank")
    } else if f.horizontal
        && f.knee_min < TUCKED_KNEE_MAX_DEG
        && f.knee_spread >= SPLIT_STANCE_SPREAD_DEG
    {
        // One knee driven toward the chest while the other leg stays long.
        Some("mountain_climber")
    } else if standing
        && f.knee_avg < DEEP_KNEE_MAX_DEG
        && f.knee_spread < SPLIT_STANCE_SPREAD_DEG
        && f.torso_avg > UPRIGHT_TORSO_MIN_DEG
    {
        Some("squat")
    } else if standing
        && f.knee_min < TUCKED_KNEE_MAX_DEG
        && f.knee_spread >= SPLIT_STANCE_SPREAD_DEG
    {
        Some("lunge")
    } else if standing && f.arm_raise_avg > OVERHEAD_ARM_MIN_DEG {
        Some("jumping_jack")
    } else if standing
        && f.elbow_avg < CURLED_ELBOW_MAX_DEG
        && f.knee_avg > STRAIGHT_KNEE_MIN_DEG
    {
        Some("bicep_curl")
    } else if f.torso_avg < CRUNCHED_TORSO_MAX_DEG && f.knee_avg < SITUP_KNEE_MAX_DEG {
        Some("situp")
    } else {
        None
    }
}
