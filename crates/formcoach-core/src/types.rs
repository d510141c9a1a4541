//! Core data types shared across the FormCoach workspace.

use chrono::Utc;
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Minimum visibility confidence for a landmark to participate in any
/// computation. Landmarks below this floor are treated as missing.
pub const MIN_VISIBILITY: f64 = 0.5;

/// Unique identifier for one workout session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Timestamp in nanoseconds since the Unix epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Timestamp(pub i64);

impl Timestamp {
    pub fn now() -> Self {
        Self(Utc::now().timestamp_nanos_opt().unwrap_or(0))
    }

    pub fn from_nanos(nanos: i64) -> Self {
        Self(nanos)
    }

    pub fn from_millis(millis: i64) -> Self {
        Self(millis * 1_000_000)
    }

    pub fn from_secs_f64(secs: f64) -> Self {
        Self((secs * 1e9) as i64)
    }

    pub fn as_nanos(&self) -> i64 {
        self.0
    }

    pub fn as_millis(&self) -> i64 {
        self.0 / 1_000_000
    }

    pub fn as_secs_f64(&self) -> f64 {
        self.0 as f64 / 1e9
    }

    /// Elapsed milliseconds since `earlier` (negative if `earlier` is later).
    pub fn millis_since(&self, earlier: Timestamp) -> i64 {
        (self.0 - earlier.0) / 1_000_000
    }

    /// Elapsed seconds since `earlier` as a float.
    pub fn secs_since(&self, earlier: Timestamp) -> f64 {
        (self.0 - earlier.0) as f64 / 1e9
    }
}

/// Canonical body-part numbering for landmark frames (COCO-17 order).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum BodyPoint {
    Nose = 0,
    LeftEye = 1,
    RightEye = 2,
    LeftEar = 3,
    RightEar = 4,
    LeftShoulder = 5,
    RightShoulder = 6,
    LeftElbow = 7,
    RightElbow = 8,
    LeftWrist = 9,
    RightWrist = 10,
    LeftHip = 11,
    RightHip = 12,
    LeftKnee = 13,
    RightKnee = 14,
    LeftAnkle = 15,
    RightAnkle = 16,
}

impl BodyPoint {
    /// Number of body points in the canonical numbering.
    pub const COUNT: usize = 17;

    pub fn from_index(index: u8) -> Option<Self> {
        match index {
            0 => Some(Self::Nose),
            1 => Some(Self::LeftEye),
            2 => Some(Self::RightEye),
            3 => Some(Self::LeftEar),
            4 => Some(Self::RightEar),
            5 => Some(Self::LeftShoulder),
            6 => Some(Self::RightShoulder),
            7 => Some(Self::LeftElbow),
            8 => Some(Self::RightElbow),
            9 => Some(Self::LeftWrist),
            10 => Some(Self::RightWrist),
            11 => Some(Self::LeftHip),
            12 => Some(Self::RightHip),
            13 => Some(Self::LeftKnee),
            14 => Some(Self::RightKnee),
            15 => Some(Self::LeftAnkle),
            16 => Some(Self::RightAnkle),
            _ => None,
        }
    }

    pub fn index(&self) -> u8 {
        *self as u8
    }

    /// The same joint on the opposite side of the body. Center points
    /// (the nose) map to themselves.
    pub fn mirror(&self) -> Self {
        match self {
            Self::Nose => Self::Nose,
            Self::LeftEye => Self::RightEye,
            Self::RightEye => Self::LeftEye,
            Self::LeftEar => Self::RightEar,
            Self::RightEar => Self::LeftEar,
            Self::LeftShoulder => Self::RightShoulder,
            Self::RightShoulder => Self::LeftShoulder,
            Self::LeftElbow => Self::RightElbow,
            Self::RightElbow => Self::LeftElbow,
            Self::LeftWrist => Self::RightWrist,
            Self::RightWrist => Self::LeftWrist,
            Self::LeftHip => Self::RightHip,
            Self::RightHip => Self::LeftHip,
            Self::LeftKnee => Self::RightKnee,
            Self::RightKnee => Self::LeftKnee,
            Self::LeftAnkle => Self::RightAnkle,
            Self::RightAnkle => Self::LeftAnkle,
        }
    }
}

/// A single tracked body point for one frame.
///
/// Coordinates are normalized to the frame: x and y in [0, 1] with y growing
/// downward. Depth (z) is optional and unused by the planar kernel.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f64,
    pub y: f64,
    pub z: Option<f64>,
    /// Detection confidence in [0, 1].
    pub visibility: f64,
}

impl Landmark {
    /// Create a fully visible landmark at a normalized position.
    pub fn new(x: f64, y: f64) -> Self {
        Self {
            x,
            y,
            z: None,
            visibility: 1.0,
        }
    }

    pub fn with_visibility(mut self, visibility: f64) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn with_z(mut self, z: f64) -> Self {
        self.z = Some(z);
        self
    }

    /// Whether this landmark clears the confidence floor.
    pub fn is_visible(&self) -> bool {
        self.visibility >= MIN_VISIBILITY
    }

    pub fn position(&self) -> Point2<f64> {
        Point2::new(self.x, self.y)
    }
}

/// One frame of landmarks, indexed by the canonical body-part numbering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Skeleton {
    pub timestamp: Timestamp,
    pub landmarks: [Option<Landmark>; BodyPoint::COUNT],
}

impl Skeleton {
    /// Create an empty frame (all landmarks missing).
    pub fn new(timestamp: Timestamp) -> Self {
        Self {
            timestamp,
            landmarks: [None; BodyPoint::COUNT],
        }
    }

    pub fn set(&mut self, point: BodyPoint, landmark: Landmark) {
        self.landmarks[point.index() as usize] = Some(landmark);
    }

    pub fn with_landmark(mut self, point: BodyPoint, landmark: Landmark) -> Self {
        self.set(point, landmark);
        self
    }

    /// The landmark at `point`, whatever its confidence.
    pub fn landmark(&self, point: BodyPoint) -> Option<&Landmark> {
        self.landmarks[point.index() as usize].as_ref()
    }

    /// The landmark at `point`, only if it clears the confidence floor.
    pub fn visible(&self, point: BodyPoint) -> Option<&Landmark> {
        self.landmark(point).filter(|l| l.is_visible())
    }

    /// Normalized position of a visible landmark.
    pub fn point(&self, point: BodyPoint) -> Option<Point2<f64>> {
        self.visible(point).map(Landmark::position)
    }

    /// True when every listed point clears the confidence floor.
    pub fn all_visible(&self, points: &[BodyPoint]) -> bool {
        points.iter().all(|p| self.visible(*p).is_some())
    }

    /// Number of landmarks present on this frame (any confidence).
    pub fn landmark_count(&self) -> usize {
        self.landmarks.iter().filter(|l| l.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_body_point_roundtrip() {
        for i in 0..BodyPoint::COUNT as u8 {
            let point = BodyPoint::from_index(i).unwrap();
            assert_eq!(point.index(), i);
        }
        assert!(BodyPoint::from_index(17).is_none());
    }

    #[test]
    fn test_mirror_pairs() {
        assert_eq!(BodyPoint::LeftKnee.mirror(), BodyPoint::RightKnee);
        assert_eq!(BodyPoint::RightWrist.mirror(), BodyPoint::LeftWrist);
        assert_eq!(BodyPoint::Nose.mirror(), BodyPoint::Nose);
        // Mirroring twice is the identity.
        for i in 0..BodyPoint::COUNT as u8 {
            let p = BodyPoint::from_index(i).unwrap();
            assert_eq!(p.mirror().mirror(), p);
        }
    }

    #[test]
    fn test_visibility_floor() {
        let skeleton = Skeleton::new(Timestamp::from_millis(0))
            .with_landmark(BodyPoint::LeftKnee, Landmark::new(0.5, 0.6))
            .with_landmark(
                BodyPoint::RightKnee,
                Landmark::new(0.5, 0.6).with_visibility(0.3),
            );

        assert!(skeleton.visible(BodyPoint::LeftKnee).is_some());
        assert!(skeleton.landmark(BodyPoint::RightKnee).is_some());
        assert!(skeleton.visible(BodyPoint::RightKnee).is_none());
        assert!(!skeleton.all_visible(&[BodyPoint::LeftKnee, BodyPoint::RightKnee]));
        assert_eq!(skeleton.landmark_count(), 2);
    }

    #[test]
    fn test_timestamp_arithmetic() {
        let a = Timestamp::from_millis(1_000);
        let b = Timestamp::from_millis(1_400);
        assert_eq!(b.millis_since(a), 400);
        assert_eq!(a.millis_since(b), -400);
        assert!((b.secs_since(a) - 0.4).abs() < 1e-9);
        assert_eq!(Timestamp::from_secs_f64(1.5).as_millis(), 1_500);
    }
}
