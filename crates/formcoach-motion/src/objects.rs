//! Weighted-object association.
//!
//! Object detections arrive in pixel coordinates from an external detector;
//! landmarks are normalized. A rep is flagged as weighted when any detected
//! object's box center sits within a fraction of the frame width of either
//! wrist. No identity tracking across frames: each frame is judged on its
//! own detections.

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use formcoach_core::{BodyPoint, Skeleton};

/// Wrist proximity threshold as a fraction of frame width.
pub const WRIST_PROXIMITY_FRAC: f64 = 0.15;

/// Axis-aligned detection box in pixel coordinates, top-left origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn center(&self) -> Point2<f64> {
        Point2::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// One detection from the external object detector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedObject {
    /// Detector class label, e.g. "dumbbell".
    pub label: String,
    pub bbox: BoundingBox,
}

impl DetectedObject {
    pub fn new(label: impl Into<String>, bbox: BoundingBox) -> Self {
        Self {
            label: label.into(),
            bbox,
        }
    }
}

/// Per-frame association verdict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedAssociation {
    pub is_weighted: bool,
    /// Label of the first object found in hand, when weighted.
    pub object_label: Option<String>,
}

impl WeightedAssociation {
    pub fn none() -> Self {
        Self {
            is_weighted: false,
            object_label: None,
        }
    }
}

/// Decides whether the user is holding a detected object.
#[derive(Debug, Clone)]
pub struct WeightAssociator {
    /// Wrist proximity threshold as a fraction of frame width.
    pub proximity_frac: f64,
}

impl WeightAssociator {
    pub fn new() -> Self {
        Self {
            proximity_frac: WRIST_PROXIMITY_FRAC,
        }
    }

    /// Check every detection against both wrists. Landmarks are scaled into
    /// pixel space with the given frame dimensions before measuring.
    pub fn associate(
        &self,
        objects: &[DetectedObject],
        skeleton: &Skeleton,
        frame_width: f64,
        frame_height: f64,
    ) -> WeightedAssociation {
        let threshold = self.proximity_frac * frame_width;
        let wrists: Vec<Point2<f64>> = [BodyPoint::LeftWrist, BodyPoint::RightWrist]
            .iter()
            .filter_map(|&point| skeleton.point(point))
            .map(|p| Point2::new(p.x * frame_width, p.y * frame_height))
            .collect();

        if wrists.is_empty() {
            return WeightedAssociation::none();
        }

        for object in objects {
            let center = object.bbox.center();
            if wrists.iter().any(|wrist| (center - wrist).norm() <= threshold) {
                return WeightedAssociation {
                    is_weighted: true,
                    object_label: Some(object.label.clone()),
                };
            }
        }

        WeightedAssociation::none()
    }
}

impl Default for WeightAssociator {
    fn default() -> Self {
        Self::new()
    }
}
