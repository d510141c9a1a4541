//! Planar geometry kernel for landmark frames.
//!
//! All functions are pure. Angle inputs are three landmarks (A, vertex B, C);
//! the output is the unsigned angle at B obtained from the difference of the
//! two atan2 bearings B→A and B→C, reflected into [0°, 180°]. Distances are
//! Euclidean in normalized-frame units.
//!
//! Missing or low-confidence landmarks are the caller's concern; the
//! `skeleton_*` helpers make that check uniform by returning `None` whenever
//! a required point is below the confidence floor.

use crate::types::{BodyPoint, Landmark, Skeleton};

/// Unsigned joint angle at `vertex` in degrees, in [0, 180].
pub fn joint_angle_deg(a: &Landmark, vertex: &Landmark, c: &Landmark) -> f64 {
    let bearing_a = (a.y - vertex.y).atan2(a.x - vertex.x);
    let bearing_c = (c.y - vertex.y).atan2(c.x - vertex.x);

    let mut degrees = (bearing_c - bearing_a).to_degrees().abs();
    if degrees > 180.0 {
        degrees = 360.0 - degrees;
    }
    degrees
}

/// Planar Euclidean distance between two landmarks in normalized-frame units.
pub fn planar_distance(a: &Landmark, b: &Landmark) -> f64 {
    (b.position() - a.position()).norm()
}

/// Joint angle at `vertex`, or `None` if any of the three points is missing
/// or below the confidence floor.
pub fn skeleton_angle(
    skeleton: &Skeleton,
    a: BodyPoint,
    vertex: BodyPoint,
    c: BodyPoint,
) -> Option<f64> {
    let a = skeleton.visible(a)?;
    let v = skeleton.visible(vertex)?;
    let c = skeleton.visible(c)?;
    Some(joint_angle_deg(a, v, c))
}

/// Distance between two skeleton points, or `None` if either is missing or
/// below the confidence floor.
pub fn skeleton_distance(skeleton: &Skeleton, a: BodyPoint, b: BodyPoint) -> Option<f64> {
    let a = skeleton.visible(a)?;
    let b = skeleton.visible(b)?;
    Some(planar_distance(a, b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Timestamp;

    fn lm(x: f64, y: f64) -> Landmark {
        Landmark::new(x, y)
    }

    #[test]
    fn test_right_angle() {
        let angle = joint_angle_deg(&lm(1.0, 0.0), &lm(0.0, 0.0), &lm(0.0, 1.0));
        assert!((angle - 90.0).abs() < 1e-9);
    }

    #[test]
    fn test_straight_line_is_180() {
        let angle = joint_angle_deg(&lm(0.0, 0.5), &lm(0.5, 0.5), &lm(1.0, 0.5));
        assert!((angle - 180.0).abs() < 1e-9);
    }

    #[test]
    fn test_angle_range_and_symmetry() {
        // Sweep one arm around the vertex; the result must stay in [0, 180]
        // and be invariant under swapping the two arms.
        let vertex = lm(0.5, 0.5);
        let fixed = lm(0.9, 0.5);
        for i in 0..72 {
            let theta = i as f64 * 5.0_f64.to_radians();
            let moving = lm(0.5 + 0.3 * theta.cos(), 0.5 + 0.3 * theta.sin());

            let forward = joint_angle_deg(&fixed, &vertex, &moving);
            let swapped = joint_angle_deg(&moving, &vertex, &fixed);

            assert!((0.0..=180.0).contains(&forward), "angle out of range: {forward}");
            assert!((forward - swapped).abs() < 1e-9, "asymmetric at step {i}");
        }
    }

    #[test]
    fn test_planar_distance() {
        let d = planar_distance(&lm(0.0, 0.0), &lm(0.3, 0.4));
        assert!((d - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_skeleton_angle_requires_visible_points() {
        let mut skeleton = Skeleton::new(Timestamp::from_millis(0))
            .with_landmark(BodyPoint::LeftHip, lm(0.5, 0.4))
            .with_landmark(BodyPoint::LeftKnee, lm(0.5, 0.6))
            .with_landmark(BodyPoint::LeftAnkle, lm(0.5, 0.8));

        let angle = skeleton_angle(
            &skeleton,
            BodyPoint::LeftHip,
            BodyPoint::LeftKnee,
            BodyPoint::LeftAnkle,
        );
        assert!((angle.unwrap() - 180.0).abs() < 1e-9);

        // Drop the ankle below the confidence floor: the helper must bail out.
        skeleton.set(
            BodyPoint::LeftAnkle,
            lm(0.5, 0.8).with_visibility(0.2),
        );
        assert!(skeleton_angle(
            &skeleton,
            BodyPoint::LeftHip,
            BodyPoint::LeftKnee,
            BodyPoint::LeftAnkle,
        )
        .is_none());
    }
}
