//! # FormCoach-Motion
//!
//! Exercise intelligence on top of per-frame skeletons: the built-in
//! exercise catalog, repetition counting, pose-based exercise suggestion,
//! movement velocity, and weighted-object association.
//!
//! Everything here is synchronous and allocation-light; the session layer
//! drives it once per pose frame.

pub mod catalog;
pub mod classifier;
pub mod counter;
pub mod objects;
pub mod velocity;

pub use catalog::{
    ExerciseCatalog, ExerciseDefinition, MetricFn, MetricSample, ThresholdMode, Thresholds,
};
pub use classifier::{classify, pose_features, PoseFeatures};
pub use counter::{MachineState, RepCounter, RepEvent, RepSnapshot};
pub use objects::{
    BoundingBox, DetectedObject, WeightAssociator, WeightedAssociation, WRIST_PROXIMITY_FRAC,
};
pub use velocity::{
    wrist_center, VelocityTracker, VelocityUpdate, DEFAULT_SCALE_M_PER_UNIT,
    EXPLOSIVE_VELOCITY_MPS, MAX_FRAME_GAP_SECS,
};
