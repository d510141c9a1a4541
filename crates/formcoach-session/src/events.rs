//! Session event stream and display projections.

use nalgebra::Point2;
use serde::Serialize;

use formcoach_core::{SessionId, Timestamp};
use formcoach_motion::{MachineState, RepEvent, VelocityUpdate, WeightedAssociation};

use crate::channel::ChannelState;

/// Events a session emits to registered observers.
///
/// Rep completions are one-per-count by construction of the rep machine;
/// suggestions are emitted only when the classifier's guess changes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SessionEvent {
    RepCompleted {
        exercise_id: String,
        count: u32,
        timestamp: Timestamp,
    },
    /// Advisory classifier guess; `None` means no rule matched.
    Suggestion { exercise_id: Option<&'static str> },
    Velocity {
        velocity_mps: f64,
        explosive: bool,
        dx: f64,
        dy: f64,
    },
    Connection { state: ChannelState },
}

/// What one landmark frame produced, returned to the frame callback.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FrameOutcome {
    /// Rep completed by this frame, if any.
    pub rep: Option<RepEvent>,
    /// This frame's classifier guess (ungated).
    pub suggestion: Option<&'static str>,
    /// Wrist velocity reading, when the wrists were visible.
    pub velocity: Option<VelocityUpdate>,
    /// Weighted-object association, when enabled and objects were supplied.
    pub weights: Option<WeightedAssociation>,
}

/// Point-in-time projection of a session for display layers. Reading a
/// snapshot never affects counting.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub session_id: SessionId,
    pub exercise_id: &'static str,
    pub rep_count: u32,
    pub state: MachineState,
    pub progress_percent: f64,
    pub feedback: &'static str,
    /// Normalized coordinate for on-screen feedback placement.
    pub focus: Option<Point2<f64>>,
    pub velocity_mps: f64,
    pub explosive: bool,
    pub suggestion: Option<&'static str>,
    pub channel_state: ChannelState,
    pub elapsed_secs: f64,
}
