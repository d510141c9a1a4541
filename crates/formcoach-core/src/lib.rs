//! # FormCoach-Core
//!
//! Core types and utilities for the FormCoach real-time motion-analysis
//! and live-audio-coaching engine: landmark frames, the planar geometry
//! kernel, and metric smoothing.

pub mod error;
pub mod geometry;
pub mod smoothing;
pub mod types;

pub use error::{Error, Result};
pub use geometry::*;
pub use smoothing::*;
pub use types::*;
