//! # FormCoach-Audio
//!
//! Bidirectional audio plumbing between the workout session and the live
//! voice coach.
//!
//! Uplink: microphone blocks are captured as 32-bit float samples, converted
//! to 16-bit PCM, and base64-encoded for transport. Downlink: the coach's
//! synthesized speech arrives as PCM chunks that must play back-to-back
//! without gaps even though they arrive at irregular intervals.
//!
//! ## Wire Format
//!
//! Both directions carry 16-bit signed little-endian PCM, base64-encoded
//! with the standard alphabet. Capture runs at 16 kHz, playback at 24 kHz.
//!
//! ## Playback Model
//!
//! [`PlaybackScheduler`] keeps a single virtual clock cursor: each decoded
//! chunk is scheduled to start exactly where the previous one ends. If the
//! queue underruns, the cursor snaps forward to the engine's current time
//! rather than accumulating drift. The [`PlaybackEngine`] trait abstracts
//! the platform audio output; [`SimulatedPlaybackEngine`] is a manual-clock
//! implementation for tests and headless embedders.

pub mod capture;
pub mod playback;
pub mod wire;

pub use capture::*;
pub use playback::*;
pub use wire::*;
