//! # FormCoach-Session
//!
//! Workout session orchestration for the FormCoach engine.
//!
//! A session ties the motion-analysis pipeline to the live coaching channel:
//! landmark frames drive the repetition counter, classifier, and velocity
//! tracker; microphone blocks are encoded and forwarded to the coach; the
//! coach's synthesized speech is scheduled for gap-free playback.
//!
//! ## Callback Model
//!
//! The host app calls [`WorkoutSession::process_frame`] from its pose
//! callback and [`WorkoutSession::process_audio_block`] from its audio
//! callback; both are synchronous and non-blocking. A periodic task awaits
//! [`WorkoutSession::pump`] to move queued payloads across the async channel
//! boundary.
//!
//! ## Collaborators
//!
//! The coaching transport is abstracted behind [`CoachingChannel`] and the
//! platform audio output behind `PlaybackEngine`; simulated implementations
//! of both ship in-crate for tests and offline sessions.

pub mod channel;
pub mod config;
pub mod events;
pub mod session;

pub use channel::*;
pub use config::*;
pub use events::*;
pub use session::*;
