//! Error types shared across the FormCoach workspace.

use thiserror::Error;

/// Top-level error type for the workout engine.
#[derive(Error, Debug)]
pub enum Error {
    /// Session configuration referenced an exercise id that is not in the catalog.
    #[error("unknown exercise id '{0}': not present in the exercise catalog")]
    UnknownExercise(String),

    /// Inbound audio chunk could not be decoded (bad base64, odd byte count).
    #[error("audio decode error: {0}")]
    AudioDecode(String),

    /// Coaching channel failed to connect, send, or receive.
    #[error("coaching channel error: {0}")]
    Channel(String),

    /// Audio playback could not be scheduled.
    #[error("playback error: {0}")]
    Playback(String),

    /// Settings file or environment could not be loaded.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
