//! Error taxonomy shared by the audio thread, library intake and the UI.

/// Failures surfaced by player operations.
///
/// None of these are retried automatically; each one is terminal for the
/// action that produced it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Microphone capture was refused or no capture device is available.
    #[error("microphone unavailable: {0}")]
    PermissionDenied(String),

    /// The media element could not open, fetch, decode or start a source.
    #[error("playback failed: {0}")]
    PlaybackFailure(String),

    /// A file offered for intake is not an audio file.
    #[error("not an audio file: {0}")]
    UnknownSource(String),
}

pub type Result<T> = std::result::Result<T, Error>;
