use thiserror::Error;

use crate::VideoRef;

/// Everything that can go wrong while turning a URL into transcript text.
///
/// None of these are retried; each one ends the current call.
#[derive(Debug, Error)]
pub enum TranscriptError {
    /// The input is not a recognizable YouTube URL, or carries no video id
    #[error("invalid YouTube URL: {0}")]
    InvalidUrl(String),

    /// Captions are turned off for the video
    #[error("transcripts are disabled for video {0}")]
    TranscriptsDisabled(VideoRef),

    /// The video has no caption track we can use
    #[error("no transcript found for video {0}")]
    TranscriptNotFound(VideoRef),

    /// The caption source could not be reached or answered with a failure status
    #[error("transcript source unavailable: {0}")]
    UpstreamUnavailable(String),

    /// Anything else, e.g. a response we could not make sense of
    #[error("unexpected failure: {0}")]
    Unexpected(String),
}

impl From<reqwest::Error> for TranscriptError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            TranscriptError::Unexpected(err.to_string())
        } else {
            TranscriptError::UpstreamUnavailable(err.to_string())
        }
    }
}

pub type Result<T> = std::result::Result<T, TranscriptError>;
