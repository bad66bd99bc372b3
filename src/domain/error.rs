//! Failure taxonomy for video generation.
//!
//! Every failure carries enough text to be shown to a user as-is. The
//! retry loop consults [`GenerationError::is_retryable`]; everything else
//! is surfaced to the caller unchanged.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while generating a video
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GenerationError {
    #[error("Video server could not be started: {0}")]
    ServerStartFailed(String),

    #[error("Failed to encode generation request: {0}")]
    EncodingFailed(String),

    #[error("Video server returned HTTP {code}: {body}")]
    HttpStatus { code: u16, body: String },

    #[error("Invalid response from video server: {0}")]
    InvalidResponse(String),

    #[error("Video generation failed: {0}")]
    GenerationFailed(String),

    #[error("Request to video server failed: {0}")]
    Transport(String),

    #[error("Video generation timed out after {0:?}")]
    Timeout(Duration),
}

impl GenerationError {
    /// Whether another attempt could plausibly succeed.
    ///
    /// Encoding failures are deterministic. Start failures and the outer
    /// timeout are decided above the retry loop and never re-entered.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::HttpStatus { .. }
            | Self::InvalidResponse(_)
            | Self::GenerationFailed(_)
            | Self::Transport(_) => true,
            Self::ServerStartFailed(_) | Self::EncodingFailed(_) | Self::Timeout(_) => false,
        }
    }

    /// Short machine-readable name, used as a tracing field
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ServerStartFailed(_) => "server_start_failed",
            Self::EncodingFailed(_) => "encoding_failed",
            Self::HttpStatus { .. } => "http_status",
            Self::InvalidResponse(_) => "invalid_response",
            Self::GenerationFailed(_) => "generation_failed",
            Self::Transport(_) => "transport",
            Self::Timeout(_) => "timeout",
        }
    }
}

impl From<reqwest::Error> for GenerationError {
    fn from(e: reqwest::Error) -> Self {
        Self::Transport(e.to_string())
    }
}
