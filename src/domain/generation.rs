//! Values exchanged with the companion video service.
//!
//! A request is built once per `generate` call from caller input and is
//! never mutated afterwards; a result only exists when a render succeeded.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Input for a single video render
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// Headline shown in the video
    pub title: String,

    /// Body text of the wisdom entry
    pub content: String,

    /// Kind of entry (e.g. "quote", "proverb")
    pub content_type: String,

    /// Where the entry came from (feed or author label)
    pub source_label: String,
}

impl GenerationRequest {
    /// Create a new request
    pub fn new(
        title: impl Into<String>,
        content: impl Into<String>,
        content_type: impl Into<String>,
        source_label: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            content: content.into(),
            content_type: content_type.into(),
            source_label: source_label.into(),
        }
    }
}

/// Successful render reported by the companion service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResult {
    /// Filesystem path of the rendered video
    pub video_path: String,
}

impl GenerationResult {
    pub fn new(video_path: impl Into<String>) -> Self {
        Self {
            video_path: video_path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        Path::new(&self.video_path)
    }
}
