//! wisdomreel - Video generation orchestrator for wisdom entries
//!
//! Renders short videos for curated text entries by driving a local
//! companion video server over HTTP.
//!
//! # Architecture
//!
//! The companion is slow to start and slow to render, so it is treated
//! as a remote service:
//! - It is started on demand and stopped on shutdown
//! - Each render is retried a bounded number of times with linear backoff
//! - The whole attempt sequence is raced against a hard deadline
//!
//! # Modules
//!
//! - `adapters`: Companion HTTP client and process supervisor
//! - `core`: Orchestration logic (RetryPolicy, Deadline, Orchestrator)
//! - `domain`: Data structures (GenerationRequest, GenerationResult, GenerationError)
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Render a video for an entry
//! echo "Waste no more time arguing what a good man should be." \
//!     | wisdomreel generate --title "On Time" --content-type quote --source Meditations
//!
//! # Check whether the companion is reachable
//! wisdomreel status
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;

// Re-export main types at crate root for convenience
pub use adapters::{CompanionProcess, GenerationBackend, GenerationClient, ProcessSupervisor};
pub use core::{Deadline, RetryPolicy, VideoGenerationOrchestrator};
pub use domain::{GenerationError, GenerationRequest, GenerationResult};
