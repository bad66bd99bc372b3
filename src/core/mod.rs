//! Core orchestration logic.
//!
//! This module contains:
//! - RetryPolicy: bounded attempts with linear backoff
//! - Deadline: races an operation against a timer
//! - VideoGenerationOrchestrator: ensure-running, generate, shutdown

pub mod deadline;
pub mod orchestrator;
pub mod retry;

// Re-export commonly used types
pub use deadline::Deadline;
pub use orchestrator::VideoGenerationOrchestrator;
pub use retry::RetryPolicy;
