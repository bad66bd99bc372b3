//! Adapter interfaces for the companion video service.
//!
//! The orchestrator talks to the service through two seams: a
//! [`GenerationBackend`] that performs one render round trip, and a
//! [`ProcessSupervisor`] that owns the service's process lifecycle.

pub mod companion;
pub mod process;

use anyhow::Result;
use async_trait::async_trait;

use crate::domain::{GenerationError, GenerationRequest, GenerationResult};

// Re-export the concrete adapters
pub use companion::{GeneratePayload, GenerationClient};
pub use process::CompanionProcess;

/// One request/response round trip against the render endpoint
#[async_trait]
pub trait GenerationBackend: Send + Sync {
    /// Send a single render request. Never retries internally.
    async fn send(&self, request: &GenerationRequest) -> Result<GenerationResult, GenerationError>;
}

/// Lifecycle control for the companion process
#[async_trait]
pub trait ProcessSupervisor: Send + Sync {
    /// Fast liveness probe
    async fn is_running(&self) -> bool;

    /// Start the service. Succeeds without side effects when already running.
    async fn start(&self) -> Result<()>;

    /// Stop the service. Stopping a stopped service is a no-op.
    async fn stop(&self);
}
