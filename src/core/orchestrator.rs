//! Video generation orchestrator.
//!
//! Per `generate` call:
//! 1. EnsureRunning: probe the companion, start it if it is down
//! 2. Generating: `Deadline::race(RetryPolicy::execute(backend.send))`
//! 3. Done: a video path or the most specific error available
//!
//! Backend liveness is never cached; every call asks the supervisor.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use tracing::{debug, error, info, instrument};
use uuid::Uuid;

use crate::adapters::{CompanionProcess, GenerationBackend, GenerationClient, ProcessSupervisor};
use crate::config::ResolvedConfig;
use crate::domain::{GenerationError, GenerationRequest, GenerationResult};

use super::deadline::Deadline;
use super::retry::RetryPolicy;

/// Orchestrates renders against the companion video service.
///
/// Construct once at startup and share; it holds no per-call state.
pub struct VideoGenerationOrchestrator {
    backend: Arc<dyn GenerationBackend>,
    supervisor: Arc<dyn ProcessSupervisor>,
    retry_policy: RetryPolicy,
    deadline: Deadline,
}

impl VideoGenerationOrchestrator {
    /// Create an orchestrator from its collaborators
    pub fn new(
        backend: Arc<dyn GenerationBackend>,
        supervisor: Arc<dyn ProcessSupervisor>,
        retry_policy: RetryPolicy,
        deadline: Deadline,
    ) -> Self {
        Self {
            backend,
            supervisor,
            retry_policy,
            deadline,
        }
    }

    /// Build the HTTP client and process supervisor described by config
    pub fn from_config(config: &ResolvedConfig) -> Result<Self> {
        let client = GenerationClient::from_settings(&config.generator)?;
        let process = CompanionProcess::new(&config.generator.endpoint, config.companion.clone())?;

        Ok(Self::new(
            Arc::new(client),
            Arc::new(process),
            RetryPolicy::from_settings(&config.generator),
            Deadline::new(config.generator.deadline),
        ))
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    pub fn deadline(&self) -> Deadline {
        self.deadline
    }

    /// Make sure the companion is up. Returns whether it is running
    /// afterwards; failures are logged, never raised.
    pub async fn ensure_server_running(&self) -> bool {
        match self.ensure_running().await {
            Ok(()) => true,
            Err(e) => {
                error!(error = %e, "Video server unavailable");
                false
            }
        }
    }

    async fn ensure_running(&self) -> Result<(), GenerationError> {
        if self.supervisor.is_running().await {
            debug!("Video server already running");
            return Ok(());
        }

        info!("Video server not running, starting it");
        self.supervisor
            .start()
            .await
            .map_err(|e| GenerationError::ServerStartFailed(format!("{:#}", e)))
    }

    /// Render one video.
    ///
    /// Every call issues a new render; calling twice renders twice.
    #[instrument(skip(self, request), fields(request_id = %Uuid::new_v4(), title = %request.title))]
    pub async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResult, GenerationError> {
        let started = Instant::now();

        if let Err(e) = self.ensure_running().await {
            error!(error = %e, "Cannot generate video");
            return Err(e);
        }

        let backend = self.backend.as_ref();
        let policy = &self.retry_policy;

        let outcome = self
            .deadline
            .race(|cancel| async move {
                policy
                    .execute(&cancel, move |attempt| {
                        debug!(attempt, max_attempts = policy.max_attempts, "Generation attempt");
                        backend.send(request)
                    })
                    .await
            })
            .await;

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match &outcome {
            Ok(result) => {
                info!(video_path = %result.video_path, elapsed_ms, "Video generated");
            }
            Err(e) => {
                error!(kind = e.kind(), error = %e, elapsed_ms, "Video generation failed");
            }
        }

        outcome
    }

    /// Stop the companion. Called once on application shutdown.
    pub async fn shutdown(&self) {
        info!("Shutting down video server");
        self.supervisor.stop().await;
    }
}
