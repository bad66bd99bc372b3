//! Companion process supervisor.
//!
//! Spawns the local video server on demand and tears it down on shutdown.
//! Liveness is a TCP connect to the service's host and port, so a server
//! started outside this process counts as running and is never spawned
//! twice. Only a child spawned here is ever killed.

use std::process::Stdio;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use tokio::net::TcpStream;
use tokio::process::{Child, Command};
use tokio::sync::Mutex;
use tokio::time::{timeout, Instant};
use tracing::{debug, info, warn};

use super::ProcessSupervisor;
use crate::config::CompanionSettings;

/// How long `stop` waits for the child to exit after killing it
const STOP_GRACE: Duration = Duration::from_secs(5);

/// Supervisor for a companion server spawned as a child process
pub struct CompanionProcess {
    settings: CompanionSettings,
    /// host:port probed for liveness
    address: String,
    /// Child spawned by this supervisor, if any. Held across the whole
    /// start sequence so concurrent starts cannot double-spawn.
    child: Mutex<Option<Child>>,
}

impl CompanionProcess {
    /// Create a supervisor for the service rooted at `endpoint`
    pub fn new(endpoint: &str, settings: CompanionSettings) -> Result<Self> {
        let address = probe_address(endpoint)?;
        Ok(Self {
            settings,
            address,
            child: Mutex::new(None),
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    async fn probe(&self) -> bool {
        matches!(
            timeout(self.settings.probe_timeout, TcpStream::connect(&self.address)).await,
            Ok(Ok(_))
        )
    }

    fn spawn(&self) -> Result<Child> {
        let mut command = Command::new(&self.settings.command);
        command
            .args(&self.settings.args)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        if let Some(dir) = &self.settings.working_dir {
            command.current_dir(dir);
        }

        match &self.settings.log_file {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent).with_context(|| {
                        format!("Failed to create log directory: {}", parent.display())
                    })?;
                }
                let log = std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)
                    .with_context(|| format!("Failed to open companion log: {}", path.display()))?;
                let log_err = log
                    .try_clone()
                    .context("Failed to duplicate companion log handle")?;
                command.stdout(log).stderr(log_err);
            }
            None => {
                command.stdout(Stdio::null()).stderr(Stdio::null());
            }
        }

        command.spawn().with_context(|| {
            format!(
                "Failed to spawn companion process '{}'",
                self.settings.command
            )
        })
    }

    /// Poll until the service answers, the child dies, or startup times out
    async fn wait_until_ready(&self, child: &mut Child) -> Result<()> {
        let deadline = Instant::now() + self.settings.startup_timeout;

        loop {
            if self.probe().await {
                return Ok(());
            }

            if let Some(status) = child
                .try_wait()
                .context("Failed to check companion process status")?
            {
                anyhow::bail!(
                    "Companion process exited with {} before accepting connections on {}",
                    status,
                    self.address
                );
            }

            if Instant::now() >= deadline {
                anyhow::bail!(
                    "Companion process did not accept connections on {} within {:?}",
                    self.address,
                    self.settings.startup_timeout
                );
            }

            tokio::time::sleep(self.settings.poll_interval).await;
        }
    }
}

#[async_trait]
impl ProcessSupervisor for CompanionProcess {
    async fn is_running(&self) -> bool {
        self.probe().await
    }

    async fn start(&self) -> Result<()> {
        let mut guard = self.child.lock().await;

        // Checked under the lock: a concurrent start may have just finished
        if self.probe().await {
            debug!(address = %self.address, "Companion already running");
            return Ok(());
        }

        // A previously spawned child that no longer answers is replaced
        if let Some(mut stale) = guard.take() {
            warn!(address = %self.address, "Companion process unresponsive, replacing it");
            let _ = stale.start_kill();
            let _ = timeout(STOP_GRACE, stale.wait()).await;
        }

        info!(
            command = %self.settings.command,
            address = %self.address,
            "Starting companion process"
        );

        let started = Instant::now();
        let mut child = self.spawn()?;

        match self.wait_until_ready(&mut child).await {
            Ok(()) => {
                info!(
                    pid = ?child.id(),
                    startup_ms = started.elapsed().as_millis() as u64,
                    "Companion process ready"
                );
                *guard = Some(child);
                Ok(())
            }
            Err(e) => {
                let _ = child.start_kill();
                let _ = timeout(STOP_GRACE, child.wait()).await;
                Err(e)
            }
        }
    }

    async fn stop(&self) {
        let Some(mut child) = self.child.lock().await.take() else {
            debug!("No companion process owned, nothing to stop");
            return;
        };

        let pid = child.id();
        if let Err(e) = child.start_kill() {
            // Already exited and reaped
            debug!(?pid, error = %e, "Companion process was not running");
            return;
        }

        match timeout(STOP_GRACE, child.wait()).await {
            Ok(Ok(status)) => info!(?pid, %status, "Companion process stopped"),
            Ok(Err(e)) => warn!(?pid, error = %e, "Failed to reap companion process"),
            Err(_) => warn!(?pid, "Companion process did not exit within {:?}", STOP_GRACE),
        }
    }
}

/// Extract host:port from the service endpoint URL
fn probe_address(endpoint: &str) -> Result<String> {
    let url = reqwest::Url::parse(endpoint)
        .with_context(|| format!("Invalid companion endpoint: {}", endpoint))?;
    let host = url
        .host_str()
        .with_context(|| format!("Companion endpoint has no host: {}", endpoint))?;
    let port = url
        .port_or_known_default()
        .with_context(|| format!("Companion endpoint has no port: {}", endpoint))?;

    Ok(format!("{}:{}", host, port))
}
