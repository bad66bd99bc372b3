//! Deadline race: run an operation against a timer, keep the winner.
//!
//! The operation and the timer share one cancellation token. When either
//! side finishes the token is cancelled and the operation future is
//! dropped before `race` returns, which aborts any HTTP request it still
//! holds. A late completion can therefore never be observed.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::domain::GenerationError;

/// Upper bound on how long an operation may run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    duration: Duration,
}

impl Deadline {
    pub fn new(duration: Duration) -> Self {
        Self { duration }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Run `operation`, failing with [`GenerationError::Timeout`] if the
    /// deadline elapses first.
    ///
    /// The operation receives a token that is cancelled as soon as the race
    /// is decided; work it hands off elsewhere should watch it.
    pub async fn race<T, F, Fut>(&self, operation: F) -> Result<T, GenerationError>
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: Future<Output = Result<T, GenerationError>>,
    {
        let token = CancellationToken::new();
        let mut work = Box::pin(operation(token.clone()));

        let outcome = tokio::select! {
            // A result that lands on the deadline still counts
            biased;
            result = &mut work => result,
            _ = tokio::time::sleep(self.duration) => {
                warn!(deadline_ms = self.duration.as_millis() as u64, "Deadline elapsed, cancelling operation");
                Err(GenerationError::Timeout(self.duration))
            }
        };

        token.cancel();
        drop(work);

        outcome
    }
}
