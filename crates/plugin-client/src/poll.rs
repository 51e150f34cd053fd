//! Bounded, cancellable polling of the credential status after a QR code
//! has been issued.
//!
//! A [`PollSession`] runs as its own tokio task and ends on the first of:
//! the backend reporting a valid credential, cancellation through its
//! [`PollHandle`] (or dropping the handle), or `max_lifetime` elapsing.
//! Failed checks are logged and polling continues.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::Result;
use crate::client::CredentialStatus;

/// Source of credential status for a poll session.
#[async_trait]
pub trait StatusProbe: Send + Sync {
    /// Check the credential, ignoring ones saved before `since_time` (Unix seconds).
    async fn check(&self, since_time: Option<i64>) -> Result<CredentialStatus>;
}

/// Poll timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Delay between checks; the first check happens one interval after start.
    pub interval: Duration,
    /// Hard bound on the session's lifetime.
    pub max_lifetime: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(3),
            max_lifetime: Duration::from_secs(120),
        }
    }
}

/// How a poll session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// The backend reported a valid credential.
    LoggedIn(CredentialStatus),
    /// `max_lifetime` elapsed without a valid credential.
    TimedOut,
    /// Cancelled by the owner.
    Cancelled,
}

impl PollOutcome {
    pub fn is_logged_in(&self) -> bool {
        matches!(self, Self::LoggedIn(_))
    }
}

/// A poll session that has not been started yet.
pub struct PollSession {
    probe: Arc<dyn StatusProbe>,
    since_time: i64,
    config: PollConfig,
}

impl PollSession {
    pub fn new(probe: Arc<dyn StatusProbe>, since_time: i64, config: PollConfig) -> Self {
        Self {
            probe,
            since_time,
            config,
        }
    }

    /// Start polling on the current tokio runtime.
    pub fn spawn(self) -> PollHandle {
        let token = CancellationToken::new();
        let started_at = Instant::now();
        let task = tokio::spawn(self.run(token.clone()));

        PollHandle {
            token,
            task: Some(task),
            started_at,
        }
    }

    async fn run(self, token: CancellationToken) -> PollOutcome {
        let start = Instant::now();
        let deadline = tokio::time::sleep_until(start + self.config.max_lifetime);
        tokio::pin!(deadline);

        // `interval_at` panics on a zero period.
        let period = self.config.interval.max(Duration::from_millis(1));
        let mut ticker = tokio::time::interval_at(start + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        debug!(
            since_time = self.since_time,
            interval_ms = self.config.interval.as_millis() as u64,
            max_lifetime_secs = self.config.max_lifetime.as_secs(),
            "Poll session started"
        );

        let mut attempt: u32 = 0;
        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    debug!(attempt, "Poll session cancelled");
                    return PollOutcome::Cancelled;
                }
                _ = &mut deadline => {
                    info!(attempt, elapsed_secs = start.elapsed().as_secs(), "Poll session timed out");
                    return PollOutcome::TimedOut;
                }
                _ = ticker.tick() => {}
            }

            attempt += 1;
            let result = tokio::select! {
                biased;
                _ = token.cancelled() => {
                    debug!(attempt, "Poll session cancelled during check");
                    return PollOutcome::Cancelled;
                }
                _ = &mut deadline => {
                    info!(attempt, "Poll session timed out during check");
                    return PollOutcome::TimedOut;
                }
                result = self.probe.check(Some(self.since_time)) => result,
            };

            match result {
                Ok(status) if status.valid => {
                    info!(attempt, "Login confirmed");
                    return PollOutcome::LoggedIn(status);
                }
                Ok(status) => {
                    trace!(attempt, detail = ?status.detail, "Not logged in yet");
                }
                Err(e) => {
                    warn!(attempt, error = %e, "Status check failed, will retry");
                }
            }
        }
    }
}

/// Owner's handle to a running poll session.
///
/// Dropping the handle cancels the session.
#[derive(Debug)]
pub struct PollHandle {
    token: CancellationToken,
    task: Option<JoinHandle<PollOutcome>>,
    started_at: Instant,
}

impl PollHandle {
    /// Stop polling. No further checks are issued after this returns.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    pub fn is_active(&self) -> bool {
        !self.token.is_cancelled() && self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Wait for the session to end.
    pub async fn wait(&mut self) -> PollOutcome {
        let Some(task) = self.task.take() else {
            return PollOutcome::Cancelled;
        };
        match task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, "Poll task failed");
                PollOutcome::Cancelled
            }
        }
    }
}

impl Drop for PollHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}
