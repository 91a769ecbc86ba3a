//! Service stabilization polling
//!
//! After a rollout the watcher polls the live service status until it is
//! stable, the deadline passes, or the run is cancelled. The deadline is
//! the only bound: fetch errors are logged and retried after a short
//! backoff with no retry cap, and a service that is not visible yet counts
//! as not stable.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, sleep_until, timeout_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backend::ClusterBackend;

/// How a watch ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stability {
    Stable,
    TimedOut,
    Cancelled,
}

impl Stability {
    pub fn is_stable(&self) -> bool {
        matches!(self, Stability::Stable)
    }
}

/// Polls a service until it is stable
pub struct StabilityWatcher {
    backend: Arc<dyn ClusterBackend>,
    poll_interval: Duration,
    error_backoff: Duration,
}

impl StabilityWatcher {
    pub fn new(backend: Arc<dyn ClusterBackend>, poll_interval: Duration, error_backoff: Duration) -> Self {
        Self {
            backend,
            poll_interval,
            error_backoff,
        }
    }

    /// Returns true once the service is stable, false on timeout or cancel
    pub async fn await_stable(
        &self,
        cluster: &str,
        service: &str,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> bool {
        self.watch(cluster, service, timeout, cancel).await.is_stable()
    }

    /// Polls until stable, timed out or cancelled
    ///
    /// Every poll fetches a fresh status. No sleep extends past the
    /// deadline, so a never-stable service is reported exactly when the
    /// elapsed time reaches `timeout`.
    pub async fn watch(
        &self,
        cluster: &str,
        service: &str,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Stability {
        let started = Instant::now();
        let deadline = started + timeout;
        let mut polls: u32 = 0;

        info!(
            cluster,
            service,
            timeout_secs = timeout.as_secs(),
            "waiting for service to become stable"
        );

        loop {
            if Instant::now() >= deadline {
                warn!(
                    cluster,
                    service,
                    polls,
                    "service did not stabilize within {}s",
                    timeout.as_secs()
                );
                return Stability::TimedOut;
            }

            polls += 1;
            let fetched = tokio::select! {
                () = cancel.cancelled() => return self.cancelled(service, polls),
                fetched = timeout_at(deadline, self.backend.service_status(cluster, service)) => fetched,
            };

            let wait = match fetched {
                // The deadline hit while the fetch was in flight
                Err(_) => continue,
                Ok(Ok(Some(status))) if status.is_stable() => {
                    info!(
                        service,
                        polls,
                        running = status.running_count,
                        desired = status.desired_count,
                        elapsed_secs = started.elapsed().as_secs(),
                        "service is stable"
                    );
                    return Stability::Stable;
                }
                Ok(Ok(Some(status))) => {
                    info!(
                        service,
                        lifecycle = %status.lifecycle,
                        running = status.running_count,
                        desired = status.desired_count,
                        pending = status.pending_count,
                        "service not yet stable"
                    );
                    self.poll_interval
                }
                Ok(Ok(None)) => {
                    debug!(service, "service not visible yet");
                    self.poll_interval
                }
                Ok(Err(e)) => {
                    warn!(
                        service,
                        transient = e.is_transient(),
                        "failed to fetch service status, retrying in {}s: {}",
                        self.error_backoff.as_secs(),
                        e
                    );
                    self.error_backoff
                }
            };

            let wake = (Instant::now() + wait).min(deadline);
            tokio::select! {
                () = cancel.cancelled() => return self.cancelled(service, polls),
                () = sleep_until(wake) => {}
            }
        }
    }

    fn cancelled(&self, service: &str, polls: u32) -> Stability {
        warn!(service, polls, "stability wait cancelled");
        Stability::Cancelled
    }
}
