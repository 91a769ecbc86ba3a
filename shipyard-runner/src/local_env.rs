//! Local compose verification
//!
//! Brings the freshly built image up with compose, probes its health
//! endpoint and tears the environment down again. Teardown happens on
//! every exit path: after success, after a failed start or probe, and
//! from `Drop` if the verification future itself is abandoned.

use std::sync::Arc;

use shipyard_core::domain::build::BuildSpec;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::backend::BuildBackend;
use crate::context::VerifySettings;
use crate::error::{PipelineError, Result};

/// Tears the environment down if dropped while still armed
struct TeardownGuard {
    backend: Arc<dyn BuildBackend>,
    spec: BuildSpec,
    armed: bool,
}

impl TeardownGuard {
    fn new(backend: Arc<dyn BuildBackend>, spec: BuildSpec) -> Self {
        Self {
            backend,
            spec,
            armed: true,
        }
    }

    /// Explicit async teardown; disarms the guard
    async fn teardown(mut self) -> Result<()> {
        self.armed = false;
        // A fresh token: teardown must still run when the run is cancelled
        self.backend
            .compose_down(&self.spec, &CancellationToken::new())
            .await
    }
}

impl Drop for TeardownGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        warn!("local environment abandoned, tearing down in background");
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let backend = self.backend.clone();
                let spec = self.spec.clone();
                handle.spawn(async move {
                    if let Err(e) = backend.compose_down(&spec, &CancellationToken::new()).await {
                        error!("background teardown failed: {}", e);
                    }
                });
            }
            Err(_) => error!("no runtime available to tear down local environment"),
        }
    }
}

/// Runs compose up, health probe and compose down
///
/// # Returns
/// Whether the health probe passed. Start, probe and teardown failures are
/// errors; teardown is attempted even when start fails.
pub async fn verify(
    backend: Arc<dyn BuildBackend>,
    spec: &BuildSpec,
    settings: &VerifySettings,
    cancel: &CancellationToken,
) -> Result<bool> {
    info!(compose_file = %spec.compose_file.display(), "verifying image locally");

    let guard = TeardownGuard::new(backend.clone(), spec.clone());
    let probed = probe(backend.as_ref(), spec, settings, cancel).await;
    let torn_down = guard.teardown().await;

    if let Err(e) = &torn_down {
        error!("failed to tear down local environment: {}", e);
    }

    let healthy = probed?;
    torn_down?;
    Ok(healthy)
}

async fn probe(
    backend: &dyn BuildBackend,
    spec: &BuildSpec,
    settings: &VerifySettings,
    cancel: &CancellationToken,
) -> Result<bool> {
    backend.compose_up(spec, cancel).await?;

    tokio::select! {
        () = cancel.cancelled() => return Err(PipelineError::Cancelled),
        () = tokio::time::sleep(settings.warmup) => {}
    }

    let healthy = backend.health_check(&settings.health_url).await?;
    if healthy {
        info!(url = %settings.health_url, "local health check passed");
    } else {
        warn!(url = %settings.health_url, "local health check failed");
    }
    Ok(healthy)
}
