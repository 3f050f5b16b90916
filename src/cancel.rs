//! Merges the user abort, remote health checks and natural completion into
//! the one-way cancel signal of a streamed request.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use agent_provider::{CancelReason, CancelSignal, InstanceMonitor};
use tracing::{debug, info, warn};

/// Whether step boundaries query the remote instance status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum HealthCheckPolicy {
    #[default]
    Disabled,
    EveryStep,
}

impl HealthCheckPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disabled => "disabled",
            Self::EveryStep => "every_step",
        }
    }
}

impl fmt::Display for HealthCheckPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HealthCheckPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "disabled" | "off" | "0" | "false" | "no" => Ok(Self::Disabled),
            "every_step" | "every-step" | "on" | "1" | "true" | "yes" => Ok(Self::EveryStep),
            other => Err(format!(
                "unknown health check policy '{other}' (expected disabled or every_step)"
            )),
        }
    }
}

struct HealthProbe {
    monitor: Arc<dyn InstanceMonitor>,
    instance_id: String,
    in_flight: AtomicBool,
}

impl HealthProbe {
    fn run(&self, signal: &CancelSignal) {
        let _reset = InFlightReset(&self.in_flight);

        match self.monitor.instance(&self.instance_id) {
            Ok(info) if info.is_healthy() => {
                debug!(instance_id = %self.instance_id, "instance healthy");
            }
            Ok(info) => {
                warn!(
                    instance_id = %self.instance_id,
                    status = %info.status,
                    error = info.error.as_deref().unwrap_or(""),
                    "instance is no longer running; cancelling stream"
                );
                signal.cancel(CancelReason::InstanceTerminated);
            }
            Err(error) => {
                warn!(instance_id = %self.instance_id, %error, "instance status query failed; cancelling stream");
                signal.cancel(CancelReason::InstanceTerminated);
            }
        }
    }
}

struct InFlightReset<'a>(&'a AtomicBool);

impl Drop for InFlightReset<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Owns the triggers that may end one streamed request.
///
/// Every trigger funnels into the same [`CancelSignal`]; the first one to fire
/// decides the recorded reason and later ones are no-ops.
#[derive(Clone)]
pub struct CancellationCoordinator {
    signal: CancelSignal,
    health: Option<Arc<HealthProbe>>,
}

impl fmt::Debug for CancellationCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationCoordinator")
            .field("signal", &self.signal)
            .field(
                "health_check",
                &self.health.as_ref().map(|probe| probe.instance_id.as_str()),
            )
            .finish()
    }
}

impl CancellationCoordinator {
    #[must_use]
    pub fn new(signal: CancelSignal) -> Self {
        Self {
            signal,
            health: None,
        }
    }

    /// Enables per-step status queries against `instance_id` when `policy`
    /// asks for them.
    #[must_use]
    pub fn with_health_check(
        mut self,
        policy: HealthCheckPolicy,
        monitor: Arc<dyn InstanceMonitor>,
        instance_id: impl Into<String>,
    ) -> Self {
        self.health = match policy {
            HealthCheckPolicy::Disabled => None,
            HealthCheckPolicy::EveryStep => Some(Arc::new(HealthProbe {
                monitor,
                instance_id: instance_id.into(),
                in_flight: AtomicBool::new(false),
            })),
        };
        self
    }

    pub fn signal(&self) -> &CancelSignal {
        &self.signal
    }

    pub fn has_health_check(&self) -> bool {
        self.health.is_some()
    }

    pub fn is_cancelled(&self) -> bool {
        self.signal.is_cancelled()
    }

    pub fn reason(&self) -> Option<CancelReason> {
        self.signal.reason()
    }

    pub fn abort(&self) -> bool {
        self.trigger(CancelReason::UserAbort)
    }

    pub fn complete(&self) -> bool {
        self.trigger(CancelReason::Completed)
    }

    fn trigger(&self, reason: CancelReason) -> bool {
        let won = self.signal.cancel(reason);
        if won {
            info!(%reason, "stream cancelled");
        }
        won
    }

    /// Called once per observed step. Starts a detached status query unless
    /// health checks are off, the signal already fired, or a query is still
    /// outstanding.
    ///
    /// The handle is returned for callers that want to wait on the query; it
    /// is fine to drop it.
    pub fn on_step_boundary(&self) -> Option<JoinHandle<()>> {
        let probe = self.health.as_ref()?;
        if self.signal.is_cancelled() {
            return None;
        }
        if probe
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!(instance_id = %probe.instance_id, "health check already in flight");
            return None;
        }

        let worker_probe = Arc::clone(probe);
        let signal = self.signal.clone();
        let spawned = thread::Builder::new()
            .name(format!("instance-health-{}", probe.instance_id))
            .spawn(move || worker_probe.run(&signal));

        match spawned {
            Ok(handle) => Some(handle),
            Err(error) => {
                probe.in_flight.store(false, Ordering::Release);
                warn!(%error, "failed to spawn health check worker");
                None
            }
        }
    }
}
