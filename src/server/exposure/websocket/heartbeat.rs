//! Heartbeat-based liveness monitor
//!
//! Per-connection state machine, driven once per interval:
//!
//! ```text
//! ALIVE ──probe sent, flag cleared──▶ AWAITING_PONG ──pong──▶ ALIVE
//!                                          │
//!                          next cycle, flag still cleared
//!                                          ▼
//!                                     TERMINATED
//! ```
//!
//! A silent connection is terminated on the second cycle after it stops
//! answering at the latest. Terminating one connection never stops the loop.

use super::manager::ConnectionManager;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use uuid::Uuid;

/// Probe interval used when nothing is configured
pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

/// What one sweep did
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    /// Connections sent a new probe
    pub probed: usize,
    /// Connections terminated for missing the previous probe
    pub terminated: Vec<Uuid>,
}

/// Periodically pings every connection and prunes the unresponsive ones
pub struct LivenessMonitor {
    manager: Arc<ConnectionManager>,
    interval: Duration,
}

impl LivenessMonitor {
    /// Create a monitor over `manager` probing every `interval`
    pub fn new(manager: Arc<ConnectionManager>, interval: Duration) -> Self {
        Self { manager, interval }
    }

    /// The configured probe interval
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Run a single probe cycle
    pub async fn sweep(&self) -> SweepReport {
        let cycle = self.manager.probe_liveness().await;
        let mut terminated = Vec::with_capacity(cycle.stale.len());

        for sid in cycle.stale {
            if self.manager.terminate(&sid).await {
                tracing::info!(sid = %sid, "Terminating connection that missed heartbeat");
                terminated.push(sid);
            }
        }

        SweepReport {
            probed: cycle.probed,
            terminated,
        }
    }

    /// Sweep forever, once per interval
    ///
    /// The first sweep happens one full interval after start.
    pub async fn run(self) {
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(
            interval_secs = self.interval.as_secs_f64(),
            "Liveness monitor started"
        );

        loop {
            ticker.tick().await;
            let report = self.sweep().await;
            tracing::trace!(
                probed = report.probed,
                terminated = report.terminated.len(),
                "Heartbeat sweep complete"
            );
        }
    }

    /// Spawn [`run`](Self::run) as a background task
    ///
    /// Abort the returned handle to cancel the timer.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}
