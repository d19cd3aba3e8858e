//! Admission control for concurrently active runs.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::MissedTickBehavior;

pub mod slots;

pub use slots::SlotGate;

/// Bounds how many runs are active at once. Capacity and queueing policy
/// belong to the implementation.
#[async_trait]
pub trait AdmissionGate: Send + Sync {
    /// Requests admission. `false` means the run is queued.
    async fn acquire(&self, run_id: &str) -> bool;

    fn is_active(&self, run_id: &str) -> bool;

    /// Gives the slot (or queue position) back. Must tolerate repeated calls
    /// and ids it has never seen.
    fn release(&self, run_id: &str);

    /// Suspends until `run_id` becomes active, checking at most every
    /// `poll_interval`. Implementations that can signal activation should
    /// override this to wake earlier.
    async fn wait_until_active(&self, run_id: &str, poll_interval: Duration) {
        let mut ticker = tokio::time::interval(poll_interval.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        while !self.is_active(run_id) {
            ticker.tick().await;
        }
    }
}

/// Releases the run's admission when dropped, whichever way the run exits.
pub struct AdmissionGuard {
    gate: Arc<dyn AdmissionGate>,
    run_id: String,
}

impl AdmissionGuard {
    pub fn new(gate: Arc<dyn AdmissionGate>, run_id: &str) -> Self {
        Self {
            gate,
            run_id: run_id.to_string(),
        }
    }
}

impl Drop for AdmissionGuard {
    fn drop(&mut self) {
        log::debug!("Releasing admission for run {}", self.run_id);
        self.gate.release(&self.run_id);
    }
}
