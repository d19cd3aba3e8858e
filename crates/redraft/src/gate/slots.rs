use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use super::AdmissionGate;

/// In-process FIFO admission with a fixed number of slots.
///
/// Releasing a slot promotes the longest-waiting run and wakes every
/// `wait_until_active` caller so the promoted one resumes immediately.
pub struct SlotGate {
    capacity: usize,
    state: Mutex<SlotState>,
    notify: Notify,
}

#[derive(Default)]
struct SlotState {
    active: HashSet<String>,
    waiting: VecDeque<String>,
}

impl SlotGate {
    /// # Panics
    /// Panics if `capacity` is 0.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "capacity must be > 0");
        Self {
            capacity,
            state: Mutex::new(SlotState::default()),
            notify: Notify::new(),
        }
    }

    fn state(&self) -> MutexGuard<'_, SlotState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn active_count(&self) -> usize {
        self.state().active.len()
    }

    pub fn queued_count(&self) -> usize {
        self.state().waiting.len()
    }
}

#[async_trait]
impl AdmissionGate for SlotGate {
    async fn acquire(&self, run_id: &str) -> bool {
        let mut state = self.state();
        if state.active.contains(run_id) {
            return true;
        }
        if state.active.len() < self.capacity {
            state.active.insert(run_id.to_string());
            return true;
        }
        if !state.waiting.iter().any(|id| id == run_id) {
            state.waiting.push_back(run_id.to_string());
        }
        log::info!(
            "Run {} queued ({} waiting, {} active)",
            run_id,
            state.waiting.len(),
            state.active.len()
        );
        false
    }

    fn is_active(&self, run_id: &str) -> bool {
        self.state().active.contains(run_id)
    }

    fn release(&self, run_id: &str) {
        let mut state = self.state();
        if !state.active.remove(run_id) {
            state.waiting.retain(|id| id != run_id);
        }

        let mut promoted = false;
        while state.active.len() < self.capacity {
            let Some(next) = state.waiting.pop_front() else {
                break;
            };
            log::debug!("Run {} admitted from queue", next);
            state.active.insert(next);
            promoted = true;
        }
        drop(state);

        if promoted {
            self.notify.notify_waiters();
        }
    }

    async fn wait_until_active(&self, run_id: &str, poll_interval: Duration) {
        loop {
            // Registered before the check so a promotion in between still wakes us.
            let notified = self.notify.notified();
            if self.is_active(run_id) {
                return;
            }
            let _ = tokio::time::timeout(poll_interval, notified).await;
        }
    }
}
