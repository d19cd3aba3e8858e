use crate::broadcast::{RunProgressBroadcaster, RunProgressEvent};

pub trait ProgressReporter: Send + Sync {
    fn report(&self, event: RunProgressEvent);
}

/// Discards every event.
pub struct NoopProgress;

impl ProgressReporter for NoopProgress {
    fn report(&self, _event: RunProgressEvent) {}
}

impl ProgressReporter for RunProgressBroadcaster {
    fn report(&self, event: RunProgressEvent) {
        self.send(event);
    }
}
