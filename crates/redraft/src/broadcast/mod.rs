//! Broadcasting of run progress for real-time streaming to any front end.

pub mod run_progress;

pub use run_progress::{RunPhase, RunProgressBroadcaster, RunProgressEvent};
