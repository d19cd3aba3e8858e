//! The checkpointed rewriting pipeline.
//!
//! [`RunController`] owns a run's lifecycle and hands each stage of the
//! run's mode to [`StageProcessor`], which walks the segments, keeps the
//! rolling history through [`HistoryManager`] and audits every output with
//! [`ChangeRecorder`]. All state is committed as it changes, so a run that
//! fails or is interrupted resumes from what is in the database.

pub mod change_recorder;
pub mod controller;
pub mod error;
pub mod history;
pub mod processor;
pub mod progress;
pub mod services;
pub mod stage;

pub use change_recorder::ChangeRecorder;
pub use controller::{NewRun, RunController};
pub use error::RunError;
pub use history::HistoryManager;
pub use processor::StageProcessor;
pub use progress::{NoopProgress, ProgressReporter};
pub use services::{RunServices, StageBinding};
