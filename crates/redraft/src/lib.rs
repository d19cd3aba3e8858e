//! Resumable, checkpointed rewriting of long documents.
//!
//! A document is split into segments and every segment passes through the
//! stages of the run's processing mode (polish, emotion polish, enhance),
//! each backed by a generative text service. Progress, outputs, rolling
//! history and a change audit are committed to SQLite as they happen, so a
//! failed or interrupted run picks up where it stopped.

pub mod ai;
pub mod broadcast;
pub mod config;
pub mod db;
pub mod error;
pub mod gate;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod secrets;
pub mod text;

pub use ai::{AiError, DefaultPrompts, GenerativeService, OpenAiServiceFactory, PromptProvider};
pub use broadcast::{RunProgressBroadcaster, RunProgressEvent};
pub use config::{load_settings, Settings};
pub use db::{Database, DatabaseError};
pub use error::{ConfigError, RedraftError, Result};
pub use gate::{AdmissionGate, SlotGate};
pub use model::{ProcessingMode, RunStatus, SegmentStatus, Stage, Turn};
pub use pipeline::{NewRun, RunController, RunError};
pub use secrets::SecretError;
