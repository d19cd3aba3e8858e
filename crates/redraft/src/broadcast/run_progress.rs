//! Run progress broadcaster for real-time run status streaming.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::model::{RunStatus, Stage};

/// What a progress event reports.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Queued,
    Processing,
    StageStarted,
    Segment,
    Completed,
    Failed,
}

impl std::fmt::Display for RunPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunPhase::Queued => write!(f, "Queued"),
            RunPhase::Processing => write!(f, "Processing"),
            RunPhase::StageStarted => write!(f, "Stage started"),
            RunPhase::Segment => write!(f, "Segment"),
            RunPhase::Completed => write!(f, "Completed"),
            RunPhase::Failed => write!(f, "Failed"),
        }
    }
}

/// Progress event for a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunProgressEvent {
    pub run_id: String,
    pub phase: RunPhase,
    /// Run status at the time of the event.
    pub status: RunStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
    /// 0-based index of the segment being worked on.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_segments: Option<usize>,
    /// Overall progress in [0, 100].
    pub progress: f64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl RunProgressEvent {
    fn base(run_id: &str, phase: RunPhase, status: RunStatus, message: String) -> Self {
        Self {
            run_id: run_id.to_string(),
            phase,
            status,
            stage: None,
            position: None,
            total_segments: None,
            progress: 0.0,
            message,
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn queued(run_id: &str) -> Self {
        Self::base(
            run_id,
            RunPhase::Queued,
            RunStatus::Queued,
            "Waiting for a free processing slot".to_string(),
        )
    }

    pub fn processing(run_id: &str, progress: f64) -> Self {
        let mut event = Self::base(
            run_id,
            RunPhase::Processing,
            RunStatus::Processing,
            "Run admitted".to_string(),
        );
        event.progress = progress;
        event
    }

    pub fn stage_started(run_id: &str, stage: Stage, total_segments: usize, progress: f64) -> Self {
        let mut event = Self::base(
            run_id,
            RunPhase::StageStarted,
            RunStatus::Processing,
            format!("Starting {} stage", stage),
        );
        event.stage = Some(stage);
        event.total_segments = Some(total_segments);
        event.progress = progress;
        event
    }

    pub fn segment(
        run_id: &str,
        stage: Stage,
        position: usize,
        total_segments: usize,
        progress: f64,
    ) -> Self {
        let mut event = Self::base(
            run_id,
            RunPhase::Segment,
            RunStatus::Processing,
            format!("{}: segment {}/{}", stage, position + 1, total_segments),
        );
        event.stage = Some(stage);
        event.position = Some(position);
        event.total_segments = Some(total_segments);
        event.progress = progress;
        event
    }

    pub fn completed(run_id: &str, total_segments: usize) -> Self {
        let mut event = Self::base(
            run_id,
            RunPhase::Completed,
            RunStatus::Completed,
            "Run completed successfully".to_string(),
        );
        event.total_segments = Some(total_segments);
        event.progress = 100.0;
        event
    }

    pub fn failed(run_id: &str, progress: f64, error: &str) -> Self {
        let mut event = Self::base(
            run_id,
            RunPhase::Failed,
            RunStatus::Failed,
            "Run failed".to_string(),
        );
        event.progress = progress;
        event.error = Some(error.to_string());
        event
    }
}

/// Broadcasts run progress events for streaming.
#[derive(Clone)]
pub struct RunProgressBroadcaster {
    sender: Arc<broadcast::Sender<RunProgressEvent>>,
}

impl RunProgressBroadcaster {
    /// Creates a new broadcaster with the specified channel capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender: Arc::new(sender),
        }
    }

    /// Sends a progress event to all subscribers.
    pub fn send(&self, event: RunProgressEvent) {
        // No active receivers is fine
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RunProgressEvent> {
        self.sender.subscribe()
    }
}

impl Default for RunProgressBroadcaster {
    fn default() -> Self {
        Self::new(256)
    }
}
