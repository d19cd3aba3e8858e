//! Run lifecycle: submission, admission, segmentation and the stage sequence.

use std::sync::Arc;

use tracing::{info_span, Instrument};
use uuid::Uuid;

use crate::ai::{DefaultPrompts, PromptProvider, ServiceFactory};
use crate::broadcast::RunProgressEvent;
use crate::config::Settings;
use crate::db::run_repo::{self, RunOverrides, RunRow};
use crate::db::{self, segment_repo, Database};
use crate::gate::{AdmissionGate, AdmissionGuard, SlotGate};
use crate::model::{ProcessingMode, RunStatus};
use crate::text::{ParagraphSegmenter, Segmenter};

use super::error::RunError;
use super::processor::StageProcessor;
use super::progress::{NoopProgress, ProgressReporter};
use super::services::RunServices;

/// A document submitted for rewriting.
#[derive(Debug, Clone, Default)]
pub struct NewRun {
    pub original_text: String,
    /// One of `paper_polish`, `emotion_polish`, `paper_polish_enhance`.
    /// `None` selects the default. Unknown values fail when the run starts.
    pub processing_mode: Option<String>,
    pub overrides: RunOverrides,
}

pub struct RunController {
    db: Database,
    settings: Arc<Settings>,
    gate: Arc<dyn AdmissionGate>,
    segmenter: Arc<dyn Segmenter>,
    prompts: Arc<dyn PromptProvider>,
    factory: Arc<dyn ServiceFactory>,
    progress: Arc<dyn ProgressReporter>,
}

impl RunController {
    /// Controller with an in-process [`SlotGate`] sized from settings,
    /// paragraph segmentation, the built-in prompts and no progress output.
    pub fn new(db: Database, settings: Arc<Settings>, factory: Arc<dyn ServiceFactory>) -> Self {
        let gate = Arc::new(SlotGate::new(settings.max_concurrent_runs.max(1)));
        Self {
            db,
            settings,
            gate,
            segmenter: Arc::new(ParagraphSegmenter),
            prompts: Arc::new(DefaultPrompts),
            factory,
            progress: Arc::new(NoopProgress),
        }
    }

    pub fn with_gate(mut self, gate: Arc<dyn AdmissionGate>) -> Self {
        self.gate = gate;
        self
    }

    pub fn with_segmenter(mut self, segmenter: Arc<dyn Segmenter>) -> Self {
        self.segmenter = segmenter;
        self
    }

    pub fn with_prompts(mut self, prompts: Arc<dyn PromptProvider>) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// Persists a new run in `created` status and returns its id.
    pub fn submit(&self, new_run: NewRun) -> Result<String, RunError> {
        let now = db::now();
        let run = RunRow {
            id: Uuid::new_v4().to_string(),
            original_text: new_run.original_text,
            processing_mode: new_run.processing_mode,
            overrides: new_run.overrides,
            status: RunStatus::Created,
            current_stage: None,
            current_position: 0,
            total_segments: 0,
            progress: 0.0,
            failed_segment_index: None,
            error_message: None,
            created_at: now.clone(),
            updated_at: now,
            completed_at: None,
        };
        run_repo::insert(&self.db, &run)?;
        log::info!("Submitted run {}", run.id);
        Ok(run.id)
    }

    /// Drives a run to completion. Safe to call again after a failure: work
    /// resumes from the recorded checkpoint and finished segments are not
    /// sent to the generative service again.
    ///
    /// The processing mode is checked before the document is split, so a run
    /// with an unknown mode fails without creating any segments.
    ///
    /// Any error marks the run failed with its message before being returned.
    pub async fn start(&self, run_id: &str) -> Result<(), RunError> {
        let mut run = run_repo::find_by_id(&self.db, run_id)?
            .ok_or_else(|| RunError::RunNotFound(run_id.to_string()))?;

        let span = info_span!(
            "run",
            run_id = %run.id,
            mode = run.processing_mode.as_deref().unwrap_or("default"),
        );

        async {
            let result = self.drive(&mut run).await;
            if let Err(e) = &result {
                self.mark_failed(&mut run, e);
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn drive(&self, run: &mut RunRow) -> Result<(), RunError> {
        // A failed run keeps its checkpoint so this invocation resumes from it.
        if run.status != RunStatus::Failed {
            run.failed_segment_index = None;
        }
        run.error_message = None;
        run_repo::update(&self.db, run)?;

        let admitted = self.gate.acquire(&run.id).await;
        let _guard = AdmissionGuard::new(Arc::clone(&self.gate), &run.id);

        if !admitted {
            run.status = RunStatus::Queued;
            run_repo::update(&self.db, run)?;
            self.progress.report(RunProgressEvent::queued(&run.id));
            log::info!("Run {} queued", run.id);

            self.gate
                .wait_until_active(&run.id, self.settings.queue_poll_interval())
                .await;
        }

        run.status = RunStatus::Processing;
        run_repo::update(&self.db, run)?;
        self.progress
            .report(RunProgressEvent::processing(&run.id, run.progress));

        let mode = match run.processing_mode.as_deref() {
            None | Some("") => ProcessingMode::default(),
            Some(raw) => raw.parse().map_err(RunError::UnsupportedMode)?,
        };
        let stages = mode.stages();
        let services = RunServices::resolve(
            run,
            &self.settings,
            Arc::clone(&self.prompts),
            self.factory.as_ref(),
        )?;

        self.materialize_segments(run, mode)?;

        let processor = StageProcessor::new(
            self.db.clone(),
            Arc::clone(&self.settings),
            Arc::clone(&self.progress),
        );
        for &stage in stages {
            processor.process(run, stage, &services).await?;
            // The checkpoint belongs to the stage that recorded it.
            run.failed_segment_index = None;
            run_repo::update(&self.db, run)?;
        }

        run.status = RunStatus::Completed;
        run.progress = 100.0;
        run.failed_segment_index = None;
        run.completed_at = Some(db::now());
        run_repo::update(&self.db, run)?;
        self.progress
            .report(RunProgressEvent::completed(&run.id, run.total_segments));
        log::info!(
            "Run {} completed ({} segments, mode {})",
            run.id,
            run.total_segments,
            mode
        );
        Ok(())
    }

    /// Creates the run's segments on first execution. On resume the existing
    /// segments are kept and `total_segments` is resynced to their count.
    fn materialize_segments(&self, run: &mut RunRow, mode: ProcessingMode) -> Result<(), RunError> {
        let existing = segment_repo::count_for_run(&self.db, &run.id)?;
        if existing > 0 {
            run.total_segments = existing;
            run_repo::update(&self.db, run)?;
            log::debug!("Run {} resumes with {} segments", run.id, existing);
            return Ok(());
        }

        let pieces = self.segmenter.split(&run.original_text);
        run.total_segments = pieces.len();
        run_repo::update(&self.db, run)?;

        let first_stage = mode.stages()[0];
        segment_repo::insert_all(&self.db, &run.id, &pieces, first_stage)?;
        log::info!("Run {} split into {} segments", run.id, pieces.len());
        Ok(())
    }

    fn mark_failed(&self, run: &mut RunRow, err: &RunError) {
        log::error!("Run {} failed: {}", run.id, err);
        run.status = RunStatus::Failed;
        run.error_message = Some(err.to_string());
        if let Err(e) = run_repo::update(&self.db, run) {
            log::error!("Failed to record failure of run {}: {}", run.id, e);
        }
        self.progress
            .report(RunProgressEvent::failed(&run.id, run.progress, &err.to_string()));
    }
}
