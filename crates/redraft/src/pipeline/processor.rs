//! Executes one stage across every segment of a run.

use std::sync::Arc;

use tracing::{debug, info_span, Instrument};

use crate::broadcast::RunProgressEvent;
use crate::config::Settings;
use crate::db::run_repo::{self, RunRow};
use crate::db::segment_repo::{self, SegmentRow};
use crate::db::{self, history_repo, Database};
use crate::model::{SegmentStatus, Stage, Turn};
use crate::text::{count_length, count_weighted};

use super::change_recorder::ChangeRecorder;
use super::error::RunError;
use super::history::{self, HistoryManager};
use super::progress::ProgressReporter;
use super::services::RunServices;
use super::stage as fields;

pub struct StageProcessor {
    db: Database,
    settings: Arc<Settings>,
    progress: Arc<dyn ProgressReporter>,
}

impl StageProcessor {
    pub fn new(db: Database, settings: Arc<Settings>, progress: Arc<dyn ProgressReporter>) -> Self {
        Self {
            db,
            settings,
            progress,
        }
    }

    /// Progress percentage while working on segment `index` of `total`.
    pub fn progress_at(&self, stage: Stage, index: usize, total: usize) -> f64 {
        if total == 0 {
            return 0.0;
        }
        let offset = match stage {
            Stage::Enhance => self.settings.enhance_progress_offset,
            Stage::Polish | Stage::EmotionPolish => 0.0,
        };
        (index as f64 + offset) / total as f64 * 100.0
    }

    /// Runs `stage` from the run's checkpoint (or the first segment) to the
    /// end. Segments that already carry this stage's output are skipped, so
    /// calling this again after a failure only redoes unfinished work.
    ///
    /// A failed generative call marks the segment failed, records the
    /// checkpoint and error message on the run, and aborts the stage.
    pub async fn process(
        &self,
        run: &mut RunRow,
        stage: Stage,
        services: &RunServices,
    ) -> Result<(), RunError> {
        let span = info_span!("stage", run_id = %run.id, stage = %stage);
        self.process_inner(run, stage, services).instrument(span).await
    }

    async fn process_inner(
        &self,
        run: &mut RunRow,
        stage: Stage,
        services: &RunServices,
    ) -> Result<(), RunError> {
        run.current_stage = Some(stage);
        run_repo::update(&self.db, run)?;

        let binding = services.stage(stage);
        let history_manager = HistoryManager::new(
            self.db.clone(),
            Arc::clone(&services.compression),
            Arc::clone(&services.prompts),
        );
        let recorder = ChangeRecorder::new(self.db.clone());

        let mut segments = segment_repo::list_for_run(&self.db, &run.id)?;
        let mut history = history::initial(&segments, stage);
        let mut weight = history::weight(&history);
        let threshold = self.settings.history_compression_threshold;
        if weight > threshold {
            // Rebuilt context outgrew the limit; the latest snapshot is the
            // bounded form of the same outputs.
            if let Some(snapshot) = history_repo::latest(&self.db, &run.id, stage)? {
                let snapshot_weight = history::weight(&snapshot.turns);
                if snapshot_weight <= threshold {
                    history = snapshot.turns;
                    weight = snapshot_weight;
                }
            }
        }
        let start = run.failed_segment_index.unwrap_or(0);
        let total = run.total_segments;

        log::info!(
            "Run {}: starting {} at segment {} of {} ({} context turns)",
            run.id,
            stage,
            start,
            total,
            history.len()
        );
        self.progress.report(RunProgressEvent::stage_started(
            &run.id,
            stage,
            total,
            self.progress_at(stage, start, total),
        ));

        for segment in segments.iter_mut().skip(start) {
            let index = segment.segment_index;
            let progress = self.progress_at(stage, index, total);
            run.current_position = index;
            run.progress = progress;
            run_repo::update_progress(&self.db, &run.id, index, progress)?;
            self.progress.report(RunProgressEvent::segment(
                &run.id, stage, index, total, progress,
            ));

            if stage == Stage::Enhance && segment.is_title {
                if segment.enhanced_text.is_none() {
                    let text = fields::input(segment, stage).to_string();
                    fields::set_output(segment, stage, text);
                    mark_completed(segment, stage);
                    segment_repo::update(&self.db, segment)?;
                }
                continue;
            }

            if fields::output(segment, stage).is_some() {
                debug!(segment = index, "output already present, skipping");
                continue;
            }

            if count_length(&segment.original_text) < self.settings.segment_skip_threshold {
                debug!(segment = index, "below skip threshold, treating as title");
                let original = segment.original_text.clone();
                segment.is_title = true;
                segment.polished_text.get_or_insert_with(|| original.clone());
                segment.enhanced_text.get_or_insert(original);
                mark_completed(segment, stage);
                segment_repo::update(&self.db, segment)?;
                continue;
            }

            if weight > threshold && !history::is_compressed(&history) {
                self.compress(&history_manager, &mut history, &mut weight, run, index, stage)
                    .await?;
            }

            segment.status = SegmentStatus::Processing;
            segment.stage = stage;
            segment_repo::update(&self.db, segment)?;

            let input = fields::input(segment, stage).to_string();
            let output = match binding
                .service
                .rewrite(stage, &input, &binding.prompt, &history)
                .await
            {
                Ok(output) => output,
                Err(source) => {
                    segment.status = SegmentStatus::Failed;
                    segment_repo::update(&self.db, segment)?;
                    return Err(self.checkpoint(
                        run,
                        index,
                        RunError::SegmentStage {
                            segment: index + 1,
                            stage,
                            source,
                        },
                    )?);
                }
            };

            weight += count_weighted(&output);
            history.push(Turn::assistant(output.clone()));
            fields::set_output(segment, stage, output.clone());
            mark_completed(segment, stage);
            segment_repo::update(&self.db, segment)?;
            recorder.record(&run.id, index, &input, &output, stage)?;

            if weight > threshold {
                self.compress(&history_manager, &mut history, &mut weight, run, index, stage)
                    .await?;
            }

            history_manager.save(&run.id, stage, &history, weight)?;
        }

        log::info!("Run {}: {} stage finished", run.id, stage);
        Ok(())
    }

    /// Replaces `history` with its compressed form and recomputes `weight`
    /// from it. A summarizer failure checkpoints the run at `index`.
    async fn compress(
        &self,
        manager: &HistoryManager,
        history: &mut Vec<Turn>,
        weight: &mut usize,
        run: &mut RunRow,
        index: usize,
        stage: Stage,
    ) -> Result<(), RunError> {
        match manager.compress(history, stage).await {
            Ok(compressed) => {
                *history = compressed;
                *weight = history::weight(history);
                Ok(())
            }
            Err(source) => Err(self.checkpoint(
                run,
                index,
                RunError::Compression {
                    segment: index + 1,
                    stage,
                    source,
                },
            )?),
        }
    }

    /// Records `index` as the resume point and `err` as the run's error.
    /// Returns `err` for the caller to raise.
    fn checkpoint(&self, run: &mut RunRow, index: usize, err: RunError) -> Result<RunError, RunError> {
        log::warn!("Run {}: {}", run.id, err);
        run.failed_segment_index = Some(index);
        run.error_message = Some(err.to_string());
        run_repo::update(&self.db, run)?;
        Ok(err)
    }
}

fn mark_completed(segment: &mut SegmentRow, stage: Stage) {
    segment.status = SegmentStatus::Completed;
    segment.stage = stage;
    segment.completed_at = Some(db::now());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::progress::NoopProgress;

    fn processor(offset: f64) -> StageProcessor {
        let settings = Settings {
            enhance_progress_offset: offset,
            ..Settings::default()
        };
        StageProcessor::new(
            Database::open_in_memory().unwrap(),
            Arc::new(settings),
            Arc::new(NoopProgress),
        )
    }

    #[test]
    fn test_progress_formula() {
        let p = processor(0.5);
        assert_eq!(p.progress_at(Stage::Polish, 0, 4), 0.0);
        assert_eq!(p.progress_at(Stage::Polish, 2, 4), 50.0);
        assert_eq!(p.progress_at(Stage::Enhance, 0, 4), 12.5);
        assert_eq!(p.progress_at(Stage::Enhance, 3, 4), 87.5);
        assert_eq!(p.progress_at(Stage::EmotionPolish, 1, 4), 25.0);
    }

    #[test]
    fn test_progress_never_reaches_100_mid_stage() {
        let p = processor(0.5);
        for stage in [Stage::Polish, Stage::Enhance] {
            for i in 0..10 {
                assert!(p.progress_at(stage, i, 10) < 100.0);
            }
        }
    }

    #[test]
    fn test_zero_offset_and_empty_run() {
        let p = processor(0.0);
        assert_eq!(p.progress_at(Stage::Enhance, 1, 4), 25.0);
        assert_eq!(p.progress_at(Stage::Polish, 0, 0), 0.0);
    }
}
