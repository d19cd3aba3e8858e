//! Rolling context handed to the generative service, and its compression.

use std::sync::Arc;

use crate::ai::{AiError, GenerativeService, PromptProvider};
use crate::db::segment_repo::SegmentRow;
use crate::db::{history_repo, Database, DatabaseError};
use crate::model::{Role, Stage, Turn};
use crate::text::count_weighted;

use super::stage as fields;

/// Prepended to every compressed summary.
pub const SUMMARY_PREFIX: &str = "Summary of previously processed content:\n";

/// Number of trailing turns sent to the summarizer.
const SAMPLE_TURNS: usize = 3;

/// True when `history` is the single system turn a compression produces.
pub fn is_compressed(history: &[Turn]) -> bool {
    matches!(history, [turn] if turn.role == Role::System)
}

/// Script-aware weight of the whole history.
pub fn weight(history: &[Turn]) -> usize {
    history.iter().map(|t| count_weighted(&t.content)).sum()
}

/// Rebuilds context from the outputs this stage already produced, in
/// document order, leaving out titles.
pub fn initial(segments: &[SegmentRow], stage: Stage) -> Vec<Turn> {
    segments
        .iter()
        .filter(|s| !s.is_title)
        .filter_map(|s| fields::output(s, stage))
        .map(Turn::assistant)
        .collect()
}

pub struct HistoryManager {
    db: Database,
    service: Arc<dyn GenerativeService>,
    prompts: Arc<dyn PromptProvider>,
}

impl HistoryManager {
    pub fn new(
        db: Database,
        service: Arc<dyn GenerativeService>,
        prompts: Arc<dyn PromptProvider>,
    ) -> Self {
        Self {
            db,
            service,
            prompts,
        }
    }

    /// Condenses `history` into one system turn. Already-compressed history
    /// comes back unchanged without calling the summarizer.
    pub async fn compress(&self, history: &[Turn], stage: Stage) -> Result<Vec<Turn>, AiError> {
        if is_compressed(history) {
            return Ok(history.to_vec());
        }

        let sample = &history[history.len().saturating_sub(SAMPLE_TURNS)..];
        let instruction = self.prompts.compression_instruction(stage);
        let summary = self.service.compress(sample, &instruction).await?;

        log::info!(
            "Compressed {} history turns for {} into {} weighted units",
            history.len(),
            stage,
            count_weighted(&summary)
        );

        Ok(vec![Turn::system(format!("{}{}", SUMMARY_PREFIX, summary))])
    }

    /// Appends a snapshot of `history` for (run, stage).
    pub fn save(
        &self,
        run_id: &str,
        stage: Stage,
        history: &[Turn],
        weight: usize,
    ) -> Result<(), DatabaseError> {
        history_repo::insert(
            &self.db,
            run_id,
            stage,
            history,
            is_compressed(history),
            weight,
        )
    }
}
