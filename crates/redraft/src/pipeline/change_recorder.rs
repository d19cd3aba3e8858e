//! Before/after audit of every generated segment output.

use crate::db::change_log_repo::{self, ChangeDetail};
use crate::db::{Database, DatabaseError};
use crate::model::Stage;

/// Keeps exactly one change log row per (run, segment, stage), however often
/// the segment is reprocessed.
pub struct ChangeRecorder {
    db: Database,
}

impl ChangeRecorder {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn record(
        &self,
        run_id: &str,
        segment_index: usize,
        before: &str,
        after: &str,
        stage: Stage,
    ) -> Result<(), DatabaseError> {
        let detail = ChangeDetail {
            before_text: before.to_string(),
            after_text: after.to_string(),
            before_length: before.chars().count(),
            after_length: after.chars().count(),
            changed: before != after,
        };

        match change_log_repo::find_latest(&self.db, run_id, segment_index, stage)? {
            Some(existing) => change_log_repo::update_in_place(&self.db, existing.id, &detail),
            None => change_log_repo::insert(&self.db, run_id, segment_index, stage, &detail),
        }
    }
}
