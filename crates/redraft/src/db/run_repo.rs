//! Run repository: CRUD operations for the `runs` table.

use rusqlite::{params, Row};

use super::{Database, DatabaseError};
use crate::model::{RunStatus, Stage};

/// Per-stage generative service overrides supplied at submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceOverride {
    pub model: Option<String>,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOverrides {
    pub polish: ServiceOverride,
    pub emotion: ServiceOverride,
    pub enhance: ServiceOverride,
}

/// A run row from the database.
#[derive(Debug, Clone)]
pub struct RunRow {
    pub id: String,
    pub original_text: String,
    /// Raw mode string; parsed when the run starts.
    pub processing_mode: Option<String>,
    pub overrides: RunOverrides,
    pub status: RunStatus,
    pub current_stage: Option<Stage>,
    pub current_position: usize,
    pub total_segments: usize,
    pub progress: f64,
    /// Resume checkpoint (0-based) left behind by a failed segment.
    pub failed_segment_index: Option<usize>,
    pub error_message: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub completed_at: Option<String>,
}

impl RunRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            original_text: row.get("original_text")?,
            processing_mode: row.get("processing_mode")?,
            overrides: RunOverrides {
                polish: ServiceOverride {
                    model: row.get("polish_model")?,
                    api_key: row.get("polish_api_key")?,
                    base_url: row.get("polish_base_url")?,
                },
                emotion: ServiceOverride {
                    model: row.get("emotion_model")?,
                    api_key: row.get("emotion_api_key")?,
                    base_url: row.get("emotion_base_url")?,
                },
                enhance: ServiceOverride {
                    model: row.get("enhance_model")?,
                    api_key: row.get("enhance_api_key")?,
                    base_url: row.get("enhance_base_url")?,
                },
            },
            status: row.get("status")?,
            current_stage: row.get("current_stage")?,
            current_position: row.get("current_position")?,
            total_segments: row.get("total_segments")?,
            progress: row.get("progress")?,
            failed_segment_index: row.get("failed_segment_index")?,
            error_message: row.get("error_message")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
            completed_at: row.get("completed_at")?,
        })
    }
}

/// Inserts a new run row.
pub fn insert(db: &Database, run: &RunRow) -> Result<(), DatabaseError> {
    let o = &run.overrides;
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO runs (id, original_text, processing_mode,
             polish_model, polish_api_key, polish_base_url,
             emotion_model, emotion_api_key, emotion_base_url,
             enhance_model, enhance_api_key, enhance_base_url,
             status, current_stage, current_position, total_segments, progress,
             failed_segment_index, error_message, created_at, updated_at, completed_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
                     ?16, ?17, ?18, ?19, ?20, ?21, ?22)",
            params![
                run.id,
                run.original_text,
                run.processing_mode,
                o.polish.model,
                o.polish.api_key,
                o.polish.base_url,
                o.emotion.model,
                o.emotion.api_key,
                o.emotion.base_url,
                o.enhance.model,
                o.enhance.api_key,
                o.enhance.base_url,
                run.status,
                run.current_stage,
                run.current_position,
                run.total_segments,
                run.progress,
                run.failed_segment_index,
                run.error_message,
                run.created_at,
                run.updated_at,
                run.completed_at,
            ],
        )?;
        Ok(())
    })
}

/// Overwrites the mutable lifecycle fields of a run and bumps `updated_at`.
///
/// The document, mode and overrides are fixed at submission and never rewritten.
pub fn update(db: &Database, run: &mut RunRow) -> Result<(), DatabaseError> {
    run.updated_at = super::now();
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE runs SET status=?2, current_stage=?3, current_position=?4,
             total_segments=?5, progress=?6, failed_segment_index=?7, error_message=?8,
             updated_at=?9, completed_at=?10
             WHERE id=?1",
            params![
                run.id,
                run.status,
                run.current_stage,
                run.current_position,
                run.total_segments,
                run.progress,
                run.failed_segment_index,
                run.error_message,
                run.updated_at,
                run.completed_at,
            ],
        )?;
        Ok(())
    })
}

/// Updates only the position and progress of a run. Hot path, once per segment.
pub fn update_progress(
    db: &Database,
    id: &str,
    position: usize,
    progress: f64,
) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE runs SET current_position = ?2, progress = ?3, updated_at = ?4 WHERE id = ?1",
            params![id, position, progress, super::now()],
        )?;
        Ok(())
    })
}

/// Finds a run by its ID.
pub fn find_by_id(db: &Database, id: &str) -> Result<Option<RunRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM runs WHERE id = ?1")?;
        let mut rows = stmt.query_map(params![id], RunRow::from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Like [`find_by_id`], but a missing run is an error.
pub fn get(db: &Database, id: &str) -> Result<RunRow, DatabaseError> {
    find_by_id(db, id)?.ok_or_else(|| DatabaseError::NotFound {
        entity: "run",
        id: id.to_string(),
    })
}

/// Counts runs with the given status.
pub fn count_by_status(db: &Database, status: RunStatus) -> Result<u64, DatabaseError> {
    db.with_conn(|conn| {
        let count: u64 = conn.query_row(
            "SELECT COUNT(*) FROM runs WHERE status = ?1",
            params![status],
            |r| r.get(0),
        )?;
        Ok(count)
    })
}
