//! Change log repository: before/after audit rows per (run, segment, stage).
//!
//! The table has no uniqueness constraint; callers keep one row per key by
//! updating the latest row in place (see `pipeline::ChangeRecorder`).

use rusqlite::{params, Row};

use super::{Database, DatabaseError};
use crate::model::Stage;

/// A change log row from the database.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeLogRow {
    pub id: i64,
    pub run_id: String,
    pub segment_index: usize,
    pub stage: Stage,
    pub before_text: String,
    pub after_text: String,
    pub before_length: usize,
    pub after_length: usize,
    pub changed: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl ChangeLogRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            run_id: row.get("run_id")?,
            segment_index: row.get("segment_index")?,
            stage: row.get("stage")?,
            before_text: row.get("before_text")?,
            after_text: row.get("after_text")?,
            before_length: row.get("before_length")?,
            after_length: row.get("after_length")?,
            changed: row.get("changed")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }
}

/// The audited content of one change, independent of its row identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeDetail {
    pub before_text: String,
    pub after_text: String,
    pub before_length: usize,
    pub after_length: usize,
    pub changed: bool,
}

/// Returns the most recent row for (run, segment_index, stage).
pub fn find_latest(
    db: &Database,
    run_id: &str,
    segment_index: usize,
    stage: Stage,
) -> Result<Option<ChangeLogRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM change_logs WHERE run_id = ?1 AND segment_index = ?2 AND stage = ?3
             ORDER BY created_at DESC, id DESC LIMIT 1",
        )?;
        let mut rows = stmt.query_map(params![run_id, segment_index, stage], ChangeLogRow::from_row)?;
        match rows.next() {
            Some(Ok(row)) => Ok(Some(row)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Inserts a new row.
pub fn insert(
    db: &Database,
    run_id: &str,
    segment_index: usize,
    stage: Stage,
    detail: &ChangeDetail,
) -> Result<(), DatabaseError> {
    let now = super::now();
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO change_logs (run_id, segment_index, stage, before_text, after_text,
             before_length, after_length, changed, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
            params![
                run_id,
                segment_index,
                stage,
                detail.before_text,
                detail.after_text,
                detail.before_length,
                detail.after_length,
                detail.changed,
                now,
            ],
        )?;
        Ok(())
    })
}

/// Overwrites the content of an existing row, keeping its identity and `created_at`.
pub fn update_in_place(db: &Database, id: i64, detail: &ChangeDetail) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE change_logs SET before_text=?2, after_text=?3, before_length=?4,
             after_length=?5, changed=?6, updated_at=?7
             WHERE id=?1",
            params![
                id,
                detail.before_text,
                detail.after_text,
                detail.before_length,
                detail.after_length,
                detail.changed,
                super::now(),
            ],
        )?;
        Ok(())
    })
}

/// Lists every row for a run, ordered by segment then stage insertion.
pub fn list_for_run(db: &Database, run_id: &str) -> Result<Vec<ChangeLogRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt =
            conn.prepare("SELECT * FROM change_logs WHERE run_id = ?1 ORDER BY segment_index, id")?;
        let rows = stmt
            .query_map(params![run_id], ChangeLogRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}
