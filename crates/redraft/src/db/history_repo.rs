//! History snapshot repository: append-only rolling context per (run, stage).

use rusqlite::{params, Row};

use super::{Database, DatabaseError};
use crate::model::{Stage, Turn};

/// A stored history snapshot.
#[derive(Debug, Clone)]
pub struct HistorySnapshotRow {
    pub id: i64,
    pub run_id: String,
    pub stage: Stage,
    pub turns: Vec<Turn>,
    pub is_compressed: bool,
    pub char_weight: usize,
    pub created_at: String,
}

impl HistorySnapshotRow {
    fn from_row(row: &Row<'_>) -> Result<Self, DatabaseError> {
        let data: String = row.get("history_data")?;
        Ok(Self {
            id: row.get("id")?,
            run_id: row.get("run_id")?,
            stage: row.get("stage")?,
            turns: serde_json::from_str(&data)?,
            is_compressed: row.get("is_compressed")?,
            char_weight: row.get("char_weight")?,
            created_at: row.get("created_at")?,
        })
    }
}

/// Appends a new snapshot.
pub fn insert(
    db: &Database,
    run_id: &str,
    stage: Stage,
    turns: &[Turn],
    is_compressed: bool,
    char_weight: usize,
) -> Result<(), DatabaseError> {
    let data = serde_json::to_string(turns)?;
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO history_snapshots (run_id, stage, history_data, is_compressed, char_weight, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![run_id, stage, data, is_compressed, char_weight, super::now()],
        )?;
        Ok(())
    })
}

/// Returns the most recent snapshot for (run, stage), if any.
pub fn latest(
    db: &Database,
    run_id: &str,
    stage: Stage,
) -> Result<Option<HistorySnapshotRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM history_snapshots WHERE run_id = ?1 AND stage = ?2
             ORDER BY id DESC LIMIT 1",
        )?;
        let mut rows = stmt.query(params![run_id, stage])?;
        match rows.next()? {
            Some(row) => Ok(Some(HistorySnapshotRow::from_row(row)?)),
            None => Ok(None),
        }
    })
}

/// Lists every snapshot for (run, stage), oldest first.
pub fn list_for_stage(
    db: &Database,
    run_id: &str,
    stage: Stage,
) -> Result<Vec<HistorySnapshotRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM history_snapshots WHERE run_id = ?1 AND stage = ?2 ORDER BY id",
        )?;
        let mut rows = stmt.query(params![run_id, stage])?;
        let mut snapshots = Vec::new();
        while let Some(row) = rows.next()? {
            snapshots.push(HistorySnapshotRow::from_row(row)?);
        }
        Ok(snapshots)
    })
}
