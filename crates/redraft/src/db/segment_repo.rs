//! Segment repository: the `segments` table, one row per document slice.

use rusqlite::{params, Row};

use super::{Database, DatabaseError};
use crate::model::{SegmentStatus, Stage};

/// A segment row from the database.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentRow {
    pub id: i64,
    pub run_id: String,
    pub segment_index: usize,
    pub is_title: bool,
    pub original_text: String,
    pub polished_text: Option<String>,
    pub enhanced_text: Option<String>,
    pub status: SegmentStatus,
    /// Last stage that touched this segment.
    pub stage: Stage,
    pub completed_at: Option<String>,
}

impl SegmentRow {
    fn from_row(row: &Row<'_>) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get("id")?,
            run_id: row.get("run_id")?,
            segment_index: row.get("segment_index")?,
            is_title: row.get("is_title")?,
            original_text: row.get("original_text")?,
            polished_text: row.get("polished_text")?,
            enhanced_text: row.get("enhanced_text")?,
            status: row.get("status")?,
            stage: row.get("stage")?,
            completed_at: row.get("completed_at")?,
        })
    }
}

/// Counts the segments materialized for a run.
pub fn count_for_run(db: &Database, run_id: &str) -> Result<usize, DatabaseError> {
    db.with_conn(|conn| {
        let count: usize = conn.query_row(
            "SELECT COUNT(*) FROM segments WHERE run_id = ?1",
            params![run_id],
            |r| r.get(0),
        )?;
        Ok(count)
    })
}

/// Creates one pending segment per text, in order, inside a single transaction.
pub fn insert_all(
    db: &Database,
    run_id: &str,
    texts: &[String],
    stage: Stage,
) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        let tx = conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO segments (run_id, segment_index, is_title, original_text, status, stage)
                 VALUES (?1, ?2, 0, ?3, ?4, ?5)",
            )?;
            for (index, text) in texts.iter().enumerate() {
                stmt.execute(params![run_id, index, text, SegmentStatus::Pending, stage])?;
            }
        }
        tx.commit()?;
        Ok(())
    })
}

/// Lists a run's segments in document order.
pub fn list_for_run(db: &Database, run_id: &str) -> Result<Vec<SegmentRow>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt =
            conn.prepare("SELECT * FROM segments WHERE run_id = ?1 ORDER BY segment_index")?;
        let rows = stmt
            .query_map(params![run_id], SegmentRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    })
}

/// Overwrites the mutable fields of a segment.
pub fn update(db: &Database, segment: &SegmentRow) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE segments SET is_title=?2, polished_text=?3, enhanced_text=?4, status=?5,
             stage=?6, completed_at=?7
             WHERE id=?1",
            params![
                segment.id,
                segment.is_title,
                segment.polished_text,
                segment.enhanced_text,
                segment.status,
                segment.stage,
                segment.completed_at,
            ],
        )?;
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::run_repo;

    fn test_db() -> Database {
        let db = Database::open_in_memory().expect("Failed to create test database");
        run_repo::insert(&db, &run_repo::tests::sample_run("run-1")).unwrap();
        db
    }

    fn texts(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_insert_all_preserves_order() {
        let db = test_db();
        insert_all(&db, "run-1", &texts(&["alpha", "beta", "gamma"]), Stage::Polish).unwrap();

        let rows = list_for_run(&db, "run-1").unwrap();
        assert_eq!(rows.len(), 3);
        for (i, row) in rows.iter().enumerate() {
            assert_eq!(row.segment_index, i);
            assert_eq!(row.status, SegmentStatus::Pending);
            assert_eq!(row.stage, Stage::Polish);
            assert!(!row.is_title);
            assert!(row.polished_text.is_none());
        }
        assert_eq!(rows[1].original_text, "beta");
        assert_eq!(count_for_run(&db, "run-1").unwrap(), 3);
    }

    #[test]
    fn test_count_for_unknown_run_is_zero() {
        let db = test_db();
        assert_eq!(count_for_run(&db, "other").unwrap(), 0);
        assert!(list_for_run(&db, "other").unwrap().is_empty());
    }

    #[test]
    fn test_update_segment() {
        let db = test_db();
        insert_all(&db, "run-1", &texts(&["alpha"]), Stage::Polish).unwrap();
        let mut seg = list_for_run(&db, "run-1").unwrap().remove(0);

        seg.polished_text = Some("Alpha.".to_string());
        seg.status = SegmentStatus::Completed;
        seg.completed_at = Some("2026-01-01T00:00:00Z".to_string());
        update(&db, &seg).unwrap();

        let found = list_for_run(&db, "run-1").unwrap().remove(0);
        assert_eq!(found, seg);
    }

    #[test]
    fn test_insert_all_is_atomic_on_conflict() {
        let db = test_db();
        insert_all(&db, "run-1", &texts(&["alpha"]), Stage::Polish).unwrap();
        // Index 0 already exists, so the whole batch must roll back.
        assert!(insert_all(&db, "run-1", &texts(&["x", "y"]), Stage::Polish).is_err());
        assert_eq!(count_for_run(&db, "run-1").unwrap(), 1);
    }
}
