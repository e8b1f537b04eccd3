//! SQLite checkpoint implementation

use crate::checkpoint::schema::initialize_schema;
use crate::checkpoint::traits::{CheckpointError, CheckpointResult, CheckpointStore};
use crate::checkpoint::{CheckpointEntry, RunRecord, RunStatus};
use crate::space::{FailureKind, WorkStatus};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;

/// SQLite-backed checkpoint store
///
/// The logical sequence counter lives in the process and is seeded from
/// `MAX(seq)` on open, so sequence numbers keep increasing across runs.
pub struct SqliteCheckpoint {
    conn: Connection,
    seq: i64,
}

impl SqliteCheckpoint {
    /// Opens (or creates) a checkpoint database at the given path
    pub fn new(path: &Path) -> CheckpointResult<Self> {
        let conn = Connection::open(path)?;

        // Configure SQLite for durability with reasonable performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;
        let seq = Self::load_max_seq(&conn)?;

        Ok(Self { conn, seq })
    }

    /// Creates an in-memory checkpoint store (for testing)
    pub fn open_in_memory() -> CheckpointResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        let seq = Self::load_max_seq(&conn)?;
        Ok(Self { conn, seq })
    }

    fn load_max_seq(conn: &Connection) -> Result<i64, rusqlite::Error> {
        conn.query_row("SELECT COALESCE(MAX(seq), 0) FROM work_units", [], |row| {
            row.get(0)
        })
    }

    fn row_to_run(row: &rusqlite::Row<'_>) -> Result<RunRecord, rusqlite::Error> {
        Ok(RunRecord {
            id: row.get(0)?,
            started_at: row.get(1)?,
            finished_at: row.get(2)?,
            config_hash: row.get(3)?,
            status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
                .unwrap_or(RunStatus::Running),
        })
    }

    fn finish_run(&mut self, run_id: i64, status: RunStatus) -> CheckpointResult<()> {
        let now = Utc::now().to_rfc3339();
        let changed = self.conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![status.to_db_string(), now, run_id],
        )?;
        if changed == 0 {
            return Err(CheckpointError::RunNotFound(run_id));
        }
        Ok(())
    }
}

impl CheckpointStore for SqliteCheckpoint {
    // ===== Run Management =====

    fn create_run(&mut self, config_hash: &str) -> CheckpointResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn latest_run(&self) -> CheckpointResult<Option<RunRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, started_at, finished_at, config_hash, status
             FROM runs ORDER BY id DESC LIMIT 1",
        )?;

        let run = stmt.query_row([], Self::row_to_run).optional()?;
        Ok(run)
    }

    fn complete_run(&mut self, run_id: i64) -> CheckpointResult<()> {
        self.finish_run(run_id, RunStatus::Completed)
    }

    fn interrupt_run(&mut self, run_id: i64) -> CheckpointResult<()> {
        self.finish_run(run_id, RunStatus::Interrupted)
    }

    // ===== Work Units =====

    fn append(
        &mut self,
        imo: u64,
        status: WorkStatus,
        attempts: u32,
        failure_kind: Option<FailureKind>,
        run_id: i64,
    ) -> CheckpointResult<()> {
        self.seq += 1;
        let now = Utc::now().to_rfc3339();

        self.conn.execute(
            "INSERT INTO work_units (imo, status, attempts, failure_kind, seq, updated_at, run_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(imo) DO UPDATE SET
                 status = excluded.status,
                 attempts = excluded.attempts,
                 failure_kind = excluded.failure_kind,
                 seq = excluded.seq,
                 updated_at = excluded.updated_at,
                 run_id = excluded.run_id
             WHERE excluded.seq > work_units.seq",
            params![
                imo as i64,
                status.to_db_string(),
                attempts,
                failure_kind.map(|k| k.to_db_string()),
                self.seq,
                now,
                run_id
            ],
        )?;
        Ok(())
    }

    fn load_all(&self) -> CheckpointResult<HashMap<u64, CheckpointEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT imo, status, attempts, failure_kind, seq, updated_at, run_id
             FROM work_units",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, u32>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, String>(5)?,
                row.get::<_, i64>(6)?,
            ))
        })?;

        let mut entries = HashMap::new();
        for row in rows {
            let (imo, status, attempts, failure_kind, seq, updated_at, run_id) = row?;
            let imo = imo as u64;

            let status = WorkStatus::from_db_string(&status).ok_or_else(|| {
                CheckpointError::Corrupt {
                    imo,
                    message: format!("unknown status {:?}", status),
                }
            })?;
            let failure_kind = match failure_kind {
                Some(s) => Some(FailureKind::from_db_string(&s).ok_or_else(|| {
                    CheckpointError::Corrupt {
                        imo,
                        message: format!("unknown failure kind {:?}", s),
                    }
                })?),
                None => None,
            };

            entries.insert(
                imo,
                CheckpointEntry {
                    imo,
                    status,
                    attempts,
                    failure_kind,
                    seq,
                    updated_at,
                    run_id,
                },
            );
        }

        Ok(entries)
    }

    fn flush(&mut self) -> CheckpointResult<()> {
        // In WAL mode this moves committed frames into the main database
        // file; a no-op for other journal modes.
        self.conn
            .execute_batch("PRAGMA wal_checkpoint(PASSIVE);")?;
        Ok(())
    }

    fn clear_work_units(&mut self) -> CheckpointResult<()> {
        self.conn.execute("DELETE FROM work_units", [])?;
        self.seq = 0;
        Ok(())
    }

    // ===== Statistics =====

    fn count_total_units(&self) -> CheckpointResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM work_units", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn count_units_by_status(&self, status: WorkStatus) -> CheckpointResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM work_units WHERE status = ?1",
            [status.to_db_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    fn failure_summary(&self) -> CheckpointResult<HashMap<FailureKind, u64>> {
        let mut stmt = self.conn.prepare(
            "SELECT failure_kind, COUNT(*) FROM work_units
             WHERE failure_kind IS NOT NULL GROUP BY failure_kind",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;

        let mut summary = HashMap::new();
        for row in rows {
            let (kind, count) = row?;
            if let Some(kind) = FailureKind::from_db_string(&kind) {
                summary.insert(kind, count as u64);
            }
        }
        Ok(summary)
    }

    fn max_attempts_seen(&self) -> CheckpointResult<u32> {
        let max: i64 = self.conn.query_row(
            "SELECT COALESCE(MAX(attempts), 0) FROM work_units",
            [],
            |row| row.get(0),
        )?;
        Ok(max as u32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> SqliteCheckpoint {
        SqliteCheckpoint::open_in_memory().unwrap()
    }

    #[test]
    fn test_create_and_finish_run() {
        let mut store = store();

        let run_id = store.create_run("abc123").unwrap();
        let latest = store.latest_run().unwrap().unwrap();
        assert_eq!(latest.id, run_id);
        assert_eq!(latest.config_hash, "abc123");
        assert_eq!(latest.status, RunStatus::Running);
        assert!(latest.finished_at.is_none());

        store.complete_run(run_id).unwrap();
        let latest = store.latest_run().unwrap().unwrap();
        assert_eq!(latest.status, RunStatus::Completed);
        assert!(latest.finished_at.is_some());
    }

    #[test]
    fn test_interrupt_run() {
        let mut store = store();
        let run_id = store.create_run("abc").unwrap();

        store.interrupt_run(run_id).unwrap();
        let latest = store.latest_run().unwrap().unwrap();
        assert_eq!(latest.status, RunStatus::Interrupted);
    }

    #[test]
    fn test_finish_unknown_run_is_an_error() {
        let mut store = store();
        assert!(matches!(
            store.complete_run(42),
            Err(CheckpointError::RunNotFound(42))
        ));
    }

    #[test]
    fn test_latest_run_empty_db() {
        let store = store();
        assert!(store.latest_run().unwrap().is_none());
    }

    #[test]
    fn test_append_and_load() {
        let mut store = store();
        let run_id = store.create_run("abc").unwrap();

        store
            .append(9074729, WorkStatus::InFlight, 0, None, run_id)
            .unwrap();
        store
            .append(9176187, WorkStatus::Done, 1, None, run_id)
            .unwrap();

        let entries = store.load_all().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[&9074729].status, WorkStatus::InFlight);
        assert_eq!(entries[&9176187].status, WorkStatus::Done);
        assert_eq!(entries[&9176187].attempts, 1);
        assert_eq!(entries[&9176187].run_id, run_id);
    }

    #[test]
    fn test_later_append_supersedes() {
        let mut store = store();
        let run_id = store.create_run("abc").unwrap();

        store
            .append(9074729, WorkStatus::InFlight, 0, None, run_id)
            .unwrap();
        store
            .append(
                9074729,
                WorkStatus::Retrying,
                1,
                Some(FailureKind::Timeout),
                run_id,
            )
            .unwrap();
        store
            .append(9074729, WorkStatus::Done, 2, None, run_id)
            .unwrap();

        let entries = store.load_all().unwrap();
        assert_eq!(entries.len(), 1);
        let entry = &entries[&9074729];
        assert_eq!(entry.status, WorkStatus::Done);
        assert_eq!(entry.attempts, 2);
        assert!(entry.failure_kind.is_none());
    }

    #[test]
    fn test_seq_increases_per_append() {
        let mut store = store();
        let run_id = store.create_run("abc").unwrap();

        store
            .append(1_000_001, WorkStatus::Done, 1, None, run_id)
            .unwrap();
        store
            .append(1_000_002, WorkStatus::Done, 1, None, run_id)
            .unwrap();

        let entries = store.load_all().unwrap();
        assert!(entries[&1_000_002].seq > entries[&1_000_001].seq);
    }

    #[test]
    fn test_seq_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("harvest.db");

        {
            let mut store = SqliteCheckpoint::new(&path).unwrap();
            let run_id = store.create_run("abc").unwrap();
            store
                .append(1_000_001, WorkStatus::Done, 1, None, run_id)
                .unwrap();
            store.flush().unwrap();
        }

        let mut store = SqliteCheckpoint::new(&path).unwrap();
        let run_id = store.create_run("abc").unwrap();
        store
            .append(1_000_002, WorkStatus::Done, 1, None, run_id)
            .unwrap();

        let entries = store.load_all().unwrap();
        assert!(entries[&1_000_002].seq > entries[&1_000_001].seq);
    }

    #[test]
    fn test_failure_kind_roundtrip() {
        let mut store = store();
        let run_id = store.create_run("abc").unwrap();

        store
            .append(
                9074729,
                WorkStatus::Failed,
                3,
                Some(FailureKind::NotFound),
                run_id,
            )
            .unwrap();

        let entries = store.load_all().unwrap();
        assert_eq!(entries[&9074729].failure_kind, Some(FailureKind::NotFound));
    }

    #[test]
    fn test_clear_work_units() {
        let mut store = store();
        let run_id = store.create_run("abc").unwrap();
        store
            .append(9074729, WorkStatus::Done, 1, None, run_id)
            .unwrap();

        store.clear_work_units().unwrap();
        assert!(store.load_all().unwrap().is_empty());
        assert_eq!(store.count_total_units().unwrap(), 0);
    }

    #[test]
    fn test_statistics_queries() {
        let mut store = store();
        let run_id = store.create_run("abc").unwrap();

        store
            .append(1_000_001, WorkStatus::Done, 1, None, run_id)
            .unwrap();
        store
            .append(1_000_002, WorkStatus::Done, 2, None, run_id)
            .unwrap();
        store
            .append(
                1_000_003,
                WorkStatus::Failed,
                3,
                Some(FailureKind::Transient),
                run_id,
            )
            .unwrap();
        store
            .append(
                1_000_004,
                WorkStatus::Failed,
                1,
                Some(FailureKind::NotFound),
                run_id,
            )
            .unwrap();

        assert_eq!(store.count_total_units().unwrap(), 4);
        assert_eq!(store.count_units_by_status(WorkStatus::Done).unwrap(), 2);
        assert_eq!(store.count_units_by_status(WorkStatus::Failed).unwrap(), 2);
        assert_eq!(store.max_attempts_seen().unwrap(), 3);

        let summary = store.failure_summary().unwrap();
        assert_eq!(summary.get(&FailureKind::Transient), Some(&1));
        assert_eq!(summary.get(&FailureKind::NotFound), Some(&1));
    }
}
