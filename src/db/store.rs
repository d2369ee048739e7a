//! SQLite-backed state store.
//!
//! Raw SQL with rusqlite, no ORM. A connection is opened per logical
//! operation (no transaction spans multiple meetings), and every write
//! converts storage failures into a boolean result: a storage error
//! never unwinds into the orchestrator's control flow.

use anyhow::{Context, Result};
use chrono::{Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use super::records::{ProcessedMeeting, SessionStats, SyncErrorRecord, TotalCounts};

/// Partial update for a processed-meeting record. `None` fields are left
/// untouched.
#[derive(Debug, Default)]
pub struct StatusUpdate {
    pub destination_ref: Option<String>,
    pub action_count: Option<i64>,
    pub status: Option<String>,
}

pub struct StateStore {
    db_path: PathBuf,
}

impl StateStore {
    /// Open (creating if necessary) the store at `db_path` and run
    /// migrations. This is the only call that propagates a storage error:
    /// if the store cannot even be opened, nothing else can run.
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create database directory")?;
        }

        let conn = Connection::open(&db_path).context("Failed to open database connection")?;
        migrate(&conn)?;
        info!("State store ready at {:?}", db_path);

        Ok(Self { db_path })
    }

    fn connect(&self) -> Result<Connection> {
        Connection::open(&self.db_path).context("Failed to open database connection")
    }

    /// Existence check for the idempotency filter. Fails closed: a storage
    /// fault reads as "not processed", so the worst case is a reprocess,
    /// never a crash.
    pub fn is_processed(&self, meeting_id: &str) -> bool {
        let check = || -> Result<bool> {
            let conn = self.connect()?;
            let found: Option<i64> = conn
                .query_row(
                    "SELECT 1 FROM processed_meetings WHERE meeting_id = ?1",
                    params![meeting_id],
                    |row| row.get(0),
                )
                .optional()
                .context("Failed to check processed state")?;
            Ok(found.is_some())
        };

        match check() {
            Ok(found) => found,
            Err(e) => {
                error!("Failed to check if meeting is processed: {:#}", e);
                false
            }
        }
    }

    /// Insert a processed-meeting record. The meeting_id primary key
    /// enforces at-most-once: a second insert for the same identifier is a
    /// constraint violation, reported here as a logged failure (false),
    /// never a silent overwrite.
    pub fn mark_processed(
        &self,
        meeting_id: &str,
        title: Option<&str>,
        meeting_date: Option<&str>,
        destination_ref: Option<&str>,
        action_count: i64,
    ) -> bool {
        let insert = || -> Result<()> {
            let conn = self.connect()?;
            conn.execute(
                "INSERT INTO processed_meetings \
                 (meeting_id, title, meeting_date, processed_at, destination_ref, action_count) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    meeting_id,
                    title,
                    meeting_date,
                    Utc::now().to_rfc3339(),
                    destination_ref,
                    action_count,
                ],
            )
            .context("Failed to insert processed meeting")?;
            Ok(())
        };

        match insert() {
            Ok(()) => {
                info!("Meeting {} marked as processed", meeting_id);
                true
            }
            Err(e) => {
                error!("Failed to mark meeting {} as processed: {:#}", meeting_id, e);
                false
            }
        }
    }

    /// Partial update of an existing record. Warns and returns false when
    /// no fields are supplied or no row matches.
    pub fn update_status(&self, meeting_id: &str, update: StatusUpdate) -> bool {
        let mut set_parts: Vec<&str> = Vec::new();
        let mut values: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(destination_ref) = update.destination_ref {
            set_parts.push("destination_ref = ?");
            values.push(Box::new(destination_ref));
        }
        if let Some(action_count) = update.action_count {
            set_parts.push("action_count = ?");
            values.push(Box::new(action_count));
        }
        if let Some(status) = update.status {
            set_parts.push("status = ?");
            values.push(Box::new(status));
        }

        if set_parts.is_empty() {
            warn!("No fields supplied for meeting status update");
            return false;
        }

        values.push(Box::new(meeting_id.to_string()));
        let sql = format!(
            "UPDATE processed_meetings SET {} WHERE meeting_id = ?",
            set_parts.join(", ")
        );

        let run = || -> Result<usize> {
            let conn = self.connect()?;
            let value_refs: Vec<&dyn rusqlite::ToSql> = values.iter().map(|v| v.as_ref()).collect();
            conn.execute(&sql, value_refs.as_slice())
                .context("Failed to update meeting status")
        };

        match run() {
            Ok(0) => {
                warn!("No rows updated for meeting {}", meeting_id);
                false
            }
            Ok(_) => {
                info!("Updated status for meeting {}", meeting_id);
                true
            }
            Err(e) => {
                error!("Failed to update meeting status: {:#}", e);
                false
            }
        }
    }

    /// Open a new sync session and return its identifier. `None` means the
    /// session row could not be created; the run proceeds without durable
    /// accounting rather than aborting.
    pub fn start_session(&self) -> Option<i64> {
        let insert = || -> Result<i64> {
            let conn = self.connect()?;
            conn.execute(
                "INSERT INTO sync_stats (sync_start) VALUES (?1)",
                params![Utc::now().to_rfc3339()],
            )
            .context("Failed to start sync session")?;
            Ok(conn.last_insert_rowid())
        };

        match insert() {
            Ok(id) => Some(id),
            Err(e) => {
                error!("Failed to start sync session: {:#}", e);
                None
            }
        }
    }

    /// Close a session with its final counts. Must be reachable from every
    /// exit path of a run so a session is never left permanently open.
    pub fn end_session(
        &self,
        sync_id: Option<i64>,
        meetings_processed: i64,
        actions_created: i64,
        errors_encountered: i64,
    ) -> bool {
        let Some(sync_id) = sync_id else {
            warn!("No open session to close");
            return false;
        };

        let update = || -> Result<()> {
            let conn = self.connect()?;
            conn.execute(
                "UPDATE sync_stats \
                 SET sync_end = ?1, meetings_processed = ?2, actions_created = ?3, \
                     errors_encountered = ?4 \
                 WHERE sync_id = ?5",
                params![
                    Utc::now().to_rfc3339(),
                    meetings_processed,
                    actions_created,
                    errors_encountered,
                    sync_id,
                ],
            )
            .context("Failed to end sync session")?;
            Ok(())
        };

        match update() {
            Ok(()) => {
                info!("Sync session {} completed", sync_id);
                true
            }
            Err(e) => {
                error!("Failed to end sync session {}: {:#}", sync_id, e);
                false
            }
        }
    }

    /// Append to the error audit trail. Best-effort: never fails the
    /// caller's control flow.
    pub fn log_error(
        &self,
        sync_id: Option<i64>,
        meeting_id: &str,
        error_type: &str,
        error_message: &str,
    ) -> bool {
        let insert = || -> Result<()> {
            let conn = self.connect()?;
            conn.execute(
                "INSERT INTO sync_errors (sync_id, meeting_id, error_type, error_message, error_time) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    sync_id,
                    meeting_id,
                    error_type,
                    error_message,
                    Utc::now().to_rfc3339(),
                ],
            )
            .context("Failed to log sync error")?;
            Ok(())
        };

        match insert() {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to log sync error: {:#}", e);
                false
            }
        }
    }

    /// Meetings processed within the last `days`, newest first.
    pub fn recent_meetings(&self, days: i64, limit: usize) -> Vec<ProcessedMeeting> {
        let query = || -> Result<Vec<ProcessedMeeting>> {
            let conn = self.connect()?;
            let cutoff = (Utc::now() - Duration::days(days)).to_rfc3339();

            let mut stmt = conn
                .prepare(
                    "SELECT meeting_id, title, meeting_date, processed_at, destination_ref, \
                     action_count, status \
                     FROM processed_meetings \
                     WHERE processed_at > ?1 \
                     ORDER BY processed_at DESC LIMIT ?2",
                )
                .context("Failed to prepare recent meetings query")?;

            let rows = stmt
                .query_map(params![cutoff, limit as i64], |row| {
                    Ok(ProcessedMeeting {
                        meeting_id: row.get(0)?,
                        title: row.get(1)?,
                        meeting_date: row.get(2)?,
                        processed_at: row.get(3)?,
                        destination_ref: row.get(4)?,
                        action_count: row.get(5)?,
                        status: row.get(6)?,
                    })
                })
                .context("Failed to query recent meetings")?
                .collect::<std::result::Result<Vec<_>, _>>()
                .context("Failed to map recent meetings")?;

            Ok(rows)
        };

        query().unwrap_or_else(|e| {
            error!("Failed to get recent meetings: {:#}", e);
            Vec::new()
        })
    }

    /// Sessions started within the last `days`, newest first.
    pub fn session_stats(&self, days: i64) -> Vec<SessionStats> {
        let query = || -> Result<Vec<SessionStats>> {
            let conn = self.connect()?;
            let cutoff = (Utc::now() - Duration::days(days)).to_rfc3339();

            let mut stmt = conn
                .prepare(
                    "SELECT sync_id, sync_start, sync_end, meetings_processed, actions_created, \
                     errors_encountered \
                     FROM sync_stats WHERE sync_start > ?1 ORDER BY sync_start DESC",
                )
                .context("Failed to prepare session stats query")?;

            let rows = stmt
                .query_map(params![cutoff], |row| {
                    Ok(SessionStats {
                        sync_id: row.get(0)?,
                        sync_start: row.get(1)?,
                        sync_end: row.get(2)?,
                        meetings_processed: row.get(3)?,
                        actions_created: row.get(4)?,
                        errors_encountered: row.get(5)?,
                    })
                })
                .context("Failed to query session stats")?
                .collect::<std::result::Result<Vec<_>, _>>()
                .context("Failed to map session stats")?;

            Ok(rows)
        };

        query().unwrap_or_else(|e| {
            error!("Failed to get sync stats: {:#}", e);
            Vec::new()
        })
    }

    /// Errors logged within the last `days`, newest first, joined with the
    /// meeting title where one was recorded.
    pub fn error_report(&self, days: i64) -> Vec<SyncErrorRecord> {
        let query = || -> Result<Vec<SyncErrorRecord>> {
            let conn = self.connect()?;
            let cutoff = (Utc::now() - Duration::days(days)).to_rfc3339();

            let mut stmt = conn
                .prepare(
                    "SELECT e.error_id, e.sync_id, e.meeting_id, e.error_type, e.error_message, \
                     e.error_time, m.title \
                     FROM sync_errors e \
                     LEFT JOIN processed_meetings m ON e.meeting_id = m.meeting_id \
                     WHERE e.error_time > ?1 \
                     ORDER BY e.error_time DESC",
                )
                .context("Failed to prepare error report query")?;

            let rows = stmt
                .query_map(params![cutoff], |row| {
                    Ok(SyncErrorRecord {
                        error_id: row.get(0)?,
                        sync_id: row.get(1)?,
                        meeting_id: row.get(2)?,
                        error_type: row.get(3)?,
                        error_message: row.get(4)?,
                        error_time: row.get(5)?,
                        meeting_title: row.get(6)?,
                    })
                })
                .context("Failed to query error report")?
                .collect::<std::result::Result<Vec<_>, _>>()
                .context("Failed to map error report")?;

            Ok(rows)
        };

        query().unwrap_or_else(|e| {
            error!("Failed to get error report: {:#}", e);
            Vec::new()
        })
    }

    /// All-time totals of meetings, actions, errors, and sessions.
    pub fn total_counts(&self) -> TotalCounts {
        let query = || -> Result<TotalCounts> {
            let conn = self.connect()?;

            let total_meetings: i64 = conn
                .query_row("SELECT COUNT(*) FROM processed_meetings", [], |row| {
                    row.get(0)
                })
                .context("Failed to count meetings")?;
            let total_actions: i64 = conn
                .query_row(
                    "SELECT COALESCE(SUM(action_count), 0) FROM processed_meetings",
                    [],
                    |row| row.get(0),
                )
                .context("Failed to sum actions")?;
            let total_errors: i64 = conn
                .query_row("SELECT COUNT(*) FROM sync_errors", [], |row| row.get(0))
                .context("Failed to count errors")?;
            let total_syncs: i64 = conn
                .query_row("SELECT COUNT(*) FROM sync_stats", [], |row| row.get(0))
                .context("Failed to count sessions")?;

            Ok(TotalCounts {
                total_meetings,
                total_actions,
                total_errors,
                total_syncs,
            })
        };

        query().unwrap_or_else(|e| {
            error!("Failed to get total counts: {:#}", e);
            TotalCounts::default()
        })
    }
}

pub(crate) fn migrate(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS processed_meetings (
            meeting_id TEXT PRIMARY KEY,
            title TEXT,
            meeting_date TEXT,
            processed_at TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
            destination_ref TEXT,
            action_count INTEGER DEFAULT 0,
            status TEXT DEFAULT 'completed'
        )",
        [],
    )
    .context("Failed to create processed_meetings table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS sync_stats (
            sync_id INTEGER PRIMARY KEY AUTOINCREMENT,
            sync_start TIMESTAMP,
            sync_end TIMESTAMP,
            meetings_processed INTEGER DEFAULT 0,
            actions_created INTEGER DEFAULT 0,
            errors_encountered INTEGER DEFAULT 0
        )",
        [],
    )
    .context("Failed to create sync_stats table")?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS sync_errors (
            error_id INTEGER PRIMARY KEY AUTOINCREMENT,
            sync_id INTEGER,
            meeting_id TEXT,
            error_type TEXT,
            error_message TEXT,
            error_time TIMESTAMP DEFAULT CURRENT_TIMESTAMP,
            FOREIGN KEY (sync_id) REFERENCES sync_stats(sync_id)
        )",
        [],
    )
    .context("Failed to create sync_errors table")?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_processed_meetings_processed_at \
         ON processed_meetings(processed_at DESC)",
        [],
    )
    .context("Failed to create processed_at index")?;

    conn.execute(
        "CREATE INDEX IF NOT EXISTS idx_sync_errors_error_time ON sync_errors(error_time DESC)",
        [],
    )
    .context("Failed to create error_time index")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_store() -> (TempDir, StateStore) {
        let dir = TempDir::new().unwrap();
        let store = StateStore::open(dir.path().join("meetsync.db")).unwrap();
        (dir, store)
    }

    #[test]
    fn test_unprocessed_meeting_reads_false() {
        let (_dir, store) = setup_store();
        assert!(!store.is_processed("mtg-1"));
    }

    #[test]
    fn test_mark_then_check() {
        let (_dir, store) = setup_store();
        assert!(store.mark_processed("mtg-1", Some("Standup"), Some("2026-08-28"), Some("page-9"), 3));
        assert!(store.is_processed("mtg-1"));
    }

    #[test]
    fn test_duplicate_mark_is_rejected() {
        let (_dir, store) = setup_store();
        assert!(store.mark_processed("mtg-1", Some("First"), None, None, 0));
        // Second insert for the same identifier violates the primary key
        // and must not overwrite the original record.
        assert!(!store.mark_processed("mtg-1", Some("Second"), None, None, 7));

        let recent = store.recent_meetings(1, 10);
        assert_eq!(recent.len(), 1);
        assert_eq!(recent[0].title, Some("First".to_string()));
        assert_eq!(recent[0].action_count, 0);
    }

    #[test]
    fn test_update_status_partial() {
        let (_dir, store) = setup_store();
        store.mark_processed("mtg-1", Some("Standup"), None, None, 0);

        assert!(store.update_status(
            "mtg-1",
            StatusUpdate {
                status: Some("failed".to_string()),
                ..Default::default()
            }
        ));

        let recent = store.recent_meetings(1, 10);
        assert_eq!(recent[0].status, "failed");
        assert_eq!(recent[0].title, Some("Standup".to_string()));
    }

    #[test]
    fn test_update_status_no_fields_is_noop() {
        let (_dir, store) = setup_store();
        store.mark_processed("mtg-1", None, None, None, 0);
        assert!(!store.update_status("mtg-1", StatusUpdate::default()));
    }

    #[test]
    fn test_update_status_missing_row() {
        let (_dir, store) = setup_store();
        assert!(!store.update_status(
            "nope",
            StatusUpdate {
                action_count: Some(2),
                ..Default::default()
            }
        ));
    }

    #[test]
    fn test_session_lifecycle() {
        let (_dir, store) = setup_store();
        let sync_id = store.start_session();
        assert!(sync_id.is_some());

        let open = store.session_stats(1);
        assert_eq!(open.len(), 1);
        assert!(open[0].sync_end.is_none());

        assert!(store.end_session(sync_id, 4, 11, 1));

        let closed = store.session_stats(1);
        assert!(closed[0].sync_end.is_some());
        assert_eq!(closed[0].meetings_processed, 4);
        assert_eq!(closed[0].actions_created, 11);
        assert_eq!(closed[0].errors_encountered, 1);
    }

    #[test]
    fn test_end_session_without_id() {
        let (_dir, store) = setup_store();
        assert!(!store.end_session(None, 0, 0, 0));
    }

    #[test]
    fn test_error_report_joins_meeting_title() {
        let (_dir, store) = setup_store();
        let sync_id = store.start_session();
        store.mark_processed("mtg-1", Some("Planning"), None, None, 0);
        assert!(store.log_error(sync_id, "mtg-1", "publish_failure", "write returned null"));
        assert!(store.log_error(sync_id, "mtg-2", "fetch_failure", "timed out"));

        let report = store.error_report(1);
        assert_eq!(report.len(), 2);
        let known = report.iter().find(|e| e.meeting_id == "mtg-1").unwrap();
        assert_eq!(known.meeting_title, Some("Planning".to_string()));
        let unknown = report.iter().find(|e| e.meeting_id == "mtg-2").unwrap();
        assert!(unknown.meeting_title.is_none());
    }

    #[test]
    fn test_total_counts() {
        let (_dir, store) = setup_store();
        store.mark_processed("mtg-1", None, None, None, 2);
        store.mark_processed("mtg-2", None, None, None, 3);
        let sync_id = store.start_session();
        store.log_error(sync_id, "mtg-3", "process_error", "boom");
        store.end_session(sync_id, 2, 5, 1);

        let totals = store.total_counts();
        assert_eq!(totals.total_meetings, 2);
        assert_eq!(totals.total_actions, 5);
        assert_eq!(totals.total_errors, 1);
        assert_eq!(totals.total_syncs, 1);
    }

    #[test]
    fn test_state_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("meetsync.db");

        {
            let store = StateStore::open(&path).unwrap();
            store.mark_processed("mtg-1", None, None, None, 0);
        }

        let store = StateStore::open(&path).unwrap();
        assert!(store.is_processed("mtg-1"));
    }
}
