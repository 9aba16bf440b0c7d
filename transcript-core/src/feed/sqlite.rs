// SQLite feed - reads raw records from the agent's message table

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Row};
use tracing::warn;

use super::{MessageFeed, Page};
use crate::error::FeedError;
use crate::types::{RawRecord, Role};

/// Layout of the message table this feed reads.
/// `content` holds JSON text, `created_at` holds epoch milliseconds.
pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS messages (
    id TEXT PRIMARY KEY,
    task_id TEXT NOT NULL,
    role TEXT NOT NULL,
    content TEXT NOT NULL,
    created_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS messages_task_created ON messages (task_id, created_at);
";

pub struct SqliteFeed {
    db_path: PathBuf,
}

impl SqliteFeed {
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self, FeedError> {
        let db_path = db_path.as_ref().to_path_buf();
        if !db_path.exists() {
            return Err(FeedError::Unavailable(format!(
                "message database not found: {}",
                db_path.display()
            )));
        }
        Ok(SqliteFeed { db_path })
    }

    fn connect(&self) -> Result<Connection, FeedError> {
        Ok(Connection::open_with_flags(
            &self.db_path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?)
    }
}

/// Row as stored, before any decoding. Columns are read untyped so one
/// row with an unexpected storage class cannot fail the whole query.
struct StoredRow {
    id: SqlValue,
    task_id: SqlValue,
    role: SqlValue,
    content: SqlValue,
    created_at: SqlValue,
}

impl StoredRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(StoredRow {
            id: row.get(0)?,
            task_id: row.get(1)?,
            role: row.get(2)?,
            content: row.get(3)?,
            created_at: row.get(4)?,
        })
    }

    /// Decode a row, or `None` (with a warning) if any column is unusable
    fn into_record(self) -> Option<RawRecord> {
        let Some(id) = text_column(self.id) else {
            warn!("skipping record with non-text id");
            return None;
        };

        let Some(task_id) = text_column(self.task_id) else {
            warn!(id = %id, "skipping record with non-text task id");
            return None;
        };

        let role: Role = match text_column(self.role).map(|role| role.parse()) {
            Some(Ok(role)) => role,
            Some(Err(err)) => {
                warn!(id = %id, %err, "skipping record with unknown role");
                return None;
            }
            None => {
                warn!(id = %id, "skipping record with non-text role");
                return None;
            }
        };

        let content = match self.content {
            SqlValue::Text(ref json) => match serde_json::from_str(json) {
                Ok(content) => content,
                Err(err) => {
                    warn!(id = %id, %err, "skipping record with undecodable content");
                    return None;
                }
            },
            ref other => {
                warn!(id = %id, kind = ?other.data_type(), "skipping record with non-text content");
                return None;
            }
        };

        let Some(created_at) = millis_column(&self.created_at).and_then(DateTime::<Utc>::from_timestamp_millis) else {
            warn!(id = %id, created_at = ?self.created_at, "skipping record with invalid timestamp");
            return None;
        };

        Some(RawRecord {
            id,
            task_id,
            role,
            content,
            created_at,
        })
    }
}

fn text_column(value: SqlValue) -> Option<String> {
    match value {
        SqlValue::Text(text) => Some(text),
        SqlValue::Integer(n) => Some(n.to_string()),
        _ => None,
    }
}

fn millis_column(value: &SqlValue) -> Option<i64> {
    match *value {
        SqlValue::Integer(millis) => Some(millis),
        _ => None,
    }
}

impl MessageFeed for SqliteFeed {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    fn record_created_at(&self, id: &str) -> Result<Option<DateTime<Utc>>, FeedError> {
        let conn = self.connect()?;
        let stored: Option<SqlValue> = conn
            .query_row(
                "SELECT created_at FROM messages WHERE id = ?1",
                [id],
                |row| row.get(0),
            )
            .optional()?;

        Ok(stored
            .as_ref()
            .and_then(millis_column)
            .and_then(DateTime::<Utc>::from_timestamp_millis))
    }

    fn records(
        &self,
        task_id: &str,
        after: Option<DateTime<Utc>>,
        page: Option<Page>,
    ) -> Result<Vec<RawRecord>, FeedError> {
        let conn = self.connect()?;

        let after_millis = after.map(|t| t.timestamp_millis()).unwrap_or(i64::MIN);
        let (limit, offset) = match page {
            Some(page) => (
                i64::try_from(page.limit).unwrap_or(i64::MAX),
                i64::try_from(page.offset()).unwrap_or(i64::MAX),
            ),
            None => (-1, 0),
        };

        let mut stmt = conn.prepare(
            "SELECT id, task_id, role, content, created_at FROM messages
             WHERE task_id = ?1 AND created_at > ?2
             ORDER BY created_at ASC, rowid ASC
             LIMIT ?3 OFFSET ?4",
        )?;

        let rows: Vec<StoredRow> = stmt
            .query_map(params![task_id, after_millis, limit, offset], StoredRow::from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows.into_iter().filter_map(StoredRow::into_record).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use color_eyre::Result;
    use tempfile::tempdir;

    fn seed(conn: &Connection, id: &str, task: &str, role: &str, content: &str, millis: i64) -> Result<()> {
        conn.execute(
            "INSERT INTO messages (id, task_id, role, content, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![id, task, role, content, millis],
        )?;
        Ok(())
    }

    #[test]
    fn test_missing_database_is_unavailable() {
        let dir = tempdir().unwrap();
        let result = SqliteFeed::open(dir.path().join("absent.db"));
        assert!(matches!(result, Err(FeedError::Unavailable(_))));
    }

    #[test]
    fn test_sqlite_feed_with_mock_db() -> Result<()> {
        let temp_dir = tempdir()?;
        let db_path = temp_dir.path().join("messages.db");

        let conn = Connection::open(&db_path)?;
        conn.execute_batch(SCHEMA)?;
        seed(&conn, "m2", "task-1", "ASSISTANT", r#"[{"type":"text","text":"Sure"}]"#, 2_000)?;
        seed(&conn, "m1", "task-1", "USER", r#""Open firefox""#, 1_000)?;
        seed(&conn, "m3", "task-1", "SYSTEM", r#""ignored""#, 3_000)?;
        seed(&conn, "m4", "task-1", "USER", "{not json", 4_000)?;
        seed(&conn, "m5", "task-1", "USER", r#""Thanks""#, 5_000)?;
        seed(&conn, "x1", "task-2", "USER", r#""other task""#, 1_500)?;
        drop(conn);

        let feed = SqliteFeed::open(&db_path)?;

        let all = feed.records("task-1", None, None)?;
        let ids: Vec<&str> = all.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m2", "m5"]);
        assert_eq!(all[0].role, Role::User);
        assert_eq!(all[0].content, serde_json::json!("Open firefox"));

        let checkpoint = feed.record_created_at("m2")?;
        assert_eq!(checkpoint.map(|t| t.timestamp_millis()), Some(2_000));
        assert_eq!(feed.record_created_at("missing")?, None);

        let newer = feed.records("task-1", checkpoint, None)?;
        let ids: Vec<&str> = newer.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["m5"]);

        let first_page = feed.records("task-1", None, Some(Page::new(Some(2), Some(1))))?;
        assert_eq!(first_page.len(), 2);

        // Rows are paged before undecodable ones are dropped
        let third_page = feed.records("task-1", None, Some(Page::new(Some(2), Some(3))))?;
        let ids: Vec<&str> = third_page.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["m5"]);

        Ok(())
    }

    #[test]
    fn test_rows_with_unexpected_column_types_are_skipped() -> Result<()> {
        let temp_dir = tempdir()?;
        let db_path = temp_dir.path().join("messages.db");

        // Untyped table, so any storage class can land in any column
        let conn = Connection::open(&db_path)?;
        conn.execute_batch("CREATE TABLE messages (id, task_id, role, content, created_at);")?;
        conn.execute_batch(
            "INSERT INTO messages VALUES ('a', 'task-1', 'USER', '\"hi\"', 1000);
             INSERT INTO messages VALUES ('b', 'task-1', 'USER', X'00', 2000);
             INSERT INTO messages VALUES ('c', 'task-1', 'ASSISTANT', '\"late\"', 'yesterday');
             INSERT INTO messages VALUES ('d', 'task-1', 'ASSISTANT', '\"ok\"', 3000);",
        )?;
        drop(conn);

        let feed = SqliteFeed::open(&db_path)?;
        let records = feed.records("task-1", None, None)?;
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "d"]);
        assert_eq!(records[1].content, serde_json::json!("ok"));

        assert_eq!(feed.record_created_at("c")?, None);
        Ok(())
    }

    #[test]
    fn test_huge_page_does_not_overflow() -> Result<()> {
        let temp_dir = tempdir()?;
        let db_path = temp_dir.path().join("messages.db");
        let conn = Connection::open(&db_path)?;
        conn.execute_batch(SCHEMA)?;
        seed(&conn, "m1", "task-1", "USER", r#""hello""#, 1_000)?;
        drop(conn);

        let feed = SqliteFeed::open(&db_path)?;
        let page = Page::new(Some(usize::MAX), Some(usize::MAX));
        assert!(feed.records("task-1", None, Some(page))?.is_empty());
        Ok(())
    }
}
