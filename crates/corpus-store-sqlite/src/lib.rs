//! SQLite implementation of [`MessageSource`].
//!
//! Reads the `messages` table of a chat analytics database:
//!
//! ```sql
//! messages(guildId INTEGER, authorId INTEGER, contents TEXT, timestamp REAL)
//! ```
//!
//! Every call opens its own connection on the blocking thread pool, so slow
//! queries never stall the async runtime.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use corpus_source::{AuthorId, MessageSource, ScopeId, SourceError, StoredMessage};
use rusqlite::{Connection, OpenFlags, params};

/// How long a connection waits on a locked database before failing.
pub const BUSY_TIMEOUT: Duration = Duration::from_secs(15);

const CREATE_SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS messages (
    guildId   INTEGER NOT NULL,
    authorId  INTEGER NOT NULL,
    contents  TEXT,
    timestamp REAL NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_messages_guild_time ON messages (guildId, timestamp DESC);
";

const SELECT_SCOPE_SQL: &str =
    "SELECT contents FROM messages WHERE guildId = ?1 ORDER BY timestamp DESC LIMIT ?2";

const SELECT_SCOPE_AUTHOR_SQL: &str = "SELECT contents FROM messages \
     WHERE guildId = ?1 AND authorId = ?2 ORDER BY timestamp DESC LIMIT ?3";

/// Message source backed by a SQLite database file.
#[derive(Debug, Clone)]
pub struct SqliteMessageSource {
    path: PathBuf,
}

impl SqliteMessageSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        SqliteMessageSource { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the `messages` table (and the database file) if missing.
    ///
    /// # Errors
    /// Returns an error when the database cannot be opened or written.
    pub async fn create_schema(&self) -> Result<(), SourceError> {
        self.with_connection(read_write(), |conn| conn.execute_batch(CREATE_SCHEMA_SQL))
            .await
    }

    /// Append one message.
    ///
    /// # Errors
    /// Returns an error when the database cannot be opened, the ids do not
    /// fit SQLite integers, or the insert fails.
    pub async fn insert(&self, message: StoredMessage) -> Result<(), SourceError> {
        let scope = to_sql_id(message.scope.0)?;
        let author = to_sql_id(message.author.0)?;
        self.with_connection(read_write(), move |conn| {
            conn.execute(
                "INSERT INTO messages (guildId, authorId, contents, timestamp) VALUES (?1, ?2, ?3, ?4)",
                params![scope, author, message.contents, message.timestamp],
            )
            .map(|_| ())
        })
        .await
    }

    async fn with_connection<T, F>(&self, flags: OpenFlags, f: F) -> Result<T, SourceError>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let path = self.path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = open(&path, flags).map_err(|e| SourceError::Unavailable(Box::new(e)))?;
            f(&conn).map_err(|e| SourceError::Query(Box::new(e)))
        })
        .await
        .map_err(|e| SourceError::Unavailable(Box::new(e)))?
    }
}

#[async_trait]
impl MessageSource for SqliteMessageSource {
    async fn fetch_messages(
        &self,
        scope: ScopeId,
        author: Option<AuthorId>,
        limit: usize,
    ) -> Result<Vec<String>, SourceError> {
        let guild = to_sql_id(scope.0)?;
        let author = author
            .filter(|a| a.filters())
            .map(|a| to_sql_id(a.0))
            .transpose()?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let bodies = self
            .with_connection(read_only(), move |conn| {
                let rows: Vec<Option<String>> = match author {
                    None => {
                        let mut stmt = conn.prepare(SELECT_SCOPE_SQL)?;
                        let rows = stmt
                            .query_map(params![guild, limit], |row| row.get(0))?
                            .collect::<rusqlite::Result<_>>()?;
                        rows
                    }
                    Some(author) => {
                        let mut stmt = conn.prepare(SELECT_SCOPE_AUTHOR_SQL)?;
                        let rows = stmt
                            .query_map(params![guild, author, limit], |row| row.get(0))?
                            .collect::<rusqlite::Result<_>>()?;
                        rows
                    }
                };
                // NULL bodies carry no words.
                Ok(rows.into_iter().flatten().collect::<Vec<String>>())
            })
            .await?;

        tracing::debug!(
            scope = %scope,
            author = ?author,
            messages = bodies.len(),
            "fetched messages from sqlite"
        );
        Ok(bodies)
    }
}

fn read_only() -> OpenFlags {
    OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX
}

fn read_write() -> OpenFlags {
    OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE | OpenFlags::SQLITE_OPEN_NO_MUTEX
}

fn open(path: &Path, flags: OpenFlags) -> rusqlite::Result<Connection> {
    let conn = Connection::open_with_flags(path, flags)?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    Ok(conn)
}

fn to_sql_id(id: u64) -> Result<i64, SourceError> {
    i64::try_from(id).map_err(|e| SourceError::Query(Box::new(e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(scope: u64, author: u64, timestamp: f64, contents: &str) -> StoredMessage {
        StoredMessage {
            scope: ScopeId(scope),
            author: AuthorId(author),
            timestamp,
            contents: contents.to_string(),
        }
    }

    async fn seeded(dir: &tempfile::TempDir) -> SqliteMessageSource {
        let source = SqliteMessageSource::new(dir.path().join("analytics.db"));
        source.create_schema().await.unwrap();
        for m in [
            message(1, 10, 100.0, "oldest message"),
            message(1, 20, 300.0, "newest message"),
            message(1, 10, 200.0, "middle message"),
            message(2, 10, 400.0, "elsewhere"),
        ] {
            source.insert(m).await.unwrap();
        }
        source
    }

    #[tokio::test]
    async fn fetch_scope_newest_first() {
        let dir = tempfile::tempdir().unwrap();
        let source = seeded(&dir).await;
        let got = source.fetch_messages(ScopeId(1), None, 50).await.unwrap();
        assert_eq!(got, vec!["newest message", "middle message", "oldest message"]);
    }

    #[tokio::test]
    async fn fetch_filters_by_author() {
        let dir = tempfile::tempdir().unwrap();
        let source = seeded(&dir).await;
        let got = source
            .fetch_messages(ScopeId(1), Some(AuthorId(10)), 50)
            .await
            .unwrap();
        assert_eq!(got, vec!["middle message", "oldest message"]);
    }

    #[tokio::test]
    async fn author_zero_is_unfiltered() {
        let dir = tempfile::tempdir().unwrap();
        let source = seeded(&dir).await;
        let got = source
            .fetch_messages(ScopeId(1), Some(AuthorId(0)), 50)
            .await
            .unwrap();
        assert_eq!(got.len(), 3);
    }

    #[tokio::test]
    async fn fetch_respects_limit() {
        let dir = tempfile::tempdir().unwrap();
        let source = seeded(&dir).await;
        let got = source.fetch_messages(ScopeId(1), None, 1).await.unwrap();
        assert_eq!(got, vec!["newest message"]);
    }

    #[tokio::test]
    async fn null_contents_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let source = seeded(&dir).await;
        let path = source.path().to_path_buf();
        let conn = Connection::open(&path).unwrap();
        conn.execute(
            "INSERT INTO messages (guildId, authorId, contents, timestamp) VALUES (1, 10, NULL, 500.0)",
            [],
        )
        .unwrap();
        drop(conn);

        let got = source.fetch_messages(ScopeId(1), None, 50).await.unwrap();
        assert_eq!(got.len(), 3);
    }

    #[tokio::test]
    async fn missing_database_is_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let source = SqliteMessageSource::new(dir.path().join("absent.db"));
        let err = source.fetch_messages(ScopeId(1), None, 50).await.unwrap_err();
        assert!(matches!(err, SourceError::Unavailable(_)), "{err:?}");
    }

    #[tokio::test]
    async fn missing_table_is_query_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.db");
        Connection::open(&path)
            .unwrap()
            .execute_batch("CREATE TABLE unrelated (x INTEGER);")
            .unwrap();
        let source = SqliteMessageSource::new(path);
        let err = source.fetch_messages(ScopeId(1), None, 50).await.unwrap_err();
        assert!(matches!(err, SourceError::Query(_)), "{err:?}");
    }

    #[tokio::test]
    async fn oversized_ids_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let source = seeded(&dir).await;
        let err = source
            .fetch_messages(ScopeId(u64::MAX), None, 50)
            .await
            .unwrap_err();
        assert!(matches!(err, SourceError::Query(_)));
    }
}
