use std::path::Path;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, Row};
use tokio::sync::watch;
use tracing::{debug, warn};

use super::{StoreError, StoreResult, TaskStore};
use crate::filter::TaskQuery;
use crate::task::{Priority, Task};

/// Bumped whenever the `tasks` layout changes. Databases written with another
/// version are wiped and recreated.
pub const SCHEMA_VERSION: i64 = 3;

const COLUMNS: &str = "id, title, is_completed, priority, due_date, category, notes";

impl ToSql for Priority {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.to_string()))
    }
}

impl FromSql for Priority {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let name = value.as_str()?;
        Priority::from_str(name).map_err(|err| FromSqlError::Other(Box::new(err)))
    }
}

/// SQLite-backed [`TaskStore`].
#[derive(Clone)]
pub struct SqliteTaskStore {
    conn: Arc<Mutex<Connection>>,
    changes: Arc<watch::Sender<u64>>,
}

impl SqliteTaskStore {
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        debug!(path = %path.display(), "opening task database");
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> StoreResult<Self> {
        migrate(&conn)?;
        let (changes, _) = watch::channel(0);
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            changes: Arc::new(changes),
        })
    }

    /// Runs `f` against the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> rusqlite::Result<T> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock().map_err(|_| StoreError::Poisoned)?;
            f(&*guard).map_err(StoreError::from)
        })
        .await?
    }

    fn notify(&self) {
        self.changes.send_modify(|generation| *generation += 1);
    }
}

fn migrate(conn: &Connection) -> StoreResult<()> {
    let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
    if version != 0 && version != SCHEMA_VERSION {
        warn!(
            found = version,
            expected = SCHEMA_VERSION,
            "task schema version mismatch, recreating table"
        );
        conn.execute_batch("DROP TABLE IF EXISTS tasks;")?;
    }

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS tasks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            is_completed INTEGER NOT NULL DEFAULT 0,
            priority TEXT NOT NULL DEFAULT 'LOW',
            due_date TEXT NOT NULL,
            category TEXT NOT NULL DEFAULT '',
            notes TEXT NOT NULL DEFAULT ''
        );
        "#,
    )?;
    conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    Ok(())
}

fn row_to_task(row: &Row<'_>) -> rusqlite::Result<Task> {
    Ok(Task {
        id: row.get("id")?,
        title: row.get("title")?,
        is_completed: row.get("is_completed")?,
        priority: row.get("priority")?,
        due_date: row.get("due_date")?,
        category: row.get("category")?,
        notes: row.get("notes")?,
    })
}

fn select(conn: &Connection, query: &TaskQuery) -> rusqlite::Result<Vec<Task>> {
    let (filter, arg): (&str, Option<String>) = match query {
        TaskQuery::All => ("", None),
        TaskQuery::Completed => ("WHERE is_completed = 1", None),
        TaskQuery::Pending => ("WHERE is_completed = 0", None),
        TaskQuery::ByPriority(priority) => ("WHERE priority = ?1", Some(priority.to_string())),
        TaskQuery::Search(text) => ("WHERE title LIKE '%' || ?1 || '%'", Some(text.clone())),
    };
    let sql = format!("SELECT {COLUMNS} FROM tasks {filter} ORDER BY id");
    let mut stmt = conn.prepare_cached(&sql)?;
    let rows = match arg {
        Some(arg) => stmt.query_map(params![arg], row_to_task)?,
        None => stmt.query_map([], row_to_task)?,
    };
    rows.collect()
}

#[async_trait]
impl TaskStore for SqliteTaskStore {
    async fn add(&self, task: Task) -> StoreResult<i64> {
        let id = self
            .with_conn(move |conn| {
                conn.execute(
                    &format!(
                        "INSERT OR REPLACE INTO tasks ({COLUMNS}) \
                         VALUES (NULLIF(?1, 0), ?2, ?3, ?4, ?5, ?6, ?7)"
                    ),
                    params![
                        task.id,
                        task.title,
                        task.is_completed,
                        task.priority,
                        task.due_date,
                        task.category,
                        task.notes,
                    ],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .await?;
        debug!(id, "task stored");
        self.notify();
        Ok(id)
    }

    async fn update(&self, task: Task) -> StoreResult<()> {
        let id = task.id;
        let changed = self
            .with_conn(move |conn| {
                conn.execute(
                    "UPDATE tasks SET title = ?2, is_completed = ?3, priority = ?4, \
                     due_date = ?5, category = ?6, notes = ?7 WHERE id = ?1",
                    params![
                        task.id,
                        task.title,
                        task.is_completed,
                        task.priority,
                        task.due_date,
                        task.category,
                        task.notes,
                    ],
                )
            })
            .await?;
        if changed == 0 {
            debug!(id, "update skipped, no such task");
        } else {
            debug!(id, "task updated");
            self.notify();
        }
        Ok(())
    }

    async fn delete(&self, task: &Task) -> StoreResult<()> {
        let id = task.id;
        let changed = self
            .with_conn(move |conn| conn.execute("DELETE FROM tasks WHERE id = ?1", [id]))
            .await?;
        if changed > 0 {
            debug!(id, "task deleted");
            self.notify();
        }
        Ok(())
    }

    async fn get_by_id(&self, id: i64) -> StoreResult<Option<Task>> {
        self.with_conn(move |conn| {
            conn.query_row(
                &format!("SELECT {COLUMNS} FROM tasks WHERE id = ?1"),
                [id],
                row_to_task,
            )
            .optional()
        })
        .await
    }

    async fn query(&self, query: &TaskQuery) -> StoreResult<Vec<Task>> {
        let query = query.clone();
        self.with_conn(move |conn| select(conn, &query)).await
    }

    fn changes(&self) -> watch::Receiver<u64> {
        self.changes.subscribe()
    }
}
