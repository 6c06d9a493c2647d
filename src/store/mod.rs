//! Task persistence contract and reactive reads.

mod sqlite;

pub use sqlite::{SqliteTaskStore, SCHEMA_VERSION};

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::watch;

use crate::filter::TaskQuery;
use crate::task::{Priority, Task};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite: {0}")]
    Sql(#[from] rusqlite::Error),
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("database connection lock poisoned")]
    Poisoned,
    #[error("store task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Handle to a durable task table.
///
/// Handles are cheap to clone and share one underlying store. Writes bump a
/// generation counter published through [`TaskStore::changes`]; streams use it
/// to re-run their query.
#[async_trait]
pub trait TaskStore: Clone + Send + Sync + 'static {
    /// Inserts `task`, replacing any row with the same id. An id of `0` is
    /// assigned by the store. Returns the stored id.
    async fn add(&self, task: Task) -> StoreResult<i64>;

    /// Replaces the row with `task.id`. Does nothing if there is none.
    async fn update(&self, task: Task) -> StoreResult<()>;

    async fn delete(&self, task: &Task) -> StoreResult<()>;

    async fn get_by_id(&self, id: i64) -> StoreResult<Option<Task>>;

    async fn query(&self, query: &TaskQuery) -> StoreResult<Vec<Task>>;

    fn changes(&self) -> watch::Receiver<u64>;

    fn observe(&self, query: TaskQuery) -> TaskStream<Self> {
        TaskStream::new(self.clone(), query)
    }

    fn all_tasks(&self) -> TaskStream<Self> {
        self.observe(TaskQuery::All)
    }

    fn tasks_by_priority(&self, priority: Priority) -> TaskStream<Self> {
        self.observe(TaskQuery::ByPriority(priority))
    }

    fn completed_tasks(&self) -> TaskStream<Self> {
        self.observe(TaskQuery::Completed)
    }

    fn pending_tasks(&self) -> TaskStream<Self> {
        self.observe(TaskQuery::Pending)
    }

    fn search_tasks(&self, query: &str) -> TaskStream<Self> {
        self.observe(TaskQuery::Search(query.to_string()))
    }
}

/// Snapshots of one query, re-read after every store write.
pub struct TaskStream<S> {
    store: S,
    query: TaskQuery,
    changes: watch::Receiver<u64>,
    primed: bool,
}

impl<S: TaskStore> TaskStream<S> {
    pub fn new(store: S, query: TaskQuery) -> Self {
        let changes = store.changes();
        Self {
            store,
            query,
            changes,
            primed: false,
        }
    }

    pub fn query(&self) -> &TaskQuery {
        &self.query
    }

    /// The first call yields the current result right away. Later calls wait
    /// for the next write. Returns `None` once the store is gone.
    pub async fn next(&mut self) -> Option<StoreResult<Vec<Task>>> {
        if self.primed {
            self.changes.changed().await.ok()?;
        } else {
            self.changes.borrow_and_update();
            self.primed = true;
        }
        Some(self.store.query(&self.query).await)
    }

    /// Current result, without waiting for changes.
    pub async fn first(mut self) -> StoreResult<Vec<Task>> {
        self.primed = false;
        match self.next().await {
            Some(snapshot) => snapshot,
            None => Ok(Vec::new()),
        }
    }
}
