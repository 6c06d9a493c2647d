use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, error, info};

use crate::filter::{TaskFilters, TaskQuery};
use crate::store::{StoreResult, TaskStore};
use crate::task::{Priority, Task};

/// Example tasks written into an empty store on first start.
pub fn seed_tasks() -> Vec<Task> {
    vec![
        Task {
            id: 1,
            ..Task::new("Goooooooooo", "03.12.2025")
        },
        Task {
            id: 2,
            is_completed: true,
            ..Task::new("Drink coffee", "28.01.2026")
        },
        Task {
            id: 3,
            ..Task::new(
                "Another task a lot of text to check if it works",
                "11.11.2028",
            )
        },
    ]
}

/// State behind the task list screen: the filter selection and the list the
/// store currently returns for it.
///
/// Mutations are spawned and return immediately; their effect shows up
/// through [`TaskListModel::subscribe`]. Dropping the model cancels
/// everything it started.
pub struct TaskListModel<S: TaskStore> {
    store: S,
    filters: TaskFilters,
    query: TaskQuery,
    tasks: Arc<watch::Sender<Vec<Task>>>,
    epoch: Arc<AtomicU64>,
    collector: Option<JoinHandle<()>>,
    pending: JoinSet<()>,
    pub selected: usize,
}

impl<S: TaskStore> TaskListModel<S> {
    /// Seeds an empty store, then starts following the unfiltered list.
    pub async fn activate(store: S) -> StoreResult<Self> {
        if store.all_tasks().first().await?.is_empty() {
            let seeds = seed_tasks();
            info!(count = seeds.len(), "seeding empty task store");
            for task in seeds {
                store.add(task).await?;
            }
        }

        let (tasks, _) = watch::channel(Vec::new());
        let mut model = Self {
            store,
            filters: TaskFilters::default(),
            query: TaskQuery::All,
            tasks: Arc::new(tasks),
            epoch: Arc::new(AtomicU64::new(0)),
            collector: None,
            pending: JoinSet::new(),
            selected: 0,
        };
        model.restart_collector();
        Ok(model)
    }

    pub fn subscribe(&self) -> watch::Receiver<Vec<Task>> {
        self.tasks.subscribe()
    }

    pub fn tasks(&self) -> Vec<Task> {
        self.tasks.borrow().clone()
    }

    pub fn filters(&self) -> &TaskFilters {
        &self.filters
    }

    pub fn query(&self) -> &TaskQuery {
        &self.query
    }

    pub fn set_completed_filter(&mut self, completed: Option<bool>) {
        self.filters.completed = completed;
        self.refilter();
    }

    pub fn set_priority_filter(&mut self, priority: Option<Priority>) {
        self.filters.priority = priority;
        self.refilter();
    }

    pub fn set_search(&mut self, search: impl Into<String>) {
        self.filters.search = search.into();
        self.refilter();
    }

    pub fn set_overdue(&mut self, overdue: bool) {
        self.filters.overdue = overdue;
    }

    pub fn clear_filters(&mut self) {
        self.filters.clear();
        self.refilter();
    }

    pub fn add_task(&mut self, title: impl Into<String>, due_date: impl Into<String>) {
        let task = Task::new(title, due_date);
        let store = self.store.clone();
        self.spawn(async move {
            if let Err(err) = store.add(task).await {
                error!(%err, "failed to add task");
            }
        });
    }

    pub fn update_task(&mut self, task: Task) {
        let store = self.store.clone();
        self.spawn(async move {
            let id = task.id;
            if let Err(err) = store.update(task).await {
                error!(id, %err, "failed to update task");
            }
        });
    }

    pub fn delete_task(&mut self, task: Task) {
        let store = self.store.clone();
        self.spawn(async move {
            if let Err(err) = store.delete(&task).await {
                error!(id = task.id, %err, "failed to delete task");
            }
        });
    }

    pub fn toggle_completed(&mut self, task: &Task) {
        self.update_task(task.toggled());
    }

    /// Waits until every mutation started so far has finished.
    pub async fn settle(&mut self) {
        while let Some(result) = self.pending.join_next().await {
            if let Err(err) = result {
                error!(%err, "task mutation did not complete");
            }
        }
    }

    pub fn selected_task(&self) -> Option<Task> {
        self.tasks.borrow().get(self.selected).cloned()
    }

    pub fn select_next(&mut self) {
        let len = self.tasks.borrow().len();
        if self.selected + 1 < len {
            self.selected += 1;
        }
    }

    pub fn select_previous(&mut self) {
        self.selected = self.selected.saturating_sub(1);
    }

    /// Keeps the selection inside the current list.
    pub fn clamp_selection(&mut self) {
        let len = self.tasks.borrow().len();
        self.selected = self.selected.min(len.saturating_sub(1));
    }

    fn spawn<F>(&mut self, mutation: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        while self.pending.try_join_next().is_some() {}
        self.pending.spawn(mutation);
    }

    fn refilter(&mut self) {
        let query = self.filters.query();
        if query != self.query {
            debug!(?query, "task query changed");
            self.query = query;
            self.selected = 0;
            self.restart_collector();
        }
    }

    fn restart_collector(&mut self) {
        if let Some(handle) = self.collector.take() {
            handle.abort();
        }

        // A collector that was already running when aborted must not publish
        // its result over the new query's.
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        let current_epoch = Arc::clone(&self.epoch);
        let mut stream = self.store.observe(self.query.clone());
        let tasks = Arc::clone(&self.tasks);
        self.collector = Some(tokio::spawn(async move {
            while let Some(snapshot) = stream.next().await {
                match snapshot {
                    Ok(list) => {
                        tasks.send_if_modified(|current| {
                            if current_epoch.load(Ordering::SeqCst) != epoch || *current == list {
                                false
                            } else {
                                *current = list;
                                true
                            }
                        });
                    }
                    Err(err) => error!(query = ?stream.query(), %err, "task query failed"),
                }
            }
        }));
    }
}

impl<S: TaskStore> Drop for TaskListModel<S> {
    fn drop(&mut self) {
        if let Some(handle) = self.collector.take() {
            handle.abort();
        }
    }
}
