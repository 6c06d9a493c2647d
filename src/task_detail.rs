use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::error;

use crate::store::{StoreResult, TaskStore};
use crate::task::{Priority, Task};

/// State behind the detail screen of a single task. `None` while loading or
/// when the id does not exist.
pub struct TaskDetailModel<S: TaskStore> {
    store: S,
    task: watch::Sender<Option<Task>>,
    pending: JoinSet<()>,
}

impl<S: TaskStore> TaskDetailModel<S> {
    pub fn new(store: S) -> Self {
        let (task, _) = watch::channel(None);
        Self {
            store,
            task,
            pending: JoinSet::new(),
        }
    }

    pub async fn load(&self, id: i64) -> StoreResult<Option<Task>> {
        self.task.send_replace(None);
        let task = self.store.get_by_id(id).await?;
        self.task.send_replace(task.clone());
        Ok(task)
    }

    pub fn task(&self) -> Option<Task> {
        self.task.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<Task>> {
        self.task.subscribe()
    }

    /// Writes `task` in the background and shows it right away.
    pub fn save(&mut self, task: Task) {
        self.task.send_replace(Some(task.clone()));
        let store = self.store.clone();
        while self.pending.try_join_next().is_some() {}
        self.pending.spawn(async move {
            let id = task.id;
            if let Err(err) = store.update(task).await {
                error!(id, %err, "failed to save task");
            }
        });
    }

    pub async fn settle(&mut self) {
        while let Some(result) = self.pending.join_next().await {
            if let Err(err) = result {
                error!(%err, "task save did not complete");
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditField {
    Title,
    DueDate,
    Priority,
    Category,
    Notes,
    Completed,
}

impl EditField {
    pub const ALL: [EditField; 6] = [
        EditField::Title,
        EditField::DueDate,
        EditField::Priority,
        EditField::Category,
        EditField::Notes,
        EditField::Completed,
    ];

    pub fn label(self) -> &'static str {
        match self {
            EditField::Title => "Title",
            EditField::DueDate => "Due Date",
            EditField::Priority => "Priority",
            EditField::Category => "Category",
            EditField::Notes => "Notes",
            EditField::Completed => "Completed",
        }
    }

    pub fn next(self) -> Self {
        let i = Self::ALL.iter().position(|f| *f == self).unwrap_or(0);
        Self::ALL[(i + 1) % Self::ALL.len()]
    }

    pub fn previous(self) -> Self {
        let i = Self::ALL.iter().position(|f| *f == self).unwrap_or(0);
        Self::ALL[(i + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

/// Editable copy of a task's fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditDraft {
    pub title: String,
    pub due_date: String,
    pub priority: Priority,
    pub category: String,
    pub notes: String,
    pub is_completed: bool,
}

impl EditDraft {
    pub fn from_task(task: &Task) -> Self {
        Self {
            title: task.title.clone(),
            due_date: task.due_date.clone(),
            priority: task.priority,
            category: task.category.clone(),
            notes: task.notes.clone(),
            is_completed: task.is_completed,
        }
    }

    pub fn is_modified(&self, task: &Task) -> bool {
        *self != Self::from_task(task)
    }

    pub fn can_save(&self, task: &Task) -> bool {
        self.is_modified(task) && !self.title.trim().is_empty()
    }

    /// `task` with the draft's fields; only the id is kept.
    pub fn apply(&self, task: &Task) -> Task {
        Task {
            id: task.id,
            is_completed: self.is_completed,
            title: self.title.clone(),
            due_date: self.due_date.clone(),
            priority: self.priority,
            category: self.category.clone(),
            notes: self.notes.clone(),
        }
    }

    pub fn text_mut(&mut self, field: EditField) -> Option<&mut String> {
        match field {
            EditField::Title => Some(&mut self.title),
            EditField::DueDate => Some(&mut self.due_date),
            EditField::Category => Some(&mut self.category),
            EditField::Notes => Some(&mut self.notes),
            EditField::Priority | EditField::Completed => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::SqliteTaskStore;

    fn stored() -> Task {
        Task {
            id: 7,
            is_completed: true,
            priority: Priority::Medium,
            category: "home".into(),
            ..Task::new("Water plants", "05.05.2026")
        }
    }

    #[test]
    fn draft_tracks_modification() {
        let task = stored();
        let mut draft = EditDraft::from_task(&task);
        assert!(!draft.is_modified(&task));
        assert!(!draft.can_save(&task));

        draft.notes.push_str("twice a week");
        assert!(draft.can_save(&task));

        draft.title = "  ".into();
        assert!(draft.is_modified(&task));
        assert!(!draft.can_save(&task));
    }

    #[test]
    fn apply_keeps_identity() {
        let task = stored();
        let mut draft = EditDraft::from_task(&task);
        draft.priority = Priority::High;
        draft.title = "Water all plants".into();

        let updated = draft.apply(&task);
        assert_eq!(updated.id, 7);
        assert!(updated.is_completed);
        assert_eq!(updated.priority, Priority::High);
        assert_eq!(updated.title, "Water all plants");
        assert_eq!(updated.category, "home");
    }

    #[test]
    fn fields_cycle() {
        assert_eq!(EditField::Notes.next(), EditField::Completed);
        assert_eq!(EditField::Completed.next(), EditField::Title);
        assert_eq!(EditField::Title.previous(), EditField::Completed);
        let mut draft = EditDraft::from_task(&stored());
        assert!(draft.text_mut(EditField::Priority).is_none());
        assert!(draft.text_mut(EditField::Completed).is_none());
        draft.text_mut(EditField::Category).unwrap().push('!');
        assert_eq!(draft.category, "home!");
    }

    #[tokio::test]
    async fn load_and_save_round_trip_through_store() {
        let store = SqliteTaskStore::open_in_memory().unwrap();
        let id = store.add(Task::new("Pay rent", "01.11.2026")).await.unwrap();

        let mut detail = TaskDetailModel::new(store.clone());
        let task = detail.load(id).await.unwrap().unwrap();
        assert_eq!(detail.task(), Some(task.clone()));

        let mut draft = EditDraft::from_task(&task);
        draft.notes = "before noon".into();
        detail.save(draft.apply(&task));
        assert_eq!(detail.task().unwrap().notes, "before noon");

        detail.settle().await;
        assert_eq!(
            store.get_by_id(id).await.unwrap().unwrap().notes,
            "before noon"
        );
    }

    #[test]
    fn completion_alone_counts_as_an_edit() {
        let task = stored();
        let mut draft = EditDraft::from_task(&task);
        draft.is_completed = false;
        assert!(draft.is_modified(&task));
        assert!(draft.can_save(&task));

        let reopened = draft.apply(&task);
        assert!(!reopened.is_completed);
        assert_eq!(reopened.title, task.title);
        assert_eq!(reopened.notes, task.notes);
    }

    #[tokio::test]
    async fn missing_task_loads_as_none() {
        let store = SqliteTaskStore::open_in_memory().unwrap();
        let detail = TaskDetailModel::new(store);
        assert_eq!(detail.load(42).await.unwrap(), None);
        assert_eq!(detail.task(), None);
    }
}
