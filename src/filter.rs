use crate::task::{Priority, Task};

/// One of the reads the store can serve reactively.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskQuery {
    All,
    Completed,
    Pending,
    ByPriority(Priority),
    Search(String),
}

impl TaskQuery {
    /// In-process equivalent of the store's query. Search follows SQLite
    /// `LIKE '%' || q || '%'`: ASCII case-insensitive, with `%` and `_` in the
    /// query acting as wildcards.
    pub fn matches(&self, task: &Task) -> bool {
        match self {
            Self::All => true,
            Self::Completed => task.is_completed,
            Self::Pending => !task.is_completed,
            Self::ByPriority(priority) => task.priority == *priority,
            Self::Search(query) => like_contains(&task.title, query),
        }
    }
}

fn like_contains(text: &str, pattern: &str) -> bool {
    let text: Vec<char> = text.chars().map(|c| c.to_ascii_lowercase()).collect();
    let pattern: Vec<char> = pattern.chars().map(|c| c.to_ascii_lowercase()).collect();
    (0..=text.len()).any(|start| like_prefix(&text[start..], &pattern))
}

/// Whether `pattern` matches some prefix of `text`.
fn like_prefix(text: &[char], pattern: &[char]) -> bool {
    match pattern.split_first() {
        None => true,
        Some(('%', rest)) => (0..=text.len()).any(|i| like_prefix(&text[i..], rest)),
        Some(('_', rest)) => !text.is_empty() && like_prefix(&text[1..], rest),
        Some((c, rest)) => text.first() == Some(c) && like_prefix(&text[1..], rest),
    }
}

/// Filter selection of the task list screen.
///
/// The fields are independent, but only one of search, completion and
/// priority drives the store query at a time; see [`TaskFilters::query`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskFilters {
    pub completed: Option<bool>,
    pub priority: Option<Priority>,
    pub search: String,
    pub overdue: bool,
}

impl TaskFilters {
    pub fn search_query(&self) -> Option<&str> {
        (!self.search.trim().is_empty()).then_some(self.search.as_str())
    }

    /// Search wins over completion, completion wins over priority. The
    /// criteria are not combined.
    pub fn query(&self) -> TaskQuery {
        if let Some(query) = self.search_query() {
            return TaskQuery::Search(query.to_string());
        }
        match (self.completed, self.priority) {
            (Some(true), _) => TaskQuery::Completed,
            (Some(false), _) => TaskQuery::Pending,
            (None, Some(priority)) => TaskQuery::ByPriority(priority),
            (None, None) => TaskQuery::All,
        }
    }

    pub fn is_active(&self) -> bool {
        self.completed.is_some()
            || self.priority.is_some()
            || self.search_query().is_some()
            || self.overdue
    }

    pub fn active_labels(&self) -> Vec<String> {
        let mut labels = Vec::new();
        match self.completed {
            Some(true) => labels.push("Completed".to_string()),
            Some(false) => labels.push("Pending".to_string()),
            None => {}
        }
        if let Some(priority) = self.priority {
            labels.push(format!("Priority: {priority}"));
        }
        if let Some(query) = self.search_query() {
            labels.push(format!("Search: \"{query}\""));
        }
        if self.overdue {
            labels.push("Overdue".to_string());
        }
        labels
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
