//! Non-interactive subcommands.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::info;

use crate::config::ListArgs;
use crate::store::TaskStore;
use crate::task::Task;

pub fn format_task(task: &Task, mark_overdue: bool) -> String {
    let check = if task.is_completed { "x" } else { " " };
    let mut line = format!(
        "[{check}] #{} {} (Due: {}) {}",
        task.id, task.title, task.due_date, task.priority
    );
    if !task.category.is_empty() {
        line.push_str(&format!(" [{}]", task.category));
    }
    if mark_overdue && task.is_overdue() {
        line.push_str(" OVERDUE");
    }
    line
}

pub async fn list<S: TaskStore>(store: &S, args: &ListArgs, out: &mut impl Write) -> Result<()> {
    let filters = args.filters();
    let tasks = store.observe(filters.query()).first().await?;
    let labels = filters.active_labels();
    if !labels.is_empty() {
        writeln!(out, "Active filters: {}", labels.join(", "))?;
    }
    if tasks.is_empty() {
        writeln!(out, "No tasks")?;
    }
    for task in &tasks {
        writeln!(out, "{}", format_task(task, filters.overdue))?;
    }
    Ok(())
}

pub async fn export<S: TaskStore>(store: &S, pretty: bool, out: &mut impl Write) -> Result<()> {
    let tasks = store.all_tasks().first().await?;
    if pretty {
        serde_json::to_writer_pretty(&mut *out, &tasks)?;
    } else {
        serde_json::to_writer(&mut *out, &tasks)?;
    }
    writeln!(out)?;
    Ok(())
}

/// Adds every task in the file. Ids present in the file replace existing
/// rows; tasks without an id get a fresh one.
pub async fn import<S: TaskStore>(store: &S, path: &Path) -> Result<usize> {
    let data =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let tasks: Vec<Task> =
        serde_json::from_str(&data).with_context(|| format!("parsing {}", path.display()))?;
    let count = tasks.len();
    for task in tasks {
        store.add(task).await?;
    }
    info!(count, path = %path.display(), "imported tasks");
    Ok(count)
}
