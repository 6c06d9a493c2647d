use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::filter::TaskFilters;
use crate::task::Priority;

pub const DATABASE_NAME: &str = "tasks_db.sqlite3";
pub const LOG_FILE_NAME: &str = "todolist.log";

#[derive(Debug, Parser)]
#[command(name = "todolist", version, about = "Terminal to-do list")]
pub struct Cli {
    /// SQLite database file
    #[arg(long, env = "TODOLIST_DB", global = true)]
    pub db: Option<PathBuf>,

    /// Log filter, e.g. `info` or `todolist=debug`
    #[arg(long, env = "TODOLIST_LOG", default_value = "info", global = true)]
    pub log: String,

    /// Where the interactive UI writes its log
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Open the interactive task list (default)
    Ui,
    /// Print tasks matching the given filters
    List(ListArgs),
    /// Write all tasks to stdout as JSON
    Export {
        #[arg(long)]
        pretty: bool,
    },
    /// Add tasks from a JSON file produced by `export`
    Import { path: PathBuf },
}

#[derive(Debug, Default, Args)]
pub struct ListArgs {
    #[arg(long, conflicts_with = "pending")]
    pub completed: bool,
    #[arg(long)]
    pub pending: bool,
    /// LOW, MEDIUM or HIGH
    #[arg(long)]
    pub priority: Option<Priority>,
    #[arg(long)]
    pub search: Option<String>,
    /// Mark tasks whose due date has passed
    #[arg(long)]
    pub overdue: bool,
}

impl ListArgs {
    pub fn filters(&self) -> TaskFilters {
        let completed = match (self.completed, self.pending) {
            (true, _) => Some(true),
            (_, true) => Some(false),
            _ => None,
        };
        TaskFilters {
            completed,
            priority: self.priority,
            search: self.search.clone().unwrap_or_default(),
            overdue: self.overdue,
        }
    }
}

fn data_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "todolist").map(|dirs| dirs.data_dir().to_path_buf())
}

impl Cli {
    pub fn database_path(&self) -> PathBuf {
        self.db.clone().unwrap_or_else(|| {
            data_dir()
                .map(|dir| dir.join(DATABASE_NAME))
                .unwrap_or_else(|| PathBuf::from(DATABASE_NAME))
        })
    }

    pub fn log_path(&self) -> PathBuf {
        self.log_file.clone().unwrap_or_else(|| {
            data_dir()
                .map(|dir| dir.join(LOG_FILE_NAME))
                .unwrap_or_else(|| PathBuf::from(LOG_FILE_NAME))
        })
    }

    pub fn is_interactive(&self) -> bool {
        matches!(self.command, None | Some(Command::Ui))
    }

    /// The UI owns the terminal, so it logs to a file; commands log to stderr.
    pub fn init_tracing(&self) -> Result<()> {
        let filter = EnvFilter::try_new(&self.log)
            .with_context(|| format!("invalid log filter `{}`", self.log))?;
        let builder = tracing_subscriber::fmt().with_env_filter(filter);

        let result = if self.is_interactive() {
            let path = self.log_path();
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("opening log file {}", path.display()))?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        } else {
            builder.with_writer(std::io::stderr).try_init()
        };
        result.map_err(|e| anyhow::anyhow!("failed to initialize tracing subscriber: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_flags_map_to_filters() {
        let cli = Cli::try_parse_from([
            "todolist", "list", "--pending", "--priority", "HIGH", "--overdue",
        ])
        .unwrap();
        let Some(Command::List(args)) = cli.command else {
            panic!("expected list command");
        };
        let filters = args.filters();
        assert_eq!(filters.completed, Some(false));
        assert_eq!(filters.priority, Some(Priority::High));
        assert!(filters.overdue);
        assert!(filters.search.is_empty());
    }

    #[test]
    fn completed_and_pending_conflict() {
        assert!(Cli::try_parse_from(["todolist", "list", "--completed", "--pending"]).is_err());
    }

    #[test]
    fn explicit_db_wins() {
        let cli = Cli::try_parse_from(["todolist", "--db", "/tmp/t.sqlite3"]).unwrap();
        assert_eq!(cli.database_path(), PathBuf::from("/tmp/t.sqlite3"));
        assert!(cli.is_interactive());
    }
}
