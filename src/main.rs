use std::io;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use todolist::commands;
use todolist::config::{Cli, Command};
use todolist::store::SqliteTaskStore;
use todolist::ui;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    cli.init_tracing()?;

    let db_path = cli.database_path();
    info!(db = %db_path.display(), "starting");
    let store = SqliteTaskStore::open(&db_path)
        .with_context(|| format!("opening task database {}", db_path.display()))?;

    match cli.command.unwrap_or(Command::Ui) {
        Command::Ui => ui::run(store).await?,
        Command::List(args) => commands::list(&store, &args, &mut io::stdout().lock()).await?,
        Command::Export { pretty } => {
            commands::export(&store, pretty, &mut io::stdout().lock()).await?
        }
        Command::Import { path } => {
            let count = commands::import(&store, &path).await?;
            println!("Imported {count} tasks");
        }
    }
    Ok(())
}
