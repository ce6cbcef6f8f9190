//! Task list
//!
//! A small task manager storing its data with recordkit.
//!
//! # Commands
//!
//! - `list` - Show tasks, optionally for one group
//! - `add` - Add a task
//! - `done` / `undone` - Mark a task done or open again
//! - `edit` - Change a task's text
//! - `remove` - Delete a task
//! - `groups` / `add-group` - Show or add task groups
//!
//! The database name and version come from `RECORDKIT_DB_NAME` and
//! `RECORDKIT_DB_VERSION` when set.

mod commands;
mod model;

use clap::{Parser, Subcommand};
use commands::{groups, todos, Output};
use recordkit_core::Store;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Manage a task list.
#[derive(Parser)]
#[command(name = "todo")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory holding the task database
    #[arg(global = true, short, long, default_value = ".recordkit")]
    path: PathBuf,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    /// Print results as JSON
    #[arg(global = true, long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show tasks
    List {
        /// Only tasks in the group with this key
        #[arg(short, long)]
        group: Option<u64>,
    },

    /// Add a task
    Add {
        /// Task text
        text: String,

        /// Key of the group to add it to
        #[arg(short, long)]
        group: Option<u64>,
    },

    /// Mark a task done
    Done {
        /// Task id
        id: String,
    },

    /// Mark a task not done
    Undone {
        /// Task id
        id: String,
    },

    /// Change a task's text
    Edit {
        /// Task id
        id: String,

        /// New text
        text: String,
    },

    /// Delete a task
    Remove {
        /// Task id
        id: String,
    },

    /// Show groups
    Groups,

    /// Add a group
    AddGroup {
        /// Group name
        name: String,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let store = Store::open(&cli.path, model::schema())?;
    let output = if cli.json { Output::Json } else { Output::Text };

    let printed = match cli.command {
        Commands::List { group } => todos::list(&store, group, output).await?,
        Commands::Add { text, group } => todos::add(&store, &text, group, output).await?,
        Commands::Done { id } => todos::set_done(&store, &id, true, output).await?,
        Commands::Undone { id } => todos::set_done(&store, &id, false, output).await?,
        Commands::Edit { id, text } => todos::edit(&store, &id, &text, output).await?,
        Commands::Remove { id } => todos::remove(&store, &id, output).await?,
        Commands::Groups => groups::list(&store, output).await?,
        Commands::AddGroup { name } => groups::add(&store, &name, output).await?,
    };
    println!("{printed}");

    Ok(())
}
