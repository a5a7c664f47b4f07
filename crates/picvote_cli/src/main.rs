//! `picvote` command-line client.
//!
//! # Responsibility
//! - Parse arguments and load configuration.
//! - Start logging and open the local database before any command runs.
//! - Map failures to a non-zero exit code with a one-line message.

mod commands;

use clap::{Parser, Subcommand};
use picvote_core::{Category, CategoryFilter, SortOption};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "picvote", version, about = "Photo contest gallery with optimistic voting")]
struct Cli {
    /// JSON config file; environment variables still override it.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// List gallery entries.
    List {
        /// votes | newest | oldest
        #[arg(long, default_value = "votes")]
        sort: SortOption,
        /// all | Nature | Urban | Minimalist | Portrait | Cozy
        #[arg(long, default_value = "all")]
        category: CategoryFilter,
        /// Case-insensitive match on name or tags.
        #[arg(long)]
        search: Option<String>,
    },
    /// Cast or retract your vote on an entry.
    Vote { entry_id: String },
    /// Sign in and remember the session.
    Login {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Forget the stored session.
    Logout,
    /// Submit a new entry from an image file.
    Submit {
        #[arg(long)]
        image: PathBuf,
        #[arg(long)]
        name: Option<String>,
        #[arg(long = "tag")]
        tags: Vec<String>,
        #[arg(long)]
        category: Option<Category>,
        /// Skip AI suggestions for title, tags and category.
        #[arg(long)]
        no_analysis: bool,
    },
    /// Show your submissions and votes.
    Profile,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match commands::run(cli.config.as_deref(), cli.command).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            log::error!("event=cli_exit module=cli status=error error={}", err);
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
