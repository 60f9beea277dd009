//! CLI module for biograph-migrate.
//!
//! Subcommands:
//! - `init`: Create or upgrade the target schema
//! - `users`: Migrate one batch of legacy users
//! - `content`: Migrate one batch of each legacy content collection
//! - `status`: Show schema version and row counts

mod confirm;
mod content;
mod init;
mod session;
mod status;
mod users;

use std::str::FromStr;

use clap::{Args, Parser, Subcommand};

use crate::config::MigrationConfig;
use crate::models::ContentKind;
use crate::services::BatchOptions;

pub use confirm::confirm_live_run;

/// biograph-migrate - legacy BioGraph to Postgres migration
#[derive(Parser)]
#[command(name = "biograph-migrate")]
#[command(about = "Batch migration of legacy BioGraph users and content into Postgres")]
#[command(version)]
pub struct App {
    /// Run in verbose mode
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create or upgrade the target schema
    Init,

    /// Migrate a batch of active legacy users
    Users(RunArgs),

    /// Migrate a batch of legacy content (requires migrated users)
    Content {
        /// Collection to migrate: biographs, books, notifications,
        /// recorded_times, subscriptions or all
        #[arg(long, default_value = "all")]
        kind: KindSelection,

        #[command(flatten)]
        run: RunArgs,
    },

    /// Show schema version and migrated row counts
    Status,
}

/// Flags shared by the batch commands.
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Report what would be migrated without writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Records to fetch (defaults to `migration.batch_size`)
    #[arg(long)]
    pub batch_size: Option<u64>,

    /// Number of matching legacy records to skip
    #[arg(long, default_value_t = 0)]
    pub start_from: u64,

    /// Skip the confirmation prompt for live runs
    #[arg(short = 'y', long)]
    pub yes: bool,
}

impl RunArgs {
    pub fn batch_options(&self, config: &MigrationConfig) -> BatchOptions {
        BatchOptions {
            start_offset: self.start_from,
            batch_size: self.batch_size.unwrap_or(config.batch_size),
            dry_run: self.dry_run,
        }
    }
}

/// Content collections selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindSelection {
    All,
    One(ContentKind),
}

impl KindSelection {
    pub fn kinds(&self) -> Vec<ContentKind> {
        match self {
            KindSelection::All => ContentKind::all().to_vec(),
            KindSelection::One(kind) => vec![*kind],
        }
    }
}

impl FromStr for KindSelection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("all") {
            return Ok(KindSelection::All);
        }
        s.parse().map(KindSelection::One)
    }
}

impl App {
    /// Run the CLI application.
    pub async fn run(self) -> color_eyre::Result<()> {
        match &self.command {
            Command::Init => self.run_init().await,
            Command::Users(run) => self.run_users(run).await,
            Command::Content { kind, run } => self.run_content(kind, run).await,
            Command::Status => self.run_status().await,
        }
    }
}
