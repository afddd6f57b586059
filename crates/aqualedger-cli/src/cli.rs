use std::path::PathBuf;

use aqualedger_core::models::{CatchId, InventoryStatus, OperationStatus, SyncStatus};
use aqualedger_core::sync::Resolution;
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "aqualedger")]
#[command(about = "Log catches offline and sync them when a connection is available")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Optional path to local database file
    #[arg(long, global = true, value_name = "PATH")]
    pub db_path: Option<PathBuf>,

    /// Optional path to sync settings JSON
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Record a catch
    #[command(alias = "new")]
    Add {
        /// Species name
        species: String,
        /// Weight in kilograms
        weight: f64,
    },
    /// Record a catch from free text, e.g. "20kg Tuna"
    Log {
        /// Catch description
        text: Vec<String>,
    },
    /// List catches
    List {
        /// Only catches in this sync status
        #[arg(long)]
        status: Option<SyncStatus>,
        /// Only catches in this inventory stage
        #[arg(long)]
        inventory: Option<InventoryStatus>,
        /// Number of catches to show
        #[arg(short, long)]
        limit: Option<usize>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one catch
    Show {
        /// Catch ID (`12` or `#12`)
        id: CatchId,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Move a catch to another inventory stage
    Transition {
        /// Catch ID (`12` or `#12`)
        id: CatchId,
        /// Target stage: caught, on_ice, listed, sold
        status: InventoryStatus,
        /// Skip the lifecycle check (audited)
        #[arg(long, requires = "reason")]
        force: bool,
        /// Why the lifecycle is being overridden
        #[arg(long, value_name = "TEXT")]
        reason: Option<String>,
    },
    /// Upload pending changes to the remote catalog
    Sync {
        #[command(subcommand)]
        command: Option<SyncCommands>,
        /// Keep syncing on the configured interval until interrupted
        #[arg(long)]
        watch: bool,
    },
    /// Inspect the outbound sync queue
    Queue {
        /// Only entries in this state
        #[arg(long)]
        status: Option<OperationStatus>,
        /// Number of entries to show
        #[arg(short, long, default_value = "20")]
        limit: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the overall sync badge and record counts
    Status {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: CompletionShell,
        /// Optional output path (stdout when omitted)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CompletionShell {
    Bash,
    Zsh,
    Fish,
}

#[derive(Subcommand)]
pub enum SyncCommands {
    /// Compare synced catches with the remote and flag conflicts
    Detect,
    /// List catches waiting for conflict resolution
    Conflicts {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Resolve a conflict by keeping one version
    Resolve {
        /// Catch ID (`12` or `#12`)
        id: CatchId,
        /// Version to keep: local or remote
        #[arg(long, value_name = "VERSION")]
        keep: Resolution,
    },
}
