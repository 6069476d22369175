//! blobsync CLI
//!
//! Pushes and pulls a single database file to and from a WebDAV folder.
//!
//! # Commands
//!
//! - `init` - Create the local state directory and writer id
//! - `push` - Publish the local database file
//! - `pull` - Fetch the published database file
//! - `status` - Compare local and remote without changing either
//! - `unlock` - Remove a stale remote lock

mod commands;

use clap::{Parser, Subcommand};
use commands::Remote;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Single-file WebDAV sync.
#[derive(Parser)]
#[command(name = "blobsync")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the database file
    #[arg(global = true, short, long, env = "BLOBSYNC_DB")]
    db: Option<PathBuf>,

    /// Directory holding the writer id and tracked state
    #[arg(
        global = true,
        short,
        long,
        env = "BLOBSYNC_STATE_DIR",
        default_value = ".blobsync"
    )]
    state_dir: PathBuf,

    #[command(flatten)]
    remote: Remote,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the state directory and this installation's writer id
    Init {
        /// Use this writer id instead of generating one
        #[arg(long)]
        writer_id: Option<String>,
    },

    /// Publish the local database file
    Push {
        /// Overwrite the remote even if it diverged
        #[arg(short, long)]
        force: bool,
    },

    /// Fetch the published database file
    Pull {
        /// Replace the local file even if it has unpushed changes
        #[arg(short, long)]
        force: bool,
    },

    /// Compare local and remote state
    Status {
        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Remove the remote lock regardless of its holder
    Unlock,

    /// Show version information
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Init { writer_id } => {
            commands::init::run(&cli.state_dir, writer_id.as_deref())?;
        }
        Commands::Push { force } => {
            let db = cli.db.ok_or("Database path required for push")?;
            commands::push::run(&cli.remote, &cli.state_dir, &db, force)?;
        }
        Commands::Pull { force } => {
            let db = cli.db.ok_or("Database path required for pull")?;
            commands::pull::run(&cli.remote, &cli.state_dir, &db, force)?;
        }
        Commands::Status { format } => {
            let db = cli.db.ok_or("Database path required for status")?;
            commands::status::run(&cli.remote, &cli.state_dir, &db, &format)?;
        }
        Commands::Unlock => {
            commands::unlock::run(&cli.remote)?;
        }
        Commands::Version => {
            println!("blobsync CLI v{}", env!("CARGO_PKG_VERSION"));
        }
    }

    Ok(())
}
