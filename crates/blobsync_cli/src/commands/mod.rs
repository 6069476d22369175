//! CLI command implementations.

pub mod init;
pub mod pull;
pub mod push;
pub mod status;
pub mod unlock;

use blobsync_engine::{
    FileBlob, FileStateStore, ReqwestClient, SyncConfig, SyncCoordinator, SyncError, WriterId,
    DEFAULT_SYNC_ROOT,
};
use clap::Args;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// File inside the state directory holding this installation's writer id.
pub const WRITER_ID_FILE: &str = "writer-id";

/// Coordinator used by every command that touches the database file.
pub type CliCoordinator = SyncCoordinator<ReqwestClient, FileBlob, FileStateStore>;

/// Errors reported by CLI commands.
#[derive(Error, Debug)]
pub enum CliError {
    /// `init` was never run for this state directory.
    #[error("no writer id in {0}; run `blobsync init` first")]
    NotInitialized(PathBuf),

    /// `init` was asked for a different id than the one on disk.
    #[error("state directory already belongs to writer {0}")]
    AlreadyInitialized(WriterId),

    /// A remote setting is missing from both flags and environment.
    #[error("{0} is not set (flag --{1} or env {2})")]
    MissingSetting(&'static str, &'static str, &'static str),

    /// Unknown `--format` value.
    #[error("unknown output format: {0}")]
    UnknownFormat(String),

    /// Sync engine failure.
    #[error(transparent)]
    Sync(#[from] SyncError),

    /// Local I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Remote connection settings shared by every command.
#[derive(Args, Debug)]
pub struct Remote {
    /// WebDAV base URL
    #[arg(global = true, long, env = "BLOBSYNC_URL")]
    pub url: Option<String>,

    /// WebDAV user
    #[arg(global = true, long, env = "BLOBSYNC_USER")]
    pub user: Option<String>,

    /// WebDAV password
    #[arg(global = true, long, env = "BLOBSYNC_PASS", hide_env_values = true)]
    pub password: Option<String>,

    /// Project id (one folder on the host)
    #[arg(global = true, long, env = "BLOBSYNC_PROJECT")]
    pub project: Option<String>,

    /// Folder on the host holding all projects
    #[arg(global = true, long, env = "BLOBSYNC_ROOT", default_value = DEFAULT_SYNC_ROOT)]
    pub sync_root: String,

    /// Lock time-to-live in seconds
    #[arg(global = true, long, default_value_t = 60)]
    pub lock_ttl: u64,

    /// Request timeout in seconds
    #[arg(global = true, long, default_value_t = 30)]
    pub timeout: u64,
}

impl Remote {
    /// Builds and validates the sync configuration.
    pub fn config(&self) -> Result<SyncConfig, CliError> {
        let url = required(&self.url, "remote URL", "url", "BLOBSYNC_URL")?;
        let user = required(&self.user, "user", "user", "BLOBSYNC_USER")?;
        let password = required(&self.password, "password", "password", "BLOBSYNC_PASS")?;
        let project = required(&self.project, "project", "project", "BLOBSYNC_PROJECT")?;

        let config = SyncConfig::new(url, user, password, project)
            .with_sync_root(self.sync_root.clone())
            .with_lock_ttl(Duration::from_secs(self.lock_ttl))
            .with_timeout(Duration::from_secs(self.timeout));
        config.validate()?;
        Ok(config)
    }
}

fn required(
    value: &Option<String>,
    name: &'static str,
    flag: &'static str,
    env: &'static str,
) -> Result<String, CliError> {
    value
        .as_ref()
        .filter(|v| !v.trim().is_empty())
        .cloned()
        .ok_or(CliError::MissingSetting(name, flag, env))
}

/// Reads the writer id stored by `init`.
pub fn read_writer_id(state_dir: &Path) -> Result<WriterId, CliError> {
    let path = state_dir.join(WRITER_ID_FILE);
    let text = match fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(CliError::NotInitialized(state_dir.to_path_buf()))
        }
        Err(e) => return Err(e.into()),
    };
    text.parse::<WriterId>()
        .map_err(|e| CliError::Sync(SyncError::from(e)))
}

/// Opens the coordinator for the database file at `db`.
pub fn open_coordinator(
    remote: &Remote,
    state_dir: &Path,
    db: &Path,
) -> Result<CliCoordinator, CliError> {
    let config = remote.config()?;
    let writer_id = read_writer_id(state_dir)?;
    let store = FileStateStore::open(state_dir)?;
    let client = ReqwestClient::new(config.timeout)?;
    Ok(SyncCoordinator::new(
        config,
        writer_id,
        client,
        FileBlob::new(db),
        store,
    )?)
}

/// Prints the conflict resolution options.
pub fn print_conflict_help() {
    println!();
    println!("Both this installation and another one changed the data since the last sync.");
    println!("  keep local:  blobsync push --force");
    println!("  keep remote: blobsync pull --force");
}
