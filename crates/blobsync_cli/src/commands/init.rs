//! Init command implementation.

use super::{read_writer_id, CliError, WRITER_ID_FILE};
use blobsync_engine::{SyncError, WriterId};
use std::fs;
use std::path::Path;

/// Runs the init command.
///
/// Idempotent: an existing writer id is kept and printed.
pub fn run(state_dir: &Path, requested: Option<&str>) -> Result<(), CliError> {
    let writer_id = init_state_dir(state_dir, requested)?;
    println!("State directory: {}", state_dir.display());
    println!("Writer id:       {writer_id}");
    Ok(())
}

fn init_state_dir(state_dir: &Path, requested: Option<&str>) -> Result<WriterId, CliError> {
    let requested = requested
        .map(|id| id.parse::<WriterId>().map_err(SyncError::from))
        .transpose()?;

    if state_dir.join(WRITER_ID_FILE).exists() {
        let existing = read_writer_id(state_dir)?;
        return match requested {
            Some(id) if id != existing => Err(CliError::AlreadyInitialized(existing)),
            _ => Ok(existing),
        };
    }

    fs::create_dir_all(state_dir)?;
    let writer_id = requested.unwrap_or_else(WriterId::generate);
    fs::write(state_dir.join(WRITER_ID_FILE), format!("{writer_id}\n"))?;
    Ok(writer_id)
}
