//! Status command implementation.

use super::{open_coordinator, CliError, Remote};
use blobsync_engine::{Clock, SyncState, SyncStatus, SystemClock};
use std::path::Path;

/// Runs the status command.
pub fn run(remote: &Remote, state_dir: &Path, db: &Path, format: &str) -> Result<(), CliError> {
    let coordinator = open_coordinator(remote, state_dir, db)?;
    let status = coordinator.status()?;

    match format {
        "json" => {
            let json = serde_json::to_string_pretty(&status)
                .map_err(|e| CliError::Io(e.into()))?;
            println!("{json}");
        }
        "text" => print_text(&status, coordinator.layout().dir(), SystemClock.now_ms()),
        other => return Err(CliError::UnknownFormat(other.to_string())),
    }
    Ok(())
}

fn print_text(status: &SyncStatus, remote_dir: String, now_ms: u64) {
    println!("Remote:    {remote_dir}");
    println!("Published: {}", describe(status.remote_state.as_ref()));
    println!("Tracked:   {}", describe(status.local_state.as_ref()));
    println!(
        "Local:     {}",
        status.live_hash.as_deref().unwrap_or("(no local file)")
    );
    match &status.lock {
        Some(lock) if lock.is_expired(now_ms) => {
            println!("Lock:      expired lock of {}", lock.writer_id)
        }
        Some(lock) => println!(
            "Lock:      held by {} for {} more ms",
            lock.writer_id,
            lock.expires_at().saturating_sub(now_ms)
        ),
        None => println!("Lock:      none"),
    }
    println!();
    println!("Direction: {}", status.direction);
}

fn describe(state: Option<&SyncState>) -> String {
    match state {
        Some(s) => format!("{} by {} at {}", s.content_hash, s.writer_id, s.last_modified),
        None => "(none)".to_string(),
    }
}
