//! Unlock command implementation.

use super::{CliError, Remote};
use blobsync_engine::{LockManager, RemoteLock, ReqwestClient, SystemClock, WebDavTransport};
use std::sync::Arc;
use tracing::{info, warn};

/// Runs the unlock command.
///
/// Only needed when a writer crashed mid-push and waiting for the lock TTL
/// is not acceptable, or when the lock file is unreadable.
pub fn run(remote: &Remote) -> Result<(), CliError> {
    let config = remote.config()?;
    let layout = config.layout()?;
    let client = ReqwestClient::new(config.timeout)?;
    let transport = Arc::new(WebDavTransport::from_config(&config, client));
    let locks = LockManager::new(transport, Arc::new(SystemClock));

    match locks.inspect_lock(&layout) {
        Ok(Some(record)) => println!(
            "Removing lock held by {} (acquired at {}, ttl {} ms)",
            record.writer_id, record.acquired_at, record.ttl
        ),
        Ok(None) => {
            println!("No lock present at {}", layout.lock());
            return Ok(());
        }
        Err(e) => {
            warn!(error = %e, "lock marker unreadable");
            println!("Removing unreadable lock: {e}");
        }
    }

    locks.break_lock(&layout)?;
    info!(path = %layout.lock(), "lock broken by operator");
    println!("✓ Lock removed");
    Ok(())
}
