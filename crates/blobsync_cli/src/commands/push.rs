//! Push command implementation.

use super::{open_coordinator, print_conflict_help, CliError, Remote};
use std::path::Path;

/// Runs the push command.
pub fn run(remote: &Remote, state_dir: &Path, db: &Path, force: bool) -> Result<(), CliError> {
    let coordinator = open_coordinator(remote, state_dir, db)?;
    println!(
        "Pushing {} to {}",
        db.display(),
        coordinator.layout().dir()
    );

    let outcome = coordinator.sync_up(force);
    if let Some(error) = outcome.error {
        println!("✗ Push failed: {error}");
        if outcome.conflict.is_some() {
            print_conflict_help();
        }
        return Err(error.into());
    }

    if let Some(state) = outcome.state {
        println!("✓ Published {}", state.content_hash);
    }
    Ok(())
}
