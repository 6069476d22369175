//! Pull command implementation.

use super::{open_coordinator, print_conflict_help, CliError, Remote};
use std::path::Path;

/// Runs the pull command.
pub fn run(remote: &Remote, state_dir: &Path, db: &Path, force: bool) -> Result<(), CliError> {
    let coordinator = open_coordinator(remote, state_dir, db)?;
    println!(
        "Pulling {} into {}",
        coordinator.layout().dir(),
        db.display()
    );

    let outcome = coordinator.sync_down(force);
    if let Some(error) = outcome.error {
        println!("✗ Pull failed: {error}");
        if outcome.conflict.is_some() {
            print_conflict_help();
        }
        return Err(error.into());
    }

    match (&outcome.state, outcome.applied) {
        (None, _) => println!("✓ Nothing published yet"),
        (Some(state), true) => println!(
            "✓ Applied {} from {}",
            state.content_hash, state.writer_id
        ),
        (Some(_), false) => println!("✓ Already up to date"),
    }
    Ok(())
}
