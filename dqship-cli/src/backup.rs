//! Running the external migrator that snapshots dqlite to a directory

use std::path::Path;
use std::process::{ExitStatus, Stdio};

use anyhow::{bail, Context};
use dqship_client::CancellationToken;
use tokio::process::Command;
use tracing::{info, warn};

/// Arguments for a backup run of the migrator
pub fn migrator_args(kine_endpoint: &str, db_dir: &Path, debug: bool) -> Vec<String> {
    let mut args = vec![
        "--endpoint".to_string(),
        kine_endpoint.to_string(),
        "--mode".to_string(),
        "backup-dqlite".to_string(),
        "--db-dir".to_string(),
        db_dir.display().to_string(),
    ];
    if debug {
        args.push("--debug".to_string());
    }
    args
}

/// Run the migrator to completion with inherited stdio.
///
/// A non-zero exit fails the run. Cancellation kills the child.
pub async fn run_migrator(
    migrator: &Path,
    kine_endpoint: &str,
    db_dir: &Path,
    debug: bool,
    cancel: &CancellationToken,
) -> anyhow::Result<()> {
    let args = migrator_args(kine_endpoint, db_dir, debug);
    info!(migrator = %migrator.display(), args = ?args, "Starting dqlite backup");

    let mut child = Command::new(migrator)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .kill_on_drop(true)
        .spawn()
        .with_context(|| format!("failed to start migrator {}", migrator.display()))?;

    let status: ExitStatus = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            warn!("Stopping migrator");
            if let Err(err) = child.kill().await {
                warn!(error = %err, "Failed to kill migrator");
            }
            bail!("backup interrupted");
        }
        status = child.wait() => status.context("failed to wait for migrator")?,
    };

    if !status.success() {
        bail!("migrator exited with {}", status);
    }

    info!(db_dir = %db_dir.display(), "Backup finished");
    Ok(())
}
