//! The backup pipeline: migrator, archive, upload

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use dqship_client::{CancellationToken, MultipartStore, Uploader};
use dqship_core::naming::archive_stem;
use dqship_core::{ObjectKey, UploadReport};
use rand::Rng;
use tracing::info;

use crate::archive::create_archive;
use crate::backup::run_migrator;
use crate::cleanup::remove_all;
use crate::config::Config;

/// Temporary locations used by one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkPaths {
    /// Directory the migrator writes the backup into
    pub backup_dir: PathBuf,
    pub archive: PathBuf,
}

impl WorkPaths {
    /// `<root>/<key file name>` for the archive and
    /// `<root>/<stem>-<5 hex chars>` for the backup directory
    pub fn new(root: &Path, key: &ObjectKey) -> Self {
        let suffix = rand::thread_rng().gen_range(0..=0xfffffu32);
        WorkPaths {
            backup_dir: root.join(format!("{}-{:05x}", archive_stem(key), suffix)),
            archive: root.join(key.file_name()),
        }
    }

    pub fn all(&self) -> [&Path; 2] {
        [self.backup_dir.as_path(), self.archive.as_path()]
    }
}

/// Take a backup and upload it. Does not clean up `paths`.
pub async fn run_backup<S: MultipartStore>(
    config: &Config,
    uploader: &Uploader<S>,
    paths: &WorkPaths,
    cancel: &CancellationToken,
) -> anyhow::Result<UploadReport> {
    config.check_inputs()?;

    run_migrator(
        &config.migrator_path,
        &config.kine_endpoint(),
        &paths.backup_dir,
        config.debug,
        cancel,
    )
    .await?;

    if cancel.is_cancelled() {
        bail!("backup interrupted");
    }

    let size = create_archive(&paths.backup_dir, &paths.archive).await?;
    info!(
        archive = %paths.archive.display(),
        size,
        destination = %config.destination,
        "Uploading backup"
    );

    let report = uploader
        .upload_file(config.destination.clone(), &paths.archive, cancel)
        .await
        .with_context(|| format!("failed to upload backup to {}", config.destination))?;

    Ok(report)
}

/// Run the backup, then remove the temporary paths whatever the outcome
pub async fn run_and_clean_up<S: MultipartStore>(
    config: &Config,
    uploader: &Uploader<S>,
    paths: &WorkPaths,
    cancel: &CancellationToken,
) -> anyhow::Result<UploadReport> {
    let outcome = run_backup(config, uploader, paths, cancel)
        .await
        .context("backup failed");

    let removed = remove_all(&paths.all()).await;
    info!(removed, "Temporary files cleaned up");
    outcome
}
