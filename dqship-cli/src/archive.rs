//! Packing the backup directory into a `.tar.gz`

use std::fs::File;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use flate2::write::GzEncoder;
use flate2::Compression;
use tracing::info;

/// Write a gzip-compressed tar of `dir` to `archive`.
///
/// Entries are named relative to the parent of `dir`, so the archive unpacks
/// into a single `<dir name>/` folder.
pub async fn create_archive(dir: &Path, archive: &Path) -> anyhow::Result<u64> {
    let dir: PathBuf = dir.to_path_buf();
    let archive: PathBuf = archive.to_path_buf();

    let size = tokio::task::spawn_blocking(move || write_archive(&dir, &archive))
        .await
        .context("archive task panicked")??;
    Ok(size)
}

fn write_archive(dir: &Path, archive: &Path) -> anyhow::Result<u64> {
    let name = dir
        .file_name()
        .ok_or_else(|| anyhow!("backup directory {} has no name", dir.display()))?;

    let file = File::create(archive)
        .with_context(|| format!("failed to create archive {}", archive.display()))?;
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));

    builder
        .append_dir_all(name, dir)
        .with_context(|| format!("failed to archive {}", dir.display()))?;

    let encoder = builder.into_inner().context("failed to finish tar stream")?;
    let file = encoder.finish().context("failed to finish gzip stream")?;
    let size = file.metadata()?.len();

    info!(archive = %archive.display(), size, "Archive created");
    Ok(size)
}
