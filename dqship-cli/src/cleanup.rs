//! Best-effort removal of temporary backup files

use std::io::ErrorKind;
use std::path::Path;

use tracing::{info, warn};

/// Remove every path in `paths`, files and directories alike.
///
/// Missing paths are skipped; other failures are logged and do not stop the
/// remaining removals. Returns how many paths were deleted.
pub async fn remove_all<P: AsRef<Path>>(paths: &[P]) -> usize {
    let mut removed = 0;
    for path in paths {
        let path = path.as_ref();
        match remove(path).await {
            Ok(true) => {
                info!(path = %path.display(), "Removed");
                removed += 1;
            }
            Ok(false) => {}
            Err(err) => warn!(path = %path.display(), error = %err, "Failed to remove"),
        }
    }
    removed
}

async fn remove(path: &Path) -> std::io::Result<bool> {
    let metadata = match tokio::fs::symlink_metadata(path).await {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(false),
        Err(err) => return Err(err),
    };

    if metadata.is_dir() {
        tokio::fs::remove_dir_all(path).await?;
    } else {
        tokio::fs::remove_file(path).await?;
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_removes_files_and_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("backup-00ff1");
        std::fs::create_dir_all(dir.join("inner")).unwrap();
        std::fs::write(dir.join("inner/db"), b"x").unwrap();
        let archive = tmp.path().join("backup.tar.gz");
        std::fs::write(&archive, b"gz").unwrap();

        let removed = remove_all(&[dir.clone(), archive.clone()]).await;

        assert_eq!(removed, 2);
        assert!(!dir.exists());
        assert!(!archive.exists());
    }

    #[tokio::test]
    async fn test_missing_paths_are_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let present = tmp.path().join("present");
        std::fs::write(&present, b"x").unwrap();

        let removed = remove_all(&[tmp.path().join("absent"), present.clone()]).await;

        assert_eq!(removed, 1);
        assert!(!present.exists());
    }
}
