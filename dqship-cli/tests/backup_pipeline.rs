//! Pipeline runs against a scripted migrator and the in-memory store
#![cfg(unix)]

use std::collections::HashMap;
use std::io::Read;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::NaiveDate;
use dqship_cli::cli::Tuning;
use dqship_cli::{run_and_clean_up, run_backup, Config, WorkPaths};
use dqship_client::testing::MemoryStore;
use dqship_client::{CancellationToken, Uploader};
use flate2::read::GzDecoder;

const WRITES_BACKUP: &str = r#"#!/bin/sh
while [ $# -gt 0 ]; do
  case "$1" in
    --db-dir) dir="$2"; shift ;;
  esac
  shift
done
mkdir -p "$dir" && printf 'dqlite pages' > "$dir/db.bin"
"#;

const FAILS_AFTER_WRITING: &str = r#"#!/bin/sh
while [ $# -gt 0 ]; do
  case "$1" in
    --db-dir) dir="$2"; shift ;;
  esac
  shift
done
mkdir -p "$dir" && printf 'partial' > "$dir/db.bin"
exit 3
"#;

const HANGS_AFTER_WRITING: &str = r#"#!/bin/sh
while [ $# -gt 0 ]; do
  case "$1" in
    --db-dir) dir="$2"; shift ;;
  esac
  shift
done
mkdir -p "$dir" && printf 'partial' > "$dir/db.bin"
exec sleep 30
"#;

fn write_script(path: &Path, body: &str) {
    std::fs::write(path, body).unwrap();
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
}

fn load_config(socket: &Path, migrator: &Path) -> Config {
    let env: HashMap<&str, String> = [
        ("AWS_REGION", "eu-west-1".to_string()),
        ("KINE_ENDPOINT", format!("unix://{}:12379", socket.display())),
        ("BUCKET", "backups".to_string()),
        ("KEY", "prod/nightly".to_string()),
        ("MIGRATOR_PATH", migrator.display().to_string()),
    ]
    .into_iter()
    .collect();

    let now = NaiveDate::from_ymd_opt(2024, 1, 2)
        .unwrap()
        .and_hms_opt(3, 4, 5)
        .unwrap();
    Config::from_lookup(|name| env.get(name).cloned(), now, &Tuning::default()).unwrap()
}

// All scripts are written before anything is spawned, one test per binary
#[tokio::test]
async fn backup_cleans_up_after_success_failure_and_cancellation() {
    let tmp = tempfile::tempdir().unwrap();
    let socket = tmp.path().join("kine.sock");
    std::fs::write(&socket, b"").unwrap();
    let good = tmp.path().join("migrator");
    let broken = tmp.path().join("broken-migrator");
    let hanging = tmp.path().join("hanging-migrator");
    write_script(&good, WRITES_BACKUP);
    write_script(&broken, FAILS_AFTER_WRITING);
    write_script(&hanging, HANGS_AFTER_WRITING);

    let work = tmp.path().join("work");
    std::fs::create_dir(&work).unwrap();

    // Successful run
    let config = load_config(&socket, &good);
    assert_eq!(config.destination.key.as_str(), "prod/nightly.tar.gz");

    let uploader = Uploader::new(MemoryStore::new(), config.upload.clone());
    let paths = WorkPaths::new(&work, &config.destination.key);
    assert_eq!(paths.archive, work.join("nightly.tar.gz"));

    let report = run_and_clean_up(&config, &uploader, &paths, &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.parts, 1);
    assert_eq!(report.object.key.as_str(), "prod/nightly.tar.gz");
    assert!(!paths.backup_dir.exists());
    assert!(!paths.archive.exists());

    let object = uploader.store().object(&config.destination).unwrap();
    assert_eq!(object.len() as u64, report.total_bytes);

    let dir_name = paths.backup_dir.file_name().unwrap().to_owned();
    let mut archive = tar::Archive::new(GzDecoder::new(object.as_slice()));
    let mut found = false;
    for entry in archive.entries().unwrap() {
        let mut entry = entry.unwrap();
        let path = entry.path().unwrap().into_owned();
        if path == PathBuf::from(&dir_name).join("db.bin") {
            let mut body = String::new();
            entry.read_to_string(&mut body).unwrap();
            assert_eq!(body, "dqlite pages");
            found = true;
        }
    }
    assert!(found);

    // Migrator failure stops the run before anything is uploaded, and its
    // partial output is removed
    let config = load_config(&socket, &broken);
    let uploader = Uploader::new(MemoryStore::new(), config.upload.clone());
    let paths = WorkPaths::new(&work, &config.destination.key);

    let err = run_and_clean_up(&config, &uploader, &paths, &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(format!("{:#}", err).contains("migrator exited"));
    assert!(uploader.store().calls().is_empty());
    assert!(!paths.backup_dir.exists());
    assert!(!paths.archive.exists());

    // Interrupt while the migrator is still running
    let config = load_config(&socket, &hanging);
    let uploader = Uploader::new(MemoryStore::new(), config.upload.clone());
    let paths = WorkPaths::new(&work, &config.destination.key);
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    let written = paths.backup_dir.join("db.bin");
    tokio::spawn(async move {
        while !written.exists() {
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        trigger.cancel();
    });

    let err = run_and_clean_up(&config, &uploader, &paths, &cancel)
        .await
        .unwrap_err();
    assert!(format!("{:#}", err).contains("interrupted"));
    assert!(uploader.store().calls().is_empty());
    assert!(!paths.backup_dir.exists());
    assert!(!paths.archive.exists());

    assert_eq!(std::fs::read_dir(&work).unwrap().count(), 0);
}

#[tokio::test]
async fn missing_socket_fails_before_running_anything() {
    let tmp = tempfile::tempdir().unwrap();
    let config = load_config(&tmp.path().join("absent.sock"), Path::new("/bin/sh"));
    let uploader = Uploader::new(MemoryStore::new(), config.upload.clone());
    let paths = WorkPaths::new(tmp.path(), &config.destination.key);

    let err = run_backup(&config, &uploader, &paths, &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(err.to_string().contains("can not be found"));
    assert!(uploader.store().calls().is_empty());
    assert!(!paths.backup_dir.exists());
}
