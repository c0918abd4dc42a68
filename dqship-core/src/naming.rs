//! Object key derivation for backup archives

use chrono::{Datelike, NaiveDateTime, Timelike};

use crate::{ObjectKey, Result};

/// Extension every backup object carries
pub const ARCHIVE_EXTENSION: &str = ".tar.gz";

/// Default archive name, stamped with day-month-year-hour-minute-second
pub fn default_backup_file_name(now: NaiveDateTime) -> String {
    format!(
        "dqlite-backup-{}-{}-{}-{}-{}-{}{}",
        now.day(),
        now.month(),
        now.year(),
        now.hour(),
        now.minute(),
        now.second(),
        ARCHIVE_EXTENSION
    )
}

/// Resolve the object key for a backup.
///
/// Leading `/` characters are dropped. A key naming a "directory" (trailing `/`) gets
/// the default archive name appended. Any other extension on the last segment
/// is replaced with `.tar.gz`.
pub fn resolve_object_key(raw: Option<&str>, now: NaiveDateTime) -> Result<ObjectKey> {
    let default_name = default_backup_file_name(now);

    let mut key = match raw {
        Some(raw) => raw.trim_start_matches('/').to_string(),
        None => return ObjectKey::new(&default_name),
    };

    if key.is_empty() || key.ends_with('/') {
        key.push_str(&default_name);
    }

    if !key.ends_with(ARCHIVE_EXTENSION) {
        key = replace_extension(&key, ARCHIVE_EXTENSION);
    }

    ObjectKey::new(&key)
}

/// Name of the local directory the backup is written to before archiving
pub fn archive_stem(key: &ObjectKey) -> &str {
    let name = key.file_name();
    name.strip_suffix(ARCHIVE_EXTENSION).unwrap_or(name)
}

fn replace_extension(key: &str, extension: &str) -> String {
    let segment_start = key.rfind('/').map(|i| i + 1).unwrap_or(0);
    let segment = &key[segment_start..];

    // A leading dot marks a hidden file, not an extension
    let stem_len = match segment.rfind('.') {
        Some(dot) if dot > 0 => dot,
        _ => segment.len(),
    };

    format!("{}{}", &key[..segment_start + stem_len], extension)
}
