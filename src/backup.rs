use crate::Result;
use chrono::{DateTime, Local, NaiveDateTime};
use log::info;
use std::{
    fs,
    path::{Path, PathBuf},
};

/// Timestamp inserted into backup file names
pub const BACKUP_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// `report.html` becomes `report.<timestamp>.html`, files without extension get the timestamp
/// appended.
pub fn backup_path(path: &Path, modified: DateTime<Local>) -> PathBuf {
    let timestamp = modified.format(BACKUP_TIMESTAMP_FORMAT);
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let backup_name = match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => format!("{}.{}.{}", stem, timestamp, ext),
        _ => format!("{}.{}", file_name, timestamp),
    };
    path.with_file_name(backup_name)
}

/// Renames an existing file to its timestamped backup name using its modification time.
/// Returns the backup path, or `None` when there was nothing to back up.
pub fn backup_existing(path: &Path) -> Result<Option<PathBuf>> {
    if !path.exists() {
        return Ok(None);
    }
    let modified: DateTime<Local> = fs::metadata(path)?.modified()?.into();
    let base = backup_path(path, modified);
    let name = base
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut target = base.clone();
    let mut n = 1;
    while target.exists() {
        target = base.with_file_name(match name.rsplit_once('.') {
            Some((stem, ext)) => format!("{}-{}.{}", stem, n, ext),
            None => format!("{}-{}", name, n),
        });
        n += 1;
    }
    fs::rename(path, &target)?;
    info!("Backed up {} to {}", path.display(), target.display());
    Ok(Some(target))
}

/// Backs up `path` if present, then writes `contents` to it
pub fn write_with_backup(path: &Path, contents: &str) -> Result<Option<PathBuf>> {
    let backup = backup_existing(path)?;
    fs::write(path, contents)?;
    Ok(backup)
}

/// Timestamp part of a backup file name of `base` (e.g. `GENOME_ANALYSIS.html`), `None` when
/// `file_name` is not such a backup. The returned string sorts chronologically.
pub fn backup_timestamp<'a>(file_name: &'a str, base: &str) -> Option<&'a str> {
    let (stem, ext) = match base.rsplit_once('.') {
        Some((stem, ext)) => (stem, Some(ext)),
        None => (base, None),
    };
    let rest = file_name.strip_prefix(stem)?.strip_prefix('.')?;
    let timestamp = match ext {
        Some(ext) => rest.strip_suffix(ext)?.strip_suffix('.')?,
        None => rest,
    };
    // collision suffix `-<n>`
    let core = timestamp.get(..19)?;
    NaiveDateTime::parse_from_str(core, BACKUP_TIMESTAMP_FORMAT).ok()?;
    match &timestamp[19..] {
        "" => Some(timestamp),
        suffix
            if suffix.starts_with('-')
                && suffix.len() > 1
                && suffix[1..].bytes().all(|b| b.is_ascii_digit()) =>
        {
            Some(timestamp)
        }
        _ => None,
    }
}

/// Chronological sort key of a timestamp returned by [`backup_timestamp`]: the time, then the
/// numeric collision suffix (0 without one).
pub fn backup_sort_key(timestamp: &str) -> (&str, u64) {
    match (timestamp.get(..19), timestamp.get(19..)) {
        (Some(time), Some(suffix)) => {
            let n = suffix
                .strip_prefix('-')
                .and_then(|n| n.parse().ok())
                .unwrap_or(0);
            (time, n)
        }
        _ => (timestamp, 0),
    }
}
