//! Backup-then-overwrite persistence and backup maintenance.

use anyhow::{Context, Result};
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

/// Sibling backup path: the original path with `suffix` appended to its file name
pub fn backup_path(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

/// Whether a path looks like a backup produced with `suffix`
pub fn is_backup(path: &Path, suffix: &str) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().ends_with(suffix))
        .unwrap_or(false)
}

/// Save `original` next to `path`, then replace `path` with `cleaned`.
///
/// The original file is not touched unless the backup was written.
pub fn write_with_backup(path: &Path, original: &str, cleaned: &str, suffix: &str) -> Result<PathBuf> {
    let backup = backup_path(path, suffix);
    fs::write(&backup, original)
        .with_context(|| format!("Failed to write backup {}", backup.display()))?;
    fs::write(path, cleaned).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(backup)
}

/// Put the backup of `path` back in place and delete it.
/// Returns false when there was no backup to restore.
pub fn restore_backup(path: &Path, suffix: &str) -> Result<bool> {
    let backup = backup_path(path, suffix);
    if !backup.is_file() {
        return Ok(false);
    }
    fs::copy(&backup, path).with_context(|| {
        format!(
            "Failed to restore {} from {}",
            path.display(),
            backup.display()
        )
    })?;
    fs::remove_file(&backup)
        .with_context(|| format!("Failed to remove backup {}", backup.display()))?;
    Ok(true)
}

/// Delete the backup of `path`. Returns false when there was none.
pub fn remove_backup(path: &Path, suffix: &str) -> Result<bool> {
    let backup = backup_path(path, suffix);
    if !backup.is_file() {
        return Ok(false);
    }
    fs::remove_file(&backup)
        .with_context(|| format!("Failed to remove backup {}", backup.display()))?;
    Ok(true)
}
