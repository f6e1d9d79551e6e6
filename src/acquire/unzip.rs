// src/acquire/unzip.rs
//! Zip extraction with optional sub-path re-rooting
//!
//! Source archives usually wrap everything in one top-level folder. Given a
//! sub-path, only entries under it are extracted, with the sub-path stripped,
//! so `lib-1a2b/src/x.c` lands at `<target>/src/x.c`.

use crate::error::{Error, Result};
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Extract `archive` into `target`, overwriting existing files
///
/// Returns the number of files written. Blocking; see [`unzip_async`].
pub fn unzip(archive: &Path, target: &Path, sub_path: Option<&str>) -> Result<usize> {
    let file = File::open(archive)
        .map_err(|e| Error::IoError(format!("Failed to open {}: {e}", archive.display())))?;
    let mut zip = zip::ZipArchive::new(file)
        .map_err(|e| Error::ArchiveError(format!("{}: {e}", archive.display())))?;

    let prefix: Option<PathBuf> = sub_path
        .map(|s| s.trim_matches('/'))
        .filter(|s| !s.is_empty())
        .map(PathBuf::from);

    fs::create_dir_all(target)
        .map_err(|e| Error::IoError(format!("Failed to create {}: {e}", target.display())))?;

    let mut matched = false;
    let mut written = 0;

    for index in 0..zip.len() {
        let mut entry = zip
            .by_index(index)
            .map_err(|e| Error::ArchiveError(format!("{}: {e}", archive.display())))?;

        // Entries escaping the archive root are never extracted
        let Some(name) = entry.enclosed_name() else {
            debug!("Skipping unsafe entry {}", entry.name());
            continue;
        };

        let relative = match &prefix {
            Some(prefix) => match name.strip_prefix(prefix) {
                Ok(rest) => {
                    matched = true;
                    rest.to_path_buf()
                }
                Err(_) => continue,
            },
            None => name,
        };
        if relative.as_os_str().is_empty() {
            continue;
        }

        let dest = target.join(&relative);
        if entry.is_dir() {
            fs::create_dir_all(&dest).map_err(|e| {
                Error::IoError(format!("Failed to create {}: {e}", dest.display()))
            })?;
            continue;
        }

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                Error::IoError(format!("Failed to create {}: {e}", parent.display()))
            })?;
        }
        let mut out = File::create(&dest)
            .map_err(|e| Error::IoError(format!("Failed to create {}: {e}", dest.display())))?;
        io::copy(&mut entry, &mut out).map_err(|e| {
            Error::ArchiveError(format!("Failed to extract {}: {e}", relative.display()))
        })?;

        apply_mode(&dest, entry.unix_mode())?;
        written += 1;
    }

    if let (Some(prefix), false) = (&prefix, matched) {
        return Err(Error::ArchiveError(format!(
            "{} has no entry under {}",
            archive.display(),
            prefix.display()
        )));
    }

    debug!("Extracted {} files from {}", written, archive.display());
    Ok(written)
}

#[cfg(unix)]
fn apply_mode(path: &Path, mode: Option<u32>) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    if let Some(mode) = mode {
        fs::set_permissions(path, fs::Permissions::from_mode(mode & 0o777))?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn apply_mode(_path: &Path, _mode: Option<u32>) -> Result<()> {
    Ok(())
}

/// [`unzip`] on the blocking thread pool
pub async fn unzip_async(archive: &Path, target: &Path, sub_path: Option<&str>) -> Result<usize> {
    let archive = archive.to_path_buf();
    let target = target.to_path_buf();
    let sub_path = sub_path.map(str::to_string);
    tokio::task::spawn_blocking(move || unzip(&archive, &target, sub_path.as_deref()))
        .await
        .map_err(|e| Error::IoError(format!("Unzip task failed: {e}")))?
}
