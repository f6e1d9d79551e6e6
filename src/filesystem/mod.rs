// src/filesystem/mod.rs

//! Filesystem tasks
//!
//! Small async wrappers over `tokio::fs` that report what they did through an
//! [`EventSink`]. Writes never clobber an existing path unless asked to.

use crate::error::{Error, Result};
use crate::events::{Event, EventSink};
use std::path::Path;
use tracing::debug;

/// Read a whole file as UTF-8
pub async fn read_file(path: &Path, events: &EventSink) -> Result<String> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| Error::IoError(format!("Failed to read {}: {e}", path.display())))?;
    events.emit(Event::ReadFile {
        path: path.to_path_buf(),
    });
    Ok(content)
}

/// Write `content` to `path`, creating parent directories
///
/// Without `overwrite`, an existing file or directory at `path` is an
/// [`Error::AlreadyExists`] and nothing is touched.
pub async fn write_file(
    path: &Path,
    content: &str,
    overwrite: bool,
    events: &EventSink,
) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            Error::IoError(format!("Failed to create directory {}: {e}", parent.display()))
        })?;
    }

    let exists = tokio::fs::try_exists(path).await?;
    if exists {
        if !overwrite || tokio::fs::metadata(path).await?.is_dir() {
            return Err(Error::AlreadyExists {
                path: path.to_path_buf(),
            });
        }
        debug!("Overwriting {}", path.display());
    }

    tokio::fs::write(path, content)
        .await
        .map_err(|e| Error::IoError(format!("Failed to write {}: {e}", path.display())))?;
    events.emit(Event::WriteFile {
        path: path.to_path_buf(),
    });
    Ok(())
}

/// Create `path` if missing; existing contents are left alone
pub async fn touch(path: &Path, events: &EventSink) -> Result<()> {
    tokio::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .await
        .map_err(|e| Error::IoError(format!("Failed to touch {}: {e}", path.display())))?;
    events.emit(Event::TouchFile {
        path: path.to_path_buf(),
    });
    Ok(())
}

/// Delete a file; returns whether anything was deleted
pub async fn delete_if_exists(path: &Path, events: &EventSink) -> Result<bool> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            events.emit(Event::DeleteFile {
                path: path.to_path_buf(),
            });
            Ok(true)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(Error::IoError(format!("Failed to delete {}: {e}", path.display()))),
    }
}

/// Create a directory and any missing parents
pub async fn create_dir(path: &Path, events: &EventSink) -> Result<()> {
    tokio::fs::create_dir_all(path).await.map_err(|e| {
        Error::IoError(format!("Failed to create directory {}: {e}", path.display()))
    })?;
    events.emit(Event::CreateDirectory {
        path: path.to_path_buf(),
    });
    Ok(())
}

/// Delete a directory and everything in it; returns whether it existed
pub async fn delete_dir_if_exists(path: &Path, events: &EventSink) -> Result<bool> {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => {
            events.emit(Event::DeleteDirectory {
                path: path.to_path_buf(),
            });
            Ok(true)
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(Error::IoError(format!(
            "Failed to delete directory {}: {e}",
            path.display()
        ))),
    }
}
