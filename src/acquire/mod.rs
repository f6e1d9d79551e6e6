// src/acquire/mod.rs

//! Download, verify and extract
//!
//! The acquisition pipeline materializes remote files on disk:
//! - Downloads are keyed by target path: an existing target is never fetched
//!   again, which makes re-running an interrupted install cheap. Callers pick
//!   paths that name the content (for instance by version), and a forcing
//!   acquirer deletes the target first
//! - Transfers land in a sibling `.part` file and are renamed into place
//! - Every target is hashed after the (possibly skipped) transfer and compared
//!   with the expected SHA-256; a mismatch leaves the file where it is
//! - Archives are unpacked on the blocking pool, optionally re-rooted at a
//!   sub-path
//!
//! Every step is reported through the [`EventSink`].

mod transport;
mod unzip;

pub use transport::{HttpTransport, Transport};
pub use unzip::{unzip, unzip_async};

use crate::error::{Error, Result};
use crate::events::{Event, EventSink};
use crate::filesystem;
use crate::hash::{hash_file_async, Sha256Hash};
use crate::model::{RemoteArchive, RemoteFile};
use crate::retry::{with_retry, RetryPolicy};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Downloads through a [`Transport`] with retry, caching and verification
#[derive(Clone)]
pub struct Acquirer {
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
    cancel: CancellationToken,
    events: EventSink,
    force: bool,
}

impl Acquirer {
    pub fn new(transport: Arc<dyn Transport>, events: EventSink) -> Self {
        Self {
            transport,
            policy: RetryPolicy::default(),
            cancel: CancellationToken::new(),
            events,
            force: false,
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Re-download even when the target exists
    ///
    /// The only way past a hash mismatch on a file already on disk.
    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Fetch `remote` to `target` unless present, then verify its hash
    pub async fn download_remote_file(&self, remote: &RemoteFile, target: &Path) -> Result<()> {
        self.fetch(&remote.url, target).await?;
        self.verify(target, &remote.sha256).await
    }

    /// Like [`download_remote_file`](Self::download_remote_file), but with an
    /// optional expected hash
    ///
    /// Without one the file is trusted as downloaded and its hash returned so
    /// the caller can pin it.
    pub async fn acquire_file(
        &self,
        url: &str,
        expected: Option<&Sha256Hash>,
        target: &Path,
    ) -> Result<Sha256Hash> {
        self.fetch(url, target).await?;
        match expected {
            Some(expected) => {
                self.verify(target, expected).await?;
                Ok(expected.clone())
            }
            None => self.hash(target).await,
        }
    }

    /// Download an archive next to `target_dir` and extract it into it
    pub async fn download_remote_archive(
        &self,
        remote: &RemoteArchive,
        target_dir: &Path,
    ) -> Result<()> {
        let zip_path = archive_path(target_dir)?;
        self.download_remote_archive_at(remote, &zip_path, target_dir).await
    }

    /// Like [`download_remote_archive`](Self::download_remote_archive), with
    /// the archive kept at `zip_path`
    pub async fn download_remote_archive_at(
        &self,
        remote: &RemoteArchive,
        zip_path: &Path,
        target_dir: &Path,
    ) -> Result<()> {
        self.download_remote_file(remote.as_remote_file(), zip_path).await?;
        self.extract(zip_path, remote.sub_path.as_deref(), target_dir).await
    }

    /// Archive counterpart of [`acquire_file`](Self::acquire_file)
    pub async fn acquire_archive(
        &self,
        url: &str,
        expected: Option<&Sha256Hash>,
        sub_path: Option<&str>,
        zip_path: &Path,
        target_dir: &Path,
    ) -> Result<Sha256Hash> {
        let sha256 = self.acquire_file(url, expected, zip_path).await?;
        self.extract(zip_path, sub_path, target_dir).await?;
        Ok(sha256)
    }

    async fn extract(
        &self,
        zip_path: &Path,
        sub_path: Option<&str>,
        target_dir: &Path,
    ) -> Result<()> {
        unzip_async(zip_path, target_dir, sub_path).await?;
        self.events.emit(Event::Unzipped {
            archive: zip_path.to_path_buf(),
            target: target_dir.to_path_buf(),
        });
        Ok(())
    }

    /// Transfer unless the target already exists
    async fn fetch(&self, url: &str, target: &Path) -> Result<()> {
        if self.force {
            if filesystem::delete_if_exists(target, &self.events).await? {
                debug!("Removed {} to download it again", target.display());
            }
        } else if tokio::fs::try_exists(target).await? {
            debug!("{} exists, skipping download", target.display());
            self.events.emit(Event::DownloadSkipped {
                url: url.to_string(),
                target: target.to_path_buf(),
            });
            return Ok(());
        }

        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                Error::IoError(format!("Failed to create directory {}: {e}", parent.display()))
            })?;
        }

        info!("Downloading {} to {}", url, target.display());
        let partial = partial_path(target);
        let result = with_retry(&self.policy, &self.cancel, &self.events, url, || {
            self.transport.download(url, &partial, &self.events)
        })
        .await;

        let bytes = match result {
            Ok(bytes) => bytes,
            Err(e) => {
                let _ = tokio::fs::remove_file(&partial).await;
                return Err(e);
            }
        };

        tokio::fs::rename(&partial, target).await.map_err(|e| {
            Error::IoError(format!(
                "Failed to move {} to {}: {e}",
                partial.display(),
                target.display()
            ))
        })?;

        self.events.emit(Event::DownloadFinished {
            url: url.to_string(),
            target: target.to_path_buf(),
            bytes,
        });
        Ok(())
    }

    async fn hash(&self, path: &Path) -> Result<Sha256Hash> {
        let sha256 = hash_file_async(path).await?;
        self.events.emit(Event::FileHashed {
            path: path.to_path_buf(),
            sha256: sha256.clone(),
        });
        Ok(sha256)
    }

    async fn verify(&self, path: &Path, expected: &Sha256Hash) -> Result<()> {
        let actual = self.hash(path).await?;
        if &actual != expected {
            return Err(Error::HashMismatch {
                path: path.to_path_buf(),
                expected: expected.clone(),
                actual,
            });
        }

        self.events.emit(Event::HashVerified {
            path: path.to_path_buf(),
            sha256: actual,
        });
        Ok(())
    }
}

/// `<parent>/<name>.zip` for a target directory `<parent>/<name>`
pub fn archive_path(target_dir: &Path) -> Result<PathBuf> {
    let name = target_dir.file_name().ok_or_else(|| {
        Error::IoError(format!("{} has no directory name", target_dir.display()))
    })?;
    let mut file_name = OsString::from(name);
    file_name.push(".zip");
    Ok(target_dir.with_file_name(file_name))
}

/// Sibling of `target` that receives the transfer
fn partial_path(target: &Path) -> PathBuf {
    let mut file_name = target
        .file_name()
        .map(OsString::from)
        .unwrap_or_default();
    file_name.push(".part");
    target.with_file_name(file_name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_archive_path() {
        assert_eq!(
            archive_path(Path::new("/p/buckaroo/org.lib")).unwrap(),
            PathBuf::from("/p/buckaroo/org.lib.zip")
        );
        assert!(archive_path(Path::new("/")).is_err());
    }

    #[test]
    fn test_partial_path() {
        assert_eq!(
            partial_path(Path::new("/p/org.lib.zip")),
            PathBuf::from("/p/org.lib.zip.part")
        );
    }
}
