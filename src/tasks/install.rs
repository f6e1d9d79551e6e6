// src/tasks/install.rs
//! `install`: materialize the lock file under `buckaroo/`
//!
//! Packages are acquired concurrently. Each one lands in
//! `buckaroo/<folder>` together with its own `BUCKAROO_DEPS`, and the
//! project root gets a `BUCKAROO_DEPS` naming its direct dependencies.
//! Hashes missing from the lock are pinned on first download and written
//! back, even when some other package fails.
//!
//! Downloads are cached beside the folders as `<folder>-<version>.zip` and
//! `<folder>-<version>.BUCK`. Caches of other versions are deleted together
//! with the folder they were extracted into.

use super::{read_locks, read_project, resolve, write_locks, Context};
use crate::acquire::Acquirer;
use crate::buck::{generate_buckaroo_deps, BUCKAROO_DEPS_FILE, BUCK_FILE, PACKAGES_DIR};
use crate::error::{Error, Result};
use crate::events::{Event, EventSink};
use crate::filesystem;
use crate::hash::Sha256Hash;
use crate::lock::{DependencyLock, DependencyLocks, LOCK_FILE};
use crate::model::RecipeIdentifier;
use futures::stream::{self, StreamExt};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info, warn};

/// Packages acquired at the same time
const MAX_CONCURRENT_INSTALLS: usize = 4;

const ARCHIVE_EXTENSION: &str = "zip";

/// Hashes observed while installing one package
struct Pinned {
    identifier: RecipeIdentifier,
    sha256: Sha256Hash,
    buck_sha256: Option<Sha256Hash>,
}

/// Install every locked package, resolving first if there is no lock file
pub async fn install(
    project_dir: &Path,
    context: &Context,
    events: &EventSink,
) -> Result<DependencyLocks> {
    let project = read_project(project_dir, events).await?;

    let mut locks = if tokio::fs::try_exists(project_dir.join(LOCK_FILE)).await? {
        read_locks(project_dir, events).await?
    } else {
        info!("No lock file found, resolving first");
        resolve(project_dir, context, events).await?
    };

    let packages_dir = project_dir.join(PACKAGES_DIR);
    filesystem::create_dir(&packages_dir, events).await?;

    let acquirer = context.acquirer(events);
    let mut seen = HashSet::new();
    let packages: Vec<DependencyLock> = locks
        .iter()
        .filter(|lock| seen.insert(lock.identifier.clone()))
        .cloned()
        .collect();
    let current: HashSet<String> = packages
        .iter()
        .flat_map(|lock| {
            [
                lock.cache_file_name(ARCHIVE_EXTENSION),
                lock.cache_file_name(BUCK_FILE),
            ]
        })
        .collect();

    let results: Vec<Result<Pinned>> = stream::iter(packages)
        .map(|lock| {
            let acquirer = &acquirer;
            let packages_dir = &packages_dir;
            let locks = &locks;
            let current = &current;
            async move {
                remove_superseded(packages_dir, &lock, current, events).await?;
                install_package(acquirer, packages_dir, &lock, locks, events).await
            }
        })
        .buffered(MAX_CONCURRENT_INSTALLS)
        .collect()
        .await;

    let mut first_error = None;
    let mut pinned = Vec::new();
    for result in results {
        match result {
            Ok(p) => pinned.push(p),
            Err(e) => {
                warn!("Install failed: {}", e);
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
    }

    if pin_hashes(&mut locks, &pinned) {
        info!("Pinning downloaded hashes in {}", LOCK_FILE);
        write_locks(project_dir, &locks, events).await?;
    }

    if let Some(e) = first_error {
        return Err(e);
    }

    let root_deps = generate_buckaroo_deps(&locks.references(project.dependencies.keys()));
    filesystem::write_file(&project_dir.join(BUCKAROO_DEPS_FILE), &root_deps, true, events).await?;

    info!("Installed {} packages", pinned.len());
    Ok(locks)
}

async fn install_package(
    acquirer: &Acquirer,
    packages_dir: &Path,
    lock: &DependencyLock,
    locks: &DependencyLocks,
    events: &EventSink,
) -> Result<Pinned> {
    let target = packages_dir.join(lock.folder_name());
    let zip_path = packages_dir.join(lock.cache_file_name(ARCHIVE_EXTENSION));
    info!("Installing {}@{}", lock.identifier, lock.version);

    let sha256 = match lock.archive() {
        Some(remote) => {
            acquirer
                .download_remote_archive_at(&remote, &zip_path, &target)
                .await?;
            remote.file.sha256
        }
        None => {
            acquirer
                .acquire_archive(&lock.url, None, lock.sub_path.as_deref(), &zip_path, &target)
                .await?
        }
    };

    // The recipe's build file replaces whatever the archive shipped. It is
    // cached beside the package so unzipping again cannot disturb its hash.
    let buck_sha256 = match &lock.buck_url {
        Some(url) => {
            let cached = packages_dir.join(lock.cache_file_name(BUCK_FILE));
            let sha256 = acquirer
                .acquire_file(url, lock.buck_sha256.as_ref(), &cached)
                .await?;

            let build_file = target.join(BUCK_FILE);
            tokio::fs::copy(&cached, &build_file).await.map_err(|e| {
                Error::IoError(format!("Failed to copy {}: {e}", cached.display()))
            })?;
            events.emit(Event::WriteFile { path: build_file });
            Some(sha256)
        }
        None => None,
    };

    let deps = generate_buckaroo_deps(&locks.references(&lock.dependencies));
    filesystem::write_file(&target.join(BUCKAROO_DEPS_FILE), &deps, true, events).await?;

    Ok(Pinned {
        identifier: lock.identifier.clone(),
        sha256,
        buck_sha256,
    })
}

/// Delete cached downloads of other versions of `lock`'s package
///
/// When any are found, the package folder still holds that version's files
/// and is deleted too, so the current archive unpacks into a clean folder.
/// Files in `current` belong to the lock being installed and are kept.
async fn remove_superseded(
    packages_dir: &Path,
    lock: &DependencyLock,
    current: &HashSet<String>,
    events: &EventSink,
) -> Result<()> {
    let mut entries = tokio::fs::read_dir(packages_dir).await.map_err(|e| {
        Error::IoError(format!("Failed to list {}: {e}", packages_dir.display()))
    })?;

    let mut superseded = false;
    while let Some(entry) = entries.next_entry().await? {
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str() else {
            continue;
        };
        if current.contains(name) {
            continue;
        }

        let old_version = [ARCHIVE_EXTENSION, BUCK_FILE]
            .iter()
            .find_map(|extension| lock.cached_version(name, extension));
        if let Some(old_version) = old_version {
            debug!("Removing {} download of {}", old_version, lock.identifier);
            filesystem::delete_if_exists(&entry.path(), events).await?;
            superseded = true;
        }
    }

    if superseded {
        filesystem::delete_dir_if_exists(&packages_dir.join(lock.folder_name()), events).await?;
    }
    Ok(())
}

/// Fill hashes the lock does not have yet; returns whether any were added
fn pin_hashes(locks: &mut DependencyLocks, pinned: &[Pinned]) -> bool {
    let mut changed = false;
    for lock in locks.iter_mut() {
        let Some(p) = pinned.iter().find(|p| p.identifier == lock.identifier) else {
            continue;
        };
        if lock.sha256.is_none() {
            lock.sha256 = Some(p.sha256.clone());
            changed = true;
        }
        if lock.buck_sha256.is_none() && p.buck_sha256.is_some() {
            lock.buck_sha256 = p.buck_sha256.clone();
            changed = true;
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::hash_bytes;
    use crate::version::SemanticVersion;

    fn lock(id: &str) -> DependencyLock {
        DependencyLock {
            identifier: RecipeIdentifier::parse(id).unwrap(),
            version: SemanticVersion::new(1, 0, 0),
            url: format!("https://example.com/{id}.zip"),
            sha256: None,
            sub_path: None,
            buck_url: None,
            buck_sha256: None,
            target: None,
            dependencies: Vec::new(),
        }
    }

    #[tokio::test]
    async fn test_remove_superseded_keeps_current_and_others() {
        let dir = tempfile::tempdir().unwrap();
        let packages = dir.path();
        let mut current_lock = lock("org/lib-a");
        current_lock.version = SemanticVersion::new(2, 0, 0);
        let other = lock("org/lib-b");

        for name in [
            "org.lib-a-1.0.0.zip",
            "org.lib-a-1.0.0.BUCK",
            "org.lib-a-2.0.0.zip",
            "org.lib-b-1.0.0.zip",
        ] {
            std::fs::write(packages.join(name), name).unwrap();
        }
        std::fs::create_dir_all(packages.join("org.lib-a/src")).unwrap();
        std::fs::write(packages.join("org.lib-a/src/old.c"), "").unwrap();

        let current: HashSet<String> = [&current_lock, &other]
            .iter()
            .map(|l| l.cache_file_name(ARCHIVE_EXTENSION))
            .collect();
        remove_superseded(packages, &current_lock, &current, &EventSink::silent())
            .await
            .unwrap();

        assert!(!packages.join("org.lib-a-1.0.0.zip").exists());
        assert!(!packages.join("org.lib-a-1.0.0.BUCK").exists());
        assert!(!packages.join("org.lib-a").exists());
        assert!(packages.join("org.lib-a-2.0.0.zip").exists());
        assert!(packages.join("org.lib-b-1.0.0.zip").exists());

        // Nothing stale left: the folder is not touched again
        std::fs::create_dir(packages.join("org.lib-a")).unwrap();
        remove_superseded(packages, &current_lock, &current, &EventSink::silent())
            .await
            .unwrap();
        assert!(packages.join("org.lib-a").exists());
    }

    #[test]
    fn test_pin_hashes_fills_missing_only() {
        let existing = hash_bytes(b"existing");
        let mut a = lock("org/lib-a");
        a.sha256 = Some(existing.clone());
        let mut locks = DependencyLocks::new(vec![a, lock("org/lib-b")]);

        let pinned = vec![
            Pinned {
                identifier: RecipeIdentifier::parse("org/lib-a").unwrap(),
                sha256: hash_bytes(b"other"),
                buck_sha256: None,
            },
            Pinned {
                identifier: RecipeIdentifier::parse("org/lib-b").unwrap(),
                sha256: hash_bytes(b"b"),
                buck_sha256: Some(hash_bytes(b"buck")),
            },
        ];

        assert!(pin_hashes(&mut locks, &pinned));
        let a = locks.get(&RecipeIdentifier::parse("org/lib-a").unwrap()).unwrap();
        assert_eq!(a.sha256, Some(existing));
        let b = locks.get(&RecipeIdentifier::parse("org/lib-b").unwrap()).unwrap();
        assert_eq!(b.sha256, Some(hash_bytes(b"b")));
        assert_eq!(b.buck_sha256, Some(hash_bytes(b"buck")));

        assert!(!pin_hashes(&mut locks, &pinned));
    }
}
