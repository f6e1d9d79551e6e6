// src/tasks/update.rs
//! `upgrade` and `update`: move the lock forward, then install it
//!
//! `upgrade` throws the lock away and takes the highest allowed version of
//! everything. `update` keeps every locked version the project still allows,
//! so only new or changed requirements move; naming a package releases its
//! lock entry as well.

use super::resolve::resolve_from;
use super::{install, read_locks, resolve, Context};
use crate::error::{Error, Result};
use crate::events::EventSink;
use crate::lock::{DependencyLocks, LOCK_FILE};
use crate::model::RecipeIdentifier;
use std::path::Path;
use tracing::info;

/// Re-resolve ignoring the lock file, then install
pub async fn upgrade(
    project_dir: &Path,
    context: &Context,
    events: &EventSink,
) -> Result<DependencyLocks> {
    resolve(project_dir, context, events).await?;
    install(project_dir, context, events).await
}

/// Re-resolve keeping locked versions, except `release`'s, then install
///
/// Fails without touching anything if `release` is not in the lock file.
/// Hashes pinned for versions that stay are kept.
pub async fn update(
    project_dir: &Path,
    context: &Context,
    release: Option<&RecipeIdentifier>,
    events: &EventSink,
) -> Result<DependencyLocks> {
    let locks = if tokio::fs::try_exists(project_dir.join(LOCK_FILE)).await? {
        read_locks(project_dir, events).await?
    } else {
        DependencyLocks::default()
    };

    if let Some(identifier) = release {
        if locks.get(identifier).is_none() {
            return Err(Error::NotFoundError(format!(
                "{} is not in {}",
                identifier, LOCK_FILE
            )));
        }
        info!("Releasing the locked version of {}", identifier);
    }

    resolve_from(project_dir, context, &locks, release, events).await?;
    install(project_dir, context, events).await
}
