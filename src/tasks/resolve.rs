// src/tasks/resolve.rs
//! `resolve`: project file in, lock file out

use super::{read_project, write_locks, Context};
use crate::error::Result;
use crate::events::EventSink;
use crate::lock::DependencyLocks;
use crate::model::RecipeIdentifier;
use crate::resolver::Resolver;
use crate::version::SemanticVersion;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// Resolve the project's requirements and overwrite the lock file
pub async fn resolve(
    project_dir: &Path,
    context: &Context,
    events: &EventSink,
) -> Result<DependencyLocks> {
    resolve_from(project_dir, context, &DependencyLocks::default(), None, events).await
}

/// [`resolve`], keeping the versions of `previous` the requirements still
/// allow, except `release`'s
///
/// Entries that keep their version keep their pinned hashes too.
pub(crate) async fn resolve_from(
    project_dir: &Path,
    context: &Context,
    previous: &DependencyLocks,
    release: Option<&RecipeIdentifier>,
    events: &EventSink,
) -> Result<DependencyLocks> {
    let project = read_project(project_dir, events).await?;
    let preferred: BTreeMap<RecipeIdentifier, SemanticVersion> = previous
        .iter()
        .filter(|lock| Some(&lock.identifier) != release)
        .map(|lock| (lock.identifier.clone(), lock.version.clone()))
        .collect();

    let resolution = Resolver::new(context.source.as_ref())
        .with_max_reopens(context.config.resolver.max_reopens)
        .with_preferred(preferred)
        .with_events(events.clone())
        .resolve(&project.dependencies)
        .await?;

    let mut locks = DependencyLocks::from_resolution(&resolution);
    locks.keep_pinned_hashes(previous);
    write_locks(project_dir, &locks, events).await?;

    info!("Locked {} dependencies", locks.len());
    Ok(locks)
}
