// src/commands/project.rs
//! Commands that change the project directory

use super::Session;
use anyhow::{anyhow, Result};
use buckaroo::events::EventSink;
use buckaroo::lock::{DependencyLocks, LOCK_FILE};
use buckaroo::model::RecipeIdentifier;
use buckaroo::tasks::{self, Context};
use buckaroo::version::{SemanticVersion, SemanticVersionRequirement};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

pub async fn cmd_init(project_dir: &Path) -> Result<()> {
    let project = tasks::init(project_dir, &EventSink::silent()).await?;
    println!(
        "Initialized project {} in {}",
        project.name.as_deref().unwrap_or("(unnamed)"),
        project_dir.display()
    );
    Ok(())
}

pub async fn cmd_resolve(session: Session) -> Result<()> {
    let result = tasks::resolve(&session.project_dir, &session.context, &session.events).await;
    session.finish();

    let locks = result?;
    println!("Resolved {} dependencies:", locks.len());
    for lock in locks.iter() {
        println!("  {}@{}", lock.identifier, lock.version);
    }
    Ok(())
}

/// Install the lock, first adding `identifier` to the project if given
pub async fn cmd_install(
    mut session: Session,
    identifier: Option<String>,
    requirement: Option<String>,
    force: bool,
) -> Result<()> {
    session.context.force = force;
    let result = install(&session, identifier, requirement).await;
    session.finish();

    let count = result?;
    println!("Installed {} packages", count);
    Ok(())
}

async fn install(
    session: &Session,
    identifier: Option<String>,
    requirement: Option<String>,
) -> Result<usize> {
    if let Some(identifier) = identifier {
        let identifier = RecipeIdentifier::parse(&identifier)?;
        let requirement = match requirement {
            Some(requirement) => SemanticVersionRequirement::parse(&requirement)?,
            None => latest_compatible(&session.context, &identifier).await?,
        };

        tasks::add_dependency(&session.project_dir, identifier, requirement, &session.events)
            .await?;
        // The lock no longer matches the project
        tasks::resolve(&session.project_dir, &session.context, &session.events).await?;
    }

    let locks = tasks::install(&session.project_dir, &session.context, &session.events).await?;
    Ok(locks.len())
}

/// `^<latest release>`, falling back to the latest prerelease
async fn latest_compatible(
    context: &Context,
    identifier: &RecipeIdentifier,
) -> Result<SemanticVersionRequirement> {
    let recipe = context.source.fetch(identifier).await?;
    let latest = recipe
        .available_versions()
        .filter(|version| !version.is_prerelease())
        .last()
        .or_else(|| recipe.available_versions().last())
        .ok_or_else(|| anyhow!("{} has no versions", identifier))?;

    info!("Latest version of {} is {}", identifier, latest);
    Ok(SemanticVersionRequirement::Compatible(latest.clone()))
}

pub async fn cmd_upgrade(session: Session) -> Result<()> {
    let previous = locked_versions(&session).await;
    let result = tasks::upgrade(&session.project_dir, &session.context, &session.events).await;
    session.finish();

    print_changes(&previous, &result?);
    Ok(())
}

/// Re-resolve keeping locked versions; `identifier`'s may move
pub async fn cmd_update(session: Session, identifier: Option<String>) -> Result<()> {
    let previous = locked_versions(&session).await;
    let result = update(&session, identifier).await;
    session.finish();

    print_changes(&previous, &result?);
    Ok(())
}

async fn update(session: &Session, identifier: Option<String>) -> Result<DependencyLocks> {
    let identifier = identifier
        .map(|identifier| RecipeIdentifier::parse(&identifier))
        .transpose()?;
    let locks = tasks::update(
        &session.project_dir,
        &session.context,
        identifier.as_ref(),
        &session.events,
    )
    .await?;
    Ok(locks)
}

/// Versions in the lock file before a command changes it
async fn locked_versions(session: &Session) -> BTreeMap<RecipeIdentifier, SemanticVersion> {
    let path = session.project_dir.join(LOCK_FILE);
    let Ok(content) = tokio::fs::read_to_string(&path).await else {
        return BTreeMap::new();
    };
    DependencyLocks::parse(&content)
        .map(|locks| {
            locks
                .into_iter()
                .map(|lock| (lock.identifier, lock.version))
                .collect()
        })
        .unwrap_or_default()
}

fn print_changes(previous: &BTreeMap<RecipeIdentifier, SemanticVersion>, locks: &DependencyLocks) {
    let mut changed = 0;
    for lock in locks.iter() {
        match previous.get(&lock.identifier) {
            Some(version) if *version == lock.version => continue,
            Some(version) => println!("  {} {} -> {}", lock.identifier, version, lock.version),
            None => println!("  {} {} (new)", lock.identifier, lock.version),
        }
        changed += 1;
    }
    println!("Installed {} packages, {} changed", locks.len(), changed);
}

/// Remove `identifier` from the project, then re-resolve and re-install
pub async fn cmd_uninstall(session: Session, identifier: String) -> Result<()> {
    let result = uninstall(&session, &identifier).await;
    session.finish();

    result?;
    println!("Removed {}", identifier);
    Ok(())
}

async fn uninstall(session: &Session, identifier: &str) -> Result<()> {
    let identifier = RecipeIdentifier::parse(identifier)?;
    if !tasks::remove_dependency(&session.project_dir, &identifier, &session.events).await? {
        return Err(anyhow!("{} is not a dependency of this project", identifier));
    }

    tasks::resolve(&session.project_dir, &session.context, &session.events).await?;
    tasks::install(&session.project_dir, &session.context, &session.events).await?;
    Ok(())
}
