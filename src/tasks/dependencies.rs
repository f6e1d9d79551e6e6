// src/tasks/dependencies.rs
//! Editing the project's direct dependencies

use super::{read_project, write_project};
use crate::error::Result;
use crate::events::EventSink;
use crate::model::RecipeIdentifier;
use crate::project::Project;
use crate::version::SemanticVersionRequirement;
use std::path::Path;
use tracing::info;

/// Add or replace a direct dependency in the project file
pub async fn add_dependency(
    project_dir: &Path,
    identifier: RecipeIdentifier,
    requirement: SemanticVersionRequirement,
    events: &EventSink,
) -> Result<Project> {
    let mut project = read_project(project_dir, events).await?;

    info!("Adding {} {}", identifier, requirement);
    project.dependencies.insert(identifier, requirement);

    write_project(project_dir, &project, events).await?;
    Ok(project)
}

/// Drop a direct dependency; returns whether the project listed it
pub async fn remove_dependency(
    project_dir: &Path,
    identifier: &RecipeIdentifier,
    events: &EventSink,
) -> Result<bool> {
    let mut project = read_project(project_dir, events).await?;

    if project.dependencies.remove(identifier).is_none() {
        return Ok(false);
    }

    info!("Removing {}", identifier);
    write_project(project_dir, &project, events).await?;
    Ok(true)
}
