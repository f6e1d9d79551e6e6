// src/tasks/init.rs
//! `init`: start a new project in a directory

use crate::error::{Error, Result};
use crate::events::EventSink;
use crate::filesystem;
use crate::project::{Project, PROJECT_FILE};
use std::path::Path;
use tracing::info;

/// Buck's root marker file
const BUCKCONFIG_FILE: &str = ".buckconfig";

/// Write an empty project file named after the directory and touch `.buckconfig`
///
/// An existing project file is left alone and reported as
/// [`Error::AlreadyExists`].
pub async fn init(project_dir: &Path, events: &EventSink) -> Result<Project> {
    let absolute = std::path::absolute(project_dir).map_err(|e| {
        Error::IoError(format!("Failed to resolve {}: {e}", project_dir.display()))
    })?;
    let project = Project::for_directory(&absolute);

    filesystem::write_file(&project_dir.join(PROJECT_FILE), &project.to_json()?, false, events)
        .await?;
    filesystem::touch(&project_dir.join(BUCKCONFIG_FILE), events).await?;

    info!("Initialized {}", absolute.display());
    Ok(project)
}
