// src/tasks/mod.rs

//! Project-level workflows
//!
//! Each task works on a project directory, reports progress through an
//! [`EventSink`] and leaves partial progress on disk when it fails, so
//! running it again picks up where it stopped.

mod dependencies;
mod init;
mod install;
mod resolve;
mod update;

pub use dependencies::{add_dependency, remove_dependency};
pub use init::init;
pub use install::install;
pub use resolve::resolve;
pub use update::{update, upgrade};

use crate::acquire::{Acquirer, HttpTransport, Transport};
use crate::config::Config;
use crate::error::Result;
use crate::events::EventSink;
use crate::filesystem;
use crate::lock::{DependencyLocks, LOCK_FILE};
use crate::project::{Project, PROJECT_FILE};
use crate::source::{self, RecipeSource};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// What a task needs from the outside world
#[derive(Clone)]
pub struct Context {
    pub config: Config,
    pub source: Arc<dyn RecipeSource>,
    pub transport: Arc<dyn Transport>,
    pub cancel: CancellationToken,
    /// Download again even when a file is already in place
    pub force: bool,
}

impl Context {
    pub fn new(config: Config, source: Arc<dyn RecipeSource>, transport: Arc<dyn Transport>) -> Self {
        Self {
            config,
            source,
            transport,
            cancel: CancellationToken::new(),
            force: false,
        }
    }

    /// The standard recipe sources and HTTP transport for `config`
    pub fn from_config(config: Config, cancel: CancellationToken, events: &EventSink) -> Result<Self> {
        let source = source::standard(&config, &cancel, events)?;
        Ok(Self {
            config,
            source: Arc::new(source),
            transport: Arc::new(HttpTransport::new()?),
            cancel,
            force: false,
        })
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    fn acquirer(&self, events: &EventSink) -> Acquirer {
        Acquirer::new(self.transport.clone(), events.clone())
            .with_policy(self.config.network.download_policy())
            .with_cancellation(self.cancel.clone())
            .with_force(self.force)
    }
}

pub(crate) async fn read_project(project_dir: &Path, events: &EventSink) -> Result<Project> {
    let content = filesystem::read_file(&project_dir.join(PROJECT_FILE), events).await?;
    Project::parse(&content)
}

pub(crate) async fn write_project(
    project_dir: &Path,
    project: &Project,
    events: &EventSink,
) -> Result<()> {
    filesystem::write_file(&project_dir.join(PROJECT_FILE), &project.to_json()?, true, events).await
}

pub(crate) async fn read_locks(project_dir: &Path, events: &EventSink) -> Result<DependencyLocks> {
    let content = filesystem::read_file(&project_dir.join(LOCK_FILE), events).await?;
    DependencyLocks::parse(&content)
}

pub(crate) async fn write_locks(
    project_dir: &Path,
    locks: &DependencyLocks,
    events: &EventSink,
) -> Result<()> {
    filesystem::write_file(&project_dir.join(LOCK_FILE), &locks.to_json()?, true, events).await
}
