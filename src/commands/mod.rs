// src/commands/mod.rs
//! Command implementations for the Buckaroo CLI

mod progress;
mod project;
mod query;

pub use project::{cmd_init, cmd_install, cmd_resolve, cmd_uninstall, cmd_update, cmd_upgrade};
pub use query::{cmd_recipe, cmd_recipes, cmd_tags};

use anyhow::Result;
use buckaroo::config::Config;
use buckaroo::events::{self, EventSink};
use buckaroo::tasks::Context;
use progress::EventReporter;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Everything a command needs: project location, config, sources and output
pub struct Session {
    pub project_dir: PathBuf,
    pub context: Context,
    pub events: EventSink,
    reporter: EventReporter,
}

impl Session {
    /// Load the config (creating the default one if needed) and start reporting
    pub fn open(
        project_dir: &Path,
        config_path: Option<&Path>,
        quiet: bool,
        cancel: CancellationToken,
    ) -> Result<Self> {
        let config = match config_path {
            Some(path) => Config::load(path)?,
            None => Config::load_or_init(&Config::default_path()?)?,
        };
        debug!("Using {} cookbooks", config.cookbooks.len());

        let (events, stream) = events::channel();
        let reporter = EventReporter::spawn(stream, quiet);
        let context = Context::from_config(config, cancel, &events)?;

        Ok(Self {
            project_dir: project_dir.to_path_buf(),
            context,
            events,
            reporter,
        })
    }

    pub fn config(&self) -> &Config {
        &self.context.config
    }

    /// Stop the progress display before printing results
    pub fn finish(self) {
        self.reporter.finish();
    }
}
