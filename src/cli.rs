// src/cli.rs
//! CLI definitions for Buckaroo
//!
//! This module contains the command-line interface definitions using clap.
//! The actual command implementations are in the `commands` module.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "buckaroo")]
#[command(author = "Buckaroo Contributors")]
#[command(version)]
#[command(about = "Dependency manager for Buck projects", long_about = None)]
pub struct Cli {
    /// Project directory
    #[arg(short = 'C', long, global = true, default_value = ".")]
    pub project_dir: PathBuf,

    /// Config file (default: ~/.buckaroo/buckaroo.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Hide progress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create buckaroo.json and .buckconfig in the project directory
    Init,

    /// Resolve the project's dependencies and write the lock file
    Resolve,

    /// Install locked dependencies, optionally adding one first
    Install {
        /// Package to add, e.g. github+njlr/test-lib-a
        identifier: Option<String>,

        /// Version requirement (default: compatible with the latest release)
        requirement: Option<String>,

        /// Download everything again, replacing files already in place
        #[arg(long)]
        force: bool,
    },

    /// Re-resolve everything to the highest allowed versions and install
    Upgrade,

    /// Re-resolve keeping locked versions, then install
    Update {
        /// Package whose locked version may move
        identifier: Option<String>,
    },

    /// Remove a direct dependency and re-resolve
    Uninstall {
        /// Package to remove
        identifier: String,
    },

    /// List a GitHub package's tags and the commits they point at
    Tags {
        /// Package, e.g. njlr/test-lib-tags
        identifier: String,
    },

    /// Show the recipe the resolver would see for a package
    Recipe {
        /// Package identifier
        identifier: String,
    },

    /// List recipes in the configured cookbooks
    Recipes,
}
