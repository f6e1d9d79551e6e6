// src/lib.rs

//! Buckaroo Dependency Manager
//!
//! Resolves, locks, fetches and verifies source dependencies for projects
//! built with Buck.
//!
//! # Architecture
//!
//! - Recipes: every available version of a package, from a local cookbook or
//!   the tags of a GitHub repository
//! - Resolution: highest compatible versions, reopening earlier choices when
//!   a later constraint rules them out
//! - Lock file: the exact URL, hash and sub-path of every package
//! - Acquisition: downloads keyed by target path, verified by SHA-256,
//!   unpacked under `buckaroo/`
//! - Events: every file and network operation is reported on a channel

pub mod acquire;
pub mod buck;
pub mod config;
mod error;
pub mod events;
pub mod filesystem;
pub mod hash;
pub mod lock;
pub mod model;
pub mod project;
pub mod resolver;
pub mod retry;
pub mod source;
pub mod tasks;
pub mod version;

pub use acquire::{Acquirer, HttpTransport, Transport};
pub use config::Config;
pub use error::{Error, FetchRecipeReason, Requirer, Result};
pub use events::{Event, EventSink, EventStream};
pub use hash::Sha256Hash;
pub use lock::{DependencyLock, DependencyLocks};
pub use model::{Recipe, RecipeIdentifier, RecipeVersion};
pub use project::Project;
pub use resolver::{Resolution, ResolvedDependency, Resolver};
pub use source::RecipeSource;
pub use version::{SemanticVersion, SemanticVersionRequirement};
