// src/lock.rs
//! The lock file, `buckaroo.lock.json`
//!
//! A lock file records the outcome of a resolution in resolution order: one
//! entry per package with the chosen version and everything needed to fetch
//! it again without consulting any recipe source.
//!
//! # Format
//!
//! ```json
//! [
//!   {
//!     "name": "github+njlr/test-lib-a",
//!     "version": "1.0.0",
//!     "url": "https://github.com/njlr/test-lib-a/archive/<commit>.zip",
//!     "sha256": "…",
//!     "sub-path": "test-lib-a-<commit>",
//!     "target": "test-lib-a",
//!     "dependencies": []
//!   }
//! ]
//! ```

use crate::buck::ResolvedDependencyReference;
use crate::error::{Error, Result};
use crate::hash::Sha256Hash;
use crate::model::{RecipeIdentifier, RemoteArchive, RemoteFile};
use crate::resolver::{Resolution, ResolvedDependency};
use crate::version::SemanticVersion;
use serde::{Deserialize, Serialize};

/// Lock file name
pub const LOCK_FILE: &str = "buckaroo.lock.json";

/// The locked origin of one package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyLock {
    #[serde(rename = "name")]
    pub identifier: RecipeIdentifier,

    pub version: SemanticVersion,

    /// Source archive URL
    pub url: String,

    /// Archive hash; absent until the first install pins it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<Sha256Hash>,

    #[serde(rename = "sub-path", default, skip_serializing_if = "Option::is_none")]
    pub sub_path: Option<String>,

    #[serde(rename = "buck-url", default, skip_serializing_if = "Option::is_none")]
    pub buck_url: Option<String>,

    #[serde(rename = "buck-sha256", default, skip_serializing_if = "Option::is_none")]
    pub buck_sha256: Option<Sha256Hash>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    /// Packages this one was resolved against
    #[serde(default)]
    pub dependencies: Vec<RecipeIdentifier>,
}

impl DependencyLock {
    pub fn from_resolved(resolved: &ResolvedDependency) -> Self {
        let recipe_version = &resolved.recipe_version;
        Self {
            identifier: resolved.identifier.clone(),
            version: resolved.version.clone(),
            url: recipe_version.url.clone(),
            sha256: recipe_version.sha256.clone(),
            sub_path: recipe_version.sub_path.clone(),
            buck_url: recipe_version.buck_url.clone(),
            buck_sha256: recipe_version.buck_sha256.clone(),
            target: recipe_version.target.clone(),
            dependencies: recipe_version.dependencies.keys().cloned().collect(),
        }
    }

    /// The archive as a verifiable download, once its hash is pinned
    pub fn archive(&self) -> Option<RemoteArchive> {
        self.sha256.as_ref().map(|sha256| {
            RemoteArchive::new(
                RemoteFile::new(self.url.clone(), sha256.clone()),
                self.sub_path.clone(),
            )
        })
    }

    /// Folder under `buckaroo/` this package is installed into
    pub fn folder_name(&self) -> String {
        self.identifier.folder_name()
    }

    /// Name of a download cached beside the package folder
    ///
    /// Carries the version, so a lock that moved to another version never
    /// finds the previous version's download.
    pub fn cache_file_name(&self, extension: &str) -> String {
        format!("{}-{}.{}", self.folder_name(), self.version, extension)
    }

    /// Version of a [`cache_file_name`](Self::cache_file_name) of this
    /// package, if `file_name` is one
    pub fn cached_version(&self, file_name: &str, extension: &str) -> Option<SemanticVersion> {
        let rest = file_name.strip_prefix(&self.folder_name())?.strip_prefix('-')?;
        let version = rest.strip_suffix(extension)?.strip_suffix('.')?;
        SemanticVersion::parse(version).ok()
    }

    /// Build target other packages use to depend on this one
    ///
    /// Defaults to the recipe name when the recipe declares no target.
    pub fn reference(&self) -> ResolvedDependencyReference {
        ResolvedDependencyReference::new(
            self.folder_name(),
            self.target
                .clone()
                .unwrap_or_else(|| self.identifier.recipe.to_string()),
        )
    }
}

/// All locks of a project, in resolution order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DependencyLocks(Vec<DependencyLock>);

impl DependencyLocks {
    pub fn new(locks: Vec<DependencyLock>) -> Self {
        Self(locks)
    }

    pub fn from_resolution(resolution: &Resolution) -> Self {
        Self(resolution.iter().map(DependencyLock::from_resolved).collect())
    }

    pub fn iter(&self) -> impl Iterator<Item = &DependencyLock> {
        self.0.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut DependencyLock> {
        self.0.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, identifier: &RecipeIdentifier) -> Option<&DependencyLock> {
        self.0.iter().find(|lock| &lock.identifier == identifier)
    }

    /// References for the given packages, skipping any that are not locked
    pub fn references<'a, I>(&self, identifiers: I) -> Vec<ResolvedDependencyReference>
    where
        I: IntoIterator<Item = &'a RecipeIdentifier>,
    {
        identifiers
            .into_iter()
            .filter_map(|id| self.get(id))
            .map(DependencyLock::reference)
            .collect()
    }

    /// Copy hashes pinned in `previous` onto entries that still name the
    /// same version at the same URL
    pub fn keep_pinned_hashes(&mut self, previous: &DependencyLocks) {
        for lock in self.0.iter_mut() {
            let Some(old) = previous.get(&lock.identifier) else {
                continue;
            };
            if old.version != lock.version || old.url != lock.url {
                continue;
            }
            if lock.sha256.is_none() {
                lock.sha256 = old.sha256.clone();
            }
            if lock.buck_sha256.is_none() && lock.buck_url == old.buck_url {
                lock.buck_sha256 = old.buck_sha256.clone();
            }
        }
    }

    pub fn parse(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| Error::ParseError(format!("Invalid lock file: {e}")))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)? + "\n")
    }
}

impl IntoIterator for DependencyLocks {
    type Item = DependencyLock;
    type IntoIter = std::vec::IntoIter<DependencyLock>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
