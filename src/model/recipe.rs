// src/model/recipe.rs

//! Recipes: a package's catalog of versions and where to fetch each one
//!
//! # Format
//!
//! ```json
//! {
//!   "name": "test-lib-c",
//!   "url": "https://github.com/njlr/test-lib-c",
//!   "versions": {
//!     "1.0.0": {
//!       "url": "https://github.com/njlr/test-lib-c/archive/<commit>.zip",
//!       "sha256": "…",
//!       "sub-path": "test-lib-c-<commit>",
//!       "buck-url": "https://example.com/BUCK",
//!       "target": "test-lib-c",
//!       "dependencies": { "github+njlr/test-lib-a": "^1.0" }
//!     }
//!   }
//! }
//! ```

use super::identifier::{Identifier, RecipeIdentifier};
use crate::hash::Sha256Hash;
use crate::version::{SemanticVersion, SemanticVersionRequirement};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Requirements keyed by package, ordered for deterministic traversal
pub type Dependencies = BTreeMap<RecipeIdentifier, SemanticVersionRequirement>;

/// A file at a URL with a known content hash
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemoteFile {
    pub url: String,
    pub sha256: Sha256Hash,
}

impl RemoteFile {
    pub fn new(url: impl Into<String>, sha256: Sha256Hash) -> Self {
        Self {
            url: url.into(),
            sha256,
        }
    }
}

/// A zip archive, optionally only a sub-directory of it
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemoteArchive {
    #[serde(flatten)]
    pub file: RemoteFile,
    #[serde(rename = "sub-path", default, skip_serializing_if = "Option::is_none")]
    pub sub_path: Option<String>,
}

impl RemoteArchive {
    pub fn new(file: RemoteFile, sub_path: Option<String>) -> Self {
        Self { file, sub_path }
    }

    pub fn as_remote_file(&self) -> &RemoteFile {
        &self.file
    }
}

/// Metadata for one concrete version of a package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeVersion {
    /// Source archive URL
    pub url: String,

    /// SHA-256 of the archive, when the publisher knows it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<Sha256Hash>,

    /// Directory inside the archive that holds the sources
    #[serde(rename = "sub-path", default, skip_serializing_if = "Option::is_none")]
    pub sub_path: Option<String>,

    /// Alternate build file to drop into the package folder
    #[serde(rename = "buck-url", default, skip_serializing_if = "Option::is_none")]
    pub buck_url: Option<String>,

    #[serde(rename = "buck-sha256", default, skip_serializing_if = "Option::is_none")]
    pub buck_sha256: Option<Sha256Hash>,

    /// Build target exported by the package
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub dependencies: Dependencies,
}

impl RecipeVersion {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            sha256: None,
            sub_path: None,
            buck_url: None,
            buck_sha256: None,
            target: None,
            dependencies: BTreeMap::new(),
        }
    }

    /// Builder: set the archive hash
    pub fn with_sha256(mut self, sha256: Sha256Hash) -> Self {
        self.sha256 = Some(sha256);
        self
    }

    /// Builder: set the archive sub-path
    pub fn with_sub_path(mut self, sub_path: impl Into<String>) -> Self {
        self.sub_path = Some(sub_path.into());
        self
    }

    /// Builder: set the build target
    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    /// Builder: set the alternate build file
    pub fn with_buck_url(mut self, url: impl Into<String>, sha256: Option<Sha256Hash>) -> Self {
        self.buck_url = Some(url.into());
        self.buck_sha256 = sha256;
        self
    }

    /// Builder: add a dependency requirement
    pub fn with_dependency(
        mut self,
        identifier: RecipeIdentifier,
        requirement: SemanticVersionRequirement,
    ) -> Self {
        self.dependencies.insert(identifier, requirement);
        self
    }
}

/// A package's full version catalog, as published by one source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipe {
    pub name: Identifier,
    pub url: String,
    pub versions: BTreeMap<SemanticVersion, RecipeVersion>,
}

impl Recipe {
    pub fn new(name: Identifier, url: impl Into<String>) -> Self {
        Self {
            name,
            url: url.into(),
            versions: BTreeMap::new(),
        }
    }

    /// Builder: add a version
    pub fn with_version(mut self, version: SemanticVersion, recipe_version: RecipeVersion) -> Self {
        self.versions.insert(version, recipe_version);
        self
    }

    pub fn get(&self, version: &SemanticVersion) -> Option<&RecipeVersion> {
        self.versions.get(version)
    }

    /// All published versions in ascending order
    pub fn available_versions(&self) -> impl Iterator<Item = &SemanticVersion> {
        self.versions.keys()
    }

    /// Highest version satisfying a requirement
    pub fn best_match(
        &self,
        requirement: &SemanticVersionRequirement,
    ) -> Option<(&SemanticVersion, &RecipeVersion)> {
        let version = requirement.highest(self.versions.keys())?;
        self.versions.get_key_value(version)
    }
}
