// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.
//!
//! Everything here runs offline: recipes, Git hosts and downloads are served
//! from memory.

#![allow(dead_code)]

use async_trait::async_trait;
use buckaroo::{Error, FetchRecipeReason, Result};
use buckaroo::events::{Event, EventSink};
use buckaroo::model::{GitCommitHash, Identifier, Recipe, RecipeIdentifier, RecipeVersion};
use buckaroo::source::{GitHost, RecipeSource};
use buckaroo::version::{SemanticVersion, SemanticVersionRequirement};
use std::collections::{BTreeMap, HashMap};
use std::io::{Cursor, Write};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

pub fn id(s: &str) -> RecipeIdentifier {
    RecipeIdentifier::parse(s).unwrap()
}

pub fn version(s: &str) -> SemanticVersion {
    SemanticVersion::parse(s).unwrap()
}

pub fn req(s: &str) -> SemanticVersionRequirement {
    SemanticVersionRequirement::parse(s).unwrap()
}

pub fn commit(c: char) -> GitCommitHash {
    GitCommitHash::new(c.to_string().repeat(40)).unwrap()
}

/// Recipe for `identifier` with the given versions and their dependencies
///
/// Archive URLs follow `https://example.com/<folder>/<version>.zip`.
pub fn recipe(identifier: &str, versions: &[(&str, &[(&str, &str)])]) -> Recipe {
    let identifier = id(identifier);
    let mut recipe = Recipe::new(
        identifier.recipe.clone(),
        format!("https://example.com/{}", identifier.folder_name()),
    );
    for (v, dependencies) in versions {
        let mut recipe_version = RecipeVersion::new(archive_url(&identifier, v));
        for (dependency, requirement) in *dependencies {
            recipe_version = recipe_version.with_dependency(id(dependency), req(requirement));
        }
        recipe = recipe.with_version(version(v), recipe_version);
    }
    recipe
}

pub fn archive_url(identifier: &RecipeIdentifier, version: &str) -> String {
    format!("https://example.com/{}/{}.zip", identifier.folder_name(), version)
}

/// In-memory recipe source that counts fetches
#[derive(Default)]
pub struct MockRecipeSource {
    recipes: HashMap<RecipeIdentifier, Recipe>,
    fetches: Mutex<Vec<RecipeIdentifier>>,
}

impl MockRecipeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_recipe(mut self, identifier: &str, recipe: Recipe) -> Self {
        self.recipes.insert(id(identifier), recipe);
        self
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.lock().unwrap().len()
    }

    pub fn fetched(&self) -> Vec<RecipeIdentifier> {
        self.fetches.lock().unwrap().clone()
    }
}

#[async_trait]
impl RecipeSource for MockRecipeSource {
    async fn fetch(&self, identifier: &RecipeIdentifier) -> Result<Recipe> {
        self.fetches.lock().unwrap().push(identifier.clone());
        self.recipes
            .get(identifier)
            .cloned()
            .ok_or_else(|| Error::FetchRecipe {
                identifier: identifier.clone(),
                reason: FetchRecipeReason::NotFound,
            })
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Transport serving fixed bodies by URL and counting transfers
#[derive(Default)]
pub struct MemoryTransport {
    bodies: HashMap<String, Vec<u8>>,
    transfers: Mutex<HashMap<String, usize>>,
    failures_before_success: AtomicUsize,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_body(mut self, url: impl Into<String>, body: Vec<u8>) -> Self {
        self.bodies.insert(url.into(), body);
        self
    }

    /// Fail the next `n` transfers with a transient error
    pub fn with_transient_failures(self, n: usize) -> Self {
        self.failures_before_success.store(n, Ordering::SeqCst);
        self
    }

    pub fn transfers(&self, url: &str) -> usize {
        self.transfers.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub fn total_transfers(&self) -> usize {
        self.transfers.lock().unwrap().values().sum()
    }
}

#[async_trait]
impl buckaroo::acquire::Transport for MemoryTransport {
    async fn download(&self, url: &str, dest: &Path, events: &EventSink) -> Result<u64> {
        *self
            .transfers
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default() += 1;

        let pending = self.failures_before_success.load(Ordering::SeqCst);
        if pending > 0 {
            self.failures_before_success.store(pending - 1, Ordering::SeqCst);
            return Err(Error::DownloadError(format!("{url}: connection reset")));
        }

        let body = self
            .bodies
            .get(url)
            .ok_or_else(|| Error::NotFoundError(url.to_string()))?;
        events.emit(Event::DownloadStarted {
            url: url.to_string(),
            target: dest.to_path_buf(),
            total: Some(body.len() as u64),
        });
        tokio::fs::write(dest, body).await?;
        Ok(body.len() as u64)
    }
}

/// Zip archive bytes with the given `(path, contents)` entries
pub fn zip_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut zip = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, contents) in entries {
        zip.start_file(*name, zip::write::SimpleFileOptions::default())
            .unwrap();
        zip.write_all(contents.as_bytes()).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

/// Git host backed by maps
#[derive(Default)]
pub struct MockGitHost {
    tags: HashMap<(String, String), BTreeMap<String, GitCommitHash>>,
    files: HashMap<(String, String, GitCommitHash, String), String>,
    broken_files: bool,
}

impl MockGitHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a repository with its tags
    pub fn with_repository(mut self, org: &str, repo: &str, tags: &[(&str, GitCommitHash)]) -> Self {
        let tags = tags
            .iter()
            .map(|(tag, commit)| (tag.to_string(), commit.clone()))
            .collect();
        self.tags.insert((org.to_string(), repo.to_string()), tags);
        self
    }

    pub fn with_file(
        mut self,
        org: &str,
        repo: &str,
        commit: &GitCommitHash,
        path: &str,
        content: &str,
    ) -> Self {
        self.files.insert(
            (org.to_string(), repo.to_string(), commit.clone(), path.to_string()),
            content.to_string(),
        );
        self
    }

    /// Every file fetch fails with a transport error
    pub fn with_broken_files(mut self) -> Self {
        self.broken_files = true;
        self
    }
}

#[async_trait]
impl GitHost for MockGitHost {
    async fn list_tags(
        &self,
        organization: &Identifier,
        repository: &Identifier,
    ) -> Result<BTreeMap<String, GitCommitHash>> {
        self.tags
            .get(&(organization.to_string(), repository.to_string()))
            .cloned()
            .ok_or_else(|| Error::NotFoundError(format!("{organization}/{repository}")))
    }

    async fn fetch_file(
        &self,
        organization: &Identifier,
        repository: &Identifier,
        commit: &GitCommitHash,
        path: &str,
    ) -> Result<Option<String>> {
        if self.broken_files {
            return Err(Error::DownloadError("raw content unavailable".to_string()));
        }
        Ok(self
            .files
            .get(&(
                organization.to_string(),
                repository.to_string(),
                commit.clone(),
                path.to_string(),
            ))
            .cloned())
    }

    fn repository_url(&self, organization: &Identifier, repository: &Identifier) -> String {
        format!("https://github.com/{organization}/{repository}")
    }

    fn archive_url(
        &self,
        organization: &Identifier,
        repository: &Identifier,
        commit: &GitCommitHash,
    ) -> String {
        format!("https://github.com/{organization}/{repository}/archive/{commit}.zip")
    }
}
