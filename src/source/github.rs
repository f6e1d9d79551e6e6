// src/source/github.rs

//! GitHub-hosted recipes
//!
//! A repository is a package. Each tag whose name parses as a semantic
//! version (optionally prefixed with `v`) is a release; the project file at
//! the tag's commit supplies that version's target and dependencies. The
//! source archive is GitHub's zip of the commit, whose single top-level folder
//! is `<repository>-<commit>`.
//!
//! Network access goes through the [`GitHost`] trait so the recipe-building
//! logic can run against recorded data.

use super::RecipeSource;
use crate::config::GitHubConfig;
use crate::error::{Error, FetchRecipeReason, Result};
use crate::events::EventSink;
use crate::model::{GitCommitHash, Identifier, Recipe, RecipeIdentifier, RecipeVersion};
use crate::project::Project;
use crate::retry::{with_retry, RetryPolicy};
use crate::version::SemanticVersion;
use async_trait::async_trait;
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Path of the project file inside a repository
pub const PROJECT_FILE_PATH: &str = "buckaroo.json";

/// Tags requested per page of the listing
const TAGS_PER_PAGE: usize = 100;

/// Project files fetched at once for one recipe
const MAX_CONCURRENT_FILE_FETCHES: usize = 8;

/// Read-only view of a Git hosting service
#[async_trait]
pub trait GitHost: Send + Sync {
    /// All tags of a repository, tag name → commit
    ///
    /// An unknown repository is `Error::NotFoundError`.
    async fn list_tags(
        &self,
        organization: &Identifier,
        repository: &Identifier,
    ) -> Result<BTreeMap<String, GitCommitHash>>;

    /// Contents of `path` at `commit`, or `None` if there is no such file
    async fn fetch_file(
        &self,
        organization: &Identifier,
        repository: &Identifier,
        commit: &GitCommitHash,
        path: &str,
    ) -> Result<Option<String>>;

    /// Browsable URL of the repository
    fn repository_url(&self, organization: &Identifier, repository: &Identifier) -> String;

    /// Zip archive of the repository at `commit`
    fn archive_url(
        &self,
        organization: &Identifier,
        repository: &Identifier,
        commit: &GitCommitHash,
    ) -> String;
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    name: String,
    commit: TagCommit,
}

#[derive(Debug, Deserialize)]
struct TagCommit {
    sha: String,
}

/// [`GitHost`] backed by the GitHub REST API and raw content endpoint
pub struct GitHubClient {
    client: reqwest::Client,
    api_url: String,
    raw_url: String,
    archive_url: String,
    token: Option<String>,
    policy: RetryPolicy,
    cancel: CancellationToken,
    events: EventSink,
}

impl GitHubClient {
    pub fn new(
        config: &GitHubConfig,
        policy: RetryPolicy,
        cancel: CancellationToken,
        events: EventSink,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("buckaroo/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::InitError(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_url: config.api_url.trim_end_matches('/').to_string(),
            raw_url: config.raw_url.trim_end_matches('/').to_string(),
            archive_url: config.archive_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            policy,
            cancel,
            events,
        })
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        let request = self.client.get(url);
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// One GET; 404 is `Ok(None)`, 401 and 403 deny access, other failures
    /// are download errors
    async fn get_text(&self, url: &str) -> Result<Option<String>> {
        let response = self
            .get(url)
            .send()
            .await
            .map_err(|e| Error::DownloadError(format!("Failed to fetch {}: {e}", url)))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(Error::from_http_status(response.status().as_u16(), url));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::DownloadError(format!("Failed to read {}: {e}", url)))?;
        Ok(Some(body))
    }

    async fn tags_page(&self, url: &str) -> Result<Option<Vec<TagEntry>>> {
        match self.get_text(url).await? {
            Some(body) => serde_json::from_str(&body)
                .map(Some)
                .map_err(|e| Error::ParseError(format!("Invalid tag listing from {}: {e}", url))),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl GitHost for GitHubClient {
    async fn list_tags(
        &self,
        organization: &Identifier,
        repository: &Identifier,
    ) -> Result<BTreeMap<String, GitCommitHash>> {
        let what = format!("tag listing for {}/{}", organization, repository);
        let what = what.as_str();

        let entries = collect_tag_pages(move |page| {
            let url = format!(
                "{}/repos/{}/{}/tags?per_page={}&page={}",
                self.api_url, organization, repository, TAGS_PER_PAGE, page
            );
            async move {
                with_retry(&self.policy, &self.cancel, &self.events, what, || {
                    self.tags_page(&url)
                })
                .await
            }
        })
        .await?
        .ok_or_else(|| Error::NotFoundError(format!("Repository {}/{}", organization, repository)))?;

        let mut tags = BTreeMap::new();
        for entry in entries {
            match GitCommitHash::new(&entry.commit.sha) {
                Ok(commit) => {
                    tags.insert(entry.name, commit);
                }
                Err(_) => warn!("Ignoring tag {} with bad commit {}", entry.name, entry.commit.sha),
            }
        }

        debug!("{}/{} has {} tags", organization, repository, tags.len());
        Ok(tags)
    }

    async fn fetch_file(
        &self,
        organization: &Identifier,
        repository: &Identifier,
        commit: &GitCommitHash,
        path: &str,
    ) -> Result<Option<String>> {
        let url = format!(
            "{}/{}/{}/{}/{}",
            self.raw_url, organization, repository, commit, path
        );
        with_retry(&self.policy, &self.cancel, &self.events, &url, || {
            self.get_text(&url)
        })
        .await
    }

    fn repository_url(&self, organization: &Identifier, repository: &Identifier) -> String {
        format!("{}/{}/{}", self.archive_url, organization, repository)
    }

    fn archive_url(
        &self,
        organization: &Identifier,
        repository: &Identifier,
        commit: &GitCommitHash,
    ) -> String {
        format!(
            "{}/{}/{}/archive/{}.zip",
            self.archive_url, organization, repository, commit
        )
    }
}

/// Drain a paginated tag listing, starting at page 1
///
/// A missing first page means the repository does not exist. The listing
/// ends at the first page shorter than [`TAGS_PER_PAGE`].
async fn collect_tag_pages<F, Fut>(mut fetch_page: F) -> Result<Option<Vec<TagEntry>>>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<Option<Vec<TagEntry>>>>,
{
    let mut entries = Vec::new();
    let mut page = 1;

    loop {
        let Some(batch) = fetch_page(page).await? else {
            return Ok((page > 1).then_some(entries));
        };
        let count = batch.len();
        entries.extend(batch);

        if count < TAGS_PER_PAGE {
            return Ok(Some(entries));
        }
        page += 1;
    }
}

/// Recipe source for `github+org/repo` (and untagged) identifiers
pub struct GitHubRecipeSource {
    host: Arc<dyn GitHost>,
}

impl GitHubRecipeSource {
    pub fn new(host: Arc<dyn GitHost>) -> Self {
        Self { host }
    }

    /// Tag name → commit, exactly as the host reports it
    pub async fn fetch_tags(
        &self,
        organization: &Identifier,
        repository: &Identifier,
    ) -> Result<BTreeMap<String, GitCommitHash>> {
        self.host.list_tags(organization, repository).await
    }

    /// Versioned releases, one per version
    ///
    /// When two tags name the same version (`v1.0` and `1.0.0`) the tag that
    /// sorts first wins.
    pub fn releases(tags: &BTreeMap<String, GitCommitHash>) -> BTreeMap<SemanticVersion, GitCommitHash> {
        let mut releases = BTreeMap::new();
        for (tag, commit) in tags {
            match SemanticVersion::from_tag(tag) {
                Some(version) => {
                    releases.entry(version).or_insert_with(|| commit.clone());
                }
                None => debug!("Ignoring non-version tag {}", tag),
            }
        }
        releases
    }

    async fn project_at(
        &self,
        identifier: &RecipeIdentifier,
        commit: &GitCommitHash,
    ) -> Result<Option<Project>> {
        let content = self
            .host
            .fetch_file(
                &identifier.organization,
                &identifier.recipe,
                commit,
                PROJECT_FILE_PATH,
            )
            .await?;

        Ok(content.and_then(|content| match Project::parse(&content) {
            Ok(project) => Some(project),
            Err(e) => {
                warn!("Unreadable project file for {} at {}: {}", identifier, commit, e);
                None
            }
        }))
    }
}

/// Map host failures onto the recipe-unavailable taxonomy
fn fetch_error(identifier: &RecipeIdentifier, error: Error) -> Error {
    let reason = match error {
        Error::Cancelled => return Error::Cancelled,
        Error::FetchRecipe { .. } => return error,
        Error::NotFoundError(_) => FetchRecipeReason::NotFound,
        other => FetchRecipeReason::Transport(other.to_string()),
    };
    Error::FetchRecipe {
        identifier: identifier.clone(),
        reason,
    }
}

#[async_trait]
impl RecipeSource for GitHubRecipeSource {
    async fn fetch(&self, identifier: &RecipeIdentifier) -> Result<Recipe> {
        let organization = &identifier.organization;
        let repository = &identifier.recipe;
        let unavailable = |reason| Error::FetchRecipe {
            identifier: identifier.clone(),
            reason,
        };

        let tags = self
            .fetch_tags(organization, repository)
            .await
            .map_err(|e| fetch_error(identifier, e))?;
        if tags.is_empty() {
            return Err(unavailable(FetchRecipeReason::NoReleases));
        }

        let releases = Self::releases(&tags);
        if releases.is_empty() {
            return Err(unavailable(FetchRecipeReason::NoReleases));
        }

        // Several versions may share a commit; fetch each commit once
        let mut commits: Vec<GitCommitHash> = releases.values().cloned().collect();
        commits.sort();
        commits.dedup();

        let projects: HashMap<GitCommitHash, Option<Project>> = stream::iter(commits)
            .map(|commit| async move {
                let project = self.project_at(identifier, &commit).await?;
                Ok::<_, Error>((commit, project))
            })
            .buffer_unordered(MAX_CONCURRENT_FILE_FETCHES)
            .try_collect()
            .await
            .map_err(|e| fetch_error(identifier, e))?;

        let mut recipe = Recipe::new(
            repository.clone(),
            self.host.repository_url(organization, repository),
        );

        for (version, commit) in &releases {
            let Some(Some(project)) = projects.get(commit) else {
                debug!("{} {} has no project file, skipping", identifier, version);
                continue;
            };

            let mut recipe_version =
                RecipeVersion::new(self.host.archive_url(organization, repository, commit))
                    .with_sub_path(format!("{}-{}", repository, commit));
            recipe_version.target = project.target.clone();
            recipe_version.dependencies = project.dependencies.clone();

            recipe.versions.insert(version.clone(), recipe_version);
        }

        if recipe.versions.is_empty() {
            return Err(unavailable(FetchRecipeReason::NoProjectFile));
        }

        info!("Found {} versions of {}", recipe.versions.len(), identifier);
        Ok(recipe)
    }

    fn handles(&self, identifier: &RecipeIdentifier) -> bool {
        identifier
            .source
            .as_ref()
            .is_none_or(|source| source.as_str() == "github")
    }

    fn name(&self) -> &str {
        "github"
    }
}
