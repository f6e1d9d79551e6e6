// src/source/mod.rs

//! Recipe sources: where the resolver learns which versions exist
//!
//! A [`RecipeSource`] turns a [`RecipeIdentifier`] into a [`Recipe`]. Sources
//! are composable:
//! - [`GitHubRecipeSource`]: versions from repository tags, metadata from the
//!   project file at each tagged commit
//! - [`CookbookRecipeSource`]: recipe documents in a local directory
//! - [`CompositeRecipeSource`]: tries several sources in order
//!
//! [`standard`] builds the composite described by the user's config.

mod composite;
mod cookbook;
mod github;

pub use composite::CompositeRecipeSource;
pub use cookbook::CookbookRecipeSource;
pub use github::{GitHost, GitHubClient, GitHubRecipeSource, PROJECT_FILE_PATH};

use crate::config::Config;
use crate::error::Result;
use crate::events::EventSink;
use crate::model::{Recipe, RecipeIdentifier};
use async_trait::async_trait;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Looks up the recipe for a package
#[async_trait]
pub trait RecipeSource: Send + Sync {
    /// Fetch the full version catalog for `identifier`
    async fn fetch(&self, identifier: &RecipeIdentifier) -> Result<Recipe>;

    /// Whether this source serves `identifier` at all
    ///
    /// Routing is by the identifier's source tag. The default serves everything.
    fn handles(&self, _identifier: &RecipeIdentifier) -> bool {
        true
    }

    /// Human-readable name for logging and error aggregation
    fn name(&self) -> &str;
}

/// Configured cookbooks, in order, followed by GitHub
pub fn standard(
    config: &Config,
    cancel: &CancellationToken,
    events: &EventSink,
) -> Result<CompositeRecipeSource> {
    let mut composite = CompositeRecipeSource::new(Vec::new());

    for cookbook in &config.cookbooks {
        composite.add_source(Arc::new(CookbookRecipeSource::new(
            cookbook.name.clone(),
            cookbook.path.clone(),
        )));
    }

    let client = GitHubClient::new(
        &config.github,
        config.network.fetch_policy(),
        cancel.clone(),
        events.clone(),
    )?;
    composite.add_source(Arc::new(GitHubRecipeSource::new(Arc::new(client))));

    Ok(composite)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CookbookConfig;
    use crate::model::Identifier;

    #[test]
    fn test_standard_orders_cookbooks_first() {
        let config = Config {
            cookbooks: vec![CookbookConfig {
                name: Identifier::new("local").unwrap(),
                path: "/tmp/cookbook".into(),
            }],
            ..Config::default()
        };

        let source = standard(&config, &CancellationToken::new(), &EventSink::silent()).unwrap();
        assert_eq!(source.source_names(), vec!["local", "github"]);
    }
}
