// src/source/composite.rs
//! Composite recipe source that tries several sources in order

use super::RecipeSource;
use crate::error::{Error, FetchRecipeReason, Result};
use crate::model::{Recipe, RecipeIdentifier};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Tries each applicable source in turn and returns the first recipe found
///
/// A source is applicable when it [`handles`](RecipeSource::handles) the
/// identifier. When a single source was applicable its error is returned
/// as-is; when several were tried and all failed, their errors are aggregated
/// into [`FetchRecipeReason::AllSourcesFailed`].
pub struct CompositeRecipeSource {
    sources: Vec<Arc<dyn RecipeSource>>,
}

impl CompositeRecipeSource {
    pub fn new(sources: Vec<Arc<dyn RecipeSource>>) -> Self {
        Self { sources }
    }

    /// Append a source to the end of the chain
    pub fn add_source(&mut self, source: Arc<dyn RecipeSource>) {
        self.sources.push(source);
    }

    pub fn source_names(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.name()).collect()
    }
}

#[async_trait]
impl RecipeSource for CompositeRecipeSource {
    async fn fetch(&self, identifier: &RecipeIdentifier) -> Result<Recipe> {
        let mut failures: Vec<(String, Error)> = Vec::new();

        for source in self.sources.iter().filter(|s| s.handles(identifier)) {
            match source.fetch(identifier).await {
                Ok(recipe) => return Ok(recipe),
                Err(Error::Cancelled) => return Err(Error::Cancelled),
                Err(e) => {
                    debug!("Source '{}' failed for {}: {}", source.name(), identifier, e);
                    failures.push((source.name().to_string(), e));
                }
            }
        }

        if failures.len() == 1 {
            if let Some((_, error)) = failures.pop() {
                return Err(error);
            }
        }

        let reason = if failures.is_empty() {
            FetchRecipeReason::NotFound
        } else {
            FetchRecipeReason::AllSourcesFailed(
                failures
                    .into_iter()
                    .map(|(name, e)| format!("{}: {}", name, e))
                    .collect(),
            )
        };

        Err(Error::FetchRecipe {
            identifier: identifier.clone(),
            reason,
        })
    }

    fn handles(&self, identifier: &RecipeIdentifier) -> bool {
        self.sources.iter().any(|s| s.handles(identifier))
    }

    fn name(&self) -> &str {
        "composite"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Identifier;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedSource {
        name: &'static str,
        tag: Option<&'static str>,
        recipe: Option<Recipe>,
        calls: AtomicUsize,
    }

    impl FixedSource {
        fn new(name: &'static str, tag: Option<&'static str>, recipe: Option<Recipe>) -> Arc<Self> {
            Arc::new(Self {
                name,
                tag,
                recipe,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl RecipeSource for FixedSource {
        async fn fetch(&self, identifier: &RecipeIdentifier) -> Result<Recipe> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.recipe.clone().ok_or_else(|| Error::FetchRecipe {
                identifier: identifier.clone(),
                reason: FetchRecipeReason::NotFound,
            })
        }

        fn handles(&self, identifier: &RecipeIdentifier) -> bool {
            match (&identifier.source, self.tag) {
                (None, _) => true,
                (Some(source), Some(tag)) => source.as_str() == tag,
                (Some(_), None) => false,
            }
        }

        fn name(&self) -> &str {
            self.name
        }
    }

    fn recipe() -> Recipe {
        Recipe::new(Identifier::new("lib").unwrap(), "https://example.com/lib")
    }

    #[tokio::test]
    async fn test_first_success_wins() {
        let empty = FixedSource::new("empty", Some("one"), None);
        let full = FixedSource::new("full", Some("two"), Some(recipe()));
        let composite = CompositeRecipeSource::new(vec![empty.clone(), full.clone()]);

        let id = RecipeIdentifier::parse("org/lib").unwrap();
        assert_eq!(composite.fetch(&id).await.unwrap(), recipe());
        assert_eq!(empty.calls.load(Ordering::SeqCst), 1);
        assert_eq!(full.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_routes_by_source_tag() {
        let one = FixedSource::new("one", Some("one"), Some(recipe()));
        let two = FixedSource::new("two", Some("two"), Some(recipe()));
        let composite = CompositeRecipeSource::new(vec![one.clone(), two.clone()]);

        let id = RecipeIdentifier::parse("two+org/lib").unwrap();
        composite.fetch(&id).await.unwrap();
        assert_eq!(one.calls.load(Ordering::SeqCst), 0);
        assert_eq!(two.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_aggregates_failures() {
        let composite = CompositeRecipeSource::new(vec![
            FixedSource::new("a", Some("aaa"), None),
            FixedSource::new("b", Some("bbb"), None),
        ]);

        let id = RecipeIdentifier::parse("org/lib").unwrap();
        match composite.fetch(&id).await {
            Err(Error::FetchRecipe {
                reason: FetchRecipeReason::AllSourcesFailed(errors),
                ..
            }) => {
                assert_eq!(errors.len(), 2);
                assert!(errors[0].starts_with("a: "));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_single_failure_passes_through() {
        let composite =
            CompositeRecipeSource::new(vec![FixedSource::new("only", Some("only"), None)]);

        let id = RecipeIdentifier::parse("only+org/lib").unwrap();
        assert!(matches!(
            composite.fetch(&id).await,
            Err(Error::FetchRecipe {
                reason: FetchRecipeReason::NotFound,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_no_applicable_source() {
        let composite =
            CompositeRecipeSource::new(vec![FixedSource::new("only", Some("only"), None)]);
        let id = RecipeIdentifier::parse("other+org/lib").unwrap();

        assert!(!composite.handles(&id));
        assert!(matches!(
            composite.fetch(&id).await,
            Err(Error::FetchRecipe {
                reason: FetchRecipeReason::NotFound,
                ..
            })
        ));
    }
}
