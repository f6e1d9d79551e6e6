// src/source/cookbook.rs
//! Local cookbook: recipe documents on disk
//!
//! Layout: `<root>/recipes/<organization>/<recipe>.json`, each file a recipe
//! document.

use super::RecipeSource;
use crate::error::{Error, FetchRecipeReason, Result};
use crate::model::{Identifier, Recipe, RecipeIdentifier};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Directory under the cookbook root holding the recipes
const RECIPES_DIR: &str = "recipes";

pub struct CookbookRecipeSource {
    name: Identifier,
    root: PathBuf,
}

impl CookbookRecipeSource {
    pub fn new(name: Identifier, root: impl AsRef<Path>) -> Self {
        Self {
            name,
            root: root.as_ref().to_path_buf(),
        }
    }

    fn recipe_path(&self, identifier: &RecipeIdentifier) -> PathBuf {
        self.root
            .join(RECIPES_DIR)
            .join(identifier.organization.as_str())
            .join(format!("{}.json", identifier.recipe))
    }

    /// Every recipe in the cookbook, tagged with the cookbook's name
    ///
    /// Files whose names are not valid identifiers are skipped.
    pub async fn list(&self) -> Result<Vec<RecipeIdentifier>> {
        let recipes_dir = self.root.join(RECIPES_DIR);
        let mut found = Vec::new();

        let mut organizations = match tokio::fs::read_dir(&recipes_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(found),
            Err(e) => {
                return Err(Error::IoError(format!(
                    "Failed to read {}: {e}",
                    recipes_dir.display()
                )))
            }
        };

        while let Some(organization) = organizations.next_entry().await? {
            if !organization.file_type().await?.is_dir() {
                continue;
            }
            let Ok(org) = Identifier::new(organization.file_name().to_string_lossy()) else {
                continue;
            };

            let mut recipes = tokio::fs::read_dir(organization.path()).await?;
            while let Some(recipe) = recipes.next_entry().await? {
                let path = recipe.path();
                if path.extension().is_none_or(|ext| ext != "json") {
                    continue;
                }
                let Some(stem) = path.file_stem() else {
                    continue;
                };
                if let Ok(name) = Identifier::new(stem.to_string_lossy()) {
                    found.push(RecipeIdentifier::with_source(
                        self.name.clone(),
                        org.clone(),
                        name,
                    ));
                }
            }
        }

        found.sort();
        Ok(found)
    }
}

#[async_trait]
impl RecipeSource for CookbookRecipeSource {
    async fn fetch(&self, identifier: &RecipeIdentifier) -> Result<Recipe> {
        let path = self.recipe_path(identifier);
        debug!("Looking for {} at {}", identifier, path.display());

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::FetchRecipe {
                    identifier: identifier.clone(),
                    reason: FetchRecipeReason::NotFound,
                })
            }
            Err(e) => {
                return Err(Error::IoError(format!("Failed to read {}: {e}", path.display())))
            }
        };

        serde_json::from_str(&content)
            .map_err(|e| Error::ParseError(format!("Invalid recipe {}: {e}", path.display())))
    }

    fn handles(&self, identifier: &RecipeIdentifier) -> bool {
        identifier
            .source
            .as_ref()
            .is_none_or(|source| *source == self.name)
    }

    fn name(&self) -> &str {
        self.name.as_str()
    }
}
