// src/commands/query.rs
//! Read-only commands: inspect what the sources publish

use super::Session;
use anyhow::Result;
use buckaroo::model::RecipeIdentifier;
use buckaroo::source::{CookbookRecipeSource, GitHubClient, GitHubRecipeSource};
use buckaroo::version::SemanticVersion;
use std::sync::Arc;

/// Print every tag of a GitHub repository with its commit and version
pub async fn cmd_tags(session: Session, identifier: String) -> Result<()> {
    let identifier = RecipeIdentifier::parse(&identifier)?;
    let config = session.config();
    let client = GitHubClient::new(
        &config.github,
        config.network.fetch_policy(),
        session.context.cancel.clone(),
        session.events.clone(),
    )?;
    let source = GitHubRecipeSource::new(Arc::new(client));

    let result = source
        .fetch_tags(&identifier.organization, &identifier.recipe)
        .await;
    session.finish();

    let tags = result?;
    if tags.is_empty() {
        println!("{} has no tags", identifier);
        return Ok(());
    }

    for (tag, commit) in &tags {
        match SemanticVersion::from_tag(tag) {
            Some(version) => println!("{:<20} {}  {}", tag, commit, version),
            None => println!("{:<20} {}", tag, commit),
        }
    }
    Ok(())
}

/// Print the recipe the resolver would see
pub async fn cmd_recipe(session: Session, identifier: String) -> Result<()> {
    let identifier = RecipeIdentifier::parse(&identifier)?;
    let result = session.context.source.fetch(&identifier).await;
    session.finish();

    let recipe = result?;
    println!("{} ({})", recipe.name, recipe.url);
    for (version, recipe_version) in &recipe.versions {
        println!("  {:<12} {}", version.to_string(), recipe_version.url);
        for (dependency, requirement) in &recipe_version.dependencies {
            println!("      {} {}", dependency, requirement);
        }
    }
    Ok(())
}

/// List the recipes of every configured cookbook
pub async fn cmd_recipes(session: Session) -> Result<()> {
    let mut found = Vec::new();
    for cookbook in &session.config().cookbooks {
        let source = CookbookRecipeSource::new(cookbook.name.clone(), &cookbook.path);
        found.extend(source.list().await?);
    }
    session.finish();

    if found.is_empty() {
        println!("No recipes found in configured cookbooks");
    }
    for identifier in found {
        println!("{}", identifier);
    }
    Ok(())
}
