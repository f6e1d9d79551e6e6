// src/model/mod.rs

//! Value types shared by the resolver, recipe sources and acquisition
//!
//! Everything here is immutable once built and compares by value.

mod identifier;
mod recipe;

pub use identifier::{GitCommitHash, Identifier, RecipeIdentifier};
pub use recipe::{Dependencies, Recipe, RecipeVersion, RemoteArchive, RemoteFile};
