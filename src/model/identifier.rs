// src/model/identifier.rs

//! Package naming: identifiers, recipe identifiers and commit hashes

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

const IDENTIFIER_MIN_LEN: usize = 3;
const IDENTIFIER_MAX_LEN: usize = 30;

/// A validated name token: 3-30 characters of `[A-Za-z0-9_-]`
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Identifier(String);

impl Identifier {
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        let valid_len = (IDENTIFIER_MIN_LEN..=IDENTIFIER_MAX_LEN).contains(&value.len());
        let valid_chars = value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');

        if valid_len && valid_chars {
            Ok(Self(value))
        } else {
            Err(Error::InvalidIdentifier(value))
        }
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Identifier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

/// Fully-qualified package name: `[source+]organization/recipe`
///
/// The optional source names which recipe source should serve the package
/// (for example `github`, or the name of a cookbook).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RecipeIdentifier {
    pub source: Option<Identifier>,
    pub organization: Identifier,
    pub recipe: Identifier,
}

impl RecipeIdentifier {
    pub fn new(organization: Identifier, recipe: Identifier) -> Self {
        Self {
            source: None,
            organization,
            recipe,
        }
    }

    pub fn with_source(source: Identifier, organization: Identifier, recipe: Identifier) -> Self {
        Self {
            source: Some(source),
            organization,
            recipe,
        }
    }

    /// Parse `organization/recipe` or `source+organization/recipe`
    pub fn parse(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidRecipeIdentifier(s.to_string());
        let s = s.trim();

        let (source, rest) = match s.split_once('+') {
            Some((source, rest)) => (Some(Identifier::new(source).map_err(|_| invalid())?), rest),
            None => (None, s),
        };

        let (organization, recipe) = rest.split_once('/').ok_or_else(invalid)?;

        Ok(Self {
            source,
            organization: Identifier::new(organization).map_err(|_| invalid())?,
            recipe: Identifier::new(recipe).map_err(|_| invalid())?,
        })
    }

    /// Name of the folder this package is installed into
    ///
    /// `github+org/lib` → `github.org.lib`, `org/lib` → `org.lib`
    pub fn folder_name(&self) -> String {
        match &self.source {
            Some(source) => format!("{}.{}.{}", source, self.organization, self.recipe),
            None => format!("{}.{}", self.organization, self.recipe),
        }
    }
}

impl fmt::Display for RecipeIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(source) = &self.source {
            write!(f, "{}+", source)?;
        }
        write!(f, "{}/{}", self.organization, self.recipe)
    }
}

impl FromStr for RecipeIdentifier {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// A Git commit hash: 40 hex characters, stored lower-case
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GitCommitHash(String);

impl GitCommitHash {
    pub fn new(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        if value.len() == 40 && value.chars().all(|c| c.is_ascii_hexdigit()) {
            Ok(Self(value.to_lowercase()))
        } else {
            Err(Error::InvalidHash(value))
        }
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GitCommitHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for GitCommitHash {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

/// Serialize/deserialize a type through its `Display`/`FromStr` pair
macro_rules! string_serde {
    ($ty:ty) => {
        impl Serialize for $ty {
            fn serialize<S: Serializer>(
                &self,
                serializer: S,
            ) -> std::result::Result<S::Ok, S::Error> {
                serializer.collect_str(self)
            }
        }

        impl<'de> Deserialize<'de> for $ty {
            fn deserialize<D: Deserializer<'de>>(
                deserializer: D,
            ) -> std::result::Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                s.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

string_serde!(Identifier);
string_serde!(RecipeIdentifier);
string_serde!(GitCommitHash);
