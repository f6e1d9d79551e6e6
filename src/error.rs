// src/error.rs

//! Crate-wide error type
//!
//! Every fallible operation in the library returns [`Result`]. Variants carry
//! identifying data (identifiers, versions, hashes, paths) rather than
//! pre-formatted prose so callers can decide how to present them.

use crate::hash::Sha256Hash;
use crate::model::RecipeIdentifier;
use crate::version::{SemanticVersion, SemanticVersionRequirement};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Why a recipe could not be produced for an identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchRecipeReason {
    /// The repository exists but has no tags
    NoReleases,
    /// No tagged version carries a parseable project file
    NoProjectFile,
    /// The source does not know the repository or recipe
    NotFound,
    /// Transport failed after exhausting retries
    Transport(String),
    /// Every applicable source failed; one entry per source
    AllSourcesFailed(Vec<String>),
}

impl fmt::Display for FetchRecipeReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoReleases => write!(f, "repository has no releases"),
            Self::NoProjectFile => write!(f, "no release has a readable project file"),
            Self::NotFound => write!(f, "not found"),
            Self::Transport(msg) => write!(f, "transport failure: {}", msg),
            Self::AllSourcesFailed(errors) => {
                write!(f, "all sources failed ({})", errors.join("; "))
            }
        }
    }
}

/// Who introduced a requirement on a package
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Requirer {
    /// The project file itself
    Root,
    /// A selected version of another package
    Package(RecipeIdentifier),
}

impl fmt::Display for Requirer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Root => write!(f, "project"),
            Self::Package(id) => write!(f, "{}", id),
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Initialization error: {0}")]
    InitError(String),

    #[error("Not found: {0}")]
    NotFoundError(String),

    /// Network transfer failure; retried by callers
    #[error("Download error: {0}")]
    DownloadError(String),

    /// Rejected credentials or an exhausted rate limit; retrying cannot help
    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Invalid identifier '{0}': expected 3-30 characters of [A-Za-z0-9_-]")]
    InvalidIdentifier(String),

    #[error("Invalid recipe identifier '{0}'")]
    InvalidRecipeIdentifier(String),

    #[error("Invalid version '{0}'")]
    InvalidVersion(String),

    #[error("Invalid version requirement '{0}'")]
    InvalidRequirement(String),

    #[error("Invalid hash '{0}'")]
    InvalidHash(String),

    #[error("Failed to fetch recipe {identifier}: {reason}")]
    FetchRecipe {
        identifier: RecipeIdentifier,
        reason: FetchRecipeReason,
    },

    #[error(
        "No version of {identifier} satisfies {requirement} (required by {}; available: {})",
        .required_by.iter().map(|(by, req)| format!("{} -> {}", by, req)).collect::<Vec<_>>().join(", "),
        .available.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
    )]
    UnsatisfiableVersion {
        identifier: RecipeIdentifier,
        requirement: SemanticVersionRequirement,
        required_by: Vec<(Requirer, SemanticVersionRequirement)>,
        available: Vec<SemanticVersion>,
    },

    #[error("Resolution did not converge: {identifier} was re-opened {reopened} times")]
    ResolutionDidNotConverge {
        identifier: RecipeIdentifier,
        reopened: u32,
    },

    #[error("Hash mismatch for {}: expected {expected}, got {actual}", .path.display())]
    HashMismatch {
        path: PathBuf,
        expected: Sha256Hash,
        actual: Sha256Hash,
    },

    #[error("There is already something at {}", .path.display())]
    AlreadyExists { path: PathBuf },

    #[error("Archive error: {0}")]
    ArchiveError(String),
}

impl Error {
    /// Transport-level failures that are worth another attempt
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::DownloadError(_) | Self::Timeout(_))
    }

    /// Error for an unsuccessful HTTP status other than 404
    pub fn from_http_status(status: u16, url: &str) -> Self {
        match status {
            401 | 403 => Self::AccessDenied(format!("HTTP {} from {}", status, url)),
            _ => Self::DownloadError(format!("HTTP {} from {}", status, url)),
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::IoError(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::ParseError(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(Error::DownloadError("reset".to_string()).is_transient());
        assert!(Error::Timeout(Duration::from_secs(1)).is_transient());
        assert!(!Error::Cancelled.is_transient());
        assert!(!Error::NotFoundError("x".to_string()).is_transient());
    }

    #[test]
    fn test_http_status_classification() {
        let url = "https://api.github.com/repos/acme/http/tags";
        assert!(matches!(Error::from_http_status(401, url), Error::AccessDenied(_)));
        assert!(!Error::from_http_status(403, url).is_transient());
        assert!(Error::from_http_status(502, url).is_transient());
        assert!(Error::from_http_status(429, url).is_transient());
    }

    #[test]
    fn test_fetch_reason_display() {
        let reason = FetchRecipeReason::AllSourcesFailed(vec!["a".into(), "b".into()]);
        assert_eq!(reason.to_string(), "all sources failed (a; b)");
        assert_eq!(FetchRecipeReason::NoReleases.to_string(), "repository has no releases");
    }
}
