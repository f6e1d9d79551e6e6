// src/project.rs
//! The project document, `buckaroo.json`
//!
//! ```json
//! {
//!   "name": "my-app",
//!   "target": "my-app",
//!   "dependencies": {
//!     "github+njlr/test-lib-c": "^1.0"
//!   }
//! }
//! ```
//!
//! Packages published on GitHub carry the same document at each tagged
//! commit; its `target` and `dependencies` describe that version.

use crate::error::{Error, Result};
use crate::model::Dependencies;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Project file name
pub const PROJECT_FILE: &str = "buckaroo.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Build target other projects should depend on
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license: Option<String>,

    #[serde(default)]
    pub dependencies: Dependencies,
}

impl Project {
    /// An empty project named after the last component of `directory`
    pub fn for_directory(directory: &Path) -> Self {
        Self {
            name: directory
                .file_name()
                .map(|name| name.to_string_lossy().into_owned()),
            ..Self::default()
        }
    }

    pub fn parse(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| Error::ParseError(format!("Invalid project file: {e}")))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)? + "\n")
    }
}
