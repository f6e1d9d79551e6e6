// src/buck.rs
//! Glue for the Buck build system
//!
//! Installed packages live under `buckaroo/<folder>` and expose one build
//! target each. Projects pick them up through a generated `BUCKAROO_DEPS`
//! file listing those targets.

use std::fmt;

/// Name of the generated dependency list file
pub const BUCKAROO_DEPS_FILE: &str = "BUCKAROO_DEPS";

/// Directory, relative to the project root, holding installed packages
pub const PACKAGES_DIR: &str = "buckaroo";

/// Build file name inside a package folder
pub const BUCK_FILE: &str = "BUCK";

/// Header written at the top of generated files
const GENERATED_HEADER: &str = "# Generated by Buckaroo, do not edit!\n\
                                # This file should not be tracked in source-control.\n";

/// An installed package's folder and target
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedDependencyReference {
    pub folder: String,
    pub target: String,
}

impl ResolvedDependencyReference {
    pub fn new(folder: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            folder: folder.into(),
            target: target.into(),
        }
    }

    /// Buck target: `//buckaroo/<folder>:<target>`
    pub fn encode(&self) -> String {
        format!("//{}/{}:{}", PACKAGES_DIR, self.folder, self.target)
    }
}

impl fmt::Display for ResolvedDependencyReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

/// A Python string literal in single quotes
fn quote(s: &str) -> String {
    let escaped = s.replace('\\', "\\\\").replace('\'', "\\'");
    format!("'{}'", escaped)
}

/// Contents of a `BUCKAROO_DEPS` file
pub fn generate_buckaroo_deps(dependencies: &[ResolvedDependencyReference]) -> String {
    let mut out = String::from(GENERATED_HEADER);

    if dependencies.is_empty() {
        out.push_str("BUCKAROO_DEPS = []\n");
        return out;
    }

    out.push_str("BUCKAROO_DEPS = [\n");
    for dependency in dependencies {
        out.push_str("  ");
        out.push_str(&quote(&dependency.encode()));
        out.push_str(",\n");
    }
    out.push_str("]\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode() {
        let reference = ResolvedDependencyReference::new("github.njlr.test-lib-a", "test-lib-a");
        assert_eq!(reference.encode(), "//buckaroo/github.njlr.test-lib-a:test-lib-a");
        assert_eq!(reference.to_string(), reference.encode());
    }

    #[test]
    fn test_generate_deps() {
        let deps = generate_buckaroo_deps(&[
            ResolvedDependencyReference::new("org.aaa", "aaa"),
            ResolvedDependencyReference::new("org.bbb", "core"),
        ]);
        assert!(deps.starts_with("# Generated by Buckaroo, do not edit!\n"));
        assert!(deps.ends_with(
            "BUCKAROO_DEPS = [\n  '//buckaroo/org.aaa:aaa',\n  '//buckaroo/org.bbb:core',\n]\n"
        ));
    }

    #[test]
    fn test_generate_empty_deps() {
        assert!(generate_buckaroo_deps(&[]).ends_with("BUCKAROO_DEPS = []\n"));
    }

    #[test]
    fn test_quote_escapes() {
        assert_eq!(quote("a'b"), "'a\\'b'");
    }
}
