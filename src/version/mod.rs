// src/version/mod.rs

//! Semantic versions and version requirements
//!
//! Versions follow semver precedence (numeric identifiers compare numerically,
//! pre-releases sort before their release). Parsing is lenient about missing
//! components so that tags such as `v2` or `1.4` are usable: they become
//! `2.0.0` and `1.4.0`.
//!
//! Requirements are predicates. Combining two requirements never simplifies
//! them; whether a combination is satisfiable is only discovered by evaluating
//! it against real candidate versions.

use crate::error::{Error, Result};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// A semantic version: major.minor.patch[-pre][+build]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SemanticVersion(semver::Version);

impl SemanticVersion {
    pub fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self(semver::Version::new(major, minor, patch))
    }

    /// Parse a version, filling in missing minor/patch components with zero
    ///
    /// Examples:
    /// - "1.2.3" → 1.2.3
    /// - "2" → 2.0.0
    /// - "1.0-rc1" → 1.0.0-rc1
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        let split_at = s.find(['-', '+']).unwrap_or(s.len());
        let (core, rest) = s.split_at(split_at);

        let parts: Vec<&str> = core.split('.').collect();
        if parts.is_empty() || parts.len() > 3 || parts.iter().any(|p| p.is_empty()) {
            return Err(Error::InvalidVersion(s.to_string()));
        }

        let mut numbers = [0u64; 3];
        for (slot, part) in numbers.iter_mut().zip(&parts) {
            if !part.chars().all(|c| c.is_ascii_digit()) {
                return Err(Error::InvalidVersion(s.to_string()));
            }
            *slot = part
                .parse()
                .map_err(|_| Error::InvalidVersion(s.to_string()))?;
        }

        let normalized = format!("{}.{}.{}{}", numbers[0], numbers[1], numbers[2], rest);
        semver::Version::parse(&normalized)
            .map(Self)
            .map_err(|_| Error::InvalidVersion(s.to_string()))
    }

    /// Parse the version embedded in a tag name, ignoring a leading `v`
    ///
    /// Returns `None` for tags that are not versions.
    pub fn from_tag(tag: &str) -> Option<Self> {
        let trimmed = tag
            .strip_prefix('v')
            .or_else(|| tag.strip_prefix('V'))
            .unwrap_or(tag);
        Self::parse(trimmed).ok()
    }

    pub fn major(&self) -> u64 {
        self.0.major
    }

    pub fn minor(&self) -> u64 {
        self.0.minor
    }

    pub fn patch(&self) -> u64 {
        self.0.patch
    }

    pub fn is_prerelease(&self) -> bool {
        !self.0.pre.is_empty()
    }
}

impl fmt::Display for SemanticVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SemanticVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Ord for SemanticVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.cmp(&other.0)
    }
}

impl PartialOrd for SemanticVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Serialize for SemanticVersion {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SemanticVersion {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// A predicate over semantic versions
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SemanticVersionRequirement {
    /// Any version is acceptable
    Any,
    /// Exact version match
    Exact(SemanticVersion),
    GreaterThan(SemanticVersion),
    GreaterOrEqual(SemanticVersion),
    LessThan(SemanticVersion),
    LessOrEqual(SemanticVersion),
    NotEqual(SemanticVersion),
    /// `^1.2.3`: same left-most non-zero component
    Compatible(SemanticVersion),
    /// `~1.2.3`: same major and minor
    Tilde(SemanticVersion),
    /// Both requirements must be satisfied
    And(Box<SemanticVersionRequirement>, Box<SemanticVersionRequirement>),
}

impl SemanticVersionRequirement {
    /// Parse a requirement string
    ///
    /// Examples:
    /// - "*" → Any
    /// - "1.2.3" or "=1.2.3" → Exact(1.2.3)
    /// - ">= 1.0, < 2.0" → And(GreaterOrEqual(1.0.0), LessThan(2.0.0))
    /// - "^1.2" → Compatible(1.2.0)
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();

        if s.is_empty() || s == "*" {
            return Ok(Self::Any);
        }

        if s.contains(',') {
            let mut parts = s.split(',').map(str::trim);
            let first = parts.next().unwrap_or_default();
            let mut combined = Self::parse_single(first, s)?;
            for part in parts {
                combined = Self::And(Box::new(combined), Box::new(Self::parse_single(part, s)?));
            }
            return Ok(combined);
        }

        Self::parse_single(s, s)
    }

    fn parse_single(s: &str, whole: &str) -> Result<Self> {
        let version = |rest: &str| {
            SemanticVersion::parse(rest.trim())
                .map_err(|_| Error::InvalidRequirement(whole.to_string()))
        };

        if s.is_empty() {
            Err(Error::InvalidRequirement(whole.to_string()))
        } else if s == "*" {
            Ok(Self::Any)
        } else if let Some(rest) = s.strip_prefix(">=") {
            Ok(Self::GreaterOrEqual(version(rest)?))
        } else if let Some(rest) = s.strip_prefix("<=") {
            Ok(Self::LessOrEqual(version(rest)?))
        } else if let Some(rest) = s.strip_prefix("!=") {
            Ok(Self::NotEqual(version(rest)?))
        } else if let Some(rest) = s.strip_prefix('>') {
            Ok(Self::GreaterThan(version(rest)?))
        } else if let Some(rest) = s.strip_prefix('<') {
            Ok(Self::LessThan(version(rest)?))
        } else if let Some(rest) = s.strip_prefix('=') {
            Ok(Self::Exact(version(rest)?))
        } else if let Some(rest) = s.strip_prefix('^') {
            Ok(Self::Compatible(version(rest)?))
        } else if let Some(rest) = s.strip_prefix('~') {
            Ok(Self::Tilde(version(rest)?))
        } else {
            // No operator means exact match
            Ok(Self::Exact(version(s)?))
        }
    }

    /// Check if a version satisfies this requirement
    pub fn satisfies(&self, version: &SemanticVersion) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(v) => version == v,
            Self::GreaterThan(v) => version > v,
            Self::GreaterOrEqual(v) => version >= v,
            Self::LessThan(v) => version < v,
            Self::LessOrEqual(v) => version <= v,
            Self::NotEqual(v) => version != v,
            Self::Compatible(v) => version >= v && below(version, caret_upper_bound(v)),
            Self::Tilde(v) => version >= v && below(version, tilde_upper_bound(v)),
            Self::And(left, right) => left.satisfies(version) && right.satisfies(version),
        }
    }

    /// Conjunction of two requirements
    ///
    /// `Any` is the identity and identical requirements collapse; nothing else
    /// is simplified.
    pub fn and(self, other: Self) -> Self {
        match (self, other) {
            (Self::Any, other) => other,
            (this, Self::Any) => this,
            (this, other) if this == other => this,
            (this, other) => Self::And(Box::new(this), Box::new(other)),
        }
    }

    /// The candidates that satisfy this requirement, in input order
    pub fn filter<'a, I>(&self, candidates: I) -> Vec<&'a SemanticVersion>
    where
        I: IntoIterator<Item = &'a SemanticVersion>,
    {
        candidates.into_iter().filter(|v| self.satisfies(v)).collect()
    }

    /// The highest candidate that satisfies this requirement
    pub fn highest<'a, I>(&self, candidates: I) -> Option<&'a SemanticVersion>
    where
        I: IntoIterator<Item = &'a SemanticVersion>,
    {
        candidates.into_iter().filter(|v| self.satisfies(v)).max()
    }
}

/// Exclusive upper bound for a caret requirement
///
/// `None` when the bumped component would not fit, which leaves the range open.
fn caret_upper_bound(v: &SemanticVersion) -> Option<SemanticVersion> {
    if v.major() > 0 {
        v.major().checked_add(1).map(|major| SemanticVersion::new(major, 0, 0))
    } else if v.minor() > 0 {
        v.minor().checked_add(1).map(|minor| SemanticVersion::new(0, minor, 0))
    } else {
        v.patch().checked_add(1).map(|patch| SemanticVersion::new(0, 0, patch))
    }
}

/// Exclusive upper bound for a tilde requirement
fn tilde_upper_bound(v: &SemanticVersion) -> Option<SemanticVersion> {
    v.minor()
        .checked_add(1)
        .map(|minor| SemanticVersion::new(v.major(), minor, 0))
}

fn below(version: &SemanticVersion, bound: Option<SemanticVersion>) -> bool {
    bound.is_none_or(|bound| *version < bound)
}

impl Default for SemanticVersionRequirement {
    fn default() -> Self {
        Self::Any
    }
}

impl fmt::Display for SemanticVersionRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, "*"),
            Self::Exact(v) => write!(f, "={}", v),
            Self::GreaterThan(v) => write!(f, ">{}", v),
            Self::GreaterOrEqual(v) => write!(f, ">={}", v),
            Self::LessThan(v) => write!(f, "<{}", v),
            Self::LessOrEqual(v) => write!(f, "<={}", v),
            Self::NotEqual(v) => write!(f, "!={}", v),
            Self::Compatible(v) => write!(f, "^{}", v),
            Self::Tilde(v) => write!(f, "~{}", v),
            Self::And(left, right) => write!(f, "{}, {}", left, right),
        }
    }
}

impl FromStr for SemanticVersionRequirement {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Serialize for SemanticVersionRequirement {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for SemanticVersionRequirement {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse(&s).map_err(serde::de::Error::custom)
    }
}
