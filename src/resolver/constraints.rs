// src/resolver/constraints.rs

//! Bookkeeping of who requires what
//!
//! Every requirement is recorded together with its requirer so that a
//! package's contributions can be withdrawn again when its selection is
//! re-opened.

use crate::error::Requirer;
use crate::model::RecipeIdentifier;
use crate::version::SemanticVersionRequirement;
use std::collections::BTreeMap;

/// Requirements on each package, keyed by requirer
///
/// A requirer contributes at most one requirement per package, so a later
/// contribution from the same requirer replaces the earlier one.
#[derive(Debug, Default)]
pub(crate) struct ConstraintSet {
    by_package: BTreeMap<RecipeIdentifier, BTreeMap<Requirer, SemanticVersionRequirement>>,
}

impl ConstraintSet {
    pub fn add(
        &mut self,
        package: RecipeIdentifier,
        requirer: Requirer,
        requirement: SemanticVersionRequirement,
    ) {
        self.by_package
            .entry(package)
            .or_default()
            .insert(requirer, requirement);
    }

    /// Whether anything still requires `package`
    pub fn contains(&self, package: &RecipeIdentifier) -> bool {
        self.by_package.contains_key(package)
    }

    /// Constrained packages in identifier order
    pub fn packages(&self) -> impl Iterator<Item = &RecipeIdentifier> {
        self.by_package.keys()
    }

    /// Conjunction of every requirement on `package`, in requirer order
    pub fn merged(&self, package: &RecipeIdentifier) -> SemanticVersionRequirement {
        self.by_package
            .get(package)
            .into_iter()
            .flat_map(|requirements| requirements.values())
            .cloned()
            .fold(SemanticVersionRequirement::Any, SemanticVersionRequirement::and)
    }

    pub fn required_by(
        &self,
        package: &RecipeIdentifier,
    ) -> Vec<(Requirer, SemanticVersionRequirement)> {
        self.by_package
            .get(package)
            .map(|requirements| {
                requirements
                    .iter()
                    .map(|(requirer, requirement)| (requirer.clone(), requirement.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Withdraw everything `requirer` contributed
    ///
    /// Returns the packages that lost a requirement, in identifier order.
    /// Packages left with no requirers are removed entirely.
    pub fn retract(&mut self, requirer: &RecipeIdentifier) -> Vec<RecipeIdentifier> {
        let key = Requirer::Package(requirer.clone());
        let mut affected = Vec::new();

        self.by_package.retain(|package, requirements| {
            if requirements.remove(&key).is_some() {
                affected.push(package.clone());
            }
            !requirements.is_empty()
        });

        affected
    }
}
