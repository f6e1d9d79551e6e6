// src/resolver/mod.rs

//! Dependency resolution
//!
//! Turns root requirements into one concrete version per package reachable
//! from the roots. Resolution proceeds in rounds:
//!
//! 1. Fetch the recipe of every constrained package not seen yet, all at once.
//! 2. For every unselected package, in identifier order, pick the highest
//!    version satisfying the conjunction of all requirements on it.
//! 3. Record the picked version's own requirements. If one of them rules out
//!    a package that is already selected, that package is re-opened: its
//!    selection is dropped and everything it required is withdrawn, which in
//!    turn drops packages nothing requires any more.
//!
//! Rounds repeat until every constrained package is selected. A package that
//! keeps being re-opened ends resolution with
//! [`Error::ResolutionDidNotConverge`].
//!
//! Preferred versions (typically those of an existing lock) win over the
//! highest candidate whenever they still satisfy every requirement.

mod constraints;

use crate::error::{Error, FetchRecipeReason, Requirer, Result};
use crate::events::{Event, EventSink};
use crate::model::{Dependencies, Recipe, RecipeIdentifier, RecipeVersion};
use crate::source::RecipeSource;
use crate::version::SemanticVersion;
use constraints::ConstraintSet;
use futures::future::join_all;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use tracing::{debug, info};

/// Re-opens allowed per package before giving up
pub const DEFAULT_MAX_REOPENS: u32 = 16;

/// One package of a resolution
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDependency {
    pub identifier: RecipeIdentifier,
    pub version: SemanticVersion,
    pub recipe_version: RecipeVersion,
}

/// Result of a resolution, in breadth-first order from the roots
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Resolution {
    dependencies: Vec<ResolvedDependency>,
}

impl Resolution {
    pub fn iter(&self) -> impl Iterator<Item = &ResolvedDependency> {
        self.dependencies.iter()
    }

    pub fn len(&self) -> usize {
        self.dependencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }

    pub fn get(&self, identifier: &RecipeIdentifier) -> Option<&ResolvedDependency> {
        self.dependencies.iter().find(|d| &d.identifier == identifier)
    }

    pub fn into_vec(self) -> Vec<ResolvedDependency> {
        self.dependencies
    }
}

impl IntoIterator for Resolution {
    type Item = ResolvedDependency;
    type IntoIter = std::vec::IntoIter<ResolvedDependency>;

    fn into_iter(self) -> Self::IntoIter {
        self.dependencies.into_iter()
    }
}

/// Resolves requirements against a recipe source
pub struct Resolver<'a> {
    source: &'a dyn RecipeSource,
    max_reopens: u32,
    preferred: BTreeMap<RecipeIdentifier, SemanticVersion>,
    events: EventSink,
}

impl<'a> Resolver<'a> {
    pub fn new(source: &'a dyn RecipeSource) -> Self {
        Self {
            source,
            max_reopens: DEFAULT_MAX_REOPENS,
            preferred: BTreeMap::new(),
            events: EventSink::silent(),
        }
    }

    pub fn with_max_reopens(mut self, max_reopens: u32) -> Self {
        self.max_reopens = max_reopens;
        self
    }

    /// Keep these versions where the requirements still allow them
    pub fn with_preferred(
        mut self,
        preferred: BTreeMap<RecipeIdentifier, SemanticVersion>,
    ) -> Self {
        self.preferred = preferred;
        self
    }

    pub fn with_events(mut self, events: EventSink) -> Self {
        self.events = events;
        self
    }

    /// Resolve `roots` and everything they transitively require
    pub async fn resolve(&self, roots: &Dependencies) -> Result<Resolution> {
        let mut state = ResolutionState::new(roots);
        let mut round = 0;

        loop {
            round += 1;
            self.fetch_frontier(&mut state).await?;

            let unselected: Vec<RecipeIdentifier> = state
                .constraints
                .packages()
                .filter(|id| !state.selected.contains_key(*id))
                .cloned()
                .collect();

            if unselected.is_empty() {
                break;
            }
            debug!("Round {}: selecting {} packages", round, unselected.len());

            for identifier in unselected {
                // May have been orphaned by a re-open earlier in this round
                if !state.constraints.contains(&identifier)
                    || state.selected.contains_key(&identifier)
                {
                    continue;
                }
                self.select(&mut state, &identifier)?;
            }
        }

        let resolution = state.into_resolution(roots);
        info!("Resolved {} dependencies", resolution.len());
        self.events.emit(Event::ResolvedDependencies {
            resolved: resolution
                .iter()
                .map(|d| (d.identifier.clone(), d.version.clone()))
                .collect(),
        });
        Ok(resolution)
    }

    /// Fetch every constrained package without a recipe, concurrently
    ///
    /// Results are merged in identifier order; the first failure in that
    /// order is returned.
    async fn fetch_frontier(&self, state: &mut ResolutionState) -> Result<()> {
        let frontier: Vec<RecipeIdentifier> = state
            .constraints
            .packages()
            .filter(|id| !state.recipes.contains_key(*id))
            .cloned()
            .collect();

        if frontier.is_empty() {
            return Ok(());
        }
        debug!("Fetching {} recipes", frontier.len());

        let fetched = join_all(frontier.iter().map(|id| self.source.fetch(id))).await;

        for (identifier, result) in frontier.into_iter().zip(fetched) {
            let recipe = result?;
            self.events.emit(Event::RecipeFetched {
                identifier: identifier.clone(),
                versions: recipe.versions.len(),
            });
            state.recipes.insert(identifier, recipe);
        }
        Ok(())
    }

    fn select(&self, state: &mut ResolutionState, identifier: &RecipeIdentifier) -> Result<()> {
        let requirement = state.constraints.merged(identifier);
        let recipe = state.recipes.get(identifier).ok_or_else(|| Error::FetchRecipe {
            identifier: identifier.clone(),
            reason: FetchRecipeReason::NotFound,
        })?;

        let preferred = self
            .preferred
            .get(identifier)
            .filter(|version| requirement.satisfies(version))
            .and_then(|version| recipe.versions.get_key_value(version));

        let Some((version, recipe_version)) = preferred.or_else(|| recipe.best_match(&requirement))
        else {
            return Err(Error::UnsatisfiableVersion {
                identifier: identifier.clone(),
                requirement,
                required_by: state.constraints.required_by(identifier),
                available: recipe.available_versions().cloned().collect(),
            });
        };

        debug!("Selected {} {} for {}", identifier, version, requirement);
        let version = version.clone();
        let dependencies = recipe_version.dependencies.clone();
        state.selected.insert(identifier.clone(), version);

        for (dependency, dependency_requirement) in dependencies {
            state.constraints.add(
                dependency.clone(),
                Requirer::Package(identifier.clone()),
                dependency_requirement,
            );

            let conflicts = state
                .selected
                .get(&dependency)
                .is_some_and(|selected| !state.constraints.merged(&dependency).satisfies(selected));
            if conflicts {
                self.reopen(state, &dependency)?;
                // A cycle can re-open the package being selected
                if !state.selected.contains_key(identifier) {
                    break;
                }
            }
        }
        Ok(())
    }

    fn reopen(&self, state: &mut ResolutionState, identifier: &RecipeIdentifier) -> Result<()> {
        let count = state.reopens.entry(identifier.clone()).or_insert(0);
        *count += 1;
        if *count > self.max_reopens {
            return Err(Error::ResolutionDidNotConverge {
                identifier: identifier.clone(),
                reopened: *count,
            });
        }

        debug!("Re-opening {} (time {})", identifier, count);
        state.unselect(identifier);
        Ok(())
    }
}

/// Mutable state of one resolution run
struct ResolutionState {
    constraints: ConstraintSet,
    recipes: HashMap<RecipeIdentifier, Recipe>,
    selected: BTreeMap<RecipeIdentifier, SemanticVersion>,
    reopens: HashMap<RecipeIdentifier, u32>,
}

impl ResolutionState {
    fn new(roots: &Dependencies) -> Self {
        let mut constraints = ConstraintSet::default();
        for (identifier, requirement) in roots {
            constraints.add(identifier.clone(), Requirer::Root, requirement.clone());
        }

        Self {
            constraints,
            recipes: HashMap::new(),
            selected: BTreeMap::new(),
            reopens: HashMap::new(),
        }
    }

    /// Drop a selection and withdraw what it required, recursively
    fn unselect(&mut self, identifier: &RecipeIdentifier) {
        if self.selected.remove(identifier).is_none() {
            return;
        }

        for affected in self.constraints.retract(identifier) {
            if !self.constraints.contains(&affected) {
                self.unselect(&affected);
            }
        }
    }

    fn recipe_version(&self, identifier: &RecipeIdentifier) -> Option<(&SemanticVersion, &RecipeVersion)> {
        let version = self.selected.get(identifier)?;
        let recipe_version = self.recipes.get(identifier)?.get(version)?;
        Some((version, recipe_version))
    }

    /// Breadth-first from the roots, dependencies in identifier order
    fn into_resolution(self, roots: &Dependencies) -> Resolution {
        let mut dependencies = Vec::new();
        let mut visited: HashSet<&RecipeIdentifier> = HashSet::new();
        let mut queue: VecDeque<&RecipeIdentifier> = roots.keys().collect();

        while let Some(identifier) = queue.pop_front() {
            if !visited.insert(identifier) {
                continue;
            }
            let Some((version, recipe_version)) = self.recipe_version(identifier) else {
                continue;
            };

            queue.extend(recipe_version.dependencies.keys());
            dependencies.push(ResolvedDependency {
                identifier: identifier.clone(),
                version: version.clone(),
                recipe_version: recipe_version.clone(),
            });
        }

        Resolution { dependencies }
    }
}
