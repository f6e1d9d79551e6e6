// tests/resolver.rs

//! Resolution against in-memory recipe sources.

mod common;

use buckaroo::events;
use buckaroo::model::Dependencies;
use buckaroo::resolver::Resolver;
use buckaroo::{Error, Event, FetchRecipeReason, Requirer};
use common::{id, recipe, req, version, MockRecipeSource};

fn roots(entries: &[(&str, &str)]) -> Dependencies {
    entries.iter().map(|(i, r)| (id(i), req(r))).collect()
}

/// A small diamond: app-lib needs json and http; http needs json ^1.1
fn diamond() -> MockRecipeSource {
    MockRecipeSource::new()
        .with_recipe(
            "github+acme/app-lib",
            recipe(
                "github+acme/app-lib",
                &[(
                    "1.0.0",
                    &[("github+acme/json", "^1.0"), ("github+acme/http", "^2.0")],
                )],
            ),
        )
        .with_recipe(
            "github+acme/http",
            recipe(
                "github+acme/http",
                &[
                    ("2.0.0", &[("github+acme/json", "^1.1")]),
                    ("2.1.0", &[("github+acme/json", "^1.1")]),
                    ("3.0.0", &[]),
                ],
            ),
        )
        .with_recipe(
            "github+acme/json",
            recipe(
                "github+acme/json",
                &[("1.0.0", &[]), ("1.1.0", &[]), ("1.4.2", &[]), ("2.0.0", &[])],
            ),
        )
}

#[tokio::test]
async fn test_diamond_resolves_highest_compatible() {
    let source = diamond();
    let resolution = Resolver::new(&source)
        .resolve(&roots(&[("github+acme/app-lib", "*")]))
        .await
        .unwrap();

    let resolved: Vec<(String, String)> = resolution
        .iter()
        .map(|d| (d.identifier.to_string(), d.version.to_string()))
        .collect();
    assert_eq!(
        resolved,
        vec![
            ("github+acme/app-lib".to_string(), "1.0.0".to_string()),
            ("github+acme/http".to_string(), "2.1.0".to_string()),
            ("github+acme/json".to_string(), "1.4.2".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_each_recipe_fetched_once() {
    let source = diamond();
    Resolver::new(&source)
        .resolve(&roots(&[("github+acme/app-lib", "*"), ("github+acme/json", "^1.0")]))
        .await
        .unwrap();

    let mut fetched = source.fetched();
    fetched.sort();
    fetched.dedup();
    assert_eq!(fetched.len(), source.fetch_count());
    assert_eq!(source.fetch_count(), 3);
}

#[tokio::test]
async fn test_resolution_is_deterministic() {
    let roots = roots(&[("github+acme/json", "*"), ("github+acme/app-lib", "*")]);

    let first = Resolver::new(&diamond()).resolve(&roots).await.unwrap();
    let second = Resolver::new(&diamond()).resolve(&roots).await.unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_every_constraint_is_satisfied() {
    let source = diamond();
    let roots = roots(&[("github+acme/app-lib", "*"), ("github+acme/json", "<1.2")]);
    let resolution = Resolver::new(&source).resolve(&roots).await.unwrap();

    // The root narrows json below what http would otherwise get
    assert_eq!(
        resolution.get(&id("github+acme/json")).unwrap().version,
        version("1.1.0")
    );

    for (identifier, requirement) in &roots {
        assert!(requirement.satisfies(&resolution.get(identifier).unwrap().version));
    }
    for dependency in resolution.iter() {
        for (child, requirement) in &dependency.recipe_version.dependencies {
            let selected = &resolution.get(child).unwrap().version;
            assert!(requirement.satisfies(selected), "{child} {selected} vs {requirement}");
        }
    }
}

#[tokio::test]
async fn test_conflict_names_package_and_requirers() {
    let source = MockRecipeSource::new()
        .with_recipe(
            "acme/core",
            recipe("acme/core", &[("1.5.0", &[]), ("2.0.0", &[]), ("2.3.0", &[])]),
        )
        .with_recipe(
            "acme/legacy",
            recipe("acme/legacy", &[("1.0.0", &[("acme/core", "<2.0")])]),
        );

    let result = Resolver::new(&source)
        .resolve(&roots(&[("acme/core", ">=2.0"), ("acme/legacy", "*")]))
        .await;

    match result {
        Err(Error::UnsatisfiableVersion {
            identifier,
            required_by,
            available,
            ..
        }) => {
            assert_eq!(identifier, id("acme/core"));
            assert_eq!(
                required_by,
                vec![
                    (Requirer::Root, req(">=2.0")),
                    (Requirer::Package(id("acme/legacy")), req("<2.0")),
                ]
            );
            assert_eq!(available.len(), 3);
        }
        other => panic!("expected an unsatisfiable version, got {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_recipe_fails() {
    let source = MockRecipeSource::new().with_recipe(
        "acme/app-lib",
        recipe("acme/app-lib", &[("1.0.0", &[("acme/ghost", "*")])]),
    );

    let result = Resolver::new(&source)
        .resolve(&roots(&[("acme/app-lib", "*")]))
        .await;
    match result {
        Err(Error::FetchRecipe { identifier, reason }) => {
            assert_eq!(identifier, id("acme/ghost"));
            assert_eq!(reason, FetchRecipeReason::NotFound);
        }
        other => panic!("expected a fetch failure, got {other:?}"),
    }
}

#[tokio::test]
async fn test_reports_fetches_and_result() {
    let source = diamond();
    let (sink, mut stream) = events::channel();

    Resolver::new(&source)
        .with_events(sink)
        .resolve(&roots(&[("github+acme/app-lib", "*")]))
        .await
        .unwrap();

    let emitted = stream.drain();
    let fetched = emitted
        .iter()
        .filter(|e| matches!(e, Event::RecipeFetched { .. }))
        .count();
    assert_eq!(fetched, 3);
    assert!(matches!(
        emitted.last(),
        Some(Event::ResolvedDependencies { resolved }) if resolved.len() == 3
    ));
}
