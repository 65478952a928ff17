use std::sync::Arc;

use pact_broker_rust::config::MatrixConfig;
use pact_broker_rust::logic::reasons::ALL_VERIFIED;
use pact_broker_rust::{
    InMemoryStore, LatestBy, MatrixDecorator, MatrixOptions, MatrixService, NewEnvironment,
    PacticipantGroupService, PairingStatus, TestDataBuilder, UnresolvedSelector, Verdict,
    VerifiedElsewherePolicy,
};
use serde_json::json;

const PROVIDER_VERSION: &str = "1315e0b1924cb6f42751f977789be3559373033a";
const FEATURE_VERSION: &str = "6c992f831da299364cf31be6008ee4752189f6d4";
const NO_VERIFIED_PACT: &str = "There is no verified pact";

fn foo_integration(store: &InMemoryStore) -> TestDataBuilder<'_> {
    TestDataBuilder::new(store)
        .create_environment("production", true)
        .unwrap()
        .create_consumer("Foo1", Some("foo1main"))
        .unwrap()
        .create_provider("Foo2", Some("foo2main"))
        .unwrap()
        .publish_pact("1", Some("foo1main"))
        .unwrap()
}

async fn deploy_check(
    store: &InMemoryStore,
    version: &str,
    environment: &str,
) -> (Option<bool>, String) {
    let results = MatrixService::can_i_deploy(
        store,
        &[UnresolvedSelector::for_version("Foo1", version)],
        &MatrixOptions::for_environment(environment),
        &MatrixConfig::default(),
    )
    .await
    .unwrap();
    let decorator = MatrixDecorator::new(&results);
    (decorator.deployable(), decorator.reason())
}

async fn merge_check(store: &InMemoryStore, version: &str) -> (Option<bool>, String) {
    let results = MatrixService::can_i_merge(
        store,
        &[UnresolvedSelector::for_version("Foo1", version)],
        &MatrixConfig::default(),
    )
    .await
    .unwrap();
    let check = MatrixDecorator::new(&results).merge_check();
    (check.can_merge, check.reason)
}

#[tokio::test]
async fn test_nothing_deployed_in_production_is_unknown() {
    let store = InMemoryStore::new();
    foo_integration(&store);

    let (deployable, reason) = deploy_check(&store, "1", "production").await;

    assert_eq!(deployable, None);
    assert_eq!(
        reason,
        "There is no verified pact between version 1 of Foo1 and a version of Foo2 currently in production (no version is currently recorded as deployed/released in this environment)"
    );
}

#[tokio::test]
async fn test_verified_provider_in_production_is_deployable() {
    let store = InMemoryStore::new();
    foo_integration(&store)
        .create_verification(PROVIDER_VERSION, Some("foo2main"), true)
        .unwrap()
        .create_deployed_version_for_provider_version("production")
        .unwrap();

    let (deployable, reason) = deploy_check(&store, "1", "production").await;

    assert_eq!(deployable, Some(true));
    assert!(!reason.contains(NO_VERIFIED_PACT));
    assert_eq!(reason, ALL_VERIFIED);
}

#[tokio::test]
async fn test_unverified_new_version_is_not_deployable() {
    let store = InMemoryStore::new();
    foo_integration(&store)
        .create_verification(PROVIDER_VERSION, Some("foo2main"), true)
        .unwrap()
        .create_deployed_version_for_provider_version("production")
        .unwrap()
        .publish_pact("2", Some("foo1main"))
        .unwrap();

    let (deployable, reason) = deploy_check(&store, "2", "production").await;

    assert_eq!(deployable, Some(false));
    assert!(reason.starts_with(
        "There is no verified pact between version 2 of Foo1 and the version of Foo2 currently in production"
    ));
    assert!(reason.ends_with(&format!("({})", PROVIDER_VERSION)));

    // version 1 is still fine
    let (deployable, _) = deploy_check(&store, "1", "production").await;
    assert_eq!(deployable, Some(true));
}

#[tokio::test]
async fn test_feature_branch_can_merge_once_verified_by_main() {
    let store = InMemoryStore::new();
    let builder = foo_integration(&store)
        .create_verification("p_main_version", Some("foo2main"), true)
        .unwrap()
        .create_consumer_version(FEATURE_VERSION, Some("feat/new-thing"))
        .unwrap()
        .publish_pact("2", Some("feat/new-thing"))
        .unwrap();

    let (can_merge, reason) = merge_check(&store, "2").await;
    assert_eq!(can_merge, Some(false));
    assert_eq!(
        reason,
        "There is no verified pact between version 2 of Foo1 and the latest version of Foo2 from branch foo2main (p_main_version)"
    );

    builder
        .create_verification("p_main_version", Some("foo2main"), true)
        .unwrap();

    let (can_merge, reason) = merge_check(&store, "2").await;
    assert_eq!(can_merge, Some(true));
    assert!(!reason.contains(NO_VERIFIED_PACT));
}

#[tokio::test]
async fn test_merge_branches_in_batch() {
    let store = Arc::new(InMemoryStore::new());
    foo_integration(&store)
        .create_verification("p_main_version", Some("foo2main"), true)
        .unwrap()
        .publish_pact("2", Some("feat/verified"))
        .unwrap()
        .create_verification("p_main_version", Some("foo2main"), true)
        .unwrap()
        .publish_pact("3", Some("feat/unverified"))
        .unwrap();

    let checks = MatrixService::can_i_merge_branches(
        store.clone(),
        "Foo1",
        vec![
            "feat/verified".to_string(),
            "feat/unverified".to_string(),
            "feat/missing".to_string(),
        ],
        MatrixConfig::default(),
    )
    .await;

    assert_eq!(checks["feat/verified"].as_ref().unwrap().can_merge, Some(true));
    assert_eq!(checks["feat/unverified"].as_ref().unwrap().can_merge, Some(false));
    let missing = checks["feat/missing"].as_ref().unwrap();
    assert_eq!(missing.can_merge, None);
    assert_eq!(
        missing.reason,
        "No version of Foo1 is currently the head of branch feat/missing"
    );
}

#[tokio::test]
async fn test_repeated_queries_are_identical() {
    let store = InMemoryStore::new();
    foo_integration(&store)
        .create_verification(PROVIDER_VERSION, Some("foo2main"), true)
        .unwrap()
        .create_deployed_version_for_provider_version("production")
        .unwrap()
        .publish_pact("2", Some("foo1main"))
        .unwrap();

    let selectors = [UnresolvedSelector::for_version("Foo1", "2")];
    let options = MatrixOptions::for_environment("production");
    let config = MatrixConfig::default();

    let first = MatrixService::can_i_deploy(&store, &selectors, &options, &config)
        .await
        .unwrap();
    let second = MatrixService::can_i_deploy(&store, &selectors, &options, &config)
        .await
        .unwrap();

    assert_eq!(first, second);
}

#[tokio::test]
async fn test_environments_are_evaluated_independently() {
    let store = Arc::new(InMemoryStore::new());
    foo_integration(&store)
        .create_environment("test", false)
        .unwrap()
        .create_verification(PROVIDER_VERSION, Some("foo2main"), true)
        .unwrap()
        .create_deployed_version_for_provider_version("production")
        .unwrap();

    let checks = MatrixService::can_i_deploy_to_environments(
        store,
        UnresolvedSelector::for_version("Foo1", "1"),
        vec!["test".to_string(), "production".to_string()],
        MatrixConfig::default(),
    )
    .await;

    assert_eq!(checks.len(), 2);
    assert_eq!(checks["test"].as_ref().unwrap().deployable, None);
    assert_eq!(checks["production"].as_ref().unwrap().deployable, Some(true));
}

#[tokio::test]
async fn test_rolling_back_ignores_providers_added_later() {
    let store = InMemoryStore::new();
    store
        .publish_pact("Foo1", "1", "Foo2", json!({"foo2": 1}), None)
        .unwrap();
    store
        .publish_pact("Foo1", "2", "Bar", json!({"bar": 2}), None)
        .unwrap();
    store.create_version("Bar", "b1", None).unwrap();
    store.create_version("Foo2", "f1", None).unwrap();

    let results = MatrixService::can_i_deploy(
        &store,
        &[UnresolvedSelector::for_version("Foo1", "1")],
        &MatrixOptions::default(),
        &MatrixConfig::default(),
    )
    .await
    .unwrap();

    assert!(results
        .rows
        .iter()
        .all(|row| row.provider.pacticipant_name != "Bar"));
    assert_eq!(results.rows.len(), 1);
    assert_eq!(results.rows[0].provider.pacticipant_name, "Foo2");
    assert!(results.warnings.iter().any(|w| w.contains("Bar")));
    assert!(results
        .reasons
        .iter()
        .all(|reason| !reason.contains("no pact published")));
}

#[tokio::test]
async fn test_unknown_version_is_unknown() {
    let store = InMemoryStore::new();
    foo_integration(&store);

    let (deployable, reason) = deploy_check(&store, "99", "production").await;

    assert_eq!(deployable, None);
    assert_eq!(reason, "No version of Foo1 found with number 99");
}

#[tokio::test]
async fn test_latestby_decides_between_released_versions() {
    let store = InMemoryStore::new();
    foo_integration(&store)
        .create_verification("p2", None, false)
        .unwrap()
        .create_released_version_for_provider_version("production")
        .unwrap()
        .create_verification("p1", None, true)
        .unwrap()
        .create_released_version_for_provider_version("production")
        .unwrap();

    let selectors = [UnresolvedSelector::for_version("Foo1", "1")];
    let config = MatrixConfig::default();

    let cvp = MatrixService::can_i_deploy(
        &store,
        &selectors,
        &MatrixOptions::for_environment("production").with_latestby(LatestBy::Cvp),
        &config,
    )
    .await
    .unwrap();
    assert_eq!(cvp.rows.len(), 1);
    assert_eq!(cvp.verdict, Verdict::Deployable);

    let cvpv = MatrixService::can_i_deploy(
        &store,
        &selectors,
        &MatrixOptions::for_environment("production").with_latestby(LatestBy::Cvpv),
        &config,
    )
    .await
    .unwrap();
    assert_eq!(cvpv.rows.len(), 2);
    assert_eq!(cvpv.verdict, Verdict::NotDeployable);
    assert!(cvpv.reasons[0].starts_with("The verification for the pact between version 1 of Foo1"));
}

#[tokio::test]
async fn test_verified_elsewhere_follows_policy() {
    let store = InMemoryStore::new();
    foo_integration(&store)
        .create_verification("p1", Some("foo2main"), true)
        .unwrap()
        .create_provider_version("p2", Some("foo2main"))
        .unwrap()
        .create_deployed_version_for_provider_version("production")
        .unwrap();

    let selectors = [UnresolvedSelector::for_version("Foo1", "1")];
    let config = MatrixConfig::default();
    let options = MatrixOptions::for_environment("production");

    let unknown = MatrixService::can_i_deploy(&store, &selectors, &options, &config)
        .await
        .unwrap();
    assert_eq!(unknown.rows[0].status, PairingStatus::VerifiedElsewhere);
    assert_eq!(unknown.verdict, Verdict::Unknown);
    assert_eq!(
        unknown.reasons,
        vec!["The pact between version 1 of Foo1 and the version of Foo2 currently in production (p2) has not been verified against that version, but was verified by version p1 of Foo2"]
    );

    let allowed = MatrixService::can_i_deploy(
        &store,
        &selectors,
        &options.clone().with_verified_elsewhere(VerifiedElsewherePolicy::Allow),
        &config,
    )
    .await
    .unwrap();
    assert_eq!(allowed.verdict, Verdict::Deployable);

    let denied = MatrixService::can_i_deploy(
        &store,
        &selectors,
        &options.with_verified_elsewhere(VerifiedElsewherePolicy::Deny),
        &config,
    )
    .await
    .unwrap();
    assert_eq!(denied.verdict, Verdict::NotDeployable);
}

#[tokio::test]
async fn test_provider_checks_consumers_in_environment() {
    let store = InMemoryStore::new();
    foo_integration(&store)
        .create_deployed_version_for_consumer_version("production")
        .unwrap()
        .create_verification("p1", Some("foo2main"), true)
        .unwrap();

    let selectors = [UnresolvedSelector::for_version("Foo2", "p1")];
    let options = MatrixOptions::for_environment("production");
    let config = MatrixConfig::default();

    let results = MatrixService::can_i_deploy(&store, &selectors, &options, &config)
        .await
        .unwrap();
    assert_eq!(results.verdict, Verdict::Deployable);
    assert_eq!(results.rows.len(), 1);

    // a new consumer version reaches production without p1 having verified it
    TestDataBuilder::new(&store)
        .use_consumer("Foo1")
        .unwrap()
        .use_provider("Foo2")
        .unwrap()
        .publish_pact("2", Some("foo1main"))
        .unwrap()
        .create_deployed_version_for_consumer_version("production")
        .unwrap();

    let results = MatrixService::can_i_deploy(&store, &selectors, &options, &config)
        .await
        .unwrap();
    assert_eq!(results.verdict, Verdict::NotDeployable);
    assert_eq!(
        results.reasons,
        vec!["There is no verified pact between the version of Foo1 currently in production (2) and version p1 of Foo2"]
    );
}

#[tokio::test]
async fn test_selected_versions_are_compared_pairwise() {
    let store = InMemoryStore::new();
    foo_integration(&store)
        .create_verification("p1", None, true)
        .unwrap()
        .create_consumer_version("3", None)
        .unwrap();

    let config = MatrixConfig::default();
    let verified = MatrixService::can_i_deploy(
        &store,
        &[
            UnresolvedSelector::for_version("Foo1", "1"),
            UnresolvedSelector::for_version("Foo2", "p1"),
        ],
        &MatrixOptions::default(),
        &config,
    )
    .await
    .unwrap();
    assert_eq!(verified.verdict, Verdict::Deployable);
    assert_eq!(verified.rows.len(), 1);

    let no_pact = MatrixService::can_i_deploy(
        &store,
        &[
            UnresolvedSelector::for_version("Foo1", "3"),
            UnresolvedSelector::for_version("Foo2", "p1"),
        ],
        &MatrixOptions::default(),
        &config,
    )
    .await
    .unwrap();
    assert_eq!(no_pact.verdict, Verdict::NotDeployable);
    assert_eq!(
        no_pact.reasons,
        vec!["There is no pact published between version 3 of Foo1 and version p1 of Foo2"]
    );
}

#[tokio::test]
async fn test_group_summary_reports_main_version_checks() {
    let store = Arc::new(InMemoryStore::new());
    foo_integration(&store)
        .create_verification(PROVIDER_VERSION, Some("foo2main"), true)
        .unwrap()
        .create_deployed_version_for_provider_version("production")
        .unwrap()
        .create_consumer_version(FEATURE_VERSION, Some("feat/new-thing"))
        .unwrap()
        .publish_pact("2", Some("feat/new-thing"))
        .unwrap();
    store
        .create_environment(NewEnvironment::named("test", false))
        .unwrap();

    let summary = PacticipantGroupService::summary(store, "Foo1", &MatrixConfig::default())
        .await
        .unwrap();

    assert_eq!(summary.main_branch.as_deref(), Some("foo1main"));
    assert_eq!(summary.production_environments, vec!["production"]);
    assert_eq!(summary.can_i_deploy.len(), 1);
    assert_eq!(summary.can_i_deploy["production"].deployable, Some(true));
    assert_eq!(summary.can_i_merge["feat/new-thing"].can_merge, Some(false));
}
