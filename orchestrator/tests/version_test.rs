pub(crate) mod mock;

use mock::MockCloud;
use sandbox_orchestrator::version::{resolve_latest_version, VersionOrdering};
use sandbox_orchestrator::Error;

#[tokio::test]
async fn latest_version_is_lexicographic_by_default() {
    let cloud = MockCloud::new().with_versions(&["1.28", "1.9", "1.10"]);

    let latest = resolve_latest_version(&cloud, VersionOrdering::default())
        .await
        .unwrap();

    assert_eq!(latest, "1.9");
    assert_eq!(cloud.calls(), vec!["cluster_versions"]);
}

#[tokio::test]
async fn numeric_ordering_compares_components() {
    let cloud = MockCloud::new().with_versions(&["1.28", "1.9", "1.10"]);

    let latest = resolve_latest_version(&cloud, VersionOrdering::Numeric)
        .await
        .unwrap();

    assert_eq!(latest, "1.28");
}

#[tokio::test]
async fn no_versions_is_an_error() {
    let cloud = MockCloud::new();

    let error = resolve_latest_version(&cloud, VersionOrdering::Lexicographic)
        .await
        .unwrap_err();

    assert!(matches!(error, Error::NoVersions));
}
