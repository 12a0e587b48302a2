//! Unit tests for the validator layer inside a handler chain

use dbaas_policy::crd::EngineType;
use dbaas_policy::{Error, ValidationError};

use crate::common::*;

fn state() -> FakeState {
    FakeState::new()
        .with_engines(installed_engines(NAMESPACE))
        .with_storage(s3_storage("s3", "backups", "us-east-1", ""))
}

#[tokio::test]
async fn test_admitted_request_reaches_terminal_unchanged() {
    let harness = Harness::new(state());
    let cluster = DatabaseClusterBuilder::new("db", NAMESPACE, EngineType::Pxc)
        .with_schedule("daily", "s3")
        .build();

    let out = harness
        .chain
        .create_database_cluster(&ctx(), cluster.clone())
        .await
        .unwrap();

    assert_eq!(out, cluster);
    assert_eq!(harness.terminal.calls(), vec!["create_database_cluster"]);
    assert_eq!(harness.chain.names(), ["policy", "terminal"]);
}

#[tokio::test]
async fn test_rejected_request_is_not_forwarded() {
    let harness = Harness::new(state());
    let cluster = DatabaseClusterBuilder::new("db", NAMESPACE, EngineType::Pxc)
        .with_replicas(4)
        .build();

    let err = harness
        .chain
        .create_database_cluster(&ctx(), cluster)
        .await
        .unwrap_err();

    assert!(err.is_invalid_request());
    assert_eq!(
        err.validation(),
        Some(&ValidationError::EvenReplicas(EngineType::Pxc))
    );
    assert!(harness.terminal.calls().is_empty());
}

#[tokio::test]
async fn test_outcomes_are_counted() {
    let harness = Harness::new(state());
    let good = create_test_cluster("db", EngineType::Pxc);
    let bad = DatabaseClusterBuilder::new("db", NAMESPACE, EngineType::Pxc)
        .with_resources("100m", "1G", "10G")
        .build();

    harness
        .chain
        .create_database_cluster(&ctx(), good)
        .await
        .unwrap();
    let _ = harness.chain.create_database_cluster(&ctx(), bad).await;

    let text = harness.metrics.encode();
    assert!(text.contains("dbaas_policy_validations_total"));
    assert!(text.contains(r#"outcome="admitted""#));
    assert!(text.contains(r#"outcome="rejected""#));
    assert!(text.contains(r#"reason="CpuBelowMinimum""#));
}

#[tokio::test]
async fn test_state_failure_is_not_a_rejection() {
    // No engines installed and no cluster stored: the update cannot read the old cluster
    let harness = Harness::new(FakeState::new());
    let err = harness
        .chain
        .update_database_cluster(&ctx(), create_test_cluster("db", EngineType::Pxc))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::NotFound(_)));
    assert!(harness.terminal.calls().is_empty());
}

#[tokio::test]
async fn test_unvalidated_operation_passes_through() {
    let harness = Harness::new(state());
    let err = harness
        .chain
        .get_database_cluster(&ctx(), NAMESPACE, "db")
        .await
        .unwrap_err();
    // The recording terminal does not implement reads
    assert!(matches!(err, Error::Unhandled("get_database_cluster")));
}
