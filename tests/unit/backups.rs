//! Unit tests for on-demand backups, restores and the PITR window

use dbaas_policy::crd::{
    BackupSource, DataSource, DatabaseClusterRestore, DatabaseClusterRestoreSpec, EngineType,
    PitrSelector, PitrType,
};
use dbaas_policy::pitr::recovery_window;
use dbaas_policy::ValidationError;

use crate::common::*;

fn state() -> FakeState {
    FakeState::new()
        .with_engines(installed_engines(NAMESPACE))
        .with_storage(s3_storage("s3", "backups", "us-east-1", ""))
        .with_storage(s3_storage("s3-eu", "backups-eu", "eu-west-1", ""))
        .with_storage(s3_storage("s3-ap", "backups-ap", "ap-south-1", ""))
        .with_storage(s3_storage("s3-sa", "backups-sa", "sa-east-1", ""))
}

fn restore(cluster: &str, data_source: DataSource) -> DatabaseClusterRestore {
    let mut restore = DatabaseClusterRestore::new(
        "restore",
        DatabaseClusterRestoreSpec {
            db_cluster_name: cluster.to_string(),
            data_source,
        },
    );
    restore.metadata.namespace = Some(NAMESPACE.to_string());
    restore
}

fn from_backup(name: &str) -> DataSource {
    DataSource {
        db_cluster_backup_name: Some(name.to_string()),
        ..Default::default()
    }
}

mod backup_tests {
    use super::*;

    #[tokio::test]
    async fn test_backup_of_missing_cluster_rejected() {
        let err = rejection(
            test_policies(state())
                .validate_backup_create(&cluster_backup("b1", "missing", "s3"))
                .await,
        );
        assert_eq!(err, ValidationError::ClusterNotFound("missing".to_string()));
    }

    #[tokio::test]
    async fn test_backup_to_missing_storage_rejected() {
        let state = state().with_cluster(create_test_cluster("db", EngineType::Pxc));
        let err = rejection(
            test_policies(state)
                .validate_backup_create(&cluster_backup("b1", "db", "nowhere"))
                .await,
        );
        assert_eq!(err, ValidationError::BackupStorageNotFound("nowhere".to_string()));
    }

    #[tokio::test]
    async fn test_psmdb_backup_uses_active_storage() {
        let cluster = DatabaseClusterBuilder::new("mongo", NAMESPACE, EngineType::Psmdb)
            .with_active_storage("s3")
            .build();
        let policies = test_policies(state().with_cluster(cluster));

        let err = rejection(
            policies
                .validate_backup_create(&cluster_backup("b1", "mongo", "s3-eu"))
                .await,
        );
        assert_eq!(err, ValidationError::ActiveStorageMismatch("s3".to_string()));

        policies
            .validate_backup_create(&cluster_backup("b2", "mongo", "s3"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_postgres_backup_counts_against_repositories() {
        let cluster = DatabaseClusterBuilder::new("pg", NAMESPACE, EngineType::Postgresql)
            .with_schedule("a", "s3")
            .with_schedule("b", "s3-eu")
            .build();
        let state = state()
            .with_cluster(cluster)
            .with_backup(cluster_backup("old", "pg", "s3-ap"));
        let policies = test_policies(state);

        // Reusing a storage already in the budget is free
        for name in ["b1", "b2", "b3"] {
            policies
                .validate_backup_create(&cluster_backup(name, "pg", "s3"))
                .await
                .unwrap();
        }

        let err = rejection(
            policies
                .validate_backup_create(&cluster_backup("b4", "pg", "s3-sa"))
                .await,
        );
        assert_eq!(err, ValidationError::TooManyRepositories(3));
    }
}

mod restore_tests {
    use super::*;

    #[tokio::test]
    async fn test_restore_from_own_backup_admitted() {
        let state = state()
            .with_cluster(create_test_cluster("db", EngineType::Pxc))
            .with_backup(cluster_backup("nightly", "db", "s3"));
        test_policies(state)
            .validate_restore_create(&restore("db", from_backup("nightly")))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_restore_from_other_clusters_backup_rejected() {
        let state = state()
            .with_cluster(create_test_cluster("db", EngineType::Pxc))
            .with_backup(cluster_backup("nightly", "other", "s3"));
        let err = rejection(
            test_policies(state)
                .validate_restore_create(&restore("db", from_backup("nightly")))
                .await,
        );
        assert!(matches!(err, ValidationError::BackupClusterMismatch { .. }));
    }

    #[tokio::test]
    async fn test_restore_from_missing_backup_rejected() {
        let state = state().with_cluster(create_test_cluster("db", EngineType::Pxc));
        let err = rejection(
            test_policies(state)
                .validate_restore_create(&restore("db", from_backup("gone")))
                .await,
        );
        assert_eq!(err, ValidationError::BackupNotFound("gone".to_string()));
    }

    #[tokio::test]
    async fn test_data_source_shape() {
        let state = state().with_cluster(create_test_cluster("db", EngineType::Pxc));
        let policies = test_policies(state);

        let both = DataSource {
            db_cluster_backup_name: Some("nightly".to_string()),
            backup_source: Some(BackupSource {
                backup_storage_name: "s3".to_string(),
                path: "db/2024".to_string(),
            }),
            pitr: None,
        };
        let err = rejection(policies.validate_restore_create(&restore("db", both)).await);
        assert_eq!(err, ValidationError::DataSourceAmbiguous);

        let bad_date = DataSource {
            backup_source: Some(BackupSource {
                backup_storage_name: "s3".to_string(),
                path: "db/2024".to_string(),
            }),
            pitr: Some(PitrSelector {
                type_: PitrType::Date,
                date: Some("2024-01-02 15:04:05".to_string()),
            }),
            ..Default::default()
        };
        let err = rejection(policies.validate_restore_create(&restore("db", bad_date)).await);
        assert_eq!(err, ValidationError::InvalidPitrDate);
    }
}

mod pitr_window_tests {
    use super::*;

    fn ts(s: &str) -> jiff::Timestamp {
        s.parse().unwrap()
    }

    #[test]
    fn test_window_starts_at_latest_successful_backup() {
        let backups = vec![
            finished_backup("b1", "db", "Succeeded", "2024-03-01T00:00:00Z"),
            finished_backup("b2", "db", "Succeeded", "2024-03-02T00:00:00Z"),
            finished_backup("b3", "db", "Failed", "2024-03-03T00:00:00Z"),
        ];
        let now = ts("2024-03-03T12:34:56Z");

        let window = recovery_window(&backups, EngineType::Pxc, now).unwrap();

        assert_eq!(window.earliest, ts("2024-03-02T00:00:00Z"));
        assert_eq!(window.latest, ts("2024-03-03T12:34:00Z"));
    }

    #[test]
    fn test_no_window_without_successful_backup() {
        let backups = vec![finished_backup("b1", "db", "Succeeded", "2024-03-01T00:00:00Z")];
        let now = ts("2024-03-03T12:34:56Z");
        // PSMDB reports success as "ready"
        assert!(recovery_window(&backups, EngineType::Psmdb, now).is_none());
    }
}
