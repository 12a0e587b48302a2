//! Unit tests for database cluster create and update rules

use dbaas_policy::crd::{BackupStorageType, EngineType};
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

mod create_tests {
    use super::*;

    #[tokio::test]
    async fn test_valid_cluster_is_admitted() {
        let cluster = DatabaseClusterBuilder::new("db", NAMESPACE, EngineType::Pxc)
            .with_version("8.0.36")
            .with_schedule("daily", "s3")
            .with_pitr("s3")
            .build();
        test_policies(state())
            .validate_database_cluster_create(&cluster)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_even_pxc_replicas_rejected() {
        let cluster = DatabaseClusterBuilder::new("db", NAMESPACE, EngineType::Pxc)
            .with_replicas(4)
            .build();
        let err = rejection(
            test_policies(state())
                .validate_database_cluster_create(&cluster)
                .await,
        );
        assert_eq!(err, ValidationError::EvenReplicas(EngineType::Pxc));
    }

    #[tokio::test]
    async fn test_postgresql_allows_even_replicas() {
        let cluster = DatabaseClusterBuilder::new("db", NAMESPACE, EngineType::Postgresql)
            .with_replicas(2)
            .build();
        test_policies(state())
            .validate_database_cluster_create(&cluster)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_cpu_reported_before_memory_and_storage() {
        let cluster = DatabaseClusterBuilder::new("db", NAMESPACE, EngineType::Pxc)
            .with_resources("200m", "1G", "2G")
            .build();
        let err = rejection(
            test_policies(state())
                .validate_database_cluster_create(&cluster)
                .await,
        );
        assert_eq!(err, ValidationError::CpuBelowMinimum("600m".to_string()));
    }

    #[tokio::test]
    async fn test_memory_and_storage_floors() {
        let policies = test_policies(state());

        let low_memory = DatabaseClusterBuilder::new("db", NAMESPACE, EngineType::Pxc)
            .with_resources("1", "256M", "500M")
            .build();
        let err = rejection(policies.validate_database_cluster_create(&low_memory).await);
        assert_eq!(err, ValidationError::MemoryBelowMinimum("512M".to_string()));

        let low_storage = DatabaseClusterBuilder::new("db", NAMESPACE, EngineType::Pxc)
            .with_resources("1", "1G", "500M")
            .build();
        let err = rejection(policies.validate_database_cluster_create(&low_storage).await);
        assert_eq!(err, ValidationError::StorageBelowMinimum("1G".to_string()));
    }

    #[tokio::test]
    async fn test_name_longer_than_limit_rejected() {
        let cluster = create_test_cluster("a-very-long-cluster-name", EngineType::Pxc);
        let err = rejection(
            test_policies(state())
                .validate_database_cluster_create(&cluster)
                .await,
        );
        assert!(matches!(err, ValidationError::NameTooLong { max: 22, .. }));
    }

    #[tokio::test]
    async fn test_engine_not_installed_rejected() {
        let cluster = create_test_cluster("db", EngineType::Psmdb);
        let err = rejection(
            test_policies(FakeState::new())
                .validate_database_cluster_create(&cluster)
                .await,
        );
        assert_eq!(err, ValidationError::UnsupportedEngine(EngineType::Psmdb));
    }

    #[tokio::test]
    async fn test_unavailable_version_rejected() {
        let cluster = DatabaseClusterBuilder::new("db", NAMESPACE, EngineType::Pxc)
            .with_version("9.9.9")
            .build();
        let err = rejection(
            test_policies(state())
                .validate_database_cluster_create(&cluster)
                .await,
        );
        assert_eq!(err, ValidationError::UnsupportedVersion("9.9.9".to_string()));
    }
}

mod sharding_tests {
    use super::*;

    #[tokio::test]
    async fn test_zero_shards_rejected() {
        let cluster = DatabaseClusterBuilder::new("mongo", NAMESPACE, EngineType::Psmdb)
            .with_sharding(0, 3)
            .build();
        let err = rejection(
            test_policies(state())
                .validate_database_cluster_create(&cluster)
                .await,
        );
        assert_eq!(err, ValidationError::InsufficientShards);
    }

    #[tokio::test]
    async fn test_sharding_only_for_psmdb() {
        let cluster = DatabaseClusterBuilder::new("db", NAMESPACE, EngineType::Pxc)
            .with_sharding(2, 3)
            .build();
        let err = rejection(
            test_policies(state())
                .validate_database_cluster_create(&cluster)
                .await,
        );
        assert_eq!(err, ValidationError::ShardingNotSupported(EngineType::Pxc));
    }

    #[tokio::test]
    async fn test_old_operator_cannot_shard() {
        let state = FakeState::new().with_engines(vec![installed_engine(
            NAMESPACE,
            EngineType::Psmdb,
            "1.16.2",
        )]);
        let cluster = DatabaseClusterBuilder::new("mongo", NAMESPACE, EngineType::Psmdb)
            .with_sharding(2, 3)
            .build();
        let err = rejection(
            test_policies(state)
                .validate_database_cluster_create(&cluster)
                .await,
        );
        assert_eq!(err, ValidationError::ShardingVersionTooOld("1.17.0".to_string()));
    }

    #[tokio::test]
    async fn test_config_server_rules() {
        let policies = test_policies(state());

        let even = DatabaseClusterBuilder::new("mongo", NAMESPACE, EngineType::Psmdb)
            .with_sharding(2, 4)
            .build();
        let err = rejection(policies.validate_database_cluster_create(&even).await);
        assert_eq!(err, ValidationError::EvenConfigServers);

        let single = DatabaseClusterBuilder::new("mongo", NAMESPACE, EngineType::Psmdb)
            .with_sharding(2, 1)
            .build();
        let err = rejection(policies.validate_database_cluster_create(&single).await);
        assert_eq!(err, ValidationError::InsufficientConfigServers(3));

        let single_node = DatabaseClusterBuilder::new("mongo", NAMESPACE, EngineType::Psmdb)
            .with_replicas(1)
            .with_sharding(2, 1)
            .build();
        policies
            .validate_database_cluster_create(&single_node)
            .await
            .unwrap();
    }
}

mod storage_topology_tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_storage_rejected() {
        let cluster = DatabaseClusterBuilder::new("db", NAMESPACE, EngineType::Pxc)
            .with_schedule("daily", "missing")
            .build();
        let err = rejection(
            test_policies(state())
                .validate_database_cluster_create(&cluster)
                .await,
        );
        assert_eq!(err, ValidationError::BackupStorageNotFound("missing".to_string()));
    }

    #[tokio::test]
    async fn test_storage_not_allowed_in_namespace() {
        let mut restricted = s3_storage("restricted", "restricted", "us-east-1", "");
        restricted.spec.allowed_namespaces = vec!["prod".to_string()];
        let state = state().with_storage(restricted);

        let cluster = DatabaseClusterBuilder::new("db", NAMESPACE, EngineType::Pxc)
            .with_schedule("daily", "restricted")
            .build();
        let err = rejection(
            test_policies(state)
                .validate_database_cluster_create(&cluster)
                .await,
        );
        assert!(matches!(err, ValidationError::BackupStorageNotAllowed { .. }));
    }

    #[tokio::test]
    async fn test_psmdb_bound_to_one_storage() {
        let cluster = DatabaseClusterBuilder::new("mongo", NAMESPACE, EngineType::Psmdb)
            .with_schedule("daily", "s3")
            .with_schedule("weekly", "s3-eu")
            .build();
        let err = rejection(
            test_policies(state())
                .validate_database_cluster_create(&cluster)
                .await,
        );
        assert_eq!(err, ValidationError::MultipleStorages);
    }

    #[tokio::test]
    async fn test_psmdb_keeps_active_storage() {
        let existing = DatabaseClusterBuilder::new("mongo", NAMESPACE, EngineType::Psmdb)
            .with_schedule("daily", "s3")
            .with_active_storage("s3")
            .build();
        let updated = DatabaseClusterBuilder::new("mongo", NAMESPACE, EngineType::Psmdb)
            .with_schedule("daily", "s3-eu")
            .build();

        let err = rejection(
            test_policies(state().with_cluster(existing))
                .validate_database_cluster_update(&updated)
                .await,
        );
        assert_eq!(err, ValidationError::ActiveStorageMismatch("s3".to_string()));
    }

    #[tokio::test]
    async fn test_pxc_pitr_requires_s3() {
        let mut azure = s3_storage("azure", "container", "", "");
        azure.spec.type_ = BackupStorageType::Azure;
        let cluster = DatabaseClusterBuilder::new("db", NAMESPACE, EngineType::Pxc)
            .with_schedule("daily", "s3")
            .with_pitr("azure")
            .build();

        let err = rejection(
            test_policies(state().with_storage(azure))
                .validate_database_cluster_create(&cluster)
                .await,
        );
        assert_eq!(err, ValidationError::PitrRequiresS3);
    }

    #[tokio::test]
    async fn test_pxc_pitr_requires_storage() {
        let mut cluster = create_test_cluster("db", EngineType::Pxc);
        cluster.spec.backup.pitr.enabled = true;
        let err = rejection(
            test_policies(state())
                .validate_database_cluster_create(&cluster)
                .await,
        );
        assert_eq!(err, ValidationError::PitrStorageRequired);
    }
}

mod postgres_repository_tests {
    use super::*;

    fn three_schedules() -> DatabaseClusterBuilder {
        DatabaseClusterBuilder::new("pg", NAMESPACE, EngineType::Postgresql)
            .with_schedule("a", "s3")
            .with_schedule("b", "s3-eu")
            .with_schedule("c", "s3-ap")
    }

    #[tokio::test]
    async fn test_three_storages_fit() {
        test_policies(state())
            .validate_database_cluster_create(&three_schedules().build())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_fourth_schedule_rejected() {
        let cluster = three_schedules().with_schedule("d", "s3").build();
        let err = rejection(
            test_policies(state())
                .validate_database_cluster_create(&cluster)
                .await,
        );
        assert_eq!(err, ValidationError::TooManySchedules(3));
    }

    #[tokio::test]
    async fn test_fourth_storage_from_backups_rejected() {
        let state = state().with_backup(cluster_backup("old", "pg", "s3-sa"));
        let err = rejection(
            test_policies(state)
                .validate_database_cluster_create(&three_schedules().build())
                .await,
        );
        assert_eq!(err, ValidationError::TooManyRepositories(3));
    }

    #[tokio::test]
    async fn test_schedule_keeps_its_storage() {
        let existing = DatabaseClusterBuilder::new("pg", NAMESPACE, EngineType::Postgresql)
            .with_schedule("daily", "s3")
            .build();
        let updated = DatabaseClusterBuilder::new("pg", NAMESPACE, EngineType::Postgresql)
            .with_schedule("daily", "s3-eu")
            .build();
        let err = rejection(
            test_policies(state().with_cluster(existing))
                .validate_database_cluster_update(&updated)
                .await,
        );
        assert_eq!(err, ValidationError::ScheduleStorageChanged("daily".to_string()));
    }
}

mod update_tests {
    use super::*;

    fn pxc(version: &str) -> DatabaseClusterBuilder {
        DatabaseClusterBuilder::new("db", NAMESPACE, EngineType::Pxc).with_version(version)
    }

    #[tokio::test]
    async fn test_downgrade_rejected() {
        let state = state().with_cluster(pxc("8.0.22").build());
        let err = rejection(
            test_policies(state)
                .validate_database_cluster_update(&pxc("8.0.21").build())
                .await,
        );
        assert_eq!(
            err,
            ValidationError::Downgrade {
                from: "8.0.22".to_string(),
                to: "8.0.21".to_string(),
            }
        );
        assert_eq!(err.reason(), "VersionDowngradeNotAllowed");
    }

    #[tokio::test]
    async fn test_minor_upgrade_admitted() {
        let state = state().with_cluster(pxc("8.0.22").build());
        test_policies(state)
            .validate_database_cluster_update(&pxc("8.0.36").build())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_pxc_major_upgrade_rejected() {
        let state = state().with_cluster(pxc("5.7.30").build());
        let err = rejection(
            test_policies(state)
                .validate_database_cluster_update(&pxc("8.0.22").build())
                .await,
        );
        assert!(matches!(err, ValidationError::MajorUpgrade { .. }));
    }

    #[tokio::test]
    async fn test_psmdb_major_upgrades_step_by_one() {
        let mongo = |version: &str| {
            DatabaseClusterBuilder::new("mongo", NAMESPACE, EngineType::Psmdb)
                .with_version(version)
                .build()
        };

        test_policies(state().with_cluster(mongo("6.0.9")))
            .validate_database_cluster_update(&mongo("7.0.2"))
            .await
            .unwrap();

        let err = rejection(
            test_policies(state().with_cluster(mongo("6.0.9")))
                .validate_database_cluster_update(&mongo("8.0.4"))
                .await,
        );
        assert!(matches!(err, ValidationError::NonSequentialMajorUpgrade { .. }));
    }

    #[tokio::test]
    async fn test_scale_down_to_single_node_rejected() {
        let state = state().with_cluster(pxc("8.0.22").build());
        let err = rejection(
            test_policies(state)
                .validate_database_cluster_update(&pxc("8.0.22").with_replicas(1).build())
                .await,
        );
        assert_eq!(err, ValidationError::ScaleDownToSingleNode);
    }

    #[tokio::test]
    async fn test_sharding_cannot_be_toggled() {
        let plain = DatabaseClusterBuilder::new("mongo", NAMESPACE, EngineType::Psmdb);
        let sharded = DatabaseClusterBuilder::new("mongo", NAMESPACE, EngineType::Psmdb)
            .with_sharding(2, 3);

        let err = rejection(
            test_policies(state().with_cluster(plain.build()))
                .validate_database_cluster_update(&sharded.build())
                .await,
        );
        assert_eq!(err, ValidationError::ShardingEnableForbidden);

        let plain = DatabaseClusterBuilder::new("mongo", NAMESPACE, EngineType::Psmdb).build();
        let sharded = DatabaseClusterBuilder::new("mongo", NAMESPACE, EngineType::Psmdb)
            .with_sharding(2, 3)
            .build();
        let err = rejection(
            test_policies(state().with_cluster(sharded))
                .validate_database_cluster_update(&plain)
                .await,
        );
        assert_eq!(err, ValidationError::ShardingDisableForbidden);
    }

    #[tokio::test]
    async fn test_sharded_update_revalidates_sharding() {
        let sharded = |shards, config_servers| {
            DatabaseClusterBuilder::new("mongo", NAMESPACE, EngineType::Psmdb)
                .with_sharding(shards, config_servers)
                .build()
        };

        let err = rejection(
            test_policies(state().with_cluster(sharded(2, 3)))
                .validate_database_cluster_update(&sharded(2, 4))
                .await,
        );
        assert_eq!(err, ValidationError::EvenConfigServers);

        let err = rejection(
            test_policies(state().with_cluster(sharded(2, 3)))
                .validate_database_cluster_update(&sharded(0, 3))
                .await,
        );
        assert_eq!(err, ValidationError::InsufficientShards);

        test_policies(state().with_cluster(sharded(2, 3)))
            .validate_database_cluster_update(&sharded(3, 5))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_update_of_missing_cluster_is_not_found() {
        let err = test_policies(state())
            .validate_database_cluster_update(&pxc("8.0.22").build())
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
