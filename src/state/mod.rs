//! Read access to the live cluster state
//!
//! Policies only read through [`ClusterState`]; writes belong to the
//! terminal handler. The "is used" checks are derived from the list calls so
//! every implementation answers them the same way.

use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::crd::{
    BackupStorage, DatabaseCluster, DatabaseClusterBackup, DatabaseEngine, EngineType,
    LoadBalancerConfig, MonitoringConfig, PodSchedulingPolicy, SplitHorizonDNSConfig,
};
use crate::error::Result;

pub mod kube_state;

pub use kube_state::KubeState;

#[async_trait]
pub trait ClusterState: Send + Sync {
    async fn get_database_cluster(&self, namespace: &str, name: &str) -> Result<DatabaseCluster>;

    /// Clusters in `namespace`, or in every namespace when `None`
    async fn list_database_clusters(&self, namespace: Option<&str>)
    -> Result<Vec<DatabaseCluster>>;

    /// The engine resource for `engine_type` installed in `namespace`
    async fn get_database_engine(
        &self,
        namespace: &str,
        engine_type: EngineType,
    ) -> Result<DatabaseEngine>;

    async fn get_backup_storage(&self, namespace: &str, name: &str) -> Result<BackupStorage>;

    async fn list_backup_storages(&self, namespace: &str) -> Result<Vec<BackupStorage>>;

    /// Backups taken of `cluster`
    async fn list_database_cluster_backups(
        &self,
        namespace: &str,
        cluster: &str,
    ) -> Result<Vec<DatabaseClusterBackup>>;

    async fn get_database_cluster_backup(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<DatabaseClusterBackup>;

    async fn get_load_balancer_config(&self, name: &str) -> Result<LoadBalancerConfig>;

    async fn get_monitoring_config(&self, namespace: &str, name: &str)
    -> Result<MonitoringConfig>;

    async fn get_pod_scheduling_policy(&self, name: &str) -> Result<PodSchedulingPolicy>;

    async fn get_split_horizon_dns_config(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<SplitHorizonDNSConfig>;

    /// Decoded data of a `Secret`
    async fn get_secret_data(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<BTreeMap<String, String>>;

    /// Whether any cluster in `namespace` refers to the storage
    async fn is_backup_storage_used(&self, namespace: &str, name: &str) -> Result<bool> {
        let clusters = self.list_database_clusters(Some(namespace)).await?;
        Ok(clusters
            .iter()
            .any(|c| c.referenced_storages().any(|s| s == name)))
    }

    /// Whether any cluster in `namespace` reports to the monitoring instance
    async fn is_monitoring_config_used(&self, namespace: &str, name: &str) -> Result<bool> {
        let clusters = self.list_database_clusters(Some(namespace)).await?;
        Ok(clusters.iter().any(|c| {
            c.spec
                .monitoring
                .as_ref()
                .and_then(|m| m.monitoring_config_name.as_deref())
                == Some(name)
        }))
    }

    /// Whether any cluster in any namespace uses the policy
    async fn is_pod_scheduling_policy_used(&self, name: &str) -> Result<bool> {
        let clusters = self.list_database_clusters(None).await?;
        Ok(clusters
            .iter()
            .any(|c| c.spec.pod_scheduling_policy_name.as_deref() == Some(name)))
    }
}
