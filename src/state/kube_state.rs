use std::collections::BTreeMap;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::api::{Api, ListParams};
use kube::Client;
use tracing::debug;

use super::ClusterState;
use crate::crd::{
    BackupStorage, DatabaseCluster, DatabaseClusterBackup, DatabaseEngine, EngineType,
    LoadBalancerConfig, MonitoringConfig, PodSchedulingPolicy, SplitHorizonDNSConfig,
};
use crate::error::{Error, Result};

/// [`ClusterState`] backed by the Kubernetes API
#[derive(Clone)]
pub struct KubeState {
    client: Client,
}

impl KubeState {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ClusterState for KubeState {
    async fn get_database_cluster(&self, namespace: &str, name: &str) -> Result<DatabaseCluster> {
        let api: Api<DatabaseCluster> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get(name).await?)
    }

    async fn list_database_clusters(
        &self,
        namespace: Option<&str>,
    ) -> Result<Vec<DatabaseCluster>> {
        let api: Api<DatabaseCluster> = match namespace {
            Some(ns) => Api::namespaced(self.client.clone(), ns),
            None => Api::all(self.client.clone()),
        };
        Ok(api.list(&ListParams::default()).await?.items)
    }

    async fn get_database_engine(
        &self,
        namespace: &str,
        engine_type: EngineType,
    ) -> Result<DatabaseEngine> {
        let api: Api<DatabaseEngine> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get(engine_type.operator_name()).await?)
    }

    async fn get_backup_storage(&self, namespace: &str, name: &str) -> Result<BackupStorage> {
        let api: Api<BackupStorage> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get(name).await?)
    }

    async fn list_backup_storages(&self, namespace: &str) -> Result<Vec<BackupStorage>> {
        let api: Api<BackupStorage> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.list(&ListParams::default()).await?.items)
    }

    async fn list_database_cluster_backups(
        &self,
        namespace: &str,
        cluster: &str,
    ) -> Result<Vec<DatabaseClusterBackup>> {
        let api: Api<DatabaseClusterBackup> = Api::namespaced(self.client.clone(), namespace);
        let backups = api.list(&ListParams::default()).await?.items;
        let backups: Vec<_> = backups
            .into_iter()
            .filter(|b| b.spec.db_cluster_name == cluster)
            .collect();
        debug!(namespace = %namespace, cluster = %cluster, count = backups.len(), "listed backups");
        Ok(backups)
    }

    async fn get_database_cluster_backup(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<DatabaseClusterBackup> {
        let api: Api<DatabaseClusterBackup> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get(name).await?)
    }

    async fn get_load_balancer_config(&self, name: &str) -> Result<LoadBalancerConfig> {
        let api: Api<LoadBalancerConfig> = Api::all(self.client.clone());
        Ok(api.get(name).await?)
    }

    async fn get_monitoring_config(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<MonitoringConfig> {
        let api: Api<MonitoringConfig> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get(name).await?)
    }

    async fn get_pod_scheduling_policy(&self, name: &str) -> Result<PodSchedulingPolicy> {
        let api: Api<PodSchedulingPolicy> = Api::all(self.client.clone());
        Ok(api.get(name).await?)
    }

    async fn get_split_horizon_dns_config(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<SplitHorizonDNSConfig> {
        let api: Api<SplitHorizonDNSConfig> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get(name).await?)
    }

    async fn get_secret_data(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<BTreeMap<String, String>> {
        let api: Api<Secret> = Api::namespaced(self.client.clone(), namespace);
        let secret = api.get(name).await?;
        secret
            .data
            .unwrap_or_default()
            .into_iter()
            .map(|(key, value)| {
                String::from_utf8(value.0)
                    .map(|v| (key.clone(), v))
                    .map_err(|_| Error::Dependency(format!("secret {name} key {key} is not UTF-8")))
            })
            .collect()
    }
}
