//! Terminal handler that writes to the Kubernetes API
//!
//! Custom resources are created, replaced and deleted as given. Credentials
//! for backup storages, monitoring instances and split-horizon configs go to
//! an `Opaque` secret named after the resource.

use std::collections::BTreeMap;

use async_trait::async_trait;
use k8s_openapi::api::core::v1::Secret;
use kube::api::{Api, DeleteParams, ListParams, ObjectMeta, Patch, PatchParams, PostParams};
use kube::{Client, ResourceExt};
use serde_json::json;
use tracing::{info, warn};

use super::{
    ACCESS_KEY_ID, AZURE_STORAGE_ACCOUNT_KEY, AZURE_STORAGE_ACCOUNT_NAME, CA_CERT, CA_KEY,
    CreateBackupStorageRequest, CreateMonitoringInstanceRequest,
    CreateSplitHorizonDnsConfigRequest, Handler, MONITORING_API_KEY, MONITORING_PASSWORD,
    MONITORING_USERNAME, MonitoringCredentials, RequestContext, SECRET_ACCESS_KEY,
    UpdateBackupStorageRequest, UpdateMonitoringInstanceRequest,
    UpdateSplitHorizonDnsConfigRequest,
};
use crate::crd::{
    BackupStorage, BackupStorageType, DatabaseCluster, DatabaseClusterBackup,
    DatabaseClusterRestore, LoadBalancerConfig, MonitoringConfig, PodSchedulingPolicy,
    SplitHorizonDNSConfig,
};
use crate::error::{Error, Result};

#[derive(Clone)]
pub struct KubeHandler {
    client: Client,
}

impl KubeHandler {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn secrets(&self, namespace: &str) -> Api<Secret> {
        Api::namespaced(self.client.clone(), namespace)
    }

    async fn create_secret(
        &self,
        namespace: &str,
        name: &str,
        data: BTreeMap<String, String>,
    ) -> Result<()> {
        let secret = Secret {
            metadata: ObjectMeta {
                name: Some(name.to_string()),
                namespace: Some(namespace.to_string()),
                ..Default::default()
            },
            string_data: Some(data),
            type_: Some("Opaque".to_string()),
            ..Default::default()
        };
        self.secrets(namespace)
            .create(&PostParams::default(), &secret)
            .await?;
        Ok(())
    }

    async fn patch_secret(
        &self,
        namespace: &str,
        name: &str,
        data: BTreeMap<String, String>,
    ) -> Result<()> {
        let patch = json!({ "stringData": data });
        self.secrets(namespace)
            .patch(name, &PatchParams::default(), &Patch::Merge(&patch))
            .await?;
        Ok(())
    }

    /// Delete a secret; one that is already gone is fine
    async fn delete_secret(&self, namespace: &str, name: &str) -> Result<()> {
        match self
            .secrets(namespace)
            .delete(name, &DeleteParams::default())
            .await
            .map_err(Error::from)
        {
            Ok(_) | Err(Error::NotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Create `resource` after its secret, removing the secret again if the create fails
    async fn create_with_secret<K>(
        &self,
        api: Api<K>,
        namespace: &str,
        secret_name: &str,
        data: BTreeMap<String, String>,
        resource: &K,
    ) -> Result<K>
    where
        K: kube::Resource + Clone + serde::Serialize + serde::de::DeserializeOwned + std::fmt::Debug,
    {
        self.create_secret(namespace, secret_name, data).await?;
        match api.create(&PostParams::default(), resource).await {
            Ok(created) => Ok(created),
            Err(e) => {
                if let Err(cleanup) = self.delete_secret(namespace, secret_name).await {
                    warn!(namespace = %namespace, secret = %secret_name, error = %cleanup, "failed to remove orphaned secret");
                }
                Err(e.into())
            }
        }
    }
}

fn monitoring_secret_data(credentials: &MonitoringCredentials) -> BTreeMap<String, String> {
    [
        (MONITORING_API_KEY, &credentials.api_key),
        (MONITORING_USERNAME, &credentials.user),
        (MONITORING_PASSWORD, &credentials.password),
    ]
    .into_iter()
    .filter_map(|(key, value)| value.as_ref().map(|v| (key.to_string(), v.clone())))
    .collect()
}

fn storage_secret_keys(type_: BackupStorageType) -> (&'static str, &'static str) {
    match type_ {
        BackupStorageType::S3 => (ACCESS_KEY_ID, SECRET_ACCESS_KEY),
        BackupStorageType::Azure => (AZURE_STORAGE_ACCOUNT_NAME, AZURE_STORAGE_ACCOUNT_KEY),
    }
}

#[async_trait]
impl Handler for KubeHandler {
    async fn create_database_cluster(
        &self,
        _ctx: &RequestContext,
        cluster: DatabaseCluster,
    ) -> Result<DatabaseCluster> {
        let namespace = cluster.namespace().unwrap_or_default();
        let api: Api<DatabaseCluster> = Api::namespaced(self.client.clone(), &namespace);
        let created = api.create(&PostParams::default(), &cluster).await?;
        info!(namespace = %namespace, name = %created.name_any(), "created database cluster");
        Ok(created)
    }

    async fn update_database_cluster(
        &self,
        _ctx: &RequestContext,
        cluster: DatabaseCluster,
    ) -> Result<DatabaseCluster> {
        let namespace = cluster.namespace().unwrap_or_default();
        let api: Api<DatabaseCluster> = Api::namespaced(self.client.clone(), &namespace);
        Ok(api
            .replace(&cluster.name_any(), &PostParams::default(), &cluster)
            .await?)
    }

    async fn delete_database_cluster(
        &self,
        _ctx: &RequestContext,
        namespace: &str,
        name: &str,
    ) -> Result<()> {
        let api: Api<DatabaseCluster> = Api::namespaced(self.client.clone(), namespace);
        api.delete(name, &DeleteParams::default()).await?;
        info!(namespace = %namespace, name = %name, "deleted database cluster");
        Ok(())
    }

    async fn get_database_cluster(
        &self,
        _ctx: &RequestContext,
        namespace: &str,
        name: &str,
    ) -> Result<DatabaseCluster> {
        let api: Api<DatabaseCluster> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.get(name).await?)
    }

    async fn list_database_clusters(
        &self,
        _ctx: &RequestContext,
        namespace: &str,
    ) -> Result<Vec<DatabaseCluster>> {
        let api: Api<DatabaseCluster> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.list(&ListParams::default()).await?.items)
    }

    async fn create_database_cluster_backup(
        &self,
        _ctx: &RequestContext,
        backup: DatabaseClusterBackup,
    ) -> Result<DatabaseClusterBackup> {
        let namespace = backup.namespace().unwrap_or_default();
        let api: Api<DatabaseClusterBackup> = Api::namespaced(self.client.clone(), &namespace);
        Ok(api.create(&PostParams::default(), &backup).await?)
    }

    async fn create_database_cluster_restore(
        &self,
        _ctx: &RequestContext,
        restore: DatabaseClusterRestore,
    ) -> Result<DatabaseClusterRestore> {
        let namespace = restore.namespace().unwrap_or_default();
        let api: Api<DatabaseClusterRestore> = Api::namespaced(self.client.clone(), &namespace);
        Ok(api.create(&PostParams::default(), &restore).await?)
    }

    async fn create_backup_storage(
        &self,
        _ctx: &RequestContext,
        req: CreateBackupStorageRequest,
    ) -> Result<BackupStorage> {
        let namespace = req.namespace();
        let mut storage = req.storage;
        if storage.spec.credentials_secret_name.is_empty() {
            storage.spec.credentials_secret_name = storage.name_any();
        }

        let (access, secret) = storage_secret_keys(storage.spec.type_);
        let data = BTreeMap::from([
            (access.to_string(), req.credentials.access_key),
            (secret.to_string(), req.credentials.secret_key),
        ]);

        let api: Api<BackupStorage> = Api::namespaced(self.client.clone(), &namespace);
        let secret_name = storage.spec.credentials_secret_name.clone();
        let created = self
            .create_with_secret(api, &namespace, &secret_name, data, &storage)
            .await?;
        info!(namespace = %namespace, name = %created.name_any(), "created backup storage");
        Ok(created)
    }

    async fn update_backup_storage(
        &self,
        _ctx: &RequestContext,
        req: UpdateBackupStorageRequest,
    ) -> Result<BackupStorage> {
        let api: Api<BackupStorage> = Api::namespaced(self.client.clone(), &req.namespace);
        let current = api.get(&req.name).await?;
        let updated = req.apply(&current);

        if req.changes_credentials() {
            let (access, secret) = storage_secret_keys(current.spec.type_);
            let mut data = BTreeMap::new();
            if let Some(key) = &req.access_key {
                data.insert(access.to_string(), key.clone());
            }
            if let Some(key) = &req.secret_key {
                data.insert(secret.to_string(), key.clone());
            }
            self.patch_secret(&req.namespace, &current.spec.credentials_secret_name, data)
                .await?;
        }

        Ok(api
            .replace(&req.name, &PostParams::default(), &updated)
            .await?)
    }

    async fn delete_backup_storage(
        &self,
        _ctx: &RequestContext,
        namespace: &str,
        name: &str,
    ) -> Result<()> {
        let api: Api<BackupStorage> = Api::namespaced(self.client.clone(), namespace);
        let storage = api.get(name).await?;
        api.delete(name, &DeleteParams::default()).await?;
        self.delete_secret(namespace, &storage.spec.credentials_secret_name)
            .await?;
        info!(namespace = %namespace, name = %name, "deleted backup storage");
        Ok(())
    }

    async fn list_backup_storages(
        &self,
        _ctx: &RequestContext,
        namespace: &str,
    ) -> Result<Vec<BackupStorage>> {
        let api: Api<BackupStorage> = Api::namespaced(self.client.clone(), namespace);
        Ok(api.list(&ListParams::default()).await?.items)
    }

    async fn create_monitoring_instance(
        &self,
        _ctx: &RequestContext,
        req: CreateMonitoringInstanceRequest,
    ) -> Result<MonitoringConfig> {
        let namespace = req.namespace();
        let mut config = req.config;
        if config.spec.credentials_secret_name.is_empty() {
            config.spec.credentials_secret_name = config.name_any();
        }

        let api: Api<MonitoringConfig> = Api::namespaced(self.client.clone(), &namespace);
        let secret_name = config.spec.credentials_secret_name.clone();
        let data = monitoring_secret_data(&req.credentials);
        Ok(self
            .create_with_secret(api, &namespace, &secret_name, data, &config)
            .await?)
    }

    async fn update_monitoring_instance(
        &self,
        _ctx: &RequestContext,
        req: UpdateMonitoringInstanceRequest,
    ) -> Result<MonitoringConfig> {
        let api: Api<MonitoringConfig> = Api::namespaced(self.client.clone(), &req.namespace);
        let current = api.get(&req.name).await?;
        let updated = req.apply(&current);

        if let Some(credentials) = &req.credentials {
            self.patch_secret(
                &req.namespace,
                &current.spec.credentials_secret_name,
                monitoring_secret_data(credentials),
            )
            .await?;
        }

        Ok(api
            .replace(&req.name, &PostParams::default(), &updated)
            .await?)
    }

    async fn delete_monitoring_instance(
        &self,
        _ctx: &RequestContext,
        namespace: &str,
        name: &str,
    ) -> Result<()> {
        let api: Api<MonitoringConfig> = Api::namespaced(self.client.clone(), namespace);
        let config = api.get(name).await?;
        api.delete(name, &DeleteParams::default()).await?;
        self.delete_secret(namespace, &config.spec.credentials_secret_name)
            .await
    }

    async fn create_pod_scheduling_policy(
        &self,
        _ctx: &RequestContext,
        policy: PodSchedulingPolicy,
    ) -> Result<PodSchedulingPolicy> {
        let api: Api<PodSchedulingPolicy> = Api::all(self.client.clone());
        Ok(api.create(&PostParams::default(), &policy).await?)
    }

    async fn update_pod_scheduling_policy(
        &self,
        _ctx: &RequestContext,
        policy: PodSchedulingPolicy,
    ) -> Result<PodSchedulingPolicy> {
        let api: Api<PodSchedulingPolicy> = Api::all(self.client.clone());
        Ok(api
            .replace(&policy.name_any(), &PostParams::default(), &policy)
            .await?)
    }

    async fn delete_pod_scheduling_policy(&self, _ctx: &RequestContext, name: &str) -> Result<()> {
        let api: Api<PodSchedulingPolicy> = Api::all(self.client.clone());
        api.delete(name, &DeleteParams::default()).await?;
        Ok(())
    }

    async fn create_load_balancer_config(
        &self,
        _ctx: &RequestContext,
        config: LoadBalancerConfig,
    ) -> Result<LoadBalancerConfig> {
        let api: Api<LoadBalancerConfig> = Api::all(self.client.clone());
        Ok(api.create(&PostParams::default(), &config).await?)
    }

    async fn update_load_balancer_config(
        &self,
        _ctx: &RequestContext,
        config: LoadBalancerConfig,
    ) -> Result<LoadBalancerConfig> {
        let api: Api<LoadBalancerConfig> = Api::all(self.client.clone());
        Ok(api
            .replace(&config.name_any(), &PostParams::default(), &config)
            .await?)
    }

    async fn delete_load_balancer_config(&self, _ctx: &RequestContext, name: &str) -> Result<()> {
        let api: Api<LoadBalancerConfig> = Api::all(self.client.clone());
        api.delete(name, &DeleteParams::default()).await?;
        Ok(())
    }

    async fn create_split_horizon_dns_config(
        &self,
        _ctx: &RequestContext,
        req: CreateSplitHorizonDnsConfigRequest,
    ) -> Result<SplitHorizonDNSConfig> {
        let namespace = req.namespace();
        let mut config = req.config;
        if config.spec.tls.secret_name.is_empty() {
            config.spec.tls.secret_name = config.name_any();
        }

        let api: Api<SplitHorizonDNSConfig> = Api::namespaced(self.client.clone(), &namespace);
        let secret_name = config.spec.tls.secret_name.clone();
        let data = BTreeMap::from([
            (CA_CERT.to_string(), req.ca.cert),
            (CA_KEY.to_string(), req.ca.key),
        ]);
        Ok(self
            .create_with_secret(api, &namespace, &secret_name, data, &config)
            .await?)
    }

    async fn update_split_horizon_dns_config(
        &self,
        _ctx: &RequestContext,
        req: UpdateSplitHorizonDnsConfigRequest,
    ) -> Result<SplitHorizonDNSConfig> {
        let api: Api<SplitHorizonDNSConfig> = Api::namespaced(self.client.clone(), &req.namespace);
        let current = api.get(&req.name).await?;
        let updated = req.apply(&current);

        if let Some(ca) = &req.ca {
            let data = BTreeMap::from([
                (CA_CERT.to_string(), ca.cert.clone()),
                (CA_KEY.to_string(), ca.key.clone()),
            ]);
            self.patch_secret(&req.namespace, &current.spec.tls.secret_name, data)
                .await?;
        }

        Ok(api
            .replace(&req.name, &PostParams::default(), &updated)
            .await?)
    }
}
