//! In-memory collaborators
//!
//! [`FakeState`] answers [`ClusterState`] reads from vectors, [`FakeProbe`]
//! can succeed, fail or never return, and [`RecordingHandler`] is a terminal
//! handler that remembers which operations reached it.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use dbaas_policy::crd::{
    BackupStorage, DatabaseCluster, DatabaseClusterBackup, DatabaseClusterRestore, DatabaseEngine,
    EngineType, LoadBalancerConfig, MonitoringConfig, PodSchedulingPolicy, SplitHorizonDNSConfig,
};
use dbaas_policy::pipeline::{
    CreateBackupStorageRequest, Handler, RequestContext, StorageCredentials,
    UpdateBackupStorageRequest,
};
use dbaas_policy::policies::{ProbeError, StorageProbe};
use dbaas_policy::preflight::VersionService;
use dbaas_policy::state::ClusterState;
use dbaas_policy::{Error, Result};
use kube::ResourceExt;

fn not_found(kind: &str, name: &str) -> Error {
    Error::NotFound(format!("{kind} {name} not found"))
}

fn in_namespace<K: ResourceExt>(resource: &K, namespace: &str) -> bool {
    resource.namespace().as_deref() == Some(namespace)
}

// =============================================================================
// Cluster state
// =============================================================================

#[derive(Default)]
struct Objects {
    clusters: Vec<DatabaseCluster>,
    engines: Vec<DatabaseEngine>,
    storages: Vec<BackupStorage>,
    backups: Vec<DatabaseClusterBackup>,
    load_balancer_configs: Vec<LoadBalancerConfig>,
    monitoring_configs: Vec<MonitoringConfig>,
    pod_scheduling_policies: Vec<PodSchedulingPolicy>,
    split_horizon_configs: Vec<SplitHorizonDNSConfig>,
    secrets: BTreeMap<(String, String), BTreeMap<String, String>>,
}

#[derive(Default)]
pub struct FakeState {
    objects: Mutex<Objects>,
}

impl FakeState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_engines(self, engines: Vec<DatabaseEngine>) -> Self {
        self.objects.lock().unwrap().engines.extend(engines);
        self
    }

    pub fn with_cluster(self, cluster: DatabaseCluster) -> Self {
        self.objects.lock().unwrap().clusters.push(cluster);
        self
    }

    pub fn with_storage(self, storage: BackupStorage) -> Self {
        self.objects.lock().unwrap().storages.push(storage);
        self
    }

    pub fn with_backup(self, backup: DatabaseClusterBackup) -> Self {
        self.objects.lock().unwrap().backups.push(backup);
        self
    }

    pub fn with_load_balancer_config(self, config: LoadBalancerConfig) -> Self {
        self.objects.lock().unwrap().load_balancer_configs.push(config);
        self
    }

    pub fn with_monitoring_config(self, config: MonitoringConfig) -> Self {
        self.objects.lock().unwrap().monitoring_configs.push(config);
        self
    }

    pub fn with_pod_scheduling_policy(self, policy: PodSchedulingPolicy) -> Self {
        self.objects.lock().unwrap().pod_scheduling_policies.push(policy);
        self
    }

    pub fn with_split_horizon_config(self, config: SplitHorizonDNSConfig) -> Self {
        self.objects.lock().unwrap().split_horizon_configs.push(config);
        self
    }

    pub fn with_secret(self, namespace: &str, name: &str, data: BTreeMap<String, String>) -> Self {
        self.objects
            .lock()
            .unwrap()
            .secrets
            .insert((namespace.to_string(), name.to_string()), data);
        self
    }

    /// Add a backup after the state has been shared
    pub fn add_backup(&self, backup: DatabaseClusterBackup) {
        self.objects.lock().unwrap().backups.push(backup);
    }
}

#[async_trait]
impl ClusterState for FakeState {
    async fn get_database_cluster(&self, namespace: &str, name: &str) -> Result<DatabaseCluster> {
        let objects = self.objects.lock().unwrap();
        objects
            .clusters
            .iter()
            .find(|c| in_namespace(*c, namespace) && c.name_any() == name)
            .cloned()
            .ok_or_else(|| not_found("databasecluster", name))
    }

    async fn list_database_clusters(
        &self,
        namespace: Option<&str>,
    ) -> Result<Vec<DatabaseCluster>> {
        let objects = self.objects.lock().unwrap();
        Ok(objects
            .clusters
            .iter()
            .filter(|c| namespace.is_none_or(|ns| in_namespace(*c, ns)))
            .cloned()
            .collect())
    }

    async fn get_database_engine(
        &self,
        namespace: &str,
        engine_type: EngineType,
    ) -> Result<DatabaseEngine> {
        let objects = self.objects.lock().unwrap();
        objects
            .engines
            .iter()
            .find(|e| in_namespace(*e, namespace) && e.spec.type_ == engine_type)
            .cloned()
            .ok_or_else(|| not_found("databaseengine", engine_type.operator_name()))
    }

    async fn get_backup_storage(&self, namespace: &str, name: &str) -> Result<BackupStorage> {
        let objects = self.objects.lock().unwrap();
        objects
            .storages
            .iter()
            .find(|s| in_namespace(*s, namespace) && s.name_any() == name)
            .cloned()
            .ok_or_else(|| not_found("backupstorage", name))
    }

    async fn list_backup_storages(&self, namespace: &str) -> Result<Vec<BackupStorage>> {
        let objects = self.objects.lock().unwrap();
        Ok(objects
            .storages
            .iter()
            .filter(|s| in_namespace(*s, namespace))
            .cloned()
            .collect())
    }

    async fn list_database_cluster_backups(
        &self,
        namespace: &str,
        cluster: &str,
    ) -> Result<Vec<DatabaseClusterBackup>> {
        let objects = self.objects.lock().unwrap();
        Ok(objects
            .backups
            .iter()
            .filter(|b| in_namespace(*b, namespace) && b.spec.db_cluster_name == cluster)
            .cloned()
            .collect())
    }

    async fn get_database_cluster_backup(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<DatabaseClusterBackup> {
        let objects = self.objects.lock().unwrap();
        objects
            .backups
            .iter()
            .find(|b| in_namespace(*b, namespace) && b.name_any() == name)
            .cloned()
            .ok_or_else(|| not_found("databaseclusterbackup", name))
    }

    async fn get_load_balancer_config(&self, name: &str) -> Result<LoadBalancerConfig> {
        let objects = self.objects.lock().unwrap();
        objects
            .load_balancer_configs
            .iter()
            .find(|c| c.name_any() == name)
            .cloned()
            .ok_or_else(|| not_found("loadbalancerconfig", name))
    }

    async fn get_monitoring_config(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<MonitoringConfig> {
        let objects = self.objects.lock().unwrap();
        objects
            .monitoring_configs
            .iter()
            .find(|c| in_namespace(*c, namespace) && c.name_any() == name)
            .cloned()
            .ok_or_else(|| not_found("monitoringconfig", name))
    }

    async fn get_pod_scheduling_policy(&self, name: &str) -> Result<PodSchedulingPolicy> {
        let objects = self.objects.lock().unwrap();
        objects
            .pod_scheduling_policies
            .iter()
            .find(|p| p.name_any() == name)
            .cloned()
            .ok_or_else(|| not_found("podschedulingpolicy", name))
    }

    async fn get_split_horizon_dns_config(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<SplitHorizonDNSConfig> {
        let objects = self.objects.lock().unwrap();
        objects
            .split_horizon_configs
            .iter()
            .find(|c| in_namespace(*c, namespace) && c.name_any() == name)
            .cloned()
            .ok_or_else(|| not_found("splithorizondnsconfig", name))
    }

    async fn get_secret_data(
        &self,
        namespace: &str,
        name: &str,
    ) -> Result<BTreeMap<String, String>> {
        let objects = self.objects.lock().unwrap();
        objects
            .secrets
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
            .ok_or_else(|| not_found("secret", name))
    }
}

// =============================================================================
// Storage probe
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProbeBehavior {
    Succeed,
    Fail,
    /// Never completes; only a timeout ends the probe
    Hang,
}

pub struct FakeProbe {
    behavior: ProbeBehavior,
    calls: AtomicUsize,
}

impl FakeProbe {
    pub fn new(behavior: ProbeBehavior) -> Self {
        Self {
            behavior,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StorageProbe for FakeProbe {
    async fn probe(
        &self,
        _storage: &BackupStorage,
        _credentials: &StorageCredentials,
    ) -> Result<(), ProbeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.behavior {
            ProbeBehavior::Succeed => Ok(()),
            ProbeBehavior::Fail => Err(ProbeError::Rejected(
                "AccessDenied: key AKIAEXAMPLE is not authorized".to_string(),
            )),
            ProbeBehavior::Hang => std::future::pending().await,
        }
    }
}

// =============================================================================
// Version service
// =============================================================================

/// Returns a fixed version list, or fails when constructed with `None`
pub struct FakeVersions {
    versions: Option<Vec<String>>,
}

impl FakeVersions {
    pub fn new(versions: &[&str]) -> Self {
        Self {
            versions: Some(versions.iter().map(|v| v.to_string()).collect()),
        }
    }

    pub fn unavailable() -> Self {
        Self { versions: None }
    }
}

#[async_trait]
impl VersionService for FakeVersions {
    async fn supported_engine_versions(
        &self,
        _operator: &str,
        _version: &str,
    ) -> Result<Vec<String>> {
        self.versions
            .clone()
            .ok_or_else(|| Error::Dependency("version service returned 503".to_string()))
    }
}

// =============================================================================
// Terminal handler
// =============================================================================

/// Terminal handler that echoes its input and records each operation
#[derive(Default)]
pub struct RecordingHandler {
    calls: Mutex<Vec<&'static str>>,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, operation: &'static str) {
        self.calls.lock().unwrap().push(operation);
    }
}

#[async_trait]
impl Handler for RecordingHandler {
    async fn create_database_cluster(
        &self,
        _ctx: &RequestContext,
        cluster: DatabaseCluster,
    ) -> Result<DatabaseCluster> {
        self.record("create_database_cluster");
        Ok(cluster)
    }

    async fn update_database_cluster(
        &self,
        _ctx: &RequestContext,
        cluster: DatabaseCluster,
    ) -> Result<DatabaseCluster> {
        self.record("update_database_cluster");
        Ok(cluster)
    }

    async fn create_database_cluster_backup(
        &self,
        _ctx: &RequestContext,
        backup: DatabaseClusterBackup,
    ) -> Result<DatabaseClusterBackup> {
        self.record("create_database_cluster_backup");
        Ok(backup)
    }

    async fn create_database_cluster_restore(
        &self,
        _ctx: &RequestContext,
        restore: DatabaseClusterRestore,
    ) -> Result<DatabaseClusterRestore> {
        self.record("create_database_cluster_restore");
        Ok(restore)
    }

    async fn create_backup_storage(
        &self,
        _ctx: &RequestContext,
        req: CreateBackupStorageRequest,
    ) -> Result<BackupStorage> {
        self.record("create_backup_storage");
        Ok(req.storage)
    }

    async fn update_backup_storage(
        &self,
        _ctx: &RequestContext,
        req: UpdateBackupStorageRequest,
    ) -> Result<BackupStorage> {
        self.record("update_backup_storage");
        Ok(BackupStorage::new(&req.name, Default::default()))
    }

    async fn delete_backup_storage(
        &self,
        _ctx: &RequestContext,
        _namespace: &str,
        _name: &str,
    ) -> Result<()> {
        self.record("delete_backup_storage");
        Ok(())
    }
}
