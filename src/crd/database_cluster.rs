use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// DatabaseCluster is the Schema for the databaseclusters API
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[kube(
    group = "dbaas.io",
    version = "v1alpha1",
    kind = "DatabaseCluster",
    plural = "databaseclusters",
    shortname = "dbc",
    namespaced,
    derive = "PartialEq",
    status = "DatabaseClusterStatus",
    printcolumn = r#"{"name":"Engine", "type":"string", "jsonPath":".spec.engine.type"}"#,
    printcolumn = r#"{"name":"Version", "type":"string", "jsonPath":".spec.engine.version"}"#,
    printcolumn = r#"{"name":"Status", "type":"string", "jsonPath":".status.status"}"#,
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseClusterSpec {
    /// Database engine settings
    pub engine: EngineSpec,

    /// Connection proxy in front of the engine
    #[serde(default)]
    pub proxy: ProxySpec,

    /// Scheduled backups and point-in-time recovery
    #[serde(default)]
    pub backup: BackupSpec,

    /// Restore source, only honoured when the cluster is created
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_source: Option<DataSource>,

    /// Sharded topology (PSMDB only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sharding: Option<ShardingSpec>,

    /// Monitoring instance the cluster reports to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monitoring: Option<MonitoringSpec>,

    /// Name of a PodSchedulingPolicy applied to the cluster's pods
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pod_scheduling_policy_name: Option<String>,

    /// Engine specific optional features
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine_features: Option<EngineFeatures>,

    /// Pause the cluster (scale pods to zero while keeping data)
    #[serde(default)]
    pub paused: bool,
}

/// Database engine technology
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, JsonSchema, PartialEq, Eq, Hash)]
pub enum EngineType {
    /// Percona XtraDB Cluster (MySQL)
    #[default]
    #[serde(rename = "pxc")]
    Pxc,
    /// Percona Server for MongoDB
    #[serde(rename = "psmdb")]
    Psmdb,
    /// PostgreSQL
    #[serde(rename = "postgresql")]
    Postgresql,
}

impl EngineType {
    /// Name of the operator (and of its DatabaseEngine resource) managing this engine
    pub fn operator_name(&self) -> &'static str {
        match self {
            EngineType::Pxc => "percona-xtradb-cluster-operator",
            EngineType::Psmdb => "percona-server-mongodb-operator",
            EngineType::Postgresql => "percona-postgresql-operator",
        }
    }

    /// Backup state reported by the operator once a backup completes
    pub fn backup_succeeded_state(&self) -> &'static str {
        match self {
            EngineType::Pxc | EngineType::Postgresql => "Succeeded",
            EngineType::Psmdb => "ready",
        }
    }

    /// Default interval in seconds between PITR log uploads
    pub fn default_upload_interval_sec(&self) -> i64 {
        match self {
            EngineType::Pxc => 60,
            EngineType::Psmdb => 600,
            EngineType::Postgresql => 60,
        }
    }

    /// Whether `proxy` can front this engine
    pub fn supports_proxy(&self, proxy: ProxyType) -> bool {
        matches!(
            (self, proxy),
            (EngineType::Pxc, ProxyType::HaProxy)
                | (EngineType::Pxc, ProxyType::ProxySql)
                | (EngineType::Postgresql, ProxyType::PgBouncer)
                | (EngineType::Psmdb, ProxyType::Mongos)
        )
    }
}

impl std::fmt::Display for EngineType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineType::Pxc => write!(f, "pxc"),
            EngineType::Psmdb => write!(f, "psmdb"),
            EngineType::Postgresql => write!(f, "postgresql"),
        }
    }
}

/// Database engine settings
#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EngineSpec {
    /// Engine technology
    #[serde(rename = "type")]
    pub type_: EngineType,

    /// Engine version; empty selects the operator's recommended version
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub version: String,

    /// Number of engine nodes
    #[serde(default)]
    pub replicas: i32,

    /// Persistent storage for each engine node
    #[serde(default)]
    pub storage: StorageSpec,

    /// Compute resources for each engine node
    #[serde(default)]
    pub resources: ResourcesSpec,

    /// Engine configuration file contents
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<String>,
}

/// Persistent volume settings
#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StorageSpec {
    /// Volume size (e.g., "10Gi", "25G")
    #[serde(default)]
    pub size: String,

    /// Storage class name (uses default if not specified)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
}

/// Compute resources
#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
pub struct ResourcesSpec {
    /// CPU quantity (e.g., "600m", "1")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpu: Option<String>,

    /// Memory quantity (e.g., "512M", "2Gi")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory: Option<String>,
}

/// Connection proxy technology
#[derive(Serialize, Deserialize, Clone, Copy, Debug, JsonSchema, PartialEq, Eq)]
pub enum ProxyType {
    #[serde(rename = "haproxy")]
    HaProxy,
    #[serde(rename = "proxysql")]
    ProxySql,
    #[serde(rename = "pgbouncer")]
    PgBouncer,
    #[serde(rename = "mongos")]
    Mongos,
}

impl std::fmt::Display for ProxyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProxyType::HaProxy => write!(f, "haproxy"),
            ProxyType::ProxySql => write!(f, "proxysql"),
            ProxyType::PgBouncer => write!(f, "pgbouncer"),
            ProxyType::Mongos => write!(f, "mongos"),
        }
    }
}

/// Proxy settings
#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProxySpec {
    /// Proxy technology; defaulted by the operator when unset
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_: Option<ProxyType>,

    /// Number of proxy pods
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,

    /// How the proxy is exposed outside the cluster
    #[serde(default)]
    pub expose: ExposeSpec,

    /// Compute resources for each proxy pod
    #[serde(default)]
    pub resources: ResourcesSpec,
}

/// Service exposure
#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExposeSpec {
    #[serde(default, rename = "type")]
    pub type_: ExposeType,

    /// LoadBalancerConfig applied to the load balancer service
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_balancer_config_name: Option<String>,

    /// Source CIDRs allowed to reach an external service
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ip_source_ranges: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, JsonSchema, PartialEq, Eq)]
pub enum ExposeType {
    #[default]
    #[serde(rename = "internal")]
    Internal,
    #[serde(rename = "external")]
    External,
    #[serde(rename = "loadBalancer")]
    LoadBalancer,
}

/// Scheduled backups and PITR
#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BackupSpec {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub schedules: Vec<BackupSchedule>,

    #[serde(default)]
    pub pitr: PitrSpec,
}

/// A recurring backup bound to one storage
#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BackupSchedule {
    pub name: String,

    #[serde(default)]
    pub enabled: bool,

    /// Cron expression
    pub schedule: String,

    #[serde(default)]
    pub backup_storage_name: String,

    /// Number of backup copies to keep; 0 keeps all
    #[serde(default)]
    pub retention_copies: i32,
}

/// Point-in-time recovery settings
#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PitrSpec {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_storage_name: Option<String>,

    /// Seconds between log uploads
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upload_interval_sec: Option<i32>,
}

/// Restore-from-backup source
#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DataSource {
    /// Name of a DatabaseClusterBackup in the same namespace
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub db_cluster_backup_name: Option<String>,

    /// Raw backup location on a storage
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_source: Option<BackupSource>,

    /// Point in time to recover to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pitr: Option<PitrSelector>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BackupSource {
    #[serde(default)]
    pub backup_storage_name: String,

    #[serde(default)]
    pub path: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PitrSelector {
    #[serde(default, rename = "type")]
    pub type_: PitrType,

    /// Recovery target, formatted as `2006-01-02T15:04:05Z`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, JsonSchema, PartialEq, Eq)]
pub enum PitrType {
    #[default]
    #[serde(rename = "date")]
    Date,
    #[serde(rename = "latest")]
    Latest,
}

/// Sharded topology
#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ShardingSpec {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default)]
    pub shards: i32,

    #[serde(default)]
    pub config_server: ConfigServerSpec,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
pub struct ConfigServerSpec {
    #[serde(default)]
    pub replicas: i32,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monitoring_config_name: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
pub struct EngineFeatures {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub psmdb: Option<PsmdbFeatures>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PsmdbFeatures {
    /// SplitHorizonDNSConfig giving each replica set member an external name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub split_horizon_dns_config_name: Option<String>,
}

/// Status of the DatabaseCluster, written by the operators
#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseClusterStatus {
    #[serde(default)]
    pub status: AppState,

    /// Storage the PSMDB cluster is bound to after its first backup
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_storage: Option<String>,

    /// CR version the operator currently reconciles the cluster with
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crd_version: Option<String>,

    /// CR version the cluster should be restarted with after an operator upgrade
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommended_crd_version: Option<String>,

    #[serde(default)]
    pub ready: i32,

    #[serde(default)]
    pub size: i32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Cluster run state
#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AppState {
    #[default]
    Unknown,
    New,
    Creating,
    Initializing,
    Ready,
    Paused,
    Pausing,
    Stopping,
    Restoring,
    Upgrading,
    Deleting,
    Error,
}

impl std::fmt::Display for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AppState::Unknown => "unknown",
            AppState::New => "new",
            AppState::Creating => "creating",
            AppState::Initializing => "initializing",
            AppState::Ready => "ready",
            AppState::Paused => "paused",
            AppState::Pausing => "pausing",
            AppState::Stopping => "stopping",
            AppState::Restoring => "restoring",
            AppState::Upgrading => "upgrading",
            AppState::Deleting => "deleting",
            AppState::Error => "error",
        };
        write!(f, "{}", s)
    }
}

impl DatabaseCluster {
    /// Whether sharding is configured and switched on
    pub fn sharding_enabled(&self) -> bool {
        self.spec.sharding.as_ref().is_some_and(|s| s.enabled)
    }

    /// Run state reported by the operator, `Unknown` before the first status write
    pub fn app_state(&self) -> AppState {
        self.status.as_ref().map(|s| s.status).unwrap_or_default()
    }

    /// Storage the cluster is already bound to, if any
    pub fn active_storage(&self) -> Option<&str> {
        self.status
            .as_ref()
            .and_then(|s| s.active_storage.as_deref())
            .filter(|s| !s.is_empty())
    }

    /// Every storage name the cluster spec refers to (schedules, PITR, restore source)
    pub fn referenced_storages(&self) -> impl Iterator<Item = &str> {
        let schedules = self
            .spec
            .backup
            .schedules
            .iter()
            .map(|s| s.backup_storage_name.as_str());
        let pitr = self.spec.backup.pitr.backup_storage_name.as_deref();
        let source = self
            .spec
            .data_source
            .as_ref()
            .and_then(|d| d.backup_source.as_ref())
            .map(|b| b.backup_storage_name.as_str());
        schedules
            .chain(pitr)
            .chain(source)
            .filter(|name| !name.is_empty())
    }
}
