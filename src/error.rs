//! Error types for the admission pipeline
//!
//! Every rejection carries exactly one [`ValidationError`] wrapped in
//! [`Error::InvalidRequest`], so callers can tell client mistakes apart from
//! missing objects and failing dependencies.

use thiserror::Error;

use crate::crd::{EngineType, ProxyType};

/// Error variants are named by kind rather than by the resource they concern.
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] ValidationError),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    /// A collaborator failed; the message never carries credentials
    #[error("{0}")]
    Dependency(String),

    #[error("Kubernetes API error: {0}")]
    Kube(#[source] kube::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// No handler in the chain implements the operation
    #[error("operation {0} is not handled by any handler in the chain")]
    Unhandled(&'static str),
}

impl Error {
    pub fn is_invalid_request(&self) -> bool {
        matches!(self, Error::InvalidRequest(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict(_))
    }

    /// The rule that rejected the request, if this is a validation failure
    pub fn validation(&self) -> Option<&ValidationError> {
        match self {
            Error::InvalidRequest(v) => Some(v),
            _ => None,
        }
    }
}

impl From<kube::Error> for Error {
    fn from(e: kube::Error) -> Self {
        match e {
            kube::Error::Api(ref resp) if resp.code == 404 => Error::NotFound(resp.message.clone()),
            kube::Error::Api(ref resp) if resp.code == 409 => Error::Conflict(resp.message.clone()),
            other => Error::Kube(other),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// One variant per admission rule.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    // Names
    #[error(
        "'{0}' is not a valid name: use lowercase alphanumeric characters or '-', start with a letter and end with an alphanumeric character"
    )]
    InvalidName(String),
    #[error("name '{name}' is longer than {max} characters")]
    NameTooLong { name: String, max: usize },

    // Engine
    #[error("engine {0} is not installed")]
    UnsupportedEngine(EngineType),
    #[error("engine version {0} is not supported")]
    UnsupportedVersion(String),
    #[error("replicas cannot be negative")]
    NegativeReplicas,
    #[error("{0} engine replicas must be an odd number")]
    EvenReplicas(EngineType),
    #[error("{engine} engine supports at most {max} replicas")]
    TooManyReplicas { engine: EngineType, max: i32 },

    // Proxy
    #[error("proxy {proxy} is not supported by the {engine} engine")]
    UnsupportedProxy { engine: EngineType, proxy: ProxyType },
    #[error("at least 2 proxy replicas are required for a multi-node cluster")]
    InsufficientProxyReplicas,
    #[error("load balancer config can only be set when the proxy is exposed as a load balancer")]
    LoadBalancerConfigRequiresLoadBalancer,
    #[error("load balancer config {0} does not exist")]
    LoadBalancerConfigNotFound(String),

    // Scheduled backups
    #[error("backups are enabled but no schedule is defined")]
    NoBackupSchedules,
    #[error("backup schedule name cannot be empty")]
    EmptyScheduleName,
    #[error("backup schedule {0} must specify a backup storage")]
    EmptyScheduleStorage(String),
    #[error("more than one backup schedule uses '{0}'; schedules must be unique")]
    DuplicateSchedule(String),

    // PITR
    #[error("PITR requires a backup storage")]
    PitrStorageRequired,
    #[error("PITR upload interval must be a positive number of seconds")]
    InvalidUploadInterval,
    #[error("PITR is only supported on S3 compatible storages")]
    PitrRequiresS3,

    // Storage topology
    #[error("backup storage {0} does not exist")]
    BackupStorageNotFound(String),
    #[error("backup storage {storage} is not allowed in namespace {namespace}")]
    BackupStorageNotAllowed { storage: String, namespace: String },
    #[error("a MongoDB cluster can use only one backup storage")]
    MultipleStorages,
    #[error("the cluster already uses backup storage {0}; schedules must use it too")]
    ActiveStorageMismatch(String),

    // Data source
    #[error("data source must specify exactly one of dbClusterBackupName or backupSource")]
    DataSourceAmbiguous,
    #[error("backup source requires both backupStorageName and path")]
    IncompleteBackupSource,
    #[error("unsupported PITR type; only 'date' is supported")]
    UnsupportedPitrType,
    #[error("invalid PITR date; expected format 2006-01-02T15:04:05Z")]
    InvalidPitrDate,

    // PostgreSQL repositories
    #[error("PostgreSQL clusters support at most {0} backup schedules")]
    TooManySchedules(usize),
    #[error("PostgreSQL clusters can use at most {0} distinct backup storages")]
    TooManyRepositories(usize),
    #[error("backup schedule {0} cannot change its backup storage")]
    ScheduleStorageChanged(String),

    // Sharding
    #[error("sharding is not supported for the {0} engine")]
    ShardingNotSupported(EngineType),
    #[error("sharding requires operator version {0} or newer")]
    ShardingVersionTooOld(String),
    #[error("sharding requires at least one shard")]
    InsufficientShards,
    #[error("config server replicas must be an odd number")]
    EvenConfigServers,
    #[error("config server replicas must be at least {0}")]
    InsufficientConfigServers(i32),
    #[error("sharding cannot be enabled on an existing cluster")]
    ShardingEnableForbidden,
    #[error("sharding cannot be disabled once enabled")]
    ShardingDisableForbidden,

    // Resources
    #[error("CPU and memory must be specified")]
    ResourcesMissing,
    #[error("CPU must be specified")]
    CpuMissing,
    #[error("memory must be specified")]
    MemoryMissing,
    #[error("storage size must be specified")]
    StorageMissing,
    #[error("CPU limit must be at least {0}")]
    CpuBelowMinimum(String),
    #[error("memory limit must be at least {0}")]
    MemoryBelowMinimum(String),
    #[error("storage size must be at least {0}")]
    StorageBelowMinimum(String),
    #[error("'{0}' is not a valid resource quantity")]
    InvalidQuantity(String),

    // Version upgrades
    #[error("'{0}' is not a valid version")]
    InvalidVersion(String),
    #[error("cannot downgrade engine version from {from} to {to}")]
    Downgrade { from: String, to: String },
    #[error("major version upgrade from {from} to {to} is not supported")]
    MajorUpgrade { from: String, to: String },
    #[error("cannot upgrade from {from} to {to}; upgrade one major version at a time")]
    NonSequentialMajorUpgrade { from: String, to: String },

    // Cluster updates
    #[error("cannot scale a multi-node cluster down to a single node")]
    ScaleDownToSingleNode,

    // Backup storages
    #[error("another backup storage already uses the same bucket, region and endpoint")]
    DuplicateBackupStorage,
    #[error(
        "'{0}' is not a valid bucket name: use 3-63 lowercase letters, digits, dots or hyphens"
    )]
    InvalidBucketName(String),
    #[error("region is required for S3 storages")]
    RegionRequired,
    #[error("access key and secret key are required")]
    CredentialsRequired,
    #[error("'{0}' is not a valid URL")]
    InvalidUrl(String),
    #[error("cannot change {0} of a backup storage that is in use")]
    StorageInUse(&'static str),
    #[error("backup storage {0} is in use and cannot be deleted")]
    StorageInUseDelete(String),

    // Ad hoc backups and restores
    #[error("database cluster {0} does not exist")]
    ClusterNotFound(String),
    #[error("backup {0} does not exist")]
    BackupNotFound(String),
    #[error("backup {backup} does not belong to cluster {cluster}")]
    BackupClusterMismatch { backup: String, cluster: String },

    // Monitoring
    #[error("monitoring instance {0} does not exist")]
    MonitoringConfigNotFound(String),
    #[error("monitoring credentials require an API key or a user and password")]
    MonitoringCredentialsRequired,
    #[error("monitoring instance {0} is in use and cannot be deleted")]
    MonitoringConfigInUse(String),

    // Pod scheduling policies
    #[error("pod scheduling policy {0} does not exist")]
    PodSchedulingPolicyNotFound(String),
    #[error("pod scheduling policy {policy} is for {expected} clusters, not {actual}")]
    PodSchedulingPolicyEngineMismatch {
        policy: String,
        expected: EngineType,
        actual: EngineType,
    },
    #[error("affinity config may only contain rules for the {0} engine")]
    ForeignAffinityConfig(EngineType),
    #[error("affinity config for the {0} engine must not be empty")]
    EmptyAffinityConfig(EngineType),
    #[error("engine type of a pod scheduling policy cannot be changed")]
    PolicyEngineTypeImmutable,
    #[error("default pod scheduling policy {0} is read-only")]
    DefaultPolicyReadOnly(String),
    #[error("pod scheduling policy {0} is in use and cannot be deleted")]
    PodSchedulingPolicyInUse(String),

    // Load balancer configs
    #[error("'{0}' is not a valid annotation key")]
    InvalidAnnotationKey(String),
    #[error("default load balancer config {0} is read-only")]
    DefaultLoadBalancerConfigReadOnly(String),

    // Split-horizon DNS
    #[error("split-horizon DNS is only supported for the psmdb engine")]
    SplitHorizonNotSupported,
    #[error("split-horizon DNS config {0} does not exist")]
    SplitHorizonConfigNotFound(String),
    #[error("'{0}' is not a valid domain name")]
    InvalidDomain(String),
    #[error("{0} must be a PEM encoded block")]
    InvalidPem(&'static str),
}

impl ValidationError {
    /// Stable machine readable reason for the rejection
    pub fn reason(&self) -> &'static str {
        match self {
            ValidationError::InvalidName(_) => "InvalidName",
            ValidationError::NameTooLong { .. } => "NameTooLong",
            ValidationError::UnsupportedEngine(_) => "UnsupportedEngine",
            ValidationError::UnsupportedVersion(_) => "UnsupportedVersion",
            ValidationError::NegativeReplicas => "NegativeReplicas",
            ValidationError::EvenReplicas(_) => "EvenReplicas",
            ValidationError::TooManyReplicas { .. } => "TooManyReplicas",
            ValidationError::UnsupportedProxy { .. } => "UnsupportedProxy",
            ValidationError::InsufficientProxyReplicas => "InsufficientProxyReplicas",
            ValidationError::LoadBalancerConfigRequiresLoadBalancer => {
                "LoadBalancerConfigRequiresLoadBalancer"
            }
            ValidationError::LoadBalancerConfigNotFound(_) => "LoadBalancerConfigNotFound",
            ValidationError::NoBackupSchedules => "NoBackupSchedules",
            ValidationError::EmptyScheduleName => "EmptyScheduleName",
            ValidationError::EmptyScheduleStorage(_) => "EmptyScheduleStorage",
            ValidationError::DuplicateSchedule(_) => "DuplicateSchedule",
            ValidationError::PitrStorageRequired => "PitrStorageRequired",
            ValidationError::InvalidUploadInterval => "InvalidUploadInterval",
            ValidationError::PitrRequiresS3 => "PitrRequiresS3",
            ValidationError::BackupStorageNotFound(_) => "BackupStorageNotFound",
            ValidationError::BackupStorageNotAllowed { .. } => "BackupStorageNotAllowed",
            ValidationError::MultipleStorages => "MultipleStorages",
            ValidationError::ActiveStorageMismatch(_) => "ActiveStorageMismatch",
            ValidationError::DataSourceAmbiguous => "DataSourceAmbiguous",
            ValidationError::IncompleteBackupSource => "IncompleteBackupSource",
            ValidationError::UnsupportedPitrType => "UnsupportedPitrType",
            ValidationError::InvalidPitrDate => "InvalidPitrDate",
            ValidationError::TooManySchedules(_) => "TooManySchedules",
            ValidationError::TooManyRepositories(_) => "TooManyRepositories",
            ValidationError::ScheduleStorageChanged(_) => "ScheduleStorageChanged",
            ValidationError::ShardingNotSupported(_) => "ShardingNotSupported",
            ValidationError::ShardingVersionTooOld(_) => "ShardingVersionTooOld",
            ValidationError::InsufficientShards => "InsufficientShards",
            ValidationError::EvenConfigServers => "EvenConfigServers",
            ValidationError::InsufficientConfigServers(_) => "InsufficientConfigServers",
            ValidationError::ShardingEnableForbidden => "ShardingEnableForbidden",
            ValidationError::ShardingDisableForbidden => "ShardingDisableForbidden",
            ValidationError::ResourcesMissing => "ResourcesMissing",
            ValidationError::CpuMissing => "CpuMissing",
            ValidationError::MemoryMissing => "MemoryMissing",
            ValidationError::StorageMissing => "StorageMissing",
            ValidationError::CpuBelowMinimum(_) => "CpuBelowMinimum",
            ValidationError::MemoryBelowMinimum(_) => "MemoryBelowMinimum",
            ValidationError::StorageBelowMinimum(_) => "StorageBelowMinimum",
            ValidationError::InvalidQuantity(_) => "InvalidQuantity",
            ValidationError::InvalidVersion(_) => "InvalidVersion",
            ValidationError::Downgrade { .. } => "VersionDowngradeNotAllowed",
            ValidationError::MajorUpgrade { .. } => "MajorUpgradeNotAllowed",
            ValidationError::NonSequentialMajorUpgrade { .. } => "NonSequentialMajorUpgrade",
            ValidationError::ScaleDownToSingleNode => "ScaleDownToSingleNode",
            ValidationError::DuplicateBackupStorage => "DuplicateBackupStorage",
            ValidationError::InvalidBucketName(_) => "InvalidBucketName",
            ValidationError::RegionRequired => "RegionRequired",
            ValidationError::CredentialsRequired => "CredentialsRequired",
            ValidationError::InvalidUrl(_) => "InvalidUrl",
            ValidationError::StorageInUse(_) => "StorageInUse",
            ValidationError::StorageInUseDelete(_) => "StorageInUse",
            ValidationError::ClusterNotFound(_) => "ClusterNotFound",
            ValidationError::BackupNotFound(_) => "BackupNotFound",
            ValidationError::BackupClusterMismatch { .. } => "BackupClusterMismatch",
            ValidationError::MonitoringConfigNotFound(_) => "MonitoringConfigNotFound",
            ValidationError::MonitoringCredentialsRequired => "MonitoringCredentialsRequired",
            ValidationError::MonitoringConfigInUse(_) => "MonitoringConfigInUse",
            ValidationError::PodSchedulingPolicyNotFound(_) => "PodSchedulingPolicyNotFound",
            ValidationError::PodSchedulingPolicyEngineMismatch { .. } => {
                "PodSchedulingPolicyEngineMismatch"
            }
            ValidationError::ForeignAffinityConfig(_) => "ForeignAffinityConfig",
            ValidationError::EmptyAffinityConfig(_) => "EmptyAffinityConfig",
            ValidationError::PolicyEngineTypeImmutable => "PolicyEngineTypeImmutable",
            ValidationError::DefaultPolicyReadOnly(_) => "DefaultPolicyReadOnly",
            ValidationError::PodSchedulingPolicyInUse(_) => "PodSchedulingPolicyInUse",
            ValidationError::InvalidAnnotationKey(_) => "InvalidAnnotationKey",
            ValidationError::DefaultLoadBalancerConfigReadOnly(_) => {
                "DefaultLoadBalancerConfigReadOnly"
            }
            ValidationError::SplitHorizonNotSupported => "SplitHorizonNotSupported",
            ValidationError::SplitHorizonConfigNotFound(_) => "SplitHorizonConfigNotFound",
            ValidationError::InvalidDomain(_) => "InvalidDomain",
            ValidationError::InvalidPem(_) => "InvalidPem",
        }
    }
}
