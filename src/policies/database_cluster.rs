//! Database cluster policies
//!
//! ## Create
//!
//! Rules run in a fixed order and the first failure is reported: name,
//! engine and version, replicas, resources, proxy, sharding, backup
//! schedules, PITR, storage topology, data source, PostgreSQL repository
//! budget, then references to other objects.
//!
//! ## Update
//!
//! The persisted cluster is read first. Version changes go through the
//! upgrade policy, replicas may not collapse to a single node, sharding
//! cannot be toggled and PostgreSQL schedules keep their storage. The
//! data source is ignored after creation.

use std::collections::{BTreeSet, HashSet};

use kube::ResourceExt;
use tracing::debug;

use super::names::validate_name_with_max;
use super::quantity::parse_quantity;
use super::version::{at_least, validate_upgrade};
use super::{NotFoundExt, Policies};
use crate::config::{PolicyConfig, ResourceFloors};
use crate::crd::{
    BackupSchedule, BackupSpec, BackupStorageType, DataSource, DatabaseCluster,
    DatabaseClusterSpec, DatabaseEngine, EngineSpec, EngineType, ExposeType, PitrType,
    ShardingSpec,
};
use crate::error::{Result, ValidationError};

/// Layout PITR dates must use
pub const PITR_DATE_FORMAT: &str = "2006-01-02T15:04:05Z";
const PITR_DATE_STRTIME: &str = "%Y-%m-%dT%H:%M:%SZ";

// ============================================================================
// Engine
// ============================================================================

/// Replica count rules per engine
pub fn validate_replicas(engine: &EngineSpec, pxc_max: i32) -> Result<(), ValidationError> {
    let replicas = engine.replicas;
    if replicas < 0 {
        return Err(ValidationError::NegativeReplicas);
    }

    match engine.type_ {
        EngineType::Pxc | EngineType::Psmdb if replicas > 0 && replicas % 2 == 0 => {
            return Err(ValidationError::EvenReplicas(engine.type_));
        }
        EngineType::Pxc if replicas > pxc_max => {
            return Err(ValidationError::TooManyReplicas {
                engine: engine.type_,
                max: pxc_max,
            });
        }
        _ => {}
    }

    Ok(())
}

/// A multi-node cluster cannot be scaled down to one node
pub fn validate_scale_down(old: &EngineSpec, new: &EngineSpec) -> Result<(), ValidationError> {
    if old.replicas > 1 && new.replicas == 1 {
        return Err(ValidationError::ScaleDownToSingleNode);
    }
    Ok(())
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Minimum CPU, memory and storage, checked in that order
pub fn validate_resources(
    engine: &EngineSpec,
    config: &PolicyConfig,
    floors: &ResourceFloors,
) -> Result<(), ValidationError> {
    let (cpu, memory) = match (
        non_empty(&engine.resources.cpu),
        non_empty(&engine.resources.memory),
    ) {
        (None, None) => return Err(ValidationError::ResourcesMissing),
        (None, Some(_)) => return Err(ValidationError::CpuMissing),
        (Some(_), None) => return Err(ValidationError::MemoryMissing),
        (Some(cpu), Some(memory)) => (cpu, memory),
    };

    if parse_quantity(cpu)? < floors.cpu {
        return Err(ValidationError::CpuBelowMinimum(config.min_cpu.clone()));
    }
    if parse_quantity(memory)? < floors.memory {
        return Err(ValidationError::MemoryBelowMinimum(config.min_memory.clone()));
    }

    let size = engine.storage.size.trim();
    if size.is_empty() {
        return Err(ValidationError::StorageMissing);
    }
    if parse_quantity(size)? < floors.storage {
        return Err(ValidationError::StorageBelowMinimum(config.min_storage.clone()));
    }

    Ok(())
}

// ============================================================================
// Proxy
// ============================================================================

pub fn validate_proxy(spec: &DatabaseClusterSpec) -> Result<(), ValidationError> {
    let engine = spec.engine.type_;
    let proxy = &spec.proxy;

    if let Some(proxy_type) = proxy.type_
        && !engine.supports_proxy(proxy_type)
    {
        return Err(ValidationError::UnsupportedProxy {
            engine,
            proxy: proxy_type,
        });
    }

    if let Some(replicas) = proxy.replicas {
        if replicas < 0 {
            return Err(ValidationError::NegativeReplicas);
        }
        if engine == EngineType::Pxc && spec.engine.replicas > 1 && replicas < 2 {
            return Err(ValidationError::InsufficientProxyReplicas);
        }
    }

    if non_empty(&proxy.expose.load_balancer_config_name).is_some()
        && proxy.expose.type_ != ExposeType::LoadBalancer
    {
        return Err(ValidationError::LoadBalancerConfigRequiresLoadBalancer);
    }

    Ok(())
}

// ============================================================================
// Sharding
// ============================================================================

/// Rules for an enabled sharding spec
pub fn validate_sharding(
    engine: &EngineSpec,
    sharding: &ShardingSpec,
    operator_version: &str,
    min_operator_version: &str,
) -> Result<(), ValidationError> {
    if engine.type_ != EngineType::Psmdb {
        return Err(ValidationError::ShardingNotSupported(engine.type_));
    }
    if !at_least(operator_version, min_operator_version) {
        return Err(ValidationError::ShardingVersionTooOld(
            min_operator_version.to_string(),
        ));
    }
    if sharding.shards < 1 {
        return Err(ValidationError::InsufficientShards);
    }

    let config_servers = sharding.config_server.replicas;
    if config_servers % 2 == 0 {
        return Err(ValidationError::EvenConfigServers);
    }
    let minimum = if engine.replicas == 1 { 1 } else { 3 };
    if config_servers < minimum {
        return Err(ValidationError::InsufficientConfigServers(minimum));
    }

    Ok(())
}

/// Sharding is fixed when the cluster is created
pub fn validate_sharding_change(
    old: &DatabaseCluster,
    new: &DatabaseCluster,
) -> Result<(), ValidationError> {
    match (old.sharding_enabled(), new.sharding_enabled()) {
        (false, true) => Err(ValidationError::ShardingEnableForbidden),
        (true, false) => Err(ValidationError::ShardingDisableForbidden),
        _ => Ok(()),
    }
}

// ============================================================================
// Backups
// ============================================================================

/// Schedules need a name, a storage when enabled, and a unique cron expression
pub fn validate_backup_schedules(backup: &BackupSpec) -> Result<(), ValidationError> {
    if backup.enabled && backup.schedules.is_empty() {
        return Err(ValidationError::NoBackupSchedules);
    }

    let mut crons = HashSet::new();
    for schedule in &backup.schedules {
        if schedule.name.trim().is_empty() {
            return Err(ValidationError::EmptyScheduleName);
        }
        if schedule.enabled && schedule.backup_storage_name.is_empty() {
            return Err(ValidationError::EmptyScheduleStorage(schedule.name.clone()));
        }
        if !crons.insert(schedule.schedule.as_str()) {
            return Err(ValidationError::DuplicateSchedule(schedule.schedule.clone()));
        }
    }

    Ok(())
}

pub fn validate_pitr(spec: &DatabaseClusterSpec) -> Result<(), ValidationError> {
    let pitr = &spec.backup.pitr;
    if !pitr.enabled {
        return Ok(());
    }

    let has_storage = pitr
        .backup_storage_name
        .as_deref()
        .is_some_and(|s| !s.is_empty());
    if spec.engine.type_ == EngineType::Pxc && !has_storage {
        return Err(ValidationError::PitrStorageRequired);
    }
    if pitr.upload_interval_sec.is_some_and(|i| i <= 0) {
        return Err(ValidationError::InvalidUploadInterval);
    }

    Ok(())
}

/// PSMDB clusters are bound to a single storage
pub fn validate_psmdb_storages(
    schedules: &[BackupSchedule],
    active_storage: Option<&str>,
) -> Result<(), ValidationError> {
    let storages: BTreeSet<&str> = schedules
        .iter()
        .map(|s| s.backup_storage_name.as_str())
        .filter(|s| !s.is_empty())
        .collect();

    if storages.len() > 1 {
        return Err(ValidationError::MultipleStorages);
    }
    if let Some(active) = active_storage
        && storages.iter().any(|s| *s != active)
    {
        return Err(ValidationError::ActiveStorageMismatch(active.to_string()));
    }

    Ok(())
}

/// pgBackRest repository budget
///
/// Every schedule occupies a repository, and the distinct storages used by
/// schedules and existing backups together may not exceed `max`.
pub fn validate_pg_repositories<'a>(
    schedules: &'a [BackupSchedule],
    backup_storages: impl IntoIterator<Item = &'a str>,
    max: usize,
) -> Result<(), ValidationError> {
    if schedules.len() > max {
        return Err(ValidationError::TooManySchedules(max));
    }

    let storages: BTreeSet<&str> = schedules
        .iter()
        .map(|s| s.backup_storage_name.as_str())
        .chain(backup_storages)
        .filter(|s| !s.is_empty())
        .collect();
    if storages.len() > max {
        return Err(ValidationError::TooManyRepositories(max));
    }

    Ok(())
}

/// Existing PostgreSQL schedules keep the storage they were created with
pub fn validate_schedule_storages_unchanged(
    old: &[BackupSchedule],
    new: &[BackupSchedule],
) -> Result<(), ValidationError> {
    for schedule in new {
        if let Some(previous) = old.iter().find(|s| s.name == schedule.name)
            && previous.backup_storage_name != schedule.backup_storage_name
        {
            return Err(ValidationError::ScheduleStorageChanged(schedule.name.clone()));
        }
    }
    Ok(())
}

// ============================================================================
// Data source
// ============================================================================

/// Accepts only `2006-01-02T15:04:05Z`
pub fn validate_pitr_date(date: &str) -> Result<(), ValidationError> {
    let well_formed = date.len() == PITR_DATE_FORMAT.len()
        && date.bytes().zip(PITR_DATE_FORMAT.bytes()).all(|(c, f)| {
            if f.is_ascii_digit() {
                c.is_ascii_digit()
            } else {
                c == f
            }
        });
    if !well_formed {
        return Err(ValidationError::InvalidPitrDate);
    }

    // jiff clamps a leap second to :59, the layout tops out at 59
    if date.get(17..19).is_none_or(|seconds| seconds > "59") {
        return Err(ValidationError::InvalidPitrDate);
    }

    jiff::fmt::strtime::parse(PITR_DATE_STRTIME, date)
        .and_then(|tm| tm.to_datetime())
        .map(|_| ())
        .map_err(|_| ValidationError::InvalidPitrDate)
}

pub fn validate_data_source(source: &DataSource) -> Result<(), ValidationError> {
    let has_backup_name = source
        .db_cluster_backup_name
        .as_deref()
        .is_some_and(|n| !n.is_empty());

    match (has_backup_name, &source.backup_source) {
        (true, Some(_)) | (false, None) => return Err(ValidationError::DataSourceAmbiguous),
        (false, Some(backup_source)) => {
            if backup_source.backup_storage_name.is_empty() || backup_source.path.is_empty() {
                return Err(ValidationError::IncompleteBackupSource);
            }
        }
        (true, None) => {}
    }

    if let Some(pitr) = &source.pitr {
        if pitr.type_ != PitrType::Date {
            return Err(ValidationError::UnsupportedPitrType);
        }
        validate_pitr_date(pitr.date.as_deref().unwrap_or_default())?;
    }

    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Storage names referenced by schedules and PITR, plus the restore source on create
fn topology_storages(spec: &DatabaseClusterSpec, include_data_source: bool) -> BTreeSet<&str> {
    let schedules = spec
        .backup
        .schedules
        .iter()
        .map(|s| s.backup_storage_name.as_str());
    let pitr = spec
        .backup
        .pitr
        .backup_storage_name
        .as_deref()
        .filter(|_| spec.backup.pitr.enabled);
    let source = spec
        .data_source
        .as_ref()
        .filter(|_| include_data_source)
        .and_then(|d| d.backup_source.as_ref())
        .map(|b| b.backup_storage_name.as_str());

    schedules
        .chain(pitr)
        .chain(source)
        .filter(|s| !s.is_empty())
        .collect()
}

impl Policies {
    pub async fn validate_database_cluster_create(&self, cluster: &DatabaseCluster) -> Result<()> {
        let namespace = cluster.namespace().unwrap_or_default();
        let name = cluster.name_any();
        let spec = &cluster.spec;
        debug!(namespace = %namespace, name = %name, engine = %spec.engine.type_, "validating database cluster create");

        validate_name_with_max(&name, self.config.max_cluster_name_length)?;
        let engine = self.resolve_engine(&namespace, spec.engine.type_).await?;
        if !engine.permits_version(&spec.engine.version) {
            return Err(ValidationError::UnsupportedVersion(spec.engine.version.clone()).into());
        }
        validate_replicas(&spec.engine, self.config.pxc_max_replicas)?;
        validate_resources(&spec.engine, &self.config, &self.floors)?;
        validate_proxy(spec)?;
        if let Some(sharding) = spec.sharding.as_ref().filter(|s| s.enabled) {
            validate_sharding(
                &spec.engine,
                sharding,
                engine.operator_version(),
                &self.config.min_sharding_operator_version,
            )?;
        }
        validate_backup_schedules(&spec.backup)?;
        validate_pitr(spec)?;
        self.validate_storage_topology(&namespace, spec, cluster.active_storage(), true)
            .await?;
        if let Some(source) = &spec.data_source {
            validate_data_source(source)?;
        }
        if spec.engine.type_ == EngineType::Postgresql {
            self.validate_pg_budget(&namespace, &name, &spec.backup.schedules, None)
                .await?;
        }
        self.validate_references(&namespace, spec).await
    }

    pub async fn validate_database_cluster_update(&self, cluster: &DatabaseCluster) -> Result<()> {
        let namespace = cluster.namespace().unwrap_or_default();
        let name = cluster.name_any();
        let spec = &cluster.spec;
        debug!(namespace = %namespace, name = %name, engine = %spec.engine.type_, "validating database cluster update");

        let old = self.state.get_database_cluster(&namespace, &name).await?;

        let engine = self.resolve_engine(&namespace, spec.engine.type_).await?;
        if spec.engine.version != old.spec.engine.version {
            validate_upgrade(
                spec.engine.type_,
                &old.spec.engine.version,
                &spec.engine.version,
            )?;
            if !engine.permits_version(&spec.engine.version) {
                return Err(
                    ValidationError::UnsupportedVersion(spec.engine.version.clone()).into(),
                );
            }
        }
        validate_replicas(&spec.engine, self.config.pxc_max_replicas)?;
        validate_scale_down(&old.spec.engine, &spec.engine)?;
        validate_resources(&spec.engine, &self.config, &self.floors)?;
        validate_proxy(spec)?;
        validate_sharding_change(&old, cluster)?;
        if let Some(sharding) = spec.sharding.as_ref().filter(|s| s.enabled) {
            validate_sharding(
                &spec.engine,
                sharding,
                engine.operator_version(),
                &self.config.min_sharding_operator_version,
            )?;
        }
        validate_backup_schedules(&spec.backup)?;
        validate_pitr(spec)?;
        self.validate_storage_topology(&namespace, spec, old.active_storage(), false)
            .await?;
        if spec.engine.type_ == EngineType::Postgresql {
            validate_schedule_storages_unchanged(
                &old.spec.backup.schedules,
                &spec.backup.schedules,
            )?;
            self.validate_pg_budget(&namespace, &name, &spec.backup.schedules, None)
                .await?;
        }
        self.validate_references(&namespace, spec).await
    }

    /// The installed engine for `engine_type`
    pub(crate) async fn resolve_engine(
        &self,
        namespace: &str,
        engine_type: EngineType,
    ) -> Result<DatabaseEngine> {
        let engine = self
            .state
            .get_database_engine(namespace, engine_type)
            .await
            .or_reject(|| ValidationError::UnsupportedEngine(engine_type))?;
        if !engine.is_installed() {
            return Err(ValidationError::UnsupportedEngine(engine_type).into());
        }
        Ok(engine)
    }

    async fn validate_storage_topology(
        &self,
        namespace: &str,
        spec: &DatabaseClusterSpec,
        active_storage: Option<&str>,
        include_data_source: bool,
    ) -> Result<()> {
        if spec.engine.type_ == EngineType::Psmdb {
            validate_psmdb_storages(&spec.backup.schedules, active_storage)?;
        }

        let pitr_storage = spec
            .backup
            .pitr
            .backup_storage_name
            .as_deref()
            .filter(|_| spec.backup.pitr.enabled && spec.engine.type_ == EngineType::Pxc);

        for name in topology_storages(spec, include_data_source) {
            let storage = self
                .state
                .get_backup_storage(namespace, name)
                .await
                .or_reject(|| ValidationError::BackupStorageNotFound(name.to_string()))?;
            if !storage.is_allowed_in(namespace) {
                return Err(ValidationError::BackupStorageNotAllowed {
                    storage: name.to_string(),
                    namespace: namespace.to_string(),
                }
                .into());
            }
            if pitr_storage == Some(name) && storage.spec.type_ != BackupStorageType::S3 {
                return Err(ValidationError::PitrRequiresS3.into());
            }
        }

        Ok(())
    }

    /// Repository budget over the schedules, existing backups and an in-flight backup
    pub(crate) async fn validate_pg_budget(
        &self,
        namespace: &str,
        cluster: &str,
        schedules: &[BackupSchedule],
        in_flight: Option<&str>,
    ) -> Result<()> {
        let backups = self
            .state
            .list_database_cluster_backups(namespace, cluster)
            .await?;
        let storages = backups
            .iter()
            .map(|b| b.spec.backup_storage_name.as_str())
            .chain(in_flight);
        validate_pg_repositories(schedules, storages, self.config.pg_max_repositories)?;
        Ok(())
    }

    /// Monitoring, load balancer, scheduling policy and split-horizon references
    async fn validate_references(&self, namespace: &str, spec: &DatabaseClusterSpec) -> Result<()> {
        if let Some(name) = spec
            .monitoring
            .as_ref()
            .and_then(|m| non_empty(&m.monitoring_config_name))
        {
            self.state
                .get_monitoring_config(namespace, name)
                .await
                .or_reject(|| ValidationError::MonitoringConfigNotFound(name.to_string()))?;
        }

        if let Some(name) = non_empty(&spec.proxy.expose.load_balancer_config_name) {
            self.state
                .get_load_balancer_config(name)
                .await
                .or_reject(|| ValidationError::LoadBalancerConfigNotFound(name.to_string()))?;
        }

        if let Some(name) = non_empty(&spec.pod_scheduling_policy_name) {
            let policy = self
                .state
                .get_pod_scheduling_policy(name)
                .await
                .or_reject(|| ValidationError::PodSchedulingPolicyNotFound(name.to_string()))?;
            if policy.spec.engine_type != spec.engine.type_ {
                return Err(ValidationError::PodSchedulingPolicyEngineMismatch {
                    policy: name.to_string(),
                    expected: policy.spec.engine_type,
                    actual: spec.engine.type_,
                }
                .into());
            }
        }

        if let Some(name) = spec
            .engine_features
            .as_ref()
            .and_then(|f| f.psmdb.as_ref())
            .and_then(|p| non_empty(&p.split_horizon_dns_config_name))
        {
            if spec.engine.type_ != EngineType::Psmdb {
                return Err(ValidationError::SplitHorizonNotSupported.into());
            }
            self.state
                .get_split_horizon_dns_config(namespace, name)
                .await
                .or_reject(|| ValidationError::SplitHorizonConfigNotFound(name.to_string()))?;
        }

        Ok(())
    }
}
