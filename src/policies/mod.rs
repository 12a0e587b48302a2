//! Admission policies
//!
//! [`Policies`] holds the rule set and the read-only collaborators it
//! consults. [`PolicyValidator`] puts it into the request pipeline: every
//! mutating operation is checked in full before it is forwarded, so a
//! rejected request never reaches the persistence handler.
//!
//! Rule families live in one module each. Pure checks are free functions
//! returning [`ValidationError`]; checks that read cluster state are
//! methods on [`Policies`].

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::{PolicyConfig, ResourceFloors};
use crate::crd::{
    BackupStorage, DatabaseCluster, DatabaseClusterBackup, DatabaseClusterRestore,
    LoadBalancerConfig, MonitoringConfig, PodSchedulingPolicy, SplitHorizonDNSConfig,
};
use crate::error::{Error, Result, ValidationError};
use crate::metrics::{Metrics, Outcome};
use crate::pipeline::{
    CreateBackupStorageRequest, CreateMonitoringInstanceRequest,
    CreateSplitHorizonDnsConfigRequest, Handler, RequestContext, UpdateBackupStorageRequest,
    UpdateMonitoringInstanceRequest, UpdateSplitHorizonDnsConfigRequest,
};
use crate::state::ClusterState;

pub mod backup;
pub mod database_cluster;
pub mod load_balancer;
pub mod monitoring;
pub mod names;
pub mod probe;
pub mod quantity;
pub mod scheduling;
pub mod split_horizon;
pub mod storage;
pub mod version;

pub use probe::{EndpointProbe, ProbeError, StorageProbe};

/// Turn a missing referenced object into a rejection
pub(crate) trait NotFoundExt<T> {
    fn or_reject(self, err: impl FnOnce() -> ValidationError) -> Result<T>;
}

impl<T> NotFoundExt<T> for Result<T> {
    fn or_reject(self, err: impl FnOnce() -> ValidationError) -> Result<T> {
        match self {
            Err(Error::NotFound(_)) => Err(err().into()),
            other => other,
        }
    }
}

/// The rule set and the collaborators it reads from
pub struct Policies {
    state: Arc<dyn ClusterState>,
    probe: Arc<dyn StorageProbe>,
    config: PolicyConfig,
    floors: ResourceFloors,
}

impl Policies {
    /// Fails when the configured resource minimums do not parse
    pub fn new(
        state: Arc<dyn ClusterState>,
        probe: Arc<dyn StorageProbe>,
        config: PolicyConfig,
    ) -> Result<Self> {
        let floors = config.resource_floors()?;
        Ok(Self {
            state,
            probe,
            config,
            floors,
        })
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    pub fn state(&self) -> &dyn ClusterState {
        self.state.as_ref()
    }
}

/// Pipeline handler that validates requests before delegating them
pub struct PolicyValidator {
    policies: Arc<Policies>,
    metrics: Option<Arc<Metrics>>,
    next: Arc<dyn Handler>,
}

impl PolicyValidator {
    pub fn new(policies: Arc<Policies>, next: Arc<dyn Handler>) -> Self {
        Self {
            policies,
            metrics: None,
            next,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Run a check, then log and count its outcome
    async fn check(
        &self,
        ctx: &RequestContext,
        operation: &'static str,
        check: impl Future<Output = Result<()>> + Send,
    ) -> Result<()> {
        let started = Instant::now();
        let result = check.await;

        let outcome = match &result {
            Ok(()) => {
                info!(request_id = %ctx.request_id, operation, "request admitted");
                Outcome::Admitted
            }
            Err(Error::InvalidRequest(rule)) => {
                warn!(
                    request_id = %ctx.request_id,
                    operation,
                    reason = rule.reason(),
                    error = %rule,
                    "request rejected"
                );
                if let Some(metrics) = &self.metrics {
                    metrics.record_rejection(rule.reason());
                }
                Outcome::Rejected
            }
            Err(e) => {
                warn!(request_id = %ctx.request_id, operation, error = %e, "validation failed");
                Outcome::Failed
            }
        };

        if let Some(metrics) = &self.metrics {
            metrics.record(operation, outcome, started.elapsed().as_secs_f64());
        }
        result
    }
}

#[async_trait]
impl Handler for PolicyValidator {
    fn next(&self) -> Option<&dyn Handler> {
        Some(self.next.as_ref())
    }

    async fn create_database_cluster(
        &self,
        ctx: &RequestContext,
        cluster: DatabaseCluster,
    ) -> Result<DatabaseCluster> {
        self.check(
            ctx,
            "create_database_cluster",
            self.policies.validate_database_cluster_create(&cluster),
        )
        .await?;
        self.next.create_database_cluster(ctx, cluster).await
    }

    async fn update_database_cluster(
        &self,
        ctx: &RequestContext,
        cluster: DatabaseCluster,
    ) -> Result<DatabaseCluster> {
        self.check(
            ctx,
            "update_database_cluster",
            self.policies.validate_database_cluster_update(&cluster),
        )
        .await?;
        self.next.update_database_cluster(ctx, cluster).await
    }

    async fn create_database_cluster_backup(
        &self,
        ctx: &RequestContext,
        backup: DatabaseClusterBackup,
    ) -> Result<DatabaseClusterBackup> {
        self.check(
            ctx,
            "create_database_cluster_backup",
            self.policies.validate_backup_create(&backup),
        )
        .await?;
        self.next.create_database_cluster_backup(ctx, backup).await
    }

    async fn create_database_cluster_restore(
        &self,
        ctx: &RequestContext,
        restore: DatabaseClusterRestore,
    ) -> Result<DatabaseClusterRestore> {
        self.check(
            ctx,
            "create_database_cluster_restore",
            self.policies.validate_restore_create(&restore),
        )
        .await?;
        self.next.create_database_cluster_restore(ctx, restore).await
    }

    async fn create_backup_storage(
        &self,
        ctx: &RequestContext,
        req: CreateBackupStorageRequest,
    ) -> Result<BackupStorage> {
        self.check(
            ctx,
            "create_backup_storage",
            self.policies.validate_backup_storage_create(&req),
        )
        .await?;
        self.next.create_backup_storage(ctx, req).await
    }

    async fn update_backup_storage(
        &self,
        ctx: &RequestContext,
        req: UpdateBackupStorageRequest,
    ) -> Result<BackupStorage> {
        self.check(
            ctx,
            "update_backup_storage",
            self.policies.validate_backup_storage_update(&req),
        )
        .await?;
        self.next.update_backup_storage(ctx, req).await
    }

    async fn delete_backup_storage(
        &self,
        ctx: &RequestContext,
        namespace: &str,
        name: &str,
    ) -> Result<()> {
        self.check(
            ctx,
            "delete_backup_storage",
            self.policies.validate_backup_storage_delete(namespace, name),
        )
        .await?;
        self.next.delete_backup_storage(ctx, namespace, name).await
    }

    async fn create_monitoring_instance(
        &self,
        ctx: &RequestContext,
        req: CreateMonitoringInstanceRequest,
    ) -> Result<MonitoringConfig> {
        self.check(
            ctx,
            "create_monitoring_instance",
            self.policies.validate_monitoring_create(&req),
        )
        .await?;
        self.next.create_monitoring_instance(ctx, req).await
    }

    async fn update_monitoring_instance(
        &self,
        ctx: &RequestContext,
        req: UpdateMonitoringInstanceRequest,
    ) -> Result<MonitoringConfig> {
        self.check(
            ctx,
            "update_monitoring_instance",
            self.policies.validate_monitoring_update(&req),
        )
        .await?;
        self.next.update_monitoring_instance(ctx, req).await
    }

    async fn delete_monitoring_instance(
        &self,
        ctx: &RequestContext,
        namespace: &str,
        name: &str,
    ) -> Result<()> {
        self.check(
            ctx,
            "delete_monitoring_instance",
            self.policies.validate_monitoring_delete(namespace, name),
        )
        .await?;
        self.next.delete_monitoring_instance(ctx, namespace, name).await
    }

    async fn create_pod_scheduling_policy(
        &self,
        ctx: &RequestContext,
        policy: PodSchedulingPolicy,
    ) -> Result<PodSchedulingPolicy> {
        self.check(
            ctx,
            "create_pod_scheduling_policy",
            self.policies.validate_pod_scheduling_policy_create(&policy),
        )
        .await?;
        self.next.create_pod_scheduling_policy(ctx, policy).await
    }

    async fn update_pod_scheduling_policy(
        &self,
        ctx: &RequestContext,
        policy: PodSchedulingPolicy,
    ) -> Result<PodSchedulingPolicy> {
        self.check(
            ctx,
            "update_pod_scheduling_policy",
            self.policies.validate_pod_scheduling_policy_update(&policy),
        )
        .await?;
        self.next.update_pod_scheduling_policy(ctx, policy).await
    }

    async fn delete_pod_scheduling_policy(&self, ctx: &RequestContext, name: &str) -> Result<()> {
        self.check(
            ctx,
            "delete_pod_scheduling_policy",
            self.policies.validate_pod_scheduling_policy_delete(name),
        )
        .await?;
        self.next.delete_pod_scheduling_policy(ctx, name).await
    }

    async fn create_load_balancer_config(
        &self,
        ctx: &RequestContext,
        config: LoadBalancerConfig,
    ) -> Result<LoadBalancerConfig> {
        self.check(ctx, "create_load_balancer_config", async {
            load_balancer::validate_load_balancer_config(&config).map_err(Error::from)
        })
        .await?;
        self.next.create_load_balancer_config(ctx, config).await
    }

    async fn update_load_balancer_config(
        &self,
        ctx: &RequestContext,
        config: LoadBalancerConfig,
    ) -> Result<LoadBalancerConfig> {
        self.check(
            ctx,
            "update_load_balancer_config",
            self.policies.validate_load_balancer_config_update(&config),
        )
        .await?;
        self.next.update_load_balancer_config(ctx, config).await
    }

    async fn delete_load_balancer_config(&self, ctx: &RequestContext, name: &str) -> Result<()> {
        self.check(
            ctx,
            "delete_load_balancer_config",
            self.policies.validate_load_balancer_config_delete(name),
        )
        .await?;
        self.next.delete_load_balancer_config(ctx, name).await
    }

    async fn create_split_horizon_dns_config(
        &self,
        ctx: &RequestContext,
        req: CreateSplitHorizonDnsConfigRequest,
    ) -> Result<SplitHorizonDNSConfig> {
        self.check(ctx, "create_split_horizon_dns_config", async {
            split_horizon::validate_split_horizon_create(&req).map_err(Error::from)
        })
        .await?;
        self.next.create_split_horizon_dns_config(ctx, req).await
    }

    async fn update_split_horizon_dns_config(
        &self,
        ctx: &RequestContext,
        req: UpdateSplitHorizonDnsConfigRequest,
    ) -> Result<SplitHorizonDNSConfig> {
        self.check(
            ctx,
            "update_split_horizon_dns_config",
            self.policies.validate_split_horizon_update(&req),
        )
        .await?;
        self.next.update_split_horizon_dns_config(ctx, req).await
    }
}
