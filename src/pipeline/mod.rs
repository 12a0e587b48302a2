//! Request pipeline
//!
//! Every operation is a method on [`Handler`]. A handler overrides the
//! operations it cares about and forwards the rest to the handler returned
//! by [`Handler::next`]. The default method bodies do the forwarding, so a
//! handler that only validates database clusters implements two methods.
//!
//! Chains are assembled with [`ChainBuilder`], outermost layer first:
//!
//! ```ignore
//! let chain = ChainBuilder::new()
//!     .layer("policy", move |next| Arc::new(PolicyValidator::new(state, probe, config, next)))
//!     .build(Arc::new(KubeHandler::new(client)));
//! ```

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::crd::{
    BackupStorage, DatabaseCluster, DatabaseClusterBackup, DatabaseClusterRestore,
    LoadBalancerConfig, MonitoringConfig, PodSchedulingPolicy, SplitHorizonDNSConfig,
};
use crate::error::{Error, Result};

pub mod kube_handler;
pub mod requests;

pub use kube_handler::KubeHandler;
pub use requests::*;

/// Per-request metadata threaded through the chain
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// Correlates log lines of a single request
    pub request_id: String,
    /// Authenticated caller, when the hosting server knows it
    pub subject: Option<String>,
}

impl RequestContext {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            subject: None,
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }
}

/// Forward an operation to the next handler, or fail when the chain ends here
macro_rules! forward {
    ($self:ident . $op:ident ( $($arg:expr),* )) => {
        match $self.next() {
            Some(next) => next.$op($($arg),*).await,
            None => Err(Error::Unhandled(stringify!($op))),
        }
    };
}

#[async_trait]
pub trait Handler: Send + Sync {
    /// The handler operations are delegated to
    fn next(&self) -> Option<&dyn Handler> {
        None
    }

    // Database clusters

    async fn create_database_cluster(
        &self,
        ctx: &RequestContext,
        cluster: DatabaseCluster,
    ) -> Result<DatabaseCluster> {
        forward!(self.create_database_cluster(ctx, cluster))
    }

    async fn update_database_cluster(
        &self,
        ctx: &RequestContext,
        cluster: DatabaseCluster,
    ) -> Result<DatabaseCluster> {
        forward!(self.update_database_cluster(ctx, cluster))
    }

    async fn delete_database_cluster(
        &self,
        ctx: &RequestContext,
        namespace: &str,
        name: &str,
    ) -> Result<()> {
        forward!(self.delete_database_cluster(ctx, namespace, name))
    }

    async fn get_database_cluster(
        &self,
        ctx: &RequestContext,
        namespace: &str,
        name: &str,
    ) -> Result<DatabaseCluster> {
        forward!(self.get_database_cluster(ctx, namespace, name))
    }

    async fn list_database_clusters(
        &self,
        ctx: &RequestContext,
        namespace: &str,
    ) -> Result<Vec<DatabaseCluster>> {
        forward!(self.list_database_clusters(ctx, namespace))
    }

    // Backups and restores

    async fn create_database_cluster_backup(
        &self,
        ctx: &RequestContext,
        backup: DatabaseClusterBackup,
    ) -> Result<DatabaseClusterBackup> {
        forward!(self.create_database_cluster_backup(ctx, backup))
    }

    async fn create_database_cluster_restore(
        &self,
        ctx: &RequestContext,
        restore: DatabaseClusterRestore,
    ) -> Result<DatabaseClusterRestore> {
        forward!(self.create_database_cluster_restore(ctx, restore))
    }

    // Backup storages

    async fn create_backup_storage(
        &self,
        ctx: &RequestContext,
        req: CreateBackupStorageRequest,
    ) -> Result<BackupStorage> {
        forward!(self.create_backup_storage(ctx, req))
    }

    async fn update_backup_storage(
        &self,
        ctx: &RequestContext,
        req: UpdateBackupStorageRequest,
    ) -> Result<BackupStorage> {
        forward!(self.update_backup_storage(ctx, req))
    }

    async fn delete_backup_storage(
        &self,
        ctx: &RequestContext,
        namespace: &str,
        name: &str,
    ) -> Result<()> {
        forward!(self.delete_backup_storage(ctx, namespace, name))
    }

    async fn list_backup_storages(
        &self,
        ctx: &RequestContext,
        namespace: &str,
    ) -> Result<Vec<BackupStorage>> {
        forward!(self.list_backup_storages(ctx, namespace))
    }

    // Monitoring instances

    async fn create_monitoring_instance(
        &self,
        ctx: &RequestContext,
        req: CreateMonitoringInstanceRequest,
    ) -> Result<MonitoringConfig> {
        forward!(self.create_monitoring_instance(ctx, req))
    }

    async fn update_monitoring_instance(
        &self,
        ctx: &RequestContext,
        req: UpdateMonitoringInstanceRequest,
    ) -> Result<MonitoringConfig> {
        forward!(self.update_monitoring_instance(ctx, req))
    }

    async fn delete_monitoring_instance(
        &self,
        ctx: &RequestContext,
        namespace: &str,
        name: &str,
    ) -> Result<()> {
        forward!(self.delete_monitoring_instance(ctx, namespace, name))
    }

    // Pod scheduling policies (cluster scoped)

    async fn create_pod_scheduling_policy(
        &self,
        ctx: &RequestContext,
        policy: PodSchedulingPolicy,
    ) -> Result<PodSchedulingPolicy> {
        forward!(self.create_pod_scheduling_policy(ctx, policy))
    }

    async fn update_pod_scheduling_policy(
        &self,
        ctx: &RequestContext,
        policy: PodSchedulingPolicy,
    ) -> Result<PodSchedulingPolicy> {
        forward!(self.update_pod_scheduling_policy(ctx, policy))
    }

    async fn delete_pod_scheduling_policy(&self, ctx: &RequestContext, name: &str) -> Result<()> {
        forward!(self.delete_pod_scheduling_policy(ctx, name))
    }

    // Load balancer configs (cluster scoped)

    async fn create_load_balancer_config(
        &self,
        ctx: &RequestContext,
        config: LoadBalancerConfig,
    ) -> Result<LoadBalancerConfig> {
        forward!(self.create_load_balancer_config(ctx, config))
    }

    async fn update_load_balancer_config(
        &self,
        ctx: &RequestContext,
        config: LoadBalancerConfig,
    ) -> Result<LoadBalancerConfig> {
        forward!(self.update_load_balancer_config(ctx, config))
    }

    async fn delete_load_balancer_config(&self, ctx: &RequestContext, name: &str) -> Result<()> {
        forward!(self.delete_load_balancer_config(ctx, name))
    }

    // Split-horizon DNS configs

    async fn create_split_horizon_dns_config(
        &self,
        ctx: &RequestContext,
        req: CreateSplitHorizonDnsConfigRequest,
    ) -> Result<SplitHorizonDNSConfig> {
        forward!(self.create_split_horizon_dns_config(ctx, req))
    }

    async fn update_split_horizon_dns_config(
        &self,
        ctx: &RequestContext,
        req: UpdateSplitHorizonDnsConfigRequest,
    ) -> Result<SplitHorizonDNSConfig> {
        forward!(self.update_split_horizon_dns_config(ctx, req))
    }
}

type LayerFn = Box<dyn FnOnce(Arc<dyn Handler>) -> Arc<dyn Handler> + Send>;

/// Ordered list of handler layers wrapped around a terminal handler
#[derive(Default)]
pub struct ChainBuilder {
    layers: Vec<(&'static str, LayerFn)>,
}

impl ChainBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a layer; earlier layers see requests first
    pub fn layer<F>(mut self, name: &'static str, make: F) -> Self
    where
        F: FnOnce(Arc<dyn Handler>) -> Arc<dyn Handler> + Send + 'static,
    {
        self.layers.push((name, Box::new(make)));
        self
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.layers.iter().map(|(name, _)| *name).collect()
    }

    pub fn build(self, terminal: Arc<dyn Handler>) -> Chain {
        let mut names = self.names();
        names.push("terminal");

        let head = self
            .layers
            .into_iter()
            .rev()
            .fold(terminal, |next, (_, make)| make(next));

        Chain { head, names }
    }
}

/// An assembled chain; itself a handler that forwards everything to its head
pub struct Chain {
    head: Arc<dyn Handler>,
    names: Vec<&'static str>,
}

impl Chain {
    /// Layer names in request order, ending with the terminal handler
    pub fn names(&self) -> &[&'static str] {
        &self.names
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain").field("layers", &self.names).finish()
    }
}

#[async_trait]
impl Handler for Chain {
    fn next(&self) -> Option<&dyn Handler> {
        Some(self.head.as_ref())
    }
}
