//! Operator upgrade preflight
//!
//! Before an operator is upgraded every cluster it manages is classified by
//! what has to happen first. Checks run in priority order and the first
//! match wins:
//!
//! 1. **UpgradeEngine** - the engine version is below the minimum the target
//!    operator supports (versions that do not parse count as below)
//! 2. **Restart** - the operator recommends a new CR version
//! 3. **NotReady** - the cluster is not in the ready state
//! 4. **Ready** - nothing to do
//!
//! The result is advisory; nothing is modified.

use std::cmp::Ordering;

use async_trait::async_trait;
use kube::ResourceExt;
use serde::Serialize;
use tracing::{debug, warn};

use crate::crd::{AppState, DatabaseCluster, EngineType};
use crate::error::{Error, Result};
use crate::policies::version::parse_version;
use crate::state::ClusterState;

/// Engine versions each operator release supports
#[async_trait]
pub trait VersionService: Send + Sync {
    /// Supported engine versions for `operator` at `version`, oldest first
    async fn supported_engine_versions(&self, operator: &str, version: &str)
    -> Result<Vec<String>>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum PendingTask {
    UpgradeEngine,
    Restart,
    NotReady,
    Ready,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabasePreflight {
    pub name: String,
    pub pending_task: PendingTask,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperatorUpgradePreflight {
    /// Operator version installed now
    pub current_version: String,
    /// One entry per cluster, in input order
    pub databases: Vec<DatabasePreflight>,
}

fn below_minimum(version: &str, minimum: &str) -> bool {
    match (parse_version(version), parse_version(minimum)) {
        (Ok(v), Ok(min)) => v.cmp_precedence(&min) == Ordering::Less,
        _ => true,
    }
}

/// Classify one cluster
pub fn classify(cluster: &DatabaseCluster, min_engine_version: &str) -> DatabasePreflight {
    let (pending_task, message) = if below_minimum(&cluster.spec.engine.version, min_engine_version)
    {
        (
            PendingTask::UpgradeEngine,
            Some(format!("Upgrade DB version to {min_engine_version}")),
        )
    } else if let Some(cr_version) = cluster
        .status
        .as_ref()
        .and_then(|s| s.recommended_crd_version.as_deref())
    {
        (
            PendingTask::Restart,
            Some(format!("Update CRVersion to {cr_version}")),
        )
    } else if cluster.app_state() != AppState::Ready {
        (
            PendingTask::NotReady,
            Some("Database is not ready".to_string()),
        )
    } else {
        (PendingTask::Ready, None)
    };

    DatabasePreflight {
        name: cluster.name_any(),
        pending_task,
        message,
    }
}

/// Classify every cluster against the minimum engine version of the target operator
pub fn evaluate(
    current_version: &str,
    min_engine_version: &str,
    clusters: &[DatabaseCluster],
) -> OperatorUpgradePreflight {
    OperatorUpgradePreflight {
        current_version: current_version.to_string(),
        databases: clusters
            .iter()
            .map(|c| classify(c, min_engine_version))
            .collect(),
    }
}

/// Read the engine and its clusters, look up the target's minimum version and evaluate
pub async fn run_preflight(
    state: &dyn ClusterState,
    versions: &dyn VersionService,
    namespace: &str,
    engine_type: EngineType,
    target_version: &str,
) -> Result<OperatorUpgradePreflight> {
    let operator = engine_type.operator_name();
    debug!(namespace = %namespace, operator, target = %target_version, "running upgrade preflight");

    let engine = state.get_database_engine(namespace, engine_type).await?;

    let supported = versions
        .supported_engine_versions(operator, target_version)
        .await
        .map_err(|e| {
            warn!(operator, target = %target_version, error = %e, "version lookup failed");
            Error::Dependency(format!(
                "cannot get supported engine versions for {operator} {target_version}"
            ))
        })?;
    let Some(minimum) = supported.first() else {
        return Err(Error::Dependency(format!(
            "no supported engine versions for {operator} {target_version}"
        )));
    };
    if parse_version(minimum).is_err() {
        return Err(Error::Dependency(format!(
            "invalid minimum engine version '{minimum}' for {operator} {target_version}"
        )));
    }

    let clusters: Vec<DatabaseCluster> = state
        .list_database_clusters(Some(namespace))
        .await?
        .into_iter()
        .filter(|c| c.spec.engine.type_ == engine_type)
        .collect();

    Ok(evaluate(engine.operator_version(), minimum, &clusters))
}
