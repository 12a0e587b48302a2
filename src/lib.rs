pub mod config;
pub mod crd;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod pitr;
pub mod policies;
pub mod preflight;
pub mod state;

pub use config::{PolicyConfig, ResourceFloors};
pub use error::{Error, Result, ValidationError};
pub use metrics::{Metrics, Outcome};
pub use pipeline::{Chain, ChainBuilder, Handler, KubeHandler, RequestContext};
pub use pitr::{RecoveryWindow, recovery_window};
pub use policies::{EndpointProbe, Policies, PolicyValidator, StorageProbe};
pub use preflight::{OperatorUpgradePreflight, VersionService, run_preflight};
pub use state::{ClusterState, KubeState};

use std::sync::Arc;

use kube::Client;

/// Name of the validation layer in chains built by [`default_chain`]
pub const POLICY_LAYER: &str = "policy";

/// Build the standard chain: policy validation in front of the Kubernetes API.
pub fn default_chain(
    client: Client,
    config: PolicyConfig,
    metrics: Option<Arc<Metrics>>,
) -> Result<Chain> {
    let state: Arc<dyn ClusterState> = Arc::new(KubeState::new(client.clone()));
    let policies = Arc::new(Policies::new(state, Arc::new(EndpointProbe::new()), config)?);

    tracing::info!("building admission chain");
    Ok(ChainBuilder::new()
        .layer(POLICY_LAYER, move |next| {
            let validator = PolicyValidator::new(policies, next);
            let handler: Arc<dyn Handler> = Arc::new(match metrics {
                Some(metrics) => validator.with_metrics(metrics),
                None => validator,
            });
            handler
        })
        .build(Arc::new(KubeHandler::new(client))))
}
