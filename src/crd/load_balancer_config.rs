use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Label marking the platform-shipped config, which is read-only
pub const DEFAULT_LOAD_BALANCER_CONFIG_LABEL: &str = "dbaas.io/default-load-balancer-config";

/// LoadBalancerConfig carries cloud specific annotations for load balancer services
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[kube(
    group = "dbaas.io",
    version = "v1alpha1",
    kind = "LoadBalancerConfig",
    plural = "loadbalancerconfigs",
    shortname = "lbc"
)]
#[serde(rename_all = "camelCase")]
pub struct LoadBalancerConfigSpec {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

impl LoadBalancerConfig {
    pub fn is_default(&self) -> bool {
        self.metadata
            .labels
            .as_ref()
            .and_then(|l| l.get(DEFAULT_LOAD_BALANCER_CONFIG_LABEL))
            .is_some_and(|v| v == "true")
    }
}
