use k8s_openapi::api::core::v1::Affinity;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::EngineType;

/// Label marking platform-shipped policies, which are read-only
pub const DEFAULT_POD_SCHEDULING_POLICY_LABEL: &str = "dbaas.io/default-pod-scheduling-policy";

/// PodSchedulingPolicy holds affinity rules applied to a cluster's pods
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[kube(
    group = "dbaas.io",
    version = "v1alpha1",
    kind = "PodSchedulingPolicy",
    plural = "podschedulingpolicies",
    shortname = "psp",
    printcolumn = r#"{"name":"Engine", "type":"string", "jsonPath":".spec.engineType"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct PodSchedulingPolicySpec {
    pub engine_type: EngineType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affinity_config: Option<AffinityConfig>,
}

/// Engine specific affinity; only the entry matching the engine type may be set
#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
pub struct AffinityConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pxc: Option<PxcAffinityConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub psmdb: Option<PsmdbAffinityConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postgresql: Option<PostgresqlAffinityConfig>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
pub struct PxcAffinityConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<Affinity>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<Affinity>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PsmdbAffinityConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<Affinity>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<Affinity>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_server: Option<Affinity>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
pub struct PostgresqlAffinityConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<Affinity>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<Affinity>,
}

fn has_rules(affinity: &Option<Affinity>) -> bool {
    affinity.as_ref().is_some_and(|a| {
        a.node_affinity.is_some() || a.pod_affinity.is_some() || a.pod_anti_affinity.is_some()
    })
}

impl PxcAffinityConfig {
    pub fn is_empty(&self) -> bool {
        !has_rules(&self.engine) && !has_rules(&self.proxy)
    }
}

impl PsmdbAffinityConfig {
    pub fn is_empty(&self) -> bool {
        !has_rules(&self.engine) && !has_rules(&self.proxy) && !has_rules(&self.config_server)
    }
}

impl PostgresqlAffinityConfig {
    pub fn is_empty(&self) -> bool {
        !has_rules(&self.engine) && !has_rules(&self.proxy)
    }
}

impl PodSchedulingPolicy {
    /// Whether the policy ships with the platform
    pub fn is_default(&self) -> bool {
        self.metadata
            .labels
            .as_ref()
            .and_then(|l| l.get(DEFAULT_POD_SCHEDULING_POLICY_LABEL))
            .is_some_and(|v| v == "true")
    }
}
