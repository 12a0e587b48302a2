use std::collections::BTreeMap;

use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::EngineType;

/// DatabaseEngine describes an installed database operator and the engine
/// versions it can run. Maintained by the platform, read-only here.
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[kube(
    group = "dbaas.io",
    version = "v1alpha1",
    kind = "DatabaseEngine",
    plural = "databaseengines",
    shortname = "dbengine",
    namespaced,
    status = "DatabaseEngineStatus",
    printcolumn = r#"{"name":"Type", "type":"string", "jsonPath":".spec.type"}"#,
    printcolumn = r#"{"name":"Operator", "type":"string", "jsonPath":".status.operatorVersion"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseEngineSpec {
    #[serde(rename = "type")]
    pub type_: EngineType,

    /// Engine versions administrators allow; empty allows every available version
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_versions: Vec<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseEngineStatus {
    #[serde(default)]
    pub status: EngineState,

    #[serde(default)]
    pub available_versions: Versions,

    /// Installed operator version
    #[serde(default)]
    pub operator_version: String,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, JsonSchema, PartialEq, Eq)]
pub enum EngineState {
    #[default]
    #[serde(rename = "not installed")]
    NotInstalled,
    #[serde(rename = "installing")]
    Installing,
    #[serde(rename = "installed")]
    Installed,
    #[serde(rename = "upgrading")]
    Upgrading,
}

/// Component versions keyed by version string
#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
pub struct Versions {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub engine: BTreeMap<String, Component>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub backup: BTreeMap<String, Component>,

    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub proxy: BTreeMap<String, BTreeMap<String, Component>>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    #[serde(default)]
    pub status: ComponentStatus,

    #[serde(default)]
    pub image_path: String,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    Recommended,
    #[default]
    Available,
    Unavailable,
    Unsupported,
}

impl DatabaseEngine {
    /// Whether `version` may be requested for a cluster of this engine
    ///
    /// An empty version defers to the operator default and is always permitted.
    pub fn permits_version(&self, version: &str) -> bool {
        if version.is_empty() {
            return true;
        }
        if !self.spec.allowed_versions.is_empty() {
            return self.spec.allowed_versions.iter().any(|v| v == version);
        }
        self.status
            .as_ref()
            .is_some_and(|s| s.available_versions.engine.contains_key(version))
    }

    pub fn operator_version(&self) -> &str {
        self.status
            .as_ref()
            .map(|s| s.operator_version.as_str())
            .unwrap_or_default()
    }

    pub fn is_installed(&self) -> bool {
        self.status
            .as_ref()
            .is_some_and(|s| s.status != EngineState::NotInstalled)
    }
}
