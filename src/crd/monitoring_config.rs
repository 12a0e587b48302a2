use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// MonitoringConfig points clusters at a monitoring server
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[kube(
    group = "dbaas.io",
    version = "v1alpha1",
    kind = "MonitoringConfig",
    plural = "monitoringconfigs",
    shortname = "mc",
    namespaced,
    printcolumn = r#"{"name":"Type", "type":"string", "jsonPath":".spec.type"}"#,
    printcolumn = r#"{"name":"URL", "type":"string", "jsonPath":".spec.pmm.url"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringConfigSpec {
    #[serde(rename = "type")]
    pub type_: MonitoringType,

    #[serde(default)]
    pub pmm: PmmConfig,

    /// Secret holding the API key or user credentials
    pub credentials_secret_name: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_namespaces: Vec<String>,

    #[serde(default, rename = "verifyTLS", skip_serializing_if = "Option::is_none")]
    pub verify_tls: Option<bool>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, JsonSchema, PartialEq, Eq)]
pub enum MonitoringType {
    #[default]
    #[serde(rename = "pmm")]
    Pmm,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
pub struct PmmConfig {
    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub image: String,
}
