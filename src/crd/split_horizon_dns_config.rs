use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// SplitHorizonDNSConfig gives PSMDB replica set members externally resolvable names
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[kube(
    group = "dbaas.io",
    version = "v1alpha1",
    kind = "SplitHorizonDNSConfig",
    plural = "splithorizondnsconfigs",
    shortname = "shdc",
    namespaced,
    printcolumn = r#"{"name":"Domain", "type":"string", "jsonPath":".spec.baseDomainNameSuffix"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct SplitHorizonDNSConfigSpec {
    /// Domain appended to generated member host names
    pub base_domain_name_suffix: String,

    pub tls: SplitHorizonTls,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SplitHorizonTls {
    /// Secret holding the CA certificate and key used to sign member certificates
    pub secret_name: String,
}
