use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// BackupStorage binds a bucket or container as a backup destination
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[kube(
    group = "dbaas.io",
    version = "v1alpha1",
    kind = "BackupStorage",
    plural = "backupstorages",
    shortname = "bs",
    namespaced,
    printcolumn = r#"{"name":"Type", "type":"string", "jsonPath":".spec.type"}"#,
    printcolumn = r#"{"name":"Bucket", "type":"string", "jsonPath":".spec.bucket"}"#,
    printcolumn = r#"{"name":"Region", "type":"string", "jsonPath":".spec.region"}"#,
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct BackupStorageSpec {
    #[serde(rename = "type")]
    pub type_: BackupStorageType,

    /// Bucket (S3) or container (Azure) name
    pub bucket: String,

    #[serde(default)]
    pub region: String,

    /// Custom endpoint for S3-compatible services
    #[serde(default, rename = "endpointURL")]
    pub endpoint_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Secret holding the access credentials
    pub credentials_secret_name: String,

    /// Namespaces allowed to use the storage; empty allows all
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_namespaces: Vec<String>,

    #[serde(default, rename = "verifyTLS", skip_serializing_if = "Option::is_none")]
    pub verify_tls: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force_path_style: Option<bool>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, Default, JsonSchema, PartialEq, Eq)]
pub enum BackupStorageType {
    #[default]
    #[serde(rename = "s3")]
    S3,
    #[serde(rename = "azure")]
    Azure,
}

impl std::fmt::Display for BackupStorageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackupStorageType::S3 => write!(f, "s3"),
            BackupStorageType::Azure => write!(f, "azure"),
        }
    }
}

/// Identity of the remote location a storage points at
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct StorageLocation<'a> {
    pub region: &'a str,
    pub bucket: &'a str,
    pub endpoint_url: &'a str,
}

impl BackupStorage {
    pub fn location(&self) -> StorageLocation<'_> {
        StorageLocation {
            region: &self.spec.region,
            bucket: &self.spec.bucket,
            endpoint_url: &self.spec.endpoint_url,
        }
    }

    /// Whether clusters in `namespace` may use this storage
    pub fn is_allowed_in(&self, namespace: &str) -> bool {
        self.spec.allowed_namespaces.is_empty()
            || self.spec.allowed_namespaces.iter().any(|ns| ns == namespace)
    }
}
