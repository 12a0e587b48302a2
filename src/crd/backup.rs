use k8s_openapi::apimachinery::pkg::apis::meta::v1::Time;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::DataSource;

/// DatabaseClusterBackup is a single on-demand or scheduled backup
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[kube(
    group = "dbaas.io",
    version = "v1alpha1",
    kind = "DatabaseClusterBackup",
    plural = "databaseclusterbackups",
    shortname = "dbbackup",
    namespaced,
    status = "DatabaseClusterBackupStatus",
    printcolumn = r#"{"name":"Cluster", "type":"string", "jsonPath":".spec.dbClusterName"}"#,
    printcolumn = r#"{"name":"Storage", "type":"string", "jsonPath":".spec.backupStorageName"}"#,
    printcolumn = r#"{"name":"State", "type":"string", "jsonPath":".status.state"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseClusterBackupSpec {
    pub db_cluster_name: String,
    pub backup_storage_name: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseClusterBackupStatus {
    /// Engine specific state name, e.g. "Succeeded" or "ready"
    #[serde(default)]
    pub state: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<Time>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<Time>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,
}

impl DatabaseClusterBackup {
    pub fn state(&self) -> &str {
        self.status
            .as_ref()
            .map(|s| s.state.as_str())
            .unwrap_or_default()
    }

    pub fn created(&self) -> Option<jiff::Timestamp> {
        self.status
            .as_ref()
            .and_then(|s| s.created.as_ref())
            .map(|t| t.0)
    }
}

/// DatabaseClusterRestore restores an existing cluster from a backup
#[derive(CustomResource, Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[kube(
    group = "dbaas.io",
    version = "v1alpha1",
    kind = "DatabaseClusterRestore",
    plural = "databaseclusterrestores",
    shortname = "dbrestore",
    namespaced,
    status = "DatabaseClusterRestoreStatus",
    printcolumn = r#"{"name":"Cluster", "type":"string", "jsonPath":".spec.dbClusterName"}"#,
    printcolumn = r#"{"name":"State", "type":"string", "jsonPath":".status.state"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseClusterRestoreSpec {
    pub db_cluster_name: String,
    pub data_source: DataSource,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseClusterRestoreStatus {
    #[serde(default)]
    pub state: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
