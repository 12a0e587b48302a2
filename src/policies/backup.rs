//! On-demand backup and restore policies

use kube::ResourceExt;
use tracing::debug;

use super::database_cluster::validate_data_source;
use super::names::validate_rfc1035;
use super::{NotFoundExt, Policies};
use crate::crd::{DatabaseClusterBackup, DatabaseClusterRestore, EngineType};
use crate::error::{Result, ValidationError};

impl Policies {
    /// The cluster and storage must exist, and the storage must fit the
    /// cluster's storage binding rules
    pub async fn validate_backup_create(&self, backup: &DatabaseClusterBackup) -> Result<()> {
        let namespace = backup.namespace().unwrap_or_default();
        let cluster_name = &backup.spec.db_cluster_name;
        let storage_name = &backup.spec.backup_storage_name;
        debug!(namespace = %namespace, name = %backup.name_any(), cluster = %cluster_name, "validating backup create");

        validate_rfc1035(&backup.name_any())?;

        let cluster = self
            .state
            .get_database_cluster(&namespace, cluster_name)
            .await
            .or_reject(|| ValidationError::ClusterNotFound(cluster_name.clone()))?;

        let storage = self
            .state
            .get_backup_storage(&namespace, storage_name)
            .await
            .or_reject(|| ValidationError::BackupStorageNotFound(storage_name.clone()))?;
        if !storage.is_allowed_in(&namespace) {
            return Err(ValidationError::BackupStorageNotAllowed {
                storage: storage_name.clone(),
                namespace,
            }
            .into());
        }

        match cluster.spec.engine.type_ {
            EngineType::Psmdb => {
                if let Some(active) = cluster.active_storage()
                    && active != storage_name.as_str()
                {
                    return Err(ValidationError::ActiveStorageMismatch(active.to_string()).into());
                }
            }
            EngineType::Postgresql => {
                self.validate_pg_budget(
                    &namespace,
                    cluster_name,
                    &cluster.spec.backup.schedules,
                    Some(storage_name),
                )
                .await?;
            }
            EngineType::Pxc => {}
        }

        Ok(())
    }

    /// The cluster must exist and the data source must point at a usable backup
    pub async fn validate_restore_create(&self, restore: &DatabaseClusterRestore) -> Result<()> {
        let namespace = restore.namespace().unwrap_or_default();
        let cluster_name = &restore.spec.db_cluster_name;
        debug!(namespace = %namespace, name = %restore.name_any(), cluster = %cluster_name, "validating restore create");

        self.state
            .get_database_cluster(&namespace, cluster_name)
            .await
            .or_reject(|| ValidationError::ClusterNotFound(cluster_name.clone()))?;

        let source = &restore.spec.data_source;
        validate_data_source(source)?;

        if let Some(backup_name) = source.db_cluster_backup_name.as_deref() {
            let backup = self
                .state
                .get_database_cluster_backup(&namespace, backup_name)
                .await
                .or_reject(|| ValidationError::BackupNotFound(backup_name.to_string()))?;
            if &backup.spec.db_cluster_name != cluster_name {
                return Err(ValidationError::BackupClusterMismatch {
                    backup: backup_name.to_string(),
                    cluster: cluster_name.clone(),
                }
                .into());
            }
        }

        if let Some(backup_source) = &source.backup_source {
            let name = &backup_source.backup_storage_name;
            let storage = self
                .state
                .get_backup_storage(&namespace, name)
                .await
                .or_reject(|| ValidationError::BackupStorageNotFound(name.clone()))?;
            if !storage.is_allowed_in(&namespace) {
                return Err(ValidationError::BackupStorageNotAllowed {
                    storage: name.clone(),
                    namespace,
                }
                .into());
            }
        }

        Ok(())
    }
}
