//! Backup storage policies
//!
//! - **Uniqueness**: no two storages in a namespace share region, bucket and endpoint
//! - **Syntax**: RFC1035 name, bucket or container name, region for S3, endpoint URL
//! - **Credentials**: both keys are required, on update after overlaying the stored secret
//! - **Binding**: bucket and region are fixed while any cluster uses the storage
//! - **Connectivity**: the storage must pass the probe

use std::collections::BTreeMap;

use kube::ResourceExt;
use tracing::{debug, warn};

use super::names::{validate_bucket_name, validate_rfc1035, validate_url};
use super::Policies;
use crate::crd::{BackupStorage, BackupStorageType};
use crate::error::{Error, Result, ValidationError};
use crate::pipeline::{
    ACCESS_KEY_ID, AZURE_STORAGE_ACCOUNT_KEY, AZURE_STORAGE_ACCOUNT_NAME,
    CreateBackupStorageRequest, SECRET_ACCESS_KEY, StorageCredentials, UpdateBackupStorageRequest,
};

/// Message reported when the probe fails; provider errors are only logged
pub const STORAGE_UNREACHABLE: &str = "cannot access backup storage; check the bucket, region, endpoint and credentials";

/// Another storage bound to the same location, ignoring `candidate` itself
pub fn find_duplicate<'a>(
    candidate: &BackupStorage,
    existing: &'a [BackupStorage],
) -> Option<&'a BackupStorage> {
    let name = candidate.name_any();
    let location = candidate.location();
    existing
        .iter()
        .filter(|s| s.name_any() != name)
        .find(|s| s.location() == location)
}

/// Name, bucket, region and endpoint syntax
pub fn validate_storage_fields(storage: &BackupStorage) -> Result<(), ValidationError> {
    validate_rfc1035(&storage.name_any())?;
    validate_bucket_name(&storage.spec.bucket)?;
    if storage.spec.type_ == BackupStorageType::S3 && storage.spec.region.trim().is_empty() {
        return Err(ValidationError::RegionRequired);
    }
    if !storage.spec.endpoint_url.is_empty() {
        validate_url(&storage.spec.endpoint_url)?;
    }
    Ok(())
}

/// Credentials as stored in the storage's secret
pub fn credentials_from_secret(
    type_: BackupStorageType,
    data: &BTreeMap<String, String>,
) -> StorageCredentials {
    let (access, secret) = match type_ {
        BackupStorageType::S3 => (ACCESS_KEY_ID, SECRET_ACCESS_KEY),
        BackupStorageType::Azure => (AZURE_STORAGE_ACCOUNT_NAME, AZURE_STORAGE_ACCOUNT_KEY),
    };
    StorageCredentials {
        access_key: data.get(access).cloned().unwrap_or_default(),
        secret_key: data.get(secret).cloned().unwrap_or_default(),
    }
}

impl Policies {
    pub async fn validate_backup_storage_create(
        &self,
        req: &CreateBackupStorageRequest,
    ) -> Result<()> {
        let namespace = req.namespace();
        let storage = &req.storage;
        debug!(namespace = %namespace, name = %storage.name_any(), "validating backup storage create");

        let existing = self.state.list_backup_storages(&namespace).await?;
        if find_duplicate(storage, &existing).is_some() {
            return Err(ValidationError::DuplicateBackupStorage.into());
        }

        validate_storage_fields(storage)?;
        if !req.credentials.is_complete() {
            return Err(ValidationError::CredentialsRequired.into());
        }

        self.probe_storage(storage, &req.credentials).await
    }

    pub async fn validate_backup_storage_update(
        &self,
        req: &UpdateBackupStorageRequest,
    ) -> Result<()> {
        debug!(namespace = %req.namespace, name = %req.name, "validating backup storage update");

        let current = self
            .state
            .get_backup_storage(&req.namespace, &req.name)
            .await?;
        let updated = req.apply(&current);

        let existing = self.state.list_backup_storages(&req.namespace).await?;
        if find_duplicate(&updated, &existing).is_some() {
            return Err(ValidationError::DuplicateBackupStorage.into());
        }

        validate_storage_fields(&updated)?;

        let bucket_changed = updated.spec.bucket != current.spec.bucket;
        let region_changed = updated.spec.region != current.spec.region;
        if (bucket_changed || region_changed)
            && self
                .state
                .is_backup_storage_used(&req.namespace, &req.name)
                .await?
        {
            let field = if bucket_changed { "bucket" } else { "region" };
            return Err(ValidationError::StorageInUse(field).into());
        }

        let stored = self
            .state
            .get_secret_data(&req.namespace, &current.spec.credentials_secret_name)
            .await?;
        let credentials =
            req.apply_credentials(&credentials_from_secret(current.spec.type_, &stored));
        if !credentials.is_complete() {
            return Err(ValidationError::CredentialsRequired.into());
        }

        self.probe_storage(&updated, &credentials).await
    }

    pub async fn validate_backup_storage_delete(&self, namespace: &str, name: &str) -> Result<()> {
        if self.state.is_backup_storage_used(namespace, name).await? {
            return Err(ValidationError::StorageInUseDelete(name.to_string()).into());
        }
        Ok(())
    }

    /// Probe bounded by the configured timeout; failures carry no provider detail
    async fn probe_storage(
        &self,
        storage: &BackupStorage,
        credentials: &StorageCredentials,
    ) -> Result<()> {
        let name = storage.name_any();
        match tokio::time::timeout(
            self.config.probe_timeout(),
            self.probe.probe(storage, credentials),
        )
        .await
        {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                warn!(storage = %name, error = %e, "backup storage probe failed");
                Err(Error::Dependency(STORAGE_UNREACHABLE.to_string()))
            }
            Err(_) => {
                warn!(storage = %name, timeout_secs = self.config.probe_timeout_secs, "backup storage probe timed out");
                Err(Error::Dependency(STORAGE_UNREACHABLE.to_string()))
            }
        }
    }
}
