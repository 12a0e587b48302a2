//! Request payloads for operations that carry more than a custom resource
//!
//! Credentials travel next to the resource and end up in a `Secret`; they
//! never appear in `Debug` output.

use std::fmt;

use kube::ResourceExt;

use crate::crd::{BackupStorage, MonitoringConfig, SplitHorizonDNSConfig};

/// Secret keys used for storage credentials
pub const ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
pub const SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
pub const AZURE_STORAGE_ACCOUNT_NAME: &str = "AZURE_STORAGE_ACCOUNT_NAME";
pub const AZURE_STORAGE_ACCOUNT_KEY: &str = "AZURE_STORAGE_ACCOUNT_KEY";

/// Secret keys used for monitoring credentials
pub const MONITORING_API_KEY: &str = "apiKey";
pub const MONITORING_USERNAME: &str = "username";
pub const MONITORING_PASSWORD: &str = "password";

/// Secret keys used for the split-horizon CA
pub const CA_CERT: &str = "ca.crt";
pub const CA_KEY: &str = "ca.key";

/// Access key and secret key (or Azure account name and key)
#[derive(Clone, Default, PartialEq, Eq)]
pub struct StorageCredentials {
    pub access_key: String,
    pub secret_key: String,
}

impl StorageCredentials {
    pub fn is_complete(&self) -> bool {
        !self.access_key.is_empty() && !self.secret_key.is_empty()
    }
}

impl fmt::Debug for StorageCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StorageCredentials")
            .field("access_key", &"<redacted>")
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

#[derive(Clone, Debug)]
pub struct CreateBackupStorageRequest {
    pub storage: BackupStorage,
    pub credentials: StorageCredentials,
}

impl CreateBackupStorageRequest {
    pub fn namespace(&self) -> String {
        self.storage.namespace().unwrap_or_default()
    }
}

/// Partial update; `None` keeps the stored value
#[derive(Clone, Debug, Default)]
pub struct UpdateBackupStorageRequest {
    pub namespace: String,
    pub name: String,
    pub bucket: Option<String>,
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
    pub description: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub allowed_namespaces: Option<Vec<String>>,
    pub verify_tls: Option<bool>,
    pub force_path_style: Option<bool>,
}

impl UpdateBackupStorageRequest {
    /// The storage as it would look after the update
    pub fn apply(&self, existing: &BackupStorage) -> BackupStorage {
        let mut storage = existing.clone();
        let spec = &mut storage.spec;
        if let Some(bucket) = &self.bucket {
            spec.bucket = bucket.clone();
        }
        if let Some(region) = &self.region {
            spec.region = region.clone();
        }
        if let Some(url) = &self.endpoint_url {
            spec.endpoint_url = url.clone();
        }
        if let Some(description) = &self.description {
            spec.description = Some(description.clone());
        }
        if let Some(namespaces) = &self.allowed_namespaces {
            spec.allowed_namespaces = namespaces.clone();
        }
        if self.verify_tls.is_some() {
            spec.verify_tls = self.verify_tls;
        }
        if self.force_path_style.is_some() {
            spec.force_path_style = self.force_path_style;
        }
        storage
    }

    /// Overlay the requested keys on the stored ones
    pub fn apply_credentials(&self, stored: &StorageCredentials) -> StorageCredentials {
        StorageCredentials {
            access_key: self
                .access_key
                .clone()
                .unwrap_or_else(|| stored.access_key.clone()),
            secret_key: self
                .secret_key
                .clone()
                .unwrap_or_else(|| stored.secret_key.clone()),
        }
    }

    pub fn changes_credentials(&self) -> bool {
        self.access_key.is_some() || self.secret_key.is_some()
    }
}

/// PMM API key, or user and password
#[derive(Clone, Default, PartialEq, Eq)]
pub struct MonitoringCredentials {
    pub api_key: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
}

impl MonitoringCredentials {
    pub fn is_complete(&self) -> bool {
        let set = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());
        set(&self.api_key) || (set(&self.user) && set(&self.password))
    }
}

impl fmt::Debug for MonitoringCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MonitoringCredentials")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[derive(Clone, Debug)]
pub struct CreateMonitoringInstanceRequest {
    pub config: MonitoringConfig,
    pub credentials: MonitoringCredentials,
}

impl CreateMonitoringInstanceRequest {
    pub fn namespace(&self) -> String {
        self.config.namespace().unwrap_or_default()
    }
}

#[derive(Clone, Debug, Default)]
pub struct UpdateMonitoringInstanceRequest {
    pub namespace: String,
    pub name: String,
    pub url: Option<String>,
    pub allowed_namespaces: Option<Vec<String>>,
    pub verify_tls: Option<bool>,
    pub credentials: Option<MonitoringCredentials>,
}

impl UpdateMonitoringInstanceRequest {
    pub fn apply(&self, existing: &MonitoringConfig) -> MonitoringConfig {
        let mut config = existing.clone();
        if let Some(url) = &self.url {
            config.spec.pmm.url = url.clone();
        }
        if let Some(namespaces) = &self.allowed_namespaces {
            config.spec.allowed_namespaces = namespaces.clone();
        }
        if self.verify_tls.is_some() {
            config.spec.verify_tls = self.verify_tls;
        }
        config
    }
}

/// PEM encoded CA certificate and private key
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CertificateAuthority {
    pub cert: String,
    pub key: String,
}

impl fmt::Debug for CertificateAuthority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CertificateAuthority")
            .field("cert", &self.cert)
            .field("key", &"<redacted>")
            .finish()
    }
}

#[derive(Clone, Debug)]
pub struct CreateSplitHorizonDnsConfigRequest {
    pub config: SplitHorizonDNSConfig,
    pub ca: CertificateAuthority,
}

impl CreateSplitHorizonDnsConfigRequest {
    pub fn namespace(&self) -> String {
        self.config.namespace().unwrap_or_default()
    }
}

#[derive(Clone, Debug, Default)]
pub struct UpdateSplitHorizonDnsConfigRequest {
    pub namespace: String,
    pub name: String,
    pub base_domain_name_suffix: Option<String>,
    pub ca: Option<CertificateAuthority>,
}

impl UpdateSplitHorizonDnsConfigRequest {
    pub fn apply(&self, existing: &SplitHorizonDNSConfig) -> SplitHorizonDNSConfig {
        let mut config = existing.clone();
        if let Some(domain) = &self.base_domain_name_suffix {
            config.spec.base_domain_name_suffix = domain.clone();
        }
        config
    }
}
