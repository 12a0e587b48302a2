//! Backup storage connectivity probing

use async_trait::async_trait;
use thiserror::Error;
use tokio::net::TcpStream;
use tracing::debug;

use crate::crd::{BackupStorage, BackupStorageType};
use crate::pipeline::StorageCredentials;

#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("cannot resolve endpoint for storage: {0}")]
    Endpoint(String),

    #[error("storage endpoint unreachable: {0}")]
    Unreachable(#[from] std::io::Error),

    #[error("storage rejected the probe: {0}")]
    Rejected(String),
}

/// Checks that a storage can be used with the given credentials
///
/// Implementations talk to the provider; the validator only cares whether
/// the probe succeeds.
#[async_trait]
pub trait StorageProbe: Send + Sync {
    async fn probe(
        &self,
        storage: &BackupStorage,
        credentials: &StorageCredentials,
    ) -> Result<(), ProbeError>;
}

/// Probe that checks the storage endpoint accepts TCP connections
#[derive(Clone, Debug, Default)]
pub struct EndpointProbe;

impl EndpointProbe {
    pub fn new() -> Self {
        Self
    }
}

/// Host and port the storage is reached at
pub fn storage_endpoint(
    storage: &BackupStorage,
    credentials: &StorageCredentials,
) -> Result<(String, u16), ProbeError> {
    let url = storage.spec.endpoint_url.trim();
    if !url.is_empty() {
        return parse_endpoint(url);
    }
    match storage.spec.type_ {
        BackupStorageType::S3 if !storage.spec.region.is_empty() => {
            Ok((format!("s3.{}.amazonaws.com", storage.spec.region), 443))
        }
        BackupStorageType::S3 => Err(ProbeError::Endpoint("missing region".to_string())),
        BackupStorageType::Azure if !credentials.access_key.is_empty() => Ok((
            format!("{}.blob.core.windows.net", credentials.access_key),
            443,
        )),
        BackupStorageType::Azure => Err(ProbeError::Endpoint("missing account name".to_string())),
    }
}

fn parse_endpoint(url: &str) -> Result<(String, u16), ProbeError> {
    let invalid = || ProbeError::Endpoint(url.to_string());
    let (default_port, rest) = if let Some(rest) = url.strip_prefix("https://") {
        (443, rest)
    } else if let Some(rest) = url.strip_prefix("http://") {
        (80, rest)
    } else {
        return Err(invalid());
    };

    let authority = rest.split(['/', '?', '#']).next().unwrap_or_default();
    let authority = authority.rsplit('@').next().unwrap_or(authority);

    let (host, port) = if let Some(bracketed) = authority.strip_prefix('[') {
        let (host, after) = bracketed.split_once(']').ok_or_else(invalid)?;
        (host, after.strip_prefix(':'))
    } else {
        match authority.rsplit_once(':') {
            Some((host, port)) => (host, Some(port)),
            None => (authority, None),
        }
    };

    if host.is_empty() {
        return Err(invalid());
    }
    let port = match port {
        Some(p) => p.parse().map_err(|_| invalid())?,
        None => default_port,
    };
    Ok((host.to_string(), port))
}

#[async_trait]
impl StorageProbe for EndpointProbe {
    async fn probe(
        &self,
        storage: &BackupStorage,
        credentials: &StorageCredentials,
    ) -> Result<(), ProbeError> {
        let (host, port) = storage_endpoint(storage, credentials)?;
        debug!(host = %host, port = port, "probing storage endpoint");
        TcpStream::connect((host.as_str(), port)).await?;
        Ok(())
    }
}
