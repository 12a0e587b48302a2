//! Split-horizon DNS config policies

use kube::ResourceExt;
use tracing::debug;

use super::names::{validate_domain, validate_rfc1035};
use super::Policies;
use crate::error::{Result, ValidationError};
use crate::pipeline::{
    CertificateAuthority, CreateSplitHorizonDnsConfigRequest, UpdateSplitHorizonDnsConfigRequest,
};

/// Whether `pem` is a single well formed PEM block
pub fn is_pem_block(pem: &str) -> bool {
    let mut lines = pem.trim().lines().map(str::trim_end);

    let Some(label) = lines
        .next()
        .and_then(|l| l.strip_prefix("-----BEGIN "))
        .and_then(|l| l.strip_suffix("-----"))
        .filter(|l| !l.is_empty())
    else {
        return false;
    };

    let body: Vec<&str> = lines.collect();
    let Some((end, payload)) = body.split_last() else {
        return false;
    };
    if *end != format!("-----END {label}-----") || payload.is_empty() {
        return false;
    }

    payload.iter().all(|line| {
        !line.is_empty()
            && line
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'/' | b'='))
    })
}

pub fn validate_certificate_authority(ca: &CertificateAuthority) -> Result<(), ValidationError> {
    if !is_pem_block(&ca.cert) {
        return Err(ValidationError::InvalidPem("CA certificate"));
    }
    if !is_pem_block(&ca.key) {
        return Err(ValidationError::InvalidPem("CA private key"));
    }
    Ok(())
}

pub fn validate_split_horizon_create(
    req: &CreateSplitHorizonDnsConfigRequest,
) -> Result<(), ValidationError> {
    debug!(namespace = %req.namespace(), name = %req.config.name_any(), "validating split-horizon DNS config create");
    validate_rfc1035(&req.config.name_any())?;
    validate_domain(&req.config.spec.base_domain_name_suffix)?;
    validate_certificate_authority(&req.ca)
}

impl Policies {
    pub async fn validate_split_horizon_update(
        &self,
        req: &UpdateSplitHorizonDnsConfigRequest,
    ) -> Result<()> {
        self.state
            .get_split_horizon_dns_config(&req.namespace, &req.name)
            .await?;

        if let Some(domain) = &req.base_domain_name_suffix {
            validate_domain(domain)?;
        }
        if let Some(ca) = &req.ca {
            validate_certificate_authority(ca)?;
        }
        Ok(())
    }
}
