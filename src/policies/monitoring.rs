//! Monitoring instance policies

use kube::ResourceExt;
use tracing::debug;

use super::names::{validate_rfc1035, validate_url};
use super::Policies;
use crate::error::{Result, ValidationError};
use crate::pipeline::{CreateMonitoringInstanceRequest, UpdateMonitoringInstanceRequest};

impl Policies {
    pub async fn validate_monitoring_create(
        &self,
        req: &CreateMonitoringInstanceRequest,
    ) -> Result<()> {
        debug!(namespace = %req.namespace(), name = %req.config.name_any(), "validating monitoring instance create");

        validate_rfc1035(&req.config.name_any())?;
        validate_url(&req.config.spec.pmm.url)?;
        if !req.credentials.is_complete() {
            return Err(ValidationError::MonitoringCredentialsRequired.into());
        }
        Ok(())
    }

    pub async fn validate_monitoring_update(
        &self,
        req: &UpdateMonitoringInstanceRequest,
    ) -> Result<()> {
        debug!(namespace = %req.namespace, name = %req.name, "validating monitoring instance update");

        // Missing instances are reported as such, not as a bad request
        self.state
            .get_monitoring_config(&req.namespace, &req.name)
            .await?;

        if let Some(url) = &req.url {
            validate_url(url)?;
        }
        if let Some(credentials) = &req.credentials
            && !credentials.is_complete()
        {
            return Err(ValidationError::MonitoringCredentialsRequired.into());
        }
        Ok(())
    }

    pub async fn validate_monitoring_delete(&self, namespace: &str, name: &str) -> Result<()> {
        if self.state.is_monitoring_config_used(namespace, name).await? {
            return Err(ValidationError::MonitoringConfigInUse(name.to_string()).into());
        }
        Ok(())
    }
}
