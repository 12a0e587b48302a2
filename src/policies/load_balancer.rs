//! Load balancer config policies

use kube::ResourceExt;

use super::names::{validate_annotation_key, validate_rfc1035};
use super::Policies;
use crate::crd::LoadBalancerConfig;
use crate::error::{Result, ValidationError};

/// Name and annotation key syntax
pub fn validate_load_balancer_config(config: &LoadBalancerConfig) -> Result<(), ValidationError> {
    validate_rfc1035(&config.name_any())?;
    for key in config.spec.annotations.keys() {
        validate_annotation_key(key)?;
    }
    Ok(())
}

impl Policies {
    pub async fn validate_load_balancer_config_update(
        &self,
        config: &LoadBalancerConfig,
    ) -> Result<()> {
        let name = config.name_any();
        let current = self.state.get_load_balancer_config(&name).await?;
        if current.is_default() {
            return Err(ValidationError::DefaultLoadBalancerConfigReadOnly(name).into());
        }
        validate_load_balancer_config(config)?;
        Ok(())
    }

    pub async fn validate_load_balancer_config_delete(&self, name: &str) -> Result<()> {
        let current = self.state.get_load_balancer_config(name).await?;
        if current.is_default() {
            return Err(
                ValidationError::DefaultLoadBalancerConfigReadOnly(name.to_string()).into(),
            );
        }
        Ok(())
    }
}
