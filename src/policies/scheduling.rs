//! Pod scheduling policy rules
//!
//! A policy targets one engine. Its affinity config may only carry the
//! section for that engine, and that section must hold at least one rule.
//! Policies shipped with the platform are read-only.

use kube::ResourceExt;
use tracing::debug;

use super::names::validate_rfc1035;
use super::Policies;
use crate::crd::{EngineType, PodSchedulingPolicy};
use crate::error::{Result, ValidationError};

pub fn validate_affinity(policy: &PodSchedulingPolicy) -> Result<(), ValidationError> {
    let engine = policy.spec.engine_type;
    let Some(affinity) = &policy.spec.affinity_config else {
        return Ok(());
    };

    let foreign = match engine {
        EngineType::Pxc => affinity.psmdb.is_some() || affinity.postgresql.is_some(),
        EngineType::Psmdb => affinity.pxc.is_some() || affinity.postgresql.is_some(),
        EngineType::Postgresql => affinity.pxc.is_some() || affinity.psmdb.is_some(),
    };
    if foreign {
        return Err(ValidationError::ForeignAffinityConfig(engine));
    }

    let empty = match engine {
        EngineType::Pxc => affinity.pxc.as_ref().is_none_or(|c| c.is_empty()),
        EngineType::Psmdb => affinity.psmdb.as_ref().is_none_or(|c| c.is_empty()),
        EngineType::Postgresql => affinity.postgresql.as_ref().is_none_or(|c| c.is_empty()),
    };
    if empty {
        return Err(ValidationError::EmptyAffinityConfig(engine));
    }

    Ok(())
}

impl Policies {
    pub async fn validate_pod_scheduling_policy_create(
        &self,
        policy: &PodSchedulingPolicy,
    ) -> Result<()> {
        debug!(name = %policy.name_any(), engine = %policy.spec.engine_type, "validating pod scheduling policy create");
        validate_rfc1035(&policy.name_any())?;
        validate_affinity(policy)?;
        Ok(())
    }

    pub async fn validate_pod_scheduling_policy_update(
        &self,
        policy: &PodSchedulingPolicy,
    ) -> Result<()> {
        let name = policy.name_any();
        debug!(name = %name, "validating pod scheduling policy update");

        let current = self.state.get_pod_scheduling_policy(&name).await?;
        if current.is_default() {
            return Err(ValidationError::DefaultPolicyReadOnly(name).into());
        }
        if current.spec.engine_type != policy.spec.engine_type {
            return Err(ValidationError::PolicyEngineTypeImmutable.into());
        }
        validate_affinity(policy)?;
        Ok(())
    }

    pub async fn validate_pod_scheduling_policy_delete(&self, name: &str) -> Result<()> {
        let current = self.state.get_pod_scheduling_policy(name).await?;
        if current.is_default() {
            return Err(ValidationError::DefaultPolicyReadOnly(name.to_string()).into());
        }
        if self.state.is_pod_scheduling_policy_used(name).await? {
            return Err(ValidationError::PodSchedulingPolicyInUse(name.to_string()).into());
        }
        Ok(())
    }
}
