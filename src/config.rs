//! Tunables for the admission policies
//!
//! Defaults match what the database operators accept. Every value can be
//! overridden through a `DBAAS_POLICY_*` environment variable.

use std::time::Duration;

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::policies::quantity::parse_quantity;

const ENV_PREFIX: &str = "DBAAS_POLICY_";

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct PolicyConfig {
    /// Cluster names become prefixes of generated object names
    pub max_cluster_name_length: usize,
    pub min_cpu: String,
    pub min_memory: String,
    pub min_storage: String,
    pub pxc_max_replicas: i32,
    /// pgBackRest supports a fixed number of repositories per cluster
    pub pg_max_repositories: usize,
    /// Oldest PSMDB operator able to run sharded clusters
    pub min_sharding_operator_version: String,
    pub probe_timeout_secs: u64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            max_cluster_name_length: 22,
            min_cpu: "600m".to_string(),
            min_memory: "512M".to_string(),
            min_storage: "1G".to_string(),
            pxc_max_replicas: 5,
            pg_max_repositories: 3,
            min_sharding_operator_version: "1.17.0".to_string(),
            probe_timeout_secs: 30,
        }
    }
}

/// Parsed resource minimums, in cores and bytes
#[derive(Clone, Debug, PartialEq)]
pub struct ResourceFloors {
    pub cpu: f64,
    pub memory: f64,
    pub storage: f64,
}

impl PolicyConfig {
    /// Defaults overlaid with `DBAAS_POLICY_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(format!("{ENV_PREFIX}{key}")).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(v) = lookup("MAX_CLUSTER_NAME_LENGTH") {
            config.max_cluster_name_length = parse_number("MAX_CLUSTER_NAME_LENGTH", &v)?;
        }
        if let Some(v) = lookup("MIN_CPU") {
            config.min_cpu = v;
        }
        if let Some(v) = lookup("MIN_MEMORY") {
            config.min_memory = v;
        }
        if let Some(v) = lookup("MIN_STORAGE") {
            config.min_storage = v;
        }
        if let Some(v) = lookup("PXC_MAX_REPLICAS") {
            config.pxc_max_replicas = parse_number("PXC_MAX_REPLICAS", &v)?;
        }
        if let Some(v) = lookup("PG_MAX_REPOSITORIES") {
            config.pg_max_repositories = parse_number("PG_MAX_REPOSITORIES", &v)?;
        }
        if let Some(v) = lookup("MIN_SHARDING_OPERATOR_VERSION") {
            config.min_sharding_operator_version = v;
        }
        if let Some(v) = lookup("PROBE_TIMEOUT_SECS") {
            config.probe_timeout_secs = parse_number("PROBE_TIMEOUT_SECS", &v)?;
        }

        config.resource_floors()?;
        Ok(config)
    }

    /// Parse the configured minimums
    pub fn resource_floors(&self) -> Result<ResourceFloors> {
        let parse = |name: &str, value: &str| {
            parse_quantity(value)
                .map_err(|_| Error::InvalidConfig(format!("{name} '{value}' is not a quantity")))
        };
        Ok(ResourceFloors {
            cpu: parse("min_cpu", &self.min_cpu)?,
            memory: parse("min_memory", &self.min_memory)?,
            storage: parse("min_storage", &self.min_storage)?,
        })
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::InvalidConfig(format!("{ENV_PREFIX}{key} '{value}' is not a number")))
}
