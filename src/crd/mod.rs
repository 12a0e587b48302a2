mod backup;
mod backup_storage;
mod database_cluster;
mod database_engine;
mod load_balancer_config;
mod monitoring_config;
mod pod_scheduling_policy;
mod split_horizon_dns_config;

pub use backup::*;
pub use backup_storage::*;
pub use database_cluster::*;
pub use database_engine::*;
pub use load_balancer_config::*;
pub use monitoring_config::*;
pub use pod_scheduling_policy::*;
pub use split_horizon_dns_config::*;
