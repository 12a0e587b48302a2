// Test code is allowed to panic on failure
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]

//! Unit tests for the admission policies
//!
//! This module contains unit tests for:
//! - Database cluster create and update rules
//! - Backup storage binding, uniqueness and connectivity
//! - On-demand backups and restores
//! - Monitoring, scheduling, load balancer and split-horizon references
//! - Handler chain behavior around rejections
//! - Operator upgrade preflight and the PITR window

#[path = "../common/mod.rs"]
mod common;

mod backups;
mod database_cluster;
mod pipeline;
