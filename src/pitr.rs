//! Point-in-time recovery window
//!
//! A cluster can be restored to any instant between its latest successful
//! backup and the last log upload that is certain to have finished.

use jiff::Timestamp;
use serde::Serialize;

use crate::crd::{DatabaseClusterBackup, EngineType};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct RecoveryWindow {
    pub earliest: Timestamp,
    pub latest: Timestamp,
}

/// Most recent backup in the engine's success state; undated backups sort last
pub fn latest_successful_backup(
    backups: &[DatabaseClusterBackup],
    engine: EngineType,
) -> Option<&DatabaseClusterBackup> {
    let succeeded = engine.backup_succeeded_state();
    backups
        .iter()
        .filter(|b| b.state() == succeeded)
        .max_by_key(|b| b.created())
}

/// `now` truncated to whole seconds, then down to a multiple of the upload interval
pub fn latest_restorable(now: Timestamp, engine: EngineType) -> Option<Timestamp> {
    let interval = engine.default_upload_interval_sec();
    let secs = now.as_second();
    Timestamp::from_second(secs - secs.rem_euclid(interval)).ok()
}

/// Restorable range for a cluster, or `None` without a dated successful backup
pub fn recovery_window(
    backups: &[DatabaseClusterBackup],
    engine: EngineType,
    now: Timestamp,
) -> Option<RecoveryWindow> {
    let earliest = latest_successful_backup(backups, engine)?.created()?;
    let latest = latest_restorable(now, engine)?;
    Some(RecoveryWindow { earliest, latest })
}
