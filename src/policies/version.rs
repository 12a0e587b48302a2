//! Engine version upgrade policy
//!
//! Versions are compared as semver after stripping a leading `v` and padding
//! short cores ("16.1" becomes "16.1.0"). Percona build suffixes such as
//! "8.0.32-24" are kept as pre-release identifiers so builds still order.

use std::cmp::Ordering;

use semver::Version;

use crate::crd::EngineType;
use crate::error::ValidationError;

/// Parse an engine or operator version
pub fn parse_version(version: &str) -> Result<Version, ValidationError> {
    let invalid = || ValidationError::InvalidVersion(version.to_string());
    let trimmed = version.trim();
    let trimmed = trimmed.strip_prefix('v').unwrap_or(trimmed);

    let split = trimmed.find(['-', '+']).unwrap_or(trimmed.len());
    let (core, suffix) = trimmed.split_at(split);

    let normalized = match core.matches('.').count() {
        0 => format!("{core}.0.0{suffix}"),
        1 => format!("{core}.0{suffix}"),
        _ => trimmed.to_string(),
    };

    Version::parse(&normalized).map_err(|_| invalid())
}

/// Whether `engine` may move from one major version to another in a single step
fn major_step_allowed(engine: EngineType, from: u64, to: u64) -> Result<(), MajorStep> {
    match engine {
        EngineType::Pxc | EngineType::Postgresql => Err(MajorStep::Forbidden),
        EngineType::Psmdb if to == from + 1 => Ok(()),
        EngineType::Psmdb => Err(MajorStep::Skipped),
    }
}

enum MajorStep {
    Forbidden,
    Skipped,
}

/// Validate an engine version change
///
/// Empty versions defer to the operator default and are not compared.
pub fn validate_upgrade(engine: EngineType, old: &str, new: &str) -> Result<(), ValidationError> {
    if old == new || old.is_empty() || new.is_empty() {
        return Ok(());
    }

    let from = parse_version(old)?;
    let to = parse_version(new)?;

    if to.cmp_precedence(&from) == Ordering::Less {
        return Err(ValidationError::Downgrade {
            from: old.to_string(),
            to: new.to_string(),
        });
    }

    if to.major > from.major {
        return major_step_allowed(engine, from.major, to.major).map_err(|step| match step {
            MajorStep::Forbidden => ValidationError::MajorUpgrade {
                from: old.to_string(),
                to: new.to_string(),
            },
            MajorStep::Skipped => ValidationError::NonSequentialMajorUpgrade {
                from: old.to_string(),
                to: new.to_string(),
            },
        });
    }

    Ok(())
}

/// Whether `version` is at least `minimum`; unparsable versions never are
pub fn at_least(version: &str, minimum: &str) -> bool {
    match (parse_version(version), parse_version(minimum)) {
        (Ok(v), Ok(min)) => v.cmp_precedence(&min) != Ordering::Less,
        _ => false,
    }
}
