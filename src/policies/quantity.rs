//! Kubernetes resource quantity parsing
//!
//! Quantities are compared as plain numbers in base units (cores, bytes),
//! which is precise enough for minimum-floor checks.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::ValidationError;

static QUANTITY_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^([+-]?(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+))(?:[eE]([+-]?[0-9]+)|(Ki|Mi|Gi|Ti|Pi|Ei|n|u|m|k|M|G|T|P|E))?$")
        .ok()
});

fn suffix_multiplier(suffix: &str) -> f64 {
    match suffix {
        "n" => 1e-9,
        "u" => 1e-6,
        "m" => 1e-3,
        "k" => 1e3,
        "M" => 1e6,
        "G" => 1e9,
        "T" => 1e12,
        "P" => 1e15,
        "E" => 1e18,
        "Ki" => 1024.0,
        "Mi" => 1024f64.powi(2),
        "Gi" => 1024f64.powi(3),
        "Ti" => 1024f64.powi(4),
        "Pi" => 1024f64.powi(5),
        "Ei" => 1024f64.powi(6),
        _ => 1.0,
    }
}

/// Parse a quantity such as "600m", "512M", "1Gi" or "1e3" into base units
pub fn parse_quantity(quantity: &str) -> Result<f64, ValidationError> {
    let invalid = || ValidationError::InvalidQuantity(quantity.to_string());
    let re = QUANTITY_RE.as_ref().ok_or_else(invalid)?;
    let caps = re.captures(quantity.trim()).ok_or_else(invalid)?;

    let number: f64 = caps
        .get(1)
        .and_then(|m| m.as_str().parse().ok())
        .ok_or_else(invalid)?;

    let multiplier = match (caps.get(2), caps.get(3)) {
        (Some(exp), _) => {
            let exp: i32 = exp.as_str().parse().map_err(|_| invalid())?;
            10f64.powi(exp)
        }
        (None, Some(suffix)) => suffix_multiplier(suffix.as_str()),
        (None, None) => 1.0,
    };

    Ok(number * multiplier)
}
