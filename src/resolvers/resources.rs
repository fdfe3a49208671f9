//! Deploy-time resource limits and reservations.
//!
//! Memory sizes use binary units (`512M` = 512 MiB) and become byte counts.
//! CPU amounts are fractions of a core and become milli-CPU, truncated.
//! Zero amounts are omitted.

use crate::core::diagnostics::Diagnostics;
use crate::core::error::QuantityError;
use crate::core::ir::{Quantity, ResourceName, ResourceRequirements};
use crate::core::types::{MemoryValue, ResourceSpec, ResourcesConfig};
use std::collections::BTreeMap;

/// Parse a memory amount into bytes.
pub fn parse_memory_bytes(value: &MemoryValue) -> Result<u64, QuantityError> {
    let text = match value {
        MemoryValue::Bytes(b) => return Ok(*b),
        MemoryValue::Text(t) => t.trim(),
    };
    let err = || QuantityError::Memory(text.to_string());

    let split = text
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(text.len());
    let (number, suffix) = text.split_at(split);
    if number.is_empty() || number.starts_with('.') || number.ends_with('.') {
        return Err(err());
    }
    let amount: f64 = number.parse().map_err(|_| err())?;

    let suffix = suffix.strip_prefix(' ').unwrap_or(suffix).to_ascii_lowercase();
    let unit = suffix.trim_end_matches('b').trim_end_matches('i');
    let shift = match unit {
        "" => 0,
        "k" => 10,
        "m" => 20,
        "g" => 30,
        "t" => 40,
        "p" => 50,
        _ => return Err(err()),
    };
    // Only one optional `i` and one optional `b` are allowed after the unit.
    let tail = &suffix[unit.len()..];
    if !matches!(tail, "" | "b" | "i" | "ib") || (unit.is_empty() && tail.contains('i')) {
        return Err(err());
    }
    Ok((amount * (1u64 << shift) as f64) as u64)
}

/// Parse a CPU fraction (`"0.5"`, `"2"`) into milli-CPU, truncating.
pub fn parse_cpu_millis(value: &str) -> Result<u64, QuantityError> {
    let text = value.trim();
    let err = || QuantityError::Cpu(value.to_string());

    let (whole, fraction) = text.split_once('.').unwrap_or((text, ""));
    let digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if (!whole.is_empty() || !fraction.is_empty()) && digits(whole) && digits(fraction) {
        let whole: u64 = if whole.is_empty() { 0 } else { whole.parse().map_err(|_| err())? };
        let milli_digits: String = fraction.chars().chain("000".chars()).take(3).collect();
        let milli: u64 = milli_digits.parse().map_err(|_| err())?;
        return whole
            .checked_mul(1000)
            .and_then(|w| w.checked_add(milli))
            .ok_or_else(err);
    }

    // Exponent forms such as "5e-1".
    let parsed: f64 = text.parse().map_err(|_| err())?;
    if !parsed.is_finite() || parsed < 0.0 {
        return Err(err());
    }
    Ok((parsed * 1000.0) as u64)
}

/// Convert one limits/reservations block into a resource map.
pub fn resource_list(
    spec: &ResourceSpec,
    scope: &str,
    diagnostics: &mut Diagnostics,
) -> BTreeMap<ResourceName, Quantity> {
    let mut list = BTreeMap::new();

    if let Some(memory) = &spec.memory {
        match parse_memory_bytes(memory) {
            Ok(0) => {}
            Ok(bytes) => {
                list.insert(ResourceName::Memory, Quantity::Bytes(bytes));
            }
            Err(e) => diagnostics.warn(
                scope,
                format!("unable to convert memory resources value: {}", e),
            ),
        }
    }

    if let Some(cpus) = spec.cpus.as_deref().filter(|c| !c.is_empty()) {
        match parse_cpu_millis(cpus) {
            Ok(0) => {}
            Ok(millis) => {
                list.insert(ResourceName::Cpu, Quantity::MilliCpu(millis));
            }
            Err(e) => {
                diagnostics.warn(scope, format!("unable to convert cpu resources value: {}", e))
            }
        }
    }

    list
}

/// Resolve `deploy.resources` into container resource requirements.
pub fn resolve_resources(
    resources: &ResourcesConfig,
    scope: &str,
    diagnostics: &mut Diagnostics,
) -> ResourceRequirements {
    ResourceRequirements {
        limits: resources
            .limits
            .as_ref()
            .map(|l| resource_list(l, scope, diagnostics))
            .unwrap_or_default(),
        requests: resources
            .reservations
            .as_ref()
            .map(|r| resource_list(r, scope, diagnostics))
            .unwrap_or_default(),
    }
}
