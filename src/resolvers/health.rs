//! Health check → liveness probe.

use crate::core::diagnostics::Diagnostics;
use crate::core::error::HealthCheckError;
use crate::core::ir::Probe;
use crate::core::types::HealthCheckConfig;
use std::time::Duration;

/// Parse a duration such as `30s`, `1m30s`, `1.5h` or `250ms`.
///
/// Accepted units: `ns`, `us`, `µs`, `ms`, `s`, `m`, `h`. A bare `0` is
/// allowed; any other number needs a unit.
pub fn parse_duration(input: &str) -> Result<Duration, String> {
    let mut rest = input.trim();
    if rest.is_empty() {
        return Err("empty duration".to_string());
    }
    if let Some(stripped) = rest.strip_prefix('+') {
        rest = stripped;
    } else if rest.starts_with('-') {
        return Err("negative duration".to_string());
    }
    if rest == "0" {
        return Ok(Duration::ZERO);
    }

    let mut total_nanos: u128 = 0;
    while !rest.is_empty() {
        let number_len = rest
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(rest.len());
        let (number, tail) = rest.split_at(number_len);
        let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
        if whole.is_empty() && fraction.is_empty() {
            return Err(format!("expected a number in '{}'", input));
        }
        if fraction.contains('.') {
            return Err(format!("malformed number in '{}'", input));
        }

        let unit_len = tail
            .find(|c: char| c.is_ascii_digit() || c == '.')
            .unwrap_or(tail.len());
        let (unit, remaining) = tail.split_at(unit_len);
        let scale: u128 = match unit {
            "ns" => 1,
            "us" | "µs" | "μs" => 1_000,
            "ms" => 1_000_000,
            "s" => 1_000_000_000,
            "m" => 60 * 1_000_000_000,
            "h" => 3600 * 1_000_000_000,
            "" => return Err(format!("missing unit in '{}'", input)),
            other => return Err(format!("unknown unit '{}' in '{}'", other, input)),
        };

        let whole: u128 = if whole.is_empty() {
            0
        } else {
            whole.parse().map_err(|_| format!("number too large in '{}'", input))?
        };
        let mut nanos = whole
            .checked_mul(scale)
            .ok_or_else(|| format!("duration '{}' overflows", input))?;
        // Fractional digits beyond nanosecond precision are dropped.
        let mut place = scale;
        for digit in fraction.chars().filter_map(|c| c.to_digit(10)) {
            place /= 10;
            if place == 0 {
                break;
            }
            nanos += u128::from(digit) * place;
        }
        total_nanos = total_nanos
            .checked_add(nanos)
            .ok_or_else(|| format!("duration '{}' overflows", input))?;
        rest = remaining;
    }

    let secs = u64::try_from(total_nanos / 1_000_000_000)
        .map_err(|_| format!("duration '{}' overflows", input))?;
    Ok(Duration::new(secs, (total_nanos % 1_000_000_000) as u32))
}

fn seconds(field: &'static str, value: Option<&str>) -> Result<Option<u32>, HealthCheckError> {
    let Some(value) = value.filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    let duration = parse_duration(value).map_err(|reason| HealthCheckError::Duration {
        field,
        value: value.to_string(),
        reason,
    })?;
    Ok(Some(u32::try_from(duration.as_secs()).unwrap_or(u32::MAX)))
}

/// Translate a health check into a liveness probe.
///
/// The first `test` element (`CMD`, `CMD-SHELL`) selects the execution form
/// and is dropped; the remainder is the probe command. A test with fewer than
/// two elements yields a probe without a command and a warning.
pub fn translate_health_check(
    health_check: &HealthCheckConfig,
    scope: &str,
    diagnostics: &mut Diagnostics,
) -> Result<Probe, HealthCheckError> {
    let command = if health_check.test.len() > 1 {
        Some(health_check.test[1..].to_vec())
    } else {
        diagnostics.warn(
            scope,
            format!(
                "health check test {:?} has no command, probe will not run anything",
                health_check.test
            ),
        );
        None
    };

    Ok(Probe {
        command,
        timeout_seconds: seconds("timeout", health_check.timeout.as_deref())?,
        period_seconds: seconds("interval", health_check.interval.as_deref())?,
        initial_delay_seconds: seconds("start_period", health_check.start_period.as_deref())?,
        failure_threshold: health_check.retries,
    })
}
