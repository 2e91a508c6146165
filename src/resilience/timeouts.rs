//! Call deadline resolution.
//!
//! # Responsibilities
//! - Parse the `grpc-timeout` request header
//! - Pick the deadline for a bridged call: client header first, then config
//!
//! # Design Decisions
//! - A malformed header is ignored rather than rejected
//! - Expired calls surface as `DEADLINE_EXCEEDED`, rendered as 504

use std::time::Duration;

use http::HeaderMap;

pub const GRPC_TIMEOUT_HEADER: &str = "grpc-timeout";

/// Parse a `grpc-timeout` value: up to 8 digits followed by a unit
/// (`H`, `M`, `S`, `m`, `u`, `n`).
pub fn parse_grpc_timeout(value: &str) -> Option<Duration> {
    let value = value.trim();
    if value.len() < 2 {
        return None;
    }
    let (digits, unit) = value.split_at(value.len() - 1);
    if digits.len() > 8 || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let amount: u64 = digits.parse().ok()?;

    let duration = match unit {
        "H" => Duration::from_secs(amount * 3600),
        "M" => Duration::from_secs(amount * 60),
        "S" => Duration::from_secs(amount),
        "m" => Duration::from_millis(amount),
        "u" => Duration::from_micros(amount),
        "n" => Duration::from_nanos(amount),
        _ => return None,
    };
    Some(duration)
}

/// Deadline for one call. `default` of `None` means unbounded.
pub fn call_deadline(headers: &HeaderMap, default: Option<Duration>) -> Option<Duration> {
    headers
        .get(GRPC_TIMEOUT_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(parse_grpc_timeout)
        .or(default)
}
