//! Shared helpers for HTTP-backed adapters.

use reqwest::StatusCode;
use serde_json::{Map, Value};

use pantry_core::error::{PantryError, Result};

/// Statuses where a retry could plausibly succeed.
pub fn is_retryable_status(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::TOO_MANY_REQUESTS
            | StatusCode::INTERNAL_SERVER_ERROR
            | StatusCode::BAD_GATEWAY
            | StatusCode::SERVICE_UNAVAILABLE
            | StatusCode::GATEWAY_TIMEOUT
    )
}

/// Extracts a required string argument.
pub fn require_str<'a>(arguments: &'a Map<String, Value>, key: &str) -> Result<&'a str> {
    arguments
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| PantryError::validation(format!("missing required argument '{key}'")))
}

/// Extracts a required argument and strips it down to digits.
pub fn require_digits(arguments: &Map<String, Value>, key: &str) -> Result<String> {
    let raw = require_str(arguments, key)?;
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return Err(PantryError::validation(format!(
            "argument '{key}' contains no digits"
        )));
    }
    Ok(digits)
}
