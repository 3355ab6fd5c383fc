//! Local UPC tools exposed to the planner.
//!
//! Validation and check-digit completion run in-process; they are in the
//! tool belt so the planner can verify a code before spending a database
//! lookup on it, and repair near-miss codes a user mistyped.

use async_trait::async_trait;
use serde_json::{Map, Value};

use pantry_core::error::Result;
use pantry_core::tool::{ToolAdapter, ToolDescriptor, ToolPayload, ToolResponse};
use pantry_core::upc::{complete_check_digit, validate_upc_a};

use crate::http::require_str;

/// `upc-validate`: structural UPC-A validation.
#[derive(Clone, Default)]
pub struct UpcValidatorAdapter;

#[async_trait]
impl ToolAdapter for UpcValidatorAdapter {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::single_string_arg(
            "upc-validate",
            "Validates a UPC-A code: checks the 12-digit format and recomputes the check \
             digit. Run this before looking a code up in the product databases.",
            "upc",
            "The UPC code to validate; separators are tolerated",
        )
    }

    async fn invoke(&self, arguments: &Map<String, Value>) -> Result<ToolResponse> {
        let upc = require_str(arguments, "upc")?;
        Ok(ToolResponse::Success(ToolPayload::Validation(
            validate_upc_a(upc),
        )))
    }
}

/// `upc-check-digit`: completes a partial code into a valid UPC-A.
#[derive(Clone, Default)]
pub struct CheckDigitAdapter;

#[async_trait]
impl ToolAdapter for CheckDigitAdapter {
    fn descriptor(&self) -> ToolDescriptor {
        ToolDescriptor::single_string_arg(
            "upc-check-digit",
            "Calculates the UPC-A check digit for a partial code (11 digits or fewer) and \
             returns the completed 12-digit code. Also recomputes the check digit for a \
             12-digit code whose checksum fails.",
            "upc",
            "The partial or suspect UPC code",
        )
    }

    async fn invoke(&self, arguments: &Map<String, Value>) -> Result<ToolResponse> {
        let upc = require_str(arguments, "upc")?;
        let completed = complete_check_digit(upc)?;
        Ok(ToolResponse::Success(ToolPayload::Text(format!(
            "completed UPC-A: {completed}"
        ))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pantry_core::upc::UpcInvalidReason;

    fn args(value: &str) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("upc".to_string(), Value::String(value.to_string()));
        map
    }

    #[tokio::test]
    async fn validator_reports_structured_outcome() {
        let adapter = UpcValidatorAdapter;
        let response = adapter.invoke(&args("028400433303")).await.unwrap();
        let ToolResponse::Success(ToolPayload::Validation(validation)) = response else {
            panic!("expected a validation payload");
        };
        assert!(validation.valid);

        let response = adapter.invoke(&args("12345")).await.unwrap();
        let ToolResponse::Success(ToolPayload::Validation(validation)) = response else {
            panic!("expected a validation payload");
        };
        assert_eq!(
            validation.reason,
            Some(UpcInvalidReason::InvalidLength { got: 5 })
        );
    }

    #[tokio::test]
    async fn check_digit_completion_round_trips_through_validation() {
        let adapter = CheckDigitAdapter;
        let response = adapter.invoke(&args("02840043330")).await.unwrap();
        let ToolResponse::Success(ToolPayload::Text(text)) = response else {
            panic!("expected a text payload");
        };
        assert_eq!(text, "completed UPC-A: 028400433303");
    }

    #[tokio::test]
    async fn overlong_input_is_an_error() {
        let adapter = CheckDigitAdapter;
        assert!(adapter.invoke(&args("1234567890123")).await.is_err());
    }
}
