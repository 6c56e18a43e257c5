//! Error types for the cadence engine
//!
//! Errors are classified by origin:
//! - Configuration: bad intervals, threshold tables, basis names, timezones,
//!   stored readings that are not finite
//! - Input: timestamps that cannot be placed on a calendar day unambiguously,
//!   current readings that are not finite
//! - Config file: the JSON config could not be read or parsed
//!
//! Nothing here is retryable. Every error is detected synchronously at the
//! call boundary before any computation starts.

use std::path::PathBuf;
use thiserror::Error;

/// Error types for engine operations
#[derive(Debug, Error)]
pub enum EngineError {
    // Configuration errors
    #[error("Interval must be positive, got {0}")]
    InvalidInterval(String),

    #[error("Invalid threshold table: {0}")]
    InvalidThresholds(String),

    #[error("Unknown schedule basis '{0}' (expected \"time\" or \"usage\")")]
    UnknownBasis(String),

    #[error("{value} cannot be used with a {basis} schedule")]
    BasisMismatch { basis: String, value: String },

    #[error("Unknown timezone: {0}")]
    UnknownTimezone(String),

    #[error("Unknown threshold table: {0}")]
    UnknownTable(String),

    #[error("Invalid proximity window: {0}")]
    InvalidWindow(String),

    #[error("Last service reading must be a finite number, got {0}")]
    InvalidLastReading(String),

    // Input errors
    #[error("Timestamp '{0}' has no timezone and cannot be placed on a day unambiguously")]
    AmbiguousDate(String),

    #[error("Could not parse timestamp '{0}'")]
    InvalidTimestamp(String),

    #[error("Usage reading must be a finite number, got {0}")]
    InvalidReading(String),

    // Config file errors
    #[error("Failed to read config {path}: {message}")]
    ConfigRead { path: PathBuf, message: String },

    #[error("Failed to parse config: {0}")]
    ConfigParse(String),
}

impl EngineError {
    /// Returns true for the fatal configuration family: programmer errors
    /// that will fail the same way on every call.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            EngineError::InvalidInterval(_)
                | EngineError::InvalidThresholds(_)
                | EngineError::UnknownBasis(_)
                | EngineError::BasisMismatch { .. }
                | EngineError::UnknownTimezone(_)
                | EngineError::UnknownTable(_)
                | EngineError::InvalidWindow(_)
                | EngineError::InvalidLastReading(_)
                | EngineError::ConfigParse(_)
        )
    }

    /// Returns true if the caller supplied a timestamp or reading the engine refused
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            EngineError::AmbiguousDate(_)
                | EngineError::InvalidTimestamp(_)
                | EngineError::InvalidReading(_)
        )
    }

    /// Get a user-friendly recovery suggestion
    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            EngineError::InvalidInterval(_) => "Use an interval greater than zero.",
            EngineError::InvalidThresholds(_) => {
                "Threshold bounds must be strictly ascending with a final catch-all label."
            }
            EngineError::UnknownBasis(_) => "Use \"time\" or \"usage\" as the schedule basis.",
            EngineError::BasisMismatch { .. } => {
                "Use days/weeks/months/years for time schedules and units for usage schedules."
            }
            EngineError::UnknownTimezone(_) => {
                "Use an IANA timezone name such as \"America/New_York\"."
            }
            EngineError::UnknownTable(_) => "Add the table under \"thresholds\" in the config.",
            EngineError::InvalidWindow(_) => "Proximity windows must be zero or positive.",
            EngineError::InvalidLastReading(_) => {
                "Store the last service reading as a finite number."
            }
            EngineError::AmbiguousDate(_) => {
                "Send timestamps with an explicit offset, e.g. 2024-01-05T09:00:00Z."
            }
            EngineError::InvalidTimestamp(_) => {
                "Send timestamps in RFC 3339, ISO 8601 with an offset, or RFC 2822 format."
            }
            EngineError::InvalidReading(_) => "Send the current reading as a finite number.",
            EngineError::ConfigRead { .. } => "Check the config path and file permissions.",
            EngineError::ConfigParse(_) => "Check the config file is valid JSON.",
        }
    }
}

/// Serializable error representation for the request/response boundary
#[derive(Debug, Clone, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineErrorPayload {
    pub message: String,
    pub error_type: ErrorType,
    pub can_retry: bool,
    pub recovery_suggestion: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ErrorType {
    InvalidConfiguration,
    InvalidInput,
    ConfigUnavailable,
}

impl From<&EngineError> for EngineErrorPayload {
    fn from(err: &EngineError) -> Self {
        let error_type = if err.is_configuration_error() {
            ErrorType::InvalidConfiguration
        } else if err.is_input_error() {
            ErrorType::InvalidInput
        } else {
            ErrorType::ConfigUnavailable
        };

        EngineErrorPayload {
            message: err.to_string(),
            error_type,
            can_retry: false,
            recovery_suggestion: err.recovery_suggestion().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_error_is_configuration() {
        let err = EngineError::InvalidInterval("0 days".to_string());
        assert!(err.is_configuration_error());
        assert!(!err.is_input_error());
    }

    #[test]
    fn test_ambiguous_date_is_input_error() {
        let err = EngineError::AmbiguousDate("2024-01-05 09:00:00".to_string());
        assert!(err.is_input_error());
        assert!(!err.is_configuration_error());
    }

    #[test]
    fn test_reading_errors_split_by_origin() {
        let last = EngineError::InvalidLastReading("NaN".to_string());
        assert!(last.is_configuration_error());
        assert!(!last.is_input_error());

        let current = EngineError::InvalidReading("inf".to_string());
        assert!(current.is_input_error());
        assert_eq!(
            EngineErrorPayload::from(&current).error_type,
            ErrorType::InvalidInput
        );
    }

    #[test]
    fn test_payload_serializes_camel_case() {
        let err = EngineError::UnknownBasis("distance".to_string());
        let payload = EngineErrorPayload::from(&err);
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["errorType"], "invalidConfiguration");
        assert_eq!(json["canRetry"], false);
        assert!(json["message"].as_str().unwrap().contains("distance"));
    }

    #[test]
    fn test_config_read_payload_type() {
        let err = EngineError::ConfigRead {
            path: PathBuf::from("/missing/config.json"),
            message: "not found".to_string(),
        };
        let payload = EngineErrorPayload::from(&err);
        assert_eq!(payload.error_type, ErrorType::ConfigUnavailable);
    }
}
