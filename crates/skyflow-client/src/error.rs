//! Error types for the vault client.

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

/// Boxed error used for failures raised by pluggable collaborators.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Error body returned by the vault.
///
/// The vault wraps failures as `{"error": {"http_code": ..., "message": ...}}`.
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    /// The error detail object.
    pub error: ErrorDetail,
}

/// Detailed error information from the vault.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorDetail {
    /// HTTP-like status code reported by the vault; a number or a string.
    #[serde(default)]
    pub http_code: Option<Value>,
    /// Human readable message.
    #[serde(default)]
    pub message: Option<String>,
}

impl ErrorDetail {
    /// Reads the value of an `error` key without requiring a strict shape.
    ///
    /// Each member is picked up on its own, so a malformed `message` does not
    /// lose a valid `http_code`. A bare string is taken as the message.
    #[must_use]
    pub fn from_error_value(error: &Value) -> Self {
        let member = |name: &str| error.get(name).filter(|v| !v.is_null());

        let message = match member("message") {
            Some(Value::String(text)) => text.clone(),
            Some(other) => other.to_string(),
            None => error
                .as_str()
                .map_or_else(|| error.to_string(), str::to_string),
        };

        Self {
            http_code: member("http_code").cloned(),
            message: Some(message),
        }
    }

    /// The reported code rendered as text, falling back to `fallback`.
    #[must_use]
    pub fn code_or(&self, fallback: u16) -> String {
        match &self.http_code {
            Some(Value::String(code)) => code.clone(),
            Some(Value::Null) | None => fallback.to_string(),
            Some(other) => other.to_string(),
        }
    }
}

/// Malformed caller input detected before any request is sent.
///
/// Every variant is a separate condition so callers can react to a specific
/// problem without inspecting message text. Record-level variants carry the
/// zero-based position of the offending record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ValidationError {
    /// The input has no `records` key.
    #[error("records key not found in the input")]
    MissingRecords,

    /// The `records` value is not an array.
    #[error("records must be an array")]
    InvalidRecords,

    /// The record collection is empty.
    #[error("records array is empty")]
    EmptyRecords,

    /// A record is not a JSON object.
    #[error("record {index} is not an object")]
    InvalidRecord {
        /// Position of the record.
        index: usize,
    },

    /// A record has no `table` key.
    #[error("record {index} is missing the table key")]
    MissingTable {
        /// Position of the record.
        index: usize,
    },

    /// A record's table name is not a string.
    #[error("record {index} has a table name that is not a string")]
    InvalidTable {
        /// Position of the record.
        index: usize,
    },

    /// A record's table name is empty.
    #[error("record {index} has an empty table name")]
    EmptyTableName {
        /// Position of the record.
        index: usize,
    },

    /// A record has no `fields` key.
    #[error("record {index} is missing the fields key")]
    MissingFields {
        /// Position of the record.
        index: usize,
    },

    /// A record's fields value is not an object.
    #[error("record {index} has fields that are not an object")]
    InvalidFields {
        /// Position of the record.
        index: usize,
    },

    /// A record's fields mapping is empty.
    #[error("record {index} has empty fields")]
    EmptyFields {
        /// Position of the record.
        index: usize,
    },

    /// A record has a field with an empty name.
    #[error("record {index} has an empty column name")]
    EmptyColumnName {
        /// Position of the record.
        index: usize,
    },

    /// A query parameter is not a string, number or boolean.
    #[error("query parameter '{name}' must be a string, number or boolean")]
    InvalidQueryParam {
        /// Parameter name.
        name: String,
    },

    /// The table to read from is empty.
    #[error("table name is empty")]
    EmptyTable,

    /// No record identifiers were given.
    #[error("no skyflow ids given")]
    EmptyIds,

    /// A record identifier is empty.
    #[error("skyflow id {index} is empty")]
    EmptyId {
        /// Position of the identifier.
        index: usize,
    },

    /// No tokens were given.
    #[error("no tokens given")]
    EmptyTokens,

    /// A token is empty.
    #[error("token {index} is empty")]
    EmptyToken {
        /// Position of the token.
        index: usize,
    },
}

/// Errors returned by every vault operation.
///
/// Nothing is retried and nothing is swallowed: each failure is classified
/// into exactly one of these kinds and handed back to the caller.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ClientError {
    /// Vault or connection coordinates are missing or unusable.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Caller input failed validation. No request was sent.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// JSON serialization or deserialization error.
    ///
    /// Raised when a payload cannot be encoded or a response body is not JSON.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Network-level failure while talking to the vault.
    #[error("Transport error: {0}")]
    TransportError(#[source] BoxError),

    /// The token provider could not produce a bearer token.
    #[error("Token error: {0}")]
    TokenError(#[source] BoxError),

    /// The vault rejected the request.
    ///
    /// `code` and `message` are passed through from the vault unchanged.
    #[error("Vault error {code}: {message}")]
    VaultError {
        /// Status code reported by the vault.
        code: String,
        /// Message reported by the vault.
        message: String,
    },

    /// The response is JSON but does not have the documented shape.
    #[error("Malformed vault response: {0}")]
    MalformedResponse(String),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        Self::TransportError(Box::new(err))
    }
}

impl ClientError {
    /// Check if this error came from input validation.
    pub const fn is_validation_error(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// The validation failure, if this is one.
    pub const fn validation_error(&self) -> Option<&ValidationError> {
        match self {
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }

    /// Check if this error was reported by the vault.
    pub const fn is_vault_error(&self) -> bool {
        matches!(self, Self::VaultError { .. })
    }

    /// The vault-reported status code, if this is a vault error.
    pub fn vault_code(&self) -> Option<&str> {
        match self {
            Self::VaultError { code, .. } => Some(code),
            _ => None,
        }
    }

    /// Check if this is a network-level failure.
    pub const fn is_transport_error(&self) -> bool {
        matches!(self, Self::TransportError(_))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use serde_json::json;

    use super::*;

    #[test]
    fn test_error_detail_numeric_code() {
        let parsed: ErrorResponse = serde_json::from_str(
            r#"{"error": {"http_code": 404, "message": "No Records Found"}}"#,
        )
        .unwrap();

        assert_eq!(parsed.error.code_or(500), "404");
        assert_eq!(parsed.error.message.as_deref(), Some("No Records Found"));
    }

    #[test]
    fn test_error_detail_string_code_and_fallback() {
        let parsed: ErrorResponse =
            serde_json::from_str(r#"{"error": {"http_code": "400"}}"#).unwrap();
        assert_eq!(parsed.error.code_or(500), "400");
        assert!(parsed.error.message.is_none());

        let empty = ErrorDetail::default();
        assert_eq!(empty.code_or(502), "502");
    }

    #[test]
    fn test_error_value_read_leniently() {
        let bare = ErrorDetail::from_error_value(&json!("boom"));
        assert_eq!(bare.message.as_deref(), Some("boom"));
        assert_eq!(bare.code_or(500), "500");

        let odd_message =
            ErrorDetail::from_error_value(&json!({"http_code": 409, "message": {"reason": "dup"}}));
        assert_eq!(odd_message.code_or(500), "409");
        assert_eq!(odd_message.message.as_deref(), Some(r#"{"reason":"dup"}"#));

        let no_message = ErrorDetail::from_error_value(&json!({"http_code": "403"}));
        assert_eq!(no_message.code_or(500), "403");
        assert_eq!(no_message.message.as_deref(), Some(r#"{"http_code":"403"}"#));
    }

    #[test]
    fn test_vault_error_accessors() {
        let err = ClientError::VaultError {
            code: "401".to_string(),
            message: "unauthorized".to_string(),
        };

        assert!(err.is_vault_error());
        assert!(!err.is_validation_error());
        assert_eq!(err.vault_code(), Some("401"));
        assert_eq!(err.to_string(), "Vault error 401: unauthorized");
    }

    #[test]
    fn test_validation_error_accessors() {
        let err = ClientError::from(ValidationError::EmptyFields { index: 2 });

        assert!(err.is_validation_error());
        assert_eq!(
            err.validation_error(),
            Some(&ValidationError::EmptyFields { index: 2 })
        );
        assert!(err.vault_code().is_none());
        assert_eq!(err.to_string(), "Validation error: record 2 has empty fields");
    }

    #[test]
    fn test_transport_error_keeps_source() {
        let err = ClientError::TransportError("connection refused".into());
        assert!(err.is_transport_error());
        assert!(std::error::Error::source(&err).is_some());
    }
}
