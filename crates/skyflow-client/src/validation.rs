//! Input validation performed before any request leaves the process.
//!
//! Caller input arrives either as loosely typed JSON (the `{"records": [...]}`
//! shape used by the vault's own samples) or as typed [`Record`]s. Both paths
//! end in the same checks, applied in a fixed order and stopping at the first
//! failure:
//!
//! 1. vault coordinates are present
//! 2. a `records` key exists
//! 3. the collection is non-empty
//! 4. per record: table present and non-empty, fields present and non-empty,
//!    no empty column names

use log::{error, info};
use serde_json::Value;
use url::Url;

use skyflow_common::{Fields, Record, VaultConfig};

use crate::error::{ClientError, ValidationError};

/// Checks that the vault URL and ID are usable.
///
/// # Errors
///
/// Returns [`ClientError::ConfigurationError`] if either value is empty or the
/// URL is not an absolute `http(s)` URL.
pub fn validate_vault_details(config: &VaultConfig) -> Result<(), ClientError> {
    if config.vault_id.trim().is_empty() {
        error!("Vault ID is empty");
        return Err(ClientError::ConfigurationError(
            "vault ID is required".to_string(),
        ));
    }

    if config.vault_url.trim().is_empty() {
        error!("Vault URL is empty");
        return Err(ClientError::ConfigurationError(
            "vault URL is required".to_string(),
        ));
    }

    parse_http_url(&config.vault_url).map_err(|reason| {
        error!("Invalid vault URL '{}': {reason}", config.vault_url);
        ClientError::ConfigurationError(format!(
            "invalid vault URL '{}': {reason}",
            config.vault_url
        ))
    })?;

    Ok(())
}

/// Parses an absolute `http` or `https` URL with a host.
pub(crate) fn parse_http_url(raw: &str) -> Result<Url, String> {
    let url = Url::parse(raw).map_err(|e| e.to_string())?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(format!("unsupported scheme '{}'", url.scheme()));
    }

    if url.host_str().is_none_or(str::is_empty) {
        return Err("missing host".to_string());
    }

    Ok(url)
}

/// Parses a loosely typed `{"records": [...]}` value into typed records.
///
/// # Errors
///
/// Returns the [`ValidationError`] for the first malformed part of the input.
pub fn parse_insert_records(input: &Value) -> Result<Vec<Record>, ValidationError> {
    let records = match input.get("records") {
        None | Some(Value::Null) => return Err(ValidationError::MissingRecords),
        Some(Value::Array(records)) => records,
        Some(_) => return Err(ValidationError::InvalidRecords),
    };

    if records.is_empty() {
        return Err(ValidationError::EmptyRecords);
    }

    records
        .iter()
        .enumerate()
        .map(|(index, record)| parse_record(index, record))
        .collect()
}

fn parse_record(index: usize, value: &Value) -> Result<Record, ValidationError> {
    let Value::Object(object) = value else {
        return Err(ValidationError::InvalidRecord { index });
    };

    let table = match object.get("table") {
        None | Some(Value::Null) => return Err(ValidationError::MissingTable { index }),
        Some(Value::String(table)) if table.is_empty() => {
            return Err(ValidationError::EmptyTableName { index });
        }
        Some(Value::String(table)) => table,
        Some(_) => return Err(ValidationError::InvalidTable { index }),
    };

    let fields = match object.get("fields") {
        None | Some(Value::Null) => return Err(ValidationError::MissingFields { index }),
        Some(Value::String(s)) if s.is_empty() => {
            return Err(ValidationError::EmptyFields { index });
        }
        Some(Value::Object(fields)) => fields,
        Some(_) => return Err(ValidationError::InvalidFields { index }),
    };

    validate_fields(index, fields)?;

    Ok(Record::from_fields(table.clone(), fields.clone()))
}

fn validate_fields(index: usize, fields: &Fields) -> Result<(), ValidationError> {
    if fields.is_empty() {
        return Err(ValidationError::EmptyFields { index });
    }

    if fields.keys().any(String::is_empty) {
        return Err(ValidationError::EmptyColumnName { index });
    }

    Ok(())
}

/// Validates typed records with the same rules applied to JSON input.
///
/// # Errors
///
/// Returns the [`ValidationError`] for the first malformed record.
pub fn validate_records(records: &[Record]) -> Result<(), ValidationError> {
    if records.is_empty() {
        return Err(ValidationError::EmptyRecords);
    }

    for (index, record) in records.iter().enumerate() {
        if record.table.is_empty() {
            return Err(ValidationError::EmptyTableName { index });
        }
        validate_fields(index, &record.fields)?;
    }

    Ok(())
}

/// Validates the arguments of a read by identifier.
///
/// # Errors
///
/// Returns a [`ValidationError`] if the table or any identifier is empty.
pub fn validate_get_request(table: &str, ids: &[String]) -> Result<(), ValidationError> {
    if table.is_empty() {
        return Err(ValidationError::EmptyTable);
    }

    if ids.is_empty() {
        return Err(ValidationError::EmptyIds);
    }

    if let Some(index) = ids.iter().position(String::is_empty) {
        return Err(ValidationError::EmptyId { index });
    }

    Ok(())
}

/// Validates the tokens of a detokenize call.
///
/// # Errors
///
/// Returns a [`ValidationError`] if there are no tokens or any token is empty.
pub fn validate_tokens(tokens: &[String]) -> Result<(), ValidationError> {
    if tokens.is_empty() {
        return Err(ValidationError::EmptyTokens);
    }

    if let Some(index) = tokens.iter().position(String::is_empty) {
        return Err(ValidationError::EmptyToken { index });
    }

    Ok(())
}

/// Runs the full insert validation sequence for JSON input.
pub(crate) fn validate_insert_input(
    tag: &str,
    config: &VaultConfig,
    input: &Value,
) -> Result<Vec<Record>, ClientError> {
    validate_vault_details(config)?;

    info!("{tag}: validating records");
    parse_insert_records(input).map_err(|e| {
        error!("{tag}: {e}");
        ClientError::from(e)
    })
}

/// Runs the full insert validation sequence for typed records.
pub(crate) fn validate_insert_records(
    tag: &str,
    config: &VaultConfig,
    records: &[Record],
) -> Result<(), ClientError> {
    validate_vault_details(config)?;

    info!("{tag}: validating records");
    validate_records(records).map_err(|e| {
        error!("{tag}: {e}");
        ClientError::from(e)
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use serde_json::json;

    fn vault() -> VaultConfig {
        VaultConfig::new("vault-id", "https://acme.vault.skyflowapis.com")
    }

    #[test]
    fn test_well_formed_records_parse() {
        let input = json!({
            "records": [
                {"table": "persons", "fields": {"name": "A"}},
                {"table": "cards", "fields": {"number": "4111", "cvv": 123}}
            ]
        });

        let records = parse_insert_records(&input).unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0], Record::new("persons").with_field("name", "A"));
        assert_eq!(records[1].table, "cards");
        assert_eq!(records[1].fields["cvv"], 123);
    }

    #[test]
    fn test_each_malformed_shape_has_its_own_error() {
        let cases = vec![
            (json!({}), ValidationError::MissingRecords),
            (json!({"records": null}), ValidationError::MissingRecords),
            (json!({"records": []}), ValidationError::EmptyRecords),
            (
                json!({"records": [{"fields": {"name": "A"}}]}),
                ValidationError::MissingTable { index: 0 },
            ),
            (
                json!({"records": [{"table": "", "fields": {"name": "A"}}]}),
                ValidationError::EmptyTableName { index: 0 },
            ),
            (
                json!({"records": [{"table": "persons"}]}),
                ValidationError::MissingFields { index: 0 },
            ),
            (
                json!({"records": [{"table": "persons", "fields": {}}]}),
                ValidationError::EmptyFields { index: 0 },
            ),
            (
                json!({"records": [{"table": "persons", "fields": {"": "A"}}]}),
                ValidationError::EmptyColumnName { index: 0 },
            ),
        ];

        for (input, expected) in cases {
            assert_eq!(parse_insert_records(&input).unwrap_err(), expected, "{input}");
        }
    }

    #[test]
    fn test_shape_mismatches_are_reported_not_panicked() {
        assert_eq!(
            parse_insert_records(&json!({"records": "nope"})).unwrap_err(),
            ValidationError::InvalidRecords
        );
        assert_eq!(
            parse_insert_records(&json!({"records": [42]})).unwrap_err(),
            ValidationError::InvalidRecord { index: 0 }
        );
        assert_eq!(
            parse_insert_records(&json!({"records": [{"table": 7, "fields": {"a": 1}}]}))
                .unwrap_err(),
            ValidationError::InvalidTable { index: 0 }
        );
        assert_eq!(
            parse_insert_records(&json!({"records": [{"table": "t", "fields": [1, 2]}]}))
                .unwrap_err(),
            ValidationError::InvalidFields { index: 0 }
        );
        assert_eq!(
            parse_insert_records(&json!({"records": [{"table": "t", "fields": ""}]}))
                .unwrap_err(),
            ValidationError::EmptyFields { index: 0 }
        );
    }

    #[test]
    fn test_first_failure_wins() {
        let input = json!({
            "records": [
                {"table": "persons", "fields": {"name": "A"}},
                {"table": "", "fields": {}},
                {"fields": {"name": "C"}}
            ]
        });

        assert_eq!(
            parse_insert_records(&input).unwrap_err(),
            ValidationError::EmptyTableName { index: 1 }
        );
    }

    #[test]
    fn test_typed_records_follow_same_rules() {
        assert_eq!(
            validate_records(&[]).unwrap_err(),
            ValidationError::EmptyRecords
        );
        assert_eq!(
            validate_records(&[Record::new("").with_field("a", 1)]).unwrap_err(),
            ValidationError::EmptyTableName { index: 0 }
        );
        assert_eq!(
            validate_records(&[Record::new("t")]).unwrap_err(),
            ValidationError::EmptyFields { index: 0 }
        );
        assert_eq!(
            validate_records(&[
                Record::new("t").with_field("a", 1),
                Record::new("t").with_field("", 1)
            ])
            .unwrap_err(),
            ValidationError::EmptyColumnName { index: 1 }
        );
        assert!(validate_records(&[Record::new("t").with_field("a", 1)]).is_ok());
    }

    #[test]
    fn test_vault_details_checked_before_records() {
        let config = VaultConfig::new("", "https://acme.vault.skyflowapis.com");
        let err = validate_insert_input("Insert", &config, &json!({})).unwrap_err();
        assert!(matches!(err, ClientError::ConfigurationError(_)));

        let config = VaultConfig::new("vault-id", "");
        let err = validate_insert_input("Insert", &config, &json!({})).unwrap_err();
        assert!(matches!(err, ClientError::ConfigurationError(_)));

        let err = validate_insert_input("Insert", &vault(), &json!({})).unwrap_err();
        assert_eq!(err.validation_error(), Some(&ValidationError::MissingRecords));
    }

    #[test]
    fn test_vault_url_must_be_http() {
        for url in ["not a url", "ftp://vault.example.com", "file:///tmp/vault"] {
            let config = VaultConfig::new("vault-id", url);
            assert!(
                matches!(
                    validate_vault_details(&config),
                    Err(ClientError::ConfigurationError(_))
                ),
                "{url}"
            );
        }

        assert!(validate_vault_details(&vault()).is_ok());
        assert!(validate_vault_details(&VaultConfig::new("v", "http://127.0.0.1:8080")).is_ok());
    }

    #[test]
    fn test_get_request_validation() {
        let ids = vec!["id-1".to_string(), String::new()];

        assert_eq!(
            validate_get_request("", &ids).unwrap_err(),
            ValidationError::EmptyTable
        );
        assert_eq!(
            validate_get_request("persons", &[]).unwrap_err(),
            ValidationError::EmptyIds
        );
        assert_eq!(
            validate_get_request("persons", &ids).unwrap_err(),
            ValidationError::EmptyId { index: 1 }
        );
        assert!(validate_get_request("persons", &ids[..1]).is_ok());
    }

    #[test]
    fn test_token_validation() {
        assert_eq!(validate_tokens(&[]).unwrap_err(), ValidationError::EmptyTokens);
        assert_eq!(
            validate_tokens(&[String::new()]).unwrap_err(),
            ValidationError::EmptyToken { index: 0 }
        );
        assert!(validate_tokens(&["tok".to_string()]).is_ok());
    }
}
