//! Record types exchanged with the vault.
//!
//! A [`Record`] is the caller-facing unit of data: a table name plus an opaque
//! mapping of column names to values. The vault never sees these types
//! directly; the client turns them into batch operations and maps the vault's
//! answers back into [`ReconciledRecord`]s.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Column name to value mapping carried by a record.
///
/// Values are passed through to the vault untouched.
pub type Fields = Map<String, Value>;

/// Name of the column the vault uses for generated record identifiers.
pub const SKYFLOW_ID: &str = "skyflow_id";

/// A single record destined for a vault table.
///
/// # Examples
///
/// ```
/// use skyflow_common::Record;
///
/// let record = Record::new("persons")
///     .with_field("name", "Ada")
///     .with_field("card_number", "4111111111111111");
///
/// assert_eq!(record.table, "persons");
/// assert_eq!(record.fields.len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Target table name.
    pub table: String,
    /// Column values for the record.
    pub fields: Fields,
}

impl Record {
    /// Creates a record for `table` with no fields.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            fields: Fields::new(),
        }
    }

    /// Creates a record from a table name and an existing field map.
    pub fn from_fields(table: impl Into<String>, fields: Fields) -> Self {
        Self {
            table: table.into(),
            fields,
        }
    }

    /// Adds a column value.
    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }
}

/// Options controlling a bulk insert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertOptions {
    /// Read every inserted record back in tokenized form.
    #[serde(default)]
    pub tokens: bool,
}

impl InsertOptions {
    /// Options with tokenized read-back switched on or off.
    #[must_use]
    pub const fn with_tokens(tokens: bool) -> Self {
        Self { tokens }
    }
}

/// An inserted record as reported back by the vault.
///
/// Records are returned in the same order the caller supplied them, each
/// tagged with the table it was written to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciledRecord {
    /// Table the record was inserted into.
    pub table: String,
    /// Fields returned by the vault.
    ///
    /// When tokens were requested this holds the tokenized values plus the
    /// generated `skyflow_id`.
    #[serde(default)]
    pub fields: Fields,
    /// Identifier generated by the vault, when the vault reported one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skyflow_id: Option<String>,
}

/// Result of a bulk insert.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InsertResponse {
    /// Inserted records in caller order.
    pub records: Vec<ReconciledRecord>,
}

/// A token resolved back to its plain value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetokenizedRecord {
    /// The token that was looked up.
    pub token: String,
    /// The stored value behind the token.
    pub value: Value,
}

/// How field values are redacted when records are read back by ID.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RedactionType {
    /// Use the redaction configured on each column.
    #[default]
    Default,
    /// Fully redacted values.
    Redacted,
    /// Partially masked values.
    Masked,
    /// Plain values.
    PlainText,
}

impl RedactionType {
    /// Wire representation used in query strings.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Default => "DEFAULT",
            Self::Redacted => "REDACTED",
            Self::Masked => "MASKED",
            Self::PlainText => "PLAIN_TEXT",
        }
    }
}

impl fmt::Display for RedactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RedactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().replace('-', "_").as_str() {
            "DEFAULT" => Ok(Self::Default),
            "REDACTED" => Ok(Self::Redacted),
            "MASKED" => Ok(Self::Masked),
            "PLAIN_TEXT" => Ok(Self::PlainText),
            other => Err(format!("unknown redaction type: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn test_record_builder_keeps_insertion_order() {
        let record = Record::new("persons")
            .with_field("name", "Ada")
            .with_field("age", 36);

        let keys: Vec<_> = record.fields.keys().cloned().collect();
        assert_eq!(keys, vec!["name", "age"]);
        assert_eq!(record.fields["age"], 36);
    }

    #[test]
    fn test_record_deserializes_from_json() {
        let record: Record = serde_json::from_value(serde_json::json!({
            "table": "cards",
            "fields": {"card_number": "4111"}
        }))
        .unwrap();

        assert_eq!(record, Record::new("cards").with_field("card_number", "4111"));
    }

    #[test]
    fn test_insert_options_default_has_no_tokens() {
        assert!(!InsertOptions::default().tokens);
        assert!(InsertOptions::with_tokens(true).tokens);

        let parsed: InsertOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed, InsertOptions::default());
    }

    #[test]
    fn test_reconciled_record_omits_missing_id() {
        let record = ReconciledRecord {
            table: "persons".to_string(),
            fields: Fields::new(),
            skyflow_id: None,
        };

        let json = serde_json::to_value(&record).unwrap();
        assert!(json.get("skyflow_id").is_none());
        assert_eq!(json["table"], "persons");
    }

    #[test]
    fn test_redaction_type_parsing() {
        assert_eq!(
            "plain-text".parse::<RedactionType>().unwrap(),
            RedactionType::PlainText
        );
        assert_eq!(
            "MASKED".parse::<RedactionType>().unwrap(),
            RedactionType::Masked
        );
        assert!("shredded".parse::<RedactionType>().is_err());
        assert_eq!(RedactionType::PlainText.to_string(), "PLAIN_TEXT");
        assert_eq!(
            serde_json::to_value(RedactionType::Redacted).unwrap(),
            "REDACTED"
        );
    }
}
