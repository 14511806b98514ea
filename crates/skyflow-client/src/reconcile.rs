//! Maps the vault's flat batch response back onto the caller's records.
//!
//! The vault answers a batch with one entry per operation, in submission
//! order. Without tokens entry `i` belongs to record `i`. With tokens the
//! first half holds the insert results and the second half the read-backs;
//! the pairing produced by [`read_back_pairs`] says which is which.
//!
//! Entry shapes accepted:
//!
//! ```text
//! insert:     {"records": [{"skyflow_id": "...", "fields": {...}?}]}
//! read-back:  {"fields": {...}}  or  {"records": [{"skyflow_id": "...", "fields": {...}?}]}
//! ```
//!
//! Anything else is reported as [`ClientError::MalformedResponse`].

use serde::Deserialize;
use serde_json::Value;

use skyflow_common::{Fields, InsertOptions, Record, ReconciledRecord, SKYFLOW_ID};

use crate::batch::{ReadBack, pair_for_position, read_back_pairs};
use crate::error::ClientError;

/// One entry of the `responses` array.
#[derive(Debug, Default, Deserialize)]
struct OperationResult {
    #[serde(default)]
    records: Option<Vec<ResultRecord>>,
    #[serde(default)]
    fields: Option<Fields>,
}

/// One element of an entry's `records` array.
#[derive(Debug, Default, Deserialize)]
struct ResultRecord {
    #[serde(default)]
    skyflow_id: Option<String>,
    #[serde(default)]
    fields: Option<Fields>,
}

impl OperationResult {
    fn first_record(&self) -> Option<&ResultRecord> {
        self.records.as_ref().and_then(|records| records.first())
    }

    fn skyflow_id(&self) -> Option<&str> {
        self.first_record()
            .and_then(|r| r.skyflow_id.as_deref())
            .or_else(|| {
                self.fields
                    .as_ref()
                    .and_then(|f| f.get(SKYFLOW_ID))
                    .and_then(Value::as_str)
            })
    }

    fn fields(&self) -> Option<&Fields> {
        self.fields
            .as_ref()
            .or_else(|| self.first_record().and_then(|r| r.fields.as_ref()))
    }
}

fn parse_entries(responses: Vec<Value>) -> Result<Vec<OperationResult>, ClientError> {
    responses
        .into_iter()
        .enumerate()
        .map(|(position, entry)| {
            serde_json::from_value(entry).map_err(|e| {
                ClientError::MalformedResponse(format!("response {position} is malformed: {e}"))
            })
        })
        .collect()
}

/// Reconciles a batch response with the records that produced it.
///
/// # Errors
///
/// Returns [`ClientError::MalformedResponse`] if the response length does not
/// match the batch, or if an entry lacks the record, identifier or fields
/// expected at its position.
pub fn reconcile_insert(
    responses: Vec<Value>,
    records: &[Record],
    options: InsertOptions,
) -> Result<Vec<ReconciledRecord>, ClientError> {
    let expected = if options.tokens {
        records.len() * 2
    } else {
        records.len()
    };

    if responses.len() != expected {
        return Err(ClientError::MalformedResponse(format!(
            "expected {expected} responses for {} records, got {}",
            records.len(),
            responses.len()
        )));
    }

    let entries = parse_entries(responses)?;

    if options.tokens {
        reconcile_tokenized(&entries, records)
    } else {
        reconcile_plain(&entries, records)
    }
}

fn reconcile_plain(
    entries: &[OperationResult],
    records: &[Record],
) -> Result<Vec<ReconciledRecord>, ClientError> {
    entries
        .iter()
        .zip(records)
        .enumerate()
        .map(|(position, (entry, record))| {
            let inner = entry.first_record().ok_or_else(|| {
                ClientError::MalformedResponse(format!(
                    "response {position} has no inserted record"
                ))
            })?;

            Ok(ReconciledRecord {
                table: record.table.clone(),
                fields: inner.fields.clone().unwrap_or_default(),
                skyflow_id: inner.skyflow_id.clone(),
            })
        })
        .collect()
}

fn reconcile_tokenized(
    entries: &[OperationResult],
    records: &[Record],
) -> Result<Vec<ReconciledRecord>, ClientError> {
    read_back_pairs(records.len())
        .map(|pair| {
            check_pair(entries.len(), pair)?;
            reconcile_pair(entries, records, pair)
        })
        .collect()
}

fn check_pair(response_len: usize, pair: ReadBack) -> Result<(), ClientError> {
    if pair_for_position(response_len, pair.read_index) == Some(pair) {
        Ok(())
    } else {
        Err(ClientError::MalformedResponse(format!(
            "no insert result pairs with read-back at position {}",
            pair.read_index
        )))
    }
}

fn reconcile_pair(
    entries: &[OperationResult],
    records: &[Record],
    pair: ReadBack,
) -> Result<ReconciledRecord, ClientError> {
    let missing = |what: &str| {
        ClientError::MalformedResponse(format!(
            "no {what} for record {} (responses {} and {})",
            pair.insert_index, pair.insert_index, pair.read_index
        ))
    };

    let (Some(insert), Some(read), Some(record)) = (
        entries.get(pair.insert_index),
        entries.get(pair.read_index),
        records.get(pair.insert_index),
    ) else {
        return Err(missing("response entry"));
    };

    let skyflow_id = read
        .skyflow_id()
        .or_else(|| insert.skyflow_id())
        .ok_or_else(|| missing(SKYFLOW_ID))?
        .to_string();

    let mut fields = read
        .fields()
        .or_else(|| insert.fields())
        .cloned()
        .ok_or_else(|| missing("fields"))?;

    fields.insert(SKYFLOW_ID.to_string(), Value::String(skyflow_id.clone()));

    Ok(ReconciledRecord {
        table: record.table.clone(),
        fields,
        skyflow_id: Some(skyflow_id),
    })
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use serde_json::json;

    fn persons() -> Vec<Record> {
        vec![
            Record::new("person").with_field("name", "A"),
            Record::new("person").with_field("name", "B"),
        ]
    }

    fn fields(value: Value) -> Fields {
        value.as_object().cloned().unwrap()
    }

    fn responses(value: Value) -> Vec<Value> {
        value.as_array().cloned().unwrap()
    }

    #[test]
    fn test_plain_insert_keeps_order_and_tables() {
        let response = responses(json!([
            {"records": [{"fields": {"name": "A"}}]},
            {"records": [{"fields": {"name": "B"}}]}
        ]));

        let reconciled = reconcile_insert(response, &persons(), InsertOptions::default()).unwrap();

        assert_eq!(
            reconciled,
            vec![
                ReconciledRecord {
                    table: "person".to_string(),
                    fields: fields(json!({"name": "A"})),
                    skyflow_id: None,
                },
                ReconciledRecord {
                    table: "person".to_string(),
                    fields: fields(json!({"name": "B"})),
                    skyflow_id: None,
                },
            ]
        );
    }

    #[test]
    fn test_plain_insert_surfaces_generated_ids() {
        let records = vec![
            Record::new("person").with_field("name", "A"),
            Record::new("card").with_field("number", "4111"),
        ];
        let response = responses(json!([
            {"records": [{"skyflow_id": "id-A"}]},
            {"records": [{"skyflow_id": "id-C"}]}
        ]));

        let reconciled = reconcile_insert(response, &records, InsertOptions::default()).unwrap();

        assert_eq!(reconciled[0].table, "person");
        assert_eq!(reconciled[0].skyflow_id.as_deref(), Some("id-A"));
        assert!(reconciled[0].fields.is_empty());
        assert_eq!(reconciled[1].table, "card");
        assert_eq!(reconciled[1].skyflow_id.as_deref(), Some("id-C"));
    }

    #[test]
    fn test_tokenized_insert_with_ids_in_read_back_half() {
        let response = responses(json!([
            {"records": [{"fields": {"name": "A"}}]},
            {"records": [{"fields": {"name": "B"}}]},
            {"records": [{"skyflow_id": "id-A"}]},
            {"records": [{"skyflow_id": "id-B"}]}
        ]));

        let reconciled =
            reconcile_insert(response, &persons(), InsertOptions::with_tokens(true)).unwrap();

        assert_eq!(reconciled.len(), 2);
        assert_eq!(
            reconciled[0].fields,
            fields(json!({"name": "A", "skyflow_id": "id-A"}))
        );
        assert_eq!(
            reconciled[1].fields,
            fields(json!({"name": "B", "skyflow_id": "id-B"}))
        );
        assert!(reconciled.iter().all(|r| r.table == "person"));
    }

    #[test]
    fn test_tokenized_insert_with_vault_shaped_response() {
        let response = responses(json!([
            {"records": [{"skyflow_id": "id-A"}]},
            {"records": [{"skyflow_id": "id-B"}]},
            {"fields": {"name": "tok-A"}},
            {"fields": {"name": "tok-B", "skyflow_id": "id-B"}}
        ]));

        let reconciled =
            reconcile_insert(response, &persons(), InsertOptions::with_tokens(true)).unwrap();

        assert_eq!(
            reconciled[0].fields,
            fields(json!({"name": "tok-A", "skyflow_id": "id-A"}))
        );
        assert_eq!(reconciled[0].skyflow_id.as_deref(), Some("id-A"));
        assert_eq!(
            reconciled[1].fields,
            fields(json!({"name": "tok-B", "skyflow_id": "id-B"}))
        );
    }

    #[test]
    fn test_tokenized_id_comes_from_read_back_when_both_halves_carry_one() {
        let response = responses(json!([
            {"records": [{"skyflow_id": "post-A", "fields": {"name": "A"}}]},
            {"records": [{"skyflow_id": "post-B", "fields": {"name": "B"}}]},
            {"records": [{"skyflow_id": "id-A"}]},
            {"records": [{"skyflow_id": "id-B"}]}
        ]));

        let reconciled =
            reconcile_insert(response, &persons(), InsertOptions::with_tokens(true)).unwrap();

        assert_eq!(reconciled[0].fields["skyflow_id"], "id-A");
        assert_eq!(reconciled[0].skyflow_id.as_deref(), Some("id-A"));
        assert_eq!(reconciled[0].fields["name"], "A");
        assert_eq!(reconciled[1].fields["skyflow_id"], "id-B");
        assert_eq!(reconciled[1].fields["name"], "B");
    }

    #[test]
    fn test_tokenized_single_record() {
        let records = vec![Record::new("card").with_field("number", "4111")];
        let response = responses(json!([
            {"records": [{"skyflow_id": "only"}]},
            {"fields": {"number": "tok-4111"}}
        ]));

        let reconciled =
            reconcile_insert(response, &records, InsertOptions::with_tokens(true)).unwrap();

        assert_eq!(reconciled.len(), 1);
        assert_eq!(reconciled[0].table, "card");
        assert_eq!(reconciled[0].fields["skyflow_id"], "only");
        assert_eq!(reconciled[0].fields["number"], "tok-4111");
    }

    #[test]
    fn test_tokenized_large_batch_has_no_off_by_one() {
        let n = 500;
        let records: Vec<Record> = (0..n)
            .map(|i| Record::new(format!("table-{i}")).with_field("value", i))
            .collect();

        let mut response: Vec<Value> = (0..n)
            .map(|i| json!({"records": [{"skyflow_id": format!("id-{i}")}]}))
            .collect();
        response.extend((0..n).map(|i| json!({"fields": {"value": format!("tok-{i}")}})));

        let reconciled =
            reconcile_insert(response, &records, InsertOptions::with_tokens(true)).unwrap();

        assert_eq!(reconciled.len(), n);
        for (i, record) in reconciled.iter().enumerate() {
            assert_eq!(record.table, format!("table-{i}"));
            assert_eq!(record.skyflow_id, Some(format!("id-{i}")));
            assert_eq!(record.fields["value"], format!("tok-{i}"));
            assert_eq!(record.fields["skyflow_id"], format!("id-{i}"));
        }
    }

    #[test]
    fn test_length_mismatch_is_malformed() {
        let response = responses(json!([{"records": [{"skyflow_id": "id-A"}]}]));
        let err = reconcile_insert(response.clone(), &persons(), InsertOptions::default())
            .unwrap_err();
        assert!(matches!(err, ClientError::MalformedResponse(_)));

        let err = reconcile_insert(response, &persons()[..1], InsertOptions::with_tokens(true))
            .unwrap_err();
        assert!(matches!(err, ClientError::MalformedResponse(_)));
    }

    #[test]
    fn test_missing_keys_are_malformed() {
        let records = &persons()[..1];

        let cases = vec![
            (json!([{}]), InsertOptions::default()),
            (json!([{"records": []}]), InsertOptions::default()),
            (json!(["not an object"]), InsertOptions::default()),
            (json!([{"records": "nope"}]), InsertOptions::default()),
            (
                json!([{"records": [{}]}, {"fields": {"name": "tok"}}]),
                InsertOptions::with_tokens(true),
            ),
            (
                json!([{"records": [{"skyflow_id": "id"}]}, {}]),
                InsertOptions::with_tokens(true),
            ),
        ];

        for (response, options) in cases {
            let err = reconcile_insert(responses(response.clone()), records, options).unwrap_err();
            assert!(
                matches!(err, ClientError::MalformedResponse(_)),
                "{response}: {err}"
            );
        }
    }
}
