//! Batched record operations sent to the vault.
//!
//! An insert of N records becomes a single request to the vault's batch
//! endpoint. Without tokens the request holds N `POST` operations in caller
//! order. With tokens it holds 2N operations: the N inserts first, then N
//! tokenized `GET` read-backs in the same order.
//!
//! A read-back cannot name the record it wants by ID, because that ID does not
//! exist until the insert runs. It refers to the insert's *position* in the
//! batch instead (`$responses.<i>.records.0.skyflow_id`). The pairing between
//! an insert and its read-back is kept as an explicit [`ReadBack`] value so the
//! response side never has to re-derive it from strings.

use serde::Serialize;

use skyflow_common::{Fields, InsertOptions, Record, SKYFLOW_ID};

/// Method of a single batch operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BatchMethod {
    /// Insert a record.
    Post,
    /// Read a record back.
    Get,
}

/// One operation inside a batch request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchOperation {
    /// Operation method.
    pub method: BatchMethod,
    /// Table the operation targets.
    #[serde(rename = "tableName")]
    pub table_name: String,
    /// Fields to insert (inserts only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fields: Option<Fields>,
    /// Record reference (read-backs only).
    #[serde(rename = "ID", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Require quorum consistency for the write (inserts only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quorum: Option<bool>,
    /// Return tokenized values (read-backs only).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokenization: Option<bool>,
}

impl BatchOperation {
    /// An insert of `record`.
    #[must_use]
    pub fn insert(record: &Record) -> Self {
        Self {
            method: BatchMethod::Post,
            table_name: record.table.clone(),
            fields: Some(record.fields.clone()),
            id: None,
            quorum: Some(true),
            tokenization: None,
        }
    }

    /// A tokenized read-back of the record inserted by `pair.insert_index`.
    #[must_use]
    pub fn read_back(record: &Record, pair: ReadBack) -> Self {
        Self {
            method: BatchMethod::Get,
            table_name: record.table.clone(),
            fields: None,
            id: Some(pair.id_expression()),
            quorum: None,
            tokenization: Some(true),
        }
    }
}

/// Links an insert to the read-back that fetches its tokens.
///
/// Both values are positions in the batch, and therefore also positions in
/// the vault's response array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReadBack {
    /// Position of the insert operation.
    pub insert_index: usize,
    /// Position of the read-back operation.
    pub read_index: usize,
}

impl ReadBack {
    /// Positional reference to the identifier generated by the insert.
    #[must_use]
    pub fn id_expression(self) -> String {
        format!("$responses.{}.records.0.{SKYFLOW_ID}", self.insert_index)
    }
}

/// Pairs for a tokenized insert of `record_count` records, in caller order.
pub fn read_back_pairs(record_count: usize) -> impl Iterator<Item = ReadBack> {
    (0..record_count).map(move |i| ReadBack {
        insert_index: i,
        read_index: record_count + i,
    })
}

/// Pair owning response `position` in a tokenized response of `response_len`.
///
/// Read-backs occupy the second half of the response; the insert for the
/// read-back at `position` sits `len - len / 2` slots earlier. Returns `None`
/// for odd lengths and for positions in the insert half or past the end.
#[must_use]
pub const fn pair_for_position(response_len: usize, position: usize) -> Option<ReadBack> {
    if response_len == 0 || response_len % 2 != 0 {
        return None;
    }

    let half = response_len / 2;
    if position < half || position >= response_len {
        return None;
    }

    Some(ReadBack {
        insert_index: position - (response_len - half),
        read_index: position,
    })
}

/// The outbound payload of a bulk insert plus its read-back pairing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchRequest {
    /// Operations in wire order.
    #[serde(rename = "records")]
    pub operations: Vec<BatchOperation>,
    /// Insert to read-back pairing; empty when tokens were not requested.
    #[serde(skip)]
    pub read_backs: Vec<ReadBack>,
}

impl BatchRequest {
    /// Number of operations, and therefore the expected response length.
    #[must_use]
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Whether the batch holds no operations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }
}

/// Builds the batch for an insert of already validated records.
#[must_use]
pub fn build_insert_batch(records: &[Record], options: InsertOptions) -> BatchRequest {
    let capacity = if options.tokens {
        records.len() * 2
    } else {
        records.len()
    };

    let mut operations = Vec::with_capacity(capacity);
    operations.extend(records.iter().map(BatchOperation::insert));

    let read_backs: Vec<ReadBack> = if options.tokens {
        read_back_pairs(records.len()).collect()
    } else {
        Vec::new()
    };

    for pair in &read_backs {
        operations.push(BatchOperation::read_back(&records[pair.insert_index], *pair));
    }

    BatchRequest {
        operations,
        read_backs,
    }
}
