//! SObject write targets and single-record results.

use serde::{Deserialize, Serialize};
use sfkit_records::{AggregateFailure, Operation, RecordError, RecordFailure, ID_FIELD};

/// A write operation together with the field that routes each record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Write<'a> {
    Insert,
    /// Routed by `Id`.
    Update,
    /// Routed by the named external-id field; its value travels in the URL.
    Upsert { external_id_field: &'a str },
    /// Routed by `Id`.
    Delete,
}

impl<'a> Write<'a> {
    pub fn operation(&self) -> Operation {
        match self {
            Write::Insert => Operation::Insert,
            Write::Update => Operation::Update,
            Write::Upsert { .. } => Operation::Upsert,
            Write::Delete => Operation::Delete,
        }
    }

    /// Field every record must carry for this write, if any.
    pub fn key_field(&self) -> Option<&'a str> {
        match self {
            Write::Insert => None,
            Write::Update | Write::Delete => Some(ID_FIELD),
            Write::Upsert { external_id_field } => Some(external_id_field),
        }
    }
}

/// Result of a create operation.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CreateResult {
    pub id: String,
    pub success: bool,
    #[serde(default)]
    pub errors: Vec<RecordError>,
}

/// Result of an upsert operation.
///
/// A `204 No Content` answer (match updated, older API versions) carries no
/// body; it is reported as a successful update without an id.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct UpsertResult {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default = "yes")]
    pub success: bool,
    #[serde(default)]
    pub created: bool,
    #[serde(default)]
    pub errors: Vec<RecordError>,
}

fn yes() -> bool {
    true
}

impl UpsertResult {
    pub(crate) fn updated_without_body() -> Self {
        Self {
            id: None,
            success: true,
            created: false,
            errors: Vec::new(),
        }
    }
}

/// A single record answered with `success: false`.
pub(crate) fn rejected(id: Option<String>, errors: Vec<RecordError>) -> AggregateFailure {
    AggregateFailure {
        total: 1,
        failures: vec![RecordFailure {
            index: 0,
            id,
            errors,
        }],
        batch_errors: Vec::new(),
    }
}
