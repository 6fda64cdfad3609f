//! Pre-flight validation.
//!
//! Caller input arrives as any `Serialize` value. It is classified exactly
//! once into a [`RecordShape`]; everything downstream works on [`Record`]s
//! and never re-inspects the original type.

use serde::Serialize;
use serde_json::Value;
use std::num::NonZeroUsize;

use crate::error::ValidationError;
use crate::partition::partition;
use crate::record::{FieldAccess, Record};
use crate::{BULK_BATCH_SIZE_MAX, COLLECTION_BATCH_SIZE_MAX, COMPOSITE_BATCH_SIZE_MAX};

/// Which API a batch is bound for. Determines the batch size ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiFamily {
    Collections,
    Composite,
    Bulk,
}

impl ApiFamily {
    pub const fn max_batch_size(self) -> usize {
        match self {
            ApiFamily::Collections => COLLECTION_BATCH_SIZE_MAX,
            ApiFamily::Composite => COMPOSITE_BATCH_SIZE_MAX,
            ApiFamily::Bulk => BULK_BATCH_SIZE_MAX,
        }
    }
}

/// The closed set of accepted input shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordShape {
    Single(Record),
    Collection(Vec<Record>),
}

/// Classify a JSON value as one record or a collection of records.
pub fn classify(value: Value) -> Result<RecordShape, ValidationError> {
    match value {
        Value::Object(map) => Ok(RecordShape::Single(map.into())),
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(index, item)| match item {
                Value::Object(map) => Ok(Record::from(map)),
                other => Err(ValidationError::NotHomogeneous {
                    index,
                    found: kind_name(&other),
                }),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(RecordShape::Collection),
        other => Err(ValidationError::NotACollection {
            found: kind_name(&other),
        }),
    }
}

fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a collection",
        Value::Object(_) => "a record",
    }
}

/// Records that passed validation, with the batch size they will be split by.
#[derive(Debug, Clone)]
pub struct RecordSet {
    records: Vec<Record>,
    batch_size: NonZeroUsize,
}

impl RecordSet {
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn batch_size(&self) -> NonZeroUsize {
        self.batch_size
    }

    /// Contiguous batches in input order.
    pub fn batches(&self) -> Vec<&[Record]> {
        partition(&self.records, self.batch_size)
    }
}

/// The validation gate.
///
/// Checks run in a fixed order and stop at the first failure:
/// authentication, object name, input shape, batch size, required field.
#[derive(Debug, Clone, Copy)]
pub struct Preflight<'a> {
    authenticated: bool,
    object: Option<&'a str>,
    required_field: Option<&'a str>,
}

impl<'a> Preflight<'a> {
    pub fn new(authenticated: bool) -> Self {
        Self {
            authenticated,
            object: None,
            required_field: None,
        }
    }

    /// Require a non-empty sObject name.
    pub fn object(mut self, name: &'a str) -> Self {
        self.object = Some(name);
        self
    }

    /// Require `field` to be present and non-empty on every record.
    pub fn require_field(mut self, field: &'a str) -> Self {
        self.required_field = Some(field);
        self
    }

    /// Validate input expected to be exactly one record.
    pub fn single<T: Serialize + ?Sized>(&self, input: &T) -> Result<Record, ValidationError> {
        self.check_context()?;
        let record = match classify(to_value(input)?)? {
            RecordShape::Single(record) => record,
            RecordShape::Collection(_) => {
                return Err(ValidationError::NotARecord {
                    found: "a collection",
                })
            }
        };
        self.check_required(std::slice::from_ref(&record))?;
        Ok(record)
    }

    /// Validate input expected to be a collection bound for `family`.
    pub fn collection<T: Serialize + ?Sized>(
        &self,
        input: &T,
        batch_size: usize,
        family: ApiFamily,
    ) -> Result<RecordSet, ValidationError> {
        self.check_context()?;
        let records = match classify(to_value(input)?)? {
            RecordShape::Collection(records) => records,
            RecordShape::Single(_) => {
                return Err(ValidationError::NotACollection { found: "a record" })
            }
        };

        let max = family.max_batch_size();
        let batch_size = NonZeroUsize::new(batch_size)
            .filter(|size| size.get() <= max)
            .ok_or(ValidationError::BatchSizeOutOfRange { batch_size, max })?;

        self.check_required(&records)?;
        Ok(RecordSet {
            records,
            batch_size,
        })
    }

    /// Authentication and object name only, for calls without a record payload.
    pub fn check_context(&self) -> Result<(), ValidationError> {
        if !self.authenticated {
            return Err(ValidationError::MissingAuthentication);
        }
        if self.object.is_some_and(|name| name.trim().is_empty()) {
            return Err(ValidationError::InvalidObjectName);
        }
        Ok(())
    }

    fn check_required(&self, records: &[Record]) -> Result<(), ValidationError> {
        let Some(field) = self.required_field else {
            return Ok(());
        };

        let indices: Vec<usize> = records
            .iter()
            .enumerate()
            .filter(|(_, record)| record.field(field).map_or(true, |v| v.is_empty()))
            .map(|(index, _)| index)
            .collect();

        if indices.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::MissingField {
                field: field.to_string(),
                indices,
            })
        }
    }
}

fn to_value<T: Serialize + ?Sized>(input: &T) -> Result<Value, ValidationError> {
    serde_json::to_value(input).map_err(|e| ValidationError::Unserializable(e.to_string()))
}
