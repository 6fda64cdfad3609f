//! Per-record outcomes and their aggregation across batches.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Result for one record of a collections or composite call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordOutcome {
    #[serde(default)]
    pub id: Option<String>,
    pub success: bool,
    #[serde(default)]
    pub errors: Vec<RecordError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<bool>,
}

impl RecordOutcome {
    pub fn succeeded(id: Option<String>) -> Self {
        Self {
            id,
            success: true,
            errors: Vec::new(),
            created: None,
        }
    }

    pub fn failed(id: Option<String>, errors: Vec<RecordError>) -> Self {
        Self {
            id,
            success: false,
            errors,
            created: None,
        }
    }
}

/// One error attached to a record.
///
/// Collections responses call the code `statusCode`; composite
/// sub-responses call it `errorCode`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordError {
    #[serde(alias = "errorCode", default)]
    pub status_code: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub fields: Vec<String>,
}

impl RecordError {
    pub fn new(status_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status_code: status_code.into(),
            message: message.into(),
            fields: Vec::new(),
        }
    }
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.status_code, self.message)?;
        if !self.fields.is_empty() {
            write!(f, " [{}]", self.fields.join(", "))?;
        }
        Ok(())
    }
}

/// A failing record, located by its index in the caller's input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFailure {
    pub index: usize,
    pub id: Option<String>,
    pub errors: Vec<RecordError>,
}

impl fmt::Display for RecordFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "record {}", self.index)?;
        if let Some(id) = &self.id {
            write!(f, " ({id})")?;
        }
        f.write_str(": ")?;
        let messages: Vec<String> = self.errors.iter().map(ToString::to_string).collect();
        f.write_str(&messages.join("; "))
    }
}

/// A whole batch whose request failed before producing per-record outcomes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchError {
    pub batch: usize,
    /// Index of the batch's first record in the caller's input.
    pub first_index: usize,
    pub len: usize,
    pub message: String,
}

impl fmt::Display for BatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "batch {} (records {}..{}): {}",
            self.batch,
            self.first_index,
            self.first_index + self.len,
            self.message
        )
    }
}

/// Every failing record of a multi-record call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateFailure {
    pub total: usize,
    pub failures: Vec<RecordFailure>,
    pub batch_errors: Vec<BatchError>,
}

impl AggregateFailure {
    pub fn failed(&self) -> usize {
        self.failures.len() + self.batch_errors.iter().map(|b| b.len).sum::<usize>()
    }

    pub fn succeeded(&self) -> usize {
        self.total.saturating_sub(self.failed())
    }

    /// Ids of failing records that have one.
    pub fn failed_ids(&self) -> Vec<&str> {
        self.failures.iter().filter_map(|f| f.id.as_deref()).collect()
    }
}

impl fmt::Display for AggregateFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} of {} records failed", self.failed(), self.total)?;
        for failure in &self.failures {
            write!(f, "\n  {failure}")?;
        }
        for batch in &self.batch_errors {
            write!(f, "\n  {batch}")?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateFailure {}

/// Folds outcomes from successive batches into one result.
#[derive(Debug, Default)]
pub struct Aggregator {
    ids: Vec<Option<String>>,
    batches: usize,
    failures: Vec<RecordFailure>,
    batch_errors: Vec<BatchError>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records accounted for so far.
    pub fn total(&self) -> usize {
        self.ids.len()
    }

    /// Record the outcomes of a batch of `expected` records.
    ///
    /// Outcomes are matched to records by position. Records the server did
    /// not answer for count as failures.
    pub fn push_batch(&mut self, outcomes: Vec<RecordOutcome>, expected: usize) {
        let first_index = self.ids.len();
        let mut answered = 0;

        for outcome in outcomes.into_iter().take(expected) {
            let index = self.ids.len();
            if !outcome.success {
                self.failures.push(RecordFailure {
                    index,
                    id: outcome.id.clone(),
                    errors: outcome.errors,
                });
            }
            self.ids.push(outcome.id);
            answered += 1;
        }

        for _ in answered..expected {
            self.failures.push(RecordFailure {
                index: self.ids.len(),
                id: None,
                errors: vec![RecordError::new("NO_OUTCOME", "no result returned for record")],
            });
            self.ids.push(None);
        }

        debug!(
            batch = self.batches,
            first_index,
            records = expected,
            failures = self.failures.len(),
            "batch outcomes recorded"
        );
        self.batches += 1;
    }

    /// Record a batch of `len` records whose request failed outright.
    pub fn fail_batch(&mut self, len: usize, error: impl fmt::Display) {
        let first_index = self.ids.len();
        self.batch_errors.push(BatchError {
            batch: self.batches,
            first_index,
            len,
            message: error.to_string(),
        });
        self.ids.extend(std::iter::repeat_n(None, len));
        self.batches += 1;
    }

    /// Record ids in input order when every record succeeded.
    pub fn finish(self) -> Result<Vec<Option<String>>, AggregateFailure> {
        if self.failures.is_empty() && self.batch_errors.is_empty() {
            return Ok(self.ids);
        }
        Err(AggregateFailure {
            total: self.ids.len(),
            failures: self.failures,
            batch_errors: self.batch_errors,
        })
    }
}
