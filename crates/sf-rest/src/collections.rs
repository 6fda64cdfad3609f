//! SObject Collections: up to 200 records per call, `allOrNone=false`.

use serde::Serialize;
use tracing::{instrument, warn};

use sfkit_records::document;
use sfkit_records::{
    Aggregator, FieldAccess, Record, RecordOutcome, RecordSet, ValidationError, ID_FIELD,
};

use crate::client::SalesforceRestClient;
use crate::error::Result;
use crate::sobject::Write;

/// Request body for insert, update and upsert collections calls.
#[derive(Debug, Clone, Serialize)]
pub struct CollectionRequest {
    #[serde(rename = "allOrNone")]
    pub all_or_none: bool,
    pub records: Vec<serde_json::Value>,
}

impl SalesforceRestClient {
    /// Send one batch and return one outcome per record, in order.
    #[instrument(skip(self, batch), fields(records = batch.len()))]
    pub async fn collection_batch(
        &self,
        object: &str,
        write: Write<'_>,
        batch: &[Record],
    ) -> Result<Vec<RecordOutcome>> {
        check_keys(write, batch)?;

        let base = self.client.rest_url("composite/sobjects");
        let request = match write {
            Write::Delete => {
                let ids: Vec<String> = batch
                    .iter()
                    .filter_map(|record| record.field(ID_FIELD).ok())
                    .collect();
                self.client
                    .delete(&base)
                    .query("ids", ids.join(","))
                    .query("allOrNone", "false")
            }
            Write::Insert => self
                .client
                .post(&base)
                .json(&entries(object, write, batch, false))?,
            Write::Update => self
                .client
                .patch(&base)
                .json(&entries(object, write, batch, false))?,
            Write::Upsert { external_id_field } => {
                let url = format!(
                    "{base}/{object}/{}",
                    urlencoding::encode(external_id_field)
                );
                self.client.patch(&url).json(&entries(object, write, batch, false))?
            }
        };

        let outcomes = self.client.execute(request).await?.json().await?;
        Ok(outcomes)
    }

    /// Run every batch of `records` through sObject Collections.
    ///
    /// A batch whose request fails is recorded and the remaining batches
    /// still run. Returns record ids in input order when every record
    /// succeeded; otherwise an aggregate failure naming each failed record.
    #[instrument(skip(self, records), fields(records = records.len(), batch_size = records.batch_size().get()))]
    pub async fn collections(
        &self,
        object: &str,
        write: Write<'_>,
        records: &RecordSet,
    ) -> Result<Vec<Option<String>>> {
        check_keys(write, records.records())?;

        let mut aggregator = Aggregator::new();
        for batch in records.batches() {
            match self.collection_batch(object, write, batch).await {
                Ok(outcomes) => aggregator.push_batch(outcomes, batch.len()),
                Err(err) => {
                    warn!(
                        object,
                        first_index = aggregator.total(),
                        error = %err,
                        "collections batch failed"
                    );
                    aggregator.fail_batch(batch.len(), err);
                }
            }
        }
        aggregator.finish().map_err(Into::into)
    }
}

pub(crate) fn entries(
    object: &str,
    write: Write<'_>,
    batch: &[Record],
    all_or_none: bool,
) -> CollectionRequest {
    CollectionRequest {
        all_or_none,
        records: batch
            .iter()
            .map(|record| document::collection_entry(record, object, write.operation()))
            .collect(),
    }
}

/// Every record carries a non-empty routing key for `write`.
pub(crate) fn check_keys(write: Write<'_>, records: &[Record]) -> Result<()> {
    let Some(field) = write.key_field() else {
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
        }
        .into())
    }
}
