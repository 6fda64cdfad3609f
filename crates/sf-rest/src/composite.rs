//! Composite API carrying sObject Collections sub-requests.
//!
//! Each batch of up to 200 records becomes one `/composite/sobjects`
//! sub-request. One composite call holds at most
//! [`COMPOSITE_SUBREQUEST_MAX`] of them, so a record set is sent in as many
//! calls as it needs.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

use sfkit_records::{
    Aggregator, FieldAccess, Record, RecordError, RecordOutcome, RecordSet, ID_FIELD,
};

use crate::client::SalesforceRestClient;
use crate::collections::{check_keys, entries};
use crate::error::Result;
use crate::sobject::Write;

/// Most sub-requests the composite API accepts in one call.
pub const COMPOSITE_SUBREQUEST_MAX: usize = 25;

/// A composite request containing multiple subrequests.
#[derive(Debug, Clone, Serialize)]
pub struct CompositeRequest {
    #[serde(rename = "allOrNone")]
    pub all_or_none: bool,
    #[serde(rename = "compositeRequest")]
    pub subrequests: Vec<CompositeSubrequest>,
}

/// A single subrequest within a composite request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompositeSubrequest {
    pub method: String,
    pub url: String,
    #[serde(rename = "referenceId")]
    pub reference_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompositeResponse {
    #[serde(rename = "compositeResponse")]
    pub responses: Vec<CompositeSubresponse>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompositeSubresponse {
    #[serde(default)]
    pub body: serde_json::Value,
    #[serde(rename = "httpHeaders", default)]
    pub http_headers: serde_json::Value,
    #[serde(rename = "httpStatusCode")]
    pub http_status_code: u16,
    #[serde(rename = "referenceId")]
    pub reference_id: String,
}

impl CompositeSubresponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.http_status_code)
    }

    /// Position encoded in a `ref{n}` reference id.
    fn position(&self) -> Option<usize> {
        self.reference_id.strip_prefix("ref")?.parse().ok()
    }

    /// One outcome per record of `batch`, in order.
    ///
    /// A successful sub-response carries the collections result array. A
    /// failed one applies its errors to every record of the batch.
    fn into_outcomes(self, batch: &[Record]) -> Vec<RecordOutcome> {
        if self.is_success() {
            return match serde_json::from_value::<Vec<RecordOutcome>>(self.body) {
                Ok(outcomes) => outcomes
                    .into_iter()
                    .zip(batch)
                    .map(|(mut outcome, record)| {
                        if outcome.id.is_none() {
                            outcome.id = known_id(record);
                        }
                        outcome
                    })
                    .collect(),
                Err(err) => batch
                    .iter()
                    .map(|record| {
                        RecordOutcome::failed(
                            known_id(record),
                            vec![RecordError::new("INVALID_RESPONSE", err.to_string())],
                        )
                    })
                    .collect(),
            };
        }

        let errors = serde_json::from_value::<Vec<RecordError>>(self.body.clone())
            .ok()
            .filter(|errors| !errors.is_empty())
            .unwrap_or_else(|| {
                vec![RecordError::new(
                    format!("HTTP_{}", self.http_status_code),
                    self.body.to_string(),
                )]
            });
        batch
            .iter()
            .map(|record| RecordOutcome::failed(known_id(record), errors.clone()))
            .collect()
    }
}

fn known_id(record: &Record) -> Option<String> {
    record.field(ID_FIELD).ok().filter(|id| !id.is_empty())
}

impl SalesforceRestClient {
    /// Execute a composite request as given.
    ///
    /// The composite API allows up to 25 subrequests in a single API call.
    #[instrument(skip(self, request), fields(subrequests = request.subrequests.len()))]
    pub async fn send_composite(&self, request: &CompositeRequest) -> Result<CompositeResponse> {
        self.client
            .rest_post("composite", request)
            .await
            .map_err(Into::into)
    }

    /// Build the collections sub-request for `batch`, sent as `ref{reference}`.
    pub fn subrequest(
        &self,
        object: &str,
        write: Write<'_>,
        batch: &[Record],
        all_or_none: bool,
        reference: usize,
    ) -> Result<CompositeSubrequest> {
        check_keys(write, batch)?;

        let base = format!("/services/data/v{}/composite/sobjects", self.api_version());
        let (method, url, body) = match write {
            Write::Insert => ("POST", base, Some(entries(object, write, batch, all_or_none))),
            Write::Update => ("PATCH", base, Some(entries(object, write, batch, all_or_none))),
            Write::Upsert { external_id_field } => (
                "PATCH",
                format!("{base}/{object}/{}", urlencoding::encode(external_id_field)),
                Some(entries(object, write, batch, all_or_none)),
            ),
            Write::Delete => {
                let ids: Vec<String> = batch
                    .iter()
                    .filter_map(|record| record.field(ID_FIELD).ok())
                    .map(|id| urlencoding::encode(&id).into_owned())
                    .collect();
                (
                    "DELETE",
                    format!("{base}?ids={}&allOrNone={all_or_none}", ids.join(",")),
                    None,
                )
            }
        };

        let body = body.map(serde_json::to_value).transpose()?;
        Ok(CompositeSubrequest {
            method: method.to_string(),
            url,
            reference_id: format!("ref{reference}"),
            body,
        })
    }

    /// Send up to [`COMPOSITE_SUBREQUEST_MAX`] batches as one composite call.
    ///
    /// Returns one outcome list per batch, in input order. Sub-responses are
    /// matched to batches by reference id.
    #[instrument(skip(self, batches), fields(subrequests = batches.len()))]
    pub async fn composite_call(
        &self,
        object: &str,
        write: Write<'_>,
        batches: &[&[Record]],
        all_or_none: bool,
    ) -> Result<Vec<Vec<RecordOutcome>>> {
        let subrequests = batches
            .iter()
            .enumerate()
            .map(|(reference, batch)| {
                self.subrequest(object, write, batch, all_or_none, reference)
            })
            .collect::<Result<Vec<_>>>()?;
        let request = CompositeRequest {
            all_or_none,
            subrequests,
        };

        let response = self.send_composite(&request).await?;

        let mut slots: Vec<Option<CompositeSubresponse>> = vec![None; batches.len()];
        for sub in response.responses {
            match sub.position().filter(|&n| n < slots.len()) {
                Some(n) => slots[n] = Some(sub),
                None => {
                    debug!(reference_id = %sub.reference_id, "unmatched composite sub-response")
                }
            }
        }

        let outcomes = slots
            .into_iter()
            .zip(batches)
            .map(|(slot, batch)| match slot {
                Some(sub) => sub.into_outcomes(batch),
                None => batch
                    .iter()
                    .map(|record| {
                        RecordOutcome::failed(
                            known_id(record),
                            vec![RecordError::new("NO_OUTCOME", "no sub-response for batch")],
                        )
                    })
                    .collect(),
            })
            .collect();
        Ok(outcomes)
    }

    /// Run every batch of `records` through the composite endpoint.
    ///
    /// `all_or_none` applies within each composite call. Calls are
    /// independent of each other, and a failed call does not stop the ones
    /// after it. Failures across all calls are reported together.
    #[instrument(skip(self, records), fields(records = records.len(), batch_size = records.batch_size().get()))]
    pub async fn composite(
        &self,
        object: &str,
        write: Write<'_>,
        records: &RecordSet,
        all_or_none: bool,
    ) -> Result<Vec<Option<String>>> {
        check_keys(write, records.records())?;

        let batches = records.batches();
        let mut aggregator = Aggregator::new();
        for call in batches.chunks(COMPOSITE_SUBREQUEST_MAX) {
            match self.composite_call(object, write, call, all_or_none).await {
                Ok(results) => {
                    for (outcomes, batch) in results.into_iter().zip(call) {
                        aggregator.push_batch(outcomes, batch.len());
                    }
                }
                Err(err) => {
                    warn!(
                        object,
                        first_index = aggregator.total(),
                        error = %err,
                        "composite call failed"
                    );
                    for batch in call {
                        aggregator.fail_batch(batch.len(), &err);
                    }
                }
            }
        }
        aggregator.finish().map_err(Into::into)
    }
}
