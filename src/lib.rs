//! # sfkit
//!
//! Salesforce data API client built around batching and bulk job
//! lifecycles.
//!
//! A [`Salesforce`] handle owns one immutable [`Credential`] and exposes
//! every data operation. Each call runs the same pipeline:
//!
//! 1. **Validate** the input locally: authentication, object name, input
//!    shape, batch size and routing fields. Nothing is sent on failure.
//! 2. **Partition** collections into contiguous batches.
//! 3. **Submit** each batch: one sObject Collections call, one composite
//!    sub-request (up to 25 per composite call), or one Bulk API 2.0 job
//!    (create, upload CSV, close).
//! 4. **Wait** on bulk jobs, one poll loop per job, all concurrently.
//! 5. **Aggregate** per-record and per-batch failures into one error.
//!
//! ## Crates
//!
//! - **sfkit-client** - HTTP transport, retry, the [`Credential`] type
//! - **sfkit-auth** - OAuth password and client-credentials flows
//! - **sfkit-records** - record model, validation, partitioning, codecs,
//!   outcome aggregation
//! - **sfkit-rest** - CRUD, SOQL query, collections, composite
//! - **sfkit-bulk** - Bulk API 2.0 ingest and query jobs
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sfkit::{AuthConfig, Salesforce};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> sfkit::Result<()> {
//!     let sf = Salesforce::init(&AuthConfig::from_env()?).await?;
//!
//!     let accounts = json!([{"Name": "Acme"}, {"Name": "Globex"}]);
//!     let jobs = sf.insert_bulk("Account", &accounts, 10_000, true).await?;
//!     println!("loaded by {jobs:?}");
//!
//!     let rows = sf.query_bulk("SELECT Id, Name FROM Account").await?;
//!     println!("{} rows", rows.len() - 1);
//!     Ok(())
//! }
//! ```

mod error;

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

pub use error::{Error, ErrorKind, Result};

pub use sfkit_client::{ClientConfig, Credential, RequestMethod, Response, SalesforceClient};
pub use sfkit_records::{
    AggregateFailure, ApiFamily, Operation, Record, RecordFailure, ValidationError, ID_FIELD,
};

pub use sfkit_client as client;
pub use sfkit_records as records;

#[cfg(feature = "auth")]
pub use sfkit_auth as auth;
#[cfg(feature = "auth")]
pub use sfkit_auth::AuthConfig;

#[cfg(feature = "rest")]
pub use sfkit_rest as rest;
#[cfg(feature = "rest")]
pub use sfkit_rest::{UpsertResult, Write};

#[cfg(feature = "bulk")]
pub use sfkit_bulk as bulk;
#[cfg(feature = "bulk")]
pub use sfkit_bulk::{JobInfo, JobState, DEFAULT_POLL_INTERVAL};

use sfkit_records::Preflight;

#[cfg(feature = "rest")]
use sfkit_rest::SalesforceRestClient;

#[cfg(feature = "bulk")]
use sfkit_bulk::{BulkApiClient, CreateIngestJobRequest, JobKind};

/// Poll interval used when none is configured.
#[cfg(not(feature = "bulk"))]
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Handle to one authenticated Salesforce org.
///
/// Cloning is cheap; clones share the credential and connection pool.
#[derive(Debug, Clone)]
pub struct Salesforce {
    client: SalesforceClient,
    poll_interval: Duration,
}

impl Salesforce {
    /// Authenticate with `config` and return a ready handle.
    #[cfg(feature = "auth")]
    #[instrument(skip(config))]
    pub async fn init(config: &AuthConfig) -> Result<Self> {
        let credential = sfkit_auth::authenticate(config).await?;
        let sf = Self::from_credential(credential)?;
        Ok(match config.api_version() {
            Some(version) => sf.with_api_version(version),
            None => sf,
        })
    }

    /// Wrap an existing credential.
    ///
    /// An empty or malformed credential is accepted here; every operation
    /// then fails validation without sending anything.
    pub fn from_credential(credential: impl Into<Arc<Credential>>) -> Result<Self> {
        Self::with_config(credential, ClientConfig::default())
    }

    pub fn with_config(
        credential: impl Into<Arc<Credential>>,
        config: ClientConfig,
    ) -> Result<Self> {
        Ok(Self {
            client: SalesforceClient::with_config(credential, config)?,
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    /// Pause between bulk job status checks.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.client = self.client.with_api_version(version);
        self
    }

    pub fn credential(&self) -> &Credential {
        self.client.credential()
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn client(&self) -> &SalesforceClient {
        &self.client
    }

    fn preflight<'a>(&self) -> Preflight<'a> {
        Preflight::new(self.credential().is_valid())
    }

    /// Send an authenticated request to a path relative to the instance
    /// (or an absolute URL) and return the raw response.
    #[instrument(skip(self, body))]
    pub async fn do_request(
        &self,
        method: RequestMethod,
        uri: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<Response> {
        self.preflight().check_context()?;
        let mut request = self.client.request(method, &self.client.url(uri));
        if let Some(body) = body {
            request = request.json_value(body.clone());
        }
        self.client.execute(request).await.map_err(Into::into)
    }
}

// =============================================================================
// REST: query, single records, collections, composite
// =============================================================================

#[cfg(feature = "rest")]
impl Salesforce {
    fn rest(&self) -> SalesforceRestClient {
        SalesforceRestClient::from_client(self.client.clone())
    }

    /// Run a SOQL query and deserialize every record, across all pages.
    pub async fn query<T: DeserializeOwned>(&self, soql: &str) -> Result<Vec<T>> {
        self.preflight().check_context()?;
        self.rest().query(soql).await.map_err(Into::into)
    }

    /// Create one record and return its id.
    pub async fn insert_one<T: Serialize + ?Sized>(
        &self,
        object: &str,
        record: &T,
    ) -> Result<String> {
        let record = self.single(object, Write::Insert, record)?;
        self.rest().create(object, &record).await.map_err(Into::into)
    }

    /// Update one record, located by its `Id` field.
    pub async fn update_one<T: Serialize + ?Sized>(
        &self,
        object: &str,
        record: &T,
    ) -> Result<String> {
        let record = self.single(object, Write::Update, record)?;
        self.rest().update(object, &record).await.map_err(Into::into)
    }

    /// Insert or update one record by the value of `external_id_field`.
    pub async fn upsert_one<T: Serialize + ?Sized>(
        &self,
        object: &str,
        external_id_field: &str,
        record: &T,
    ) -> Result<UpsertResult> {
        let record = self.single(object, Write::Upsert { external_id_field }, record)?;
        self.rest()
            .upsert(object, external_id_field, &record)
            .await
            .map_err(Into::into)
    }

    /// Delete one record, located by its `Id` field.
    pub async fn delete_one<T: Serialize + ?Sized>(
        &self,
        object: &str,
        record: &T,
    ) -> Result<String> {
        let record = self.single(object, Write::Delete, record)?;
        self.rest().delete(object, &record).await.map_err(Into::into)
    }

    pub async fn insert_collection<T: Serialize + ?Sized>(
        &self,
        object: &str,
        records: &T,
        batch_size: usize,
    ) -> Result<Vec<Option<String>>> {
        self.collection(object, Write::Insert, records, batch_size).await
    }

    pub async fn update_collection<T: Serialize + ?Sized>(
        &self,
        object: &str,
        records: &T,
        batch_size: usize,
    ) -> Result<Vec<Option<String>>> {
        self.collection(object, Write::Update, records, batch_size).await
    }

    pub async fn upsert_collection<T: Serialize + ?Sized>(
        &self,
        object: &str,
        external_id_field: &str,
        records: &T,
        batch_size: usize,
    ) -> Result<Vec<Option<String>>> {
        self.collection(object, Write::Upsert { external_id_field }, records, batch_size)
            .await
    }

    pub async fn delete_collection<T: Serialize + ?Sized>(
        &self,
        object: &str,
        records: &T,
        batch_size: usize,
    ) -> Result<Vec<Option<String>>> {
        self.collection(object, Write::Delete, records, batch_size).await
    }

    /// Insert through the composite API.
    ///
    /// Each batch is one collections sub-request; sub-requests are sent 25
    /// to a composite call. `all_or_none` rolls back a whole call when any
    /// record in it fails.
    pub async fn insert_composite<T: Serialize + ?Sized>(
        &self,
        object: &str,
        records: &T,
        batch_size: usize,
        all_or_none: bool,
    ) -> Result<Vec<Option<String>>> {
        self.composite(object, Write::Insert, records, batch_size, all_or_none)
            .await
    }

    pub async fn update_composite<T: Serialize + ?Sized>(
        &self,
        object: &str,
        records: &T,
        batch_size: usize,
        all_or_none: bool,
    ) -> Result<Vec<Option<String>>> {
        self.composite(object, Write::Update, records, batch_size, all_or_none)
            .await
    }

    pub async fn upsert_composite<T: Serialize + ?Sized>(
        &self,
        object: &str,
        external_id_field: &str,
        records: &T,
        batch_size: usize,
        all_or_none: bool,
    ) -> Result<Vec<Option<String>>> {
        self.composite(
            object,
            Write::Upsert { external_id_field },
            records,
            batch_size,
            all_or_none,
        )
        .await
    }

    pub async fn delete_composite<T: Serialize + ?Sized>(
        &self,
        object: &str,
        records: &T,
        batch_size: usize,
        all_or_none: bool,
    ) -> Result<Vec<Option<String>>> {
        self.composite(object, Write::Delete, records, batch_size, all_or_none)
            .await
    }

    fn single<T: Serialize + ?Sized>(
        &self,
        object: &str,
        write: Write<'_>,
        record: &T,
    ) -> Result<Record> {
        let mut gate = self.preflight().object(object);
        if let Some(field) = write.key_field() {
            gate = gate.require_field(field);
        }
        gate.single(record).map_err(Into::into)
    }

    #[instrument(skip(self, records), fields(operation = %write.operation()))]
    async fn collection<T: Serialize + ?Sized>(
        &self,
        object: &str,
        write: Write<'_>,
        records: &T,
        batch_size: usize,
    ) -> Result<Vec<Option<String>>> {
        let set = validate(
            self.preflight(),
            object,
            write.key_field(),
            records,
            batch_size,
            ApiFamily::Collections,
        )?;
        self.rest()
            .collections(object, write, &set)
            .await
            .map_err(Into::into)
    }

    #[instrument(skip(self, records), fields(operation = %write.operation()))]
    async fn composite<T: Serialize + ?Sized>(
        &self,
        object: &str,
        write: Write<'_>,
        records: &T,
        batch_size: usize,
        all_or_none: bool,
    ) -> Result<Vec<Option<String>>> {
        let set = validate(
            self.preflight(),
            object,
            write.key_field(),
            records,
            batch_size,
            ApiFamily::Composite,
        )?;
        self.rest()
            .composite(object, write, &set, all_or_none)
            .await
            .map_err(Into::into)
    }
}

// =============================================================================
// Bulk API 2.0
// =============================================================================

#[cfg(feature = "bulk")]
impl Salesforce {
    fn bulk(&self) -> BulkApiClient {
        BulkApiClient::from_client(self.client.clone())
    }

    /// Insert through one bulk job per batch.
    ///
    /// With `wait_for_results`, returns only after every job has finished;
    /// a job that fails is reported with its failed-records report. Job ids
    /// are returned in batch order.
    pub async fn insert_bulk<T: Serialize + ?Sized>(
        &self,
        object: &str,
        records: &T,
        batch_size: usize,
        wait_for_results: bool,
    ) -> Result<Vec<String>> {
        let request = CreateIngestJobRequest::new(object, Operation::Insert);
        self.ingest(request, None, records, batch_size, wait_for_results)
            .await
    }

    pub async fn update_bulk<T: Serialize + ?Sized>(
        &self,
        object: &str,
        records: &T,
        batch_size: usize,
        wait_for_results: bool,
    ) -> Result<Vec<String>> {
        let request = CreateIngestJobRequest::new(object, Operation::Update);
        self.ingest(request, Some(ID_FIELD), records, batch_size, wait_for_results)
            .await
    }

    pub async fn upsert_bulk<T: Serialize + ?Sized>(
        &self,
        object: &str,
        external_id_field: &str,
        records: &T,
        batch_size: usize,
        wait_for_results: bool,
    ) -> Result<Vec<String>> {
        let request = CreateIngestJobRequest::new(object, Operation::Upsert)
            .with_external_id_field(external_id_field);
        self.ingest(
            request,
            Some(external_id_field),
            records,
            batch_size,
            wait_for_results,
        )
        .await
    }

    pub async fn delete_bulk<T: Serialize + ?Sized>(
        &self,
        object: &str,
        records: &T,
        batch_size: usize,
        wait_for_results: bool,
    ) -> Result<Vec<String>> {
        let request = CreateIngestJobRequest::new(object, Operation::Delete);
        self.ingest(request, Some(ID_FIELD), records, batch_size, wait_for_results)
            .await
    }

    /// Run `soql` as a bulk query job and return the whole result table:
    /// one header row, then every data row.
    pub async fn query_bulk(&self, soql: &str) -> Result<Vec<Vec<String>>> {
        self.preflight().check_context()?;
        self.bulk()
            .query(soql, self.poll_interval)
            .await
            .map_err(Into::into)
    }

    /// Current status of an ingest job.
    pub async fn get_job_results(&self, job_id: &str) -> Result<JobInfo> {
        self.preflight().check_context()?;
        self.bulk()
            .get_job(JobKind::Ingest, job_id)
            .await
            .map_err(Into::into)
    }

    /// The failed-results report of an ingest job, as returned (CSV).
    pub async fn get_failed_records(&self, job_id: &str) -> Result<String> {
        self.preflight().check_context()?;
        self.bulk()
            .get_failed_results(job_id)
            .await
            .map_err(Into::into)
    }

    /// The successful-results report of an ingest job, as returned (CSV).
    pub async fn get_successful_records(&self, job_id: &str) -> Result<String> {
        self.preflight().check_context()?;
        self.bulk()
            .get_successful_results(job_id)
            .await
            .map_err(Into::into)
    }

    /// Abort an ingest job, e.g. one left open by a failed upload.
    pub async fn abort_job(&self, job_id: &str) -> Result<JobInfo> {
        self.preflight().check_context()?;
        self.bulk()
            .abort_job(JobKind::Ingest, job_id)
            .await
            .map_err(Into::into)
    }

    #[instrument(skip(self, request, records), fields(object = %request.object, operation = %request.operation))]
    async fn ingest<T: Serialize + ?Sized>(
        &self,
        request: CreateIngestJobRequest,
        key_field: Option<&str>,
        records: &T,
        batch_size: usize,
        wait_for_results: bool,
    ) -> Result<Vec<String>> {
        let set = validate(
            self.preflight(),
            &request.object,
            key_field,
            records,
            batch_size,
            ApiFamily::Bulk,
        )?;
        let wait = wait_for_results.then_some(self.poll_interval);
        self.bulk()
            .ingest(&request, &set, wait)
            .await
            .map_err(Into::into)
    }
}

/// Run the validation gate for a multi-record call.
#[cfg(any(feature = "rest", feature = "bulk"))]
fn validate<'a, T: Serialize + ?Sized>(
    gate: Preflight<'a>,
    object: &'a str,
    key_field: Option<&'a str>,
    records: &T,
    batch_size: usize,
    family: ApiFamily,
) -> Result<sfkit_records::RecordSet> {
    let mut gate = gate.object(object);
    if let Some(field) = key_field {
        gate = gate.require_field(field);
    }
    gate.collection(records, batch_size, family)
        .map_err(Into::into)
}
