//! Bulk API 2.0 client.
//!
//! Thin, one-call-per-method access to the job resources. Submission,
//! polling and result collection build on these in their own modules.

use std::sync::Arc;
use tracing::{debug, info, instrument};

use sfkit_client::{ClientConfig, Credential, SalesforceClient};
use sfkit_records::tabular;

use crate::error::{Error, ErrorKind, Result};
use crate::types::*;

/// Salesforce Bulk API 2.0 client.
///
/// # Example
///
/// ```rust,ignore
/// use sfkit_bulk::{BulkApiClient, CreateIngestJobRequest};
/// use sfkit_records::Operation;
///
/// let client = BulkApiClient::new(credential)?;
///
/// let job = client
///     .create_ingest_job(&CreateIngestJobRequest::new("Account", Operation::Insert))
///     .await?;
/// client.upload_job_data(&job.id, "Name\nAcme\n".to_string()).await?;
/// client.close_job(&job.id).await?;
/// ```
#[derive(Debug, Clone)]
pub struct BulkApiClient {
    client: SalesforceClient,
}

impl BulkApiClient {
    pub fn new(credential: impl Into<Arc<Credential>>) -> Result<Self> {
        Ok(Self {
            client: SalesforceClient::new(credential)?,
        })
    }

    pub fn with_config(
        credential: impl Into<Arc<Credential>>,
        config: ClientConfig,
    ) -> Result<Self> {
        Ok(Self {
            client: SalesforceClient::with_config(credential, config)?,
        })
    }

    /// Share an existing client (and its credential).
    pub fn from_client(client: SalesforceClient) -> Self {
        Self { client }
    }

    pub fn inner(&self) -> &SalesforceClient {
        &self.client
    }

    pub fn instance_url(&self) -> &str {
        self.client.instance_url()
    }

    pub fn api_version(&self) -> &str {
        self.client.api_version()
    }

    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.client = self.client.with_api_version(version);
        self
    }

    fn job_url(&self, kind: JobKind, job_id: &str) -> String {
        format!("{}/{}", self.client.bulk_url(kind.path()), job_id)
    }

    // =========================================================================
    // Ingest Jobs
    // =========================================================================

    /// Create an ingest job. A job that does not come back `Open` is rejected.
    #[instrument(skip(self, request), fields(object = %request.object, operation = %request.operation))]
    pub async fn create_ingest_job(&self, request: &CreateIngestJobRequest) -> Result<JobInfo> {
        let url = self.client.bulk_url(JobKind::Ingest.path());
        let job: JobInfo = self.client.post_json(&url, request).await?;

        if job.state != JobState::Open {
            return Err(Error::new(ErrorKind::JobRejected {
                job_id: job.id,
                state: job.state,
            }));
        }

        info!(job_id = %job.id, "ingest job created");
        Ok(job)
    }

    /// Upload CSV data to an open ingest job.
    #[instrument(skip(self, csv_data), fields(bytes = csv_data.len()))]
    pub async fn upload_job_data(&self, job_id: &str, csv_data: String) -> Result<()> {
        let url = format!("{}/batches", self.job_url(JobKind::Ingest, job_id));
        let request = self.client.put(&url).csv(csv_data);
        self.client.execute(request).await?;
        Ok(())
    }

    /// Mark an ingest job `UploadComplete` so the server starts processing it.
    #[instrument(skip(self))]
    pub async fn close_job(&self, job_id: &str) -> Result<JobInfo> {
        let job = self
            .set_state(JobKind::Ingest, job_id, UpdateJobStateRequest::upload_complete())
            .await?;
        info!(job_id, state = %job.state, "ingest job closed");
        Ok(job)
    }

    /// Abort a job of either kind.
    #[instrument(skip(self))]
    pub async fn abort_job(&self, kind: JobKind, job_id: &str) -> Result<JobInfo> {
        self.set_state(kind, job_id, UpdateJobStateRequest::aborted())
            .await
    }

    async fn set_state(
        &self,
        kind: JobKind,
        job_id: &str,
        request: UpdateJobStateRequest,
    ) -> Result<JobInfo> {
        let response = self
            .client
            .patch_json(&self.job_url(kind, job_id), &request)
            .await?;
        Ok(response.json().await?)
    }

    /// Current status of a job.
    #[instrument(skip(self))]
    pub async fn get_job(&self, kind: JobKind, job_id: &str) -> Result<JobInfo> {
        let job: JobInfo = self.client.get_json(&self.job_url(kind, job_id)).await?;
        Ok(job)
    }

    /// Successful records report of an ingest job (CSV).
    #[instrument(skip(self))]
    pub async fn get_successful_results(&self, job_id: &str) -> Result<String> {
        self.get_report(job_id, "successfulResults").await
    }

    /// Failed records report of an ingest job, returned verbatim.
    #[instrument(skip(self))]
    pub async fn get_failed_results(&self, job_id: &str) -> Result<String> {
        self.get_report(job_id, "failedResults").await
    }

    async fn get_report(&self, job_id: &str, report: &str) -> Result<String> {
        let url = format!("{}/{}", self.job_url(JobKind::Ingest, job_id), report);
        let request = self.client.get(&url).accept("text/csv");
        let response = self.client.execute(request).await?;
        Ok(response.text().await?)
    }

    // =========================================================================
    // Query Jobs
    // =========================================================================

    #[instrument(skip(self, request), fields(operation = %request.operation))]
    pub async fn create_query_job(&self, request: &CreateQueryJobRequest) -> Result<JobInfo> {
        let url = self.client.bulk_url(JobKind::Query.path());
        let job: JobInfo = self.client.post_json(&url, request).await?;
        info!(job_id = %job.id, state = %job.state, "query job created");
        Ok(job)
    }

    /// Fetch one page of query results. `None` (or empty) locator reads the first page.
    #[instrument(skip(self))]
    pub async fn get_query_results(
        &self,
        job_id: &str,
        locator: Option<&str>,
    ) -> Result<QueryResultsPage> {
        let mut url = format!("{}/results", self.job_url(JobKind::Query, job_id));
        if let Some(loc) = locator.filter(|l| !l.is_empty()) {
            url = format!("{}?locator={}", url, urlencoding::encode(loc));
        }

        let request = self.client.get(&url).accept("text/csv");
        let response = self.client.execute(request).await?;

        let next_locator = response.sforce_locator().map(str::to_string);
        let number_of_records = response.sforce_number_of_records();
        let body = response.text().await?;
        let rows = tabular::decode(&body)?;

        debug!(
            rows = rows.len(),
            number_of_records,
            has_next = next_locator.is_some(),
            "query results page"
        );

        Ok(QueryResultsPage {
            rows,
            locator: next_locator,
            number_of_records,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sfkit_records::Operation;
    use wiremock::matchers::{body_json, body_string, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> BulkApiClient {
        BulkApiClient::new(Credential::new(server.uri(), "test-token")).unwrap()
    }

    #[test]
    fn test_client_creation() {
        let client =
            BulkApiClient::new(Credential::new("https://test.salesforce.com", "token123")).unwrap();
        assert_eq!(client.instance_url(), "https://test.salesforce.com");
        assert_eq!(client.api_version(), "62.0");
        assert_eq!(
            client.job_url(JobKind::Query, "750xx"),
            "https://test.salesforce.com/services/data/v62.0/jobs/query/750xx"
        );
    }

    #[tokio::test]
    async fn test_create_ingest_job() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/services/data/v62.0/jobs/ingest"))
            .and(header("Authorization", "Bearer test-token"))
            .and(body_json(serde_json::json!({
                "object": "Account",
                "operation": "insert",
                "contentType": "CSV",
                "columnDelimiter": "COMMA",
                "lineEnding": "LF"
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"id": "1234", "state": "Open"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let job = client(&server)
            .create_ingest_job(&CreateIngestJobRequest::new("Account", Operation::Insert))
            .await
            .unwrap();
        assert_eq!(job.id, "1234");
        assert_eq!(job.state, JobState::Open);
    }

    #[tokio::test]
    async fn test_create_ingest_job_not_open_is_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/services/data/v62.0/jobs/ingest"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"id": "1234", "state": "Aborted"})),
            )
            .mount(&server)
            .await;

        let err = client(&server)
            .create_ingest_job(&CreateIngestJobRequest::new("Account", Operation::Insert))
            .await
            .unwrap_err();
        assert!(matches!(
            err.kind,
            ErrorKind::JobRejected { ref job_id, state: JobState::Aborted } if job_id == "1234"
        ));
    }

    #[tokio::test]
    async fn test_upload_job_data_accepts_created() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/services/data/v62.0/jobs/ingest/1234/batches"))
            .and(header("Content-Type", "text/csv"))
            .and(body_string("Name\nAcme\n"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        client(&server)
            .upload_job_data("1234", "Name\nAcme\n".to_string())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_close_job() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/services/data/v62.0/jobs/ingest/1234"))
            .and(body_json(serde_json::json!({"state": "UploadComplete"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"id": "1234", "state": "UploadComplete"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let job = client(&server).close_job("1234").await.unwrap();
        assert_eq!(job.state, JobState::UploadComplete);
    }

    #[tokio::test]
    async fn test_get_job() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/services/data/v62.0/jobs/ingest/1234"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "1234",
                "state": "JobComplete",
                "numberRecordsProcessed": 2,
                "numberRecordsFailed": 0,
                "errorMessage": ""
            })))
            .mount(&server)
            .await;

        let job = client(&server).get_job(JobKind::Ingest, "1234").await.unwrap();
        assert_eq!(job.state, JobState::JobComplete);
        assert_eq!(job.number_records_processed, 2);
    }

    #[tokio::test]
    async fn test_get_failed_results_is_verbatim() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/services/data/v62.0/jobs/ingest/1234/failedResults"))
            .and(header("Accept", "text/csv"))
            .respond_with(ResponseTemplate::new(200).set_body_string("\"error\""))
            .mount(&server)
            .await;

        let report = client(&server).get_failed_results("1234").await.unwrap();
        assert_eq!(report, "\"error\"");
    }

    #[tokio::test]
    async fn test_get_query_results_page() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/services/data/v62.0/jobs/query/750xx/results"))
            .and(query_param("locator", "abc"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("Sforce-Locator", "null")
                    .insert_header("Sforce-NumberOfRecords", "2")
                    .set_body_string("\"Id\",\"Name\"\n\"001A\",\"Acme\"\n\"001B\",\"Globex\"\n"),
            )
            .mount(&server)
            .await;

        let page = client(&server)
            .get_query_results("750xx", Some("abc"))
            .await
            .unwrap();
        assert_eq!(
            page.rows,
            vec![
                vec!["Id", "Name"],
                vec!["001A", "Acme"],
                vec!["001B", "Globex"]
            ]
        );
        assert_eq!(page.locator, None);
        assert_eq!(page.number_of_records, Some(2));
    }

    #[tokio::test]
    async fn test_abort_query_job() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/services/data/v62.0/jobs/query/750xx"))
            .and(body_json(serde_json::json!({"state": "Aborted"})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"id": "750xx", "state": "Aborted"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let job = client(&server)
            .abort_job(JobKind::Query, "750xx")
            .await
            .unwrap();
        assert_eq!(job.state, JobState::Aborted);
    }
}
