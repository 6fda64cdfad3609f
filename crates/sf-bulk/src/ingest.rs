//! Bulk ingest: one job per batch.

use futures::future::join_all;
use std::time::Duration;
use tracing::{info, instrument, warn};

use sfkit_records::{document, tabular, Record, RecordSet};

use crate::client::BulkApiClient;
use crate::error::{BatchErrors, BatchFailure, BatchJob, Error, ErrorKind, Result, SubmitStage};
use crate::poller::JobPoller;
use crate::types::{CreateIngestJobRequest, CreateQueryJobRequest, JobInfo, JobKind};

impl BulkApiClient {
    /// Create a job for `records`, upload them and close the job.
    ///
    /// Records are encoded before the job is created, so a codec failure
    /// leaves nothing behind on the server. Upload and close failures carry
    /// the id of the job they left open.
    #[instrument(skip(self, request, records), fields(object = %request.object, operation = %request.operation, records = records.len()))]
    pub async fn submit_batch(
        &self,
        request: &CreateIngestJobRequest,
        records: &[Record],
    ) -> Result<JobInfo> {
        let shaped: Vec<Record> = records
            .iter()
            .map(|record| document::shape(record, request.operation))
            .collect();
        let csv = tabular::encode_with(&shaped, request.column_delimiter.byte())?;

        let job = self.create_ingest_job(request).await?;

        if let Err(err) = self.upload_job_data(&job.id, csv).await {
            return Err(Error::submission(SubmitStage::Upload, &job.id, err));
        }

        self.close_job(&job.id)
            .await
            .map_err(|err| Error::submission(SubmitStage::Close, &job.id, err))
    }

    /// Submit every batch of `records` as its own job.
    ///
    /// Batches are submitted in order; a failed batch does not stop the ones
    /// after it. With `wait` set, every submitted job is polled at that
    /// interval on its own task and this call returns only after all of them
    /// have finished.
    ///
    /// Returns the job ids in batch order, or [`ErrorKind::Batches`] listing
    /// both the batches that went through and the ones that failed.
    #[instrument(skip(self, request, records), fields(object = %request.object, operation = %request.operation, records = records.len()))]
    pub async fn ingest(
        &self,
        request: &CreateIngestJobRequest,
        records: &RecordSet,
        wait: Option<Duration>,
    ) -> Result<Vec<String>> {
        let batches = records.batches();
        let total_batches = batches.len();

        let mut submitted: Vec<(BatchJob, usize, usize)> = Vec::with_capacity(total_batches);
        let mut failed: Vec<BatchFailure> = Vec::new();
        let mut first_index = 0;

        for (batch, chunk) in batches.into_iter().enumerate() {
            match self.submit_batch(request, chunk).await {
                Ok(job) => submitted.push((
                    BatchJob {
                        batch,
                        job_id: job.id,
                    },
                    first_index,
                    chunk.len(),
                )),
                Err(error) => {
                    warn!(batch, error = %error, "batch submission failed");
                    failed.push(BatchFailure {
                        batch,
                        first_index,
                        len: chunk.len(),
                        error,
                    });
                }
            }
            first_index += chunk.len();
        }

        info!(
            submitted = submitted.len(),
            failed = failed.len(),
            total_batches,
            "bulk batches submitted"
        );

        let succeeded = match wait {
            None => submitted.into_iter().map(|(job, _, _)| job).collect(),
            Some(interval) => {
                let poller = JobPoller::new(self.clone(), interval);
                let handles: Vec<_> = submitted
                    .iter()
                    .map(|(job, _, _)| poller.spawn(job.job_id.clone(), JobKind::Ingest))
                    .collect();

                let mut succeeded = Vec::with_capacity(handles.len());
                for ((job, first_index, len), outcome) in
                    submitted.into_iter().zip(join_all(handles).await)
                {
                    let error = match outcome {
                        Ok(Ok(_)) => {
                            succeeded.push(job);
                            continue;
                        }
                        Ok(Err(error)) => error,
                        Err(join_error) => Error::new(ErrorKind::PollAborted {
                            job_id: job.job_id,
                            message: join_error.to_string(),
                        }),
                    };
                    failed.push(BatchFailure {
                        batch: job.batch,
                        first_index,
                        len,
                        error,
                    });
                }
                succeeded
            }
        };

        if failed.is_empty() {
            return Ok(succeeded.into_iter().map(|job| job.job_id).collect());
        }

        failed.sort_by_key(|f| f.batch);
        Err(Error::new(ErrorKind::Batches(BatchErrors {
            total_batches,
            succeeded,
            failed,
        })))
    }

    /// Run a SOQL query as a bulk query job and return the full result table.
    #[instrument(skip(self, soql))]
    pub async fn query(&self, soql: &str, poll_interval: Duration) -> Result<Vec<Vec<String>>> {
        let job = self
            .create_query_job(&CreateQueryJobRequest::new(soql))
            .await?;
        JobPoller::new(self.clone(), poll_interval)
            .wait(&job.id, JobKind::Query)
            .await?;
        self.collect_query_results(&job.id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sfkit_client::Credential;
    use sfkit_records::{ApiFamily, Operation, Preflight};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use wiremock::matchers::{body_string, method, path, path_regex};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    const POLL: Option<Duration> = Some(Duration::from_millis(1));

    fn client(server: &MockServer) -> BulkApiClient {
        BulkApiClient::new(Credential::new(server.uri(), "token")).unwrap()
    }

    fn record_set(value: serde_json::Value, batch_size: usize) -> RecordSet {
        Preflight::new(true)
            .collection(&value, batch_size, ApiFamily::Bulk)
            .unwrap()
    }

    /// Mounts job creation handing out ids `750-0`, `750-1`, ... plus upload and close.
    async fn mount_ingest(server: &MockServer) -> Arc<AtomicUsize> {
        let created = Arc::new(AtomicUsize::new(0));
        let counter = created.clone();
        Mock::given(method("POST"))
            .and(path("/services/data/v62.0/jobs/ingest"))
            .respond_with(move |_: &Request| {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"id": format!("750-{n}"), "state": "Open"}))
            })
            .mount(server)
            .await;
        Mock::given(method("PUT"))
            .and(path_regex(r"^/services/data/v62\.0/jobs/ingest/[^/]+/batches$"))
            .respond_with(ResponseTemplate::new(201))
            .mount(server)
            .await;
        Mock::given(method("PATCH"))
            .and(path_regex(r"^/services/data/v62\.0/jobs/ingest/[^/]+$"))
            .respond_with(|req: &Request| {
                let id = req.url.path().rsplit('/').next().unwrap_or_default().to_string();
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"id": id, "state": "UploadComplete"}))
            })
            .mount(server)
            .await;
        created
    }

    #[tokio::test]
    async fn test_two_records_batch_200_is_one_job() {
        let server = MockServer::start().await;
        let created = mount_ingest(&server).await;

        let records = record_set(
            serde_json::json!([{"Name": "test account 1"}, {"Name": "test account 2"}]),
            200,
        );
        let ids = client(&server)
            .ingest(
                &CreateIngestJobRequest::new("Account", Operation::Insert),
                &records,
                None,
            )
            .await
            .unwrap();

        assert_eq!(ids, vec!["750-0"]);
        assert_eq!(created.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_upload_body_is_shaped_csv() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/services/data/v62.0/jobs/ingest"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"id": "1234", "state": "Open"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/services/data/v62.0/jobs/ingest/1234/batches"))
            .and(body_string("Name\nAcme\nGlobex\n"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .and(path("/services/data/v62.0/jobs/ingest/1234"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"id": "1234", "state": "UploadComplete"})),
            )
            .mount(&server)
            .await;

        let records: Vec<Record> = serde_json::from_value(serde_json::json!([
            {"Id": "001A", "Name": "Acme"},
            {"Name": "Globex"}
        ]))
        .unwrap();
        let job = client(&server)
            .submit_batch(
                &CreateIngestJobRequest::new("Account", Operation::Insert),
                &records,
            )
            .await
            .unwrap();
        assert_eq!(job.id, "1234");
    }

    #[tokio::test]
    async fn test_jobs_returned_in_batch_order_after_waiting() {
        let server = MockServer::start().await;
        mount_ingest(&server).await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/services/data/v62\.0/jobs/ingest/[^/]+$"))
            .respond_with(|req: &Request| {
                let id = req.url.path().rsplit('/').next().unwrap_or_default().to_string();
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"id": id, "state": "JobComplete"}))
            })
            .mount(&server)
            .await;

        let records = record_set(
            serde_json::json!([{"Name": "a"}, {"Name": "b"}, {"Name": "c"}, {"Name": "d"}, {"Name": "e"}]),
            2,
        );
        let ids = client(&server)
            .ingest(
                &CreateIngestJobRequest::new("Account", Operation::Insert),
                &records,
                POLL,
            )
            .await
            .unwrap();
        assert_eq!(ids, vec!["750-0", "750-1", "750-2"]);
    }

    #[tokio::test]
    async fn test_failed_job_does_not_hide_siblings() {
        let server = MockServer::start().await;
        mount_ingest(&server).await;
        Mock::given(method("GET"))
            .and(path("/services/data/v62.0/jobs/ingest/750-1/failedResults"))
            .respond_with(ResponseTemplate::new(200).set_body_string("\"sf__Id\",\"sf__Error\"\n"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path_regex(r"^/services/data/v62\.0/jobs/ingest/[^/]+$"))
            .respond_with(|req: &Request| {
                let id = req.url.path().rsplit('/').next().unwrap_or_default().to_string();
                let failed = if id == "750-1" { 1 } else { 0 };
                ResponseTemplate::new(200).set_body_json(serde_json::json!({
                    "id": id, "state": "JobComplete", "numberRecordsFailed": failed
                }))
            })
            .mount(&server)
            .await;

        let records = record_set(
            serde_json::json!([{"Name": "a"}, {"Name": "b"}, {"Name": "c"}]),
            1,
        );
        let err = client(&server)
            .ingest(
                &CreateIngestJobRequest::new("Account", Operation::Insert),
                &records,
                POLL,
            )
            .await
            .unwrap_err();

        let ErrorKind::Batches(batches) = err.kind else {
            panic!("expected batch errors");
        };
        assert_eq!(batches.total_batches, 3);
        assert_eq!(
            batches.succeeded.iter().map(|b| b.batch).collect::<Vec<_>>(),
            vec![0, 2]
        );
        assert_eq!(batches.failed.len(), 1);
        assert_eq!(batches.failed[0].batch, 1);
        assert_eq!(batches.failed[0].first_index, 1);
        assert_eq!(batches.failed[0].job_id(), Some("750-1"));
        assert_eq!(batches.job_ids(), vec!["750-0", "750-1", "750-2"]);
    }

    #[tokio::test]
    async fn test_upload_failure_is_tagged_with_job_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/services/data/v62.0/jobs/ingest"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"id": "1234", "state": "Open"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/services/data/v62.0/jobs/ingest/1234/batches"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!([
                {"errorCode": "INVALIDJOBSTATE", "message": "job not open"}
            ])))
            .mount(&server)
            .await;
        Mock::given(method("PATCH"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let records: Vec<Record> =
            serde_json::from_value(serde_json::json!([{"Name": "Acme"}])).unwrap();
        let err = client(&server)
            .submit_batch(
                &CreateIngestJobRequest::new("Account", Operation::Insert),
                &records,
            )
            .await
            .unwrap_err();

        assert_eq!(err.job_id(), Some("1234"));
        assert!(matches!(
            err.kind,
            ErrorKind::Submission { stage: SubmitStage::Upload, .. }
        ));
    }

    #[tokio::test]
    async fn test_bulk_query_end_to_end() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/services/data/v62.0/jobs/query"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"id": "750Q", "state": "UploadComplete"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/services/data/v62.0/jobs/query/750Q"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"id": "750Q", "state": "JobComplete"})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/services/data/v62.0/jobs/query/750Q/results"))
            .respond_with(ResponseTemplate::new(200).set_body_string("Id\n001A\n001B\n"))
            .mount(&server)
            .await;

        let table = client(&server)
            .query("SELECT Id FROM Account", Duration::from_millis(1))
            .await
            .unwrap();
        assert_eq!(table, vec![vec!["Id"], vec!["001A"], vec!["001B"]]);
    }
}
