//! Waiting for bulk jobs to finish.

use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, instrument, warn};

use crate::client::BulkApiClient;
use crate::error::{Error, ErrorKind, Result};
use crate::types::{JobInfo, JobKind, JobState};

/// Default pause between status checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// What a status snapshot means for the waiting caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStatus {
    /// Keep polling.
    Pending,
    /// `JobComplete` with no failed records.
    Complete,
    /// `Failed`, `Aborted`, or any failed records.
    Failed,
}

pub fn classify(job: &JobInfo) -> PollStatus {
    if matches!(job.state, JobState::Failed | JobState::Aborted) || job.number_records_failed > 0 {
        PollStatus::Failed
    } else if job.state == JobState::JobComplete {
        PollStatus::Complete
    } else {
        PollStatus::Pending
    }
}

/// Polls job status at a fixed interval until the job is done.
///
/// There is no overall timeout or attempt cap: a job that never reaches a
/// terminal state is waited on forever. Individual status requests still go
/// through the client's retry policy, and a request that ultimately fails
/// ends the wait with that error. Callers that need a deadline can wrap
/// [`JobPoller::wait`] in `tokio::time::timeout`.
#[derive(Debug, Clone)]
pub struct JobPoller {
    client: BulkApiClient,
    interval: Duration,
}

impl JobPoller {
    pub fn new(client: BulkApiClient, interval: Duration) -> Self {
        Self { client, interval }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Sleep, fetch, classify; repeat until the job completes or fails.
    ///
    /// A failed ingest job carries its failed-results report when that can be
    /// fetched.
    #[instrument(skip(self), fields(interval_ms = self.interval.as_millis() as u64))]
    pub async fn wait(&self, job_id: &str, kind: JobKind) -> Result<JobInfo> {
        loop {
            sleep(self.interval).await;

            let job = self.client.get_job(kind, job_id).await?;
            debug!(
                job_id,
                state = %job.state,
                processed = job.number_records_processed,
                failed = job.number_records_failed,
                "job polled"
            );

            match classify(&job) {
                PollStatus::Pending => continue,
                PollStatus::Complete => return Ok(job),
                PollStatus::Failed => return Err(self.failure(job, kind).await),
            }
        }
    }

    /// Run [`wait`](Self::wait) on its own task.
    ///
    /// Dropping the handle abandons the result; the task still runs until
    /// the job finishes. The remote job is never aborted.
    pub fn spawn(&self, job_id: impl Into<String>, kind: JobKind) -> JoinHandle<Result<JobInfo>> {
        let poller = self.clone();
        let job_id = job_id.into();
        tokio::spawn(async move { poller.wait(&job_id, kind).await })
    }

    async fn failure(&self, job: JobInfo, kind: JobKind) -> Error {
        warn!(
            job_id = %job.id,
            state = %job.state,
            failed = job.number_records_failed,
            message = job.error_message().unwrap_or_default(),
            "bulk job failed"
        );

        let failed_records = match kind {
            JobKind::Ingest => match self.client.get_failed_results(&job.id).await {
                Ok(report) => Some(report),
                Err(err) => {
                    warn!(job_id = %job.id, error = %err, "could not fetch failed records");
                    None
                }
            },
            JobKind::Query => None,
        };

        let message = job.error_message().map(str::to_string);
        Error::new(ErrorKind::JobFailed {
            job_id: job.id,
            state: job.state,
            records_failed: job.number_records_failed,
            message,
            failed_records,
        })
    }
}
