//! Error types for sfkit-bulk.

use std::fmt;

use crate::types::JobState;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
#[error("{kind}")]
pub struct Error {
    pub kind: ErrorKind,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind, source: None }
    }

    /// Tag a failed upload or close with the job it left behind.
    pub(crate) fn submission(stage: SubmitStage, job_id: &str, err: Error) -> Self {
        Error {
            kind: ErrorKind::Submission {
                stage,
                job_id: job_id.to_string(),
                cause: Box::new(err.kind),
            },
            source: err.source,
        }
    }

    /// Id of the job this error concerns, if one was created.
    pub fn job_id(&self) -> Option<&str> {
        match &self.kind {
            ErrorKind::JobRejected { job_id, .. }
            | ErrorKind::Submission { job_id, .. }
            | ErrorKind::JobFailed { job_id, .. }
            | ErrorKind::PollAborted { job_id, .. } => Some(job_id),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    /// Transport failure or non-2xx answer.
    #[error("{0}")]
    Client(sfkit_client::ErrorKind),

    #[error("Codec error: {0}")]
    Codec(String),

    /// The job was created but not in the `Open` state.
    #[error("job {job_id} was created in state {state}, expected Open")]
    JobRejected { job_id: String, state: JobState },

    /// Upload or close failed after the job was created. The job is left as is.
    #[error("{stage} failed for job {job_id}: {cause}")]
    Submission {
        stage: SubmitStage,
        job_id: String,
        cause: Box<ErrorKind>,
    },

    /// The job ended `Failed` or `Aborted`, or reported failed records.
    #[error(
        "job {job_id} finished {state} with {records_failed} failed record(s){}",
        message.as_deref().map(|m| format!(": {m}")).unwrap_or_default()
    )]
    JobFailed {
        job_id: String,
        state: JobState,
        records_failed: u64,
        message: Option<String>,
        /// The job's failed-results report, when it could be fetched.
        failed_records: Option<String>,
    },

    /// The task polling a job panicked or was cancelled.
    #[error("polling job {job_id} stopped: {message}")]
    PollAborted { job_id: String, message: String },

    /// One or more batches of a multi-batch call failed.
    #[error("{0}")]
    Batches(BatchErrors),
}

/// Step of a bulk submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitStage {
    Upload,
    Close,
}

impl fmt::Display for SubmitStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SubmitStage::Upload => "upload",
            SubmitStage::Close => "close",
        })
    }
}

/// A batch that was submitted and, if waited on, finished cleanly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchJob {
    pub batch: usize,
    pub job_id: String,
}

#[derive(Debug)]
pub struct BatchFailure {
    pub batch: usize,
    /// Index of the batch's first record in the caller's input.
    pub first_index: usize,
    pub len: usize,
    pub error: Error,
}

impl BatchFailure {
    pub fn job_id(&self) -> Option<&str> {
        self.error.job_id()
    }
}

/// Per-batch outcome of a multi-batch bulk call with at least one failure.
#[derive(Debug)]
pub struct BatchErrors {
    pub total_batches: usize,
    pub succeeded: Vec<BatchJob>,
    pub failed: Vec<BatchFailure>,
}

impl BatchErrors {
    /// Ids of every job that was created, failed or not, in batch order.
    pub fn job_ids(&self) -> Vec<&str> {
        let mut ids: Vec<(usize, &str)> = self
            .succeeded
            .iter()
            .map(|b| (b.batch, b.job_id.as_str()))
            .chain(
                self.failed
                    .iter()
                    .filter_map(|f| f.job_id().map(|id| (f.batch, id))),
            )
            .collect();
        ids.sort_by_key(|(batch, _)| *batch);
        ids.into_iter().map(|(_, id)| id).collect()
    }
}

impl fmt::Display for BatchErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} batches failed",
            self.failed.len(),
            self.total_batches
        )?;
        for failure in &self.failed {
            write!(
                f,
                "\n  batch {} (records {}..{}): {}",
                failure.batch,
                failure.first_index,
                failure.first_index + failure.len,
                failure.error
            )?;
        }
        Ok(())
    }
}

impl From<sfkit_client::Error> for Error {
    fn from(err: sfkit_client::Error) -> Self {
        Error {
            kind: ErrorKind::Client(err.kind),
            source: err.source,
        }
    }
}

impl From<sfkit_records::Error> for Error {
    fn from(err: sfkit_records::Error) -> Self {
        Error {
            kind: ErrorKind::Codec(err.kind.to_string()),
            source: Some(Box::new(err)),
        }
    }
}
