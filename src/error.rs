//! The error taxonomy every [`Salesforce`](crate::Salesforce) operation reports.
//!
//! Errors from the member crates are folded into four families:
//!
//! - [`ErrorKind::Validation`]: a local precondition failed; nothing was sent
//! - [`ErrorKind::Transport`]: a request never got an answer
//! - [`ErrorKind::Remote`] and [`ErrorKind::RecordFailures`]: the API answered
//!   with an error status, or flagged individual records as failed
//! - [`ErrorKind::JobFailed`] and [`ErrorKind::Batches`]: bulk jobs that
//!   ended badly
//!
//! The member crate's own error is kept as the `source`.

use sfkit_records::{AggregateFailure, ValidationError};

#[cfg(feature = "bulk")]
use sfkit_bulk::{BatchErrors, JobState};

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

    fn with_source(
        kind: ErrorKind,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            source: Some(Box::new(source)),
        }
    }

    /// Rejected before any request was sent.
    pub fn is_validation(&self) -> bool {
        matches!(self.kind, ErrorKind::Validation(_))
    }

    /// A request went unanswered.
    pub fn is_transport(&self) -> bool {
        matches!(self.kind, ErrorKind::Transport { .. })
    }

    /// The API answered with an error, for the call or for some records.
    pub fn is_remote(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::Remote { .. } | ErrorKind::RecordFailures(_)
        )
    }

    /// Bulk job this error concerns, if one was created.
    ///
    /// Set when an upload or close failed after job creation, when a job was
    /// rejected or failed, and when polling a job stopped.
    pub fn job_id(&self) -> Option<&str> {
        match &self.kind {
            ErrorKind::Remote { job_id, .. } | ErrorKind::Transport { job_id, .. } => {
                job_id.as_deref()
            }
            #[cfg(feature = "bulk")]
            ErrorKind::JobFailed { job_id, .. } => Some(job_id),
            _ => None,
        }
    }

    /// HTTP status of the remote answer, if there was one.
    pub fn status(&self) -> Option<u16> {
        match &self.kind {
            ErrorKind::Remote { status, .. } => *status,
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    #[error("Validation failed: {0}")]
    Validation(ValidationError),

    #[error("Transport error: {message}")]
    Transport {
        message: String,
        job_id: Option<String>,
    },

    /// Non-2xx answer, or a job the API set up in an unexpected state.
    #[error("Remote error: {message}")]
    Remote {
        status: Option<u16>,
        error_code: Option<String>,
        message: String,
        fields: Vec<String>,
        job_id: Option<String>,
    },

    /// Some records of a collections or composite call failed.
    #[error("{0}")]
    RecordFailures(AggregateFailure),

    /// A bulk job finished `Failed` or `Aborted`, or with failed records.
    #[cfg(feature = "bulk")]
    #[error(
        "job {job_id} finished {state} with {records_failed} failed record(s){}",
        message.as_deref().map(|m| format!(": {m}")).unwrap_or_default()
    )]
    JobFailed {
        job_id: String,
        state: JobState,
        records_failed: u64,
        message: Option<String>,
        /// Failed-results report, when it could be fetched.
        failed_records: Option<String>,
    },

    /// Some batches of a multi-job bulk call failed.
    #[cfg(feature = "bulk")]
    #[error("{0}")]
    Batches(BatchErrors),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Codec error: {0}")]
    Codec(String),
}

impl From<ValidationError> for Error {
    fn from(err: ValidationError) -> Self {
        Error::new(ErrorKind::Validation(err))
    }
}

impl From<AggregateFailure> for Error {
    fn from(err: AggregateFailure) -> Self {
        Error::new(ErrorKind::RecordFailures(err))
    }
}

/// Classify a transport-layer error kind.
fn client_kind(kind: &sfkit_client::ErrorKind) -> ErrorKind {
    use sfkit_client::ErrorKind as C;

    if kind.is_transport() {
        return ErrorKind::Transport {
            message: kind.to_string(),
            job_id: None,
        };
    }
    match kind {
        C::SalesforceApi {
            status,
            error_code,
            message,
            fields,
        } => ErrorKind::Remote {
            status: Some(*status),
            error_code: Some(error_code.clone()),
            message: message.clone(),
            fields: fields.clone(),
            job_id: None,
        },
        C::Json(message) => ErrorKind::Codec(message.clone()),
        other => match other.status() {
            Some(status) => ErrorKind::Remote {
                status: Some(status),
                error_code: None,
                message: other.to_string(),
                fields: Vec::new(),
                job_id: None,
            },
            None => ErrorKind::Transport {
                message: other.to_string(),
                job_id: None,
            },
        },
    }
}

impl From<sfkit_client::Error> for Error {
    fn from(err: sfkit_client::Error) -> Self {
        let kind = client_kind(&err.kind);
        Error::with_source(kind, err)
    }
}

#[cfg(feature = "auth")]
impl From<sfkit_auth::Error> for Error {
    fn from(err: sfkit_auth::Error) -> Self {
        Error::with_source(ErrorKind::Auth(err.kind.to_string()), err)
    }
}

#[cfg(feature = "rest")]
impl From<sfkit_rest::Error> for Error {
    fn from(err: sfkit_rest::Error) -> Self {
        use sfkit_rest::ErrorKind as R;

        match err.kind {
            R::Client(kind) => sfkit_client::Error {
                kind,
                source: err.source,
            }
            .into(),
            R::Validation(v) => Error {
                kind: ErrorKind::Validation(v),
                source: err.source,
            },
            R::Records(failure) => Error {
                kind: ErrorKind::RecordFailures(failure),
                source: err.source,
            },
        }
    }
}

#[cfg(feature = "bulk")]
fn bulk_kind(kind: sfkit_bulk::ErrorKind) -> ErrorKind {
    use sfkit_bulk::ErrorKind as B;

    match kind {
        B::Client(kind) => client_kind(&kind),
        B::Codec(message) => ErrorKind::Codec(message),
        B::JobRejected { job_id, state } => ErrorKind::Remote {
            status: None,
            error_code: Some("JOB_NOT_OPEN".to_string()),
            message: format!("job {job_id} was created in state {state}, expected Open"),
            fields: Vec::new(),
            job_id: Some(job_id),
        },
        B::Submission {
            stage,
            job_id,
            cause,
        } => match bulk_kind(*cause) {
            ErrorKind::Remote {
                status,
                error_code,
                message,
                fields,
                ..
            } => ErrorKind::Remote {
                status,
                error_code,
                message: format!("{stage} failed for job {job_id}: {message}"),
                fields,
                job_id: Some(job_id),
            },
            ErrorKind::Transport { message, .. } => ErrorKind::Transport {
                message: format!("{stage} failed for job {job_id}: {message}"),
                job_id: Some(job_id),
            },
            other => other,
        },
        B::JobFailed {
            job_id,
            state,
            records_failed,
            message,
            failed_records,
        } => ErrorKind::JobFailed {
            job_id,
            state,
            records_failed,
            message,
            failed_records,
        },
        B::PollAborted { job_id, message } => ErrorKind::Transport {
            message: format!("polling job {job_id} stopped: {message}"),
            job_id: Some(job_id),
        },
        B::Batches(batches) => ErrorKind::Batches(batches),
    }
}

#[cfg(feature = "bulk")]
impl From<sfkit_bulk::Error> for Error {
    fn from(err: sfkit_bulk::Error) -> Self {
        Error {
            kind: bulk_kind(err.kind),
            source: err.source,
        }
    }
}
