//! Error types for sfkit-records.

pub type Result<T> = std::result::Result<T, Error>;

/// Codec error.
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
}

#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    #[error("CSV error: {0}")]
    Csv(String),
    #[error("Encoding error: {0}")]
    Encoding(String),
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        Error {
            kind: ErrorKind::Csv(err.to_string()),
            source: Some(Box::new(err)),
        }
    }
}

impl From<std::string::FromUtf8Error> for Error {
    fn from(err: std::string::FromUtf8Error) -> Self {
        Error {
            kind: ErrorKind::Encoding(err.to_string()),
            source: Some(Box::new(err)),
        }
    }
}

/// A local precondition that failed before any request was sent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("not authenticated: call init() or supply a valid credential")]
    MissingAuthentication,

    #[error("object name must not be empty")]
    InvalidObjectName,

    #[error("expected a collection of records, got {found}")]
    NotACollection { found: &'static str },

    #[error("expected a single record, got {found}")]
    NotARecord { found: &'static str },

    #[error("collection element {index} is {found}, not a record")]
    NotHomogeneous { index: usize, found: &'static str },

    #[error("input could not be converted to records: {0}")]
    Unserializable(String),

    #[error("batch size {batch_size} is outside 1..={max}")]
    BatchSizeOutOfRange { batch_size: usize, max: usize },

    #[error("field '{field}' is missing or empty on record(s) {indices:?}")]
    MissingField { field: String, indices: Vec<usize> },
}
