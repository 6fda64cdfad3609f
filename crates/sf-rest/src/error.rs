//! Error types for sfkit-rest.

use sfkit_records::{AggregateFailure, ValidationError};

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

    /// A routing field (`Id` or an external id) absent from record `index`.
    pub(crate) fn missing_field(field: &str, index: usize) -> Self {
        Error::new(ErrorKind::Validation(ValidationError::MissingField {
            field: field.to_string(),
            indices: vec![index],
        }))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    /// Transport failure or non-2xx answer.
    #[error("{0}")]
    Client(sfkit_client::ErrorKind),

    #[error("Validation failed: {0}")]
    Validation(ValidationError),

    /// One or more records were answered with `success: false`.
    #[error("{0}")]
    Records(AggregateFailure),
}

impl From<sfkit_client::Error> for Error {
    fn from(err: sfkit_client::Error) -> Self {
        Error {
            kind: ErrorKind::Client(err.kind),
            source: err.source,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        sfkit_client::Error::from(err).into()
    }
}

impl From<ValidationError> for Error {
    fn from(err: ValidationError) -> Self {
        Error::new(ErrorKind::Validation(err))
    }
}

impl From<AggregateFailure> for Error {
    fn from(err: AggregateFailure) -> Self {
        Error::new(ErrorKind::Records(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_error_keeps_kind() {
        let err: Error = sfkit_client::Error::new(sfkit_client::ErrorKind::NotFound(
            "sobjects/Acount".into(),
        ))
        .into();
        assert!(matches!(
            err.kind,
            ErrorKind::Client(sfkit_client::ErrorKind::NotFound(_))
        ));
    }

    #[test]
    fn test_missing_field_names_record() {
        let err = Error::missing_field("Id", 3);
        assert_eq!(
            err.to_string(),
            "Validation failed: field 'Id' is missing or empty on record(s) [3]"
        );
    }
}
