//! # sfkit-records
//!
//! Everything that happens to a record collection before it touches the
//! network, and to per-record outcomes after they come back.
//!
//! - [`Record`] and the [`FieldAccess`] capability for named-field lookup
//! - [`Preflight`], the validation gate that classifies caller input into a
//!   [`RecordShape`] and checks authentication, batch size and required
//!   fields without any I/O
//! - [`partition`], order-preserving batching
//! - [`tabular`] (Bulk API CSV) and [`document`] (REST/composite JSON) codecs
//! - [`Aggregator`], which folds per-record outcomes from many batches into a
//!   single [`AggregateFailure`]
//!
//! ## Example
//!
//! ```rust,ignore
//! use sfkit_records::{ApiFamily, Preflight, tabular};
//!
//! let set = Preflight::new(credential.is_valid())
//!     .object("Account")
//!     .collection(&accounts, 200, ApiFamily::Bulk)?;
//!
//! for batch in set.batches() {
//!     let csv = tabular::encode(batch)?;
//!     // upload csv ...
//! }
//! ```

pub mod document;
mod error;
mod operation;
mod outcome;
mod partition;
mod record;
pub mod tabular;
mod validate;

pub use error::{Error, ErrorKind, Result, ValidationError};
pub use operation::Operation;
pub use outcome::{
    AggregateFailure, Aggregator, BatchError, RecordError, RecordFailure, RecordOutcome,
};
pub use partition::partition;
pub use record::{FieldAccess, FieldNotFound, Record};
pub use validate::{classify, ApiFamily, Preflight, RecordSet, RecordShape};

/// Largest batch accepted by a single sObject Collections call.
pub const COLLECTION_BATCH_SIZE_MAX: usize = 200;

/// Largest number of sub-requests in a single composite call.
pub const COMPOSITE_BATCH_SIZE_MAX: usize = 200;

/// Largest number of records uploaded to one Bulk API ingest job by this crate.
pub const BULK_BATCH_SIZE_MAX: usize = 10_000;

/// Name of the primary key field on every sObject.
pub const ID_FIELD: &str = "Id";
