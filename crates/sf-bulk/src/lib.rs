//! # sfkit-bulk
//!
//! Salesforce Bulk API 2.0 for sfkit.
//!
//! ## Features
//!
//! - **Job resources** - create, upload, close, abort and inspect ingest and
//!   query jobs ([`BulkApiClient`])
//! - **Batched ingest** - one job per batch of a validated
//!   [`RecordSet`](sfkit_records::RecordSet), with per-batch failures kept
//!   apart ([`BatchErrors`])
//! - **Polling** - [`JobPoller`] waits on each job from its own task at a
//!   fixed interval
//! - **Result collection** - query results are read page by page along the
//!   `Sforce-Locator` chain into one table
//!
//! ## Example - Bulk Insert
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use sfkit_bulk::{BulkApiClient, CreateIngestJobRequest};
//! use sfkit_records::{ApiFamily, Operation, Preflight};
//!
//! let client = BulkApiClient::new(credential)?;
//! let records = Preflight::new(true)
//!     .object("Account")
//!     .collection(&accounts, 10_000, ApiFamily::Bulk)?;
//!
//! let job_ids = client
//!     .ingest(
//!         &CreateIngestJobRequest::new("Account", Operation::Insert),
//!         &records,
//!         Some(Duration::from_secs(5)),
//!     )
//!     .await?;
//! ```
//!
//! ## Example - Bulk Query
//!
//! ```rust,ignore
//! let table = client
//!     .query("SELECT Id, Name FROM Account", Duration::from_secs(5))
//!     .await?;
//! // table[0] is the header row
//! ```

mod client;
mod collector;
mod error;
mod ingest;
mod poller;
mod types;

pub use client::BulkApiClient;
pub use error::{BatchErrors, BatchFailure, BatchJob, Error, ErrorKind, Result, SubmitStage};
pub use poller::{classify, JobPoller, PollStatus, DEFAULT_POLL_INTERVAL};
pub use types::*;
