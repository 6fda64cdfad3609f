//! # sfkit-rest
//!
//! Synchronous Salesforce REST API calls: single-record CRUD, SOQL query,
//! sObject Collections and the Composite API.
//!
//! Multi-record calls take a validated [`sfkit_records::RecordSet`], send
//! one request per batch and fold the per-record outcomes of every batch
//! into one result. A batch whose request fails does not stop the batches
//! after it.
//!
//! ## Example
//!
//! ```rust,ignore
//! use sfkit_records::{ApiFamily, Preflight};
//! use sfkit_rest::{SalesforceRestClient, Write};
//!
//! let client = SalesforceRestClient::new(credential)?;
//! let set = Preflight::new(true)
//!     .object("Account")
//!     .collection(&accounts, 200, ApiFamily::Collections)?;
//!
//! let ids = client.collections("Account", Write::Insert, &set).await?;
//! ```

mod client;
mod collections;
mod composite;
mod error;
mod sobject;

pub use client::SalesforceRestClient;
pub use collections::CollectionRequest;
pub use composite::{
    CompositeRequest, CompositeResponse, CompositeSubrequest, CompositeSubresponse,
    COMPOSITE_SUBREQUEST_MAX,
};
pub use error::{Error, ErrorKind, Result};
pub use sobject::{CreateResult, UpsertResult, Write};

pub use sfkit_client::{ClientConfig, ClientConfigBuilder};
