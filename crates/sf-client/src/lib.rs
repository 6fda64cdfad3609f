//! # sfkit-client
//!
//! Transport layer shared by every sfkit API crate.
//!
//! This crate owns:
//! - [`Credential`], the immutable bearer token + instance URL obtained from
//!   the identity provider
//! - [`SfHttpClient`], raw HTTP with retry, compression and Salesforce error
//!   mapping
//! - [`SalesforceClient`], which binds a shared credential to the HTTP client
//!   and builds REST / Bulk API URLs
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │              sfkit-rest / sfkit-bulk / sfkit                │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   SalesforceClient                          │
//! │  - Arc<Credential> shared by every clone                    │
//! │  - URL building (rest_url, bulk_url)                        │
//! │  - Typed JSON helpers                                       │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    SfHttpClient                             │
//! │  - reqwest with retry/backoff, 429 + 5xx handling           │
//! │  - Salesforce error body parsing                            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use sfkit_client::{Credential, SalesforceClient};
//!
//! let credential = Credential::new("https://na1.salesforce.com", access_token);
//! let client = SalesforceClient::new(credential)?;
//!
//! let limits: serde_json::Value = client.rest_get("limits").await?;
//! ```

mod client;
mod config;
mod credential;
mod error;
mod request;
mod response;
mod retry;
mod salesforce_client;

pub use client::SfHttpClient;
pub use config::{ClientConfig, ClientConfigBuilder};
pub use credential::Credential;
pub use error::{Error, ErrorKind, Result};
pub use request::{RequestBody, RequestBuilder, RequestMethod};
pub use response::{Response, ResponseExt};
pub use retry::{BackoffStrategy, RetryConfig, RetryPolicy};
pub use salesforce_client::{QueryResult, SalesforceClient};

/// Default Salesforce API version
pub const DEFAULT_API_VERSION: &str = "62.0";

/// User-Agent string for the client
pub const USER_AGENT: &str = concat!("sfkit/", env!("CARGO_PKG_VERSION"));
