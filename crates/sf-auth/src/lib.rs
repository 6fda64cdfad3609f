//! # sfkit-auth
//!
//! Credential provider for sfkit: exchanges an [`AuthConfig`] for an
//! immutable [`Credential`].
//!
//! ## Supported flows
//!
//! - **OAuth 2.0 Username-Password** - username, password and security
//!   token plus a connected app's consumer key/secret
//! - **OAuth 2.0 Client Credentials** - consumer key/secret only
//! - **Refresh Token** and **Revoke** via [`OAuthClient`]
//!
//! Secrets are redacted in `Debug` output and never recorded in tracing
//! spans.
//!
//! ## Example
//!
//! ```rust,ignore
//! use sfkit_auth::{authenticate, AuthConfig};
//!
//! let config = AuthConfig::from_env()?;
//! let credential = authenticate(&config).await?;
//! println!("connected to {}", credential.instance_url());
//! ```

mod config;
mod error;
mod oauth;

pub use config::{AuthConfig, AuthFlow};
pub use error::{Error, ErrorKind, Result};
pub use oauth::{authenticate, OAuthClient, TokenResponse};
pub use sfkit_client::Credential;

/// Default Salesforce login URL for production.
pub const PRODUCTION_LOGIN_URL: &str = "https://login.salesforce.com";

/// Default Salesforce login URL for sandbox.
pub const SANDBOX_LOGIN_URL: &str = "https://test.salesforce.com";
