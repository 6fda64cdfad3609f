//! The bearer credential shared by every API call.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An access token bound to the instance it was issued for.
///
/// A credential is immutable once obtained. Clients share it behind an
/// [`std::sync::Arc`]; re-authenticating produces a new credential rather
/// than mutating the existing one.
///
/// The access token and signature are redacted in `Debug` output.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    access_token: String,
    instance_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    issued_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    token_type: Option<String>,
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("instance_url", &self.instance_url)
            .field("access_token", &"[REDACTED]")
            .field("id", &self.id)
            .field("issued_at", &self.issued_at)
            .field("signature", &self.signature.as_ref().map(|_| "[REDACTED]"))
            .field("token_type", &self.token_type)
            .finish()
    }
}

impl Credential {
    /// Create a credential from an instance URL and access token.
    ///
    /// A bare host such as `acme.my.salesforce.com` is taken as `https://`.
    pub fn new(instance_url: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            instance_url: normalize_instance_url(&instance_url.into()),
            ..Default::default()
        }
    }

    /// Attach the identity metadata returned by the token endpoint.
    pub fn with_identity(
        mut self,
        id: Option<String>,
        issued_at: Option<String>,
        signature: Option<String>,
    ) -> Self {
        self.id = id;
        self.issued_at = issued_at;
        self.signature = signature;
        self
    }

    /// Set the token type (normally `Bearer`).
    pub fn with_token_type(mut self, token_type: impl Into<String>) -> Self {
        self.token_type = Some(token_type.into());
        self
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn instance_url(&self) -> &str {
        &self.instance_url
    }

    /// Identity URL of the authenticated user.
    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    /// Raw `issued_at` value (milliseconds since the epoch, as a string).
    pub fn issued_at(&self) -> Option<&str> {
        self.issued_at.as_deref()
    }

    /// `issued_at` parsed into a timestamp.
    pub fn issued_at_time(&self) -> Option<DateTime<Utc>> {
        let millis = self.issued_at.as_deref()?.parse::<i64>().ok()?;
        DateTime::from_timestamp_millis(millis)
    }

    pub fn signature(&self) -> Option<&str> {
        self.signature.as_deref()
    }

    pub fn token_type(&self) -> Option<&str> {
        self.token_type.as_deref()
    }

    /// True when the credential carries a token and an http(s) instance URL.
    pub fn is_valid(&self) -> bool {
        if self.access_token.is_empty() {
            return false;
        }
        match url::Url::parse(&self.instance_url) {
            Ok(url) => matches!(url.scheme(), "http" | "https"),
            Err(_) => false,
        }
    }
}

fn normalize_instance_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() || trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    }
}
