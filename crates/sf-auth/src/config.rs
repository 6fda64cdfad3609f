//! Authentication configuration.

use crate::error::{Error, ErrorKind, Result};
use crate::PRODUCTION_LOGIN_URL;

/// Everything needed to obtain a credential.
///
/// Either username + password (+ security token) with a connected app's
/// consumer key/secret, or the consumer key/secret alone for the client
/// credentials flow. Secrets are redacted in `Debug` output.
#[derive(Clone, Default)]
pub struct AuthConfig {
    domain: Option<String>,
    username: Option<String>,
    password: Option<String>,
    security_token: Option<String>,
    consumer_key: Option<String>,
    consumer_secret: Option<String>,
    api_version: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("AuthConfig")
            .field("domain", &self.domain)
            .field("username", &self.username)
            .field("password", &redact(&self.password))
            .field("security_token", &redact(&self.security_token))
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &redact(&self.consumer_secret))
            .field("api_version", &self.api_version)
            .finish()
    }
}

/// Which OAuth grant a config maps to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFlow {
    Password,
    ClientCredentials,
}

impl AuthConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Login host, e.g. `https://test.salesforce.com` or `mydomain.my.salesforce.com`.
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_security_token(mut self, token: impl Into<String>) -> Self {
        self.security_token = Some(token.into());
        self
    }

    pub fn with_consumer_key(mut self, key: impl Into<String>) -> Self {
        self.consumer_key = Some(key.into());
        self
    }

    pub fn with_consumer_secret(mut self, secret: impl Into<String>) -> Self {
        self.consumer_secret = Some(secret.into());
        self
    }

    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = Some(version.into());
        self
    }

    /// Read configuration from `SF_*` environment variables (`SALESFORCE_*` also accepted).
    ///
    /// `SF_DOMAIN`, `SF_USERNAME`, `SF_PASSWORD`, `SF_SECURITY_TOKEN`,
    /// `SF_CONSUMER_KEY`, `SF_CONSUMER_SECRET`, `SF_API_VERSION`.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |suffix: &str| {
            lookup(&format!("SF_{suffix}"))
                .or_else(|| lookup(&format!("SALESFORCE_{suffix}")))
                .filter(|v| !v.is_empty())
        };

        let config = Self {
            domain: var("DOMAIN"),
            username: var("USERNAME"),
            password: var("PASSWORD"),
            security_token: var("SECURITY_TOKEN"),
            consumer_key: var("CONSUMER_KEY"),
            consumer_secret: var("CONSUMER_SECRET"),
            api_version: var("API_VERSION"),
        };

        if config.username.is_none() && config.consumer_key.is_none() {
            return Err(Error::new(ErrorKind::EnvVar(
                "SF_USERNAME or SF_CONSUMER_KEY".to_string(),
            )));
        }

        Ok(config)
    }

    /// The grant this config describes.
    pub fn flow(&self) -> Result<AuthFlow> {
        let has = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());

        if has(&self.username) {
            if !has(&self.password) {
                return Err(invalid("password is required with a username"));
            }
            if !has(&self.consumer_key) || !has(&self.consumer_secret) {
                return Err(invalid(
                    "consumer key and secret are required for the password flow",
                ));
            }
            return Ok(AuthFlow::Password);
        }

        if has(&self.consumer_key) && has(&self.consumer_secret) {
            return Ok(AuthFlow::ClientCredentials);
        }

        Err(invalid(
            "provide username/password or consumer key/secret",
        ))
    }

    /// Normalized login URL: scheme added when missing, trailing slash removed.
    pub fn login_url(&self) -> Result<String> {
        let raw = self
            .domain
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .unwrap_or(PRODUCTION_LOGIN_URL)
            .trim();

        let with_scheme = if raw.starts_with("http://") || raw.starts_with("https://") {
            raw.to_string()
        } else {
            format!("https://{raw}")
        };

        let url = url::Url::parse(&with_scheme)?;
        Ok(url.as_str().trim_end_matches('/').to_string())
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn api_version(&self) -> Option<&str> {
        self.api_version.as_deref()
    }

    pub(crate) fn consumer_key(&self) -> &str {
        self.consumer_key.as_deref().unwrap_or_default()
    }

    pub(crate) fn consumer_secret(&self) -> &str {
        self.consumer_secret.as_deref().unwrap_or_default()
    }

    /// Password with the security token appended, as the password grant expects.
    pub(crate) fn password_with_token(&self) -> String {
        format!(
            "{}{}",
            self.password.as_deref().unwrap_or_default(),
            self.security_token.as_deref().unwrap_or_default()
        )
    }
}

fn invalid(message: &str) -> Error {
    Error::new(ErrorKind::InvalidCredentials(message.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn password_config() -> AuthConfig {
        AuthConfig::new()
            .with_username("user@example.com")
            .with_password("hunter2")
            .with_security_token("TOKEN")
            .with_consumer_key("key")
            .with_consumer_secret("secret")
    }

    #[test]
    fn test_flow_selection() {
        assert_eq!(password_config().flow().unwrap(), AuthFlow::Password);
        assert_eq!(
            AuthConfig::new()
                .with_consumer_key("key")
                .with_consumer_secret("secret")
                .flow()
                .unwrap(),
            AuthFlow::ClientCredentials
        );
    }

    #[test]
    fn test_empty_config_is_invalid() {
        let err = AuthConfig::new().flow().unwrap_err();
        assert!(matches!(err.kind, ErrorKind::InvalidCredentials(_)));
    }

    #[test]
    fn test_username_without_password_is_invalid() {
        let err = AuthConfig::new()
            .with_username("user@example.com")
            .with_consumer_key("key")
            .with_consumer_secret("secret")
            .flow()
            .unwrap_err();
        assert!(err.to_string().contains("password"));
    }

    #[test]
    fn test_password_with_token() {
        assert_eq!(password_config().password_with_token(), "hunter2TOKEN");
    }

    #[test]
    fn test_login_url_normalization() {
        assert_eq!(AuthConfig::new().login_url().unwrap(), PRODUCTION_LOGIN_URL);
        assert_eq!(
            AuthConfig::new()
                .with_domain("acme.my.salesforce.com/")
                .login_url()
                .unwrap(),
            "https://acme.my.salesforce.com"
        );
        assert_eq!(
            AuthConfig::new()
                .with_domain("http://127.0.0.1:8080")
                .login_url()
                .unwrap(),
            "http://127.0.0.1:8080"
        );
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let debug = format!("{:?}", password_config());
        assert!(debug.contains("user@example.com"));
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("TOKEN"));
        assert!(!debug.contains("\"secret\""));
    }

    #[test]
    fn test_from_lookup_prefers_sf_prefix() {
        let vars: HashMap<&str, &str> = [
            ("SF_USERNAME", "primary@example.com"),
            ("SALESFORCE_USERNAME", "fallback@example.com"),
            ("SALESFORCE_PASSWORD", "pw"),
            ("SF_DOMAIN", "test.salesforce.com"),
        ]
        .into_iter()
        .collect();

        let config =
            AuthConfig::from_lookup(|name| vars.get(name).map(|v| v.to_string())).unwrap();
        assert_eq!(config.username(), Some("primary@example.com"));
        assert_eq!(config.password_with_token(), "pw");
        assert_eq!(config.login_url().unwrap(), "https://test.salesforce.com");
    }

    #[test]
    fn test_from_lookup_requires_identity() {
        let err = AuthConfig::from_lookup(|_| None).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::EnvVar(_)));
    }
}
