//! OAuth 2.0 token endpoint flows.

use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::config::{AuthConfig, AuthFlow};
use crate::error::{Error, ErrorKind, Result};
use sfkit_client::Credential;

/// Exchange `config` for a credential.
///
/// Configs that describe no supported flow fail with
/// [`ErrorKind::InvalidCredentials`] before any request is made.
pub async fn authenticate(config: &AuthConfig) -> Result<Credential> {
    let flow = config.flow()?;
    let client = OAuthClient::new(config.login_url()?);

    let token = match flow {
        AuthFlow::Password => client.password_grant(config).await?,
        AuthFlow::ClientCredentials => client.client_credentials_grant(config).await?,
    };

    Ok(token.into_credential())
}

/// Client for a login host's `/services/oauth2` endpoints.
#[derive(Debug, Clone)]
pub struct OAuthClient {
    login_url: String,
    http_client: reqwest::Client,
}

impl OAuthClient {
    pub fn new(login_url: impl Into<String>) -> Self {
        Self {
            login_url: login_url.into().trim_end_matches('/').to_string(),
            http_client: reqwest::Client::new(),
        }
    }

    pub fn login_url(&self) -> &str {
        &self.login_url
    }

    /// Username-password grant. The security token is appended to the password.
    #[instrument(skip(self, config), fields(login_url = %self.login_url))]
    pub async fn password_grant(&self, config: &AuthConfig) -> Result<TokenResponse> {
        let password = config.password_with_token();
        let params = [
            ("grant_type", "password"),
            ("client_id", config.consumer_key()),
            ("client_secret", config.consumer_secret()),
            ("username", config.username().unwrap_or_default()),
            ("password", password.as_str()),
        ];
        self.token_request(&params).await
    }

    #[instrument(skip(self, config), fields(login_url = %self.login_url))]
    pub async fn client_credentials_grant(&self, config: &AuthConfig) -> Result<TokenResponse> {
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", config.consumer_key()),
            ("client_secret", config.consumer_secret()),
        ];
        self.token_request(&params).await
    }

    /// Revoke an access or refresh token.
    #[instrument(skip(self, token))]
    pub async fn revoke_token(&self, token: &str) -> Result<()> {
        let body = serde_urlencoded::to_string([("token", token)])?;

        let response = self
            .http_client
            .post(format!("{}/services/oauth2/revoke", self.login_url))
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::new(ErrorKind::OAuth {
                error: "revoke_failed".to_string(),
                description: format!("token endpoint returned {}", response.status()),
            }));
        }

        Ok(())
    }

    async fn token_request(&self, params: &[(&str, &str)]) -> Result<TokenResponse> {
        let body = serde_urlencoded::to_string(params)?;

        let response = self
            .http_client
            .post(format!("{}/services/oauth2/token", self.login_url))
            .header("Content-Type", "application/x-www-form-urlencoded")
            .header("Accept", "application/json")
            .body(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(match serde_json::from_str::<OAuthErrorResponse>(&text) {
                Ok(error) => Error::new(ErrorKind::OAuth {
                    error: error.error,
                    description: error.error_description,
                }),
                Err(_) => Error::new(ErrorKind::Http(format!(
                    "token endpoint returned {status}"
                ))),
            });
        }

        let token: TokenResponse = serde_json::from_str(&text)?;
        debug!(instance_url = %token.instance_url, "token issued");
        Ok(token)
    }
}

/// Successful token endpoint response.
///
/// Tokens and the signature are redacted in `Debug` output.
#[derive(Clone, Deserialize, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub instance_url: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub signature: Option<String>,
    /// Milliseconds since the epoch, as a string.
    #[serde(default)]
    pub issued_at: Option<String>,
}

impl std::fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"[REDACTED]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("instance_url", &self.instance_url)
            .field("id", &self.id)
            .field("token_type", &self.token_type)
            .field("scope", &self.scope)
            .field("signature", &self.signature.as_ref().map(|_| "[REDACTED]"))
            .field("issued_at", &self.issued_at)
            .finish()
    }
}

impl TokenResponse {
    pub fn into_credential(self) -> Credential {
        let credential = Credential::new(self.instance_url, self.access_token).with_identity(
            self.id,
            self.issued_at,
            self.signature,
        );
        match self.token_type {
            Some(token_type) => credential.with_token_type(token_type),
            None => credential,
        }
    }
}

#[derive(Debug, Deserialize)]
struct OAuthErrorResponse {
    error: String,
    #[serde(default)]
    error_description: String,
}
