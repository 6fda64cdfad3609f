//! Credential-bound client with URL building and typed JSON helpers.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;

use crate::client::SfHttpClient;
use crate::config::ClientConfig;
use crate::credential::Credential;
use crate::error::Result;
use crate::request::{RequestBuilder, RequestMethod};
use crate::response::Response;
use crate::DEFAULT_API_VERSION;

/// Salesforce API client bound to one [`Credential`].
///
/// Clones share the same credential and connection pool. The access token
/// never appears in `Debug` output or tracing spans.
#[derive(Clone)]
pub struct SalesforceClient {
    http: SfHttpClient,
    credential: Arc<Credential>,
    api_version: String,
}

impl std::fmt::Debug for SalesforceClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SalesforceClient")
            .field("instance_url", &self.credential.instance_url())
            .field("access_token", &"[REDACTED]")
            .field("api_version", &self.api_version)
            .finish_non_exhaustive()
    }
}

impl SalesforceClient {
    pub fn new(credential: impl Into<Arc<Credential>>) -> Result<Self> {
        Self::with_config(credential, ClientConfig::default())
    }

    pub fn with_config(
        credential: impl Into<Arc<Credential>>,
        config: ClientConfig,
    ) -> Result<Self> {
        Ok(Self {
            http: SfHttpClient::new(config)?,
            credential: credential.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
        })
    }

    /// Set the API version (e.g., "62.0").
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    pub fn credential(&self) -> &Arc<Credential> {
        &self.credential
    }

    pub fn instance_url(&self) -> &str {
        self.credential.instance_url()
    }

    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// Resolve `path` against the instance URL. Absolute URLs pass through.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}/{}", self.instance_url(), path.trim_start_matches('/'))
        }
    }

    /// `rest_url("sobjects/Account")` -> `{instance}/services/data/v62.0/sobjects/Account`
    pub fn rest_url(&self, path: &str) -> String {
        format!(
            "{}/services/data/v{}/{}",
            self.instance_url(),
            self.api_version,
            path.trim_start_matches('/')
        )
    }

    /// `bulk_url("ingest")` -> `{instance}/services/data/v62.0/jobs/ingest`
    pub fn bulk_url(&self, path: &str) -> String {
        format!(
            "{}/services/data/v{}/jobs/{}",
            self.instance_url(),
            self.api_version,
            path.trim_start_matches('/')
        )
    }

    /// An authenticated request builder.
    pub fn request(&self, method: RequestMethod, url: &str) -> RequestBuilder {
        self.http
            .request(method, url)
            .bearer_auth(self.credential.access_token())
    }

    pub fn get(&self, url: &str) -> RequestBuilder {
        self.request(RequestMethod::Get, url)
    }

    pub fn post(&self, url: &str) -> RequestBuilder {
        self.request(RequestMethod::Post, url)
    }

    pub fn patch(&self, url: &str) -> RequestBuilder {
        self.request(RequestMethod::Patch, url)
    }

    pub fn put(&self, url: &str) -> RequestBuilder {
        self.request(RequestMethod::Put, url)
    }

    pub fn delete(&self, url: &str) -> RequestBuilder {
        self.request(RequestMethod::Delete, url)
    }

    /// Execute a request and return the raw (successful) response.
    pub async fn execute(&self, request: RequestBuilder) -> Result<Response> {
        self.http.execute(request).await
    }

    #[instrument(skip(self), fields(url = %url))]
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self.http.execute(self.get(&self.url(url))).await?;
        response.json().await
    }

    pub async fn rest_get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.get_json(&self.rest_url(path)).await
    }

    #[instrument(skip(self, body), fields(url = %url))]
    pub async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T> {
        let request = self.post(&self.url(url)).json(body)?;
        self.http.execute(request).await?.json().await
    }

    pub async fn rest_post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T> {
        self.post_json(&self.rest_url(path), body).await
    }

    /// PATCH with a JSON body. Success responses are usually `204 No Content`.
    #[instrument(skip(self, body), fields(url = %url))]
    pub async fn patch_json<B: Serialize + ?Sized>(&self, url: &str, body: &B) -> Result<Response> {
        let request = self.patch(&self.url(url)).json(body)?;
        self.http.execute(request).await
    }

    #[instrument(skip(self), fields(url = %url))]
    pub async fn delete_request(&self, url: &str) -> Result<()> {
        self.http.execute(self.delete(&self.url(url))).await?;
        Ok(())
    }

    /// Run a SOQL query and follow `nextRecordsUrl` until every page is read.
    #[instrument(skip(self, soql))]
    pub async fn query_all<T: DeserializeOwned>(&self, soql: &str) -> Result<Vec<T>> {
        let url = format!("{}?q={}", self.rest_url("query"), urlencoding::encode(soql));
        let mut page: QueryResult<T> = self.get_json(&url).await?;
        let mut records = std::mem::take(&mut page.records);

        while !page.done {
            let Some(next) = page.next_records_url.take() else {
                break;
            };
            page = self.get_json(&next).await?;
            records.append(&mut page.records);
        }

        Ok(records)
    }
}

/// One page of a SOQL query.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueryResult<T> {
    #[serde(rename = "totalSize")]
    pub total_size: u64,

    pub done: bool,

    #[serde(rename = "nextRecordsUrl", default)]
    pub next_records_url: Option<String>,

    pub records: Vec<T>,
}
