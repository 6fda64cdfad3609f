//! Salesforce REST API client.
//!
//! Wraps [`SalesforceClient`] with typed single-record operations and SOQL
//! query. Collections and composite submission live in their own modules as
//! further `impl` blocks on the same type.

use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::{debug, instrument};

use sfkit_client::{ClientConfig, Credential, SalesforceClient};
use sfkit_records::document;
use sfkit_records::{Operation, Record, ID_FIELD};

use crate::error::{Error, Result};
use crate::sobject::{rejected, CreateResult, UpsertResult};

/// Salesforce REST API client.
///
/// # Example
///
/// ```rust,ignore
/// use sfkit_rest::SalesforceRestClient;
///
/// let client = SalesforceRestClient::new(credential)?;
///
/// let accounts: Vec<Account> = client.query("SELECT Id, Name FROM Account").await?;
/// let id = client.create("Account", &Record::new().with("Name", "Acme")).await?;
/// ```
#[derive(Debug, Clone)]
pub struct SalesforceRestClient {
    pub(crate) client: SalesforceClient,
}

impl SalesforceRestClient {
    pub fn new(credential: impl Into<Arc<Credential>>) -> Result<Self> {
        Ok(Self {
            client: SalesforceClient::new(credential)?,
        })
    }

    pub fn with_config(
        credential: impl Into<Arc<Credential>>,
        config: ClientConfig,
    ) -> Result<Self> {
        Ok(Self {
            client: SalesforceClient::with_config(credential, config)?,
        })
    }

    pub fn from_client(client: SalesforceClient) -> Self {
        Self { client }
    }

    pub fn inner(&self) -> &SalesforceClient {
        &self.client
    }

    pub fn instance_url(&self) -> &str {
        self.client.instance_url()
    }

    pub fn api_version(&self) -> &str {
        self.client.api_version()
    }

    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.client = self.client.with_api_version(version);
        self
    }

    // =========================================================================
    // CRUD Operations
    // =========================================================================

    /// Create a record and return its new id.
    #[instrument(skip(self, record))]
    pub async fn create(&self, object: &str, record: &Record) -> Result<String> {
        let body = document::shape(record, Operation::Insert);
        let result: CreateResult = self
            .client
            .rest_post(&sobject_path(object, &[]), &body)
            .await?;

        if !result.success {
            return Err(rejected(None, result.errors).into());
        }
        debug!(object, id = %result.id, "record created");
        Ok(result.id)
    }

    /// Update the record named by its `Id` field. Returns that id.
    #[instrument(skip(self, record))]
    pub async fn update(&self, object: &str, record: &Record) -> Result<String> {
        let (id, body) = route(record, ID_FIELD, 0)?;
        self.client
            .patch_json(&self.client.rest_url(&sobject_path(object, &[&id])), &body)
            .await?;
        debug!(object, id = %id, "record updated");
        Ok(id)
    }

    /// Insert or update by external id.
    ///
    /// The external-id value is taken from the record and sent in the URL,
    /// not the body.
    #[instrument(skip(self, record))]
    pub async fn upsert(
        &self,
        object: &str,
        external_id_field: &str,
        record: &Record,
    ) -> Result<UpsertResult> {
        let (value, body) = route(record, external_id_field, 0)?;
        let url = self
            .client
            .rest_url(&sobject_path(object, &[external_id_field, &value]));
        let response = self.client.patch_json(&url, &body).await?;

        let result = if response.status() == 204 {
            UpsertResult::updated_without_body()
        } else {
            response.json::<UpsertResult>().await?
        };
        if !result.success {
            return Err(rejected(result.id, result.errors).into());
        }
        debug!(object, created = result.created, "record upserted");
        Ok(result)
    }

    /// Delete the record named by its `Id` field. Returns that id.
    #[instrument(skip(self, record))]
    pub async fn delete(&self, object: &str, record: &Record) -> Result<String> {
        let (id, _) = route(record, ID_FIELD, 0)?;
        self.client
            .delete_request(&self.client.rest_url(&sobject_path(object, &[&id])))
            .await?;
        debug!(object, id = %id, "record deleted");
        Ok(id)
    }

    /// Fetch one record, optionally limited to `fields`.
    #[instrument(skip(self))]
    pub async fn get<T: DeserializeOwned>(
        &self,
        object: &str,
        id: &str,
        fields: Option<&[&str]>,
    ) -> Result<T> {
        let mut path = sobject_path(object, &[id]);
        if let Some(fields) = fields.filter(|f| !f.is_empty()) {
            path.push_str("?fields=");
            path.push_str(&fields.join(","));
        }
        self.client.rest_get(&path).await.map_err(Into::into)
    }

    // =========================================================================
    // Query Operations
    // =========================================================================

    /// Run a SOQL query and return every record, following `nextRecordsUrl`.
    #[instrument(skip(self))]
    pub async fn query<T: DeserializeOwned>(&self, soql: &str) -> Result<Vec<T>> {
        self.client.query_all(soql).await.map_err(Into::into)
    }
}

/// `sobjects/{object}/{segment}/...`, each segment percent-encoded.
pub(crate) fn sobject_path(object: &str, segments: &[&str]) -> String {
    let mut path = format!("sobjects/{object}");
    for segment in segments {
        path.push('/');
        path.push_str(&urlencoding::encode(segment));
    }
    path
}

/// Split `field` out of record `index` as its routing key.
pub(crate) fn route(record: &Record, field: &str, index: usize) -> Result<(String, Record)> {
    match document::split_key(record, field) {
        Ok((key, body)) if !key.is_empty() => Ok((key, body)),
        _ => Err(Error::missing_field(field, index)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> SalesforceRestClient {
        SalesforceRestClient::new(Credential::new(server.uri(), "token")).unwrap()
    }

    fn record(value: serde_json::Value) -> Record {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_api_version_override() {
        let client = SalesforceRestClient::new(Credential::new("https://na1.salesforce.com", "t"))
            .unwrap()
            .with_api_version("60.0");
        assert_eq!(client.api_version(), "60.0");
        assert_eq!(client.instance_url(), "https://na1.salesforce.com");
    }

    #[test]
    fn test_sobject_path_encodes_keys() {
        assert_eq!(sobject_path("Account", &[]), "sobjects/Account");
        assert_eq!(
            sobject_path("Account", &["Ext__c", "A/B 1"]),
            "sobjects/Account/Ext__c/A%2FB%201"
        );
    }

    #[tokio::test]
    async fn test_create_sends_body_without_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/services/data/v62.0/sobjects/Account"))
            .and(body_json(json!({"Name": "Acme"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": "001A", "success": true, "errors": []
            })))
            .expect(1)
            .mount(&server)
            .await;

        let id = client(&server)
            .create("Account", &record(json!({"Id": "ignored", "Name": "Acme"})))
            .await
            .unwrap();
        assert_eq!(id, "001A");
    }

    #[tokio::test]
    async fn test_update_routes_by_id() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/services/data/v62.0/sobjects/Account/001A"))
            .and(body_json(json!({"Name": "Renamed"})))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let id = client(&server)
            .update("Account", &record(json!({"Id": "001A", "Name": "Renamed"})))
            .await
            .unwrap();
        assert_eq!(id, "001A");
    }

    #[tokio::test]
    async fn test_update_without_id_sends_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .respond_with(ResponseTemplate::new(204))
            .expect(0)
            .mount(&server)
            .await;

        let err = client(&server)
            .update("Account", &record(json!({"Id": "", "Name": "Renamed"})))
            .await
            .unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Validation(_)));
    }

    #[tokio::test]
    async fn test_upsert_value_travels_in_url() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/services/data/v62.0/sobjects/Account/Ext__c/E-1"))
            .and(body_json(json!({"Name": "Acme"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": "001A", "success": true, "created": true, "errors": []
            })))
            .mount(&server)
            .await;

        let result = client(&server)
            .upsert(
                "Account",
                "Ext__c",
                &record(json!({"Ext__c": "E-1", "Name": "Acme"})),
            )
            .await
            .unwrap();
        assert!(result.created);
        assert_eq!(result.id.as_deref(), Some("001A"));
    }

    #[tokio::test]
    async fn test_upsert_no_content_is_update() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/services/data/v62.0/sobjects/Account/Ext__c/E-1"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let result = client(&server)
            .upsert("Account", "Ext__c", &record(json!({"Ext__c": "E-1"})))
            .await
            .unwrap();
        assert!(!result.created);
        assert!(result.success);
    }

    #[tokio::test]
    async fn test_delete_routes_by_id() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/services/data/v62.0/sobjects/Contact/003B"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let id = client(&server)
            .delete("Contact", &record(json!({"Id": "003B", "LastName": "Doe"})))
            .await
            .unwrap();
        assert_eq!(id, "003B");
    }

    #[tokio::test]
    async fn test_remote_error_is_client_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/services/data/v62.0/sobjects/Account"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!([
                {"errorCode": "REQUIRED_FIELD_MISSING", "message": "Required fields are missing: [Name]", "fields": ["Name"]}
            ])))
            .mount(&server)
            .await;

        let err = client(&server)
            .create("Account", &record(json!({"Phone": "555"})))
            .await
            .unwrap_err();
        match err.kind {
            ErrorKind::Client(sfkit_client::ErrorKind::SalesforceApi {
                status, error_code, ..
            }) => {
                assert_eq!(status, 400);
                assert_eq!(error_code, "REQUIRED_FIELD_MISSING");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_get_with_fields() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/services/data/v62.0/sobjects/Account/001A"))
            .and(query_param("fields", "Id,Name"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"Id": "001A", "Name": "Acme"})),
            )
            .mount(&server)
            .await;

        let account: Record = client(&server)
            .get("Account", "001A", Some(&["Id", "Name"]))
            .await
            .unwrap();
        assert_eq!(account.get("Name"), Some(&json!("Acme")));
    }

    #[tokio::test]
    async fn test_query_follows_next_records_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/services/data/v62.0/query"))
            .and(query_param("q", "SELECT Name FROM Account"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "totalSize": 2,
                "done": false,
                "nextRecordsUrl": "/services/data/v62.0/query/01gxx-2000",
                "records": [{"Name": "Acme"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/services/data/v62.0/query/01gxx-2000"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "totalSize": 2,
                "done": true,
                "records": [{"Name": "Globex"}]
            })))
            .mount(&server)
            .await;

        #[derive(serde::Deserialize)]
        struct Account {
            #[serde(rename = "Name")]
            name: String,
        }

        let accounts: Vec<Account> = client(&server)
            .query("SELECT Name FROM Account")
            .await
            .unwrap();
        let names: Vec<&str> = accounts.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Acme", "Globex"]);
    }
}
