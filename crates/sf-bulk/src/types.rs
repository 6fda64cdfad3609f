//! Bulk API 2.0 wire types.

use serde::{Deserialize, Deserializer, Serialize};
use sfkit_records::Operation;
use std::fmt;

/// Job metadata reports `apiVersion` as either `62.0` or `"62.0"`.
pub(crate) fn deserialize_api_version<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ApiVersion {
        Float(f64),
        String(String),
    }

    Option::<ApiVersion>::deserialize(deserializer).map(|opt| {
        opt.map(|v| match v {
            ApiVersion::Float(f) => format!("{:.1}", f),
            ApiVersion::String(s) => s,
        })
    })
}

/// Lifecycle of a bulk job.
///
/// `Open` and `UploadComplete` are set by the caller; every later state is
/// only ever observed by fetching the job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobState {
    Open,
    UploadComplete,
    InProgress,
    Aborted,
    JobComplete,
    Failed,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobState::Aborted | JobState::JobComplete | JobState::Failed
        )
    }

    pub fn is_success(&self) -> bool {
        matches!(self, JobState::JobComplete)
    }

    pub fn api_name(&self) -> &'static str {
        match self {
            JobState::Open => "Open",
            JobState::UploadComplete => "UploadComplete",
            JobState::InProgress => "InProgress",
            JobState::Aborted => "Aborted",
            JobState::JobComplete => "JobComplete",
            JobState::Failed => "Failed",
        }
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.api_name())
    }
}

/// Ingest and query jobs live under different resources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    Ingest,
    Query,
}

impl JobKind {
    /// Path segment under `/jobs`.
    pub fn path(&self) -> &'static str {
        match self {
            JobKind::Ingest => "ingest",
            JobKind::Query => "query",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ContentType {
    #[default]
    #[serde(rename = "CSV")]
    Csv,
}

/// Line endings of uploaded data. The tabular encoder writes LF only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LineEnding {
    #[default]
    #[serde(rename = "LF")]
    Lf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ColumnDelimiter {
    #[default]
    #[serde(rename = "COMMA")]
    Comma,
    #[serde(rename = "TAB")]
    Tab,
    #[serde(rename = "SEMICOLON")]
    Semicolon,
    #[serde(rename = "PIPE")]
    Pipe,
    #[serde(rename = "BACKQUOTE")]
    Backquote,
    #[serde(rename = "CARET")]
    Caret,
}

impl ColumnDelimiter {
    /// The delimiter as a CSV byte.
    pub fn byte(&self) -> u8 {
        match self {
            ColumnDelimiter::Comma => b',',
            ColumnDelimiter::Tab => b'\t',
            ColumnDelimiter::Semicolon => b';',
            ColumnDelimiter::Pipe => b'|',
            ColumnDelimiter::Backquote => b'`',
            ColumnDelimiter::Caret => b'^',
        }
    }
}

// =============================================================================
// Request Types
// =============================================================================

/// Body of `POST /jobs/ingest`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateIngestJobRequest {
    pub object: String,
    pub operation: Operation,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_id_field_name: Option<String>,
    pub content_type: ContentType,
    pub column_delimiter: ColumnDelimiter,
    pub line_ending: LineEnding,
}

impl CreateIngestJobRequest {
    pub fn new(object: impl Into<String>, operation: Operation) -> Self {
        Self {
            object: object.into(),
            operation,
            external_id_field_name: None,
            content_type: ContentType::default(),
            column_delimiter: ColumnDelimiter::default(),
            line_ending: LineEnding::default(),
        }
    }

    /// Match field for upserts.
    pub fn with_external_id_field(mut self, field: impl Into<String>) -> Self {
        self.external_id_field_name = Some(field.into());
        self
    }

    pub fn with_column_delimiter(mut self, delimiter: ColumnDelimiter) -> Self {
        self.column_delimiter = delimiter;
        self
    }
}

/// Body of `POST /jobs/query`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateQueryJobRequest {
    pub query: String,
    pub operation: Operation,
    pub column_delimiter: ColumnDelimiter,
    pub line_ending: LineEnding,
}

impl CreateQueryJobRequest {
    pub fn new(soql: impl Into<String>) -> Self {
        Self {
            query: soql.into(),
            operation: Operation::Query,
            column_delimiter: ColumnDelimiter::default(),
            line_ending: LineEnding::default(),
        }
    }

    /// Include deleted and archived records.
    pub fn with_query_all(mut self) -> Self {
        self.operation = Operation::QueryAll;
        self
    }
}

/// Body of `PATCH /jobs/{kind}/{id}`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct UpdateJobStateRequest {
    pub state: JobState,
}

impl UpdateJobStateRequest {
    /// Close a job for processing.
    pub fn upload_complete() -> Self {
        Self {
            state: JobState::UploadComplete,
        }
    }

    pub fn aborted() -> Self {
        Self {
            state: JobState::Aborted,
        }
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// Job resource as returned by create, close, abort and status calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobInfo {
    pub id: String,
    pub state: JobState,
    #[serde(default)]
    pub object: Option<String>,
    #[serde(default)]
    pub operation: Option<Operation>,
    #[serde(default)]
    pub external_id_field_name: Option<String>,
    #[serde(default)]
    pub number_records_processed: u64,
    #[serde(default)]
    pub number_records_failed: u64,
    #[serde(default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub created_date: Option<String>,
    #[serde(default)]
    pub system_modstamp: Option<String>,
    #[serde(default, deserialize_with = "deserialize_api_version")]
    pub api_version: Option<String>,
}

impl JobInfo {
    /// `errorMessage`, unless the server sent it empty.
    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref().filter(|m| !m.is_empty())
    }
}

/// One page of query job results.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResultsPage {
    /// Header row first, then data rows.
    pub rows: Vec<Vec<String>>,
    /// Locator of the next page; `None` on the last page.
    pub locator: Option<String>,
    /// `Sforce-NumberOfRecords` for this page.
    pub number_of_records: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_job_state_terminal() {
        assert!(!JobState::Open.is_terminal());
        assert!(!JobState::UploadComplete.is_terminal());
        assert!(!JobState::InProgress.is_terminal());
        assert!(JobState::JobComplete.is_terminal());
        assert!(JobState::Failed.is_terminal());
        assert!(JobState::Aborted.is_terminal());
        assert!(JobState::JobComplete.is_success());
        assert!(!JobState::Aborted.is_success());
    }

    #[test]
    fn test_create_ingest_job_request_body() {
        let request = CreateIngestJobRequest::new("Account", Operation::Upsert)
            .with_external_id_field("ExternalId__c");
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "object": "Account",
                "operation": "upsert",
                "externalIdFieldName": "ExternalId__c",
                "contentType": "CSV",
                "columnDelimiter": "COMMA",
                "lineEnding": "LF"
            })
        );

        let insert = CreateIngestJobRequest::new("Account", Operation::HardDelete);
        let body = serde_json::to_value(&insert).unwrap();
        assert_eq!(body["operation"], "hardDelete");
        assert!(body.get("externalIdFieldName").is_none());
    }

    #[test]
    fn test_create_query_job_request_body() {
        let request = CreateQueryJobRequest::new("SELECT Id FROM Account").with_query_all();
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["operation"], "queryAll");
        assert_eq!(body["query"], "SELECT Id FROM Account");
    }

    #[test]
    fn test_update_state_body() {
        assert_eq!(
            serde_json::to_value(UpdateJobStateRequest::upload_complete()).unwrap(),
            json!({"state": "UploadComplete"})
        );
        assert_eq!(
            serde_json::to_value(UpdateJobStateRequest::aborted()).unwrap(),
            json!({"state": "Aborted"})
        );
    }

    #[test]
    fn test_job_info_minimal_and_full() {
        let minimal: JobInfo =
            serde_json::from_value(json!({"id": "750xx", "state": "Open"})).unwrap();
        assert_eq!(minimal.state, JobState::Open);
        assert_eq!(minimal.number_records_failed, 0);
        assert!(minimal.error_message().is_none());

        let full: JobInfo = serde_json::from_value(json!({
            "id": "750xx",
            "state": "Failed",
            "object": "Account",
            "operation": "insert",
            "numberRecordsProcessed": 10,
            "numberRecordsFailed": 2,
            "errorMessage": "InvalidBatch : Field name not found : Foo",
            "apiVersion": 62.0
        }))
        .unwrap();
        assert_eq!(full.operation, Some(Operation::Insert));
        assert_eq!(full.number_records_failed, 2);
        assert_eq!(full.api_version.as_deref(), Some("62.0"));
        assert!(full.error_message().unwrap().starts_with("InvalidBatch"));
    }

    #[test]
    fn test_empty_error_message_is_none() {
        let job: JobInfo = serde_json::from_value(json!({
            "id": "750xx", "state": "JobComplete", "errorMessage": ""
        }))
        .unwrap();
        assert!(job.error_message().is_none());
    }
}
