use serde::{Deserialize, Serialize};

/// A data operation, shared by the REST, composite and Bulk API paths.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Operation {
    Insert,
    Update,
    /// Match on an external id; insert when no match.
    Upsert,
    /// Soft delete (recycle bin).
    Delete,
    /// Permanent delete. Bulk API only.
    HardDelete,
    Query,
    /// Query including deleted and archived records.
    QueryAll,
}

impl Operation {
    /// Wire name used by the Bulk API.
    pub fn api_name(&self) -> &'static str {
        match self {
            Operation::Insert => "insert",
            Operation::Update => "update",
            Operation::Upsert => "upsert",
            Operation::Delete => "delete",
            Operation::HardDelete => "hardDelete",
            Operation::Query => "query",
            Operation::QueryAll => "queryAll",
        }
    }

    pub fn is_query(&self) -> bool {
        matches!(self, Operation::Query | Operation::QueryAll)
    }

    pub fn is_delete(&self) -> bool {
        matches!(self, Operation::Delete | Operation::HardDelete)
    }

    /// Whether every record must carry a record `Id`.
    pub fn requires_id(&self) -> bool {
        matches!(self, Operation::Update | Operation::Delete | Operation::HardDelete)
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.api_name())
    }
}
