//! JSON bodies for REST, sObject Collections and composite requests.

use serde_json::{json, Value};

use crate::operation::Operation;
use crate::record::{FieldAccess, FieldNotFound, Record, ATTRIBUTES};
use crate::ID_FIELD;

/// The payload fields an operation sends for `record`.
///
/// - insert: everything but `Id`
/// - update / upsert: every field
/// - delete / hard delete: only `Id`
///
/// Record metadata (`attributes`) is always dropped.
pub fn shape(record: &Record, operation: Operation) -> Record {
    match operation {
        Operation::Delete | Operation::HardDelete => {
            let mut only_id = Record::new();
            if let Some(id) = record.get(ID_FIELD) {
                only_id.insert(ID_FIELD, id.clone());
            }
            only_id
        }
        _ => {
            let mut body = record.clone();
            body.remove(ATTRIBUTES);
            if operation == Operation::Insert {
                body.remove(ID_FIELD);
            }
            body
        }
    }
}

/// Split the routing key out of a record: the key's value goes in the URL,
/// the rest becomes the body. `Id` is never part of the body.
pub fn split_key(record: &Record, key_field: &str) -> Result<(String, Record), FieldNotFound> {
    let key = record.field(key_field)?;
    let mut body = record.clone();
    body.remove(ATTRIBUTES);
    body.remove(key_field);
    body.remove(ID_FIELD);
    Ok((key, body))
}

/// A collection entry: the shaped record tagged with its sObject type.
pub fn collection_entry(record: &Record, object: &str, operation: Operation) -> Value {
    let mut entry = Record::new().with(ATTRIBUTES, json!({ "type": object }));
    for (name, value) in shape(record, operation).into_map() {
        entry.insert(name, value);
    }
    entry.into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account() -> Record {
        serde_json::from_value(json!({
            "attributes": {"type": "Account", "url": "/services/data/v62.0/sobjects/Account/001A"},
            "Id": "001A",
            "Name": "Acme",
            "ExternalId__c": "E-1"
        }))
        .unwrap()
    }

    #[test]
    fn test_insert_drops_id() {
        let body = shape(&account(), Operation::Insert);
        assert_eq!(
            Value::from(body),
            json!({"Name": "Acme", "ExternalId__c": "E-1"})
        );
    }

    #[test]
    fn test_update_keeps_id() {
        let body = shape(&account(), Operation::Update);
        assert_eq!(
            Value::from(body),
            json!({"Id": "001A", "Name": "Acme", "ExternalId__c": "E-1"})
        );
    }

    #[test]
    fn test_delete_keeps_only_id() {
        assert_eq!(
            Value::from(shape(&account(), Operation::Delete)),
            json!({"Id": "001A"})
        );
        assert!(shape(&Record::new().with("Name", "x"), Operation::HardDelete).is_empty());
    }

    #[test]
    fn test_split_key() {
        let (key, body) = split_key(&account(), "ExternalId__c").unwrap();
        assert_eq!(key, "E-1");
        assert_eq!(Value::from(body), json!({"Name": "Acme"}));

        let (id, body) = split_key(&account(), "Id").unwrap();
        assert_eq!(id, "001A");
        assert_eq!(
            Value::from(body),
            json!({"Name": "Acme", "ExternalId__c": "E-1"})
        );

        assert!(split_key(&account(), "Missing__c").is_err());
    }

    #[test]
    fn test_collection_entry_tags_type() {
        let entry = collection_entry(&account(), "Account", Operation::Insert);
        assert_eq!(
            entry,
            json!({"attributes": {"type": "Account"}, "Name": "Acme", "ExternalId__c": "E-1"})
        );
    }
}
