use crate::ids::EntityId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A store-identified JSON record (testimonial, service, contact, ...).
///
/// The id travels as `_id` on the wire; every other key is kept verbatim in
/// `fields`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "_id")]
    pub id: EntityId,

    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Record {
    pub fn new(id: EntityId, fields: Map<String, Value>) -> Self {
        Self { id, fields }
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    pub fn flag(&self, field: &str) -> Option<bool> {
        self.fields.get(field).and_then(Value::as_bool)
    }

    /// Shallow merge: keys in `partial` overwrite, all others stay
    pub fn merge(&mut self, partial: &Map<String, Value>) {
        for (key, value) in partial {
            self.fields.insert(key.clone(), value.clone());
        }
    }

    /// Fields as a JSON object, without the id
    pub fn fields_value(&self) -> Value {
        Value::Object(self.fields.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_reads_underscore_id() {
        let record: Record =
            serde_json::from_value(json!({"_id": "s-1", "title": "Audit", "active": true})).unwrap();

        assert_eq!(record.id.as_str(), "s-1");
        assert_eq!(record.get("title"), Some(&json!("Audit")));
        assert_eq!(record.flag("active"), Some(true));
        assert!(!record.fields.contains_key("_id"));
    }

    #[test]
    fn test_merge_is_shallow() {
        let mut record: Record = serde_json::from_value(json!({
            "_id": "t-1",
            "name": "Asha",
            "approved": false,
            "featured": true
        }))
        .unwrap();

        let partial = json!({"approved": true}).as_object().cloned().unwrap();
        record.merge(&partial);

        assert_eq!(record.flag("approved"), Some(true));
        assert_eq!(record.flag("featured"), Some(true));
        assert_eq!(record.get("name"), Some(&json!("Asha")));
    }
}
