//! # Draft Mutations
//!
//! Operator edits to an open draft, expressed as data so they can arrive
//! over the API as well as from code.
//!
//! Every mutation maps the current draft to a new draft. Nothing is changed
//! in place, so a failed mutation leaves the draft exactly as it was.

use crate::array_field::{self, edit_array};
use crate::EditorError;
use contentdesk_common::FieldPath;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Mutation {
    /// Replace the value at a field path (atomic replacement)
    SetField { path: FieldPath, value: Value },

    /// Append an element to an array field
    AppendItem { field: FieldPath, element: Value },

    /// Remove the element at `index`; out of range is a no-op
    RemoveItem { field: FieldPath, index: usize },

    /// Replace the element at `index`; out of range is a no-op
    ReplaceItem {
        field: FieldPath,
        index: usize,
        element: Value,
    },
}

impl Mutation {
    pub fn set_field(path: FieldPath, value: impl Into<Value>) -> Self {
        Mutation::SetField {
            path,
            value: value.into(),
        }
    }

    /// Compute the draft that results from applying this mutation
    pub fn apply(&self, draft: &Value) -> Result<Value, EditorError> {
        match self {
            Mutation::SetField { path, value } => Ok(path.set(draft, value.clone())?),

            Mutation::AppendItem { field, element } => {
                edit_array(draft, field, |items| array_field::append(items, element.clone()))
            }

            Mutation::RemoveItem { field, index } => {
                edit_array(draft, field, |items| array_field::remove_at(items, *index))
            }

            Mutation::ReplaceItem {
                field,
                index,
                element,
            } => edit_array(draft, field, |items| {
                array_field::replace_at(items, *index, element.clone())
            }),
        }
    }

    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Mutation::SetField { .. } => "set_field",
            Mutation::AppendItem { .. } => "append_item",
            Mutation::RemoveItem { .. } => "remove_item",
            Mutation::ReplaceItem { .. } => "replace_item",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn path(p: &str) -> FieldPath {
        FieldPath::parse(p).unwrap()
    }

    #[test]
    fn test_set_field_nested() {
        let draft = json!({"title": "Terms", "contactInfo": {"email": "old@x.y"}});
        let next = Mutation::set_field(path("contactInfo.email"), "new@x.y")
            .apply(&draft)
            .unwrap();

        assert_eq!(next["contactInfo"]["email"], json!("new@x.y"));
        assert_eq!(draft["contactInfo"]["email"], json!("old@x.y"));
    }

    #[test]
    fn test_failed_mutation_leaves_draft() {
        let draft = json!({"title": "Terms"});
        let mutation = Mutation::AppendItem {
            field: path("title"),
            element: json!("x"),
        };

        assert!(mutation.apply(&draft).is_err());
        assert_eq!(draft, json!({"title": "Terms"}));
    }

    #[test]
    fn test_deserialize_from_api_shape() {
        let mutation: Mutation = serde_json::from_value(json!({
            "type": "replaceItem",
            "field": "workingHours",
            "index": 0,
            "element": "Mon-Fri 9-6"
        }))
        .unwrap();

        assert_eq!(
            mutation,
            Mutation::ReplaceItem {
                field: path("workingHours"),
                index: 0,
                element: json!("Mon-Fri 9-6"),
            }
        );
        assert_eq!(mutation.name(), "replace_item");
    }
}
