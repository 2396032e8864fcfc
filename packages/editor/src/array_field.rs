//! # Array Field Editing
//!
//! Pure operations over ordered, index-addressed sequences (phone numbers,
//! service features, stat rows). Each operation returns a new sequence; the
//! input is never touched, so a caller always replaces the whole field.
//!
//! Order is significant and preserved. Duplicates and empty values are
//! allowed. Out-of-range indices are no-ops.

use crate::EditorError;
use contentdesk_common::FieldPath;
use serde_json::Value;

/// Insert at the end; the new element's index is the previous length
pub fn append<T: Clone>(items: &[T], element: T) -> Vec<T> {
    let mut next = Vec::with_capacity(items.len() + 1);
    next.extend_from_slice(items);
    next.push(element);
    next
}

/// Remove the element at `index`; later elements shift left by one
pub fn remove_at<T: Clone>(items: &[T], index: usize) -> Vec<T> {
    items
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != index)
        .map(|(_, item)| item.clone())
        .collect()
}

/// Replace the element at `index`; every other element is left as it was
pub fn replace_at<T: Clone>(items: &[T], index: usize, element: T) -> Vec<T> {
    let mut next = items.to_vec();
    if let Some(slot) = next.get_mut(index) {
        *slot = element;
    }
    next
}

/// Apply a sequence operation to the array held at `field` inside `draft`.
///
/// A missing or `null` field reads as an empty array. Returns the new draft.
pub fn edit_array<F>(draft: &Value, field: &FieldPath, op: F) -> Result<Value, EditorError>
where
    F: FnOnce(&[Value]) -> Vec<Value>,
{
    let next = match field.get(draft) {
        None | Some(Value::Null) => op(&[]),
        Some(Value::Array(items)) => op(items),
        Some(_) => return Err(EditorError::NotAnArray(field.to_string())),
    };

    Ok(field.set(draft, Value::Array(next))?)
}
