//! # Field Paths
//!
//! Dotted addresses into a JSON payload: `contactInfo.email`, `phone.1`.
//! A segment addresses an object key, or an array index when the value it is
//! applied to is an array. The empty path addresses the whole payload.

use crate::error::CommonError;
use crate::result::CommonResult;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    /// The path addressing the whole payload
    pub fn root() -> Self {
        Self::default()
    }

    pub fn parse(path: &str) -> CommonResult<Self> {
        if path.is_empty() {
            return Ok(Self::root());
        }

        let segments: Vec<String> = path.split('.').map(str::to_string).collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(CommonError::InvalidPath(path.to_string()));
        }

        Ok(Self { segments })
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Extend the path by one segment
    pub fn join(&self, segment: impl Into<String>) -> Self {
        let mut segments = self.segments.clone();
        segments.push(segment.into());
        Self { segments }
    }

    /// Resolve the path against a payload
    pub fn get<'a>(&self, root: &'a Value) -> Option<&'a Value> {
        self.segments
            .iter()
            .try_fold(root, |current, segment| match current {
                Value::Object(map) => map.get(segment),
                Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            })
    }

    /// Produce a copy of `root` with the value at this path replaced.
    ///
    /// Missing object keys (and `null` intermediates) are created. Array
    /// indices must already exist; growing an array is an array-field
    /// operation, not a path write.
    pub fn set(&self, root: &Value, value: Value) -> CommonResult<Value> {
        self.set_in(root, &self.segments, value)
    }

    fn set_in(&self, current: &Value, segments: &[String], value: Value) -> CommonResult<Value> {
        let Some((segment, rest)) = segments.split_first() else {
            return Ok(value);
        };

        match current {
            Value::Object(map) => {
                let child = map.get(segment).unwrap_or(&Value::Null);
                let replaced = self.set_in(child, rest, value)?;
                let mut map = map.clone();
                map.insert(segment.clone(), replaced);
                Ok(Value::Object(map))
            }
            Value::Null => {
                let replaced = self.set_in(&Value::Null, rest, value)?;
                let mut map = serde_json::Map::new();
                map.insert(segment.clone(), replaced);
                Ok(Value::Object(map))
            }
            Value::Array(items) => {
                let index = segment.parse::<usize>().map_err(|_| self.unresolved(format!(
                    "{:?} is not an array index",
                    segment
                )))?;
                let child = items.get(index).ok_or_else(|| {
                    self.unresolved(format!("index {} out of range (len {})", index, items.len()))
                })?;
                let replaced = self.set_in(child, rest, value)?;
                let mut items = items.clone();
                items[index] = replaced;
                Ok(Value::Array(items))
            }
            _ => Err(self.unresolved(format!("cannot descend into scalar at {:?}", segment))),
        }
    }

    fn unresolved(&self, reason: String) -> CommonError {
        CommonError::Unresolved {
            path: self.to_string(),
            reason,
        }
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

impl FromStr for FieldPath {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for FieldPath {
    type Error = CommonError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<FieldPath> for String {
    fn from(path: FieldPath) -> Self {
        path.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_rejects_empty_segments() {
        assert!(FieldPath::parse("contactInfo..email").is_err());
        assert!(FieldPath::parse(".title").is_err());
        assert!(FieldPath::parse("").unwrap().is_root());
    }

    #[test]
    fn test_get_walks_objects_and_arrays() {
        let doc = json!({"contactInfo": {"email": "a@b.c"}, "phone": ["111", "222"]});

        let email = FieldPath::parse("contactInfo.email").unwrap();
        assert_eq!(email.get(&doc), Some(&json!("a@b.c")));

        let second = FieldPath::parse("phone.1").unwrap();
        assert_eq!(second.get(&doc), Some(&json!("222")));

        assert_eq!(FieldPath::parse("phone.7").unwrap().get(&doc), None);
        assert_eq!(FieldPath::root().get(&doc), Some(&doc));
    }

    #[test]
    fn test_set_returns_copy_and_leaves_original() {
        let doc = json!({"title": "Privacy Policy", "contactInfo": {"phone": "1"}});
        let path = FieldPath::parse("contactInfo.phone").unwrap();

        let updated = path.set(&doc, json!("2")).unwrap();

        assert_eq!(updated["contactInfo"]["phone"], json!("2"));
        assert_eq!(updated["title"], json!("Privacy Policy"));
        assert_eq!(doc["contactInfo"]["phone"], json!("1"));
    }

    #[test]
    fn test_set_creates_missing_keys() {
        let updated = FieldPath::parse("a.b").unwrap().set(&json!({}), json!(1)).unwrap();
        assert_eq!(updated, json!({"a": {"b": 1}}));
    }

    #[test]
    fn test_set_out_of_range_index_fails() {
        let doc = json!({"phone": ["111"]});
        let err = FieldPath::parse("phone.3").unwrap().set(&doc, json!("x")).unwrap_err();
        assert!(matches!(err, CommonError::Unresolved { .. }));
    }

    #[test]
    fn test_serde_uses_dotted_form() {
        let path: FieldPath = serde_json::from_str("\"contactInfo.address\"").unwrap();
        assert_eq!(path.segments(), ["contactInfo", "address"]);
        assert_eq!(serde_json::to_string(&path).unwrap(), "\"contactInfo.address\"");
    }
}
