use std::collections::BTreeMap;
use std::fmt;

use bytes::Bytes;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::Value;

/// An uploaded file part.
///
/// Opaque to the gateway: the bytes are handed to the action untouched. When a
/// payload is echoed back to a caller (integrity errors) only the descriptor is
/// serialized, never the contents.
#[derive(Clone, PartialEq, Eq)]
pub struct FileHandle {
    /// Client-supplied file name, if the part carried one.
    pub filename: Option<String>,
    /// Declared media type of the part.
    pub content_type: Option<String>,
    /// Raw part contents.
    pub data: Bytes,
}

impl FileHandle {
    #[must_use]
    pub fn new(filename: Option<String>, content_type: Option<String>, data: Bytes) -> Self {
        Self {
            filename,
            content_type,
            data,
        }
    }

    /// Size of the part in bytes.
    #[must_use]
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

impl fmt::Debug for FileHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileHandle")
            .field("filename", &self.filename)
            .field("content_type", &self.content_type)
            .field("size", &self.size())
            .finish()
    }
}

impl Serialize for FileHandle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("filename", &self.filename)?;
        map.serialize_entry("content_type", &self.content_type)?;
        map.serialize_entry("size", &self.size())?;
        map.end()
    }
}

/// A single value in a [`CallPayload`].
///
/// Form and query input folds into `Text` (one value) or `List` (repeated
/// field). JSON documents keep their decoded shape in `Json`. Uploaded parts
/// are `File`.
#[derive(Debug, Clone, PartialEq)]
pub enum PayloadValue {
    Text(String),
    List(Vec<String>),
    Json(Value),
    File(FileHandle),
}

impl PayloadValue {
    /// Returns the value as a string slice when it is a scalar string.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) | Self::Json(Value::String(s)) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Returns the file handle when the value is an uploaded part.
    #[must_use]
    pub fn as_file(&self) -> Option<&FileHandle> {
        match self {
            Self::File(file) => Some(file),
            _ => None,
        }
    }

    /// Converts the value into plain JSON. Files become their descriptor.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Text(s) => Value::String(s.clone()),
            Self::List(items) => Value::Array(items.iter().cloned().map(Value::String).collect()),
            Self::Json(v) => v.clone(),
            Self::File(file) => serde_json::json!({
                "filename": file.filename,
                "content_type": file.content_type,
                "size": file.size(),
            }),
        }
    }
}

impl Serialize for PayloadValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Text(s) => serializer.serialize_str(s),
            Self::List(items) => items.serialize(serializer),
            Self::Json(v) => v.serialize(serializer),
            Self::File(file) => file.serialize(serializer),
        }
    }
}

impl From<&str> for PayloadValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for PayloadValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<Value> for PayloadValue {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

/// Canonical call data handed to an action: a flat field-name to value mapping.
///
/// Always a mapping at the top level. Decoded documents that are not objects
/// are rejected by [`CallPayload::from_json`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallPayload {
    fields: BTreeMap<String, PayloadValue>,
}

impl CallPayload {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a payload from a decoded JSON document.
    ///
    /// # Errors
    ///
    /// Returns the document back when it is not a JSON object.
    pub fn from_json(document: Value) -> Result<Self, Value> {
        match document {
            Value::Object(map) => Ok(map
                .into_iter()
                .map(|(k, v)| (k, PayloadValue::Json(v)))
                .collect()),
            other => Err(other),
        }
    }

    /// Inserts a field, returning the value it replaced.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<PayloadValue>) -> Option<PayloadValue> {
        self.fields.insert(name.into(), value.into())
    }

    pub fn remove(&mut self, name: &str) -> Option<PayloadValue> {
        self.fields.remove(name)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&PayloadValue> {
        self.fields.get(name)
    }

    /// Shorthand for `get(name).and_then(PayloadValue::as_str)`.
    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(PayloadValue::as_str)
    }

    #[must_use]
    pub fn contains_key(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &PayloadValue)> {
        self.fields.iter()
    }

    /// Renders the payload as a JSON object (files as descriptors).
    #[must_use]
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.fields
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }
}

impl FromIterator<(String, PayloadValue)> for CallPayload {
    fn from_iter<I: IntoIterator<Item = (String, PayloadValue)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

impl Serialize for CallPayload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (k, v) in &self.fields {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn from_json_accepts_objects_only() {
        let payload = CallPayload::from_json(json!({"id": "abc", "rows": [1, 2]})).unwrap();
        assert_eq!(payload.len(), 2);
        assert_eq!(payload.get_str("id"), Some("abc"));

        for bad in [json!([1, 2]), json!(7), json!("text"), json!(null)] {
            let returned = CallPayload::from_json(bad.clone()).unwrap_err();
            assert_eq!(returned, bad);
        }
    }

    #[test]
    fn to_json_describes_files_without_contents() {
        let mut payload = CallPayload::new();
        payload.insert("name", "census");
        payload.insert("tags", PayloadValue::List(vec!["a".into(), "b".into()]));
        payload.insert(
            "upload",
            PayloadValue::File(FileHandle::new(
                Some("data.csv".into()),
                Some("text/csv".into()),
                Bytes::from_static(b"a,b\n1,2\n"),
            )),
        );

        assert_eq!(
            payload.to_json(),
            json!({
                "name": "census",
                "tags": ["a", "b"],
                "upload": {"filename": "data.csv", "content_type": "text/csv", "size": 8},
            })
        );
        assert_eq!(serde_json::to_value(&payload).unwrap(), payload.to_json());
    }

    #[test]
    fn file_handle_debug_hides_bytes() {
        let file = FileHandle::new(None, None, Bytes::from_static(b"secret"));
        let rendered = format!("{file:?}");
        assert!(rendered.contains("size: 6"));
        assert!(!rendered.contains("secret"));
    }

    #[test]
    fn insert_overwrites_same_named_field() {
        let mut payload = CallPayload::new();
        payload.insert("upload", "placeholder");
        let replaced = payload.insert(
            "upload",
            PayloadValue::File(FileHandle::new(None, None, Bytes::new())),
        );
        assert_eq!(replaced, Some(PayloadValue::Text("placeholder".into())));
        assert!(payload.get("upload").unwrap().as_file().is_some());
    }
}
