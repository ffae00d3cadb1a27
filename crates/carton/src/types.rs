//! Core value types shared by the providers and the orchestrator.
//!
//! Everything here is a plain data carrier: metadata documents, the
//! content-hash join key, and the per-call indexing options. None of these
//! types talk to a backend.

use std::fmt;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Opaque identifier of a payload in the content store.
///
/// Hashes are produced only by a [`ContentStoreProvider`] when a payload is
/// stored; this type never inspects or re-derives them. The hash is the join
/// key between a stored payload and its indexed metadata.
///
/// [`ContentStoreProvider`]: crate::provider::ContentStoreProvider
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    pub fn new(hash: impl Into<String>) -> Self {
        Self(hash.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ContentHash {
    fn from(hash: String) -> Self {
        Self(hash)
    }
}

impl From<&str> for ContentHash {
    fn from(hash: &str) -> Self {
        Self(hash.to_string())
    }
}

/// A single attribute value attached to an indexed document.
///
/// Serialized untagged so documents read and write as natural JSON. Integers
/// and floats are kept apart on the Rust side; range comparisons coerce the
/// two numerically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Int(i64),
    Num(f64),
    Str(String),
}

impl FieldValue {
    /// Numeric view of the value, if it has one.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Int(i) => Some(*i as f64),
            FieldValue::Num(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&FieldValue> for Value {
    fn from(value: &FieldValue) -> Self {
        match value {
            FieldValue::Bool(b) => Value::Bool(*b),
            FieldValue::Int(i) => Value::Number((*i).into()),
            FieldValue::Num(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            FieldValue::Str(s) => Value::String(s.clone()),
        }
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Int(value as i64)
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        FieldValue::Int(value as i64)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Num(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Str(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Str(value)
    }
}

/// A named key/value attribute of a document.
///
/// Names are unique within one document; order is irrelevant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexField {
    pub name: String,
    pub value: FieldValue,
}

impl IndexField {
    pub fn new(name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// The indexed-metadata record associated with one content hash in one named
/// index.
///
/// Re-indexing the same `(index_name, document_id)` replaces the record
/// wholesale; fields are never merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub index_name: String,
    pub document_id: String,
    pub content_hash: ContentHash,
    pub content_type: Option<String>,
    pub fields: Vec<IndexField>,
}

impl DocumentMetadata {
    /// Look up an attribute value by name.
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| &f.value)
    }
}

/// Result of every indexing operation: the document id under which the
/// metadata is findable, and the content hash it points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdAndHash {
    pub document_id: String,
    pub content_hash: ContentHash,
}

/// A document joined with its stored payload.
///
/// When `metadata` is `None` the payload is empty. This is the "not found"
/// sentinel returned by [`Carton::get_by_id`] so existence-checking callers
/// do not have to route control flow through an error.
///
/// [`Carton::get_by_id`]: crate::store::Carton::get_by_id
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataAndPayload {
    pub metadata: Option<DocumentMetadata>,
    pub payload: Bytes,
}

impl MetadataAndPayload {
    /// The absent-metadata/empty-payload sentinel.
    pub fn not_found() -> Self {
        Self {
            metadata: None,
            payload: Bytes::new(),
        }
    }

    pub fn is_found(&self) -> bool {
        self.metadata.is_some()
    }
}

/// Per-call indexing options.
///
/// One canonical signature per operation takes this struct instead of a chain
/// of parameter-count overloads; all defaulting lives here. `document_id`
/// left unset asks the index provider to generate one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexRequest {
    pub index_name: String,
    pub document_id: Option<String>,
    pub content_type: Option<String>,
    pub fields: Vec<IndexField>,
}

impl IndexRequest {
    pub fn new(index_name: impl Into<String>) -> Self {
        Self {
            index_name: index_name.into(),
            document_id: None,
            content_type: None,
            fields: Vec::new(),
        }
    }

    pub fn with_id(mut self, document_id: impl Into<String>) -> Self {
        self.document_id = Some(document_id.into());
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.fields.push(IndexField::new(name, value));
        self
    }

    pub fn with_fields(mut self, fields: impl IntoIterator<Item = IndexField>) -> Self {
        self.fields.extend(fields);
        self
    }
}
