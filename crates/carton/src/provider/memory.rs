//! In-memory providers backed by HashMaps.
//!
//! These are the reference implementations used by the test suite and by
//! callers that want an ephemeral carton (data is lost on drop). The index
//! provider evaluates the same native JSON DSL a real engine would receive,
//! so orchestration tests exercise the translated queries end to end.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt::Display;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use bytes::Bytes;
use serde_json::Value;
use uuid::Uuid;

use super::content::{ContentStoreError, ContentStoreProvider};
use super::index::{IndexError, IndexProvider};
use crate::page::{Page, PageRequest, Sort, SortDirection};
use crate::types::{ContentHash, DocumentMetadata, FieldValue, IndexField};

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum MemoryProviderError {
    #[error("memory provider error: {0}")]
    Internal(String),
}

fn lock_error(err: impl Display) -> MemoryProviderError {
    MemoryProviderError::Internal(format!("failed to acquire lock: {err}"))
}

/// In-memory content store, addressing payloads by their BLAKE3 hash.
#[derive(Debug, Clone, Default)]
pub struct MemoryContentStore {
    inner: Arc<RwLock<HashMap<ContentHash, Bytes>>>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct blobs held.
    pub fn len(&self) -> usize {
        self.inner.read().map(|inner| inner.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, hash: &ContentHash) -> bool {
        self.inner
            .read()
            .map(|inner| inner.contains_key(hash))
            .unwrap_or(false)
    }
}

#[async_trait]
impl ContentStoreProvider for MemoryContentStore {
    type Error = MemoryProviderError;

    async fn store(&self, payload: Bytes) -> Result<ContentHash, ContentStoreError<Self::Error>> {
        let hash = ContentHash::new(blake3::hash(&payload).to_hex().to_string());
        let mut inner = self
            .inner
            .write()
            .map_err(|e| ContentStoreError::Unavailable(lock_error(e)))?;

        tracing::debug!(hash = %hash, size = payload.len(), "blob stored");
        inner.insert(hash.clone(), payload);
        Ok(hash)
    }

    async fn fetch(&self, hash: &ContentHash) -> Result<Bytes, ContentStoreError<Self::Error>> {
        let inner = self
            .inner
            .read()
            .map_err(|e| ContentStoreError::Unavailable(lock_error(e)))?;

        inner
            .get(hash)
            .cloned()
            .ok_or_else(|| ContentStoreError::NotFound(hash.clone()))
    }
}

/// In-memory search index evaluating the supported native-DSL subset.
#[derive(Debug, Clone, Default)]
pub struct MemoryIndexProvider {
    inner: Arc<RwLock<HashMap<String, MemoryIndex>>>,
}

#[derive(Debug, Default)]
struct MemoryIndex {
    documents: HashMap<String, DocumentMetadata>,
    /// Document ids in first-indexed order; the engine's default result
    /// order when no sort is requested.
    insertion_order: Vec<String>,
}

impl MemoryIndexProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IndexProvider for MemoryIndexProvider {
    type Error = MemoryProviderError;

    async fn upsert(
        &self,
        index_name: &str,
        document_id: Option<&str>,
        hash: &ContentHash,
        content_type: Option<&str>,
        fields: &[IndexField],
    ) -> Result<String, IndexError<Self::Error>> {
        let mut inner = self
            .inner
            .write()
            .map_err(|e| IndexError::Unavailable(lock_error(e)))?;

        // like the real engine, writing to an index creates it
        let index = inner.entry(index_name.to_string()).or_default();

        let id = document_id
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let replaced = index.documents.insert(
            id.clone(),
            DocumentMetadata {
                index_name: index_name.to_string(),
                document_id: id.clone(),
                content_hash: hash.clone(),
                content_type: content_type.map(str::to_string),
                fields: fields.to_vec(),
            },
        );
        if replaced.is_none() {
            index.insertion_order.push(id.clone());
        }

        tracing::debug!(index = index_name, id = %id, hash = %hash, "document upserted");
        Ok(id)
    }

    async fn search(
        &self,
        index_name: &str,
        native_query: &Value,
        page: &PageRequest,
    ) -> Result<Page<DocumentMetadata>, IndexError<Self::Error>> {
        let inner = self
            .inner
            .read()
            .map_err(|e| IndexError::Unavailable(lock_error(e)))?;

        let Some(index) = inner.get(index_name) else {
            return Ok(Page::empty(page));
        };

        let mut matched = Vec::new();
        for id in &index.insertion_order {
            let Some(document) = index.documents.get(id) else {
                continue;
            };
            if eval_query(native_query, document).map_err(IndexError::BadQuery)? {
                matched.push(document.clone());
            }
        }

        if let Some(sort) = &page.sort {
            sort_documents(&mut matched, sort);
        }

        let total = matched.len() as u64;
        let content: Vec<_> = matched
            .into_iter()
            .skip(page.offset())
            .take(page.page_size)
            .collect();

        Ok(Page::new(content, total, page))
    }

    async fn create_index(&self, index_name: &str) -> Result<(), IndexError<Self::Error>> {
        let mut inner = self
            .inner
            .write()
            .map_err(|e| IndexError::Unavailable(lock_error(e)))?;

        inner.entry(index_name.to_string()).or_default();
        Ok(())
    }
}

/// Evaluate one native-DSL node against one document.
///
/// Supported kinds: `match_all`, `ids`, `term`, `terms`, `range`, `exists`,
/// `multi_match` (simplified to case-insensitive substring matching), and
/// `bool` with `must`/`should`/`must_not`. Anything else is a bad query.
fn eval_query(query: &Value, document: &DocumentMetadata) -> Result<bool, String> {
    let node = query
        .as_object()
        .ok_or_else(|| format!("query node must be an object: {query}"))?;
    let (kind, body) = match node.iter().next() {
        Some(entry) if node.len() == 1 => entry,
        _ => return Err(format!("query node must have exactly one key: {query}")),
    };

    match kind.as_str() {
        "match_all" => Ok(true),
        "ids" => {
            let values = body
                .get("values")
                .and_then(Value::as_array)
                .ok_or("'ids' query requires a 'values' array")?;
            Ok(values
                .iter()
                .any(|v| v.as_str() == Some(document.document_id.as_str())))
        }
        "term" => {
            let (field, expected) = single_entry(body, "term")?;
            Ok(document
                .field(field)
                .map(|value| value_matches(value, expected))
                .unwrap_or(false))
        }
        "terms" => {
            let (field, expected) = single_entry(body, "terms")?;
            let expected = expected
                .as_array()
                .ok_or("'terms' query requires an array of values")?;
            Ok(document
                .field(field)
                .map(|value| expected.iter().any(|e| value_matches(value, e)))
                .unwrap_or(false))
        }
        "range" => {
            let (field, bounds) = single_entry(body, "range")?;
            let bounds = bounds
                .as_object()
                .ok_or("'range' query requires an object of bounds")?;
            let Some(value) = document.field(field) else {
                return Ok(false);
            };
            if let Some(min) = bounds.get("gte") {
                match range_cmp(value, min) {
                    Some(Ordering::Greater) | Some(Ordering::Equal) => {}
                    _ => return Ok(false),
                }
            }
            if let Some(max) = bounds.get("lte") {
                match range_cmp(value, max) {
                    Some(Ordering::Less) | Some(Ordering::Equal) => {}
                    _ => return Ok(false),
                }
            }
            Ok(true)
        }
        "exists" => {
            let field = body
                .get("field")
                .and_then(Value::as_str)
                .ok_or("'exists' query requires a 'field' name")?;
            Ok(document.field(field).is_some())
        }
        "multi_match" => {
            let text = body
                .get("query")
                .and_then(Value::as_str)
                .ok_or("'multi_match' query requires a 'query' string")?;
            let fields = body
                .get("fields")
                .and_then(Value::as_array)
                .ok_or("'multi_match' query requires a 'fields' array")?;
            let needle = text.to_lowercase();
            for field in fields {
                let Some(name) = field.as_str() else { continue };
                if let Some(FieldValue::Str(haystack)) = document.field(name) {
                    if haystack.to_lowercase().contains(&needle) {
                        return Ok(true);
                    }
                }
            }
            Ok(false)
        }
        "bool" => eval_bool(body, document),
        other => Err(format!("unsupported query kind '{other}'")),
    }
}

fn eval_bool(body: &Value, document: &DocumentMetadata) -> Result<bool, String> {
    let body = body
        .as_object()
        .ok_or("'bool' query body must be an object")?;

    if let Some(must) = body.get("must") {
        let clauses = must.as_array().ok_or("'must' must be an array")?;
        for clause in clauses {
            if !eval_query(clause, document)? {
                return Ok(false);
            }
        }
    }

    if let Some(must_not) = body.get("must_not") {
        let clauses = must_not.as_array().ok_or("'must_not' must be an array")?;
        for clause in clauses {
            if eval_query(clause, document)? {
                return Ok(false);
            }
        }
    }

    if let Some(should) = body.get("should") {
        let clauses = should.as_array().ok_or("'should' must be an array")?;
        let minimum = body
            .get("minimum_should_match")
            .and_then(Value::as_u64)
            .unwrap_or(1) as usize;
        let mut matches = 0usize;
        for clause in clauses {
            if eval_query(clause, document)? {
                matches += 1;
                if matches >= minimum {
                    break;
                }
            }
        }
        if matches < minimum {
            return Ok(false);
        }
    }

    Ok(true)
}

fn single_entry<'a>(body: &'a Value, kind: &str) -> Result<(&'a str, &'a Value), String> {
    let object = body
        .as_object()
        .ok_or_else(|| format!("'{kind}' query body must be an object"))?;
    match object.iter().next() {
        Some((key, value)) if object.len() == 1 => Ok((key.as_str(), value)),
        _ => Err(format!("'{kind}' query must target exactly one field")),
    }
}

/// Term equality between a document value and a DSL value, coercing the two
/// numeric representations.
fn value_matches(value: &FieldValue, expected: &Value) -> bool {
    match (value, expected) {
        (FieldValue::Str(s), Value::String(e)) => s == e,
        (FieldValue::Bool(b), Value::Bool(e)) => b == e,
        _ => match (value.as_f64(), expected.as_f64()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },
    }
}

/// Compare a document value against a range bound. Strings compare
/// lexicographically, numbers numerically; anything else is incomparable.
fn range_cmp(value: &FieldValue, bound: &Value) -> Option<Ordering> {
    match (value, bound) {
        (FieldValue::Str(s), Value::String(b)) => Some(s.as_str().cmp(b.as_str())),
        _ => value.as_f64()?.partial_cmp(&bound.as_f64()?),
    }
}

fn sort_documents(documents: &mut [DocumentMetadata], sort: &Sort) {
    // stable sort: ties keep insertion order, documents missing the sort
    // attribute always go last
    documents.sort_by(|a, b| match (a.field(&sort.field), b.field(&sort.field)) {
        (Some(x), Some(y)) => {
            let ord = compare_values(x, y);
            match sort.direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

fn compare_values(a: &FieldValue, b: &FieldValue) -> Ordering {
    match (a, b) {
        (FieldValue::Str(x), FieldValue::Str(y)) => x.cmp(y),
        (FieldValue::Bool(x), FieldValue::Bool(y)) => x.cmp(y),
        _ => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::page::Sort;
    use crate::query::{translate, Query};
    use serde_json::json;

    async fn seed_index(index: &MemoryIndexProvider) {
        let docs = [
            ("d1", "en", 10, "Merkle trees for fun and profit"),
            ("d2", "fr", 25, "Arbres de Merkle"),
            ("d3", "en", 40, "Content addressing in practice"),
        ];
        for (id, lang, pages, title) in docs {
            index
                .upsert(
                    "docs",
                    Some(id),
                    &ContentHash::from(format!("hash-{id}")),
                    Some("text/plain"),
                    &[
                        IndexField::new("lang", lang),
                        IndexField::new("pages", pages),
                        IndexField::new("title", title),
                    ],
                )
                .await
                .unwrap();
        }
    }

    #[tokio::test]
    async fn test_content_store_roundtrip() {
        let store = MemoryContentStore::new();

        let data = Bytes::from("Hello, carton!");
        let hash = store.store(data.clone()).await.unwrap();
        assert!(store.contains(&hash));

        let fetched = store.fetch(&hash).await.unwrap();
        assert_eq!(fetched, data);
    }

    #[tokio::test]
    async fn test_content_store_is_content_addressed() {
        let store = MemoryContentStore::new();

        let hash1 = store.store(Bytes::from("same bytes")).await.unwrap();
        let hash2 = store.store(Bytes::from("same bytes")).await.unwrap();
        let hash3 = store.store(Bytes::from("other bytes")).await.unwrap();

        assert_eq!(hash1, hash2);
        assert_ne!(hash1, hash3);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_content_store_fetch_unknown() {
        let store = MemoryContentStore::new();
        let result = store.fetch(&ContentHash::from("no-such-hash")).await;
        assert!(matches!(result, Err(ContentStoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_upsert_generates_id_when_absent() {
        let index = MemoryIndexProvider::new();
        let id = index
            .upsert("docs", None, &ContentHash::from("h1"), None, &[])
            .await
            .unwrap();
        assert!(!id.is_empty());

        let page = index
            .search("docs", &json!({ "ids": { "values": [id] } }), &PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.total_elements, 1);
    }

    #[tokio::test]
    async fn test_upsert_replaces_wholesale() {
        let index = MemoryIndexProvider::new();
        index
            .upsert(
                "docs",
                Some("d1"),
                &ContentHash::from("h1"),
                Some("text/plain"),
                &[IndexField::new("lang", "en"), IndexField::new("pages", 10)],
            )
            .await
            .unwrap();

        index
            .upsert(
                "docs",
                Some("d1"),
                &ContentHash::from("h2"),
                Some("application/json"),
                &[IndexField::new("lang", "fr")],
            )
            .await
            .unwrap();

        let page = index
            .search("docs", &json!({ "match_all": {} }), &PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.total_elements, 1);

        let document = &page.content[0];
        assert_eq!(document.content_hash, ContentHash::from("h2"));
        assert_eq!(document.content_type.as_deref(), Some("application/json"));
        assert_eq!(document.field("lang"), Some(&FieldValue::Str("fr".into())));
        // the old "pages" attribute is gone, not merged
        assert_eq!(document.field("pages"), None);
    }

    #[tokio::test]
    async fn test_search_match_all_insertion_order() {
        let index = MemoryIndexProvider::new();
        seed_index(&index).await;

        let page = index
            .search("docs", &json!({ "match_all": {} }), &PageRequest::default())
            .await
            .unwrap();

        assert_eq!(page.total_elements, 3);
        let ids: Vec<_> = page.content.iter().map(|d| d.document_id.as_str()).collect();
        assert_eq!(ids, vec!["d1", "d2", "d3"]);
    }

    #[tokio::test]
    async fn test_search_paging_slices() {
        let index = MemoryIndexProvider::new();
        seed_index(&index).await;

        let page = index
            .search("docs", &json!({ "match_all": {} }), &PageRequest::new(1, 2))
            .await
            .unwrap();

        assert_eq!(page.total_elements, 3);
        assert_eq!(page.len(), 1);
        assert_eq!(page.content[0].document_id, "d3");
        assert_eq!(page.page_number, 1);
        assert_eq!(page.page_size, 2);
    }

    #[tokio::test]
    async fn test_search_translated_term_and_range() {
        let index = MemoryIndexProvider::new();
        seed_index(&index).await;

        let query = Query::equals("lang", "en").and(Query::at_least("pages", 20));
        let native = translate(Some(&query)).unwrap();
        let page = index
            .search("docs", &native, &PageRequest::default())
            .await
            .unwrap();

        assert_eq!(page.total_elements, 1);
        assert_eq!(page.content[0].document_id, "d3");
    }

    #[tokio::test]
    async fn test_search_translated_disjunction() {
        let index = MemoryIndexProvider::new();
        seed_index(&index).await;

        let query = Query::equals("lang", "fr").or(Query::equals("pages", 40));
        let native = translate(Some(&query)).unwrap();
        let page = index
            .search("docs", &native, &PageRequest::default())
            .await
            .unwrap();

        assert_eq!(page.total_elements, 2);
    }

    #[tokio::test]
    async fn test_search_not_equals() {
        let index = MemoryIndexProvider::new();
        seed_index(&index).await;

        let native = translate(Some(&Query::not_equals("lang", "en"))).unwrap();
        let page = index
            .search("docs", &native, &PageRequest::default())
            .await
            .unwrap();

        assert_eq!(page.total_elements, 1);
        assert_eq!(page.content[0].document_id, "d2");
    }

    #[tokio::test]
    async fn test_search_exists() {
        let index = MemoryIndexProvider::new();
        seed_index(&index).await;
        index
            .upsert("docs", Some("bare"), &ContentHash::from("h"), None, &[])
            .await
            .unwrap();

        let native = translate(Some(&Query::exists("lang"))).unwrap();
        let page = index
            .search("docs", &native, &PageRequest::default())
            .await
            .unwrap();

        assert_eq!(page.total_elements, 3);
    }

    #[tokio::test]
    async fn test_search_full_text() {
        let index = MemoryIndexProvider::new();
        seed_index(&index).await;

        let native = translate(Some(&Query::full_text(["title"], "merkle"))).unwrap();
        let page = index
            .search("docs", &native, &PageRequest::default())
            .await
            .unwrap();

        assert_eq!(page.total_elements, 2);
    }

    #[tokio::test]
    async fn test_search_sorted() {
        let index = MemoryIndexProvider::new();
        seed_index(&index).await;

        let page = index
            .search(
                "docs",
                &json!({ "match_all": {} }),
                &PageRequest::default().with_sort(Sort::desc("pages")),
            )
            .await
            .unwrap();

        let pages: Vec<_> = page
            .content
            .iter()
            .map(|d| d.field("pages").and_then(FieldValue::as_f64).unwrap())
            .collect();
        assert_eq!(pages, vec![40.0, 25.0, 10.0]);
    }

    #[tokio::test]
    async fn test_search_sorted_missing_field_goes_last() {
        let index = MemoryIndexProvider::new();
        seed_index(&index).await;
        index
            .upsert("docs", Some("bare"), &ContentHash::from("h"), None, &[])
            .await
            .unwrap();

        let page = index
            .search(
                "docs",
                &json!({ "match_all": {} }),
                &PageRequest::default().with_sort(Sort::asc("pages")),
            )
            .await
            .unwrap();

        assert_eq!(page.content.last().unwrap().document_id, "bare");
    }

    #[tokio::test]
    async fn test_search_unknown_index_is_empty() {
        let index = MemoryIndexProvider::new();
        let page = index
            .search("nope", &json!({ "match_all": {} }), &PageRequest::default())
            .await
            .unwrap();
        assert!(page.is_empty());
        assert_eq!(page.total_elements, 0);
    }

    #[tokio::test]
    async fn test_unsupported_query_kind_is_bad_query() {
        let index = MemoryIndexProvider::new();
        seed_index(&index).await;

        let result = index
            .search("docs", &json!({ "fuzzy": { "lang": "en" } }), &PageRequest::default())
            .await;
        assert!(matches!(result, Err(IndexError::BadQuery(_))));
    }

    #[tokio::test]
    async fn test_create_index_idempotent() {
        let index = MemoryIndexProvider::new();
        index.create_index("docs").await.unwrap();
        index
            .upsert("docs", Some("d1"), &ContentHash::from("h1"), None, &[])
            .await
            .unwrap();

        // creating again must not wipe the documents
        index.create_index("docs").await.unwrap();

        let page = index
            .search("docs", &json!({ "match_all": {} }), &PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.total_elements, 1);
    }
}
