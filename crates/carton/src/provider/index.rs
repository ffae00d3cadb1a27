use std::fmt::{Debug, Display};

use async_trait::async_trait;
use serde_json::Value;

use crate::page::{Page, PageRequest};
use crate::types::{ContentHash, DocumentMetadata, IndexField};

/// Errors surfaced by the search index, wrapping the provider's own error
/// type.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum IndexError<T> {
    /// The backing search engine cannot be reached or rejected the call.
    #[error("index unavailable: {0}")]
    Unavailable(#[from] T),
    /// The engine did not understand the native query it was handed.
    #[error("index rejected query: {0}")]
    BadQuery(String),
}

/// Minimal capability interface over the document-search engine.
///
/// Queries arrive already translated to the engine's native JSON DSL; the
/// engine-agnostic model never crosses this boundary.
#[async_trait]
pub trait IndexProvider: Send + Sync + Debug + Clone + 'static {
    type Error: Display + Debug + Send;

    /// Create or replace a document.
    ///
    /// # Arguments
    /// * `index_name` - Index to write into
    /// * `document_id` - Identifier of the document; when `None` the
    ///     provider generates one
    /// * `hash` - Content hash the document points at
    /// * `content_type` - Optional MIME type of the payload
    /// * `fields` - Attributes to index; an existing document under the same
    ///     id is replaced wholesale, never merged
    ///
    /// # Returns
    /// The id under which the document is findable.
    async fn upsert(
        &self,
        index_name: &str,
        document_id: Option<&str>,
        hash: &ContentHash,
        content_type: Option<&str>,
        fields: &[IndexField],
    ) -> Result<String, IndexError<Self::Error>>;

    /// Run a native query, returning the requested zero-based page.
    ///
    /// Result order without an explicit sort is whatever the backing engine
    /// considers relevance/insertion order.
    async fn search(
        &self,
        index_name: &str,
        native_query: &Value,
        page: &PageRequest,
    ) -> Result<Page<DocumentMetadata>, IndexError<Self::Error>>;

    /// Create an index. Creating one that already exists is not an error.
    async fn create_index(&self, index_name: &str) -> Result<(), IndexError<Self::Error>>;
}
