//! The orchestrator tying the content store and the search index together.
//!
//! [`Carton`] holds no state beyond the two provider handles and its
//! configuration; it is safe to share and call concurrently. Every operation
//! is a short sequence of provider calls in a documented order. Nothing here
//! retries: retry policy belongs to the concrete providers and their
//! transports.

use std::fmt::{Debug, Display};
use std::path::Path;

use bytes::Bytes;
use futures::stream::{self, StreamExt};

use crate::page::{Page, PageRequest, DEFAULT_PAGE_SIZE};
use crate::provider::{
    ContentStoreError, ContentStoreProvider, IndexError, IndexProvider,
};
use crate::query::{translate, Query, QueryError, ID_FIELD};
use crate::types::{
    ContentHash, DocumentMetadata, IdAndHash, IndexRequest, MetadataAndPayload,
};

/// Tuning knobs for an orchestrator instance.
#[derive(Debug, Clone)]
pub struct CartonConfig {
    /// Page size applied when a search is issued without an explicit page
    /// request.
    pub default_page_size: usize,
    /// Upper bound on how many payload fetches [`Carton::search_and_fetch`]
    /// runs concurrently.
    pub fetch_concurrency: usize,
}

impl Default for CartonConfig {
    fn default() -> Self {
        Self {
            default_page_size: DEFAULT_PAGE_SIZE,
            fetch_concurrency: 8,
        }
    }
}

/// Errors surfaced by orchestrated operations.
///
/// Provider errors propagate unchanged, so callers can tell retryable
/// unavailability apart from not-found and from malformed queries. The two
/// documented degraded behaviors (`get_by_id`'s not-found sentinel and
/// `search_and_fetch`'s per-item drop) are the only places an underlying
/// failure does not appear here.
#[derive(Debug, thiserror::Error)]
pub enum CartonError<CE, IE>
where
    CE: Display + Debug,
    IE: Display + Debug,
{
    #[error("content store error: {0}")]
    Store(#[from] ContentStoreError<CE>),
    #[error("index error: {0}")]
    Index(#[from] IndexError<IE>),
    #[error("invalid query: {0}")]
    Query(#[from] QueryError),
    /// The payload was stored but the index phase failed. The blob is
    /// retained under `hash`; retry the index step with it instead of
    /// re-uploading the payload.
    #[error("content {hash} stored but indexing failed: {source}")]
    IndexAfterStore {
        hash: ContentHash,
        source: IndexError<IE>,
    },
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Orchestrator over a content-addressable blob store and a document-search
/// index.
///
/// Payload writes go to the content store, metadata writes to the index,
/// and reads join the two back together through the content hash. The two
/// backends fail independently; the consistency policy for each operation is
/// documented on the method.
#[derive(Debug, Clone)]
pub struct Carton<C, I> {
    content: C,
    index: I,
    config: CartonConfig,
}

impl<C, I> Carton<C, I>
where
    C: ContentStoreProvider,
    I: IndexProvider,
{
    pub fn new(content: C, index: I) -> Self {
        Self::with_config(content, index, CartonConfig::default())
    }

    pub fn with_config(content: C, index: I, config: CartonConfig) -> Self {
        Self {
            content,
            index,
            config,
        }
    }

    /// Store a payload in the content store. No indexing side effect.
    pub async fn store(
        &self,
        payload: Bytes,
    ) -> Result<ContentHash, CartonError<C::Error, I::Error>> {
        let hash = self.content.store(payload).await?;
        tracing::debug!(hash = %hash, "payload stored");
        Ok(hash)
    }

    /// Read a file and store its contents.
    pub async fn store_file(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<ContentHash, CartonError<C::Error, I::Error>> {
        let data = tokio::fs::read(path).await?;
        self.store(Bytes::from(data)).await
    }

    /// Index metadata against an already-known content hash.
    ///
    /// The hash is not checked against the content store: indexing may
    /// precede storage for pre-addressed content. Re-indexing an existing
    /// `(index_name, document_id)` replaces its metadata wholesale.
    pub async fn index(
        &self,
        request: &IndexRequest,
        hash: &ContentHash,
    ) -> Result<IdAndHash, CartonError<C::Error, I::Error>> {
        let document_id = self
            .index
            .upsert(
                &request.index_name,
                request.document_id.as_deref(),
                hash,
                request.content_type.as_deref(),
                &request.fields,
            )
            .await?;

        tracing::debug!(
            index = %request.index_name,
            id = %document_id,
            hash = %hash,
            "metadata indexed"
        );
        Ok(IdAndHash {
            document_id,
            content_hash: hash.clone(),
        })
    }

    /// Store a payload, then index metadata pointing at the resulting hash.
    ///
    /// If the store phase fails nothing is indexed. If the store phase
    /// succeeds and the index phase fails, the blob is retained and the
    /// error carries the hash so the caller can retry the index step
    /// without re-uploading the payload.
    pub async fn store_and_index(
        &self,
        payload: Bytes,
        request: &IndexRequest,
    ) -> Result<IdAndHash, CartonError<C::Error, I::Error>> {
        let hash = self.content.store(payload).await?;

        match self.index(request, &hash).await {
            Ok(result) => Ok(result),
            Err(CartonError::Index(source)) => {
                tracing::warn!(
                    index = %request.index_name,
                    hash = %hash,
                    error = %source,
                    "payload stored but indexing failed; retry indexing with the returned hash"
                );
                Err(CartonError::IndexAfterStore { hash, source })
            }
            Err(other) => Err(other),
        }
    }

    /// Fetch a payload by content hash.
    ///
    /// The index name is accepted for API symmetry with the id-based reads;
    /// a hash is globally addressable and the index is not consulted.
    pub async fn get_by_hash(
        &self,
        index_name: &str,
        hash: &ContentHash,
    ) -> Result<Bytes, CartonError<C::Error, I::Error>> {
        tracing::debug!(index = index_name, hash = %hash, "fetch by hash");
        Ok(self.content.fetch(hash).await?)
    }

    /// Fetch a document's metadata by id, as a degenerate one-result search
    /// on the identifier field.
    pub async fn get_metadata_by_id(
        &self,
        index_name: &str,
        id: &str,
    ) -> Result<Option<DocumentMetadata>, CartonError<C::Error, I::Error>> {
        let query = Query::equals(ID_FIELD, id);
        let native = translate(Some(&query))?;
        let page = self
            .index
            .search(index_name, &native, &PageRequest::new(0, 1))
            .await?;

        if page.total_elements == 0 {
            tracing::warn!(index = index_name, id, "document not found");
            return Ok(None);
        }
        Ok(page.content.into_iter().next())
    }

    /// Fetch a document's metadata and payload by id.
    ///
    /// A missing document returns the absent-metadata/empty-payload
    /// sentinel instead of an error, so existence checks do not need
    /// error-based control flow. A document whose metadata exists but whose
    /// blob is gone is a consistency drift and does surface the fetch
    /// error.
    pub async fn get_by_id(
        &self,
        index_name: &str,
        id: &str,
    ) -> Result<MetadataAndPayload, CartonError<C::Error, I::Error>> {
        match self.get_metadata_by_id(index_name, id).await? {
            Some(metadata) => {
                let payload = self.content.fetch(&metadata.content_hash).await?;
                Ok(MetadataAndPayload {
                    metadata: Some(metadata),
                    payload,
                })
            }
            None => Ok(MetadataAndPayload::not_found()),
        }
    }

    /// Search a page of document metadata.
    ///
    /// An absent query matches everything; an absent page request defaults
    /// to the first page of [`CartonConfig::default_page_size`] results in
    /// engine order.
    pub async fn search(
        &self,
        index_name: &str,
        query: Option<&Query>,
        page: Option<&PageRequest>,
    ) -> Result<Page<DocumentMetadata>, CartonError<C::Error, I::Error>> {
        let native = translate(query)?;
        let default_page = PageRequest::new(0, self.config.default_page_size);
        let page = page.unwrap_or(&default_page);

        Ok(self.index.search(index_name, &native, page).await?)
    }

    /// Search a page of documents and fetch every result's payload.
    ///
    /// Payload fetches run concurrently (bounded by
    /// [`CartonConfig::fetch_concurrency`]) and the returned page preserves
    /// the search-result order. A result whose payload cannot be fetched is
    /// dropped from `content`, while `total_elements` keeps the search's
    /// original total — partial results are preferred over failing the whole
    /// page, and the count deliberately reflects the index, not the join.
    pub async fn search_and_fetch(
        &self,
        index_name: &str,
        query: Option<&Query>,
        page: Option<&PageRequest>,
    ) -> Result<Page<MetadataAndPayload>, CartonError<C::Error, I::Error>> {
        let found = self.search(index_name, query, page).await?;
        let total_elements = found.total_elements;
        let page_number = found.page_number;
        let page_size = found.page_size;

        let fetched: Vec<Option<MetadataAndPayload>> = stream::iter(found.content)
            .map(|metadata| {
                let content = &self.content;
                async move {
                    match content.fetch(&metadata.content_hash).await {
                        Ok(payload) => Some(MetadataAndPayload {
                            metadata: Some(metadata),
                            payload,
                        }),
                        Err(error) => {
                            tracing::error!(
                                hash = %metadata.content_hash,
                                %error,
                                "dropping search result: payload fetch failed"
                            );
                            None
                        }
                    }
                }
            })
            .buffered(self.config.fetch_concurrency.max(1))
            .collect()
            .await;

        Ok(Page {
            content: fetched.into_iter().flatten().collect(),
            total_elements,
            page_number,
            page_size,
        })
    }

    /// Create an index. Creating one that already exists is not an error.
    pub async fn create_index(
        &self,
        index_name: &str,
    ) -> Result<(), CartonError<C::Error, I::Error>> {
        Ok(self.index.create_index(index_name).await?)
    }
}
