//! Shared test utilities for orchestration integration tests
#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use carton::prelude::*;
use carton::provider::MemoryProviderError;
use serde_json::Value;

/// Content store wrapper that counts how many times `store` is called.
#[derive(Debug, Clone, Default)]
pub struct CountingContentStore {
    inner: MemoryContentStore,
    stores: Arc<AtomicUsize>,
}

impl CountingContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store_calls(&self) -> usize {
        self.stores.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ContentStoreProvider for CountingContentStore {
    type Error = MemoryProviderError;

    async fn store(&self, payload: Bytes) -> Result<ContentHash, ContentStoreError<Self::Error>> {
        self.stores.fetch_add(1, Ordering::SeqCst);
        self.inner.store(payload).await
    }

    async fn fetch(&self, hash: &ContentHash) -> Result<Bytes, ContentStoreError<Self::Error>> {
        self.inner.fetch(hash).await
    }
}

/// Content store whose `store` always fails, simulating an unreachable blob
/// backend.
#[derive(Debug, Clone, Default)]
pub struct UnavailableContentStore;

#[async_trait]
impl ContentStoreProvider for UnavailableContentStore {
    type Error = MemoryProviderError;

    async fn store(&self, _payload: Bytes) -> Result<ContentHash, ContentStoreError<Self::Error>> {
        Err(ContentStoreError::Unavailable(
            MemoryProviderError::Internal("injected store failure".to_string()),
        ))
    }

    async fn fetch(&self, hash: &ContentHash) -> Result<Bytes, ContentStoreError<Self::Error>> {
        Err(ContentStoreError::NotFound(hash.clone()))
    }
}

/// Index provider that can be armed to fail the next `upsert` once, then
/// behaves normally.
#[derive(Debug, Clone, Default)]
pub struct FlakyIndexProvider {
    inner: MemoryIndexProvider,
    fail_next_upsert: Arc<AtomicBool>,
}

impl FlakyIndexProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_next_upsert(&self) {
        self.fail_next_upsert.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl IndexProvider for FlakyIndexProvider {
    type Error = MemoryProviderError;

    async fn upsert(
        &self,
        index_name: &str,
        document_id: Option<&str>,
        hash: &ContentHash,
        content_type: Option<&str>,
        fields: &[IndexField],
    ) -> Result<String, IndexError<Self::Error>> {
        if self.fail_next_upsert.swap(false, Ordering::SeqCst) {
            return Err(IndexError::Unavailable(MemoryProviderError::Internal(
                "injected upsert failure".to_string(),
            )));
        }
        self.inner
            .upsert(index_name, document_id, hash, content_type, fields)
            .await
    }

    async fn search(
        &self,
        index_name: &str,
        native_query: &Value,
        page: &PageRequest,
    ) -> Result<Page<DocumentMetadata>, IndexError<Self::Error>> {
        self.inner.search(index_name, native_query, page).await
    }

    async fn create_index(&self, index_name: &str) -> Result<(), IndexError<Self::Error>> {
        self.inner.create_index(index_name).await
    }
}

/// Initialize test logging once; respects `RUST_LOG`.
pub fn init_tracing() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .try_init();
    });
}

/// A carton over plain in-memory providers.
pub fn memory_carton() -> Carton<MemoryContentStore, MemoryIndexProvider> {
    init_tracing();
    Carton::new(MemoryContentStore::new(), MemoryIndexProvider::new())
}

/// Store and index `count` documents into `index_name`, with a `"n"` field
/// carrying the insertion rank and a payload of `"payload {n}"`.
pub async fn seed_documents(
    carton: &Carton<MemoryContentStore, MemoryIndexProvider>,
    index_name: &str,
    count: usize,
) -> Vec<IdAndHash> {
    let mut outcomes = Vec::with_capacity(count);
    for n in 0..count {
        let outcome = carton
            .store_and_index(
                Bytes::from(format!("payload {n}")),
                &IndexRequest::new(index_name)
                    .with_id(format!("d{n}"))
                    .with_field("n", n as i64),
            )
            .await
            .unwrap();
        outcomes.push(outcome);
    }
    outcomes
}
