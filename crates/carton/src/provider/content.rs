use std::fmt::{Debug, Display};

use async_trait::async_trait;
use bytes::Bytes;

use crate::types::ContentHash;

/// Errors surfaced by a content store, wrapping the provider's own error
/// type.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ContentStoreError<T> {
    /// The backing blob store cannot be reached or rejected the call. A
    /// failed store never silently drops data.
    #[error("content store unavailable: {0}")]
    Unavailable(#[from] T),
    /// The hash is unknown to the store.
    #[error("content not found: {0}")]
    NotFound(ContentHash),
}

/// Minimal capability interface over the content-addressable blob store.
#[async_trait]
pub trait ContentStoreProvider: Send + Sync + Debug + Clone + 'static {
    type Error: Display + Debug + Send;

    /// Store a payload and return its content hash. The hash is derived
    /// from the payload by the backing store and is the only handle for
    /// retrieval.
    async fn store(&self, payload: Bytes) -> Result<ContentHash, ContentStoreError<Self::Error>>;

    /// Fetch a payload by hash.
    ///
    /// # Returns
    /// * `Ok(Bytes)` - The payload stored under `hash`
    /// * `Err(ContentStoreError::NotFound)` - The hash is unknown to the store
    async fn fetch(&self, hash: &ContentHash) -> Result<Bytes, ContentStoreError<Self::Error>>;
}
