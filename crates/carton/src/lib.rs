//! Content-addressed storage unified with a searchable metadata index.
//!
//! Carton sits between two already-deployed systems: a content-addressable
//! blob store (payloads addressed by hash) and a document-search engine
//! (metadata addressed by query). It stores bytes, indexes metadata pointing
//! at the resulting hash, and joins the two back together on read — without
//! pretending the pair is transactional.
//!
//! # Example
//!
//! ```rust,no_run
//! use bytes::Bytes;
//! use carton::prelude::*;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let carton = Carton::new(MemoryContentStore::new(), MemoryIndexProvider::new());
//!
//! // store a payload and index searchable metadata against its hash
//! let outcome = carton
//!     .store_and_index(
//!         Bytes::from("hello"),
//!         &IndexRequest::new("docs")
//!             .with_id("d1")
//!             .with_content_type("text/plain")
//!             .with_field("lang", "en"),
//!     )
//!     .await?;
//!
//! // find it again by metadata, payloads included
//! let page = carton
//!     .search_and_fetch("docs", Some(&Query::equals("lang", "en")), None)
//!     .await?;
//! assert_eq!(page.content[0].payload, Bytes::from("hello"));
//!
//! // or look it up directly by id
//! let found = carton.get_by_id("docs", &outcome.document_id).await?;
//! assert!(found.is_found());
//! # Ok(())
//! # }
//! ```

/**
 * Pagination and sorting: zero-based page requests
 *  and the result pages they produce.
 */
pub mod page;
/**
 * Capability interfaces over the two external systems
 *  (blob store, search engine), plus the in-memory
 *  reference implementations used by the test suite.
 */
pub mod provider;
/**
 * Engine-agnostic query model and its translation to
 *  the search engine's native JSON query DSL.
 */
pub mod query;
/**
 * The orchestrator: store-then-index, metadata/payload
 *  joins, and search-then-fetch over the two providers.
 */
pub mod store;
/**
 * Core value types: content hashes, index fields,
 *  document metadata, and per-call indexing options.
 */
pub mod types;

pub use store::{Carton, CartonConfig, CartonError};

pub mod prelude {
    pub use crate::page::{Page, PageRequest, Sort, SortDirection};
    pub use crate::provider::{
        ContentStoreError, ContentStoreProvider, IndexError, IndexProvider, MemoryContentStore,
        MemoryIndexProvider,
    };
    pub use crate::query::{Query, QueryError, ID_FIELD};
    pub use crate::store::{Carton, CartonConfig, CartonError};
    pub use crate::types::{
        ContentHash, DocumentMetadata, FieldValue, IdAndHash, IndexField, IndexRequest,
        MetadataAndPayload,
    };
}
