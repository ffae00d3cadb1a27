//! Capability interfaces over the two external systems.
//!
//! The orchestrator only ever talks to a [`ContentStoreProvider`] (the blob
//! store) and an [`IndexProvider`] (the search engine). Concrete network
//! clients live outside this crate; the in-memory implementations here are
//! the reference used by the test suite.

mod content;
mod index;
pub mod memory;

pub use content::{ContentStoreError, ContentStoreProvider};
pub use index::{IndexError, IndexProvider};
pub use memory::{MemoryContentStore, MemoryIndexProvider, MemoryProviderError};
