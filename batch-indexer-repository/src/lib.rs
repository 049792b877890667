//! # Batch Indexer Repository
//!
//! Search-side data access for the batch indexer. This crate defines the
//! [`SearchIndexProvider`] abstraction over the search engine together with its
//! OpenSearch implementation, the bulk request builder that turns resolved
//! nodes into scripted upserts, and the index mappings.

pub mod errors;
pub mod interfaces;
pub mod opensearch;
pub mod request_builder;
pub mod types;

pub use errors::SearchIndexError;
pub use interfaces::SearchIndexProvider;
pub use self::opensearch::{IndexConfig, OpenSearchProvider, SearchTlsConfig};
pub use request_builder::{build_bulk_upserts, build_upsert};
pub use types::{BatchOperationResult, BatchOperationSummary, ScriptedUpsert};
