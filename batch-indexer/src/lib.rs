//! # Batch Indexer
//!
//! Incremental indexing bridge between a content repository and an
//! OpenSearch-compatible search engine. It polls repository transactions in
//! monotonic order, resolves node metadata and ACL readers, upserts documents
//! idempotently and records durable progress between runs.
//!
//! ## Architecture
//!
//! Each scheduled cycle flows through the pipeline:
//!
//! 1. **Models**: Rebuilds the namespace-prefix mapping from the content models
//! 2. **Repository**: Fetches the transaction window and node changes
//! 3. **Processor**: Resolves metadata, prefixes and ACL readers per node
//! 4. **Search**: Issues the scripted bulk upsert and advances the cursor
//! 5. **Content**: Asynchronously attaches text content when it changed
//!
//! ## Modules
//!
//! - [`config`]: Configuration and dependency initialization
//! - [`repository`]: HTTP client and typed service for the repository admin API
//! - [`models`]: Namespace-prefix mapping synchronized from content models
//! - [`processor`]: Node metadata resolution
//! - [`content`]: Asynchronous content worker pool
//! - [`orchestrator`]: The scheduled indexing cycle
//! - [`errors`]: Error types for the pipeline

pub mod config;
pub mod content;
pub mod errors;
pub mod models;
pub mod orchestrator;
pub mod processor;
pub mod repository;

pub use config::Dependencies;
pub use errors::IngestError;

use thiserror::Error;

/// Errors that can occur during indexer initialization or execution.
#[derive(Error, Debug)]
pub enum IndexingError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Ingest error.
    #[error("Ingest error: {0}")]
    IngestError(#[from] IngestError),
}

impl IndexingError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
