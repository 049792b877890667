//! Search index provider trait definition.
//!
//! This module defines the abstract interface for search index operations,
//! allowing for different backend implementations and mock implementations in
//! tests.

use async_trait::async_trait;

use crate::errors::SearchIndexError;
use crate::types::{BatchOperationSummary, ScriptedUpsert};

/// Abstracts the underlying search index implementation.
///
/// The provider covers both the data index holding node documents and the
/// single-document control index carrying the indexing cursor. Implementations
/// are injected into the pipeline to enable dependency injection and easy
/// testing with mocks.
#[async_trait]
pub trait SearchIndexProvider: Send + Sync {
    /// Ensure the data and control indexes exist, creating them when enabled.
    ///
    /// Called once during application startup; a failure here is fatal.
    async fn ensure_indexes(&self) -> Result<(), SearchIndexError>;

    /// Read the last successfully indexed transaction id from the control
    /// index. An absent cursor document (or absent control index) reads as `0`;
    /// any other failure propagates.
    async fn read_last_indexed(&self) -> Result<i64, SearchIndexError>;

    /// Overwrite the cursor document with the given transaction id.
    async fn write_last_indexed(&self, txn_id: i64) -> Result<(), SearchIndexError>;

    /// Execute an ordered bulk of scripted upserts.
    ///
    /// Per-item outcomes are reported in the summary; script no-ops are
    /// successes. An `Err` is returned only when the bulk request itself could
    /// not be executed.
    async fn bulk_upsert(
        &self,
        requests: &[ScriptedUpsert],
    ) -> Result<BatchOperationSummary, SearchIndexError>;

    /// Read the `contentId` stored on a document, or an empty string when the
    /// document or the field is absent.
    async fn get_content_id(&self, uuid: &str) -> Result<String, SearchIndexError>;

    /// Patch a document with freshly fetched text content and the content
    /// pointer it was derived from. Empty text is skipped; patch failures are
    /// logged and swallowed, since the next metadata update retries content.
    async fn update_content(
        &self,
        uuid: &str,
        content_id: &str,
        text: &str,
    ) -> Result<(), SearchIndexError>;

    /// Delete the documents whose stored `id` field matches the given UUID.
    ///
    /// Returns the number of documents the query matched; `0` after retry
    /// exhaustion is reported, not raised.
    async fn delete_document(&self, uuid: &str) -> Result<u64, SearchIndexError>;
}
