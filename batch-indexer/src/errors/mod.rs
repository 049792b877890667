//! Error types for the indexing pipeline.

use batch_indexer_repository::SearchIndexError;
use thiserror::Error;

/// Errors that can occur while a cycle runs. Any of them aborts the cycle
/// without advancing the cursor; the next tick retries from the same position.
#[derive(Error, Debug)]
pub enum IngestError {
    /// Transport failure talking to the content repository (network, TLS or a
    /// non-2xx response).
    #[error("Repository error: {0}")]
    RepositoryError(String),

    /// Failure reported by the search index provider.
    #[error("Search index error: {0}")]
    SearchError(#[from] SearchIndexError),

    /// Structurally malformed payload from the repository.
    #[error("Parse error: {0}")]
    ParseError(String),

    /// A value the protocol does not allow, e.g. an unknown transaction node
    /// status.
    #[error("Schema error: {0}")]
    SchemaError(String),

    /// The bulk upsert left some operations unapplied.
    #[error("Bulk indexing left {failed} of {total} operations unapplied")]
    ConsistencyError { total: usize, failed: usize },

    /// Content queue communication error.
    #[error("Channel error: {0}")]
    ChannelError(String),
}

impl IngestError {
    /// Create a repository transport error.
    pub fn repository(msg: impl Into<String>) -> Self {
        Self::RepositoryError(msg.into())
    }

    /// Create a parse error.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::ParseError(msg.into())
    }

    /// Create a schema error.
    pub fn schema(msg: impl Into<String>) -> Self {
        Self::SchemaError(msg.into())
    }

    /// Create a channel error.
    pub fn channel(msg: impl Into<String>) -> Self {
        Self::ChannelError(msg.into())
    }
}

impl From<reqwest::Error> for IngestError {
    fn from(err: reqwest::Error) -> Self {
        Self::RepositoryError(err.to_string())
    }
}
