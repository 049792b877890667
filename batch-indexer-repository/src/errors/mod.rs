//! Error types for search index operations.

pub mod search_index_error;

pub use search_index_error::SearchIndexError;
