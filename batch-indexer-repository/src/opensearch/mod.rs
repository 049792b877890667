//! OpenSearch backend implementation of the search index provider.

pub mod index_settings;
pub mod provider;

pub use index_settings::IndexConfig;
pub use provider::{OpenSearchProvider, SearchTlsConfig};
