//! Dependency initialization and wiring for the batch indexer.

use std::env;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use batch_indexer_repository::{
    IndexConfig, OpenSearchProvider, SearchIndexProvider, SearchTlsConfig,
};

use crate::content::ContentIndexer;
use crate::models::ModelMapper;
use crate::orchestrator::{Orchestrator, OrchestratorConfig};
use crate::processor::NodeProcessor;
use crate::repository::{HttpRepositoryClient, RepositoryService, SecureComms};
use crate::IndexingError;

/// Default repository base URL.
const DEFAULT_REPOSITORY_URL: &str = "http://localhost:8080";

/// Default admin API path under the repository base URL.
const DEFAULT_REPOSITORY_API_PATH: &str = "/alfresco/service/api/solr/";

/// Default search engine endpoint.
const DEFAULT_SEARCH_PROTOCOL: &str = "http";
const DEFAULT_SEARCH_HOST: &str = "localhost";
const DEFAULT_SEARCH_PORT: u16 = 9200;

/// Default index names.
const DEFAULT_INDEX_NAME: &str = "alfresco";
const DEFAULT_CONTROL_INDEX_NAME: &str = "control";

/// Default cycle interval in seconds.
const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;

/// Default bound on transactions fetched per cycle.
const DEFAULT_TXN_MAX_RESULTS: u32 = 100;

/// Default content worker pool size and queue capacity.
const DEFAULT_CONTENT_THREADS: usize = 4;
const DEFAULT_CONTENT_QUEUE_SIZE: usize = 1000;

/// Container for all initialized dependencies.
pub struct Dependencies {
    /// The configured orchestrator ready to run.
    pub orchestrator: Orchestrator,
}

impl Dependencies {
    /// Initialize all dependencies from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `REPOSITORY_URL`: repository base URL (default: http://localhost:8080)
    /// - `REPOSITORY_API_PATH`: admin API path (default: /alfresco/service/api/solr/)
    /// - `REPOSITORY_SECURE_COMMS`: "secret" or "https" (default: secret)
    /// - `REPOSITORY_SECRET`: shared-secret header value
    /// - `REPOSITORY_KEYSTORE_PATH` / `REPOSITORY_KEYSTORE_PASSWORD`: PKCS#12 client identity
    /// - `REPOSITORY_TRUSTSTORE_PATH`: PEM trust anchors
    /// - `SEARCH_PROTOCOL` / `SEARCH_HOST` / `SEARCH_PORT`: search engine endpoint
    /// - `SEARCH_TRUSTSTORE_PATH`: PEM CA bundle for https
    /// - `SEARCH_KEYSTORE_PATH` / `SEARCH_KEYSTORE_PASSWORD`: PKCS#12 client identity
    /// - `INDEX_NAME` / `INDEX_CREATE`: data index name / create at startup (default: alfresco / true)
    /// - `CONTROL_INDEX_NAME` / `CONTROL_INDEX_CREATE`: control index name / create (default: control / true)
    /// - `INDEXER_POLL_INTERVAL_SECS`: cycle interval (default: 10)
    /// - `INDEXER_TXN_MAX_RESULTS`: transaction window bound (default: 100)
    /// - `INDEXER_CONTENT_THREADS`: content worker pool size (default: 4)
    /// - `INDEXER_CONTENT_QUEUE_SIZE`: content queue capacity (default: 1000)
    ///
    /// # Errors
    ///
    /// Fails when the configuration is invalid or the indexes cannot be
    /// bootstrapped; both are fatal at startup.
    pub async fn new() -> Result<Self, IndexingError> {
        let repository_url =
            env::var("REPOSITORY_URL").unwrap_or_else(|_| DEFAULT_REPOSITORY_URL.to_string());
        let repository_api_path = env::var("REPOSITORY_API_PATH")
            .unwrap_or_else(|_| DEFAULT_REPOSITORY_API_PATH.to_string());
        let secure_comms = secure_comms_from_env()?;

        let search_protocol =
            env::var("SEARCH_PROTOCOL").unwrap_or_else(|_| DEFAULT_SEARCH_PROTOCOL.to_string());
        let search_host =
            env::var("SEARCH_HOST").unwrap_or_else(|_| DEFAULT_SEARCH_HOST.to_string());
        let search_port = parsed_var("SEARCH_PORT", DEFAULT_SEARCH_PORT);
        let search_url = format!("{}://{}:{}", search_protocol, search_host, search_port);

        let index_config = IndexConfig {
            name: env::var("INDEX_NAME").unwrap_or_else(|_| DEFAULT_INDEX_NAME.to_string()),
            create: parsed_var("INDEX_CREATE", true),
            control_name: env::var("CONTROL_INDEX_NAME")
                .unwrap_or_else(|_| DEFAULT_CONTROL_INDEX_NAME.to_string()),
            control_create: parsed_var("CONTROL_INDEX_CREATE", true),
        };
        let search_tls = SearchTlsConfig {
            truststore_path: env::var("SEARCH_TRUSTSTORE_PATH").ok().map(Into::into),
            keystore_path: env::var("SEARCH_KEYSTORE_PATH").ok().map(Into::into),
            keystore_password: env::var("SEARCH_KEYSTORE_PASSWORD").ok(),
        };

        let config = OrchestratorConfig {
            poll_interval: Duration::from_secs(parsed_var(
                "INDEXER_POLL_INTERVAL_SECS",
                DEFAULT_POLL_INTERVAL_SECS,
            )),
            max_results: parsed_var("INDEXER_TXN_MAX_RESULTS", DEFAULT_TXN_MAX_RESULTS),
        };
        let content_threads = parsed_var("INDEXER_CONTENT_THREADS", DEFAULT_CONTENT_THREADS);
        let content_queue_size =
            parsed_var("INDEXER_CONTENT_QUEUE_SIZE", DEFAULT_CONTENT_QUEUE_SIZE);

        info!(
            repository_url = %repository_url,
            search_url = %search_url,
            index = %index_config.name,
            control_index = %index_config.control_name,
            poll_interval_secs = config.poll_interval.as_secs(),
            max_results = config.max_results,
            content_threads,
            "Initializing dependencies"
        );

        let client = HttpRepositoryClient::new(&repository_url, &repository_api_path, secure_comms)
            .map_err(|e| IndexingError::config(format!("Failed to create repository client: {}", e)))?;
        let repository = Arc::new(RepositoryService::new(Arc::new(client)));

        let provider = OpenSearchProvider::new(&search_url, search_tls, index_config)
            .map_err(|e| IndexingError::config(format!("Failed to create search provider: {}", e)))?;
        let search: Arc<dyn SearchIndexProvider> = Arc::new(provider);

        // Bootstrap is fail-fast: the process must not start without its
        // indexes and a readable cursor.
        search
            .ensure_indexes()
            .await
            .map_err(|e| IndexingError::config(format!("Failed to ensure indexes exist: {}", e)))?;
        let cursor = search
            .read_last_indexed()
            .await
            .map_err(|e| IndexingError::config(format!("Failed to read the cursor: {}", e)))?;
        info!(cursor, "Search indexes ready");

        let models = Arc::new(ModelMapper::new());
        let processor = NodeProcessor::new(Arc::clone(&repository), Arc::clone(&models));
        let content = ContentIndexer::new(
            Arc::clone(&repository),
            Arc::clone(&search),
            content_threads,
            content_queue_size,
        );

        let orchestrator =
            Orchestrator::new(repository, search, models, processor, content, config);

        Ok(Self { orchestrator })
    }
}

/// Parse the repository authentication mode from the environment.
fn secure_comms_from_env() -> Result<SecureComms, IndexingError> {
    match env::var("REPOSITORY_SECURE_COMMS")
        .unwrap_or_else(|_| "secret".to_string())
        .as_str()
    {
        "secret" => Ok(SecureComms::Secret {
            secret: env::var("REPOSITORY_SECRET").unwrap_or_default(),
        }),
        "https" => Ok(SecureComms::MutualTls {
            keystore_path: env::var("REPOSITORY_KEYSTORE_PATH")
                .map_err(|_| {
                    IndexingError::config(
                        "REPOSITORY_KEYSTORE_PATH is required in https mode".to_string(),
                    )
                })?
                .into(),
            keystore_password: env::var("REPOSITORY_KEYSTORE_PASSWORD").unwrap_or_default(),
            truststore_path: env::var("REPOSITORY_TRUSTSTORE_PATH").ok().map(Into::into),
        }),
        other => Err(IndexingError::config(format!(
            "Unsupported REPOSITORY_SECURE_COMMS mode: {} (use \"secret\" or \"https\")",
            other
        ))),
    }
}

/// Read an environment variable, falling back to the default when unset or
/// unparseable.
fn parsed_var<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}
