//! OpenSearch provider implementation.
//!
//! This module provides the concrete implementation of `SearchIndexProvider`
//! using the OpenSearch Rust crate.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use opensearch::auth::{ClientCertificate, Credentials};
use opensearch::cert::{Certificate, CertificateValidation};
use opensearch::http::request::JsonBody;
use opensearch::http::transport::{SingleNodeConnectionPool, TransportBuilder};
use opensearch::indices::{IndicesCreateParts, IndicesExistsParts};
use opensearch::{BulkParts, DeleteByQueryParts, GetParts, IndexParts, OpenSearch, UpdateParts};
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};
use url::Url;

use batch_indexer_shared::{fields, qname};

use crate::errors::SearchIndexError;
use crate::interfaces::SearchIndexProvider;
use crate::opensearch::index_settings::{
    self, control_index_mappings, data_index_mappings, IndexConfig,
};
use crate::types::{BatchOperationResult, BatchOperationSummary, ScriptedUpsert};

/// Concurrent updates of the same document within a bulk window are tolerated
/// by retrying the scripted update on version conflicts.
const BULK_RETRY_ON_CONFLICT: u32 = 5;

/// Delete-by-query attempts before giving up on a document.
const DELETE_RETRY_ATTEMPTS: u32 = 3;

/// Back-off between delete-by-query attempts.
const DELETE_RETRY_BACKOFF: Duration = Duration::from_secs(5);

/// TLS material for the search engine connection. All fields optional; plain
/// `http` needs none of them.
#[derive(Debug, Clone, Default)]
pub struct SearchTlsConfig {
    /// PEM file with the CA certificate(s) to trust.
    pub truststore_path: Option<PathBuf>,
    /// PKCS#12 bundle with the client identity.
    pub keystore_path: Option<PathBuf>,
    /// Password of the PKCS#12 bundle.
    pub keystore_password: Option<String>,
}

/// OpenSearch-backed search index provider.
///
/// Covers the data index (node documents) and the control index (the single
/// cursor document with id `1`).
#[derive(Debug)]
pub struct OpenSearchProvider {
    client: OpenSearch,
    index_config: IndexConfig,
}

impl OpenSearchProvider {
    /// Create a new provider connected to the given URL.
    pub fn new(
        url: &str,
        tls: SearchTlsConfig,
        index_config: IndexConfig,
    ) -> Result<Self, SearchIndexError> {
        let parsed_url =
            Url::parse(url).map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let conn_pool = SingleNodeConnectionPool::new(parsed_url);
        let mut builder = TransportBuilder::new(conn_pool).disable_proxy();

        if let Some(truststore_path) = &tls.truststore_path {
            let pem = std::fs::read(truststore_path).map_err(|e| {
                SearchIndexError::connection(format!(
                    "failed to read truststore {}: {}",
                    truststore_path.display(),
                    e
                ))
            })?;
            let certificate = Certificate::from_pem(&pem)
                .map_err(|e| SearchIndexError::connection(e.to_string()))?;
            builder = builder.cert_validation(CertificateValidation::Full(certificate));
        }

        if let Some(keystore_path) = &tls.keystore_path {
            let bundle = std::fs::read(keystore_path).map_err(|e| {
                SearchIndexError::connection(format!(
                    "failed to read keystore {}: {}",
                    keystore_path.display(),
                    e
                ))
            })?;
            builder = builder.auth(Credentials::Certificate(ClientCertificate::Pkcs12(
                bundle,
                tls.keystore_password.clone(),
            )));
        }

        let transport = builder
            .build()
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;
        let client = OpenSearch::new(transport);

        info!(
            url = %url,
            index = %index_config.name,
            control_index = %index_config.control_name,
            "Created OpenSearch provider"
        );

        Ok(Self {
            client,
            index_config,
        })
    }

    async fn index_exists(&self, index: &str) -> Result<bool, SearchIndexError> {
        let response = self
            .client
            .indices()
            .exists(IndicesExistsParts::Index(&[index]))
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let status = response.status_code();
        match status.as_u16() {
            404 => Ok(false),
            _ if status.is_success() => Ok(true),
            _ => Err(SearchIndexError::connection(format!(
                "existence check for index '{}' returned status {}",
                index, status
            ))),
        }
    }

    async fn create_index(&self, index: &str, mappings: Value) -> Result<(), SearchIndexError> {
        let response = self
            .client
            .indices()
            .create(IndicesCreateParts::Index(index))
            .body(mappings)
            .send()
            .await
            .map_err(|e| SearchIndexError::index_creation(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(SearchIndexError::index_creation(format!(
                "creating index '{}' failed with status {}: {}",
                index, status, error_body
            )));
        }

        info!(index = %index, "Index created");
        Ok(())
    }

    /// One `_delete_by_query` round; returns the number of matched documents.
    async fn delete_by_id_field(&self, uuid: &str) -> Result<u64, SearchIndexError> {
        let response = self
            .client
            .delete_by_query(DeleteByQueryParts::Index(&[self.index_config.name.as_str()]))
            .body(json!({
                "query": {
                    "match": {
                        "id": uuid
                    }
                }
            }))
            .send()
            .await
            .map_err(|e| SearchIndexError::delete(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(SearchIndexError::delete(format!(
                "delete-by-query failed with status {}: {}",
                status, error_body
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| SearchIndexError::parse(e.to_string()))?;
        Ok(body["total"].as_u64().unwrap_or(0))
    }
}

#[async_trait]
impl SearchIndexProvider for OpenSearchProvider {
    async fn ensure_indexes(&self) -> Result<(), SearchIndexError> {
        if self.index_config.control_create && !self.index_exists(&self.index_config.control_name).await? {
            self.create_index(&self.index_config.control_name, control_index_mappings())
                .await?;
        }
        if self.index_config.create && !self.index_exists(&self.index_config.name).await? {
            self.create_index(&self.index_config.name, data_index_mappings())
                .await?;
        }
        Ok(())
    }

    async fn read_last_indexed(&self) -> Result<i64, SearchIndexError> {
        let response = self
            .client
            .get(GetParts::IndexId(
                &self.index_config.control_name,
                index_settings::CONTROL_DOCUMENT_ID,
            ))
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let status = response.status_code();
        if status.as_u16() == 404 {
            // No cycle has completed yet.
            return Ok(0);
        }
        if !status.is_success() {
            return Err(SearchIndexError::cursor(format!(
                "reading the cursor document returned status {}",
                status
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| SearchIndexError::parse(e.to_string()))?;
        body["_source"][fields::LAST_TRANSACTION_ID]
            .as_i64()
            .ok_or_else(|| {
                SearchIndexError::parse("cursor document is missing lastTransactionId".to_string())
            })
    }

    async fn write_last_indexed(&self, txn_id: i64) -> Result<(), SearchIndexError> {
        let response = self
            .client
            .index(IndexParts::IndexId(
                &self.index_config.control_name,
                index_settings::CONTROL_DOCUMENT_ID,
            ))
            .body(json!({ (fields::LAST_TRANSACTION_ID): txn_id }))
            .send()
            .await
            .map_err(|e| SearchIndexError::cursor(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(SearchIndexError::cursor(format!(
                "writing the cursor document failed with status {}: {}",
                status, error_body
            )));
        }

        debug!(txn_id, "Cursor document written");
        Ok(())
    }

    async fn bulk_upsert(
        &self,
        requests: &[ScriptedUpsert],
    ) -> Result<BatchOperationSummary, SearchIndexError> {
        if requests.is_empty() {
            return Ok(BatchOperationSummary::default());
        }

        let mut body: Vec<JsonBody<Value>> = Vec::with_capacity(requests.len() * 2);
        for request in requests {
            body.push(
                json!({
                    "update": {
                        "_id": request.id,
                        "retry_on_conflict": BULK_RETRY_ON_CONFLICT
                    }
                })
                .into(),
            );
            body.push(
                json!({
                    "script": {
                        "source": request.script_source,
                        "lang": "painless",
                        "params": request.fields
                    },
                    "upsert": request.fields
                })
                .into(),
            );
        }

        let response = self
            .client
            .bulk(BulkParts::Index(&self.index_config.name))
            .body(body)
            .send()
            .await
            .map_err(|e| SearchIndexError::bulk_index(e.to_string()))?;

        let status = response.status_code();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(SearchIndexError::bulk_index(format!(
                "bulk request failed with status {}: {}",
                status, error_body
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| SearchIndexError::parse(e.to_string()))?;
        let empty = Vec::new();
        let items = body["items"].as_array().unwrap_or(&empty);

        let mut results = Vec::with_capacity(requests.len());
        let mut succeeded = 0;
        let mut failed = 0;
        for (request, item) in requests.iter().zip(items) {
            let item_error = &item["update"]["error"];
            if item_error.is_null() {
                succeeded += 1;
                results.push(BatchOperationResult {
                    id: request.id.clone(),
                    success: true,
                    error: None,
                });
            } else {
                failed += 1;
                error!(id = %request.id, error = %item_error, "Bulk item failed");
                results.push(BatchOperationResult {
                    id: request.id.clone(),
                    success: false,
                    error: Some(item_error.to_string()),
                });
            }
        }

        Ok(BatchOperationSummary {
            total: requests.len(),
            succeeded,
            failed,
            results,
        })
    }

    async fn get_content_id(&self, uuid: &str) -> Result<String, SearchIndexError> {
        let response = self
            .client
            .get(GetParts::IndexId(&self.index_config.name, uuid))
            .send()
            .await
            .map_err(|e| SearchIndexError::connection(e.to_string()))?;

        let status = response.status_code();
        if status.as_u16() == 404 {
            return Ok(String::new());
        }
        if !status.is_success() {
            return Err(SearchIndexError::connection(format!(
                "reading document '{}' returned status {}",
                uuid, status
            )));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| SearchIndexError::parse(e.to_string()))?;
        Ok(match &body["_source"][fields::CONTENT_ID] {
            Value::String(content_id) => content_id.clone(),
            Value::Number(content_id) => content_id.to_string(),
            _ => String::new(),
        })
    }

    async fn update_content(
        &self,
        uuid: &str,
        content_id: &str,
        text: &str,
    ) -> Result<(), SearchIndexError> {
        if text.is_empty() {
            debug!(uuid, "Skipping content update: extracted text is empty");
            return Ok(());
        }

        let body = json!({
            "script": {
                "source": content_update_script(),
                "lang": "painless",
                "params": {
                    "text": text,
                    "contentId": content_id
                }
            }
        });

        let result = self
            .client
            .update(UpdateParts::IndexId(&self.index_config.name, uuid))
            .body(body)
            .send()
            .await;

        // Content is opportunistic: the next metadata update on the node
        // retries it, so failures are reported but not raised.
        match result {
            Err(e) => warn!(uuid, error = %e, "Document content has not been updated"),
            Ok(response) if !response.status_code().is_success() => {
                let status = response.status_code();
                let error_body = response.text().await.unwrap_or_default();
                warn!(uuid, %status, body = %error_body, "Document content has not been updated");
            }
            Ok(_) => debug!(uuid, content_id, "Document content updated"),
        }
        Ok(())
    }

    async fn delete_document(&self, uuid: &str) -> Result<u64, SearchIndexError> {
        for attempt in 1..=DELETE_RETRY_ATTEMPTS {
            match self.delete_by_id_field(uuid).await {
                Ok(matched) if matched > 0 => {
                    debug!(uuid, matched, "Documents deleted");
                    return Ok(matched);
                }
                Ok(_) => debug!(uuid, attempt, "Delete-by-query matched no documents"),
                Err(e) => warn!(uuid, attempt, error = %e, "Delete-by-query failed"),
            }
            if attempt < DELETE_RETRY_ATTEMPTS {
                tokio::time::sleep(DELETE_RETRY_BACKOFF).await;
            }
        }
        warn!(uuid, "Document not deleted after {} attempts", DELETE_RETRY_ATTEMPTS);
        Ok(0)
    }
}

/// Painless source of the content patch: writes the encoded `cm:content` field
/// and the content pointer it was derived from.
fn content_update_script() -> String {
    format!(
        "ctx._source['{}'] = params.text; ctx._source['{}'] = params.contentId;",
        qname::encode(fields::CONTENT_ATTRIBUTE),
        fields::CONTENT_ID
    )
}
