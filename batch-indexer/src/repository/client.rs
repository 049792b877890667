//! HTTP transport to the repository admin API.
//!
//! The repository accepts two authentication modes: a fixed shared-secret
//! header on every request, or mutual TLS with a client identity and a
//! dedicated trust anchor. Both ride on one pooled `reqwest` client; callers
//! only see [`RepositoryClient`].

use std::path::PathBuf;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Certificate, Identity};
use serde_json::Value;
use tracing::{debug, info};
use url::Url;

use crate::errors::IngestError;

/// Header carrying the shared secret in `secret` mode.
pub const SEARCH_SECRET_HEADER: &str = "x-alfresco-search-secret";

/// Transport abstraction over the repository admin API, mockable in tests.
#[async_trait]
pub trait RepositoryClient: Send + Sync {
    /// Execute a GET request against a path relative to the API root.
    async fn get(&self, path: &str) -> Result<Vec<u8>, IngestError>;

    /// Execute a POST request with a JSON body against a path relative to the
    /// API root.
    async fn post_json(&self, path: &str, body: Value) -> Result<Vec<u8>, IngestError>;
}

/// Authentication mode of the repository connection.
#[derive(Debug, Clone)]
pub enum SecureComms {
    /// Every request carries the fixed shared-secret header.
    Secret { secret: String },
    /// The client presents a PKCS#12 identity and trusts the given PEM bundle.
    MutualTls {
        keystore_path: PathBuf,
        keystore_password: String,
        truststore_path: Option<PathBuf>,
    },
}

/// Pooled HTTP client for the repository admin API.
#[derive(Debug)]
pub struct HttpRepositoryClient {
    api_root: Url,
    client: reqwest::Client,
}

impl HttpRepositoryClient {
    /// Build the client for the given repository base URL, API path and
    /// authentication mode.
    pub fn new(base_url: &str, api_path: &str, mode: SecureComms) -> Result<Self, IngestError> {
        let api_root = Url::parse(base_url)
            .and_then(|url| url.join(api_path))
            .map_err(|e| IngestError::repository(format!("invalid repository URL: {}", e)))?;

        let mut builder = reqwest::Client::builder();
        match &mode {
            SecureComms::Secret { secret } => {
                let mut headers = HeaderMap::new();
                headers.insert(
                    HeaderName::from_static(SEARCH_SECRET_HEADER),
                    HeaderValue::from_str(secret).map_err(|e| {
                        IngestError::repository(format!("invalid shared secret: {}", e))
                    })?,
                );
                builder = builder.default_headers(headers);
            }
            SecureComms::MutualTls {
                keystore_path,
                keystore_password,
                truststore_path,
            } => {
                let bundle = std::fs::read(keystore_path).map_err(|e| {
                    IngestError::repository(format!(
                        "failed to read keystore {}: {}",
                        keystore_path.display(),
                        e
                    ))
                })?;
                let identity =
                    Identity::from_pkcs12_der(&bundle, keystore_password).map_err(|e| {
                        IngestError::repository(format!("failed to load client identity: {}", e))
                    })?;
                builder = builder.identity(identity);

                if let Some(truststore_path) = truststore_path {
                    let pem = std::fs::read(truststore_path).map_err(|e| {
                        IngestError::repository(format!(
                            "failed to read truststore {}: {}",
                            truststore_path.display(),
                            e
                        ))
                    })?;
                    let certificate = Certificate::from_pem(&pem).map_err(|e| {
                        IngestError::repository(format!("failed to load trust anchor: {}", e))
                    })?;
                    builder = builder.add_root_certificate(certificate);
                }
            }
        }

        let client = builder.build().map_err(|e| {
            IngestError::repository(format!("failed to build HTTP client: {}", e))
        })?;

        info!(
            api_root = %api_root,
            mode = match mode {
                SecureComms::Secret { .. } => "secret",
                SecureComms::MutualTls { .. } => "https",
            },
            "Created repository client"
        );

        Ok(Self { api_root, client })
    }

    fn endpoint(&self, path: &str) -> Result<Url, IngestError> {
        self.api_root
            .join(path)
            .map_err(|e| IngestError::repository(format!("invalid endpoint '{}': {}", path, e)))
    }
}

#[async_trait]
impl RepositoryClient for HttpRepositoryClient {
    async fn get(&self, path: &str) -> Result<Vec<u8>, IngestError> {
        let url = self.endpoint(path)?;
        debug!(%url, "GET");
        let response = self.client.get(url.clone()).send().await?;
        if !response.status().is_success() {
            return Err(IngestError::repository(format!(
                "GET {} returned status {}",
                url,
                response.status()
            )));
        }
        Ok(response.bytes().await?.to_vec())
    }

    async fn post_json(&self, path: &str, body: Value) -> Result<Vec<u8>, IngestError> {
        let url = self.endpoint(path)?;
        debug!(%url, "POST");
        let response = self.client.post(url.clone()).json(&body).send().await?;
        if !response.status().is_success() {
            return Err(IngestError::repository(format!(
                "POST {} returned status {}",
                url,
                response.status()
            )));
        }
        Ok(response.bytes().await?.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_root_join() {
        let client = HttpRepositoryClient::new(
            "http://localhost:8080",
            "/alfresco/service/api/solr/",
            SecureComms::Secret {
                secret: "s3cret".to_string(),
            },
        )
        .unwrap();

        let url = client.endpoint("transactions?minTxnId=1&maxResults=100").unwrap();
        assert_eq!(
            url.as_str(),
            "http://localhost:8080/alfresco/service/api/solr/transactions?minTxnId=1&maxResults=100"
        );
    }

    #[test]
    fn test_invalid_base_url_is_rejected() {
        let result = HttpRepositoryClient::new(
            "not a url",
            "/path/",
            SecureComms::Secret {
                secret: String::new(),
            },
        );
        assert!(matches!(
            result.unwrap_err(),
            IngestError::RepositoryError(_)
        ));
    }
}
