//! Typed calls against the repository admin API.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use serde_json::json;
use tracing::debug;
use url::form_urlencoded::byte_serialize;

use batch_indexer_shared::types::acl::AclReadersResponse;
use batch_indexer_shared::types::model::ModelDiffs;
use batch_indexer_shared::types::node::{Node, NodeContainer};
use batch_indexer_shared::types::transaction::{
    TransactionContainer, TransactionNode, TransactionNodeContainer,
};

use crate::errors::IngestError;
use crate::repository::client::RepositoryClient;

/// Typed service over the repository admin API.
pub struct RepositoryService {
    client: Arc<dyn RepositoryClient>,
}

impl RepositoryService {
    pub fn new(client: Arc<dyn RepositoryClient>) -> Self {
        Self { client }
    }

    /// Fetch the next window of transactions starting at `min_txn_id`.
    pub async fn transactions(
        &self,
        min_txn_id: i64,
        max_results: u32,
    ) -> Result<TransactionContainer, IngestError> {
        let endpoint = format!(
            "transactions?minTxnId={}&maxResults={}",
            min_txn_id, max_results
        );
        debug!(min_txn_id, max_results, "Retrieving transactions");
        let bytes = self.client.get(&endpoint).await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| IngestError::parse(format!("transactions response: {}", e)))
    }

    /// Fetch the per-node change headers of a transaction id range.
    pub async fn node_changes(
        &self,
        from_txn_id: i64,
        to_txn_id: i64,
    ) -> Result<Vec<TransactionNode>, IngestError> {
        debug!(from_txn_id, to_txn_id, "Retrieving transaction nodes");
        let bytes = self
            .client
            .post_json(
                "nodes",
                json!({ "fromTxnId": from_txn_id, "toTxnId": to_txn_id }),
            )
            .await?;
        let container: TransactionNodeContainer = serde_json::from_slice(&bytes)
            .map_err(|e| IngestError::parse(format!("nodes response: {}", e)))?;
        Ok(container.nodes)
    }

    /// Fetch full metadata for one node id. Property keys are still in their
    /// `{uri}localName` form at this point.
    pub async fn node_metadata(&self, node_id: i64) -> Result<Vec<Node>, IngestError> {
        debug!(node_id, "Retrieving node metadata");
        let bytes = self
            .client
            .post_json(
                "metadata",
                json!({
                    "nodeIds": [node_id],
                    "includeAclId": true,
                    "includeOwner": true,
                    "includePaths": true,
                    "includeParentAssociations": true,
                    "includeChildIds": false,
                    "includeChildAssociations": false
                }),
            )
            .await?;
        let container: NodeContainer = serde_json::from_slice(&bytes)
            .map_err(|e| IngestError::parse(format!("metadata response: {}", e)))?;
        Ok(container.nodes)
    }

    /// Fetch the readers of the given ACL ids, keyed by ACL id.
    pub async fn acl_readers(
        &self,
        acl_ids: &BTreeSet<i64>,
    ) -> Result<HashMap<i64, Vec<String>>, IngestError> {
        debug!(acl_count = acl_ids.len(), "Retrieving ACL readers");
        let bytes = self
            .client
            .post_json("aclsReaders", json!({ "aclIds": acl_ids }))
            .await?;
        let response: AclReadersResponse = serde_json::from_slice(&bytes)
            .map_err(|e| IngestError::parse(format!("aclsReaders response: {}", e)))?;
        Ok(response
            .acls_readers
            .into_iter()
            .map(|acl| (acl.acl_id, acl.readers))
            .collect())
    }

    /// Fetch the current content-model listing. An empty `models` payload asks
    /// the repository for the full list.
    pub async fn model_diffs(&self) -> Result<ModelDiffs, IngestError> {
        debug!("Retrieving model diffs");
        let bytes = self
            .client
            .post_json("modelsdiff", json!({ "models": [] }))
            .await?;
        serde_json::from_slice(&bytes)
            .map_err(|e| IngestError::parse(format!("modelsdiff response: {}", e)))
    }

    /// Fetch the XML definition of a content model by QName.
    pub async fn model_xml(&self, model_qname: &str) -> Result<String, IngestError> {
        let encoded: String = byte_serialize(model_qname.as_bytes()).collect();
        debug!(model = %model_qname, "Retrieving model XML");
        let bytes = self.client.get(&format!("model?modelQName={}", encoded)).await?;
        String::from_utf8(bytes)
            .map_err(|e| IngestError::parse(format!("model XML for {}: {}", model_qname, e)))
    }

    /// Fetch the extracted text content of a node by database id.
    pub async fn text_content(&self, node_id: i64) -> Result<String, IngestError> {
        debug!(node_id, "Retrieving text content");
        let bytes = self
            .client
            .get(&format!("textContent?nodeId={}", node_id))
            .await?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}
