//! Asynchronous content indexing.
//!
//! After a successful metadata bulk the controller hands the written nodes to
//! a fixed-size worker pool. Workers fetch extracted text only when the node's
//! content pointer differs from the one already stored, then patch the
//! document. Content is opportunistic: worker errors are isolated per node and
//! never hold back the cursor, since the next metadata update on the node
//! retries.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use batch_indexer_repository::SearchIndexProvider;
use batch_indexer_shared::types::node::Node;
use batch_indexer_shared::{fields, noderef};

use crate::errors::IngestError;
use crate::repository::RepositoryService;

/// Fixed-size pool of content workers fed by a bounded queue.
///
/// The bounded queue provides back-pressure: when it is full, dispatching
/// blocks the controller rather than dropping work.
pub struct ContentIndexer {
    queue: mpsc::Sender<Node>,
    workers: Vec<JoinHandle<()>>,
}

impl ContentIndexer {
    /// Spawn `threads` workers reading from a queue of `queue_size` nodes.
    pub fn new(
        repository: Arc<RepositoryService>,
        search: Arc<dyn SearchIndexProvider>,
        threads: usize,
        queue_size: usize,
    ) -> Self {
        let (queue, receiver) = mpsc::channel::<Node>(queue_size);
        let receiver = Arc::new(Mutex::new(receiver));

        let workers = (0..threads)
            .map(|worker| {
                let receiver = Arc::clone(&receiver);
                let repository = Arc::clone(&repository);
                let search = Arc::clone(&search);
                tokio::spawn(async move {
                    loop {
                        let node = { receiver.lock().await.recv().await };
                        let Some(node) = node else { break };
                        if let Err(e) =
                            process_node_content(&repository, search.as_ref(), &node).await
                        {
                            error!(
                                node_ref = %node.node_ref,
                                error = %e,
                                "Error processing content for node"
                            );
                        }
                    }
                    debug!(worker, "Content worker stopped");
                })
            })
            .collect();

        info!(threads, queue_size, "Initialized content worker pool");
        Self { queue, workers }
    }

    /// Enqueue nodes for content processing. Blocks when the queue is full.
    pub async fn dispatch(&self, nodes: Vec<Node>) -> Result<(), IngestError> {
        for node in nodes {
            self.queue
                .send(node)
                .await
                .map_err(|_| IngestError::channel("content queue closed".to_string()))?;
        }
        Ok(())
    }

    /// Close the queue and wait up to `drain` per worker before abandoning it.
    pub async fn shutdown(self, drain: Duration) {
        drop(self.queue);
        for handle in self.workers {
            if timeout(drain, handle).await.is_err() {
                warn!("Content worker did not drain in time; abandoning");
            }
        }
    }
}

/// Process the content of a single node.
///
/// Nodes outside the live store, nodes without a content pointer and nodes
/// whose pointer matches the stored one are skipped without fetching text.
pub(crate) async fn process_node_content(
    repository: &RepositoryService,
    search: &dyn SearchIndexProvider,
    node: &Node,
) -> Result<(), IngestError> {
    let uuid = noderef::extract_uuid(&node.node_ref).ok_or_else(|| {
        IngestError::schema(format!("invalid node reference: {}", node.node_ref))
    })?;

    let store = node
        .properties
        .get(fields::STORE_IDENTIFIER)
        .and_then(Value::as_str);
    if store != Some(fields::SPACES_STORE) {
        debug!(uuid, "Skipping content: node is not stored in SpacesStore");
        return Ok(());
    }

    let Some(content_id) = node
        .properties
        .get(fields::CONTENT_ATTRIBUTE)
        .and_then(Value::as_object)
        .and_then(|content| content.get(fields::CONTENT_ID))
        .filter(|pointer| !pointer.is_null())
    else {
        debug!(uuid, "Skipping content: no content pointer on node");
        return Ok(());
    };
    let content_id = scalar_to_string(content_id);

    let indexed_content_id = search.get_content_id(uuid).await?;
    if content_id == indexed_content_id {
        debug!(uuid, %content_id, "Skipping content: pointer unchanged");
        return Ok(());
    }

    let text = repository.text_content(node.id).await?;
    search.update_content(uuid, &content_id, &text).await?;
    info!(uuid, %content_id, "Indexed content for node");
    Ok(())
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_scalar_to_string() {
        assert_eq!(scalar_to_string(&json!("55")), "55");
        assert_eq!(scalar_to_string(&json!(55)), "55");
    }
}
