//! Node metadata resolution.
//!
//! Turns the `"u"` change headers of a cycle into fully resolved nodes:
//! metadata is fetched per node, property keys are rewritten from
//! `{uri}localName` to `prefix:localName`, ancestors are reduced to UUIDs, and
//! ACL readers are fetched in one call and attached by ACL id.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use batch_indexer_shared::noderef;
use batch_indexer_shared::types::node::Node;
use batch_indexer_shared::types::transaction::TransactionNode;

use crate::errors::IngestError;
use crate::models::{ModelMapper, NamespaceMap};
use crate::repository::RepositoryService;

/// Resolver for updated nodes.
pub struct NodeProcessor {
    repository: Arc<RepositoryService>,
    models: Arc<ModelMapper>,
}

impl NodeProcessor {
    pub fn new(repository: Arc<RepositoryService>, models: Arc<ModelMapper>) -> Self {
        Self { repository, models }
    }

    /// Resolve the metadata of a batch of updated nodes.
    pub async fn resolve_updated(
        &self,
        changes: &[TransactionNode],
    ) -> Result<Vec<Node>, IngestError> {
        let namespaces = self.models.snapshot().await;

        let mut nodes = Vec::with_capacity(changes.len());
        for change in changes {
            for mut node in self.repository.node_metadata(change.id).await? {
                let raw_properties = std::mem::take(&mut node.properties);
                node.properties =
                    prefix_property_keys(raw_properties, &namespaces, &node.node_ref);
                node.ancestors = node
                    .ancestors
                    .iter()
                    .filter_map(|ancestor| noderef::extract_uuid(ancestor))
                    .map(str::to_string)
                    .collect();
                nodes.push(node);
            }
        }

        self.attach_readers(&mut nodes).await?;
        debug!(node_count = nodes.len(), "Resolved node metadata");
        Ok(nodes)
    }

    /// Fetch the readers of all distinct ACL ids in one call and attach them.
    /// An ACL the response does not cover yields an empty reader list.
    async fn attach_readers(&self, nodes: &mut [Node]) -> Result<(), IngestError> {
        let acl_ids: BTreeSet<i64> = nodes.iter().map(|node| node.acl_id).collect();
        if acl_ids.is_empty() {
            return Ok(());
        }

        let readers_by_acl = self.repository.acl_readers(&acl_ids).await?;
        for node in nodes {
            node.readers = readers_by_acl.get(&node.acl_id).cloned().unwrap_or_default();
            debug!(node_id = node.id, readers = node.readers.len(), "Attached readers");
        }
        Ok(())
    }
}

/// Rewrite `{uri}localName` property keys to `prefix:localName`.
///
/// A URI without a registered prefix keeps its full `{uri}localName` form as
/// the prefix, which preserves correctness when a custom content model is not
/// yet deployed in the repository.
pub fn prefix_property_keys(
    properties: HashMap<String, Value>,
    namespaces: &NamespaceMap,
    node_ref: &str,
) -> HashMap<String, Value> {
    properties
        .into_iter()
        .map(|(key, value)| {
            let Some(brace) = key.rfind('}') else {
                warn!(key = %key, node_ref = %node_ref, "Property key has no namespace braces");
                return (key, value);
            };
            let uri = &key[..=brace];
            let local_name = &key[brace + 1..];
            let prefixed = match namespaces.get(uri) {
                Some(prefix) => format!("{}:{}", prefix, local_name),
                None => {
                    warn!(
                        key = %key,
                        node_ref = %node_ref,
                        "No prefix registered for namespace; the custom content model may not \
                         be deployed in the repository"
                    );
                    format!("{}:{}", key, local_name)
                }
            };
            (prefixed, value)
        })
        .collect()
}
