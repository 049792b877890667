//! Namespace-prefix mapping synchronized from the repository's content models.
//!
//! The repository reports property keys as `{uri}localName` qualified names
//! while the index stores `prefix:localName`. The mapping between the two is
//! declared by the content models: each model's XML carries a `name` attribute
//! of the form `<prefix>:<localName>`, and the model listing reports its QName
//! as `{uri}localName`. The mapper rebuilds the mapping at the start of every
//! cycle and publishes it as an immutable snapshot, so in-flight readers never
//! observe a partial rebuild.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::errors::IngestError;
use crate::repository::RepositoryService;

/// Ordered mapping from brace-enclosed namespace URI to prefix,
/// e.g. `{http://www.alfresco.org/model/content/1.0}` → `cm`.
pub type NamespaceMap = BTreeMap<String, String>;

/// Holder of the process-wide namespace mapping.
pub struct ModelMapper {
    mapping: RwLock<Arc<NamespaceMap>>,
}

impl ModelMapper {
    pub fn new() -> Self {
        Self {
            mapping: RwLock::new(Arc::new(NamespaceMap::new())),
        }
    }

    /// The current snapshot. Valid for the duration of a cycle.
    pub async fn snapshot(&self) -> Arc<NamespaceMap> {
        Arc::clone(&*self.mapping.read().await)
    }

    /// Rebuild the mapping from the repository's model listing.
    ///
    /// A model whose XML cannot be parsed is logged and skipped; only
    /// transport failures abort the synchronization.
    pub async fn sync(&self, repository: &RepositoryService) -> Result<(), IngestError> {
        debug!("Starting synchronization of model mappings");
        let diffs = repository.model_diffs().await?;

        let mut mapping = NamespaceMap::new();
        for model in &diffs.diffs {
            let xml = repository.model_xml(&model.name).await?;
            match parse_model_namespace(&xml, &model.name) {
                Ok((uri, prefix)) => {
                    debug!(uri = %uri, prefix = %prefix, "Mapped model namespace");
                    mapping.insert(uri, prefix);
                }
                Err(e) => {
                    warn!(model = %model.name, error = %e, "Skipping unparseable model");
                }
            }
        }

        info!(models = mapping.len(), "Model synchronization complete");
        *self.mapping.write().await = Arc::new(mapping);
        Ok(())
    }
}

impl Default for ModelMapper {
    fn default() -> Self {
        Self::new()
    }
}

/// Extract the `{uri}` → prefix entry from a model definition.
///
/// The `<model>` element is matched by local name in any namespace; the URI
/// comes from the model QName, up to and including the closing brace.
fn parse_model_namespace(
    xml: &str,
    model_qname: &str,
) -> Result<(String, String), IngestError> {
    let document = roxmltree::Document::parse(xml)
        .map_err(|e| IngestError::parse(format!("model XML: {}", e)))?;

    let model_element = document
        .descendants()
        .find(|node| node.is_element() && node.tag_name().name() == "model")
        .ok_or_else(|| IngestError::parse("model XML has no <model> element".to_string()))?;

    let name_attribute = model_element
        .attribute("name")
        .ok_or_else(|| IngestError::parse("<model> element has no name attribute".to_string()))?;
    let (prefix, _) = name_attribute.split_once(':').ok_or_else(|| {
        IngestError::parse(format!(
            "model name '{}' is not of the form prefix:localName",
            name_attribute
        ))
    })?;

    let brace = model_qname.rfind('}').ok_or_else(|| {
        IngestError::parse(format!(
            "model QName '{}' has no namespace braces",
            model_qname
        ))
    })?;

    Ok((
        model_qname[..=brace].to_string(),
        prefix.to_string(),
    ))
}
