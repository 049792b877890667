//! Index names, creation flags and mappings.

use serde_json::{json, Value};

use batch_indexer_shared::fields;

/// The id of the single cursor document in the control index.
pub const CONTROL_DOCUMENT_ID: &str = "1";

/// Names and creation flags of the data and control indexes.
#[derive(Debug, Clone)]
pub struct IndexConfig {
    /// Name of the data index holding node documents.
    pub name: String,
    /// Whether to create the data index at startup when absent.
    pub create: bool,
    /// Name of the control index holding the cursor document.
    pub control_name: String,
    /// Whether to create the control index at startup when absent.
    pub control_create: bool,
}

impl IndexConfig {
    /// Create an index configuration with both indexes created at startup.
    pub fn new(name: impl Into<String>, control_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            create: true,
            control_name: control_name.into(),
            control_create: true,
        }
    }
}

/// Mapping of the data index. The schema is open; only the fields with query
/// contracts are mapped explicitly.
pub fn data_index_mappings() -> Value {
    json!({
        "mappings": {
            "properties": {
                "id": {
                    "type": "text"
                },
                "dbid": {
                    "type": "long"
                },
                "contentId": {
                    "type": "long"
                },
                "name": {
                    "type": "text"
                },
                "text": {
                    "type": "text"
                }
            }
        }
    })
}

/// Mapping of the control index.
pub fn control_index_mappings() -> Value {
    json!({
        "mappings": {
            "properties": {
                (fields::LAST_TRANSACTION_ID): {
                    "type": "long"
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_index_mappings_structure() {
        let mappings = data_index_mappings();
        assert_eq!(mappings["mappings"]["properties"]["id"]["type"], "text");
        assert_eq!(mappings["mappings"]["properties"]["dbid"]["type"], "long");
        assert_eq!(
            mappings["mappings"]["properties"]["contentId"]["type"],
            "long"
        );
        assert_eq!(mappings["mappings"]["properties"]["name"]["type"], "text");
        assert_eq!(mappings["mappings"]["properties"]["text"]["type"], "text");
    }

    #[test]
    fn test_control_index_mappings_structure() {
        let mappings = control_index_mappings();
        assert_eq!(
            mappings["mappings"]["properties"]["lastTransactionId"]["type"],
            "long"
        );
    }
}
