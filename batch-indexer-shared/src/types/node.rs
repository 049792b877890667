//! Full node metadata records returned by the `metadata` endpoint.

use std::collections::HashMap;

use serde::Deserialize;
use serde_json::Value;

/// A node in the content repository.
///
/// `properties` arrives keyed by `{uri}localName` qualified names; the metadata
/// resolver rewrites the keys to `prefix:localName` form before the node
/// reaches the request builder. `readers` is not part of the wire payload; the
/// resolver attaches it from the ACL readers response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: i64,
    #[serde(default)]
    pub tenant_domain: Option<String>,
    pub node_ref: String,
    #[serde(rename = "type")]
    pub node_type: String,
    #[serde(default)]
    pub acl_id: i64,
    #[serde(default)]
    pub txn_id: i64,
    #[serde(default)]
    pub properties: HashMap<String, Value>,
    #[serde(default)]
    pub aspects: Vec<String>,
    #[serde(default)]
    pub paths: Vec<NodePath>,
    #[serde(default)]
    pub name_paths: Vec<NamePath>,
    /// Ancestor references, primary parent first. Reduced to UUIDs by the
    /// metadata resolver.
    #[serde(default)]
    pub ancestors: Vec<String>,
    #[serde(default)]
    pub parent_assocs: Vec<String>,
    #[serde(default)]
    pub parent_assocs_crc: Option<i64>,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(skip)]
    pub readers: Vec<String>,
}

/// A qualified path to a node.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NodePath {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub apath: Option<String>,
    #[serde(default)]
    pub qname: Option<String>,
}

/// A path to a node expressed as display-name segments.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamePath {
    #[serde(default)]
    pub name_path: Vec<String>,
}

/// Response of `POST metadata`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NodeContainer {
    #[serde(default)]
    pub nodes: Vec<Node>,
}
