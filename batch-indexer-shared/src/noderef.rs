//! Extraction of the node UUID from a nodeRef.
//!
//! A nodeRef has the form `<protocol>://<store>/<uuid>`; the trailing segment
//! is the identifier of the node's search document.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref NODE_REF_UUID: Regex = Regex::new(r"^.+://.+/(.+)$").unwrap();
}

/// Extract the trailing UUID from a nodeRef, or `None` when the reference does
/// not have the `<protocol>://<store>/<uuid>` shape.
pub fn extract_uuid(node_ref: &str) -> Option<&str> {
    NODE_REF_UUID
        .captures(node_ref)
        .and_then(|captures| captures.get(1))
        .map(|uuid| uuid.as_str())
}
