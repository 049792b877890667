//! ACL reader types returned by the `aclsReaders` endpoint.

use serde::Deserialize;

/// Readers (and denied principals) of one access control list.
///
/// `denied` is carried for completeness but is not indexed.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AclReaders {
    pub acl_id: i64,
    #[serde(default)]
    pub readers: Vec<String>,
    #[serde(default)]
    pub denied: Vec<String>,
    #[serde(default)]
    pub tenant_domain: String,
}

/// Response of `POST aclsReaders {aclIds: [...]}`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AclReadersResponse {
    #[serde(default)]
    pub acls_readers: Vec<AclReaders>,
}
