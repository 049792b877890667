//! Field names used in the search index and in resolved node properties.
//!
//! Output field names are encoded with [`crate::qname::encode`] before they are
//! written; the constants here are the logical, unencoded forms.

/// Marker set on every metadata upsert.
pub const ALIVE: &str = "ALIVE";
/// Principals allowed to read the node.
pub const READER: &str = "READER";
/// Resolved owner of the node.
pub const OWNER: &str = "OWNER";
/// Commit time of the transaction window that last wrote metadata.
/// The server-side merge script keys its last-writer-wins check on this field.
pub const METADATA_INDEXING_LAST_UPDATE: &str = "METADATA_INDEXING_LAST_UPDATE";
/// Aspects applied to the node.
pub const ASPECT: &str = "ASPECT";
/// Names of the properties actually written to the document.
pub const PROPERTIES: &str = "PROPERTIES";
/// Tags derived from name paths rooted at `Tags`.
pub const TAG: &str = "TAG";
/// Content-model type of the node.
pub const TYPE: &str = "TYPE";
/// UUID of the primary (first) ancestor.
pub const PRIMARY_PARENT: &str = "PRIMARYPARENT";
/// UUIDs of all ancestors.
pub const PARENT: &str = "PARENT";

/// Node display name property.
pub const NAME: &str = "cm:name";
/// Creator property.
pub const USER_CREATOR: &str = "cm:creator";
/// Last-modifier property, also the owner fallback.
pub const USER_MODIFIER: &str = "cm:modifier";
/// Creation date property.
pub const CREATION_DATE: &str = "cm:created";
/// Modification date property.
pub const MODIFICATION_DATE: &str = "cm:modified";
/// Explicit owner property.
pub const OWNER_PROPERTY: &str = "cm:owner";

/// Content descriptor property; a map carrying `contentId`, `mimetype`, `size`
/// and `encoding`. Never copied to the index verbatim.
pub const CONTENT_ATTRIBUTE: &str = "cm:content";
/// Key of the content pointer inside the content descriptor, and the stored
/// field holding the last indexed pointer.
pub const CONTENT_ID: &str = "contentId";
pub const CONTENT_MIME_TYPE: &str = "cm:content.mimetype";
pub const CONTENT_SIZE: &str = "cm:content.size";
pub const CONTENT_ENCODING: &str = "cm:content.encoding";
/// Transformation status; excluded from indexing.
pub const CONTENT_TR_STATUS: &str = "cm:content.tr_status";

/// Store the node lives in, read after prefix rewrite.
pub const STORE_IDENTIFIER: &str = "sys:store-identifier";
/// The live content store; archive and version stores are not indexed.
pub const SPACES_STORE: &str = "SpacesStore";
/// First segment of name paths that carry tags.
pub const TAGS_PATH_ROOT: &str = "Tags";

/// Cursor field in the control index document.
pub const LAST_TRANSACTION_ID: &str = "lastTransactionId";
