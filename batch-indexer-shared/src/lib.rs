//! # Batch Indexer Shared
//!
//! This crate defines shared data structures and types used across the batch indexer ecosystem.
//! It includes the wire types of the repository admin API, the indexed-field name constants,
//! the qualified-name field encoding, and nodeRef UUID extraction.

pub mod fields;
pub mod noderef;
pub mod qname;
pub mod types;

pub use types::acl::{AclReaders, AclReadersResponse};
pub use types::model::{ModelDiff, ModelDiffs};
pub use types::node::{NamePath, Node, NodeContainer, NodePath};
pub use types::transaction::{
    Transaction, TransactionContainer, TransactionNode, TransactionNodeContainer,
};
