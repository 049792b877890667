//! Transaction types returned by the repository change-tracking endpoints.

use serde::Deserialize;

/// A commit unit in the source repository.
///
/// Transactions are totally ordered by `id`; the indexing cursor records the
/// largest `id` already processed.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: i64,
    /// Commit time of the transaction in epoch milliseconds.
    #[serde(default)]
    pub commit_time_ms: i64,
    #[serde(default)]
    pub updates: i64,
    #[serde(default)]
    pub deletes: i64,
}

/// Response of `GET transactions?minTxnId=..&maxResults=..`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionContainer {
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    /// Highest transaction id currently available in the repository, which may
    /// lie beyond the returned window.
    #[serde(default)]
    pub max_txn_id: i64,
    /// Commit time of the newest transaction in the returned window.
    #[serde(default)]
    pub max_txn_commit_time: i64,
}

/// Per-node change header within a transaction window.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionNode {
    pub id: i64,
    /// `"u"` for created/updated, `"d"` for deleted.
    pub status: String,
    pub node_ref: String,
    #[serde(default)]
    pub txn_id: i64,
}

/// Response of `POST nodes {fromTxnId, toTxnId}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionNodeContainer {
    #[serde(default)]
    pub nodes: Vec<TransactionNode>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_transaction_container() {
        let json = r#"{
            "transactions": [
                {"id": 1, "commitTimeMs": 100, "updates": 2, "deletes": 0},
                {"id": 2, "commitTimeMs": 200, "updates": 0, "deletes": 1}
            ],
            "maxTxnId": 7,
            "maxTxnCommitTime": 200
        }"#;

        let container: TransactionContainer = serde_json::from_str(json).unwrap();
        assert_eq!(container.transactions.len(), 2);
        assert_eq!(container.transactions[0].id, 1);
        assert_eq!(container.transactions[1].commit_time_ms, 200);
        assert_eq!(container.max_txn_id, 7);
        assert_eq!(container.max_txn_commit_time, 200);
    }

    #[test]
    fn test_deserialize_transaction_node() {
        let json = r#"{"nodes": [
            {"id": 101, "status": "u", "nodeRef": "workspace://SpacesStore/abc", "txnId": 1},
            {"id": 102, "status": "d", "nodeRef": "workspace://SpacesStore/def", "txnId": 2}
        ]}"#;

        let container: TransactionNodeContainer = serde_json::from_str(json).unwrap();
        assert_eq!(container.nodes.len(), 2);
        assert_eq!(container.nodes[0].status, "u");
        assert_eq!(container.nodes[1].node_ref, "workspace://SpacesStore/def");
    }

    #[test]
    fn test_empty_window_deserializes_with_defaults() {
        let container: TransactionContainer =
            serde_json::from_str(r#"{"transactions": [], "maxTxnId": 42}"#).unwrap();
        assert!(container.transactions.is_empty());
        assert_eq!(container.max_txn_commit_time, 0);
    }
}
