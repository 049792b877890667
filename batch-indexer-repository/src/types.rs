//! Request and response types for search index operations.

use serde_json::{Map, Value};

/// A single scripted upsert destined for the bulk API.
///
/// `fields` doubles as the script parameters and the upsert body, so the merge
/// script sees the same values a first-time insert materializes.
#[derive(Debug, Clone)]
pub struct ScriptedUpsert {
    /// Document id (the UUID extracted from the nodeRef).
    pub id: String,
    /// Painless source of the last-writer-wins merge script.
    pub script_source: String,
    /// Encoded field name → normalized value.
    pub fields: Map<String, Value>,
}

/// Result of a bulk operation for a single document.
#[derive(Debug, Clone)]
pub struct BatchOperationResult {
    /// The document id the operation targeted.
    pub id: String,
    /// Whether the operation succeeded (script no-ops count as successes).
    pub success: bool,
    /// Error reported by the search engine if the operation failed.
    pub error: Option<String>,
}

/// Summary of a bulk operation with aggregate statistics and per-item results.
///
/// Any failed item marks the whole bulk as failed for the cycle; the caller
/// inspects `results` to log the offending documents.
#[derive(Debug, Clone, Default)]
pub struct BatchOperationSummary {
    /// Total number of operations in the bulk.
    pub total: usize,
    /// Number of successful operations.
    pub succeeded: usize,
    /// Number of failed operations.
    pub failed: usize,
    /// Individual results in request order.
    pub results: Vec<BatchOperationResult>,
}
