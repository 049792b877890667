//! The scheduled indexing cycle.
//!
//! A single loop fires cycles on a fixed interval; a cycle still in progress
//! makes subsequent ticks drop, so cycles never overlap. A cycle that fails at
//! any point logs the error and leaves the cursor where it was; the next tick
//! retries the same window.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use batch_indexer_repository::{build_bulk_upserts, SearchIndexProvider};
use batch_indexer_shared::noderef;
use batch_indexer_shared::types::transaction::TransactionNode;

use crate::content::ContentIndexer;
use crate::errors::IngestError;
use crate::models::ModelMapper;
use crate::processor::NodeProcessor;
use crate::repository::RepositoryService;

/// How long shutdown waits for each content worker to drain.
const SHUTDOWN_DRAIN: Duration = Duration::from_secs(30);

/// Configuration for the orchestrator.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Interval between cycle ticks.
    pub poll_interval: Duration,
    /// Bound on transactions fetched per cycle.
    pub max_results: u32,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(10),
            max_results: 100,
        }
    }
}

/// Orchestrator that drives the indexing pipeline.
pub struct Orchestrator {
    repository: Arc<RepositoryService>,
    search: Arc<dyn SearchIndexProvider>,
    models: Arc<ModelMapper>,
    processor: NodeProcessor,
    content: ContentIndexer,
    config: OrchestratorConfig,
    /// Cycles completed successfully since startup.
    cycles_completed: AtomicU64,
    /// Documents written by metadata bulks since startup.
    documents_indexed: AtomicU64,
    /// Documents removed by delete-by-query since startup.
    documents_deleted: AtomicU64,
}

impl Orchestrator {
    pub fn new(
        repository: Arc<RepositoryService>,
        search: Arc<dyn SearchIndexProvider>,
        models: Arc<ModelMapper>,
        processor: NodeProcessor,
        content: ContentIndexer,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            repository,
            search,
            models,
            processor,
            content,
            config,
            cycles_completed: AtomicU64::new(0),
            documents_indexed: AtomicU64::new(0),
            documents_deleted: AtomicU64::new(0),
        }
    }

    /// Run cycles on the configured interval until a shutdown signal arrives.
    pub async fn run(self) -> Result<(), IngestError> {
        info!(
            poll_interval_secs = self.config.poll_interval.as_secs(),
            max_results = self.config.max_results,
            "Starting batch indexer orchestrator"
        );

        let mut ticker = interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.run_cycle().await {
                        Ok(()) => {
                            self.cycles_completed.fetch_add(1, Ordering::Relaxed);
                        }
                        Err(e) => {
                            error!(error = %e, "Indexing cycle failed; cursor not advanced");
                        }
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Received shutdown signal");
                    break;
                }
            }
        }

        self.content.shutdown(SHUTDOWN_DRAIN).await;
        info!(
            cycles_completed = self.cycles_completed.load(Ordering::Relaxed),
            documents_indexed = self.documents_indexed.load(Ordering::Relaxed),
            documents_deleted = self.documents_deleted.load(Ordering::Relaxed),
            "Orchestrator shutdown complete"
        );
        Ok(())
    }

    /// Execute one indexing cycle.
    ///
    /// The cursor advances to the highest transaction id observed in the
    /// fetched window, never to the repository's own maximum, so transactions
    /// committed after the window was chosen are picked up next cycle.
    pub async fn run_cycle(&self) -> Result<(), IngestError> {
        debug!("Syncing model mappings before starting the indexing cycle");
        self.models.sync(&self.repository).await?;

        let last_indexed = self.search.read_last_indexed().await?;
        let next_txn_id = last_indexed + 1;
        debug!(last_indexed, "Fetching new transactions");

        let window = self
            .repository
            .transactions(next_txn_id, self.config.max_results)
            .await?;
        if window.transactions.is_empty() {
            info!(
                repository_max_txn_id = window.max_txn_id,
                last_indexed, "All transactions have been indexed"
            );
            return Ok(());
        }

        let min_txn_id = window
            .transactions
            .iter()
            .map(|txn| txn.id)
            .min()
            .unwrap_or(next_txn_id);
        let max_txn_id = window
            .transactions
            .iter()
            .map(|txn| txn.id)
            .max()
            .unwrap_or(next_txn_id);
        info!(min_txn_id, max_txn_id, "Indexing content for transactions");

        let changes = self.repository.node_changes(min_txn_id, max_txn_id).await?;
        let (updated, deleted) = classify_changes(changes)?;

        let nodes = self.processor.resolve_updated(&updated).await?;
        if !nodes.is_empty() {
            let upserts = build_bulk_upserts(&nodes, window.max_txn_commit_time)?;
            debug!(count = upserts.len(), "Indexing nodes in bulk");
            let summary = self.search.bulk_upsert(&upserts).await?;
            if summary.failed > 0 {
                for result in summary.results.iter().filter(|result| !result.success) {
                    error!(
                        id = %result.id,
                        error = result.error.as_deref().unwrap_or("unknown"),
                        "Bulk upsert item failed"
                    );
                }
                return Err(IngestError::ConsistencyError {
                    total: summary.total,
                    failed: summary.failed,
                });
            }
            self.documents_indexed
                .fetch_add(summary.succeeded as u64, Ordering::Relaxed);
        }

        for change in &deleted {
            let uuid = noderef::extract_uuid(&change.node_ref).ok_or_else(|| {
                IngestError::schema(format!("invalid node reference: {}", change.node_ref))
            })?;
            debug!(node_ref = %change.node_ref, "Deleting document");
            let removed = self.search.delete_document(uuid).await?;
            if removed == 0 {
                warn!(uuid, "Delete-by-query matched no documents");
            } else {
                self.documents_deleted.fetch_add(removed, Ordering::Relaxed);
            }
        }

        self.search.write_last_indexed(max_txn_id).await?;
        debug!(max_txn_id, "Cursor advanced");

        self.content.dispatch(nodes).await?;
        Ok(())
    }
}

/// Split change headers into updates and deletions. Any other status is a
/// protocol violation that aborts the cycle.
fn classify_changes(
    changes: Vec<TransactionNode>,
) -> Result<(Vec<TransactionNode>, Vec<TransactionNode>), IngestError> {
    let mut updated = Vec::new();
    let mut deleted = Vec::new();
    for change in changes {
        match change.status.as_str() {
            "u" => updated.push(change),
            "d" => deleted.push(change),
            other => {
                return Err(IngestError::schema(format!(
                    "unknown transaction node status \"{}\" for {}",
                    other, change.node_ref
                )));
            }
        }
    }
    Ok((updated, deleted))
}
