//! Integration tests for the indexing cycle.
//!
//! These tests use the real Orchestrator but mock dependencies
//! (RepositoryClient and SearchIndexProvider) to ensure reliable testing.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::{json, Value};
use url::form_urlencoded::byte_serialize;

use batch_indexer::content::ContentIndexer;
use batch_indexer::errors::IngestError;
use batch_indexer::models::ModelMapper;
use batch_indexer::orchestrator::{Orchestrator, OrchestratorConfig};
use batch_indexer::processor::NodeProcessor;
use batch_indexer::repository::{RepositoryClient, RepositoryService};
use batch_indexer_repository::{
    BatchOperationResult, BatchOperationSummary, ScriptedUpsert, SearchIndexError,
    SearchIndexProvider,
};

const CONTENT_NS: &str = "{http://www.alfresco.org/model/content/1.0}";
const SYSTEM_NS: &str = "{http://www.alfresco.org/model/system/1.0}";

const CONTENT_MODEL_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<model xmlns="http://www.alfresco.org/model/dictionary/1.0" name="cm:contentmodel"/>"#;

const SYSTEM_MODEL_XML: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<model xmlns="http://www.alfresco.org/model/dictionary/1.0" name="sys:systemModel"/>"#;

// Mock repository client returning canned endpoint responses.
struct MockRepositoryClient {
    transactions: Value,
    nodes: Value,
    metadata: HashMap<i64, Value>,
    acl_readers: Value,
    models: Vec<(String, String)>,
    text: String,
    text_requests: Mutex<Vec<String>>,
}

impl MockRepositoryClient {
    fn new() -> Self {
        Self {
            transactions: json!({"transactions": [], "maxTxnId": 0, "maxTxnCommitTime": 0}),
            nodes: json!({"nodes": []}),
            metadata: HashMap::new(),
            acl_readers: json!({"aclsReaders": []}),
            models: vec![
                (
                    format!("{}contentmodel", CONTENT_NS),
                    CONTENT_MODEL_XML.to_string(),
                ),
                (
                    format!("{}systemModel", SYSTEM_NS),
                    SYSTEM_MODEL_XML.to_string(),
                ),
            ],
            text: "extracted text".to_string(),
            text_requests: Mutex::new(Vec::new()),
        }
    }

    fn model_diffs(&self) -> Value {
        let diffs: Vec<Value> = self
            .models
            .iter()
            .map(|(qname, _)| json!({"name": qname, "type": "NEW"}))
            .collect();
        json!({ "diffs": diffs })
    }

    fn text_request_count(&self) -> usize {
        self.text_requests.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl RepositoryClient for MockRepositoryClient {
    async fn get(&self, path: &str) -> Result<Vec<u8>, IngestError> {
        if path.starts_with("transactions") {
            return Ok(serde_json::to_vec(&self.transactions).unwrap());
        }
        if path.starts_with("model?") {
            for (qname, xml) in &self.models {
                let encoded: String = byte_serialize(qname.as_bytes()).collect();
                if path.ends_with(&encoded) {
                    return Ok(xml.clone().into_bytes());
                }
            }
            return Err(IngestError::repository(format!("unknown model: {path}")));
        }
        if path.starts_with("textContent") {
            self.text_requests.lock().unwrap().push(path.to_string());
            return Ok(self.text.clone().into_bytes());
        }
        Err(IngestError::repository(format!("unexpected GET {path}")))
    }

    async fn post_json(&self, path: &str, body: Value) -> Result<Vec<u8>, IngestError> {
        let response = match path {
            "nodes" => self.nodes.clone(),
            "metadata" => {
                let node_id = body["nodeIds"][0].as_i64().unwrap_or_default();
                self.metadata
                    .get(&node_id)
                    .cloned()
                    .unwrap_or_else(|| json!({"nodes": []}))
            }
            "aclsReaders" => self.acl_readers.clone(),
            "modelsdiff" => self.model_diffs(),
            other => return Err(IngestError::repository(format!("unexpected POST {other}"))),
        };
        Ok(serde_json::to_vec(&response).unwrap())
    }
}

// Mock search provider recording every write.
struct MockSearchProvider {
    cursor: Mutex<i64>,
    cursor_writes: Mutex<Vec<i64>>,
    bulks: Mutex<Vec<Vec<ScriptedUpsert>>>,
    deletes: Mutex<Vec<String>>,
    content_ids: Mutex<HashMap<String, String>>,
    content_updates: Mutex<Vec<(String, String, String)>>,
    fail_bulk: bool,
}

impl MockSearchProvider {
    fn new() -> Self {
        Self {
            cursor: Mutex::new(0),
            cursor_writes: Mutex::new(Vec::new()),
            bulks: Mutex::new(Vec::new()),
            deletes: Mutex::new(Vec::new()),
            content_ids: Mutex::new(HashMap::new()),
            content_updates: Mutex::new(Vec::new()),
            fail_bulk: false,
        }
    }

    fn failing_bulk() -> Self {
        Self {
            fail_bulk: true,
            ..Self::new()
        }
    }

    fn cursor_writes(&self) -> Vec<i64> {
        self.cursor_writes.lock().unwrap().clone()
    }

    fn bulk_count(&self) -> usize {
        self.bulks.lock().unwrap().len()
    }

    fn content_update_count(&self) -> usize {
        self.content_updates.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl SearchIndexProvider for MockSearchProvider {
    async fn ensure_indexes(&self) -> Result<(), SearchIndexError> {
        Ok(())
    }

    async fn read_last_indexed(&self) -> Result<i64, SearchIndexError> {
        Ok(*self.cursor.lock().unwrap())
    }

    async fn write_last_indexed(&self, txn_id: i64) -> Result<(), SearchIndexError> {
        *self.cursor.lock().unwrap() = txn_id;
        self.cursor_writes.lock().unwrap().push(txn_id);
        Ok(())
    }

    async fn bulk_upsert(
        &self,
        requests: &[ScriptedUpsert],
    ) -> Result<BatchOperationSummary, SearchIndexError> {
        self.bulks.lock().unwrap().push(requests.to_vec());

        let results: Vec<BatchOperationResult> = requests
            .iter()
            .enumerate()
            .map(|(position, request)| {
                let failed = self.fail_bulk && position == 0;
                BatchOperationResult {
                    id: request.id.clone(),
                    success: !failed,
                    error: failed.then(|| "simulated mapper exception".to_string()),
                }
            })
            .collect();
        let failed = results.iter().filter(|result| !result.success).count();

        Ok(BatchOperationSummary {
            total: requests.len(),
            succeeded: requests.len() - failed,
            failed,
            results,
        })
    }

    async fn get_content_id(&self, uuid: &str) -> Result<String, SearchIndexError> {
        Ok(self
            .content_ids
            .lock()
            .unwrap()
            .get(uuid)
            .cloned()
            .unwrap_or_default())
    }

    async fn update_content(
        &self,
        uuid: &str,
        content_id: &str,
        text: &str,
    ) -> Result<(), SearchIndexError> {
        self.content_ids
            .lock()
            .unwrap()
            .insert(uuid.to_string(), content_id.to_string());
        self.content_updates.lock().unwrap().push((
            uuid.to_string(),
            content_id.to_string(),
            text.to_string(),
        ));
        Ok(())
    }

    async fn delete_document(&self, uuid: &str) -> Result<u64, SearchIndexError> {
        self.deletes.lock().unwrap().push(uuid.to_string());
        Ok(1)
    }
}

fn metadata_node(node_id: i64, uuid: &str, content_id: i64) -> Value {
    json!({"nodes": [{
        "id": node_id,
        "nodeRef": format!("workspace://SpacesStore/{uuid}"),
        "type": "cm:content",
        "aclId": 5,
        "txnId": 1,
        "properties": {
            (format!("{CONTENT_NS}name")): format!("{uuid}.txt"),
            (format!("{SYSTEM_NS}store-identifier")): "SpacesStore",
            (format!("{CONTENT_NS}content")): {
                "contentId": content_id,
                "mimetype": "text/plain",
                "size": 42,
                "encoding": "UTF-8"
            }
        },
        "aspects": ["cm:auditable"],
        "ancestors": ["workspace://SpacesStore/root-1"]
    }]})
}

/// Two-transaction window with two updated nodes.
fn seeded_repository() -> MockRepositoryClient {
    let mut repository = MockRepositoryClient::new();
    repository.transactions = json!({
        "transactions": [
            {"id": 1, "commitTimeMs": 100, "updates": 1, "deletes": 0},
            {"id": 2, "commitTimeMs": 200, "updates": 1, "deletes": 0}
        ],
        "maxTxnId": 2,
        "maxTxnCommitTime": 200
    });
    repository.nodes = json!({"nodes": [
        {"id": 101, "status": "u", "nodeRef": "workspace://SpacesStore/uuid-a", "txnId": 1},
        {"id": 102, "status": "u", "nodeRef": "workspace://SpacesStore/uuid-b", "txnId": 2}
    ]});
    repository.metadata.insert(101, metadata_node(101, "uuid-a", 11));
    repository.metadata.insert(102, metadata_node(102, "uuid-b", 22));
    repository.acl_readers = json!({"aclsReaders": [
        {"aclId": 5, "readers": ["GROUP_EVERYONE"], "denied": [], "tenantDomain": ""}
    ]});
    repository
}

fn test_orchestrator(
    repository: MockRepositoryClient,
    search: Arc<MockSearchProvider>,
) -> (Orchestrator, Arc<MockRepositoryClient>) {
    let repository = Arc::new(repository);
    let client: Arc<dyn RepositoryClient> = Arc::clone(&repository) as Arc<dyn RepositoryClient>;
    let service = Arc::new(RepositoryService::new(client));
    let models = Arc::new(ModelMapper::new());
    let processor = NodeProcessor::new(Arc::clone(&service), Arc::clone(&models));
    let content = ContentIndexer::new(
        Arc::clone(&service),
        Arc::clone(&search) as Arc<dyn SearchIndexProvider>,
        2,
        100,
    );
    let orchestrator = Orchestrator::new(
        service,
        search,
        models,
        processor,
        content,
        OrchestratorConfig::default(),
    );
    (orchestrator, repository)
}

/// Poll until `condition` holds or the timeout elapses.
async fn wait_for(condition: impl Fn() -> bool) {
    for _ in 0..100 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("condition not reached within timeout");
}

#[tokio::test]
async fn test_fresh_cursor_indexes_window_and_advances() {
    let search = Arc::new(MockSearchProvider::new());
    let (orchestrator, _repository) = test_orchestrator(seeded_repository(), Arc::clone(&search));

    orchestrator.run_cycle().await.unwrap();

    // One bulk with both documents, fields resolved through the namespace map.
    let bulks = search.bulks.lock().unwrap().clone();
    assert_eq!(bulks.len(), 1);
    assert_eq!(bulks[0].len(), 2);

    let ids: Vec<&str> = bulks[0].iter().map(|upsert| upsert.id.as_str()).collect();
    assert_eq!(ids, vec!["uuid-a", "uuid-b"]);

    let fields = &bulks[0][0].fields;
    assert_eq!(fields["cm%3Aname"], json!("uuid-a.txt"));
    assert_eq!(fields["METADATA_INDEXING_LAST_UPDATE"], json!(200));
    assert_eq!(fields["READER"], json!(["GROUP_EVERYONE"]));
    assert_eq!(fields["PRIMARYPARENT"], json!("root-1"));
    assert_eq!(fields["ALIVE"], json!(true));
    assert!(bulks[0][0]
        .script_source
        .starts_with("if (ctx._source.METADATA_INDEXING_LAST_UPDATE"));

    // Cursor advanced to the window maximum, exactly once.
    assert_eq!(search.cursor_writes(), vec![2]);
}

#[tokio::test]
async fn test_content_is_fetched_and_patched_after_the_cycle() {
    let search = Arc::new(MockSearchProvider::new());
    let (orchestrator, repository) = test_orchestrator(seeded_repository(), Arc::clone(&search));

    orchestrator.run_cycle().await.unwrap();

    let search_for_wait = Arc::clone(&search);
    wait_for(move || search_for_wait.content_update_count() == 2).await;

    let updates = search.content_updates.lock().unwrap().clone();
    assert!(updates.contains(&(
        "uuid-a".to_string(),
        "11".to_string(),
        "extracted text".to_string()
    )));
    assert!(updates.contains(&(
        "uuid-b".to_string(),
        "22".to_string(),
        "extracted text".to_string()
    )));

    let mut requests = repository.text_requests.lock().unwrap().clone();
    requests.sort();
    assert_eq!(
        requests,
        vec!["textContent?nodeId=101", "textContent?nodeId=102"]
    );
}

#[tokio::test]
async fn test_unchanged_content_id_skips_the_text_fetch() {
    let search = Arc::new(MockSearchProvider::new());
    search
        .content_ids
        .lock()
        .unwrap()
        .extend([("uuid-a".to_string(), "11".to_string()),
                 ("uuid-b".to_string(), "22".to_string())]);
    let (orchestrator, repository) = test_orchestrator(seeded_repository(), Arc::clone(&search));

    orchestrator.run_cycle().await.unwrap();

    // Give the workers time to drain the queue, then verify nothing fetched.
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(repository.text_request_count(), 0);
    assert_eq!(search.content_update_count(), 0);
}

#[tokio::test]
async fn test_replayed_window_is_benign() {
    let search = Arc::new(MockSearchProvider::new());
    let (orchestrator, repository) = test_orchestrator(seeded_repository(), Arc::clone(&search));

    orchestrator.run_cycle().await.unwrap();
    let search_for_wait = Arc::clone(&search);
    wait_for(move || search_for_wait.content_update_count() == 2).await;

    // The mock replays the same window; the merge script makes the metadata
    // writes no-ops server-side, and the contentId guard stops text fetches.
    orchestrator.run_cycle().await.unwrap();
    assert_eq!(search.bulk_count(), 2);
    assert_eq!(search.cursor_writes(), vec![2, 2]);

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(repository.text_request_count(), 2);
    assert_eq!(search.content_update_count(), 2);
}

#[tokio::test]
async fn test_deleted_node_issues_delete_by_query_and_advances() {
    let mut repository = MockRepositoryClient::new();
    repository.transactions = json!({
        "transactions": [{"id": 3, "commitTimeMs": 300, "updates": 0, "deletes": 1}],
        "maxTxnId": 3,
        "maxTxnCommitTime": 300
    });
    repository.nodes = json!({"nodes": [
        {"id": 103, "status": "d", "nodeRef": "workspace://SpacesStore/abc-123", "txnId": 3}
    ]});

    let search = Arc::new(MockSearchProvider::new());
    let (orchestrator, _repository) = test_orchestrator(repository, Arc::clone(&search));

    orchestrator.run_cycle().await.unwrap();

    assert_eq!(*search.deletes.lock().unwrap(), vec!["abc-123"]);
    assert_eq!(search.bulk_count(), 0);
    assert_eq!(search.cursor_writes(), vec![3]);
}

#[tokio::test]
async fn test_unknown_status_aborts_the_cycle() {
    let mut repository = seeded_repository();
    repository.nodes = json!({"nodes": [
        {"id": 101, "status": "z", "nodeRef": "workspace://SpacesStore/uuid-a", "txnId": 1}
    ]});

    let search = Arc::new(MockSearchProvider::new());
    let (orchestrator, _repository) = test_orchestrator(repository, Arc::clone(&search));

    let result = orchestrator.run_cycle().await;
    match result.unwrap_err() {
        IngestError::SchemaError(message) => assert!(message.contains("\"z\"")),
        other => panic!("expected SchemaError, got {other:?}"),
    }
    assert!(search.cursor_writes().is_empty());
}

#[tokio::test]
async fn test_bulk_item_failure_keeps_the_cursor() {
    let search = Arc::new(MockSearchProvider::failing_bulk());
    let (orchestrator, _repository) = test_orchestrator(seeded_repository(), Arc::clone(&search));

    let result = orchestrator.run_cycle().await;
    assert!(matches!(
        result.unwrap_err(),
        IngestError::ConsistencyError { total: 2, failed: 1 }
    ));
    assert!(search.cursor_writes().is_empty());
    assert_eq!(search.content_update_count(), 0);
}

#[tokio::test]
async fn test_empty_window_is_a_no_op() {
    let search = Arc::new(MockSearchProvider::new());
    let (orchestrator, _repository) =
        test_orchestrator(MockRepositoryClient::new(), Arc::clone(&search));

    orchestrator.run_cycle().await.unwrap();

    assert_eq!(search.bulk_count(), 0);
    assert!(search.cursor_writes().is_empty());
}
