//! Client façade: cached reads and coordinated mutations.
//!
//! Wraps a [`Transport`] with the entity store, tag graph, pending-task
//! tracker and in-flight fetch registry. Handles are cheap clones sharing the
//! same state, so independent view components call `read`/`perform`
//! concurrently without any caller-side coordination.

use futures::FutureExt;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::oneshot;

use crate::api::ops::{MutationOp, QueryOp};
use crate::cache::{
  EntityKey, EntityKind, EntitySnapshot, EntityStore, FetchStatus, Inflight, PendingTasks,
  SharedFetch, Tag, TagGraph,
};
use crate::config::Config;
use crate::error::ApiError;
use crate::transport::{HttpTransport, Transport};

/// Options for a single `read` call.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReadOptions {
  /// Refetch even when the cached entry is fresh. A refresh requested while
  /// a fetch for the same key is in flight joins that fetch instead of
  /// starting a second one.
  pub force_refresh: bool,
}

impl ReadOptions {
  pub fn force() -> Self {
    Self { force_refresh: true }
  }
}

struct ClientInner {
  transport: Arc<dyn Transport>,
  store: EntityStore,
  tags: TagGraph,
  pending: Arc<PendingTasks>,
  inflight: Inflight,
  clear_pending_on_failure: bool,
}

/// Builder wiring fresh, isolated cache state around a transport.
pub struct ClientBuilder {
  transport: Arc<dyn Transport>,
  clear_pending_on_failure: bool,
}

impl ClientBuilder {
  /// Policy for pending markers of failed mutations: `false` (default) leaves
  /// them for the next info refetch to retire; `true` drops the failed
  /// mutation's own marker immediately.
  pub fn clear_pending_on_failure(mut self, clear: bool) -> Self {
    self.clear_pending_on_failure = clear;
    self
  }

  pub fn build(self) -> Client {
    let store = EntityStore::new();
    let pending = Arc::new(PendingTasks::new());

    // Pending markers retire when the owning entity's info resolves fresh.
    let tracker = Arc::clone(&pending);
    store.add_resolve_observer(move |key: &EntityKey| {
      if matches!(key.kind, EntityKind::DocumentInfo | EntityKind::CompositionInfo) {
        tracker.clear(&key.key);
      }
    });

    Client {
      inner: Arc::new(ClientInner {
        transport: self.transport,
        store,
        tags: TagGraph::new(),
        pending,
        inflight: Inflight::new(),
        clear_pending_on_failure: self.clear_pending_on_failure,
      }),
    }
  }
}

/// Cached client for the workbench API.
#[derive(Clone)]
pub struct Client {
  inner: Arc<ClientInner>,
}

impl Client {
  pub fn builder(transport: Arc<dyn Transport>) -> ClientBuilder {
    ClientBuilder { transport, clear_pending_on_failure: false }
  }

  pub fn new(transport: Arc<dyn Transport>) -> Self {
    Self::builder(transport).build()
  }

  /// Build a client backed by an HTTP transport per the given configuration.
  pub fn from_config(config: &Config) -> Result<Self, ApiError> {
    let transport = HttpTransport::from_config(config)?;
    Ok(
      Self::builder(Arc::new(transport))
        .clear_pending_on_failure(config.clear_pending_on_failure)
        .build(),
    )
  }

  pub fn store(&self) -> &EntityStore {
    &self.inner.store
  }

  pub fn pending(&self) -> &PendingTasks {
    &self.inner.pending
  }

  /// Resolve a query from cache or the network.
  ///
  /// Fresh entries short-circuit. Stale, errored and unknown entries fetch;
  /// concurrent readers of the same key all await one underlying call and
  /// observe the identical resolution.
  pub async fn read(&self, op: QueryOp, options: ReadOptions) -> Result<EntitySnapshot, ApiError> {
    let key = op.entity_key();

    if !options.force_refresh {
      if let Some(snapshot) = self.inner.store.get(&key) {
        if snapshot.status == FetchStatus::Resolved {
          tracing::trace!(entity = %key, "cache hit");
          return Ok(snapshot);
        }
      }
    }

    let (fetch, started) = self
      .inner
      .inflight
      .join_or_start(&key, || self.start_fetch(op, key.clone()));
    if !started {
      tracing::trace!(entity = %key, "joined in-flight fetch");
    }
    fetch.await
  }

  /// Execute a mutation: register its pending task, invoke the remote
  /// operation, and on success mark every entity providing one of its
  /// declared tags stale. Dependents refetch lazily on their next read.
  pub async fn perform(&self, op: MutationOp) -> Result<Value, ApiError> {
    let pending = op.pending_task();
    if let Some(task) = &pending {
      self.inner.pending.add(&task.key, &task.task);
    }

    tracing::debug!(op = %op.describe(), "submitting mutation");
    match self.inner.transport.invoke(op.request()).await {
      Ok(value) => {
        let affected = self.invalidate_tags(&op.invalidates());
        tracing::debug!(op = %op.describe(), affected = affected.len(), "mutation succeeded");
        Ok(value)
      }
      Err(err) => {
        if self.inner.clear_pending_on_failure {
          if let Some(task) = &pending {
            self.inner.pending.remove(&task.key, &task.task);
          }
        }
        tracing::warn!(op = %op.describe(), error = %err, "mutation failed");
        Err(err)
      }
    }
  }

  /// Mark every entity providing one of `tags` stale and return the affected
  /// keys. No fetch is triggered here; staleness is consumed on next read.
  pub fn invalidate_tags(&self, tags: &[Tag]) -> Vec<EntityKey> {
    let affected = self.inner.tags.providers_of(tags);
    for key in &affected {
      self.inner.store.invalidate(key);
    }
    affected
  }

  fn start_fetch(&self, op: QueryOp, key: EntityKey) -> SharedFetch {
    self.inner.store.mark_loading(&key);

    let (tx, rx) = oneshot::channel();
    let inner = Arc::clone(&self.inner);
    let task_key = key.clone();
    tokio::spawn(async move {
      let outcome = run_fetch(&inner, &op, &task_key).await;
      inner.inflight.finish(&task_key);
      // Joiners may all have gone away; the store write above still happened.
      let _ = tx.send(outcome);
    });

    async move {
      match rx.await {
        Ok(outcome) => outcome,
        Err(_) => Err(ApiError::Transport("fetch task dropped before completing".into())),
      }
    }
    .boxed()
    .shared()
  }
}

async fn run_fetch(
  inner: &ClientInner,
  op: &QueryOp,
  key: &EntityKey,
) -> Result<EntitySnapshot, ApiError> {
  tracing::debug!(entity = %key, op = %op.describe(), "fetching");
  let decoded = inner
    .transport
    .invoke(op.request())
    .await
    .and_then(|value| op.decode(value));

  match decoded {
    Ok(payload) => {
      let snapshot = inner.store.put(key.clone(), payload);
      inner.tags.set_providers(key, op.provides());
      Ok(snapshot)
    }
    Err(err) => {
      tracing::warn!(entity = %key, error = %err, "fetch failed");
      inner.store.mark_error(key, err.clone());
      Err(err)
    }
  }
}

impl std::fmt::Debug for Client {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Client")
      .field("store", &self.inner.store)
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::api::ops::Request;
  use crate::api::types::DocumentMethod;
  use async_trait::async_trait;
  use serde_json::json;
  use std::sync::atomic::{AtomicBool, Ordering};
  use std::sync::Mutex;
  use std::time::Duration;

  /// Scripted transport with canned per-path responses, a call log and a
  /// switchable failure mode.
  struct MockTransport {
    delay: Duration,
    failing: AtomicBool,
    calls: Mutex<Vec<String>>,
  }

  impl MockTransport {
    fn new(delay: Duration) -> Arc<Self> {
      Arc::new(Self {
        delay,
        failing: AtomicBool::new(false),
        calls: Mutex::new(Vec::new()),
      })
    }

    fn set_failing(&self, failing: bool) {
      self.failing.store(failing, Ordering::SeqCst);
    }

    fn calls_to(&self, path: &str) -> usize {
      self.calls.lock().unwrap().iter().filter(|p| p == &path).count()
    }

    fn respond(path: &str) -> Value {
      match path {
        "/document/all" => json!([{
          "name": "sales.csv",
          "upload_date": "2024-01-10T10:00:00Z",
          "change_date": "2024-01-11T09:30:00Z",
          "pipeline": []
        }]),
        "/document/info" => json!({
          "id": "6410",
          "name": "sales.csv",
          "upload_date": "2024-01-10T10:00:00Z",
          "change_date": "2024-01-11T09:30:00Z",
          "pipeline": [{"function_name": "drop_na", "param": null}],
          "column_types": {"numeric": ["price"], "categorical": [], "target": null}
        }),
        "/document/df" => json!({
          "total": 2,
          "records": {"price": [9.5, 12.0]}
        }),
        _ => json!("OK"),
      }
    }
  }

  #[async_trait]
  impl Transport for MockTransport {
    async fn invoke(&self, request: Request) -> Result<Value, ApiError> {
      self.calls.lock().unwrap().push(request.path.to_string());
      if !self.delay.is_zero() {
        tokio::time::sleep(self.delay).await;
      }
      if self.failing.load(Ordering::SeqCst) {
        return Err(ApiError::Rejected { status: 500, message: "boom".into() });
      }
      Ok(Self::respond(request.path))
    }
  }

  fn client_with(mock: &Arc<MockTransport>) -> Client {
    Client::new(Arc::clone(mock) as Arc<dyn Transport>)
  }

  #[tokio::test]
  async fn test_concurrent_reads_share_one_invoke() {
    let mock = MockTransport::new(Duration::from_millis(20));
    let client = client_with(&mock);

    let (a, b) = tokio::join!(client.all_documents(), client.all_documents());
    assert_eq!(a.unwrap(), b.unwrap());
    assert_eq!(mock.calls_to("/document/all"), 1);

    // A later reader gets the cached value without a new call.
    let c = client.all_documents().await.unwrap();
    assert_eq!(c[0].name, "sales.csv");
    assert_eq!(mock.calls_to("/document/all"), 1);
  }

  #[tokio::test]
  async fn test_forced_refresh_joins_the_inflight_fetch() {
    let mock = MockTransport::new(Duration::from_millis(20));
    let client = client_with(&mock);

    let plain = client.read(QueryOp::AllDocuments, ReadOptions::default());
    let forced = client.read(QueryOp::AllDocuments, ReadOptions::force());
    let (plain, forced) = tokio::join!(plain, forced);

    assert_eq!(plain.unwrap(), forced.unwrap());
    assert_eq!(mock.calls_to("/document/all"), 1);
  }

  #[tokio::test]
  async fn test_forced_refresh_refetches_a_fresh_entity() {
    let mock = MockTransport::new(Duration::ZERO);
    let client = client_with(&mock);

    client.all_documents().await.unwrap();
    let snapshot = client
      .read(QueryOp::AllDocuments, ReadOptions::force())
      .await
      .unwrap();

    assert_eq!(mock.calls_to("/document/all"), 2);
    assert_eq!(snapshot.version, 2);
  }

  #[tokio::test]
  async fn test_mutation_invalidates_providers_only() {
    let mock = MockTransport::new(Duration::ZERO);
    let client = client_with(&mock);

    client.all_documents().await.unwrap();
    client.document_info("sales.csv").await.unwrap();

    client.rename_document("sales.csv", "sales2.csv").await.unwrap();

    let list_key = QueryOp::AllDocuments.entity_key();
    let info_key = QueryOp::DocumentInfo { filename: "sales.csv".into() }.entity_key();
    assert_eq!(client.store().get(&list_key).unwrap().status, FetchStatus::Stale);
    assert_eq!(client.store().get(&info_key).unwrap().status, FetchStatus::Resolved);

    // Stale listing refetches exactly once on next read; the info stays cached.
    client.all_documents().await.unwrap();
    client.document_info("sales.csv").await.unwrap();
    assert_eq!(mock.calls_to("/document/all"), 2);
    assert_eq!(mock.calls_to("/document/info"), 1);
  }

  #[tokio::test]
  async fn test_apply_method_is_pending_until_info_refetch() {
    let mock = MockTransport::new(Duration::ZERO);
    let client = client_with(&mock);

    client
      .apply_method("sales.csv", DocumentMethod::DropNa)
      .await
      .unwrap();
    assert!(client.is_method_pending("sales.csv", DocumentMethod::DropNa));

    // The next fresh info resolution retires every marker for the document,
    // whether or not the method changed anything.
    client.document_info("sales.csv").await.unwrap();
    assert!(!client.is_method_pending("sales.csv", DocumentMethod::DropNa));
  }

  #[tokio::test]
  async fn test_cache_hit_does_not_retire_pending_markers() {
    let mock = MockTransport::new(Duration::ZERO);
    let client = client_with(&mock);

    client.document_info("sales.csv").await.unwrap();
    client.pending().add("sales.csv", "drop_na");

    // The info entity is fresh, so this read is a cache hit and must not
    // count as a confirmation.
    client.document_info("sales.csv").await.unwrap();
    assert!(client.is_method_pending("sales.csv", DocumentMethod::DropNa));
    assert_eq!(mock.calls_to("/document/info"), 1);
  }

  #[tokio::test]
  async fn test_pending_marker_appears_before_the_mutation_resolves() {
    let mock = MockTransport::new(Duration::from_millis(50));
    let client = client_with(&mock);

    let submitting = {
      let client = client.clone();
      tokio::spawn(async move {
        client.apply_method("sales.csv", DocumentMethod::DropNa).await
      })
    };

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(client.is_method_pending("sales.csv", DocumentMethod::DropNa));

    submitting.await.unwrap().unwrap();
    assert!(client.is_method_pending("sales.csv", DocumentMethod::DropNa));
  }

  #[tokio::test]
  async fn test_failed_mutation_surfaces_error_and_skips_invalidation() {
    let mock = MockTransport::new(Duration::ZERO);
    let client = client_with(&mock);

    client.all_documents().await.unwrap();

    mock.set_failing(true);
    let err = client
      .rename_document("sales.csv", "sales2.csv")
      .await
      .unwrap_err();
    assert_eq!(err, ApiError::Rejected { status: 500, message: "boom".into() });

    let list_key = QueryOp::AllDocuments.entity_key();
    assert_eq!(client.store().get(&list_key).unwrap().status, FetchStatus::Resolved);
  }

  #[tokio::test]
  async fn test_failed_mutation_leaves_pending_marker_by_default() {
    let mock = MockTransport::new(Duration::ZERO);
    let client = client_with(&mock);

    mock.set_failing(true);
    let result = client.apply_method("sales.csv", DocumentMethod::DropNa).await;
    assert!(result.is_err());
    assert!(client.is_method_pending("sales.csv", DocumentMethod::DropNa));
  }

  #[tokio::test]
  async fn test_clear_pending_on_failure_policy() {
    let mock = MockTransport::new(Duration::ZERO);
    let client = Client::builder(Arc::clone(&mock) as Arc<dyn Transport>)
      .clear_pending_on_failure(true)
      .build();

    mock.set_failing(true);
    let result = client.apply_method("sales.csv", DocumentMethod::DropNa).await;
    assert!(result.is_err());
    assert!(!client.is_method_pending("sales.csv", DocumentMethod::DropNa));
  }

  #[tokio::test]
  async fn test_fetch_failure_keeps_the_prior_payload_visible() {
    let mock = MockTransport::new(Duration::ZERO);
    let client = client_with(&mock);

    client.all_documents().await.unwrap();

    mock.set_failing(true);
    let err = client
      .read(QueryOp::AllDocuments, ReadOptions::force())
      .await
      .unwrap_err();
    assert!(matches!(err, ApiError::Rejected { .. }));

    let snapshot = client.store().get(&QueryOp::AllDocuments.entity_key()).unwrap();
    assert_eq!(snapshot.status, FetchStatus::Error);
    assert!(snapshot.payload.is_some());
    assert_eq!(snapshot.version, 1);

    // An errored entity refetches on the next plain read.
    mock.set_failing(false);
    let recovered = client.read(QueryOp::AllDocuments, ReadOptions::default()).await.unwrap();
    assert_eq!(recovered.status, FetchStatus::Resolved);
    assert_eq!(recovered.version, 2);
    assert_eq!(mock.calls_to("/document/all"), 3);
  }

  #[tokio::test]
  async fn test_distinct_keys_fetch_independently() {
    let mock = MockTransport::new(Duration::ZERO);
    let client = client_with(&mock);

    client.document_page("sales.csv", 1).await.unwrap();
    client.document_page("sales.csv", 2).await.unwrap();
    assert_eq!(mock.calls_to("/document/df"), 2);
  }
}
