//! Plan execution against a provider.
//!
//! The executor walks a plan sequentially, resolves each action's reference
//! parameters against deployed state, issues exactly one provider operation
//! per changing action, and checkpoints state after every success so an
//! interrupted run resumes where it stopped. Retry and backoff live here,
//! not in the provider adapter.

use std::future::Future;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{ProviderError, ProvisionError, Result, SitestackError};
use crate::graph::{DependencyGraph, ParamValue, RemovalPolicy, ResourceKind, ResourceNode};
use crate::provider::{Provider, ResolvedParams};
use crate::state::{DeployedState, HistoryEntry, ResourceState, StackOperation, StateStore};

use super::plan::{ActionKind, Plan, PlanAction};

/// Retry policy for transient provider failures.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum attempts per action, including the first.
    pub max_attempts: u32,
    /// Base delay for exponential backoff.
    pub base_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay_ms: 500,
        }
    }
}

impl RetryPolicy {
    /// Returns the delay before the next attempt.
    ///
    /// A rate-limited response carries the server's own delay; everything
    /// else backs off exponentially from the base, capped at 64x.
    #[must_use]
    pub fn delay_for(&self, attempt: u32, error: &SitestackError) -> Duration {
        if let SitestackError::Provider(ProviderError::RateLimited { retry_after_secs }) = error {
            return Duration::from_secs(*retry_after_secs);
        }
        let shift = attempt.saturating_sub(1).min(6);
        Duration::from_millis(self.base_delay_ms << shift)
    }
}

/// An action failure together with the provider calls spent on it, so a
/// failed outcome still reports how many attempts were made.
#[derive(Debug)]
struct ActionError {
    error: SitestackError,
    attempts: u32,
}

impl From<SitestackError> for ActionError {
    /// Wraps an error raised before any provider call was made.
    fn from(error: SitestackError) -> Self {
        Self { error, attempts: 0 }
    }
}

/// Outcome of a single executed action.
#[derive(Debug, Clone)]
pub struct ActionOutcome {
    /// Node name.
    pub node: String,
    /// Action that was performed.
    pub action: ActionKind,
    /// Whether the action succeeded.
    pub success: bool,
    /// Provider calls made for this action (0 for noops and retained deletes).
    pub attempts: u32,
    /// Optional detail (error text, retain note).
    pub message: Option<String>,
}

/// Aggregate result of executing a plan.
#[derive(Debug, Default)]
pub struct ExecutionResult {
    /// Per-action outcomes, in execution order.
    pub outcomes: Vec<ActionOutcome>,
    /// Total provider calls made, including retries.
    pub provider_calls: usize,
    /// Resources created.
    pub created: usize,
    /// Resources updated.
    pub updated: usize,
    /// Resources deleted (including retained removals).
    pub deleted: usize,
    /// Resources left untouched.
    pub unchanged: usize,
}

impl ExecutionResult {
    /// Returns true if every executed action succeeded.
    #[must_use]
    pub fn success(&self) -> bool {
        self.outcomes.iter().all(|o| o.success)
    }

    /// Names of the resources changed by this run.
    #[must_use]
    pub fn changed_resources(&self) -> Vec<String> {
        self.outcomes
            .iter()
            .filter(|o| o.success && o.action != ActionKind::Noop)
            .map(|o| o.node.clone())
            .collect()
    }
}

impl std::fmt::Display for ExecutionResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} created, {} updated, {} deleted, {} unchanged ({} provider calls)",
            self.created, self.updated, self.deleted, self.unchanged, self.provider_calls
        )
    }
}

/// Executes plans against a provider, checkpointing through a state store.
pub struct PlanExecutor<'a> {
    /// Provider adapter.
    provider: &'a dyn Provider,
    /// State store used for checkpoints.
    store: &'a dyn StateStore,
    /// Retry policy for transient failures.
    retry: RetryPolicy,
}

impl<'a> PlanExecutor<'a> {
    /// Creates an executor with the default retry policy.
    #[must_use]
    pub fn new(provider: &'a dyn Provider, store: &'a dyn StateStore) -> Self {
        Self {
            provider,
            store,
            retry: RetryPolicy::default(),
        }
    }

    /// Overrides the retry policy, returning the executor for chaining.
    #[must_use]
    pub const fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Executes the plan sequentially.
    ///
    /// State is saved after every successful action. On failure the run
    /// stops, a failed history entry is recorded, and already-applied
    /// actions stay in state so the next run picks up from the checkpoint.
    ///
    /// # Errors
    ///
    /// Returns the first action error encountered; everything applied before
    /// it has been persisted.
    pub async fn execute(
        &self,
        plan: &Plan,
        graph: &DependencyGraph,
        state: &mut DeployedState,
        operation: StackOperation,
    ) -> Result<ExecutionResult> {
        let mut result = ExecutionResult::default();

        for action in &plan.actions {
            let step = match action.kind {
                ActionKind::Noop => {
                    debug!("No change for '{}'", action.node);
                    result.unchanged += 1;
                    Ok((0, None))
                }
                ActionKind::Create => self
                    .apply_create(action, graph, state, &mut result.provider_calls)
                    .await
                    .map(|attempts| (attempts, None)),
                ActionKind::Update => self
                    .apply_update(action, graph, state, &mut result.provider_calls)
                    .await
                    .map(|attempts| (attempts, None)),
                ActionKind::Delete => self
                    .apply_delete(action, state, &mut result.provider_calls)
                    .await,
            };

            match step {
                Ok((attempts, message)) => {
                    match action.kind {
                        ActionKind::Create => result.created += 1,
                        ActionKind::Update => result.updated += 1,
                        ActionKind::Delete => result.deleted += 1,
                        ActionKind::Noop => {}
                    }
                    result.outcomes.push(ActionOutcome {
                        node: action.node.clone(),
                        action: action.kind,
                        success: true,
                        attempts,
                        message,
                    });
                }
                Err(ActionError { error, attempts }) => {
                    warn!("{}: {error}", action.description());
                    result.outcomes.push(ActionOutcome {
                        node: action.node.clone(),
                        action: action.kind,
                        success: false,
                        attempts,
                        message: Some(error.to_string()),
                    });

                    state.add_history(HistoryEntry::failed(
                        operation,
                        result.changed_resources(),
                        &error.to_string(),
                    ));
                    if let Err(save_err) = self.store.save(state).await {
                        warn!("Failed to record failure in state: {save_err}");
                    }
                    return Err(error);
                }
            }
        }

        state.add_history(HistoryEntry::new(operation, result.changed_resources()));
        self.store.save(state).await?;

        info!("Execution complete: {result}");
        Ok(result)
    }

    /// Creates the resource for an action, or looks it up when the node
    /// declares an already-existing zone.
    async fn apply_create(
        &self,
        action: &PlanAction,
        graph: &DependencyGraph,
        state: &mut DeployedState,
        calls: &mut usize,
    ) -> std::result::Result<u32, ActionError> {
        let node = Self::node_for(action, graph)?;
        let params = Self::resolve_params(node, state)?;

        let (identity, attempts) =
            if node.kind == ResourceKind::Zone && node.literal_bool("existing") {
                let query = node
                    .literal_str("domain_name")
                    .unwrap_or_default()
                    .to_string();
                info!("Looking up existing zone for '{query}'");
                self.with_retry("lookup", &node.name, calls, || {
                    self.provider.lookup(node.kind, &query)
                })
                .await?
            } else {
                info!("Creating {} '{}'", node.kind, node.name);
                self.with_retry("create", &node.name, calls, || {
                    self.provider.create_resource(node.kind, &params)
                })
                .await?
            };

        let mut entry = ResourceState::new(
            &node.name,
            node.kind,
            &identity.id,
            action.new_hash.as_deref().unwrap_or_default(),
        );
        entry.attributes = identity.attributes;
        entry.params = node.param_snapshot();
        entry.removal_policy = node.removal_policy;
        entry.depends_on = node.references().map(|(_, t)| t.to_string()).collect();
        state.set(entry);
        self.store
            .save(state)
            .await
            .map_err(|error| ActionError { error, attempts })?;

        Ok(attempts)
    }

    /// Updates the resource for an action in place.
    async fn apply_update(
        &self,
        action: &PlanAction,
        graph: &DependencyGraph,
        state: &mut DeployedState,
        calls: &mut usize,
    ) -> std::result::Result<u32, ActionError> {
        let node = Self::node_for(action, graph)?;
        let provider_id = state
            .get(&node.name)
            .map(|entry| entry.provider_id.clone())
            .ok_or_else(|| {
                SitestackError::internal(format!(
                    "Update planned for '{}' but it is not in state",
                    node.name
                ))
            })?;
        let params = Self::resolve_params(node, state)?;

        info!("Updating {} '{}'", node.kind, node.name);
        let ((), attempts) = self
            .with_retry("update", &node.name, calls, || {
                self.provider.update_resource(&provider_id, node.kind, &params)
            })
            .await?;

        if let Some(entry) = state.get_mut(&node.name) {
            entry.param_hash = action.new_hash.clone().unwrap_or_default();
            entry.params = node.param_snapshot();
            entry.removal_policy = node.removal_policy;
            entry.depends_on = node.references().map(|(_, t)| t.to_string()).collect();
            entry.touch();
        }
        state.last_updated = chrono::Utc::now();
        self.store
            .save(state)
            .await
            .map_err(|error| ActionError { error, attempts })?;

        Ok(attempts)
    }

    /// Deletes the resource for an action, honoring its removal policy.
    ///
    /// A retained resource is only dropped from state. A provider 404 on
    /// delete counts as success: the resource is already gone.
    async fn apply_delete(
        &self,
        action: &PlanAction,
        state: &mut DeployedState,
        calls: &mut usize,
    ) -> std::result::Result<(u32, Option<String>), ActionError> {
        let Some(entry) = state.get(&action.node) else {
            debug!("Delete planned for '{}' but nothing is tracked", action.node);
            return Ok((0, None));
        };

        if entry.removal_policy == RemovalPolicy::Retain {
            info!(
                "Retaining live {} '{}'; removing from state only",
                entry.kind, action.node
            );
            state.remove(&action.node);
            self.store.save(state).await?;
            return Ok((0, Some(String::from("retained"))));
        }

        let provider_id = entry.provider_id.clone();
        let kind = entry.kind;

        info!("Deleting {} '{}'", kind, action.node);
        let ((), attempts) = self
            .with_retry("delete", &action.node, calls, || async {
                match self.provider.delete_resource(&provider_id, kind).await {
                    Err(SitestackError::Provider(ProviderError::NotFound { .. })) => {
                        debug!("'{}' already absent at provider", action.node);
                        Ok(())
                    }
                    other => other,
                }
            })
            .await?;

        state.remove(&action.node);
        self.store
            .save(state)
            .await
            .map_err(|error| ActionError { error, attempts })?;

        Ok((attempts, None))
    }

    /// Replaces each reference parameter with the target's deployed
    /// identifier.
    fn resolve_params(node: &ResourceNode, state: &DeployedState) -> Result<ResolvedParams> {
        let mut resolved = ResolvedParams::default();

        for (name, value) in &node.params {
            match value {
                ParamValue::Reference { r#ref } => {
                    let entry = state.get(r#ref).ok_or_else(|| {
                        SitestackError::Provision(ProvisionError::DependencyNotDeployed {
                            node: node.name.clone(),
                            dependency: r#ref.clone(),
                        })
                    })?;
                    resolved.insert(name.clone(), serde_json::json!(entry.provider_id));
                }
                ParamValue::Literal(v) => resolved.insert(name.clone(), v.clone()),
            }
        }

        Ok(resolved)
    }

    fn node_for<'g>(action: &PlanAction, graph: &'g DependencyGraph) -> Result<&'g ResourceNode> {
        graph.get(&action.node).ok_or_else(|| {
            SitestackError::internal(format!("Planned node '{}' is not in the graph", action.node))
        })
    }

    /// Runs a provider call under the retry policy.
    ///
    /// Returns the value and the number of calls made; failures carry the
    /// same count. Non-retryable errors fail immediately as `ActionFailed`;
    /// exhausting the policy fails as `MaxRetriesExceeded`.
    async fn with_retry<T, F, Fut>(
        &self,
        action: &str,
        node: &str,
        calls: &mut usize,
        call: F,
    ) -> std::result::Result<(T, u32), ActionError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 1;
        loop {
            *calls += 1;
            match call().await {
                Ok(value) => return Ok((value, attempt)),
                Err(e) if e.is_retryable() => {
                    if attempt >= self.retry.max_attempts {
                        warn!(
                            "Giving up on {action} '{node}' after {attempt} attempts: {e}"
                        );
                        return Err(ActionError {
                            error: SitestackError::Provision(
                                ProvisionError::MaxRetriesExceeded {
                                    attempts: self.retry.max_attempts,
                                    action: action.to_string(),
                                    node: node.to_string(),
                                },
                            ),
                            attempts: attempt,
                        });
                    }
                    let delay = self.retry.delay_for(attempt, &e);
                    warn!(
                        "Transient failure on {action} '{node}' (attempt {attempt}): {e}; retrying in {delay:?}"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    return Err(ActionError {
                        error: SitestackError::Provision(ProvisionError::ActionFailed {
                            action: action.to_string(),
                            node: node.to_string(),
                            reason: e.to_string(),
                        }),
                        attempts: attempt,
                    });
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ParamHasher;
    use crate::provider::ProvisionedResource;
    use crate::state::LocalStateStore;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Provider double that records every call it receives.
    struct RecordingProvider {
        calls: Mutex<Vec<String>>,
        captured_params: Mutex<Vec<(String, ResolvedParams)>>,
        /// Number of leading calls to fail with a transient error.
        transient_failures: AtomicU32,
        /// Kind whose calls always fail transiently.
        always_fail_kind: Option<ResourceKind>,
        counter: AtomicU32,
    }

    impl RecordingProvider {
        fn new() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                captured_params: Mutex::new(Vec::new()),
                transient_failures: AtomicU32::new(0),
                always_fail_kind: None,
                counter: AtomicU32::new(0),
            }
        }

        fn failing_first(n: u32) -> Self {
            let provider = Self::new();
            provider.transient_failures.store(n, Ordering::SeqCst);
            provider
        }

        fn always_failing(kind: ResourceKind) -> Self {
            let mut provider = Self::new();
            provider.always_fail_kind = Some(kind);
            provider
        }

        fn record(&self, kind: ResourceKind, call: &str) -> Result<()> {
            self.calls.lock().expect("lock").push(call.to_string());
            if self.always_fail_kind == Some(kind)
                || self
                    .transient_failures
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                    .is_ok()
            {
                return Err(SitestackError::Provider(ProviderError::network(
                    "connection reset",
                )));
            }
            Ok(())
        }

        fn call_count(&self) -> usize {
            self.calls.lock().expect("lock").len()
        }
    }

    #[async_trait]
    impl Provider for RecordingProvider {
        async fn create_resource(
            &self,
            kind: ResourceKind,
            params: &ResolvedParams,
        ) -> Result<ProvisionedResource> {
            self.record(kind, &format!("create {kind}"))?;
            self.captured_params
                .lock()
                .expect("lock")
                .push((kind.to_string(), params.clone()));
            let n = self.counter.fetch_add(1, Ordering::SeqCst);
            Ok(ProvisionedResource::new(format!("{kind}-id-{n}")))
        }

        async fn update_resource(
            &self,
            _provider_id: &str,
            kind: ResourceKind,
            params: &ResolvedParams,
        ) -> Result<()> {
            self.record(kind, &format!("update {kind}"))?;
            self.captured_params
                .lock()
                .expect("lock")
                .push((kind.to_string(), params.clone()));
            Ok(())
        }

        async fn delete_resource(&self, _provider_id: &str, kind: ResourceKind) -> Result<()> {
            self.record(kind, &format!("delete {kind}"))
        }

        async fn lookup(&self, kind: ResourceKind, query: &str) -> Result<ProvisionedResource> {
            self.record(kind, &format!("lookup {kind} {query}"))?;
            Ok(ProvisionedResource::new("Z-looked-up"))
        }
    }

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            base_delay_ms: 1,
        }
    }

    fn store_in(temp: &TempDir) -> LocalStateStore {
        LocalStateStore::with_base_dir(temp.path())
    }

    fn site_nodes() -> Vec<ResourceNode> {
        vec![
            ResourceNode::new(String::from("zone"), ResourceKind::Zone)
                .with_param("domain_name", "example.com"),
            ResourceNode::new(String::from("certificate"), ResourceKind::Certificate)
                .with_param("domain_name", "example.com")
                .with_param("region", "us-east-1")
                .with_ref("hosted_zone", "zone"),
            ResourceNode::new(String::from("site-bucket"), ResourceKind::Bucket)
                .with_param("bucket_name", "www.example.com"),
            ResourceNode::new(String::from("distribution"), ResourceKind::Distribution)
                .with_ref("origin", "site-bucket")
                .with_ref("certificate", "certificate"),
            ResourceNode::new(String::from("www-alias"), ResourceKind::AliasRecord)
                .with_param("record_name", "www.example.com")
                .with_ref("zone", "zone")
                .with_ref("target", "distribution"),
        ]
    }

    #[tokio::test]
    async fn test_one_provider_call_per_action() {
        let temp = TempDir::new().expect("temp dir");
        let store = store_in(&temp);
        let provider = RecordingProvider::new();
        let graph = DependencyGraph::resolve(site_nodes()).expect("graph");
        let mut state = DeployedState::new("site", "dev");

        let plan = Plan::build(&graph, &state);
        let executor = PlanExecutor::new(&provider, &store);
        let result = executor
            .execute(&plan, &graph, &mut state, StackOperation::Apply)
            .await
            .expect("execution should succeed");

        assert_eq!(result.created, 5);
        assert_eq!(result.provider_calls, 5);
        assert_eq!(provider.call_count(), 5);
        assert_eq!(state.resources.len(), 5);
        assert!(state.history.last().is_some_and(|h| h.success));
    }

    #[tokio::test]
    async fn test_reapply_makes_no_calls() {
        let temp = TempDir::new().expect("temp dir");
        let store = store_in(&temp);
        let provider = RecordingProvider::new();
        let graph = DependencyGraph::resolve(site_nodes()).expect("graph");
        let mut state = DeployedState::new("site", "dev");

        let executor = PlanExecutor::new(&provider, &store);
        let plan = Plan::build(&graph, &state);
        executor
            .execute(&plan, &graph, &mut state, StackOperation::Apply)
            .await
            .expect("first apply should succeed");

        let replan = Plan::build(&graph, &state);
        assert!(!replan.has_changes());

        let result = executor
            .execute(&replan, &graph, &mut state, StackOperation::Apply)
            .await
            .expect("second apply should succeed");

        assert_eq!(result.provider_calls, 0);
        assert_eq!(result.unchanged, 5);
        assert_eq!(provider.call_count(), 5);
    }

    #[tokio::test]
    async fn test_references_resolve_to_provider_ids() {
        let temp = TempDir::new().expect("temp dir");
        let store = store_in(&temp);
        let provider = RecordingProvider::new();
        let graph = DependencyGraph::resolve(site_nodes()).expect("graph");
        let mut state = DeployedState::new("site", "dev");

        let plan = Plan::build(&graph, &state);
        PlanExecutor::new(&provider, &store)
            .execute(&plan, &graph, &mut state, StackOperation::Apply)
            .await
            .expect("execution should succeed");

        let zone_id = state.get("zone").expect("zone in state").provider_id.clone();
        let captured = provider.captured_params.lock().expect("lock");
        let (_, cert_params) = captured
            .iter()
            .find(|(kind, _)| kind == "certificate")
            .expect("certificate call captured");
        assert_eq!(cert_params.get_str("hosted_zone"), Some(zone_id.as_str()));
        assert_eq!(cert_params.get_str("region"), Some("us-east-1"));
    }

    #[tokio::test]
    async fn test_existing_zone_uses_lookup() {
        let temp = TempDir::new().expect("temp dir");
        let store = store_in(&temp);
        let provider = RecordingProvider::new();
        let nodes = vec![ResourceNode::new(String::from("zone"), ResourceKind::Zone)
            .with_param("domain_name", "example.com")
            .with_param("existing", true)];
        let graph = DependencyGraph::resolve(nodes).expect("graph");
        let mut state = DeployedState::new("site", "dev");

        let plan = Plan::build(&graph, &state);
        PlanExecutor::new(&provider, &store)
            .execute(&plan, &graph, &mut state, StackOperation::Apply)
            .await
            .expect("execution should succeed");

        let calls = provider.calls.lock().expect("lock");
        assert_eq!(calls.as_slice(), ["lookup zone example.com"]);
        assert_eq!(
            state.get("zone").map(|e| e.provider_id.as_str()),
            Some("Z-looked-up")
        );
    }

    #[tokio::test]
    async fn test_retained_delete_skips_provider() {
        let temp = TempDir::new().expect("temp dir");
        let store = store_in(&temp);
        let provider = RecordingProvider::new();
        let graph = DependencyGraph::resolve(vec![]).expect("graph");

        let mut state = DeployedState::new("site", "dev");
        let hash = ParamHasher::new().hash_node(
            &ResourceNode::new(String::from("site-bucket"), ResourceKind::Bucket)
                .with_param("bucket_name", "www.example.com"),
        );
        let mut entry = ResourceState::new("site-bucket", ResourceKind::Bucket, "bkt-1", &hash);
        entry.removal_policy = RemovalPolicy::Retain;
        state.set(entry);

        let plan = Plan::build(&graph, &state);
        let result = PlanExecutor::new(&provider, &store)
            .execute(&plan, &graph, &mut state, StackOperation::Destroy)
            .await
            .expect("execution should succeed");

        assert_eq!(result.deleted, 1);
        assert_eq!(result.provider_calls, 0);
        assert_eq!(provider.call_count(), 0);
        assert!(state.is_empty());
    }

    #[tokio::test]
    async fn test_delete_of_already_absent_resource_succeeds() {
        let temp = TempDir::new().expect("temp dir");
        let store = store_in(&temp);

        struct GoneProvider;
        #[async_trait]
        impl Provider for GoneProvider {
            async fn create_resource(
                &self,
                _kind: ResourceKind,
                _params: &ResolvedParams,
            ) -> Result<ProvisionedResource> {
                unreachable!("no creates planned")
            }
            async fn update_resource(
                &self,
                _provider_id: &str,
                _kind: ResourceKind,
                _params: &ResolvedParams,
            ) -> Result<()> {
                unreachable!("no updates planned")
            }
            async fn delete_resource(&self, provider_id: &str, _kind: ResourceKind) -> Result<()> {
                Err(SitestackError::Provider(ProviderError::NotFound {
                    resource_id: provider_id.to_string(),
                }))
            }
            async fn lookup(
                &self,
                _kind: ResourceKind,
                _query: &str,
            ) -> Result<ProvisionedResource> {
                unreachable!("no lookups planned")
            }
        }

        let mut state = DeployedState::new("site", "dev");
        state.set(ResourceState::new(
            "site-bucket",
            ResourceKind::Bucket,
            "bkt-1",
            "stale",
        ));
        let graph = DependencyGraph::resolve(vec![]).expect("graph");

        let plan = Plan::build(&graph, &state);
        let provider = GoneProvider;
        let result = PlanExecutor::new(&provider, &store)
            .execute(&plan, &graph, &mut state, StackOperation::Destroy)
            .await
            .expect("delete of absent resource should succeed");

        assert_eq!(result.deleted, 1);
        assert!(state.is_empty());
    }

    #[tokio::test]
    async fn test_transient_failure_retries_then_succeeds() {
        let temp = TempDir::new().expect("temp dir");
        let store = store_in(&temp);
        let provider = RecordingProvider::failing_first(2);
        let nodes = vec![
            ResourceNode::new(String::from("site-bucket"), ResourceKind::Bucket)
                .with_param("bucket_name", "www.example.com"),
        ];
        let graph = DependencyGraph::resolve(nodes).expect("graph");
        let mut state = DeployedState::new("site", "dev");

        let plan = Plan::build(&graph, &state);
        let result = PlanExecutor::new(&provider, &store)
            .with_retry_policy(fast_retry())
            .execute(&plan, &graph, &mut state, StackOperation::Apply)
            .await
            .expect("execution should succeed after retries");

        assert_eq!(result.created, 1);
        assert_eq!(result.provider_calls, 3);
        assert_eq!(result.outcomes[0].attempts, 3);
        assert!(state.get("site-bucket").is_some());
    }

    #[tokio::test]
    async fn test_failed_action_reports_attempts_made() {
        let temp = TempDir::new().expect("temp dir");
        let store = store_in(&temp);
        let provider = RecordingProvider::always_failing(ResourceKind::Bucket);
        let nodes = vec![
            ResourceNode::new(String::from("site-bucket"), ResourceKind::Bucket)
                .with_param("bucket_name", "www.example.com"),
        ];
        let graph = DependencyGraph::resolve(nodes).expect("graph");
        let mut state = DeployedState::new("site", "dev");

        let plan = Plan::build(&graph, &state);
        let executor = PlanExecutor::new(&provider, &store).with_retry_policy(fast_retry());
        let mut calls = 0;
        let err = executor
            .apply_create(&plan.actions[0], &graph, &mut state, &mut calls)
            .await
            .expect_err("bucket create should exhaust retries");

        // The failure carries the real call count, not zero.
        assert_eq!(err.attempts, 3);
        assert_eq!(calls, 3);
        assert!(matches!(
            err.error,
            SitestackError::Provision(ProvisionError::MaxRetriesExceeded { attempts: 3, .. })
        ));
    }

    #[tokio::test]
    async fn test_retry_exhaustion_keeps_checkpoint() {
        let temp = TempDir::new().expect("temp dir");
        let store = store_in(&temp);
        let provider = RecordingProvider::always_failing(ResourceKind::Bucket);
        let nodes = vec![
            ResourceNode::new(String::from("zone"), ResourceKind::Zone)
                .with_param("domain_name", "example.com"),
            ResourceNode::new(String::from("site-bucket"), ResourceKind::Bucket)
                .with_param("bucket_name", "www.example.com"),
        ];
        let graph = DependencyGraph::resolve(nodes).expect("graph");
        let mut state = DeployedState::new("site", "dev");

        let plan = Plan::build(&graph, &state);
        let err = PlanExecutor::new(&provider, &store)
            .with_retry_policy(fast_retry())
            .execute(&plan, &graph, &mut state, StackOperation::Apply)
            .await
            .expect_err("bucket create should exhaust retries");

        assert!(matches!(
            err,
            SitestackError::Provision(ProvisionError::MaxRetriesExceeded { attempts: 3, .. })
        ));

        // The zone checkpoint survived the failure.
        let persisted = store
            .load()
            .await
            .expect("state should load")
            .expect("state should exist");
        assert!(persisted.get("zone").is_some());
        assert!(persisted.get("site-bucket").is_none());
        assert!(persisted.history.last().is_some_and(|h| !h.success));

        // Resuming only replans the failed node.
        let replan = Plan::build(&graph, &persisted);
        assert_eq!(replan.count(ActionKind::Create), 1);
        assert_eq!(replan.count(ActionKind::Noop), 1);
    }

    #[tokio::test]
    async fn test_update_applies_resolved_params() {
        let temp = TempDir::new().expect("temp dir");
        let store = store_in(&temp);
        let provider = RecordingProvider::new();
        let mut state = DeployedState::new("site", "dev");

        let old = ResourceNode::new(String::from("site-bucket"), ResourceKind::Bucket)
            .with_param("bucket_name", "www.example.com");
        let mut entry = ResourceState::new(
            "site-bucket",
            ResourceKind::Bucket,
            "bkt-1",
            &ParamHasher::new().hash_node(&old),
        );
        entry.params = old.param_snapshot();
        state.set(entry);

        let new = ResourceNode::new(String::from("site-bucket"), ResourceKind::Bucket)
            .with_param("bucket_name", "cdn.example.com");
        let new_hash = ParamHasher::new().hash_node(&new);
        let graph = DependencyGraph::resolve(vec![new]).expect("graph");

        let plan = Plan::build(&graph, &state);
        let result = PlanExecutor::new(&provider, &store)
            .execute(&plan, &graph, &mut state, StackOperation::Apply)
            .await
            .expect("execution should succeed");

        assert_eq!(result.updated, 1);
        let calls = provider.calls.lock().expect("lock");
        assert_eq!(calls.as_slice(), ["update bucket"]);
        drop(calls);

        let entry = state.get("site-bucket").expect("bucket in state");
        assert_eq!(entry.param_hash, new_hash);
        assert_eq!(
            entry.params.get("bucket_name"),
            Some(&serde_json::json!("cdn.example.com"))
        );
    }
}
