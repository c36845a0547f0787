//! In-memory Fusion
//!
//! Implements the same ports as the HTTP client over in-process maps.
//! Mutations are applied when the call is accepted and the returned
//! operation resolves according to the configured outcome. Every call is
//! recorded so tests can assert on exactly what was sent.

use crate::domain::ports::{
    collection_path, InventoryApi, Operation, OperationError, OperationStatus, OperationsApi,
    ResourceApi, ResourceCategory, Scope,
};
use crate::error::{Error, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, VecDeque};
use tracing::debug;

// =============================================================================
// Call Recording
// =============================================================================

/// Kinds of call the fake can record or be told to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallKind {
    Get,
    List,
    Create,
    Update,
    Delete,
    GetOperation,
}

/// One recorded call
#[derive(Debug, Clone, PartialEq)]
pub enum ApiCall {
    Get { path: String, name: String },
    List { path: String },
    Create { path: String, body: Value },
    Update { path: String, name: String, patch: Value },
    Delete { path: String, name: String },
    GetOperation { id: String },
}

impl ApiCall {
    pub fn kind(&self) -> CallKind {
        match self {
            ApiCall::Get { .. } => CallKind::Get,
            ApiCall::List { .. } => CallKind::List,
            ApiCall::Create { .. } => CallKind::Create,
            ApiCall::Update { .. } => CallKind::Update,
            ApiCall::Delete { .. } => CallKind::Delete,
            ApiCall::GetOperation { .. } => CallKind::GetOperation,
        }
    }
}

/// How operations started by mutating calls resolve
#[derive(Debug, Clone, PartialEq)]
pub enum OperationOutcome {
    Succeed,
    Fail(OperationError),
}

// =============================================================================
// State
// =============================================================================

#[derive(Default)]
struct MemoryState {
    /// collection path -> name -> resource
    collections: BTreeMap<String, BTreeMap<String, Value>>,
    /// operation id -> remaining status responses, last one sticks
    operations: HashMap<String, VecDeque<Operation>>,
    next_operation: u64,
    outcome: Option<OperationOutcome>,
    pending_polls: u32,
    retry_in: Option<u64>,
    failures: HashMap<CallKind, VecDeque<Error>>,
    calls: Vec<ApiCall>,
    version: Option<String>,
    array_space: HashMap<(String, String), Value>,
    array_performance: HashMap<(String, String), Value>,
}

/// In-process stand-in for a Fusion endpoint
#[derive(Default)]
pub struct MemoryFusion {
    state: Mutex<MemoryState>,
}

impl MemoryFusion {
    /// Create an empty Fusion whose operations succeed on the first poll
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve every future operation with `outcome`
    pub fn with_outcome(self, outcome: OperationOutcome) -> Self {
        self.state.lock().outcome = Some(outcome);
        self
    }

    /// Report `Running` this many times before the terminal status
    pub fn with_pending_polls(self, polls: u32) -> Self {
        self.state.lock().pending_polls = polls;
        self
    }

    /// `retry_in` hint attached to every operation status
    pub fn with_retry_in(self, millis: u64) -> Self {
        self.state.lock().retry_in = Some(millis);
        self
    }

    pub fn with_version(self, version: impl Into<String>) -> Self {
        self.state.lock().version = Some(version.into());
        self
    }

    /// Seed a resource; `resource` must carry a string `name`
    pub fn insert(&self, scope: &Scope, category: ResourceCategory, resource: Value) -> Result<()> {
        let path = collection_path(scope, category)?;
        let name = resource
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Validation("Seeded resource has no name".into()))?
            .to_string();
        self.state
            .lock()
            .collections
            .entry(path)
            .or_default()
            .insert(name, resource);
        Ok(())
    }

    pub fn set_array_space(&self, zone: &str, array: &str, space: Value) {
        self.state
            .lock()
            .array_space
            .insert((zone.to_string(), array.to_string()), space);
    }

    pub fn set_array_performance(&self, zone: &str, array: &str, performance: Value) {
        self.state
            .lock()
            .array_performance
            .insert((zone.to_string(), array.to_string()), performance);
    }

    /// Make the next call of `kind` fail with `error`
    pub fn fail_next(&self, kind: CallKind, error: Error) {
        self.state
            .lock()
            .failures
            .entry(kind)
            .or_default()
            .push_back(error);
    }

    /// Current stored value of a resource
    pub fn resource(&self, scope: &Scope, category: ResourceCategory, name: &str) -> Option<Value> {
        let path = collection_path(scope, category).ok()?;
        self.state
            .lock()
            .collections
            .get(&path)
            .and_then(|c| c.get(name))
            .cloned()
    }

    pub fn calls(&self) -> Vec<ApiCall> {
        self.state.lock().calls.clone()
    }

    pub fn count(&self, kind: CallKind) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| c.kind() == kind)
            .count()
    }

    /// Number of create, update and delete calls
    pub fn mutation_count(&self) -> usize {
        self.count(CallKind::Create) + self.count(CallKind::Update) + self.count(CallKind::Delete)
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }
}

impl MemoryState {
    /// Record the call and return an injected failure if one is queued
    fn record(&mut self, call: ApiCall) -> Result<()> {
        let kind = call.kind();
        self.calls.push(call);
        match self.failures.get_mut(&kind).and_then(VecDeque::pop_front) {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn succeeds(&self) -> bool {
        !matches!(self.outcome, Some(OperationOutcome::Fail(_)))
    }

    /// Start an operation and script the statuses polling will observe
    fn start_operation(&mut self, request_type: &str) -> Operation {
        self.next_operation += 1;
        let id = format!("op-{}", self.next_operation);

        let mut accepted = Operation::new(id.clone(), OperationStatus::Pending);
        accepted.request_type = Some(request_type.to_string());
        accepted.retry_in = self.retry_in;
        accepted.created_at = Some(chrono::Utc::now());

        let mut script = VecDeque::new();
        for _ in 0..self.pending_polls {
            let mut running = accepted.clone();
            running.status = OperationStatus::Running;
            script.push_back(running);
        }

        let mut terminal = accepted.clone();
        match &self.outcome {
            Some(OperationOutcome::Fail(error)) => {
                terminal.status = OperationStatus::Failed;
                terminal.error = Some(error.clone());
            }
            _ => terminal.status = OperationStatus::Succeeded,
        }
        script.push_back(terminal);

        self.operations.insert(id, script);
        accepted
    }
}

fn not_found(category: ResourceCategory, scope: &Scope, name: &str) -> Error {
    Error::ResourceNotFound {
        kind: category.to_string(),
        name: scope.qualify(name),
    }
}

#[async_trait]
impl ResourceApi for MemoryFusion {
    async fn get(&self, scope: &Scope, category: ResourceCategory, name: &str) -> Result<Value> {
        let path = collection_path(scope, category)?;
        let mut state = self.state.lock();
        state.record(ApiCall::Get {
            path: path.clone(),
            name: name.to_string(),
        })?;

        state
            .collections
            .get(&path)
            .and_then(|c| c.get(name))
            .cloned()
            .ok_or_else(|| not_found(category, scope, name))
    }

    async fn list(&self, scope: &Scope, category: ResourceCategory) -> Result<Vec<Value>> {
        let path = collection_path(scope, category)?;
        let mut state = self.state.lock();
        state.record(ApiCall::List { path: path.clone() })?;

        Ok(state
            .collections
            .get(&path)
            .map(|c| c.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn create(
        &self,
        scope: &Scope,
        category: ResourceCategory,
        body: Value,
    ) -> Result<Operation> {
        let path = collection_path(scope, category)?;
        let mut state = self.state.lock();
        state.record(ApiCall::Create {
            path: path.clone(),
            body: body.clone(),
        })?;

        let name = body
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::Api {
                status: 400,
                message: "name is required".into(),
            })?
            .to_string();

        if state
            .collections
            .get(&path)
            .map_or(false, |c| c.contains_key(&name))
        {
            return Err(Error::Api {
                status: 409,
                message: format!("{} {} already exists", category, scope.qualify(&name)),
            });
        }

        if state.succeeds() {
            debug!("Memory Fusion creating {}", scope.qualify(&name));
            state.collections.entry(path).or_default().insert(name, body);
        }

        Ok(state.start_operation(&format!("Create{}", category)))
    }

    async fn update(
        &self,
        scope: &Scope,
        category: ResourceCategory,
        name: &str,
        patch: Value,
    ) -> Result<Operation> {
        let path = collection_path(scope, category)?;
        let mut state = self.state.lock();
        state.record(ApiCall::Update {
            path: path.clone(),
            name: name.to_string(),
            patch: patch.clone(),
        })?;

        let succeeds = state.succeeds();
        let resource = state
            .collections
            .get_mut(&path)
            .and_then(|c| c.get_mut(name))
            .ok_or_else(|| not_found(category, scope, name))?;

        if succeeds {
            if let (Value::Object(target), Value::Object(fields)) = (resource, &patch) {
                for (field, wrapped) in fields {
                    let value = wrapped.get("value").cloned().unwrap_or(Value::Null);
                    target.insert(field.clone(), value);
                }
            }
        }

        Ok(state.start_operation(&format!("Update{}", category)))
    }

    async fn delete(
        &self,
        scope: &Scope,
        category: ResourceCategory,
        name: &str,
    ) -> Result<Operation> {
        let path = collection_path(scope, category)?;
        let mut state = self.state.lock();
        state.record(ApiCall::Delete {
            path: path.clone(),
            name: name.to_string(),
        })?;

        let exists = state
            .collections
            .get(&path)
            .map_or(false, |c| c.contains_key(name));
        if !exists {
            return Err(not_found(category, scope, name));
        }

        if state.succeeds() {
            if let Some(collection) = state.collections.get_mut(&path) {
                collection.remove(name);
            }
        }

        Ok(state.start_operation(&format!("Delete{}", category)))
    }
}

#[async_trait]
impl OperationsApi for MemoryFusion {
    async fn get_operation(&self, id: &str) -> Result<Operation> {
        let mut state = self.state.lock();
        state.record(ApiCall::GetOperation { id: id.to_string() })?;

        let script = state
            .operations
            .get_mut(id)
            .ok_or_else(|| Error::ResourceNotFound {
                kind: "Operation".into(),
                name: id.to_string(),
            })?;

        let status = if script.len() > 1 {
            script.pop_front()
        } else {
            script.front().cloned()
        };
        status.ok_or_else(|| Error::Internal(format!("Operation {} has no status", id)))
    }
}

#[async_trait]
impl InventoryApi for MemoryFusion {
    async fn version(&self) -> Result<String> {
        Ok(self
            .state
            .lock()
            .version
            .clone()
            .unwrap_or_else(|| "1.1".to_string()))
    }

    async fn array_space(&self, zone: &str, array: &str) -> Result<Value> {
        self.state
            .lock()
            .array_space
            .get(&(zone.to_string(), array.to_string()))
            .cloned()
            .ok_or_else(|| Error::ResourceNotFound {
                kind: "ArraySpace".into(),
                name: format!("{}/{}", zone, array),
            })
    }

    async fn array_performance(&self, zone: &str, array: &str) -> Result<Value> {
        self.state
            .lock()
            .array_performance
            .get(&(zone.to_string(), array.to_string()))
            .cloned()
            .ok_or_else(|| Error::ResourceNotFound {
                kind: "ArrayPerformance".into(),
                name: format!("{}/{}", zone, array),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_create_then_get() {
        let fusion = MemoryFusion::new();
        let op = fusion
            .create(&Scope::Global, ResourceCategory::Tenant, json!({ "name": "t1" }))
            .await
            .unwrap();
        assert_eq!(op.status, OperationStatus::Pending);

        let got = fusion
            .get(&Scope::Global, ResourceCategory::Tenant, "t1")
            .await
            .unwrap();
        assert_eq!(got["name"], "t1");
        assert_eq!(fusion.count(CallKind::Create), 1);
    }

    #[tokio::test]
    async fn test_operation_script() {
        let fusion = MemoryFusion::new().with_pending_polls(2);
        let op = fusion
            .create(&Scope::Global, ResourceCategory::Tenant, json!({ "name": "t1" }))
            .await
            .unwrap();

        let statuses: Vec<OperationStatus> = {
            let mut out = Vec::new();
            for _ in 0..4 {
                out.push(fusion.get_operation(&op.id).await.unwrap().status);
            }
            out
        };
        assert_eq!(
            statuses,
            vec![
                OperationStatus::Running,
                OperationStatus::Running,
                OperationStatus::Succeeded,
                OperationStatus::Succeeded,
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_outcome_leaves_state_untouched() {
        let fusion = MemoryFusion::new().with_outcome(OperationOutcome::Fail(OperationError {
            message: Some("boom".into()),
            ..Default::default()
        }));
        let op = fusion
            .create(&Scope::Global, ResourceCategory::Tenant, json!({ "name": "t1" }))
            .await
            .unwrap();

        assert!(fusion.resource(&Scope::Global, ResourceCategory::Tenant, "t1").is_none());
        assert_eq!(
            fusion.get_operation(&op.id).await.unwrap().status,
            OperationStatus::Failed
        );
    }

    #[tokio::test]
    async fn test_injected_failure_is_one_shot() {
        let fusion = MemoryFusion::new();
        fusion.fail_next(
            CallKind::List,
            Error::Api {
                status: 503,
                message: "unavailable".into(),
            },
        );

        assert!(fusion.list(&Scope::Global, ResourceCategory::Tenant).await.is_err());
        assert!(fusion.list(&Scope::Global, ResourceCategory::Tenant).await.is_ok());
        assert_eq!(fusion.count(CallKind::List), 2);
    }

    #[tokio::test]
    async fn test_update_unwraps_nullable_fields() {
        let fusion = MemoryFusion::new();
        fusion
            .insert(
                &Scope::Global,
                ResourceCategory::StorageService,
                json!({ "name": "ss1", "display_name": null }),
            )
            .unwrap();

        fusion
            .update(
                &Scope::Global,
                ResourceCategory::StorageService,
                "ss1",
                json!({ "display_name": { "value": "SS 1" } }),
            )
            .await
            .unwrap();

        let stored = fusion
            .resource(&Scope::Global, ResourceCategory::StorageService, "ss1")
            .unwrap();
        assert_eq!(stored["display_name"], "SS 1");
    }
}
