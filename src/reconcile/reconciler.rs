//! Resource Reconciler
//!
//! Converges one resource towards its desired state:
//! read once, decide, issue at most one mutating call, then wait for the
//! operation that call returned.

use super::poller::OperationPoller;
use crate::domain::ports::{Operation, OperationStatus, ResourceApiRef, ResourceCategory};
use crate::error::Result;
use crate::resources::{ManagedResource, PatchSet};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};

// =============================================================================
// Types
// =============================================================================

/// Whether the resource should exist
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DesiredState {
    #[default]
    Present,
    Absent,
}

/// Mutation chosen by a reconciliation pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    None,
    Create,
    Update,
    Delete,
}

/// Decision computed from the desired spec and the live resource
#[derive(Debug, Clone, PartialEq)]
pub enum Plan {
    Noop,
    Create(Value),
    Update(PatchSet),
    Delete,
}

impl Plan {
    pub fn action(&self) -> Action {
        match self {
            Plan::Noop => Action::None,
            Plan::Create(_) => Action::Create,
            Plan::Update(_) => Action::Update,
            Plan::Delete => Action::Delete,
        }
    }
}

/// Options for a reconciliation pass
#[derive(Debug, Clone, Copy)]
pub struct ReconcileOptions {
    /// Report what would change without calling any mutating endpoint
    pub check_mode: bool,
    /// Raise when the operation ends `Failed`; otherwise return it
    pub fail_on_operation_failure: bool,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            check_mode: false,
            fail_on_operation_failure: true,
        }
    }
}

/// Result record of one reconciliation
#[derive(Debug, Clone, Serialize)]
pub struct ReconcileOutcome {
    pub changed: bool,
    pub action: Action,
    pub kind: ResourceCategory,
    /// Composite name, e.g. `tenant1/space1`
    pub resource: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub patched_fields: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<Operation>,
}

// =============================================================================
// Planning
// =============================================================================

/// Decide the single action that converges `current` towards `desired`
pub fn plan<R: ManagedResource>(
    desired: &R,
    state: DesiredState,
    current: Option<&R::Current>,
) -> Result<Plan> {
    let plan = match (state, current) {
        (DesiredState::Absent, None) => Plan::Noop,
        (DesiredState::Absent, Some(_)) => Plan::Delete,
        (DesiredState::Present, None) => Plan::Create(desired.create_body()?),
        (DesiredState::Present, Some(current)) => {
            let patch = desired.patch_set(current);
            if patch.is_empty() {
                Plan::Noop
            } else {
                Plan::Update(patch)
            }
        }
    };
    Ok(plan)
}

// =============================================================================
// Reconciler
// =============================================================================

/// Applies desired state through an injected resource API
pub struct Reconciler {
    api: ResourceApiRef,
    poller: OperationPoller,
    options: ReconcileOptions,
}

impl Reconciler {
    /// Create a new reconciler
    pub fn new(api: ResourceApiRef, poller: OperationPoller) -> Self {
        Self {
            api,
            poller,
            options: ReconcileOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ReconcileOptions) -> Self {
        self.options = options;
        self
    }

    /// Converge one resource to `state`
    pub async fn reconcile<R: ManagedResource>(
        &self,
        desired: &R,
        state: DesiredState,
    ) -> Result<ReconcileOutcome> {
        let scope = desired.scope();
        let qualified = scope.qualify(desired.name());

        let current = self.fetch_current(desired).await?;
        let plan = plan(desired, state, current.as_ref())?;

        let mut outcome = ReconcileOutcome {
            changed: plan != Plan::Noop,
            action: plan.action(),
            kind: R::CATEGORY,
            resource: qualified.clone(),
            patched_fields: match &plan {
                Plan::Update(patch) => patch.field_names().into_iter().map(String::from).collect(),
                _ => Vec::new(),
            },
            operation: None,
        };

        if plan == Plan::Noop {
            debug!("{} {} is already {:?}", R::CATEGORY, qualified, state);
            return Ok(outcome);
        }

        if self.options.check_mode {
            info!(
                "Check mode: would {:?} {} {}",
                outcome.action, R::CATEGORY, qualified
            );
            return Ok(outcome);
        }

        let handle = match plan {
            Plan::Create(body) => {
                info!("Creating {} {}", R::CATEGORY, qualified);
                self.api.create(&scope, R::CATEGORY, body).await?
            }
            Plan::Update(patch) => {
                info!(
                    "Updating {} {} ({})",
                    R::CATEGORY,
                    qualified,
                    outcome.patched_fields.join(", ")
                );
                self.api
                    .update(&scope, R::CATEGORY, desired.name(), patch.to_body())
                    .await?
            }
            Plan::Delete => {
                info!("Deleting {} {}", R::CATEGORY, qualified);
                self.api.delete(&scope, R::CATEGORY, desired.name()).await?
            }
            Plan::Noop => return Ok(outcome),
        };

        let operation = if self.options.fail_on_operation_failure {
            self.poller.await_completion(&handle).await?
        } else {
            let operation = self.poller.await_terminal(&handle).await?;
            if operation.status == OperationStatus::Failed {
                warn!(
                    "Operation {} on {} {} failed: {}",
                    operation.id,
                    R::CATEGORY,
                    qualified,
                    operation.error.clone().unwrap_or_default()
                );
            }
            operation
        };

        outcome.operation = Some(operation);
        Ok(outcome)
    }

    /// Point read; not-found means the resource is absent
    async fn fetch_current<R: ManagedResource>(&self, desired: &R) -> Result<Option<R::Current>> {
        match self
            .api
            .get(&desired.scope(), R::CATEGORY, desired.name())
            .await
        {
            Ok(value) => Ok(Some(serde_json::from_value(value)?)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::resources::{
        HardwareType, StorageService, StorageServiceSpec, Tenant, TenantSpec,
    };
    use serde_json::json;

    fn ss1() -> StorageServiceSpec {
        StorageServiceSpec::new("ss1")
            .with_display_name("Storage Service 1")
            .with_hardware_types(vec![HardwareType::FlashArrayX])
    }

    #[test]
    fn test_plan_absent() {
        let live = Tenant {
            name: "t1".into(),
            display_name: Some("different".into()),
        };
        let spec = TenantSpec::new("t1").with_display_name("Tenant 1");

        assert_eq!(plan(&spec, DesiredState::Absent, None).unwrap(), Plan::Noop);
        assert_eq!(
            plan(&spec, DesiredState::Absent, Some(&live)).unwrap(),
            Plan::Delete
        );
    }

    #[test]
    fn test_plan_create_uses_all_fields() {
        let plan = plan(&ss1(), DesiredState::Present, None).unwrap();
        assert_eq!(
            plan,
            Plan::Create(json!({
                "name": "ss1",
                "display_name": "Storage Service 1",
                "hardware_types": ["flash-array-x"],
            }))
        );
    }

    #[test]
    fn test_plan_update_excludes_immutable_fields() {
        let live = StorageService {
            name: "ss1".into(),
            display_name: None,
            hardware_types: vec![crate::resources::ResourceRef::Name("flash-array-c".into())],
        };
        match plan(&ss1(), DesiredState::Present, Some(&live)).unwrap() {
            Plan::Update(patch) => {
                assert_eq!(patch.field_names(), vec!["display_name"]);
                assert!(!patch.contains("hardware_types"));
            }
            other => panic!("expected update, got {:?}", other),
        }
    }

    #[test]
    fn test_plan_create_validation_only_when_absent() {
        let spec = StorageServiceSpec::new("ss1").with_display_name("Storage Service 1");
        assert!(matches!(
            plan(&spec, DesiredState::Present, None),
            Err(Error::Validation(_))
        ));

        let live = StorageService {
            name: "ss1".into(),
            display_name: Some("Storage Service 1".into()),
            hardware_types: vec![],
        };
        assert_eq!(
            plan(&spec, DesiredState::Present, Some(&live)).unwrap(),
            Plan::Noop
        );
    }

    #[test]
    fn test_outcome_serialization() {
        let outcome = ReconcileOutcome {
            changed: false,
            action: Action::None,
            kind: ResourceCategory::Tenant,
            resource: "t1".into(),
            patched_fields: vec![],
            operation: None,
        };
        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            json!({ "changed": false, "action": "none", "kind": "tenant", "resource": "t1" })
        );
    }
}
