//! Declaration Files
//!
//! A declaration describes one resource and the state it should be in:
//!
//! ```yaml
//! kind: storage_service
//! state: present
//! spec:
//!   name: ss1
//!   display_name: Storage Service 1
//!   hardware_types: [flash-array-x]
//! ```
//!
//! JSON is accepted too, since it parses as YAML.

use crate::error::{Error, Result};
use crate::reconcile::{DesiredState, ReconcileOutcome, Reconciler};
use crate::resources::{StorageServiceSpec, TenantSpaceSpec, TenantSpec};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// One resource with its desired state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResourceDeclaration {
    StorageService {
        #[serde(default)]
        state: DesiredState,
        spec: StorageServiceSpec,
    },
    Tenant {
        #[serde(default)]
        state: DesiredState,
        spec: TenantSpec,
    },
    TenantSpace {
        #[serde(default)]
        state: DesiredState,
        spec: TenantSpaceSpec,
    },
}

impl ResourceDeclaration {
    /// Parse a declaration from YAML or JSON text
    pub fn parse(text: &str) -> Result<Self> {
        if text.trim().is_empty() {
            return Err(Error::Validation("Declaration is empty".to_string()));
        }
        serde_yaml::from_str(text)
            .map_err(|e| Error::Validation(format!("Invalid declaration: {}", e)))
    }

    /// Load a declaration file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        debug!("Loading declaration from {}", path.display());
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn state(&self) -> DesiredState {
        match self {
            ResourceDeclaration::StorageService { state, .. }
            | ResourceDeclaration::Tenant { state, .. }
            | ResourceDeclaration::TenantSpace { state, .. } => *state,
        }
    }

    /// Reconcile the declared resource
    pub async fn apply(&self, reconciler: &Reconciler) -> Result<ReconcileOutcome> {
        match self {
            ResourceDeclaration::StorageService { state, spec } => {
                reconciler.reconcile(spec, *state).await
            }
            ResourceDeclaration::Tenant { state, spec } => reconciler.reconcile(spec, *state).await,
            ResourceDeclaration::TenantSpace { state, spec } => {
                reconciler.reconcile(spec, *state).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::HardwareType;
    use std::io::Write;

    #[test]
    fn test_parse_storage_service_yaml() {
        let decl = ResourceDeclaration::parse(
            r#"
kind: storage_service
spec:
  name: ss1
  display_name: Storage Service 1
  hardware_types: [flash-array-x, flash-array-c]
"#,
        )
        .unwrap();

        assert_eq!(decl.state(), DesiredState::Present);
        assert_eq!(
            decl,
            ResourceDeclaration::StorageService {
                state: DesiredState::Present,
                spec: StorageServiceSpec::new("ss1")
                    .with_display_name("Storage Service 1")
                    .with_hardware_types(vec![
                        HardwareType::FlashArrayX,
                        HardwareType::FlashArrayC,
                    ]),
            }
        );
    }

    #[test]
    fn test_parse_json_tenant_space_absent() {
        let decl = ResourceDeclaration::parse(
            r#"{"kind": "tenant_space", "state": "absent",
                "spec": {"tenant": "t1", "name": "space1"}}"#,
        )
        .unwrap();
        assert_eq!(decl.state(), DesiredState::Absent);
        assert!(matches!(
            decl,
            ResourceDeclaration::TenantSpace { ref spec, .. } if spec.tenant == "t1"
        ));
    }

    #[test]
    fn test_rejects_unknown_kind_and_fields() {
        let err = ResourceDeclaration::parse("kind: volume\nspec: {name: v1}\n").unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let err = ResourceDeclaration::parse("kind: tenant\nspec: {name: t1, colour: red}\n")
            .unwrap_err();
        assert!(err.to_string().contains("colour"));

        let err = ResourceDeclaration::parse(
            "kind: storage_service\nspec: {name: ss1, hardware_types: [flash-array-z]}\n",
        )
        .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn test_rejects_empty() {
        assert!(matches!(
            ResourceDeclaration::parse("  \n"),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "kind: tenant\nstate: present\nspec:\n  name: t1\n  display_name: Tenant 1"
        )
        .unwrap();

        let decl = ResourceDeclaration::load(file.path()).unwrap();
        assert_eq!(
            decl,
            ResourceDeclaration::Tenant {
                state: DesiredState::Present,
                spec: TenantSpec::new("t1").with_display_name("Tenant 1"),
            }
        );
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = ResourceDeclaration::load(dir.path().join("missing.yaml")).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
