//! Tenant

use super::{ManagedResource, PatchSet};
use crate::domain::ports::{ResourceCategory, Scope};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Desired state of a tenant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TenantSpec {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl TenantSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: None,
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }
}

/// Tenant as returned by the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl ManagedResource for TenantSpec {
    type Current = Tenant;

    const CATEGORY: ResourceCategory = ResourceCategory::Tenant;

    fn name(&self) -> &str {
        &self.name
    }

    fn scope(&self) -> Scope {
        Scope::Global
    }

    fn create_body(&self) -> Result<Value> {
        Ok(json!({
            "name": self.name,
            "display_name": self.display_name.as_deref().unwrap_or(&self.name),
        }))
    }

    fn patch_set(&self, current: &Tenant) -> PatchSet {
        let mut patch = PatchSet::new();
        patch.diff(
            "display_name",
            self.display_name.as_ref(),
            current.display_name.as_ref(),
        );
        patch
    }
}
