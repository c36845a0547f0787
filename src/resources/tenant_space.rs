//! Tenant Space
//!
//! Tenant spaces are nested under a tenant; the tenant name is part of the
//! address, not a mutable attribute.

use super::{ManagedResource, PatchSet};
use crate::domain::ports::{ResourceCategory, Scope};
use crate::error::Result;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Desired state of a tenant space
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TenantSpaceSpec {
    pub tenant: String,
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl TenantSpaceSpec {
    pub fn new(tenant: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            tenant: tenant.into(),
            name: name.into(),
            display_name: None,
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }
}

/// Tenant space as returned by the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantSpace {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl ManagedResource for TenantSpaceSpec {
    type Current = TenantSpace;

    const CATEGORY: ResourceCategory = ResourceCategory::TenantSpace;

    fn name(&self) -> &str {
        &self.name
    }

    fn scope(&self) -> Scope {
        Scope::tenant(&self.tenant)
    }

    fn create_body(&self) -> Result<Value> {
        Ok(json!({
            "name": self.name,
            "display_name": self.display_name.as_deref().unwrap_or(&self.name),
        }))
    }

    fn patch_set(&self, current: &TenantSpace) -> PatchSet {
        let mut patch = PatchSet::new();
        patch.diff(
            "display_name",
            self.display_name.as_ref(),
            current.display_name.as_ref(),
        );
        patch
    }
}
