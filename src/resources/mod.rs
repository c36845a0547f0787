//! Managed Fusion resources
//!
//! Each resource kind that can be reconciled describes its identity, its
//! create body and which of its fields are mutable. The reconciler is
//! generic over [`ManagedResource`] and never looks inside a resource.

pub mod storage_service;
pub mod tenant;
pub mod tenant_space;

pub use storage_service::*;
pub use tenant::*;
pub use tenant_space::*;

use crate::domain::ports::{ResourceCategory, Scope};
use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

// =============================================================================
// Managed Resource
// =============================================================================

/// A desired resource specification the reconciler can converge
pub trait ManagedResource: Send + Sync {
    /// Live representation returned by a point read
    type Current: DeserializeOwned + Send;

    const CATEGORY: ResourceCategory;

    /// Identity; immutable and the only lookup key
    fn name(&self) -> &str;

    /// Parent collection the resource lives in
    fn scope(&self) -> Scope;

    /// Body for the create call. Fails if a field required at creation
    /// time was left unspecified.
    fn create_body(&self) -> Result<Value>;

    /// Mutable fields whose desired value differs from `current`.
    /// Immutable fields never appear here.
    fn patch_set(&self, current: &Self::Current) -> PatchSet;
}

// =============================================================================
// Patch Set
// =============================================================================

/// Mutable fields to send in an update
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatchSet {
    fields: BTreeMap<&'static str, Value>,
}

impl PatchSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `field` if the caller has an opinion and it differs from the
    /// live value
    pub fn diff<T>(&mut self, field: &'static str, desired: Option<&T>, current: Option<&T>)
    where
        T: PartialEq + Clone + Into<Value>,
    {
        if let Some(desired) = desired {
            if current != Some(desired) {
                self.fields.insert(field, desired.clone().into());
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }

    pub fn field_names(&self) -> Vec<&'static str> {
        self.fields.keys().copied().collect()
    }

    /// Wire body; every field is wrapped as a nullable value
    pub fn to_body(&self) -> Value {
        let mut body = Map::new();
        for (field, value) in &self.fields {
            let mut wrapped = Map::new();
            wrapped.insert("value".to_string(), value.clone());
            body.insert((*field).to_string(), Value::Object(wrapped));
        }
        Value::Object(body)
    }
}

// =============================================================================
// References
// =============================================================================

/// Reference to another resource, returned either bare or as an object
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResourceRef {
    Name(String),
    Object { name: String },
}

impl ResourceRef {
    pub fn name(&self) -> &str {
        match self {
            ResourceRef::Name(name) => name,
            ResourceRef::Object { name } => name,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_patch_set_skips_unspecified_fields() {
        let mut patch = PatchSet::new();
        patch.diff::<String>("display_name", None, Some(&"old".to_string()));
        assert!(patch.is_empty());
    }

    #[test]
    fn test_patch_set_records_difference() {
        let mut patch = PatchSet::new();
        patch.diff("display_name", Some(&"new".to_string()), None);
        patch.diff("unchanged", Some(&"same".to_string()), Some(&"same".to_string()));

        assert_eq!(patch.field_names().len(), 1);
        assert!(patch.contains("display_name"));
        assert_eq!(
            patch.to_body(),
            json!({ "display_name": { "value": "new" } })
        );
    }

    #[test]
    fn test_resource_ref_forms() {
        let bare: ResourceRef = serde_json::from_value(json!("flash-array-x")).unwrap();
        let object: ResourceRef =
            serde_json::from_value(json!({ "name": "flash-array-c", "id": "1" })).unwrap();
        assert_eq!(bare.name(), "flash-array-x");
        assert_eq!(object.name(), "flash-array-c");
    }
}
