//! Storage Service
//!
//! A storage service groups the hardware types a tenant's storage classes
//! may be placed on. Only `display_name` can change after creation.

use super::{ManagedResource, PatchSet, ResourceRef};
use crate::domain::ports::{ResourceCategory, Scope};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Array hardware a storage service can be backed by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum HardwareType {
    FlashArrayX,
    FlashArrayC,
    FlashArrayXOptane,
    FlashArrayXl,
}

impl std::fmt::Display for HardwareType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HardwareType::FlashArrayX => write!(f, "flash-array-x"),
            HardwareType::FlashArrayC => write!(f, "flash-array-c"),
            HardwareType::FlashArrayXOptane => write!(f, "flash-array-x-optane"),
            HardwareType::FlashArrayXl => write!(f, "flash-array-xl"),
        }
    }
}

/// Desired state of a storage service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StorageServiceSpec {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    /// Settable at creation only
    #[serde(default)]
    pub hardware_types: Option<Vec<HardwareType>>,
}

impl StorageServiceSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            hardware_types: None,
        }
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    pub fn with_hardware_types(mut self, hardware_types: Vec<HardwareType>) -> Self {
        self.hardware_types = Some(hardware_types);
        self
    }
}

/// Storage service as returned by the API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageService {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub hardware_types: Vec<ResourceRef>,
}

impl ManagedResource for StorageServiceSpec {
    type Current = StorageService;

    const CATEGORY: ResourceCategory = ResourceCategory::StorageService;

    fn name(&self) -> &str {
        &self.name
    }

    fn scope(&self) -> Scope {
        Scope::Global
    }

    fn create_body(&self) -> Result<Value> {
        let hardware_types = match &self.hardware_types {
            Some(types) if !types.is_empty() => types,
            _ => {
                return Err(Error::Validation(format!(
                    "hardware_types is required when creating storage service {}",
                    self.name
                )))
            }
        };

        Ok(json!({
            "name": self.name,
            "display_name": self.display_name.as_deref().unwrap_or(&self.name),
            "hardware_types": hardware_types
                .iter()
                .map(|t| t.to_string())
                .collect::<Vec<_>>(),
        }))
    }

    fn patch_set(&self, current: &StorageService) -> PatchSet {
        let mut patch = PatchSet::new();
        patch.diff(
            "display_name",
            self.display_name.as_ref(),
            current.display_name.as_ref(),
        );
        patch
    }
}
